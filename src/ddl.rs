//! Declarative table schemas compiled to `CREATE TABLE` statements.
//!
//! Compilation runs once at startup, before the service accepts traffic.
//! Statements are emitted and executed in declaration order, which callers
//! rely on for foreign keys: a `Foreign` field declared on table A places an
//! INTEGER column plus a `FOREIGN KEY ... REFERENCES A (id)` constraint on
//! the bound table, so the bound table must be declared after A.
//!
//! There is no ALTER/migration support. Pre-existing tables with a divergent
//! shape are neither checked nor changed.

use crate::error::ConfigError;
use crate::schema::{FieldRule, TableSpec};
use crate::sql::SqlExecutor;
use std::collections::{HashMap, HashSet};

const INTROSPECT_TABLES: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'";

/// Compile every declared table into one DDL statement, in declaration
/// order. Fails before producing anything when a foreign field binds an
/// undeclared table.
pub fn compile_statements(tables: &[TableSpec]) -> Result<Vec<(String, String)>, ConfigError> {
    let declared: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

    // Foreign fields materialize on the bound table, keyed here by target.
    let mut foreign_columns: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
    for table in tables {
        for (field, rule) in &table.fields {
            if let FieldRule::Foreign { bind, bind_field } = rule {
                if !declared.contains(bind.as_str()) {
                    return Err(ConfigError::UnknownForeignTarget {
                        table: table.name.clone(),
                        field: field.clone(),
                        target: bind.clone(),
                    });
                }
                foreign_columns
                    .entry(bind.as_str())
                    .or_default()
                    .push((bind_field.as_str(), table.name.as_str()));
            }
        }
    }

    let mut statements = Vec::with_capacity(tables.len());
    for table in tables {
        let mut columns = vec!["id INTEGER PRIMARY KEY".to_string()];
        for (field, rule) in &table.fields {
            if let FieldRule::Scalar { kind } = rule {
                columns.push(format!("{} {}", field, kind.sql_type()));
            }
        }

        let mut constraints = Vec::new();
        if let Some(incoming) = foreign_columns.get(table.name.as_str()) {
            for (column, origin) in incoming {
                columns.push(format!("{} INTEGER", column));
                constraints.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} (id)",
                    column, origin
                ));
            }
        }
        columns.extend(constraints);

        let statement = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table.name,
            columns.join(", ")
        );
        statements.push((table.name.clone(), statement));
    }
    Ok(statements)
}

/// Compile and execute. All statements are derived (and the configuration
/// fully checked) before the first `run` call. In auto-migrate mode the
/// executor's introspection decides which tables to skip; otherwise `get_all`
/// is never invoked.
pub async fn compile(
    tables: &[TableSpec],
    executor: &dyn SqlExecutor,
    auto_migrate: bool,
) -> Result<(), ConfigError> {
    let statements = compile_statements(tables)?;

    let existing: HashSet<String> = if auto_migrate {
        executor
            .get_all(INTROSPECT_TABLES)
            .await
            .map_err(ConfigError::Sql)?
            .into_iter()
            .collect()
    } else {
        HashSet::new()
    };

    for (name, statement) in &statements {
        if existing.contains(name) {
            tracing::debug!(table = %name, "table already present, skipping");
            continue;
        }
        tracing::debug!(table = %name, "creating table");
        executor.run(statement).await.map_err(ConfigError::Sql)?;
    }
    Ok(())
}
