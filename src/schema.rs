//! Declarative schemas for endpoint variables and relational tables.
//!
//! Field kinds are tagged variants validated once at registration time, not
//! loosely shaped records re-interpreted per request.

/// Where a variable's raw value is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Provider {
    /// Query-string parameter of the same name (default).
    #[default]
    Query,
    /// Session map entry of the same name.
    Session,
}

/// Target type of a coerced endpoint variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Text,
    Number,
    Integer,
    Date,
    Blob,
}

/// Validation/coercion rule for one declared endpoint variable.
#[derive(Clone, Debug)]
pub struct VariableRule {
    pub kind: VarKind,
    /// Length bounds apply to textual raw values, before any coercion.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub provider: Provider,
}

impl VariableRule {
    fn of(kind: VarKind) -> Self {
        Self {
            kind,
            min_length: None,
            max_length: None,
            provider: Provider::Query,
        }
    }

    pub fn text() -> Self {
        Self::of(VarKind::Text)
    }

    pub fn number() -> Self {
        Self::of(VarKind::Number)
    }

    pub fn integer() -> Self {
        Self::of(VarKind::Integer)
    }

    pub fn date() -> Self {
        Self::of(VarKind::Date)
    }

    pub fn blob() -> Self {
        Self::of(VarKind::Blob)
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn from_session(mut self) -> Self {
        self.provider = Provider::Session;
        self
    }
}

/// Column type of a scalar table field. `Text` is the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Integer,
    /// Stored as an ISO-8601 text column.
    Date,
    Blob,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Text | ColumnKind::Date => "TEXT",
            ColumnKind::Number => "REAL",
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Blob => "BLOB",
        }
    }
}

/// One declared table field.
#[derive(Clone, Debug)]
pub enum FieldRule {
    Scalar { kind: ColumnKind },
    /// One-to-many link: materializes an INTEGER column named `bind_field` on
    /// the `bind` table, referencing this table's `id`.
    Foreign { bind: String, bind_field: String },
}

impl FieldRule {
    pub fn scalar(kind: ColumnKind) -> Self {
        FieldRule::Scalar { kind }
    }

    pub fn text() -> Self {
        FieldRule::Scalar {
            kind: ColumnKind::Text,
        }
    }

    pub fn date() -> Self {
        FieldRule::Scalar {
            kind: ColumnKind::Date,
        }
    }

    pub fn foreign(bind: impl Into<String>, bind_field: impl Into<String>) -> Self {
        FieldRule::Foreign {
            bind: bind.into(),
            bind_field: bind_field.into(),
        }
    }
}

/// A declared table. Field order is preserved; declaration order across
/// tables is preserved by the compiler because later tables may carry
/// foreign-key constraints referencing earlier ones.
#[derive(Clone, Debug)]
pub struct TableSpec {
    pub name: String,
    pub fields: Vec<(String, FieldRule)>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, fields: Vec<(&str, FieldRule)>) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, r)| (n.to_string(), r))
                .collect(),
        }
    }
}
