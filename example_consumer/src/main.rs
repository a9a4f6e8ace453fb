//! Example consumer: a separate Rust project that uses portico as a
//! dependency.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! With a database: `DATABASE_URL=postgres://localhost/demo cargo run -p example-consumer`

use portico::{handler, App, AppConfig, EndpointError, FieldRule, PgExecutor, VariableRule};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("portico=info")),
        )
        .init();

    let config = AppConfig::from_env()
        .unwrap_or_else(|| AppConfig::new("change-me-in-production"));
    let mut app = App::new(config);

    app.table(
        "user",
        vec![
            ("name", FieldRule::text()),
            ("birth", FieldRule::date()),
            ("tasks", FieldRule::foreign("task", "author_id")),
        ],
    )?;
    app.table(
        "task",
        vec![("name", FieldRule::text()), ("content", FieldRule::text())],
    )?;

    // GET /q/hello?name=Alice
    app.endpoint(
        "hello",
        vec![("name", VariableRule::text().max_length(64))],
        handler(|args, _session| async move {
            let name = args
                .text("name")
                .ok_or_else(|| EndpointError::new("name must be textual", -1))?;
            Ok(serde_json::json!(format!("hello, {}", name)))
        }),
    )?;

    // GET /q/counter: per-session monotonic counter.
    app.endpoint(
        "counter",
        vec![],
        handler(|_args, session| async move {
            let next = match session.get("counter").and_then(|v| v.as_i64()) {
                Some(n) => n + 1,
                None => 0,
            };
            session.insert("counter", serde_json::json!(next));
            Ok(serde_json::json!(next))
        }),
    )?;

    // Table DDL runs once, before serving, when a database is configured.
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;
        let executor = PgExecutor::new(pool);
        app.compile(&executor).await?;
        tracing::info!("schema compiled");
    } else {
        tracing::info!("DATABASE_URL not set, skipping schema compilation");
    }

    let router = app.into_router();
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("example consumer listening on http://127.0.0.1:3000");
    axum::serve(listener, router).await?;
    Ok(())
}
