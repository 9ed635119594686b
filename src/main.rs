use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use haulwatch_backend::config::Config;
use haulwatch_backend::db::postgres_assignment_repository::PostgresAssignmentRepository;
use haulwatch_backend::db::postgres_issue_repository::PostgresIssueRepository;
use haulwatch_backend::db::postgres_supervisor_repository::PostgresSupervisorRepository;
use haulwatch_backend::monitor::Monitor;
use haulwatch_backend::services::smtp_mailer::SmtpMailer;
use haulwatch_backend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = establish_connection(&config.database_url).await?;

    let state = AppState {
        issues: Arc::new(PostgresIssueRepository { pool: pool.clone() }),
        assignments: Arc::new(PostgresAssignmentRepository { pool: pool.clone() }),
        supervisors: Arc::new(PostgresSupervisorRepository { pool: pool.clone() }),
        mailer: Arc::new(SmtpMailer::new().context("failed to initialize mailer")?),
        config: config.clone(),
    };

    // Alerts without recipients help nobody; refuse to start that way.
    let roster = state
        .supervisors
        .list_all()
        .await
        .context("failed to load supervisor roster")?;
    if roster.is_empty() {
        anyhow::bail!("supervisor roster is empty; alerts would have no recipients");
    }
    info!(supervisors = roster.len(), "supervisor roster loaded");

    let monitor = Arc::new(Monitor::new(&state));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = monitor.spawn(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    let _ = shutdown_tx.send(true);
    handle.await.context("monitor task failed to stop")?;

    Ok(())
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("successfully connected to the database");
    Ok(pool)
}
