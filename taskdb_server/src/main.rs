use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use taskdb::{TaskService, TaskStoreBuilder};

/// Serve the task list API over HTTP.
#[derive(Parser, Debug)]
#[command(name = "taskdb-server", version, about)]
struct Args {
    /// Database to store tasks in
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./tasks.db?mode=rwc")]
    database_url: String,

    /// Address to listen on
    #[arg(long, env = "TASKDB_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Upper bound on pooled database connections
    #[arg(long, env = "TASKDB_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Seconds to wait for a free pooled connection
    #[arg(long, env = "TASKDB_ACQUIRE_TIMEOUT_SECS", default_value_t = 3)]
    acquire_timeout_secs: u64,

    /// Log every SQL statement
    #[arg(long, env = "TASKDB_SQL_LOG")]
    sql_log: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let store = TaskStoreBuilder::new(&args.database_url)
        .with_max_connections(args.max_connections)
        .with_acquire_timeout(Duration::from_secs(args.acquire_timeout_secs))
        .with_sqlx_logging(args.sql_log)
        .build()
        .await
        .with_context(|| format!("Failed to open task store at {}", args.database_url))?;

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;

    taskdb::http::serve(listener, TaskService::new(store.clone()), shutdown_signal()).await?;

    log::info!("Shutting down");
    store.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
