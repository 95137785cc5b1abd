use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::info;

use getfit::db::DbPool;
use getfit::routes::{router, AppState};
use getfit::utils::logger;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8990";

#[tokio::main]
async fn main() {
    if let Err(error) = try_run().await {
        eprintln!("failed to launch getfit server: {error}");
        std::process::exit(1);
    }
}

async fn try_run() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = std::env::var("GETFIT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("getfit-data"));

    std::fs::create_dir_all(&data_dir)?;

    logger::init_logging(&data_dir)
        .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

    let db_path = data_dir.join("getfit.sqlite");
    let pool = DbPool::new(&db_path).map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

    let state =
        AppState::new(pool).map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

    let bind_addr =
        std::env::var("GETFIT_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&bind_addr).await?;

    info!(target: "app::server", addr = %bind_addr, "getfit server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "app::server", "shutdown signal received");
    }
}
