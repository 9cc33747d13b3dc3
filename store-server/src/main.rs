use anyhow::Result;
use store_server::core::{AppState, BackgroundTasks, Config, TaskKind};
use store_server::utils::logger::init_logger_with_file;
use store_server::AutoBackupScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    init_logger_with_file(Some(&config.log_level), Some(log_dir.as_path()));

    tracing::info!(
        work_dir = %config.work_dir.display(),
        environment = %config.environment,
        "Starting store server"
    );

    let state = AppState::initialize(config)?;

    let mut tasks = BackgroundTasks::new();
    let scheduler = AutoBackupScheduler::new(state.backup.clone(), tasks.shutdown_token());
    tasks.spawn("auto_backup", TaskKind::Periodic, scheduler.run());
    tasks.log_summary();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    Ok(())
}
