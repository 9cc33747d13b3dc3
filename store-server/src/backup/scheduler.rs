//! Automatic backup scheduler
//!
//! A background task that triggers `create_backup(Auto)` on the configured
//! interval. Runs independently of request handling; failures are logged and
//! swallowed - no caller is waiting on an automatic backup.

use crate::backup::manager::BackupManager;
use shared::models::BackupKind;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::config::BackupConfig;

/// How often to re-check the config while automatic backups are disabled
const DISABLED_POLL: Duration = Duration::from_secs(60);

/// Automatic backup scheduler
///
/// Registered as a periodic background task and stopped through the
/// cancellation token at process shutdown.
pub struct AutoBackupScheduler {
    manager: Arc<BackupManager>,
    shutdown: CancellationToken,
}

impl AutoBackupScheduler {
    pub fn new(manager: Arc<BackupManager>, shutdown: CancellationToken) -> Self {
        Self { manager, shutdown }
    }

    /// Main loop: sleep until the next trigger or shutdown
    pub async fn run(self) {
        tracing::info!("Auto-backup scheduler started");

        loop {
            let config = self.manager.config();
            let sleep_duration = Self::sleep_duration(&config);

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Auto-backup scheduler stopped");
                    return;
                }
            }

            // Re-read: the admin may have toggled the setting while we slept
            if !self.manager.config().auto_backup_enabled {
                continue;
            }

            let manager = self.manager.clone();
            match tokio::task::spawn_blocking(move || manager.create_backup(BackupKind::Auto))
                .await
            {
                Ok(Ok(outcome)) => {
                    tracing::info!(
                        artifact = %outcome.artifact_path.display(),
                        "Automatic backup created"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Automatic backup failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Automatic backup task panicked");
                }
            }
        }
    }

    fn sleep_duration(config: &BackupConfig) -> Duration {
        if config.auto_backup_enabled {
            Duration::from_secs(config.backup_interval_hours.max(1) * 3600)
        } else {
            DISABLED_POLL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::manager::BackupPaths;
    use crate::db::StoreStorage;

    #[test]
    fn test_sleep_duration_follows_config() {
        let mut config = BackupConfig::default();
        config.backup_interval_hours = 6;
        assert_eq!(
            AutoBackupScheduler::sleep_duration(&config),
            Duration::from_secs(6 * 3600)
        );

        config.backup_interval_hours = 0; // clamped to 1 hour
        assert_eq!(
            AutoBackupScheduler::sleep_duration(&config),
            Duration::from_secs(3600)
        );

        config.auto_backup_enabled = false;
        assert_eq!(AutoBackupScheduler::sleep_duration(&config), DISABLED_POLL);
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let database_file = dir.path().join("store.redb");
        let storage = StoreStorage::open(&database_file).unwrap();
        let manager = Arc::new(
            BackupManager::new(
                storage,
                BackupPaths {
                    backup_dir: dir.path().join("backups"),
                    database_file,
                    uploads_dir: dir.path().join("uploads"),
                    config_file: dir.path().join("backup_config.json"),
                    extra_config_files: vec![],
                },
            )
            .unwrap(),
        );

        let shutdown = CancellationToken::new();
        let scheduler = AutoBackupScheduler::new(manager, shutdown.clone());
        let handle = tokio::spawn(scheduler.run());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop on shutdown")
            .unwrap();
    }
}
