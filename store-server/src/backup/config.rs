//! Backup configuration
//!
//! Persisted as a JSON file and rewritten on every change. Per-field serde
//! defaults give merge-with-defaults semantics: a config written by an older
//! version (or edited by hand) loads with current defaults filling the
//! missing keys.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub auto_backup_enabled: bool,
    pub backup_interval_hours: u64,
    /// Retention cap; oldest artifacts beyond this are pruned
    pub max_backups: usize,
    pub backup_database: bool,
    pub backup_uploads: bool,
    pub backup_config: bool,
    pub compression_enabled: bool,
    /// Last successful backup, UTC epoch millis
    pub last_backup: Option<i64>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            auto_backup_enabled: true,
            backup_interval_hours: 6,
            max_backups: 10,
            backup_database: true,
            backup_uploads: true,
            backup_config: true,
            compression_enabled: true,
            last_backup: None,
        }
    }
}

impl BackupConfig {
    /// Load from disk; missing file or unreadable content falls back to the
    /// defaults (missing keys merge with defaults via serde)
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable backup config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to disk as pretty JSON
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackupConfig::default();
        assert!(config.auto_backup_enabled);
        assert_eq!(config.backup_interval_hours, 6);
        assert_eq!(config.max_backups, 10);
        assert!(config.compression_enabled);
        assert!(config.last_backup.is_none());
    }

    #[test]
    fn test_partial_json_merges_with_defaults() {
        let config: BackupConfig =
            serde_json::from_str(r#"{"max_backups": 3, "compression_enabled": false}"#).unwrap();
        assert_eq!(config.max_backups, 3);
        assert!(!config.compression_enabled);
        // Missing keys fall back to defaults
        assert!(config.auto_backup_enabled);
        assert_eq!(config.backup_interval_hours, 6);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup_config.json");

        let mut config = BackupConfig::default();
        config.max_backups = 5;
        config.last_backup = Some(1_700_000_000_000);
        config.save(&path).unwrap();

        let loaded = BackupConfig::load(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = BackupConfig::load(&dir.path().join("nope.json"));
        assert_eq!(loaded, BackupConfig::default());
    }
}
