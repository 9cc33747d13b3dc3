//! Backup Models

use serde::{Deserialize, Serialize};

/// What triggered a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Manual,
    Auto,
    /// Safety backup taken before a restore mutates live state
    PreRestore,
    /// Degraded listing fallback for artifacts without a readable manifest
    Unknown,
}

impl BackupKind {
    /// Name segment used in artifact file names
    pub fn as_str(self) -> &'static str {
        match self {
            BackupKind::Manual => "manual",
            BackupKind::Auto => "auto",
            BackupKind::PreRestore => "pre_restore",
            BackupKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest written into every backup artifact (`backup_info.json`)
///
/// The authoritative source for `list_backups`; listing falls back to
/// filesystem metadata when this is missing or unreadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    /// Artifact timestamp, "%Y%m%d_%H%M%S"
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: BackupKind,
    /// Creation time, UTC epoch millis
    pub created_at: i64,
    pub app_version: String,
    /// Artifact-relative paths of the files backed up
    pub files: Vec<String>,
    pub size_bytes: u64,
    pub compressed: bool,
}

/// One row of a backup listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Artifact file or directory name
    pub name: String,
    /// Absolute artifact path
    pub path: String,
    pub kind: BackupKind,
    pub created_at: i64,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_kind_serde_snake_case() {
        let json = serde_json::to_string(&BackupKind::PreRestore).unwrap();
        assert_eq!(json, "\"pre_restore\"");
        let back: BackupKind = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(back, BackupKind::Auto);
    }

    #[test]
    fn test_manifest_roundtrip() {
        let manifest = BackupManifest {
            timestamp: "20260101_020000".to_string(),
            kind: BackupKind::Manual,
            created_at: 1_767_225_600_000,
            app_version: "0.1.0".to_string(),
            files: vec!["database/store.redb".to_string()],
            size_bytes: 4096,
            compressed: true,
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"type\":\"manual\""));
        let back: BackupManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.files, manifest.files);
        assert_eq!(back.kind, BackupKind::Manual);
    }
}
