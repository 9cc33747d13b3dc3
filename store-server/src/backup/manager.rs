//! Backup Manager
//!
//! Snapshots persistent state (database + uploads + config) into a dated
//! artifact, enforces the retention policy and restores artifacts with a
//! pre-restore safety backup.
//!
//! An artifact is either a directory or a single zip file containing:
//!
//! ```text
//! backup_<kind>_<timestamp>/
//! ├── database/
//! │   ├── store.redb       raw database file copy
//! │   └── export.json      portable dump (consistent read snapshot)
//! ├── uploads/…            full uploads tree
//! ├── config/…             backup config + registered config files
//! └── backup_info.json     manifest, authoritative for list_backups
//! ```
//!
//! A failure at any component step aborts the whole backup and removes the
//! staging directory; nothing half-written is ever registered as a valid
//! artifact.

use crate::backup::config::BackupConfig;
use crate::db::{StorageError, StoreExport, StoreStorage};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::models::{BackupEntry, BackupKind, BackupManifest};
use shared::util::now_millis;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;
use zip::write::FileOptions;

const MANIFEST_FILE: &str = "backup_info.json";
const EXPORT_FILE: &str = "export.json";

/// Backup errors
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// Filesystem locations the manager works with
#[derive(Debug, Clone)]
pub struct BackupPaths {
    /// Directory holding backup artifacts (and nothing else)
    pub backup_dir: PathBuf,
    /// Live redb database file
    pub database_file: PathBuf,
    /// Live uploads tree
    pub uploads_dir: PathBuf,
    /// Persisted [`BackupConfig`] file
    pub config_file: PathBuf,
    /// Additional config files to include (e.g. ".env")
    pub extra_config_files: Vec<PathBuf>,
}

/// Result of a successful backup
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub artifact_path: PathBuf,
    pub manifest: BackupManifest,
}

/// Result of a successful restore
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// Safety backup of the state as it was when restore began
    pub pre_restore: BackupOutcome,
}

/// Disk and backup-store figures for the admin page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub disk_total_bytes: u64,
    pub disk_available_bytes: u64,
    pub backup_store_bytes: u64,
    pub total_backups: usize,
    pub last_backup: Option<i64>,
}

/// Backup manager over the live store and filesystem
///
/// Owns its [`BackupConfig`] as an explicit value with reload/persist
/// methods; there is no module-level shared state.
pub struct BackupManager {
    storage: StoreStorage,
    paths: BackupPaths,
    config: RwLock<BackupConfig>,
}

impl BackupManager {
    /// Create the manager: ensures the backup directory exists and loads
    /// (then persists) the config, merging defaults for missing keys
    pub fn new(storage: StoreStorage, paths: BackupPaths) -> BackupResult<Self> {
        fs::create_dir_all(&paths.backup_dir)?;
        let config = BackupConfig::load(&paths.config_file);
        config.save(&paths.config_file)?;
        Ok(Self {
            storage,
            paths,
            config: RwLock::new(config),
        })
    }

    // =========================================================================
    // Config
    // =========================================================================

    pub fn config(&self) -> BackupConfig {
        self.config.read().clone()
    }

    /// Mutate the config and persist it
    pub fn update_config(
        &self,
        mutate: impl FnOnce(&mut BackupConfig),
    ) -> BackupResult<BackupConfig> {
        let mut guard = self.config.write();
        mutate(&mut guard);
        guard.save(&self.paths.config_file)?;
        Ok(guard.clone())
    }

    /// Re-read the config from disk (e.g. after a restore replaced the file)
    pub fn reload_config(&self) -> BackupConfig {
        let loaded = BackupConfig::load(&self.paths.config_file);
        *self.config.write() = loaded.clone();
        loaded
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Create a backup of every enabled component
    pub fn create_backup(&self, kind: BackupKind) -> BackupResult<BackupOutcome> {
        let config = self.config();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let backup_name = format!("backup_{}_{}", kind.as_str(), timestamp);
        let staging = self.paths.backup_dir.join(&backup_name);

        match self.stage_and_finalize(&staging, kind, &timestamp, &config) {
            Ok(outcome) => {
                self.update_config(|c| c.last_backup = Some(outcome.manifest.created_at))?;
                if let Err(e) = self.cleanup_retention() {
                    tracing::warn!(error = %e, "Retention cleanup failed after backup");
                }
                tracing::info!(
                    artifact = %outcome.artifact_path.display(),
                    kind = %kind,
                    size_bytes = outcome.manifest.size_bytes,
                    "Backup created"
                );
                Ok(outcome)
            }
            Err(e) => {
                // Discard partial staging artifacts; nothing half-written
                // may look like a valid backup.
                let _ = fs::remove_dir_all(&staging);
                let _ = fs::remove_file(staging.with_extension("zip"));
                tracing::error!(kind = %kind, error = %e, "Backup failed");
                Err(e)
            }
        }
    }

    fn stage_and_finalize(
        &self,
        staging: &Path,
        kind: BackupKind,
        timestamp: &str,
        config: &BackupConfig,
    ) -> BackupResult<BackupOutcome> {
        fs::create_dir_all(staging)?;
        let mut files: Vec<String> = Vec::new();

        if config.backup_database {
            self.stage_database(staging, &mut files)?;
        }
        if config.backup_uploads {
            self.stage_uploads(staging, &mut files)?;
        }
        if config.backup_config {
            self.stage_config(staging, &mut files)?;
        }
        self.stage_app_metadata(staging, &mut files)?;

        let mut manifest = BackupManifest {
            timestamp: timestamp.to_string(),
            kind,
            created_at: now_millis(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            files,
            size_bytes: tree_size(staging)?,
            compressed: config.compression_enabled,
        };
        fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        let artifact_path = if config.compression_enabled {
            let zip_path = staging.with_extension("zip");
            compress_dir(staging, &zip_path)?;
            fs::remove_dir_all(staging)?;
            zip_path
        } else {
            staging.to_path_buf()
        };

        manifest.size_bytes = tree_size(&artifact_path)?;
        Ok(BackupOutcome {
            artifact_path,
            manifest,
        })
    }

    /// Raw database file copy plus a portable export taken under one read
    /// transaction (never a torn snapshot)
    fn stage_database(&self, staging: &Path, files: &mut Vec<String>) -> BackupResult<()> {
        let db_dir = staging.join("database");
        fs::create_dir_all(&db_dir)?;

        if self.paths.database_file.exists() {
            let file_name = self
                .paths
                .database_file
                .file_name()
                .ok_or_else(|| BackupError::InvalidArtifact("database path has no file name".into()))?;
            fs::copy(&self.paths.database_file, db_dir.join(file_name))?;
            files.push(format!("database/{}", file_name.to_string_lossy()));
        }

        let export = self.storage.export_snapshot()?;
        fs::write(db_dir.join(EXPORT_FILE), serde_json::to_vec_pretty(&export)?)?;
        files.push(format!("database/{EXPORT_FILE}"));
        Ok(())
    }

    fn stage_uploads(&self, staging: &Path, files: &mut Vec<String>) -> BackupResult<()> {
        if self.paths.uploads_dir.exists() {
            copy_dir(&self.paths.uploads_dir, &staging.join("uploads"))?;
            files.push("uploads/".to_string());
        }
        Ok(())
    }

    fn stage_config(&self, staging: &Path, files: &mut Vec<String>) -> BackupResult<()> {
        let config_dir = staging.join("config");
        fs::create_dir_all(&config_dir)?;

        let mut sources = vec![self.paths.config_file.clone()];
        sources.extend(self.paths.extra_config_files.iter().cloned());

        for source in sources {
            if !source.exists() {
                continue;
            }
            let Some(file_name) = source.file_name() else {
                continue;
            };
            fs::copy(&source, config_dir.join(file_name))?;
            files.push(format!("config/{}", file_name.to_string_lossy()));
        }
        Ok(())
    }

    /// Application metadata: enough to know what produced the artifact
    fn stage_app_metadata(&self, staging: &Path, files: &mut Vec<String>) -> BackupResult<()> {
        let app_dir = staging.join("app_files");
        fs::create_dir_all(&app_dir)?;
        let info = serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "export_version": crate::db::export::EXPORT_VERSION,
        });
        fs::write(app_dir.join("app_info.json"), serde_json::to_vec_pretty(&info)?)?;
        files.push("app_files/app_info.json".to_string());
        Ok(())
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Remove every artifact beyond `max_backups`, oldest first.
    /// Returns the number of removed artifacts.
    pub fn cleanup_retention(&self) -> BackupResult<usize> {
        let max_backups = self.config().max_backups;
        let entries = self.list_backups()?;

        let mut removed = 0;
        for entry in entries.into_iter().skip(max_backups) {
            let path = PathBuf::from(&entry.path);
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            tracing::info!(artifact = %entry.name, "Old backup removed");
            removed += 1;
        }
        Ok(removed)
    }

    // =========================================================================
    // List
    // =========================================================================

    /// Enumerate artifacts, newest first
    ///
    /// Reads each artifact's manifest; when it is missing or unreadable the
    /// entry degrades to filesystem creation time and an `unknown` kind
    /// instead of failing the whole listing.
    pub fn list_backups(&self) -> BackupResult<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.paths.backup_dir)? {
            let path = dir_entry?.path();
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            // Skip temporary extraction dirs
            if name.starts_with('.') {
                continue;
            }

            let manifest = read_manifest(&path);
            let (kind, created_at) = match &manifest {
                Some(m) => (m.kind, m.created_at),
                None => (BackupKind::Unknown, fs_created_millis(&path)),
            };

            entries.push(BackupEntry {
                name,
                path: path.display().to_string(),
                kind,
                created_at,
                size_bytes: tree_size(&path).unwrap_or(0),
            });
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.name.cmp(&a.name)));
        Ok(entries)
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Restore an artifact over the live state
    ///
    /// A `pre_restore` backup of the current state is taken before anything
    /// is touched, so a restore is itself reversible. The replace steps are
    /// not atomic: a failure partway leaves a partially-restored state, and
    /// the pre-restore artifact is the recovery path.
    pub fn restore_backup(&self, artifact_path: &Path) -> BackupResult<RestoreOutcome> {
        if !artifact_path.exists() {
            return Err(BackupError::NotFound(artifact_path.display().to_string()));
        }

        // Safety net before the first mutation. A plain create_backup: the
        // pre-restore backup itself never triggers another safety backup.
        let pre_restore = self.create_backup(BackupKind::PreRestore)?;

        let extracted;
        let root = if artifact_path.extension().is_some_and(|ext| ext == "zip") {
            let extract_dir = self
                .paths
                .backup_dir
                .join(format!(".restore_{}", now_millis()));
            extract_zip(artifact_path, &extract_dir)?;
            extracted = Some(extract_dir.clone());
            extract_dir
        } else {
            extracted = None;
            artifact_path.to_path_buf()
        };

        let result = self.apply_restore(&root);
        if let Some(tmp) = extracted {
            let _ = fs::remove_dir_all(tmp);
        }
        result?;

        tracing::info!(
            artifact = %artifact_path.display(),
            pre_restore = %pre_restore.artifact_path.display(),
            "Backup restored"
        );
        Ok(RestoreOutcome { pre_restore })
    }

    fn apply_restore(&self, root: &Path) -> BackupResult<()> {
        // Database: the portable export is applied through one write
        // transaction against the live store. The raw file copy is the
        // fallback for artifacts that carry no export (only safe while the
        // database is not open elsewhere).
        let db_dir = root.join("database");
        let export_file = db_dir.join(EXPORT_FILE);
        if export_file.exists() {
            let export: StoreExport = serde_json::from_slice(&fs::read(&export_file)?)?;
            self.storage.import_snapshot(&export)?;
        } else if let Some(file_name) = self.paths.database_file.file_name() {
            let raw = db_dir.join(file_name);
            if raw.exists() {
                fs::copy(&raw, &self.paths.database_file)?;
            }
        }

        // Uploads: full replace, never a merge
        let uploads_src = root.join("uploads");
        if uploads_src.exists() {
            if self.paths.uploads_dir.exists() {
                fs::remove_dir_all(&self.paths.uploads_dir)?;
            }
            copy_dir(&uploads_src, &self.paths.uploads_dir)?;
        }

        // Config files: overwrite in place, then pick up the restored config
        let config_src = root.join("config");
        if config_src.exists() {
            for entry in fs::read_dir(&config_src)? {
                let source = entry?.path();
                if !source.is_file() {
                    continue;
                }
                let Some(file_name) = source.file_name() else {
                    continue;
                };
                fs::copy(&source, self.config_restore_target(file_name))?;
            }
            self.reload_config();
        }

        Ok(())
    }

    /// Where a restored config file belongs: the registered path with the
    /// same file name, or next to the backup config file otherwise
    fn config_restore_target(&self, file_name: &std::ffi::OsStr) -> PathBuf {
        if self.paths.config_file.file_name() == Some(file_name) {
            return self.paths.config_file.clone();
        }
        for extra in &self.paths.extra_config_files {
            if extra.file_name() == Some(file_name) {
                return extra.clone();
            }
        }
        self.paths
            .config_file
            .parent()
            .unwrap_or(Path::new("."))
            .join(file_name)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Disk and backup-store figures
    pub fn system_status(&self) -> BackupResult<SystemStatus> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mut disk_total_bytes = 0;
        let mut disk_available_bytes = 0;
        let mut best_match = 0;
        for disk in disks.list() {
            let mount = disk.mount_point();
            if self.paths.backup_dir.starts_with(mount) {
                let depth = mount.components().count();
                if depth >= best_match {
                    best_match = depth;
                    disk_total_bytes = disk.total_space();
                    disk_available_bytes = disk.available_space();
                }
            }
        }

        let entries = self.list_backups()?;
        Ok(SystemStatus {
            disk_total_bytes,
            disk_available_bytes,
            backup_store_bytes: tree_size(&self.paths.backup_dir)?,
            total_backups: entries.len(),
            last_backup: self.config().last_backup,
        })
    }
}

// =============================================================================
// Filesystem helpers
// =============================================================================

/// Recursive directory copy
fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Total size of a file or directory tree in bytes
fn tree_size(path: &Path) -> std::io::Result<u64> {
    if path.is_file() {
        return Ok(fs::metadata(path)?.len());
    }
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        total += tree_size(&entry?.path())?;
    }
    Ok(total)
}

/// Filesystem creation time in epoch millis (modification time fallback)
fn fs_created_millis(path: &Path) -> i64 {
    let Ok(metadata) = fs::metadata(path) else {
        return 0;
    };
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Archive a staged directory into a single zip file (deflate)
fn compress_dir(src: &Path, zip_path: &Path) -> BackupResult<()> {
    let file = fs::File::create(zip_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options: FileOptions<()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    add_dir_to_zip(&mut zip, src, src, &options)?;
    zip.finish()?;
    Ok(())
}

fn add_dir_to_zip(
    zip: &mut zip::ZipWriter<fs::File>,
    base: &Path,
    dir: &Path,
    options: &FileOptions<()>,
) -> BackupResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            add_dir_to_zip(zip, base, &path, options)?;
        } else {
            let rel = path.strip_prefix(base).map_err(|_| {
                BackupError::InvalidArtifact(format!("path escapes staging: {}", path.display()))
            })?;
            zip.start_file(rel.to_string_lossy().replace('\\', "/"), options.clone())?;
            let mut file = fs::File::open(&path)?;
            std::io::copy(&mut file, zip)?;
        }
    }
    Ok(())
}

fn extract_zip(zip_path: &Path, target: &Path) -> BackupResult<()> {
    let file = fs::File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    fs::create_dir_all(target)?;
    archive.extract(target)?;
    Ok(())
}

/// Read an artifact's manifest: from the directory for uncompressed
/// artifacts, from inside the archive for zip artifacts. Any failure yields
/// `None` (degraded listing, never an error).
fn read_manifest(path: &Path) -> Option<BackupManifest> {
    if path.is_dir() {
        let bytes = fs::read(path.join(MANIFEST_FILE)).ok()?;
        return serde_json::from_slice(&bytes).ok();
    }
    if path.extension().is_some_and(|ext| ext == "zip") {
        let file = fs::File::open(path).ok()?;
        let mut archive = ZipArchive::new(file).ok()?;
        let mut entry = archive.by_name(MANIFEST_FILE).ok()?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).ok()?;
        return serde_json::from_slice(&bytes).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        manager: BackupManager,
        work_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().to_path_buf();
        let database_file = work_dir.join("store.redb");
        let storage = StoreStorage::open(&database_file).unwrap();

        let uploads_dir = work_dir.join("uploads");
        fs::create_dir_all(&uploads_dir).unwrap();
        fs::write(uploads_dir.join("logo.png"), b"fake image bytes").unwrap();

        let manager = BackupManager::new(
            storage.clone(),
            BackupPaths {
                backup_dir: work_dir.join("backups"),
                database_file,
                uploads_dir,
                config_file: work_dir.join("backup_config.json"),
                extra_config_files: vec![],
            },
        )
        .unwrap();

        Fixture {
            _dir: dir,
            manager,
            work_dir,
        }
    }

    #[test]
    fn test_create_backup_compressed_artifact() {
        let fixture = fixture();
        let outcome = fixture.manager.create_backup(BackupKind::Manual).unwrap();

        assert!(outcome.artifact_path.exists());
        assert!(outcome.artifact_path.extension().is_some_and(|e| e == "zip"));
        assert!(outcome.manifest.compressed);
        assert!(outcome.manifest.size_bytes > 0);
        assert!(
            outcome
                .manifest
                .files
                .iter()
                .any(|f| f == "database/export.json")
        );
        assert!(outcome.manifest.files.iter().any(|f| f == "uploads/"));

        // Staging directory was discarded after archiving
        let staging = outcome.artifact_path.with_extension("");
        assert!(!staging.exists());

        // last_backup was persisted
        assert_eq!(
            fixture.manager.config().last_backup,
            Some(outcome.manifest.created_at)
        );
    }

    #[test]
    fn test_create_backup_uncompressed_directory() {
        let fixture = fixture();
        fixture
            .manager
            .update_config(|c| c.compression_enabled = false)
            .unwrap();

        let outcome = fixture.manager.create_backup(BackupKind::Manual).unwrap();
        assert!(outcome.artifact_path.is_dir());
        assert!(outcome.artifact_path.join(MANIFEST_FILE).exists());
        assert!(outcome.artifact_path.join("database").join(EXPORT_FILE).exists());
    }

    #[test]
    fn test_list_backups_reads_manifest_from_zip() {
        let fixture = fixture();
        fixture.manager.create_backup(BackupKind::Auto).unwrap();

        let entries = fixture.manager.list_backups().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, BackupKind::Auto);
        assert!(entries[0].size_bytes > 0);

        let status = fixture.manager.system_status().unwrap();
        assert_eq!(status.total_backups, 1);
        assert!(status.backup_store_bytes > 0);
        assert!(status.last_backup.is_some());
    }

    #[test]
    fn test_list_backups_degrades_without_manifest() {
        let fixture = fixture();
        // A legacy artifact: directory without a manifest
        let legacy = fixture.work_dir.join("backups").join("backup_legacy");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join("something.db"), b"old").unwrap();

        let entries = fixture.manager.list_backups().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, BackupKind::Unknown);
        assert!(entries[0].created_at > 0);
    }

    #[test]
    fn test_restore_requires_existing_artifact() {
        let fixture = fixture();
        let result = fixture
            .manager
            .restore_backup(Path::new("/nonexistent/backup.zip"));
        assert!(matches!(result, Err(BackupError::NotFound(_))));
        // No safety backup was taken for a missing artifact
        assert!(fixture.manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_restore_takes_pre_restore_backup_and_replaces_uploads() {
        let fixture = fixture();
        let outcome = fixture.manager.create_backup(BackupKind::Manual).unwrap();

        // Mutate the uploads tree after the backup
        let uploads = fixture.work_dir.join("uploads");
        fs::write(uploads.join("extra.png"), b"added later").unwrap();
        fs::remove_file(uploads.join("logo.png")).unwrap();

        let restore = fixture
            .manager
            .restore_backup(&outcome.artifact_path)
            .unwrap();
        assert_eq!(restore.pre_restore.manifest.kind, BackupKind::PreRestore);
        assert!(restore.pre_restore.artifact_path.exists());

        // Full replace: the later file is gone, the original is back
        assert!(uploads.join("logo.png").exists());
        assert!(!uploads.join("extra.png").exists());

        // Exactly one pre_restore artifact exists
        let pre_restores: Vec<_> = fixture
            .manager
            .list_backups()
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == BackupKind::PreRestore)
            .collect();
        assert_eq!(pre_restores.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_backup_leaves_no_partial_artifact() {
        use std::os::unix::fs::symlink;

        let fixture = fixture();
        // A dangling symlink inside uploads makes the tree copy fail partway
        let uploads = fixture.work_dir.join("uploads");
        symlink(fixture.work_dir.join("missing"), uploads.join("broken")).unwrap();

        let result = fixture.manager.create_backup(BackupKind::Manual);
        assert!(result.is_err());

        // No staging directory or half-written zip remains
        let leftovers: Vec<_> = fs::read_dir(fixture.work_dir.join("backups"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");

        // last_backup untouched on failure
        assert_eq!(fixture.manager.config().last_backup, None);
    }
}
