/// Token store snapshots and retention for the gallery token tool
use crate::config::BackupPolicy;
use crate::error::{GalleryError, GalleryResult};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const BACKUP_PREFIX: &str = "tokens_backup_";
const BACKUP_SUFFIX: &str = ".json";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A snapshot that was just written
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    /// Older backups removed by the automatic retention pass
    pub pruned: Vec<String>,
}

/// Backup metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub file_name: String,
    pub path: PathBuf,
    /// Parsed from the file name; `None` if the name was edited by hand
    pub taken_at: Option<NaiveDateTime>,
    pub size_bytes: u64,
}

/// What an operator-triggered cleanup would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    pub total: usize,
    pub retain: usize,
    pub to_remove: Vec<String>,
}

impl CleanupPlan {
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty()
    }
}

/// Backup manager for the token store
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
    policy: BackupPolicy,
}

impl BackupManager {
    /// Create a new backup manager
    pub fn new(backup_dir: PathBuf, policy: BackupPolicy) -> Self {
        Self { backup_dir, policy }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn policy(&self) -> &BackupPolicy {
        &self.policy
    }

    /// Copy the store into a new timestamped snapshot, then apply automatic retention
    pub fn backup_now(&self, store_path: &Path) -> GalleryResult<BackupSnapshot> {
        self.backup_at(store_path, Local::now().naive_local())
    }

    /// Same as [`backup_now`](Self::backup_now) with an explicit clock
    pub fn backup_at(&self, store_path: &Path, now: NaiveDateTime) -> GalleryResult<BackupSnapshot> {
        if !store_path.exists() {
            return Err(GalleryError::NotFound(format!(
                "Token store not found: {:?}",
                store_path
            )));
        }

        fs::create_dir_all(&self.backup_dir)?;

        let path = self.backup_dir.join(backup_file_name(now));
        fs::copy(store_path, &path)?;
        info!("Backup created: {:?}", path);

        let pruned = self.prune(self.policy.auto_retain)?;

        Ok(BackupSnapshot { path, pruned })
    }

    /// Back up after a store mutation; failures are logged, never propagated
    pub fn backup_after_write(&self, store_path: &Path) -> GalleryResult<BackupSnapshot> {
        let result = self.backup_now(store_path);
        if let Err(e) = &result {
            warn!("Backup after write failed: {}", e);
        }
        result
    }

    /// Delete all but the newest `retain_count` backups
    ///
    /// Returns the names of the removed files. A file that cannot be removed
    /// is logged and skipped.
    pub fn prune(&self, retain_count: usize) -> GalleryResult<Vec<String>> {
        let backups = self.backup_file_names()?;
        if backups.len() <= retain_count {
            return Ok(Vec::new());
        }

        let excess = backups.len() - retain_count;
        let mut removed = Vec::with_capacity(excess);

        for name in backups.into_iter().take(excess) {
            let path = self.backup_dir.join(&name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted old backup: {}", name);
                    removed.push(name);
                }
                Err(e) => {
                    error!("Failed to delete backup {}: {}", name, e);
                }
            }
        }

        Ok(removed)
    }

    /// Describe the operator-triggered cleanup without deleting anything
    pub fn plan_cleanup(&self) -> GalleryResult<CleanupPlan> {
        let backups = self.backup_file_names()?;
        let retain = self.policy.manual_retain;
        let excess = backups.len().saturating_sub(retain);

        Ok(CleanupPlan {
            total: backups.len(),
            retain,
            to_remove: backups.into_iter().take(excess).collect(),
        })
    }

    /// Operator-triggered cleanup using the manual retention count
    pub fn cleanup(&self) -> GalleryResult<Vec<String>> {
        self.prune(self.policy.manual_retain)
    }

    /// List available backups, oldest first
    pub fn list(&self) -> GalleryResult<Vec<BackupMetadata>> {
        let mut backups = Vec::new();

        for file_name in self.backup_file_names()? {
            let path = self.backup_dir.join(&file_name);
            let size_bytes = match fs::metadata(&path) {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!("Failed to read metadata for {:?}: {}", path, e);
                    0
                }
            };

            backups.push(BackupMetadata {
                taken_at: parse_backup_timestamp(&file_name),
                file_name,
                path,
                size_bytes,
            });
        }

        Ok(backups)
    }

    /// Number of backups currently on disk
    pub fn count(&self) -> GalleryResult<usize> {
        Ok(self.backup_file_names()?.len())
    }

    /// Backup file names in lexicographic (chronological) order
    fn backup_file_names(&self) -> GalleryResult<Vec<String>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_backup_file_name(&name) && entry.path().is_file() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }
}

/// `tokens_backup_<YYYYMMDD_HHMMSS>.json`
pub fn backup_file_name(at: NaiveDateTime) -> String {
    format!("{}{}{}", BACKUP_PREFIX, at.format(STAMP_FORMAT), BACKUP_SUFFIX)
}

/// Recover the snapshot time from a backup file name
pub fn parse_backup_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stamp = file_name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

fn is_backup_file_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)
}
