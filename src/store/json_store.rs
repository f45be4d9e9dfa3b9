/// JSON-file token store
use crate::{
    config::StorageConfig,
    error::GalleryResult,
    store::models::{timestamp, TokenMap},
};
use chrono::Local;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Infix of the file names used for copies of a corrupted store
const CORRUPT_MARKER: &str = "corrupt-";

/// Why `load` fell back to an empty mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    /// The file exists but holds nothing
    Empty,
    /// The file could not be parsed; a copy is kept at `preserved_at` when possible
    Malformed {
        reason: String,
        preserved_at: Option<PathBuf>,
    },
}

/// Result of loading the store
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub tokens: TokenMap,
    pub recovered: Option<Recovery>,
}

/// Presence of the files the tool and the gallery rely on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHealth {
    pub tokens_file: bool,
    pub backup_dir: bool,
    pub access_log: bool,
}

impl StoreHealth {
    pub fn is_ok(&self) -> bool {
        self.tokens_file && self.backup_dir && self.access_log
    }
}

/// Token store backed by a single JSON document
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    backup_dir: PathBuf,
    access_log: PathBuf,
}

impl TokenStore {
    /// Create a store from the storage configuration
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.tokens_file.clone(),
            backup_dir: config.backup_dir.clone(),
            access_log: config.access_log.clone(),
        }
    }

    /// Path of the token document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the token file, backup directory and access log when missing
    ///
    /// Returns `true` when the token file did not exist before (first run).
    pub fn ensure_initialized(&self) -> GalleryResult<bool> {
        let first_run = !self.path.exists();

        if first_run {
            ensure_parent(&self.path)?;
            fs::write(&self.path, "{}")?;
            info!("Created token store at {:?}", self.path);
        }

        if !self.backup_dir.exists() {
            fs::create_dir_all(&self.backup_dir)?;
            info!("Created backup directory {:?}", self.backup_dir);
        }

        if !self.access_log.exists() {
            ensure_parent(&self.access_log)?;
            fs::write(&self.access_log, "[]")?;
            info!("Created access log {:?}", self.access_log);
        }

        Ok(first_run)
    }

    /// Load every token
    ///
    /// A missing, empty or unparsable file yields an empty mapping. Other
    /// read failures are returned as errors.
    pub fn load(&self) -> GalleryResult<LoadOutcome> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Token store {:?} not found, starting empty", self.path);
                return Ok(LoadOutcome {
                    tokens: TokenMap::new(),
                    recovered: None,
                });
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Ok(self.recover_malformed(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            warn!("Token store {:?} is empty, treating as no tokens", self.path);
            return Ok(LoadOutcome {
                tokens: TokenMap::new(),
                recovered: Some(Recovery::Empty),
            });
        }

        match serde_json::from_str::<TokenMap>(&content) {
            Ok(tokens) => {
                debug!("Loaded {} tokens from {:?}", tokens.len(), self.path);
                Ok(LoadOutcome {
                    tokens,
                    recovered: None,
                })
            }
            Err(e) => Ok(self.recover_malformed(e.to_string())),
        }
    }

    /// Load every token, discarding the recovery signal
    pub fn load_tokens(&self) -> GalleryResult<TokenMap> {
        Ok(self.load()?.tokens)
    }

    /// Replace the whole document
    ///
    /// Writes a sibling temporary file and renames it over the store.
    pub fn save(&self, tokens: &TokenMap) -> GalleryResult<()> {
        ensure_parent(&self.path)?;

        let json = serde_json::to_string_pretty(tokens)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        info!("Saved {} tokens to {:?}", tokens.len(), self.path);
        Ok(())
    }

    /// Check which base files exist
    pub fn health(&self) -> StoreHealth {
        StoreHealth {
            tokens_file: self.path.is_file(),
            backup_dir: self.backup_dir.is_dir(),
            access_log: self.access_log.is_file(),
        }
    }

    fn recover_malformed(&self, reason: String) -> LoadOutcome {
        warn!("Token store {:?} is corrupted ({}), treating as no tokens", self.path, reason);

        let preserved_at = self.preserve_corrupt_copy();

        LoadOutcome {
            tokens: TokenMap::new(),
            recovered: Some(Recovery::Malformed {
                reason,
                preserved_at,
            }),
        }
    }

    /// Copy a corrupted store aside before it gets overwritten by the next save
    ///
    /// An existing copy with the same content is reused, so repeated loads of
    /// one corrupted file keep a single copy.
    fn preserve_corrupt_copy(&self) -> Option<PathBuf> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read the corrupted store: {}", e);
                return None;
            }
        };

        if let Some(existing) = self.find_corrupt_copy(&content) {
            debug!("Corrupted store already preserved at {:?}", existing);
            return Some(existing);
        }

        let stamp = timestamp::format(&Local::now().naive_local()).replace([':', '.'], "-");
        let copy = self.path.with_extension(format!("{}{}.json", CORRUPT_MARKER, stamp));

        match fs::write(&copy, &content) {
            Ok(()) => {
                warn!("Kept a copy of the corrupted store at {:?}", copy);
                Some(copy)
            }
            Err(e) => {
                warn!("Could not keep a copy of the corrupted store: {}", e);
                None
            }
        }
    }

    /// Earlier copy of the store holding exactly `content`
    fn find_corrupt_copy(&self, content: &[u8]) -> Option<PathBuf> {
        let stem = self.path.file_stem()?.to_string_lossy().into_owned();
        let prefix = format!("{}.{}", stem, CORRUPT_MARKER);
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Could not scan {:?} for corrupted copies: {}", dir, e);
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .find(|path| fs::read(path).map(|c| c == content).unwrap_or(false))
    }
}

fn ensure_parent(path: &Path) -> GalleryResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryConfig;
    use crate::store::models::{Category, TokenRecord};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> TokenStore {
        let config = GalleryConfig::with_data_dir(dir).unwrap();
        TokenStore::new(&config.storage)
    }

    fn sample_record() -> TokenRecord {
        let now = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        TokenRecord::new(
            "João".to_string(),
            Category::Masses,
            vec!["missa_maio".to_string()],
            "5579999999999".to_string(),
            30,
            now,
        ).unwrap()
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(!store.health().is_ok());
        assert!(store.ensure_initialized().unwrap());
        assert!(store.health().is_ok());
        assert_eq!(fs::read_to_string(dir.path().join("tokens.json")).unwrap(), "{}");
        assert_eq!(fs::read_to_string(dir.path().join("logs_acesso.json")).unwrap(), "[]");

        let mut tokens = TokenMap::new();
        tokens.insert("abc123def456".to_string(), sample_record());
        store.save(&tokens).unwrap();

        assert!(!store.ensure_initialized().unwrap());
        assert_eq!(store.load_tokens().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let outcome = store_in(dir.path()).load().unwrap();
        assert!(outcome.tokens.is_empty());
        assert!(outcome.recovered.is_none());
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), "   \n").unwrap();

        let outcome = store.load().unwrap();
        assert!(outcome.tokens.is_empty());
        assert_eq!(outcome.recovered, Some(Recovery::Empty));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), "{\"abc\": {\"cliente\": ").unwrap();

        let outcome = store.load().unwrap();
        assert!(outcome.tokens.is_empty());
        match outcome.recovered {
            Some(Recovery::Malformed { preserved_at, .. }) => {
                let copy = preserved_at.unwrap();
                assert_eq!(fs::read_to_string(copy).unwrap(), "{\"abc\": {\"cliente\": ");
            }
            other => panic!("expected malformed recovery, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_loads_keep_one_corrupt_copy() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), "{ not json").unwrap();

        let first = store.load().unwrap();
        let second = store.load().unwrap();
        assert_eq!(first.recovered, second.recovered);
        assert_eq!(corrupt_copies(dir.path()), 1);

        // Different corrupted content gets its own copy
        fs::write(store.path(), "[1, 2").unwrap();
        store.load().unwrap();
        assert_eq!(corrupt_copies(dir.path()), 2);
    }

    fn corrupt_copies(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with("tokens.corrupt-")
            })
            .count()
    }

    #[test]
    fn test_load_non_utf8_file() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), [0xff, 0xfe, 0x00]).unwrap();

        let outcome = store.load().unwrap();
        assert!(outcome.tokens.is_empty());
        assert!(matches!(outcome.recovered, Some(Recovery::Malformed { .. })));
    }

    #[test]
    fn test_save_and_load_keeps_non_ascii() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let mut tokens = TokenMap::new();
        tokens.insert("abc123def456".to_string(), sample_record());
        store.save(&tokens).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("João"));
        assert!(!dir.path().join("tokens.json.tmp").exists());

        let loaded = store.load_tokens().unwrap();
        assert_eq!(loaded, tokens);
    }
}
