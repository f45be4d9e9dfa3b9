/// Configuration management for the gallery token tool
use crate::error::{GalleryError, GalleryResult};
use crate::store::MAX_VALIDITY_DAYS;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    pub storage: StorageConfig,
    pub links: LinkConfig,
    pub tokens: TokenPolicy,
    pub backup: BackupPolicy,
    pub logging: LoggingConfig,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    /// JSON document holding every token record
    pub tokens_file: PathBuf,
    pub backup_dir: PathBuf,
    /// Access log written by the gallery front end; only created here
    pub access_log: PathBuf,
    /// Directory of album descriptor files (`<slug>.json`)
    pub albums_dir: PathBuf,
}

/// Client-facing links printed after a token is issued
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub gallery_url: String,
    /// Base of the messaging deep link, e.g. `https://wa.me`
    pub messaging_url: String,
}

/// Token issuing and reporting defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPolicy {
    pub default_validity_days: u32,
    pub expiring_soon_days: i64,
}

/// Backup retention policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupPolicy {
    /// Backups kept after every automatic snapshot
    pub auto_retain: usize,
    /// Backups kept by the operator-triggered cleanup
    pub manual_retain: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

const DEFAULT_GALLERY_URL: &str = "https://gabrielima-dev.github.io/Lima_Retratos/galeria.html";
const DEFAULT_MESSAGING_URL: &str = "https://wa.me";

impl GalleryConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> GalleryResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> GalleryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_directory: PathBuf = lookup("GALLERY_DATA_DIRECTORY")
            .unwrap_or_else(|| ".".to_string())
            .into();

        let path_or = |key: &str, default: &str| {
            lookup(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_directory.join(default))
        };

        let tokens_file = path_or("GALLERY_TOKENS_FILE", "tokens.json");
        let backup_dir = path_or("GALLERY_BACKUP_DIR", "backup_tokens");
        let access_log = path_or("GALLERY_ACCESS_LOG", "logs_acesso.json");
        let albums_dir = path_or("GALLERY_ALBUMS_DIR", "fotos");

        let gallery_url =
            lookup("GALLERY_URL").unwrap_or_else(|| DEFAULT_GALLERY_URL.to_string());
        let messaging_url =
            lookup("GALLERY_MESSAGING_URL").unwrap_or_else(|| DEFAULT_MESSAGING_URL.to_string());

        let default_validity_days = parse_var(&lookup, "GALLERY_DEFAULT_VALIDITY_DAYS", 30)?;
        let expiring_soon_days = parse_var(&lookup, "GALLERY_EXPIRING_SOON_DAYS", 7)?;
        let auto_retain = parse_var(&lookup, "GALLERY_BACKUP_AUTO_RETAIN", 10)?;
        let manual_retain = parse_var(&lookup, "GALLERY_BACKUP_MANUAL_RETAIN", 5)?;

        let level = lookup("RUST_LOG").unwrap_or_else(|| "warn".to_string());

        let config = GalleryConfig {
            storage: StorageConfig {
                data_directory,
                tokens_file,
                backup_dir,
                access_log,
                albums_dir,
            },
            links: LinkConfig {
                gallery_url,
                messaging_url: messaging_url.trim_end_matches('/').to_string(),
            },
            tokens: TokenPolicy {
                default_validity_days,
                expiring_soon_days,
            },
            backup: BackupPolicy {
                auto_retain,
                manual_retain,
            },
            logging: LoggingConfig { level },
        };

        config.validate()?;
        Ok(config)
    }

    /// Default layout rooted at `data_directory`
    pub fn with_data_dir(data_directory: &Path) -> GalleryResult<Self> {
        let dir = data_directory.to_string_lossy().into_owned();
        Self::from_lookup(|key| (key == "GALLERY_DATA_DIRECTORY").then(|| dir.clone()))
    }

    /// Validate configuration
    pub fn validate(&self) -> GalleryResult<()> {
        if self.tokens.default_validity_days == 0 {
            return Err(GalleryError::Validation(
                "Default validity must be at least one day".to_string(),
            ));
        }

        if self.tokens.default_validity_days > MAX_VALIDITY_DAYS {
            return Err(GalleryError::Validation(format!(
                "Default validity cannot exceed {} days",
                MAX_VALIDITY_DAYS
            )));
        }

        if self.tokens.expiring_soon_days < 0 {
            return Err(GalleryError::Validation(
                "Expiring-soon threshold cannot be negative".to_string(),
            ));
        }

        if self.backup.auto_retain == 0 || self.backup.manual_retain == 0 {
            return Err(GalleryError::Validation(
                "Backup retention counts must be at least 1".to_string(),
            ));
        }

        if self.links.gallery_url.is_empty() || self.links.messaging_url.is_empty() {
            return Err(GalleryError::Validation(
                "Gallery and messaging URLs cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> GalleryResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GalleryError::Validation(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}
