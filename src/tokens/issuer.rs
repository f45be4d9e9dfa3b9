/// Token issuing
use crate::{
    backup::{BackupManager, BackupSnapshot},
    config::{GalleryConfig, LinkConfig},
    error::{GalleryError, GalleryResult},
    store::{Category, Recovery, TokenMap, TokenRecord, TokenStore, MAX_VALIDITY_DAYS},
};
use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

/// Length of a token id
pub const TOKEN_LENGTH: usize = 12;

/// Phone numbers shorter than this get a soft warning
pub const MIN_PHONE_DIGITS: usize = 10;

/// Everything needed to issue a token
#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub client: String,
    pub category: Category,
    /// Empty means every album
    pub albums: Vec<String>,
    /// Digits only, may be empty
    pub phone: String,
    pub validity_days: u32,
}

/// A freshly issued token
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub record: TokenRecord,
    pub gallery_url: String,
    pub messaging_link: String,
    /// Backup failures do not undo the issue
    pub backup: GalleryResult<BackupSnapshot>,
    /// Set when the store was unreadable and got replaced by this issue
    pub recovered: Option<Recovery>,
}

/// A normalized phone number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub digits: String,
    /// Fewer digits than a country code plus area code plus number
    pub is_short: bool,
}

/// Creates tokens and persists them
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    store: TokenStore,
    backups: BackupManager,
    links: LinkConfig,
    default_validity_days: u32,
}

impl TokenIssuer {
    pub fn new(config: &GalleryConfig, store: TokenStore, backups: BackupManager) -> Self {
        Self {
            store,
            backups,
            links: config.links.clone(),
            default_validity_days: config.tokens.default_validity_days,
        }
    }

    pub fn default_validity_days(&self) -> u32 {
        self.default_validity_days
    }

    /// Issue a token valid from now
    pub fn issue(&self, request: NewToken) -> GalleryResult<IssuedToken> {
        self.issue_at(request, Local::now().naive_local())
    }

    /// Issue a token with an explicit clock
    pub fn issue_at(&self, request: NewToken, now: NaiveDateTime) -> GalleryResult<IssuedToken> {
        let client = request.client.trim().to_string();
        if client.is_empty() {
            return Err(GalleryError::Validation("Client name is required".to_string()));
        }

        let outcome = self.store.load()?;
        let recovered = outcome.recovered;
        let mut tokens = outcome.tokens;
        let token = generate_token_id(&tokens);

        let record = TokenRecord::new(
            client,
            request.category,
            request.albums,
            request.phone,
            request.validity_days,
            now,
        )?;
        tokens.insert(token.clone(), record.clone());

        self.store.save(&tokens)?;
        info!(
            "Issued token {} for {} ({}, {} days)",
            token, record.client, record.category, request.validity_days
        );

        let backup = self.backups.backup_after_write(self.store.path());

        let message = greeting(&record.client, &token, request.validity_days);
        let messaging_link = messaging_link(&self.links.messaging_url, &record.phone, &message);

        Ok(IssuedToken {
            token,
            record,
            gallery_url: self.links.gallery_url.clone(),
            messaging_link,
            backup,
            recovered,
        })
    }
}

/// Take the first characters of a random UUID, retrying on collision
pub fn generate_token_id(existing: &TokenMap) -> String {
    loop {
        let candidate: String = Uuid::new_v4().to_string().chars().take(TOKEN_LENGTH).collect();
        if !existing.contains_key(&candidate) {
            return candidate;
        }
        warn!("Token id collision on {}, regenerating", candidate);
    }
}

/// Keep digits only
pub fn normalize_phone(input: &str) -> PhoneNumber {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    PhoneNumber {
        is_short: !digits.is_empty() && digits.len() < MIN_PHONE_DIGITS,
        digits,
    }
}

/// Parse the validity prompt; blank means `default`
pub fn parse_validity_days(input: &str, default: u32) -> GalleryResult<u32> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default);
    }

    match input.parse::<u32>() {
        Ok(0) => Err(GalleryError::Validation(
            "Validity must be at least one day".to_string(),
        )),
        Ok(days) if days > MAX_VALIDITY_DAYS => Err(GalleryError::Validation(format!(
            "Validity cannot exceed {} days",
            MAX_VALIDITY_DAYS
        ))),
        Ok(days) => Ok(days),
        Err(_) => Err(GalleryError::Validation(format!(
            "Validity must be a whole number of days, got '{}'",
            input
        ))),
    }
}

/// Message sent to the client along with the token
pub fn greeting(client: &str, token: &str, validity_days: u32) -> String {
    format!(
        "Hello {}! Here is your access code: {}.\n\
         Open your gallery and remember you have {} days to download your photos.",
        client, token, validity_days
    )
}

/// Messaging deep link with the URL-encoded message
pub fn messaging_link(base: &str, phone: &str, message: &str) -> String {
    let base = base.trim_end_matches('/');
    let encoded = urlencoding::encode(message);
    if phone.is_empty() {
        format!("{}/?text={}", base, encoded)
    } else {
        format!("{}/{}?text={}", base, phone, encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn setup(dir: &std::path::Path) -> (TokenIssuer, TokenStore, BackupManager) {
        let config = GalleryConfig::with_data_dir(dir).unwrap();
        let store = TokenStore::new(&config.storage);
        store.ensure_initialized().unwrap();
        let backups = BackupManager::new(config.storage.backup_dir.clone(), config.backup.clone());
        let issuer = TokenIssuer::new(&config, store.clone(), backups.clone());
        (issuer, store, backups)
    }

    fn request(days: u32) -> NewToken {
        NewToken {
            client: "  Maria Clara ".to_string(),
            category: Category::Baptisms,
            albums: vec!["batizado_maria".to_string()],
            phone: "5579981234567".to_string(),
            validity_days: days,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 10)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_issue_persists_and_backs_up() {
        let dir = tempdir().unwrap();
        let (issuer, store, backups) = setup(dir.path());

        let issued = issuer.issue_at(request(30), now()).unwrap();

        assert_eq!(issued.token.len(), TOKEN_LENGTH);
        assert_eq!(issued.record.client, "Maria Clara");
        assert_eq!(issued.record.expires_at, now() + Duration::days(30));
        assert!(issued.record.active);
        assert!(issued.record.accesses.is_empty());
        assert!(issued.record.downloaded_photos.is_empty());
        assert!(issued.backup.is_ok());
        assert_eq!(backups.count().unwrap(), 1);

        let tokens = store.load_tokens().unwrap();
        assert_eq!(tokens.get(&issued.token), Some(&issued.record));
    }

    #[test]
    fn test_issue_custom_validity() {
        let dir = tempdir().unwrap();
        let (issuer, _, _) = setup(dir.path());

        let issued = issuer.issue_at(request(3), now()).unwrap();
        assert_eq!(issued.record.expires_at - issued.record.created_at, Duration::days(3));
    }

    #[test]
    fn test_issue_rejects_blank_client() {
        let dir = tempdir().unwrap();
        let (issuer, store, _) = setup(dir.path());

        let mut req = request(30);
        req.client = "   ".to_string();
        assert!(matches!(issuer.issue_at(req, now()), Err(GalleryError::Validation(_))));
        assert!(store.load_tokens().unwrap().is_empty());
    }

    #[test]
    fn test_issue_survives_backup_failure() {
        let dir = tempdir().unwrap();
        let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
        let store = TokenStore::new(&config.storage);
        store.ensure_initialized().unwrap();

        // A regular file where the backup directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        let backups = BackupManager::new(blocked, config.backup.clone());
        let issuer = TokenIssuer::new(&config, store.clone(), backups);

        let issued = issuer.issue_at(request(30), now()).unwrap();
        assert!(issued.backup.is_err());
        assert!(store.load_tokens().unwrap().contains_key(&issued.token));
    }

    #[test]
    fn test_token_ids_are_unique() {
        let mut tokens = TokenMap::new();
        let mut seen = HashSet::new();
        let record = TokenRecord::new(
            "x".to_string(),
            Category::Other,
            Vec::new(),
            String::new(),
            30,
            now(),
        ).unwrap();

        for _ in 0..1000 {
            let id = generate_token_id(&tokens);
            assert_eq!(id.len(), TOKEN_LENGTH);
            assert!(seen.insert(id.clone()));
            tokens.insert(id, record.clone());
        }
    }

    #[test]
    fn test_normalize_phone() {
        let phone = normalize_phone("+55 (79) 98123-4567");
        assert_eq!(phone.digits, "5579981234567");
        assert!(!phone.is_short);

        let phone = normalize_phone("1234-5");
        assert_eq!(phone.digits, "12345");
        assert!(phone.is_short);

        assert_eq!(normalize_phone("   ").digits, "");
        assert!(!normalize_phone("").is_short);
    }

    #[test]
    fn test_parse_validity_days() {
        assert_eq!(parse_validity_days("", 30).unwrap(), 30);
        assert_eq!(parse_validity_days(" 45 ", 30).unwrap(), 45);
        assert!(matches!(parse_validity_days("abc", 30), Err(GalleryError::Validation(_))));
        assert!(matches!(parse_validity_days("0", 30), Err(GalleryError::Validation(_))));
        assert!(matches!(parse_validity_days("-5", 30), Err(GalleryError::Validation(_))));
        assert_eq!(parse_validity_days("36500", 30).unwrap(), MAX_VALIDITY_DAYS);
        assert!(matches!(
            parse_validity_days("100000000", 30),
            Err(GalleryError::Validation(_))
        ));
    }

    #[test]
    fn test_issue_rejects_huge_validity() {
        let dir = tempdir().unwrap();
        let (issuer, store, backups) = setup(dir.path());

        let result = issuer.issue_at(request(100_000_000), now());
        assert!(matches!(result, Err(GalleryError::Validation(_))));
        assert!(store.load_tokens().unwrap().is_empty());
        assert_eq!(backups.count().unwrap(), 0);
    }

    #[test]
    fn test_issue_over_corrupt_store_reports_recovery() {
        let dir = tempdir().unwrap();
        let (issuer, store, _) = setup(dir.path());
        std::fs::write(store.path(), "{ not json").unwrap();

        let issued = issuer.issue_at(request(30), now()).unwrap();
        assert!(matches!(issued.recovered, Some(Recovery::Malformed { .. })));
        assert_eq!(store.load_tokens().unwrap().len(), 1);

        let issued = issuer.issue_at(request(30), now()).unwrap();
        assert!(issued.recovered.is_none());
    }

    #[test]
    fn test_messaging_link() {
        let link = messaging_link("https://wa.me/", "5579981234567", "Hi Ana & co");
        assert_eq!(link, "https://wa.me/5579981234567?text=Hi%20Ana%20%26%20co");

        let link = messaging_link("https://wa.me", "", "a\nb");
        assert_eq!(link, "https://wa.me/?text=a%0Ab");
    }

    #[test]
    fn test_greeting_mentions_token_and_days() {
        let text = greeting("Ana", "abc123def456", 30);
        assert!(text.contains("Ana"));
        assert!(text.contains("abc123def456"));
        assert!(text.contains("30 days"));
    }
}
