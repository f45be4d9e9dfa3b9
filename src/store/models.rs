/// Token store data models
///
/// Field names on disk are the ones read by the gallery front end and must not change.
use crate::error::{GalleryError, GalleryResult};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every token record, keyed by token id
pub type TokenMap = BTreeMap<String, TokenRecord>;

/// Longest validity accepted for a token (about a century)
pub const MAX_VALIDITY_DAYS: u32 = 36_500;

/// Session category of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Baptisms,
    ExpectantMothers,
    Masses,
    Other,
}

impl Category {
    /// Categories in menu order
    pub const ALL: [Category; 4] = [
        Category::Baptisms,
        Category::ExpectantMothers,
        Category::Masses,
        Category::Other,
    ];

    /// Label stored in the token file
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Baptisms => "Batizados",
            Category::ExpectantMothers => "Gestantes",
            Category::Masses => "Missas",
            Category::Other => "Outros",
        }
    }

    /// Operator-facing name
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Baptisms => "Baptisms",
            Category::ExpectantMothers => "Expectant-Mothers",
            Category::Masses => "Masses",
            Category::Other => "Other",
        }
    }

    /// Parse a stored or typed label; anything unrecognized is `Other`
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| {
                c.as_str().eq_ignore_ascii_case(label) || c.display_name().eq_ignore_ascii_case(label)
            })
            .unwrap_or(Category::Other)
    }

    /// Parse a 1-based menu choice; anything unrecognized is `Other`
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => Category::Baptisms,
            "2" => Category::ExpectantMothers,
            "3" => Category::Masses,
            _ => Category::Other,
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single client token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "cliente")]
    pub client: String,

    #[serde(rename = "categoria")]
    pub category: Category,

    /// Primary album, the first of `allowed_albums`
    #[serde(rename = "pasta", default)]
    pub album: String,

    /// Empty means every album
    #[serde(rename = "pastas_permitidas", default)]
    pub allowed_albums: Vec<String>,

    /// Digits only, may be empty
    #[serde(rename = "whatsapp", default)]
    pub phone: String,

    #[serde(rename = "downloads_permitidos", default = "default_true")]
    pub downloads_allowed: bool,

    /// Appended by the gallery front end
    #[serde(rename = "fotos_baixadas", default)]
    pub downloaded_photos: Vec<String>,

    /// ISO-8601 access times appended by the gallery front end
    #[serde(rename = "acessos", default)]
    pub accesses: Vec<String>,

    #[serde(rename = "criado_em", with = "timestamp")]
    pub created_at: NaiveDateTime,

    #[serde(rename = "expira_em", with = "timestamp")]
    pub expires_at: NaiveDateTime,

    #[serde(rename = "ativo", default = "default_true")]
    pub active: bool,

    #[serde(
        rename = "desativado_em",
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub deactivated_at: Option<NaiveDateTime>,

    /// Fields written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl TokenRecord {
    /// Create a fresh, active record valid for `validity_days` from `now`
    ///
    /// Fails when the validity is zero, above [`MAX_VALIDITY_DAYS`] or
    /// would move the expiry past the representable date range.
    pub fn new(
        client: String,
        category: Category,
        allowed_albums: Vec<String>,
        phone: String,
        validity_days: u32,
        now: NaiveDateTime,
    ) -> GalleryResult<Self> {
        if validity_days == 0 || validity_days > MAX_VALIDITY_DAYS {
            return Err(GalleryError::Validation(format!(
                "Validity must be between 1 and {} days, got {}",
                MAX_VALIDITY_DAYS, validity_days
            )));
        }

        let expires_at = now
            .checked_add_signed(Duration::days(i64::from(validity_days)))
            .ok_or_else(|| {
                GalleryError::Validation(format!(
                    "Expiry {} days after {} is out of range",
                    validity_days, now
                ))
            })?;

        Ok(Self {
            client,
            category,
            album: allowed_albums.first().cloned().unwrap_or_default(),
            allowed_albums,
            phone,
            downloads_allowed: true,
            downloaded_photos: Vec::new(),
            accesses: Vec::new(),
            created_at: now,
            expires_at,
            active: true,
            deactivated_at: None,
            extra: serde_json::Map::new(),
        })
    }

    pub fn access_count(&self) -> usize {
        self.accesses.len()
    }

    pub fn download_count(&self) -> usize {
        self.downloaded_photos.len()
    }

    /// Most recent access, if it parses
    pub fn last_access(&self) -> Option<NaiveDateTime> {
        self.accesses.last().and_then(|s| timestamp::parse(s))
    }

    /// Human-readable album list
    pub fn albums_label(&self) -> String {
        if !self.allowed_albums.is_empty() {
            self.allowed_albums.join(", ")
        } else if !self.album.is_empty() {
            self.album.clone()
        } else {
            "All albums".to_string()
        }
    }
}

/// ISO-8601 timestamps as naive local time
///
/// Written with microseconds; reading also accepts an offset or `Z` suffix,
/// which is converted to local time.
pub mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        raw.parse::<NaiveDateTime>().ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
                None => Ok(None),
            }
        }
    }
}
