/// Report Generation
///
/// Every report derives token status at call time through [`token_status`],
/// so reports always agree with each other.

pub mod deactivation;
pub mod status;

pub use deactivation::{DeactivationCheck, DeactivationOutcome, Deactivator};
pub use status::{days_remaining, token_status, whole_days, TokenStatus};

use crate::backup::BackupManager;
use crate::error::GalleryResult;
use crate::store::{Category, StoreHealth, TokenMap, TokenRecord, TokenStore};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// A token paired with its derived status
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenView<'a> {
    pub token: &'a str,
    pub record: &'a TokenRecord,
    pub status: TokenStatus,
}

/// Aggregate counts over every token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub inactive: usize,
    pub never_accessed: usize,
    pub total_downloads: usize,
}

/// Every token in detail plus the summary
#[derive(Debug, Clone)]
pub struct FullReport<'a> {
    pub entries: Vec<TokenView<'a>>,
    pub summary: ReportSummary,
}

/// An active token nobody has opened yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeverAccessed<'a> {
    pub token: &'a str,
    pub record: &'a TokenRecord,
    pub days_since_creation: i64,
}

/// A token about to expire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiringToken<'a> {
    pub token: &'a str,
    pub record: &'a TokenRecord,
    pub days_remaining: i64,
}

impl ExpiringToken<'_> {
    /// Expires within the current day
    pub fn is_urgent(&self) -> bool {
        self.days_remaining == 0
    }
}

/// Per-category totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    pub category: Category,
    pub total: usize,
    /// Tokens whose active flag is set, expired or not
    pub active: usize,
    pub accesses: usize,
    pub downloads: usize,
}

/// Overall health of the installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub files: StoreHealth,
    pub total: usize,
    /// Tokens whose active flag is set
    pub active: usize,
    pub inactive: usize,
    pub backups: usize,
}

/// Tokens with their status, oldest first
pub fn token_views(tokens: &TokenMap, now: NaiveDateTime) -> Vec<TokenView<'_>> {
    let mut views: Vec<TokenView<'_>> = tokens
        .iter()
        .map(|(token, record)| TokenView {
            token,
            record,
            status: token_status(record, now),
        })
        .collect();

    views.sort_by(|a, b| {
        a.record
            .created_at
            .cmp(&b.record.created_at)
            .then_with(|| a.token.cmp(b.token))
    });
    views
}

/// Detailed report of every token
pub fn full_report(tokens: &TokenMap, now: NaiveDateTime) -> FullReport<'_> {
    let entries = token_views(tokens, now);
    let mut summary = ReportSummary {
        total: entries.len(),
        ..ReportSummary::default()
    };

    for view in &entries {
        match view.status {
            TokenStatus::Active { .. } => summary.active += 1,
            TokenStatus::Expired => summary.expired += 1,
            TokenStatus::Inactive => summary.inactive += 1,
        }
        if view.record.accesses.is_empty() {
            summary.never_accessed += 1;
        }
        summary.total_downloads += view.record.download_count();
    }

    FullReport { entries, summary }
}

/// Tokens with the active flag set and no recorded access
pub fn never_accessed(tokens: &TokenMap, now: NaiveDateTime) -> Vec<NeverAccessed<'_>> {
    token_views(tokens, now)
        .into_iter()
        .filter(|v| v.record.active && v.record.accesses.is_empty())
        .map(|v| NeverAccessed {
            token: v.token,
            record: v.record,
            days_since_creation: whole_days(now - v.record.created_at),
        })
        .collect()
}

/// Active tokens with at most `threshold` whole days left, soonest first
pub fn expiring_soon(tokens: &TokenMap, now: NaiveDateTime, threshold: i64) -> Vec<ExpiringToken<'_>> {
    let mut expiring: Vec<ExpiringToken<'_>> = token_views(tokens, now)
        .into_iter()
        .filter_map(|v| match v.status {
            TokenStatus::Active { days_remaining } if days_remaining <= threshold => {
                Some(ExpiringToken {
                    token: v.token,
                    record: v.record,
                    days_remaining,
                })
            }
            _ => None,
        })
        .collect();

    // stable: equal days keep creation order
    expiring.sort_by_key(|e| e.days_remaining);
    expiring
}

/// Tokens currently in the ACTIVE status
pub fn active_tokens(tokens: &TokenMap, now: NaiveDateTime) -> Vec<TokenView<'_>> {
    token_views(tokens, now)
        .into_iter()
        .filter(|v| v.status.is_active())
        .collect()
}

/// Totals grouped by category, in category order
pub fn category_stats(tokens: &TokenMap) -> Vec<CategoryStats> {
    let mut stats: BTreeMap<Category, CategoryStats> = BTreeMap::new();

    for record in tokens.values() {
        let entry = stats.entry(record.category).or_insert_with(|| CategoryStats {
            category: record.category,
            total: 0,
            active: 0,
            accesses: 0,
            downloads: 0,
        });

        entry.total += 1;
        if record.active {
            entry.active += 1;
        }
        entry.accesses += record.access_count();
        entry.downloads += record.download_count();
    }

    stats.into_values().collect()
}

/// Check base files and count tokens and backups
pub fn system_status(store: &TokenStore, backups: &BackupManager) -> GalleryResult<SystemStatus> {
    let tokens = store.load_tokens()?;
    let active = tokens.values().filter(|r| r.active).count();

    Ok(SystemStatus {
        files: store.health(),
        total: tokens.len(),
        active,
        inactive: tokens.len() - active,
        backups: backups.count()?,
    })
}
