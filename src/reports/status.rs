/// Token status derivation
use crate::store::TokenRecord;
use chrono::{Duration, NaiveDateTime};
use std::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// Effective status of a token, derived at read time and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active { days_remaining: i64 },
    Expired,
    Inactive,
}

impl TokenStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TokenStatus::Active { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TokenStatus::Active { .. } => "ACTIVE",
            TokenStatus::Expired => "EXPIRED",
            TokenStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Active { days_remaining } => {
                write!(f, "ACTIVE ({} days remaining)", days_remaining)
            }
            other => f.write_str(other.label()),
        }
    }
}

/// Classify a token
pub fn token_status(record: &TokenRecord, now: NaiveDateTime) -> TokenStatus {
    if !record.active {
        TokenStatus::Inactive
    } else if record.expires_at < now {
        TokenStatus::Expired
    } else {
        TokenStatus::Active {
            days_remaining: whole_days(record.expires_at - now),
        }
    }
}

/// Whole days in a span, rounded toward negative infinity
pub fn whole_days(span: Duration) -> i64 {
    span.num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Days until expiry, floored; negative once expired
pub fn days_remaining(record: &TokenRecord, now: NaiveDateTime) -> i64 {
    whole_days(record.expires_at - now)
}
