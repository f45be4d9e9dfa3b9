/// Manual token deactivation
use crate::{
    backup::{BackupManager, BackupSnapshot},
    error::{GalleryError, GalleryResult},
    store::{TokenRecord, TokenStore},
};
use chrono::{Local, NaiveDateTime};
use tracing::info;

/// State of a token before asking the operator to confirm
#[derive(Debug, Clone, PartialEq)]
pub enum DeactivationCheck {
    /// Active flag set; `record` is the current state
    Ready { record: TokenRecord },
    AlreadyInactive { record: TokenRecord },
}

/// Result of a deactivation request
#[derive(Debug)]
pub enum DeactivationOutcome {
    Deactivated {
        client: String,
        deactivated_at: NaiveDateTime,
        backup: GalleryResult<BackupSnapshot>,
    },
    /// Nothing changed; the earlier deactivation time is kept
    AlreadyInactive {
        client: String,
        deactivated_at: Option<NaiveDateTime>,
    },
}

/// Deactivates tokens on operator request
#[derive(Debug, Clone)]
pub struct Deactivator {
    store: TokenStore,
    backups: BackupManager,
}

impl Deactivator {
    pub fn new(store: TokenStore, backups: BackupManager) -> Self {
        Self { store, backups }
    }

    /// Look up a token by exact id
    pub fn check(&self, token: &str) -> GalleryResult<DeactivationCheck> {
        let tokens = self.store.load_tokens()?;
        let record = tokens
            .get(token)
            .cloned()
            .ok_or_else(|| GalleryError::NotFound(format!("Token {} not found", token)))?;

        Ok(if record.active {
            DeactivationCheck::Ready { record }
        } else {
            DeactivationCheck::AlreadyInactive { record }
        })
    }

    /// Deactivate now
    pub fn deactivate(&self, token: &str) -> GalleryResult<DeactivationOutcome> {
        self.deactivate_at(token, Local::now().naive_local())
    }

    /// Clear the active flag and stamp the deactivation time
    pub fn deactivate_at(&self, token: &str, now: NaiveDateTime) -> GalleryResult<DeactivationOutcome> {
        let mut tokens = self.store.load_tokens()?;
        let record = tokens
            .get_mut(token)
            .ok_or_else(|| GalleryError::NotFound(format!("Token {} not found", token)))?;

        if !record.active {
            return Ok(DeactivationOutcome::AlreadyInactive {
                client: record.client.clone(),
                deactivated_at: record.deactivated_at,
            });
        }

        record.active = false;
        record.deactivated_at = Some(now);
        let client = record.client.clone();

        self.store.save(&tokens)?;
        info!("Deactivated token {} ({})", token, client);

        let backup = self.backups.backup_after_write(self.store.path());

        Ok(DeactivationOutcome::Deactivated {
            client,
            deactivated_at: now,
            backup,
        })
    }
}
