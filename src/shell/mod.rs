/// Menu Shell
///
/// Numbered text menus for an operator session. All terminal I/O goes
/// through [`Console`], so whole sessions can be scripted in tests.

pub mod console;
pub mod issue_flow;
pub mod render;

pub use console::{Console, ScriptedConsole, TerminalConsole};

use crate::{
    backup::BackupManager,
    config::GalleryConfig,
    error::{GalleryError, GalleryResult},
    reports::{self, DeactivationCheck, DeactivationOutcome, Deactivator},
    store::{Recovery, TokenMap, TokenStore},
    tokens::TokenIssuer,
};
use chrono::{Local, NaiveDateTime};
use tracing::{error, warn};

/// Interactive operator session
pub struct Shell<C: Console> {
    console: C,
    config: GalleryConfig,
    store: TokenStore,
    backups: BackupManager,
    issuer: TokenIssuer,
    deactivator: Deactivator,
}

impl<C: Console> Shell<C> {
    pub fn new(console: C, config: GalleryConfig) -> Self {
        let store = TokenStore::new(&config.storage);
        let backups = BackupManager::new(config.storage.backup_dir.clone(), config.backup.clone());
        let issuer = TokenIssuer::new(&config, store.clone(), backups.clone());
        let deactivator = Deactivator::new(store.clone(), backups.clone());

        Self {
            console,
            config,
            store,
            backups,
            issuer,
            deactivator,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Create base files and greet the operator on first run
    pub fn initialize(&mut self) -> GalleryResult<()> {
        if self.store.ensure_initialized()? {
            self.say_all(&[
                "",
                "FIRST RUN DETECTED",
                "Base files created.",
                "",
                "Tips:",
                "1. Keep one album descriptor per client in the albums directory",
                "2. Always test links before sending them to clients",
                "3. A backup is taken after every change",
                "4. Use the reports to follow gallery usage",
            ]);
            self.pause_or_stop()?;
        }
        Ok(())
    }

    /// Main menu loop; returns when the operator quits or interrupts at the menu
    pub fn run(&mut self) -> GalleryResult<()> {
        loop {
            self.console.clear();
            self.show_header();
            self.say_all(&[
                "",
                "MAIN MENU",
                "1. Issue a new client token",
                "2. Reports and statistics",
                "3. Manage backups",
                "4. System status",
                "5. Help",
                "6. Quit",
            ]);

            let choice = match self.console.prompt("\nChoose an option: ") {
                Ok(choice) => choice,
                Err(GalleryError::Interrupted) => break,
                Err(e) => return Err(e),
            };

            match choice.trim() {
                "1" => {
                    let albums_dir = &self.config.storage.albums_dir;
                    let result =
                        issue_flow::run(&mut self.console, &self.issuer, albums_dir).map(|_| ());
                    self.finish("issuing token", result)?;
                }
                "2" => self.reports_menu()?,
                "3" => self.backup_menu()?,
                "4" => {
                    let result = self.show_system_status();
                    self.finish("checking status", result)?;
                }
                "5" => {
                    let lines = render::help(&self.config);
                    self.say_lines(lines);
                    self.finish("showing help", Ok(()))?;
                }
                "6" => break,
                _ => {
                    self.console.say("Invalid option, choose 1 to 6.");
                    self.pause_or_stop()?;
                }
            }
        }

        self.console.say("\nGoodbye!");
        Ok(())
    }

    fn reports_menu(&mut self) -> GalleryResult<()> {
        loop {
            for line in render::banner("REPORTS", 50) {
                self.console.say(&line);
            }
            let expiring = format!(
                "3. Tokens expiring ({} days)",
                self.config.tokens.expiring_soon_days
            );
            self.say_all(&[
                "1. Full report",
                "2. Clients that never accessed",
                expiring.as_str(),
                "4. Deactivate token",
                "5. Active tokens only",
                "6. Statistics by category",
                "7. Back",
            ]);

            let choice = match self.console.prompt("\nChoose an option: ") {
                Ok(choice) => choice,
                Err(GalleryError::Interrupted) => return Ok(()),
                Err(e) => return Err(e),
            };

            let result = match choice.trim() {
                "1" => self.show_full_report(),
                "2" => self.show_never_accessed(),
                "3" => self.show_expiring(),
                "4" => self.deactivate_flow(),
                "5" => self.show_active(),
                "6" => self.show_category_stats(),
                "7" => return Ok(()),
                _ => {
                    self.console.say("Invalid option.");
                    Ok(())
                }
            };
            self.finish("generating report", result)?;
        }
    }

    fn backup_menu(&mut self) -> GalleryResult<()> {
        loop {
            for line in render::banner("BACKUP MANAGEMENT", 50) {
                self.console.say(&line);
            }
            let cleanup = format!(
                "3. Clean up old backups (keep newest {})",
                self.backups.policy().manual_retain
            );
            self.say_all(&[
                "1. Create backup now",
                "2. List backups",
                cleanup.as_str(),
                "4. Back",
            ]);

            let choice = match self.console.prompt("\nChoose an option: ") {
                Ok(choice) => choice,
                Err(GalleryError::Interrupted) => return Ok(()),
                Err(e) => return Err(e),
            };

            let result = match choice.trim() {
                "1" => self.manual_backup(),
                "2" => self.show_backups(),
                "3" => self.cleanup_flow(),
                "4" => return Ok(()),
                _ => {
                    self.console.say("Invalid option.");
                    Ok(())
                }
            };
            self.finish("managing backups", result)?;
        }
    }

    /// Report the outcome of one operation and wait for the operator
    ///
    /// Only a failure of the console itself ends the menu loop.
    fn finish(&mut self, what: &str, result: GalleryResult<()>) -> GalleryResult<()> {
        match result {
            Ok(()) => {}
            Err(GalleryError::Interrupted) => {
                self.console.say("\nOperation cancelled.");
                return Ok(());
            }
            Err(GalleryError::NotFound(message)) => {
                self.console.say(&message);
            }
            Err(e) => {
                error!("Error while {}: {}", what, e);
                self.console.say(&format!("Error while {}: {}", what, e));
            }
        }
        self.pause_or_stop()
    }

    fn pause_or_stop(&mut self) -> GalleryResult<()> {
        match self.console.pause() {
            Err(GalleryError::Interrupted) => Ok(()),
            other => other,
        }
    }

    fn load_tokens(&mut self) -> GalleryResult<TokenMap> {
        let outcome = self.store.load()?;
        match &outcome.recovered {
            Some(Recovery::Empty) => {
                self.console.say("Token store is empty.");
            }
            Some(Recovery::Malformed {
                reason,
                preserved_at,
            }) => {
                warn!("Token store unreadable: {}", reason);
                self.console
                    .say("Token store is corrupted and will be recreated on the next change.");
                if let Some(path) = preserved_at {
                    self.console
                        .say(&format!("A copy was kept at {}", path.display()));
                }
            }
            None => {}
        }
        Ok(outcome.tokens)
    }

    fn show_header(&mut self) {
        let now = Local::now().naive_local();
        self.console.say(&render::rule('=', 70));
        self.console.say("PHOTO GALLERY TOKEN MANAGER");
        self.console.say(&render::format_date_time(&now));
        self.console.say(&render::rule('=', 70));
    }

    fn show_full_report(&mut self) -> GalleryResult<()> {
        let tokens = self.load_tokens()?;
        let lines = render::render_full_report(&reports::full_report(&tokens, now()));
        self.say_lines(lines);
        Ok(())
    }

    fn show_never_accessed(&mut self) -> GalleryResult<()> {
        let tokens = self.load_tokens()?;
        let lines = render::render_never_accessed(
            &reports::never_accessed(&tokens, now()),
            &self.config.links.gallery_url,
        );
        self.say_lines(lines);
        Ok(())
    }

    fn show_expiring(&mut self) -> GalleryResult<()> {
        let threshold = self.config.tokens.expiring_soon_days;
        let tokens = self.load_tokens()?;
        let expiring = reports::expiring_soon(&tokens, now(), threshold);
        let lines = render::render_expiring(&expiring, threshold);
        self.say_lines(lines);
        Ok(())
    }

    fn show_active(&mut self) -> GalleryResult<()> {
        let tokens = self.load_tokens()?;
        let lines = render::render_active(&reports::active_tokens(&tokens, now()));
        self.say_lines(lines);
        Ok(())
    }

    fn show_category_stats(&mut self) -> GalleryResult<()> {
        let tokens = self.load_tokens()?;
        let lines = render::render_category_stats(&reports::category_stats(&tokens));
        self.say_lines(lines);
        Ok(())
    }

    fn show_system_status(&mut self) -> GalleryResult<()> {
        let status = reports::system_status(&self.store, &self.backups)?;
        self.say_lines(render::render_system_status(&status));
        Ok(())
    }

    fn deactivate_flow(&mut self) -> GalleryResult<()> {
        self.console.say("\nACTIVE TOKENS:");
        self.show_active()?;

        let token = self.console.prompt("\nToken to deactivate: ")?;
        let token = token.trim();

        let record = match self.deactivator.check(token)? {
            DeactivationCheck::AlreadyInactive { .. } => {
                self.console.say("Token is already inactive.");
                return Ok(());
            }
            DeactivationCheck::Ready { record } => record,
        };

        let answer = self.console.prompt(&format!(
            "Deactivate the token of client '{}'? (y/N): ",
            record.client
        ))?;
        if !is_yes(&answer) {
            self.console.say("Operation cancelled.");
            return Ok(());
        }

        match self.deactivator.deactivate(token)? {
            DeactivationOutcome::Deactivated { client, backup, .. } => {
                if let Err(e) = backup {
                    self.console.say(&format!("Warning: backup failed: {}", e));
                }
                self.console
                    .say(&format!("Token of client '{}' was deactivated.", client));
            }
            DeactivationOutcome::AlreadyInactive { .. } => {
                self.console.say("Token is already inactive.");
            }
        }
        Ok(())
    }

    fn manual_backup(&mut self) -> GalleryResult<()> {
        self.console.say("\nCreating backup...");
        let snapshot = self.backups.backup_now(self.store.path())?;
        self.console
            .say(&format!("Backup created: {}", snapshot.path.display()));
        for name in &snapshot.pruned {
            self.console.say(&format!("Removed old backup: {}", name));
        }
        Ok(())
    }

    fn show_backups(&mut self) -> GalleryResult<()> {
        let backups = self.backups.list()?;
        self.say_lines(render::render_backups(&backups));
        Ok(())
    }

    fn cleanup_flow(&mut self) -> GalleryResult<()> {
        let plan = self.backups.plan_cleanup()?;
        if plan.is_noop() {
            self.console.say(&format!(
                "{} backups found, nothing to clean up (keeping {}).",
                plan.total, plan.retain
            ));
            return Ok(());
        }

        self.console.say(&format!("Found {} backups.", plan.total));
        self.console.say(&format!(
            "Keeping the newest {}, removing {}.",
            plan.retain,
            plan.to_remove.len()
        ));

        let answer = self.console.prompt("Confirm cleanup? (y/N): ")?;
        if !is_yes(&answer) {
            self.console.say("Operation cancelled.");
            return Ok(());
        }

        let removed = self.backups.cleanup()?;
        for name in &removed {
            self.console.say(&format!("Removed: {}", name));
        }
        self.console
            .say(&format!("{} old backups removed.", removed.len()));
        Ok(())
    }

    fn say_all(&mut self, lines: &[&str]) {
        for line in lines {
            self.console.say(line);
        }
    }

    fn say_lines(&mut self, lines: Vec<String>) {
        for line in &lines {
            self.console.say(line);
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Accept `y`, `yes` and the Portuguese `s`/`sim`
fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    )
}
