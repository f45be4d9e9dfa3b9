/// Operator sessions driven end to end through a scripted console
use chrono::{Duration, Local, NaiveDate};
use gallery_tokens::{
    backup::BackupManager,
    shell::{ScriptedConsole, Shell},
    store::{Category, TokenMap, TokenRecord, TokenStore},
    GalleryConfig,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run_session(config: &GalleryConfig, answers: &[&str]) -> ScriptedConsole {
    let mut shell = Shell::new(ScriptedConsole::new(answers.iter().copied()), config.clone());
    shell.initialize().unwrap();
    shell.run().unwrap();
    shell.into_console()
}

fn seed_token(config: &GalleryConfig, token: &str, client: &str) -> TokenStore {
    let store = TokenStore::new(&config.storage);
    store.ensure_initialized().unwrap();

    let mut tokens = TokenMap::new();
    tokens.insert(
        token.to_string(),
        TokenRecord::new(
            client.to_string(),
            Category::Masses,
            vec!["missa_natal".to_string()],
            String::new(),
            30,
            Local::now().naive_local(),
        ).unwrap(),
    );
    store.save(&tokens).unwrap();
    store
}

fn backup_manager(config: &GalleryConfig) -> BackupManager {
    BackupManager::new(config.storage.backup_dir.clone(), config.backup.clone())
}

#[test]
fn test_issue_then_deactivate() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();

    let console = run_session(
        &config,
        &["1", "Ana Lima", "1", "batizado_ana", "55 (11) 99999-8888", "", "6"],
    );
    let output = console.output();
    assert!(output.contains("FIRST RUN DETECTED"));
    assert!(output.contains("TOKEN CREATED"));
    assert!(output.contains("https://wa.me/5511999998888?text="));
    assert!(output.contains("Goodbye!"));

    let store = TokenStore::new(&config.storage);
    let tokens = store.load_tokens().unwrap();
    assert_eq!(tokens.len(), 1);
    let (token, record) = tokens.iter().next().unwrap();
    assert_eq!(record.client, "Ana Lima");
    assert_eq!(record.category, Category::Baptisms);
    assert_eq!(record.allowed_albums, vec!["batizado_ana"]);
    assert!(record.active);
    assert_eq!(backup_manager(&config).count().unwrap(), 1);

    let console = run_session(&config, &["2", "4", token.as_str(), "y", "7", "6"]);
    assert!(console.output().contains("Token of client 'Ana Lima' was deactivated."));

    let record = store.load_tokens().unwrap().remove(token).unwrap();
    assert!(!record.active);
    assert!(record.deactivated_at.is_some());

    // A second request changes nothing
    let console = run_session(&config, &["2", "4", token.as_str(), "7", "6"]);
    assert!(console.output().contains("Token is already inactive."));
    let again = store.load_tokens().unwrap().remove(token).unwrap();
    assert_eq!(again.deactivated_at, record.deactivated_at);
}

#[test]
fn test_declined_deactivation_keeps_token() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    let store = seed_token(&config, "abc123def456", "Bruno");

    let console = run_session(&config, &["2", "4", "abc123def456", "n", "7", "6"]);
    assert!(console.output().contains("Operation cancelled."));
    assert!(store.load_tokens().unwrap()["abc123def456"].active);
}

#[test]
fn test_unknown_token_is_reported() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    seed_token(&config, "abc123def456", "Bruno");

    let console = run_session(&config, &["2", "4", "nope", "7", "6"]);
    assert!(console.output().contains("Token nope not found"));
}

#[test]
fn test_reports_menu() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    seed_token(&config, "abc123def456", "Carla");

    let console = run_session(&config, &["2", "1", "2", "3", "5", "6", "7", "6"]);
    let output = console.output();

    assert!(output.contains("FULL TOKEN REPORT"));
    assert!(output.contains("CLIENTS THAT NEVER ACCESSED"));
    assert!(output.contains("?token=abc123def456"));
    assert!(output.contains("No token expires in the next 7 days."));
    assert!(output.contains("Carla | Token: abc123de... | 29 days remaining"));
    assert!(output.contains("STATISTICS BY CATEGORY"));
}

#[test]
fn test_backup_cleanup_keeps_newest() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    let store = seed_token(&config, "abc123def456", "Dani");
    let backups = backup_manager(&config);

    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    for i in 0..8 {
        backups
            .backup_at(store.path(), start + Duration::minutes(i))
            .unwrap();
    }

    let console = run_session(&config, &["3", "2", "3", "n", "3", "y", "4", "6"]);
    let output = console.output();

    assert!(output.contains("AVAILABLE BACKUPS:"));
    assert!(output.contains("Keeping the newest 5, removing 3."));
    assert!(output.contains("3 old backups removed."));

    let remaining: Vec<String> = backups.list().unwrap().into_iter().map(|b| b.file_name).collect();
    assert_eq!(remaining.len(), 5);
    assert_eq!(remaining[0], "tokens_backup_20250101_080300.json");
}

#[test]
fn test_corrupted_store_is_reported() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    fs::write(&config.storage.tokens_file, "{ not json").unwrap();

    let console = run_session(&config, &["2", "1", "7", "6"]);
    let output = console.output();

    assert!(output.contains("Token store is corrupted"));
    assert!(output.contains("No tokens found."));
    assert!(has_corrupt_copy(dir.path()));
}

#[test]
fn test_corrupted_store_keeps_single_copy() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    fs::write(&config.storage.tokens_file, "{ not json").unwrap();

    run_session(
        &config,
        &["2", "1", "1", "2", "5", "6", "4", "nope", "7", "4", "6"],
    );

    assert_eq!(corrupt_copies(dir.path()), 1);
}

#[test]
fn test_issue_over_corrupted_store_warns() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();
    fs::write(&config.storage.tokens_file, "{ not json").unwrap();

    let console = run_session(&config, &["1", "Gil", "4", "", "", "", "6"]);
    let output = console.output();

    assert!(output.contains("TOKEN CREATED"));
    assert!(output.contains("Warning: the token store was unreadable and now holds only this token."));
    assert!(output.contains("The unreadable file was kept at"));
    assert_eq!(corrupt_copies(dir.path()), 1);
    assert_eq!(TokenStore::new(&config.storage).load_tokens().unwrap().len(), 1);
}

#[test]
fn test_huge_validity_is_reprompted() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();

    let console = run_session(&config, &["1", "Hugo", "2", "", "", "100000000", "20", "6"]);
    assert!(console.output().contains("Validity cannot exceed 36500 days"));

    let tokens = TokenStore::new(&config.storage).load_tokens().unwrap();
    let record = tokens.values().next().unwrap();
    assert_eq!(record.expires_at - record.created_at, Duration::days(20));
}

#[test]
fn test_status_invalid_option_and_interrupt() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();

    // Running out of answers at the main menu ends the session
    let console = run_session(&config, &["9", "4", "5"]);
    let output = console.output();

    assert!(output.contains("Invalid option, choose 1 to 6."));
    assert!(output.contains("SYSTEM STATUS"));
    assert!(output.contains("Base files:      OK"));
    assert!(output.contains("WORKFLOW"));
    assert!(output.contains("Goodbye!"));
}

#[test]
fn test_interrupted_issue_returns_to_menu() {
    let dir = tempdir().unwrap();
    let config = GalleryConfig::with_data_dir(dir.path()).unwrap();

    let mut shell = Shell::new(ScriptedConsole::new(["1", "Eva"]), config.clone());
    shell.initialize().unwrap();
    shell.run().unwrap();
    let output = shell.console().output();

    assert!(output.contains("Operation cancelled."));
    assert!(TokenStore::new(&config.storage).load_tokens().unwrap().is_empty());
}

fn has_corrupt_copy(dir: &Path) -> bool {
    corrupt_copies(dir) > 0
}

fn corrupt_copies(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .contains("corrupt")
        })
        .count()
}
