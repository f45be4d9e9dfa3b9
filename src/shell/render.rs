/// Text rendering for reports and summaries
use crate::backup::BackupMetadata;
use crate::config::GalleryConfig;
use crate::reports::{
    CategoryStats, ExpiringToken, FullReport, NeverAccessed, SystemStatus, TokenStatus, TokenView,
};
use crate::store::Recovery;
use crate::tokens::IssuedToken;
use chrono::NaiveDateTime;

const DATE: &str = "%d/%m/%Y";
const DATE_TIME: &str = "%d/%m/%Y at %H:%M";

/// A horizontal rule of `width` characters
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// Title framed by rules
pub fn banner(title: &str, width: usize) -> Vec<String> {
    vec![String::new(), rule('=', width), title.to_string(), rule('=', width)]
}

pub fn format_date(at: &NaiveDateTime) -> String {
    at.format(DATE).to_string()
}

pub fn format_date_time(at: &NaiveDateTime) -> String {
    at.format(DATE_TIME).to_string()
}

/// Link a client opens to reach the gallery with the token prefilled
pub fn client_link(gallery_url: &str, token: &str) -> String {
    format!("{}?token={}", gallery_url, token)
}

pub fn render_issued(issued: &IssuedToken) -> Vec<String> {
    let record = &issued.record;
    let mut lines = banner("TOKEN CREATED", 50);

    lines.push(format!("Token:    {}", issued.token));
    lines.push(format!("Client:   {}", record.client));
    lines.push(format!("Category: {}", record.category));
    if record.allowed_albums.is_empty() {
        lines.push("Albums:   (none selected, all albums)".to_string());
    } else {
        lines.push("Albums:".to_string());
        lines.extend(record.allowed_albums.iter().map(|a| format!("   - {}", a)));
    }
    lines.push(format!("Valid until: {}", format_date_time(&record.expires_at)));

    match &issued.backup {
        Ok(snapshot) => lines.push(format!("Backup created: {}", snapshot.path.display())),
        Err(e) => lines.push(format!("Warning: backup failed: {}", e)),
    }
    if let Some(Recovery::Malformed { preserved_at, .. }) = &issued.recovered {
        lines.push("Warning: the token store was unreadable and now holds only this token.".to_string());
        if let Some(path) = preserved_at {
            lines.push(format!("The unreadable file was kept at {}", path.display()));
        }
    }

    lines.push(String::new());
    lines.push("Gallery link for the client:".to_string());
    lines.push(issued.gallery_url.clone());
    lines.push(String::new());
    if record.phone.is_empty() {
        lines.push("Copy and send this message:".to_string());
    } else {
        lines.push("Message ready to send:".to_string());
    }
    lines.push(issued.messaging_link.clone());
    lines.push(rule('=', 50));
    lines
}

pub fn render_full_report(report: &FullReport<'_>) -> Vec<String> {
    if report.entries.is_empty() {
        return vec!["No tokens found.".to_string()];
    }

    let mut lines = banner("FULL TOKEN REPORT", 80);
    for view in &report.entries {
        let record = view.record;
        let last_access = record
            .last_access()
            .map(|at| format_date_time(&at))
            .unwrap_or_else(|| "Never".to_string());

        lines.push(String::new());
        lines.push(record.client.clone());
        lines.push(format!("   Token:       {}", view.token));
        lines.push(format!("   Status:      {}", view.status));
        lines.push(format!("   Albums:      {} -> {}", record.category, record.albums_label()));
        lines.push(format!("   Created:     {}", format_date(&record.created_at)));
        lines.push(format!("   Last access: {}", last_access));
        lines.push(format!("   Accesses:    {}", record.access_count()));
        lines.push(format!("   Downloads:   {}", record.download_count()));
        lines.push(rule('-', 80));
    }

    let s = &report.summary;
    lines.extend(banner("SUMMARY", 80));
    lines.push(format!("Total tokens:    {}", s.total));
    lines.push(format!("Active:          {}", s.active));
    lines.push(format!("Expired:         {}", s.expired));
    lines.push(format!("Inactive:        {}", s.inactive));
    lines.push(format!("Never accessed:  {}", s.never_accessed));
    lines.push(format!("Total downloads: {}", s.total_downloads));
    lines.push(rule('=', 80));
    lines
}

pub fn render_never_accessed(entries: &[NeverAccessed<'_>], gallery_url: &str) -> Vec<String> {
    if entries.is_empty() {
        return vec!["Every active client has accessed the gallery.".to_string()];
    }

    let mut lines = banner("CLIENTS THAT NEVER ACCESSED", 60);
    for entry in entries {
        lines.push(String::new());
        lines.push(entry.record.client.clone());
        lines.push(format!("   Token:    {}", entry.token));
        lines.push(format!("   Category: {}", entry.record.category));
        lines.push(format!("   Created {} days ago", entry.days_since_creation));
        lines.push(format!("   Link:     {}", client_link(gallery_url, entry.token)));
    }
    lines.push(rule('=', 60));
    lines
}

pub fn render_expiring(entries: &[ExpiringToken<'_>], threshold: i64) -> Vec<String> {
    if entries.is_empty() {
        return vec![format!("No token expires in the next {} days.", threshold)];
    }

    let mut lines = banner(&format!("TOKENS EXPIRING WITHIN {} DAYS", threshold), 60);
    for entry in entries {
        let when = if entry.is_urgent() {
            "TODAY!".to_string()
        } else {
            format!("in {} day(s)", entry.days_remaining)
        };

        lines.push(String::new());
        lines.push(entry.record.client.clone());
        lines.push(format!("   Token:    {}", entry.token));
        lines.push(format!("   Expires:  {}", when));
        lines.push(format!("   Category: {}", entry.record.category));
        lines.push(format!("   Accesses: {}", entry.record.access_count()));
    }
    lines.push(rule('=', 60));
    lines
}

pub fn render_active(views: &[TokenView<'_>]) -> Vec<String> {
    if views.is_empty() {
        return vec!["No active tokens found.".to_string()];
    }

    views
        .iter()
        .map(|v| {
            let short: String = v.token.chars().take(8).collect();
            let days = match v.status {
                TokenStatus::Active { days_remaining } => days_remaining,
                _ => 0,
            };
            format!("{} | Token: {}... | {} days remaining", v.record.client, short, days)
        })
        .collect()
}

pub fn render_category_stats(stats: &[CategoryStats]) -> Vec<String> {
    if stats.is_empty() {
        return vec!["No tokens found.".to_string()];
    }

    let mut lines = banner("STATISTICS BY CATEGORY", 60);
    for s in stats {
        lines.push(String::new());
        lines.push(s.category.to_string());
        lines.push(format!("   Clients:   {}", s.total));
        lines.push(format!("   Active:    {}", s.active));
        lines.push(format!("   Accesses:  {}", s.accesses));
        lines.push(format!("   Downloads: {}", s.downloads));
    }
    lines.push(rule('=', 60));
    lines
}

pub fn render_backups(backups: &[BackupMetadata]) -> Vec<String> {
    if backups.is_empty() {
        return vec!["No backups found.".to_string()];
    }

    let mut lines = vec![String::new(), "AVAILABLE BACKUPS:".to_string(), rule('-', 50)];
    for (i, backup) in backups.iter().enumerate() {
        let when = backup
            .taken_at
            .map(|at| at.format("%d/%m/%Y at %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown time".to_string());

        lines.push(format!("{:2}. {}", i + 1, backup.file_name));
        lines.push(format!("    {}", when));
        lines.push(format!("    {:.1} KB", backup.size_bytes as f64 / 1024.0));
        lines.push(rule('-', 50));
    }
    lines
}

pub fn render_system_status(status: &SystemStatus) -> Vec<String> {
    let mut lines = banner("SYSTEM STATUS", 60);
    let files = if status.files.is_ok() { "OK" } else { "MISSING" };

    lines.push(format!("Base files:      {}", files));
    if !status.files.tokens_file {
        lines.push("   token store missing".to_string());
    }
    if !status.files.backup_dir {
        lines.push("   backup directory missing".to_string());
    }
    if !status.files.access_log {
        lines.push("   access log missing".to_string());
    }
    lines.push(format!("Tokens:          {}", status.total));
    lines.push(format!("Active tokens:   {}", status.active));
    lines.push(format!("Inactive tokens: {}", status.inactive));
    lines.push(format!("Backups:         {}", status.backups));
    lines.push(rule('=', 60));
    lines
}

/// Operator help, with the limits currently configured
pub fn help(config: &GalleryConfig) -> Vec<String> {
    vec![
        String::new(),
        "WORKFLOW".to_string(),
        "1. Finish the photo session".to_string(),
        "2. Publish the album descriptor in the albums directory".to_string(),
        "3. Use option 1 to issue a unique token".to_string(),
        "4. Send the generated link to the client".to_string(),
        "5. Follow accesses through the reports".to_string(),
        String::new(),
        "TOKENS".to_string(),
        "- Each token is unique and only opens the client's albums".to_string(),
        format!(
            "- Tokens expire after {} days unless another validity is typed",
            config.tokens.default_validity_days
        ),
        "- Tokens are never deleted, only deactivated".to_string(),
        String::new(),
        "BACKUPS".to_string(),
        "- A backup is taken after every change to the token store".to_string(),
        format!("- The newest {} are kept automatically", config.backup.auto_retain),
        format!(
            "- Manual cleanup from the backup menu keeps the newest {}",
            config.backup.manual_retain
        ),
        String::new(),
        "TROUBLESHOOTING".to_string(),
        "- A corrupted token store is treated as empty and a copy is kept next to it".to_string(),
        "- Paths and limits are read from GALLERY_* environment variables or .env".to_string(),
    ]
}
