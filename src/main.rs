/// Gallery Tokens operator console
use anyhow::Context;
use gallery_tokens::{
    shell::{Shell, TerminalConsole},
    GalleryConfig,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GalleryConfig::from_env().context("invalid configuration")?;

    // Initialize logging on stderr so menus on stdout stay readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    print_banner();
    info!(
        "Using token store {:?} and backups in {:?}",
        config.storage.tokens_file, config.storage.backup_dir
    );

    let console = TerminalConsole::new().context("failed to start terminal console")?;
    let mut shell = Shell::new(console, config);

    shell.initialize().context("failed to create base files")?;
    shell.run()?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ____       _ _                    _____     _
  / ___| __ _| | | ___ _ __ _   _   |_   _|__ | | _____ _ __  ___
 | |  _ / _` | | |/ _ \ '__| | | |    | |/ _ \| |/ / _ \ '_ \/ __|
 | |_| | (_| | | |  __/ |  | |_| |    | | (_) |   <  __/ | | \__ \
  \____|\__,_|_|_|\___|_|   \__, |    |_|\___/|_|\_\___|_| |_|___/
                            |___/
        Photo gallery token manager v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
