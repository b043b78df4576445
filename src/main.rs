use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use docsync::{DocumentHandle, Settings};

#[derive(Parser)]
#[command(name = "docsync")]
#[command(about = "Keep an edited text document consistent with its backing file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config {
        /// Emit JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Open a document and follow its change and warning events
    Watch {
        /// Path to the text file to follow
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration.");
        Settings::default()
    });

    docsync::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            Settings::init_config_file(force).map_err(|e| anyhow::anyhow!("{e}"))?;
            Ok(())
        }

        Commands::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("{}", toml::to_string_pretty(&settings)?);
            }
            Ok(())
        }

        Commands::Watch { file } => watch(file, Arc::new(settings)).await,
    }
}

/// Follow one document until interrupted, printing every debounced change
/// and reconciliation warning.
async fn watch(file: PathBuf, settings: Arc<Settings>) -> anyhow::Result<()> {
    let doc = DocumentHandle::open(&file, settings)
        .await
        .with_context(|| format!("cannot open {}", file.display()))?;

    let mut changes = doc.subscribe_changes();
    let mut warnings = doc.subscribe_warnings();

    println!("Following {} (ctrl-c to stop)", file.display());

    loop {
        tokio::select! {
            event = changes.recv() => match event {
                Ok(change) => {
                    println!(
                        "v{} ({} bytes)",
                        change.version,
                        change.content.len()
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("lagged by {n} change events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },

            warning = warnings.recv() => match warning {
                Ok(warning) => eprintln!("warning: {warning:?}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("lagged by {n} warnings");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },

            _ = tokio::signal::ctrl_c() => {
                doc.close().await;
                break;
            }
        }
    }

    Ok(())
}
