//! Command-line front end for the KH 0.2 dubbing installer
//!
//! Run with:
//! ```text
//! khdub status
//! khdub install --path "D:\Games\KINGDOM HEARTS HD 2.8 Final Chapter Prologue"
//! khdub uninstall -v
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use khdub_installer::{
    InstallOptions, Installer, InstallerConfig, OperationResult, ProgressCallback, ProgressEvent, open_external_link,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "khdub", version, about = "Install the Spanish dubbing for KINGDOM HEARTS 0.2 Birth by Sleep")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look for the game in the usual Steam and Epic locations
    Detect,
    /// Check that a folder holds the game
    Validate { path: PathBuf },
    /// Game location and which patch files are present
    Status,
    /// Download and install the dubbing
    Install {
        /// Game folder; detected when omitted
        #[arg(long)]
        path: Option<PathBuf>,
        /// Use bundled assets only, without downloading the archive
        #[arg(long)]
        offline: bool,
    },
    /// Remove the dubbing and restore the original files
    Uninstall {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Start the game through Steam
    Launch,
    /// Open a web link in the default browser
    Open { url: String },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let installer = Installer::new(InstallerConfig::default().from_env()).context("Invalid installer configuration")?;

    match cli.command {
        Command::Detect => {
            let found = installer.detect_game_path();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                match found {
                    Some(path) => println!("{}", path.display()),
                    None => println!("Game not found; pass --path to choose the folder manually"),
                }
            }
        }
        Command::Validate { path } => {
            let valid = installer.validate_game_path(&path);
            if cli.json {
                println!("{}", serde_json::json!({ "valid": valid }));
            } else if valid {
                println!("{} contains the game", path.display());
            } else {
                println!("{} does not contain the game executable", path.display());
            }
            if !valid {
                std::process::exit(1);
            }
        }
        Command::Status => {
            let status = installer.startup_status().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                match &status.game_path {
                    Some(path) => println!("Game: {}", path.display()),
                    None => println!("Game: not found"),
                }
                if let Some(mods) = &status.installed_mods {
                    println!("Dubbing file:    {}", yes_no(mods.dubbing));
                    println!("DT file:         {}", yes_no(mods.dt_file));
                    println!("Copyright video: {}", yes_no(mods.copyright_video));
                }
            }
        }
        Command::Install { path, offline } => {
            let game = resolve_game(&installer, path)?;
            let cancel = cancel_on_ctrl_c();
            let options = InstallOptions { skip_download: offline };
            info!("Installing into {}", game.display());
            let result = installer
                .install(&game, options, Some(progress_printer(cli.json)), cancel)
                .await;
            finish(result, cli.json)?;
        }
        Command::Uninstall { path } => {
            let game = resolve_game(&installer, path)?;
            let result = installer.uninstall(&game, Some(progress_printer(cli.json))).await;
            finish(result, cli.json)?;
        }
        Command::Launch => {
            if !installer.launch_game() {
                bail!("Could not start the game or the Steam client");
            }
        }
        Command::Open { url } => {
            if !open_external_link(&url) {
                bail!("Could not open {url}");
            }
        }
    }

    Ok(())
}

fn yes_no(present: bool) -> &'static str {
    if present { "installed" } else { "absent" }
}

/// Use the given folder, or detect one; either way it must hold the game
fn resolve_game(installer: &Installer, path: Option<PathBuf>) -> Result<PathBuf> {
    let game = match path {
        Some(path) => path,
        None => installer
            .detect_game_path()
            .context("Game not found automatically; pass --path with the game folder")?,
    };
    if !installer.validate_game_path(&game) {
        bail!("{} does not contain the game executable", game.display());
    }
    Ok(game)
}

fn progress_printer(json: bool) -> ProgressCallback {
    Arc::new(move |event: ProgressEvent| {
        if json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        } else {
            eprintln!("{}", progress_line(&event));
        }
    })
}

/// `[step/total] pct% message`, keeping the message's own line breaks
fn progress_line(event: &ProgressEvent) -> String {
    format!("[{}/{}] {:>3}% {}", event.step, event.total, event.percentage, event.message)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling");
            token.cancel();
        }
    });
    cancel
}

fn finish(result: OperationResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    if result.success {
        if !json {
            println!("{}", result.message.unwrap_or_default());
        }
        Ok(())
    } else {
        bail!(result.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_keeps_multi_line_status() {
        let event = ProgressEvent {
            step: 1,
            total: 10,
            message: "Downloading archive volumes...\n1.00 MB of 4.00 MB\n512.00 KB/s".into(),
            percentage: 12,
            speed: None,
            eta: None,
            downloaded_size: None,
            total_size: None,
        };
        assert_eq!(
            progress_line(&event),
            "[1/10]  12% Downloading archive volumes...\n1.00 MB of 4.00 MB\n512.00 KB/s"
        );
    }
}
