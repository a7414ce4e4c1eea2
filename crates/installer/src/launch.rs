//! Launching the game through Steam and opening web links

use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Start the game via Steam; true once any method was handed off
///
/// Tries the `steam://rungameid` URI through the platform opener, then a
/// direct shell command, and finally just brings up the Steam client.
pub fn launch_game(app_id: u32) -> bool {
    let uri = format!("steam://rungameid/{app_id}");

    match opener::open(&uri) {
        Ok(()) => {
            info!("Launched {} via platform opener", uri);
            return true;
        }
        Err(e) => warn!("Opener could not launch {}: {}", uri, e),
    }

    match direct_command(&uri).spawn() {
        Ok(_) => {
            info!("Launched {} via direct command", uri);
            return true;
        }
        Err(e) => warn!("Direct launch of {} failed: {}", uri, e),
    }

    match opener::open("steam://open/main") {
        Ok(()) => {
            info!("Opened the Steam client instead of launching the game");
            true
        }
        Err(e) => {
            warn!("Could not open Steam: {}", e);
            false
        }
    }
}

#[cfg(windows)]
fn direct_command(uri: &str) -> Command {
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    use std::os::windows::process::CommandExt;

    let mut command = Command::new("cmd");
    command
        .args(["/C", "start", "", uri])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .creation_flags(CREATE_NO_WINDOW);
    command
}

#[cfg(not(windows))]
fn direct_command(uri: &str) -> Command {
    let mut command = Command::new("steam");
    command
        .arg(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

/// Open an http(s) link in the default browser; other schemes are refused
pub fn open_external_link(url: &str) -> bool {
    if !is_web_link(url) {
        warn!("Refusing to open non-web link: {}", url);
        return false;
    }
    match opener::open(url) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to open URL {}: {}", url, e);
            false
        }
    }
}

fn is_web_link(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}
