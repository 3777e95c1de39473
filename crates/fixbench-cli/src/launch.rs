//! Hand files and URLs to the desktop's default application

use std::process::Command;

use anyhow::{Context, Result, bail};

#[cfg(target_os = "macos")]
fn opener(target: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(target);
    cmd
}

#[cfg(target_os = "windows")]
fn opener(target: &str) -> Command {
    // `cmd /C start` would split URLs on `&`
    let mut cmd = Command::new("rundll32");
    cmd.arg("url.dll,FileProtocolHandler").arg(target);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener(target: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    cmd
}

/// Open a file or URL with the platform opener
pub fn open(target: &str) -> Result<()> {
    let mut cmd = opener(target);
    tracing::info!("opening {}", target);
    let status = cmd
        .status()
        .with_context(|| format!("Failed to launch opener for {}", target))?;
    if !status.success() {
        bail!("Opener exited with {} for {}", status, target);
    }
    Ok(())
}
