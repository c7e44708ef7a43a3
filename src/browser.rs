//! Opening URLs in the desktop browser

use crate::{Error, Result};

/// Launches URLs in a browser
///
/// Fire-and-forget: a successful return only means the launcher started.
pub trait Browser: Send + Sync {
    /// Open `url`
    ///
    /// # Errors
    ///
    /// Returns error if the launcher could not be spawned
    fn open(&self, url: &str) -> Result<()>;
}

/// Browser launched through the platform's default opener
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = launcher(url);
        command
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("failed to launch browser for {url}: {e}")))?;

        tracing::debug!(url, "browser launched");
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn launcher(url: &str) -> std::process::Command {
    let mut command = std::process::Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn launcher(url: &str) -> std::process::Command {
    let mut command = std::process::Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn launcher(url: &str) -> std::process::Command {
    let mut command = std::process::Command::new("xdg-open");
    command.arg(url);
    command
}
