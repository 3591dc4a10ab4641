//! Side-effect realization: opening URLs

use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

use crate::{Error, Result};

/// Opens URLs on behalf of an intent
pub trait UrlOpener: Send + Sync {
    /// Open `url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL could not be handed off
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands URLs to the platform's default browser
#[derive(Debug, Clone, Default)]
pub struct SystemOpener;

impl SystemOpener {
    #[cfg(target_os = "macos")]
    fn command(url: &str) -> Command {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    }

    #[cfg(target_os = "windows")]
    fn command(url: &str) -> Command {
        let mut cmd = Command::new("rundll32");
        cmd.args(["url.dll,FileProtocolHandler", url]);
        cmd
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn command(url: &str) -> Command {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let mut child = Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::SideEffect(format!("failed to launch browser for {url}: {e}")))?;
        tracing::info!(url, pid = child.id(), "opened url");

        // reap the launcher so it doesn't linger as a zombie
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(%status, "url launcher exited with failure");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "failed to wait for url launcher"),
        });
        Ok(())
    }
}

/// Logs URLs instead of opening them (`--no-browser`)
///
/// Keeps the opened URLs so callers can inspect them.
#[derive(Debug, Default)]
pub struct LogOpener {
    opened: Mutex<Vec<String>>,
}

impl LogOpener {
    /// Create an opener with an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs received so far, oldest first
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UrlOpener for LogOpener {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(url, "would open url");
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }
}
