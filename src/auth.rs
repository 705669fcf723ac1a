//! Stored bearer credential.
//!
//! The token lives in its own file beside the config, not inside the
//! config itself: the recording and API layers only ever receive it as an
//! explicit value.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use orator_core::APP_NAME;

pub struct AuthStore {
    token_path: PathBuf,
}

impl AuthStore {
    pub fn new() -> Result<Self> {
        let config_dir =
            dirs::config_dir().context("Failed to retrieve configuration directory")?;
        Ok(Self {
            token_path: config_dir.join(APP_NAME).join("token"),
        })
    }

    /// Store rooted at a specific directory. Useful for testing with
    /// temporary directories.
    #[cfg(test)]
    pub fn with_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        Self {
            token_path: dir.as_ref().join("token"),
        }
    }

    /// The stored token, or `None` when not logged in.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&self.token_path)
            .with_context(|| format!("Failed to read token file at {:?}", self.token_path))?;
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(token.to_owned()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        let dir = self
            .token_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.token_path))?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory at {:?}", dir))?;
        fs::write(&self.token_path, token)
            .with_context(|| format!("Failed to write token file at {:?}", self.token_path))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)
                .with_context(|| format!("Failed to remove token file at {:?}", self.token_path))?;
        }
        Ok(())
    }
}
