use std::fs;
use std::path::PathBuf;

use log::{debug, warn};

use crate::error::{Result, TallyError};

use super::token::TokenSet;

/// Persists the token set between invocations.
///
/// Lives at `<config dir>/tasktally/session.json`. A disabled store keeps
/// nothing on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| TallyError::Config("No config directory found".into()))?
            .join("tasktally");
        Ok(Self::at(dir.join("session.json")))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn load(&self) -> Option<TokenSet> {
        let path = self.path.as_ref()?;
        if !path.exists() {
            return None;
        }

        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .inspect(|_| debug!("Restored session from {}", path.display()))
            .or_else(|| {
                warn!("Ignoring unreadable session file {}", path.display());
                None
            })
    }

    pub fn save(&self, tokens: &TokenSet) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(tokens)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match &self.path {
            Some(path) if path.exists() => Ok(fs::remove_file(path)?),
            _ => Ok(()),
        }
    }
}
