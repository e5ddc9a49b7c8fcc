use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Credentials and the last session id, persisted between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountState {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub session_id: String,
}

impl AccountState {
    pub fn has_credentials(&self) -> bool {
        !self.account.is_empty() && !self.password.is_empty()
    }
}

pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(
            crate::config::default_config_dir()?.join("account.json"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state reads as empty; a fresh login repairs it.
    pub fn read(&self) -> AccountState {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return AccountState::default();
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Ignoring corrupt account file {}: {}", self.path.display(), e);
                AccountState::default()
            }
        }
    }

    pub fn write(&self, state: &AccountState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let mut file = open_private(&self.path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
pub(crate) fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
pub(crate) fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
