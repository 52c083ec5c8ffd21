use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::drive::DriveClient;
use medvault_core::service::VaultService;

/// Persisted CLI state: the active account and the optional remote
/// storage endpoint.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigState {
    pub active_account: Option<String>,
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub token: String,
}

pub struct Config {
    pub data_dir: PathBuf,
    config_path: PathBuf,
    pub state: ConfigState,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "medvault").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config_path = data_dir.join("config.json");
        let state = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            ConfigState::default()
        };

        Ok(Config {
            data_dir,
            config_path,
            state,
        })
    }

    pub fn save(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.config_path, raw)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;
        Ok(())
    }

    pub fn active_account(&self) -> Result<&str> {
        self.state
            .active_account
            .as_deref()
            .context("No active account. Run `medvault account use <id>` first")
    }

    /// Open the vault for the active account.
    pub fn open_active_vault(&self) -> Result<VaultService> {
        let account = self.active_account()?;
        VaultService::open_account(&self.data_dir, account)
    }

    /// Directory holding the active account's database and files.
    pub fn active_account_dir(&self) -> Result<PathBuf> {
        let account = self.active_account()?;
        Ok(self.data_dir.join("accounts").join(account))
    }

    /// Build a remote client from the configured endpoint, scoped to the
    /// active account.
    pub fn remote_client(&self) -> Result<DriveClient> {
        let Some(remote) = &self.state.remote else {
            bail!(
                "Remote storage is not configured. Add an \"endpoint\" and \"token\" under \
                 \"remote\" in {}",
                self.config_path.display()
            );
        };
        let account = self.active_account()?;
        Ok(DriveClient::new(
            &remote.endpoint,
            &remote.token,
            account,
        ))
    }
}
