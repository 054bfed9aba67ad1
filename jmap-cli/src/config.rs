// jmap-cli/src/config.rs
use anyhow::{anyhow, Result};
use directories::BaseDirs;
use jmap_client::{CredentialProvider, EmailAddress, JmapError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Basic,
    /// Static token, or a token exchanged for username/password
    Bearer,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub sender: SenderConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    #[serde(default)]
    pub auth: AuthMode,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct AccountConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct SenderConfig {
    /// Header sender; the server's first identity when unset
    pub default_from: Option<String>,
    pub from_name: Option<String>,
}

impl Config {
    /// Read the config file (if any), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("JMAP_BASE_URL") {
            self.server.base_url = Some(url);
        }
        if let Some(username) = lookup("JMAP_USERNAME") {
            self.account.username = Some(username);
        }
        if let Some(password) = lookup("JMAP_PASSWORD") {
            self.account.password = Some(password);
        }
        if let Some(token) = lookup("JMAP_TOKEN") {
            self.account.token = Some(token);
            self.server.auth = AuthMode::Bearer;
        }
        if let Some(from) = lookup("EMAIL_FROM") {
            self.sender.default_from = Some(from);
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        // Owner read/write only: the file holds a password
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(config_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(config_path, perms)?;
        }

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base_dirs =
            BaseDirs::new().ok_or_else(|| anyhow!("Cannot determine config directory"))?;
        Ok(base_dirs.config_dir().join("jmap-cli").join("config.toml"))
    }

    pub fn base_url(&self) -> Result<&str, JmapError> {
        self.server
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                JmapError::Configuration(
                    "base URL is not set (run `jmap init` or set JMAP_BASE_URL)".to_string(),
                )
            })
    }

    pub fn credentials(&self) -> Result<CredentialProvider, JmapError> {
        let account = &self.account;
        match self.server.auth {
            AuthMode::Basic => {
                CredentialProvider::basic(account.username.as_deref(), account.password.as_deref())
            }
            AuthMode::Bearer if account.token.is_some() => {
                CredentialProvider::bearer(account.token.as_deref())
            }
            AuthMode::Bearer => CredentialProvider::bearer_exchange(
                self.server.base_url.as_deref(),
                account.username.as_deref(),
                account.password.as_deref(),
            ),
        }
    }

    /// Configured header sender, if any
    pub fn from_address(&self) -> Option<EmailAddress> {
        let email = self.sender.default_from.as_deref()?.trim();
        if email.is_empty() {
            return None;
        }
        Some(EmailAddress {
            name: self.sender.from_name.clone().filter(|n| !n.is_empty()),
            email: email.to_string(),
        })
    }
}
