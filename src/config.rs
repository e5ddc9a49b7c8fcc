use crate::engine::SessionOptions;
use crate::engine::session::{
    DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_BASE_URL, DEFAULT_USER_AGENT,
    SESSION_COOKIE_NAME,
};
use crate::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub ssh: SshConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            session_cookie: default_session_cookie(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}
fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}
fn default_session_cookie() -> String {
    SESSION_COOKIE_NAME.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub json_pretty: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SshConfig {
    /// Login user when `ssh` is run without `--user`.
    #[serde(default = "default_ssh_user")]
    pub user: String,
    /// Client binary, looked up on PATH.
    #[serde(default = "default_ssh_program")]
    pub program: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_ssh_user(),
            program: default_ssh_program(),
        }
    }
}

fn default_ssh_user() -> String {
    "root".to_string()
}
fn default_ssh_program() -> String {
    "ssh".to_string()
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|p| p.join("conoha-vps"))
        .ok_or_else(|| PanelError::Configuration("Could not determine config directory".into()))
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            let content = std::fs::read_to_string(&global_path)?;
            config = toml::from_str(&content)?;
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.load_from_env();
        Ok(config)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(base_url) = cli_overrides.base_url {
            config.panel.base_url = base_url;
        }
        if let Some(json_pretty) = cli_overrides.json_pretty {
            config.output.json_pretty = json_pretty;
        }

        config
    }

    fn load_from_env(&mut self) {
        if let Ok(base_url) = std::env::var("CONOHA_BASE_URL") {
            self.panel.base_url = base_url;
        }
        if let Ok(user_agent) = std::env::var("CONOHA_USER_AGENT") {
            self.panel.user_agent = user_agent;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.panel.base_url).map_err(|e| {
            PanelError::Configuration(format!("base_url {:?}: {}", self.panel.base_url, e))
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(PanelError::Configuration(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.panel.session_cookie.is_empty() {
            return Err(PanelError::Configuration(
                "session_cookie must not be empty".into(),
            ));
        }

        if self.ssh.user.is_empty() {
            return Err(PanelError::Configuration("ssh.user must not be empty".into()));
        }

        Ok(())
    }

    pub fn session_options(&self) -> Result<SessionOptions> {
        let base_url = Url::parse(&self.panel.base_url).map_err(|e| {
            PanelError::Configuration(format!("base_url {:?}: {}", self.panel.base_url, e))
        })?;

        Ok(SessionOptions {
            base_url,
            session_cookie: self.panel.session_cookie.clone(),
            user_agent: self.panel.user_agent.clone(),
            accept: self.panel.accept.clone(),
            accept_language: self.panel.accept_language.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub json_pretty: Option<bool>,
}
