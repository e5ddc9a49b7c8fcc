use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Failed to build request: {0}")]
    RequestConstruction(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to parse response: {0}")]
    ResponseParse(String),

    #[error("Unexpected response: {0}")]
    ResultValidation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("VPS not found (id={id})")]
    VpsNotFound { id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::RequestConstruction(err.to_string())
        } else if err.is_decode() {
            Self::ResponseParse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for PanelError {
    fn from(err: url::ParseError) -> Self {
        Self::RequestConstruction(format!("invalid URL: {}", err))
    }
}

impl PanelError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) => vec![
                "Check network connectivity".into(),
                "Verify the control panel is reachable from this host".into(),
            ],
            Self::ResponseParse(_) | Self::ResultValidation(_) => vec![
                "The control panel layout may have changed".into(),
                "Run with --verbose to see the failing step".into(),
            ],
            Self::Authentication(_) => vec![
                "Log in again with: conoha login".into(),
                "Check that the stored account and password are still valid".into(),
            ],
            Self::Configuration(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => vec![
                "Check configuration file syntax".into(),
                "Use --config to specify a different config file".into(),
            ],
            Self::VpsNotFound { .. } => vec!["List available VPS IDs with: conoha list".into()],
            Self::InvalidArgument(_) => vec!["Run the subcommand with --help for usage".into()],
            _ => vec!["Run with --verbose for more details".into()],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Authentication(_) => 3,
            Self::Transport(_) => 4,
            Self::ResponseParse(_) | Self::ResultValidation(_) => 5,
            Self::IoError(_) => 6,
            Self::Configuration(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => 7,
            Self::InvalidArgument(_) | Self::RequestConstruction(_) => 2,
            Self::Cancelled => 0,
            _ => 1,
        }
    }
}
