pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod output;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::PanelError;

pub type Result<T> = std::result::Result<T, PanelError>;
