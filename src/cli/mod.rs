pub mod commands;
pub mod dispatch;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "conoha")]
#[command(version, about = "ConoHa VPS control panel CLI")]
#[command(
    long_about = "Operate ConoHa VPS from the command line by driving the web control panel"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "CONOHA_BASE_URL", help = "Control panel base URL")]
    pub base_url: Option<String>,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(config_path) => crate::config::Config::load_from(config_path)?,
        None => crate::config::Config::load()?,
    };

    let overrides = crate::config::ConfigOverrides {
        base_url: cli.base_url.clone(),
        json_pretty: None,
    };

    let config = Arc::new(config.load_with_overrides(overrides));
    config.validate()?;

    dispatch::dispatch(cli, config).await
}
