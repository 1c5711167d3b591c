pub mod cli;
pub mod core;
pub mod providers;
pub mod scheduler;
pub mod store;

use crate::core::config::AppConfig;
use crate::providers::{ApiGateway, TransportClient};
use crate::scheduler::View;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Watch { view: View, once: bool },
    Fund { fund_id: String, days: Option<u32> },
    Recommendations,
    Health,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fund monitor starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let transport = TransportClient::from_config(&config)?;
    let gateway = ApiGateway::new(transport);

    match command {
        AppCommand::Watch { view, once } => {
            cli::watch::run(Arc::new(gateway), view, &config.polling, once).await
        }
        AppCommand::Fund { fund_id, days } => cli::fund::run(&gateway, &fund_id, days).await,
        AppCommand::Recommendations => cli::recommendations::run(&gateway).await,
        AppCommand::Health => cli::health::run(&gateway).await,
    }
}
