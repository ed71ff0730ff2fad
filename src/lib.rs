pub mod api;
pub mod bracket;
pub mod cli;
pub mod clients;
pub mod config;
pub mod consensus;
pub mod database;
pub mod domain;
pub mod ladder;
pub mod services;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

use crate::clients::Notifier;
use crate::cli::Command;
use crate::config::settings::AppConfig;
use crate::services::server::ServerService;
use crate::services::sweeper::SweeperService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

pub fn handle_sweep() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let pool = database::create_pool(&database_path())?;
        let notifier = Notifier::new(&config.collaborators)?;

        let sweeper = SweeperService::new(config);
        let outcome = sweeper.run_once(&pool)?;
        notifier.dispatch_all(outcome.notifications());

        info!(
            "Sweep forced {} tournament and {} ladder matches",
            outcome.report.tournament_matches, outcome.report.ladder_matches
        );
        Ok(())
    })
}

pub fn handle_setup() -> Result<()> {
    let pool = database::create_pool(&database_path())?;
    let mut conn = database::get_connection(&pool)?;
    database::setup::reset_database(&mut conn)
}

fn database_path() -> String {
    std::env::var("DATABASE_PATH").unwrap_or_else(|_| "courtside.db".to_string())
}
