mod api;
mod app;
mod auth;
mod cli;
mod commands;
mod config;
mod drafts;
mod editor;
mod error;
mod estimate;
mod format;
mod output;

use clap::Parser;
use cli::Cli;
use error::TallyError;
use log::{debug, info};
use output::{alert, AlertLevel};

#[tokio::main]
async fn main() {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting Task Tally");

    if let Err(e) = cli.execute().await {
        debug!("Command failed: {e:?}");
        alert(AlertLevel::Danger, &format!("{e:#}"));
        if e
            .downcast_ref::<TallyError>()
            .is_some_and(TallyError::is_auth_failure)
        {
            alert(AlertLevel::Info, "Run `tasktally login` to sign in again");
        }
        std::process::exit(1);
    }
}
