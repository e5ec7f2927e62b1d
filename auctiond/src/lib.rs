#![warn(missing_docs)]
//! `auctiond`: boots the sandboxed auction engine from a YAML configuration
//! file and drives `ComputeBid`/`RunAdAuction` from the command line (spec
//! §6). See `DESIGN.md` for the full grounding ledger.

mod cli;
pub use cli::{Cli, Commands};

mod io;
pub use io::IOArgs;

pub mod commands;
pub mod refresher;
pub mod service;

pub use refresher::Refresher;
pub use service::AuctionService;

use auction_config::Config;
use auction_core::ports::EngineOptions;

impl Cli {
    /// Load the configured YAML file, boot an [`AuctionService`], and
    /// dispatch to the selected subcommand.
    pub async fn evaluate(self) -> anyhow::Result<()> {
        let config = Config::load(&self.configuration_file)?;

        let options = EngineOptions {
            flatten_arguments: false,
            async_wait: self.bidding_function_async_wait,
            ..EngineOptions::default()
        };

        let service =
            AuctionService::bootstrap(&config, options, self.function_refresh_interval)?;

        if self.use_sandbox2 {
            tracing::warn!(
                "--use_sandbox2 was set, but this build's process-sandbox feature is not \
                 enabled; falling back to the in-process engine"
            );
        }

        match self.command {
            Commands::ComputeBid { io } => commands::compute_bid::run(&io, &service),
            Commands::RunAuction { io } => commands::run_auction::run(&io, &service),
            Commands::Serve => commands::serve::run(&service, &self.bind_address).await,
        }
    }
}
