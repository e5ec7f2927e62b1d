//! `AuctionService`: the facade wiring the Source Fetcher, Script Engine,
//! Function Repository, Periodic Refresher, and Auction Driver together.
//!
//! This system has exactly one concrete implementation of each port, so
//! `AuctionService` is concrete rather than generic over a caller-supplied
//! backend (see `auction-driver`'s own doc comment for the same call). A
//! generic `Application<Repository>` shape would be inventing flexibility
//! nobody asked for.

use std::{sync::Arc, time::Duration};

use auction_config::Config;
use auction_core::{AuctionError, ports::EngineOptions};
use auction_driver::AuctionDriver;
use auction_fetcher::BlockingSourceFetcher;
use auction_registry::Registry;
use auction_script_engine::InProcessSandbox;
use tokio_util::sync::CancellationToken;

use crate::refresher::{self, Refresher};

/// Everything booted from one configuration file: a populated Repository, a
/// ready-to-use Driver, and a Refresher handle the caller can spawn as a
/// background task.
pub struct AuctionService {
    repository: Arc<Registry>,
    engine: Arc<InProcessSandbox>,
    driver: AuctionDriver<Registry, InProcessSandbox>,
    refresher: Refresher<BlockingSourceFetcher, InProcessSandbox, Registry>,
}

impl AuctionService {
    /// Load `config`, populate an initial Repository snapshot at boot, and
    /// build a Refresher ready to run on the configured
    /// `(first_delay, interval)`.
    ///
    /// Construction-path errors fail the whole startup: this only fails if
    /// `config` itself is invalid (caller is expected to have already
    /// surfaced `Config::load`'s own *not-found*/*invalid-argument* before
    /// reaching here). Per-script compile/fetch failures never fail this
    /// call; the same pipeline runs identically at boot and on every
    /// refresh tick, degrading individual scripts to `Unavailable` rather
    /// than aborting.
    pub fn bootstrap(
        config: &Config,
        options: EngineOptions,
        refresh_interval: Duration,
    ) -> Result<Self, AuctionError> {
        let fetcher = Arc::new(BlockingSourceFetcher::new());
        let engine = Arc::new(InProcessSandbox::new());
        let repository = Arc::new(Registry::new());

        let bidder_specs = config.bidder_specs();
        let scorer_specs = config.scorer_specs();

        let initial = refresher::build_snapshot(
            &*fetcher,
            &*engine,
            &bidder_specs,
            &scorer_specs,
            &options,
        );
        repository.publish(initial);

        let driver = AuctionDriver::new(repository.clone(), engine.clone(), options);
        let refresher = Refresher::new(
            fetcher,
            engine.clone(),
            repository.clone(),
            bidder_specs,
            scorer_specs,
            options,
            refresh_interval,
            refresh_interval,
        );

        Ok(Self {
            repository,
            engine,
            driver,
            refresher,
        })
    }

    /// The `ComputeBid`/`RunAdAuction` orchestrator.
    pub fn driver(&self) -> &AuctionDriver<Registry, InProcessSandbox> {
        &self.driver
    }

    /// The Function Repository snapshot reader/writer.
    pub fn repository(&self) -> &Arc<Registry> {
        &self.repository
    }

    /// The in-process Script Engine.
    pub fn engine(&self) -> &Arc<InProcessSandbox> {
        &self.engine
    }

    /// Spawn the Periodic Refresher as a background task, returning a
    /// `CancellationToken` the caller signals to shut it down responsively:
    /// the timer responds to a termination signal within one scheduling
    /// quantum.
    pub fn spawn_refresher(&self) -> (tokio::task::JoinHandle<()>, CancellationToken) {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(self.refresher.clone().run(shutdown.clone()));
        (handle, shutdown)
    }
}
