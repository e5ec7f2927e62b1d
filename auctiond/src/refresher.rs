//! Periodic Refresher: the timer-driven rebuild-and-swap loop that runs the
//! same fetch/compile construction pipeline used at boot and atomically
//! publishes the result into the Function Repository.
//!
//! Each tick is wrapped in a `tracing` span, but `interval` here is
//! deliberately *not* `tokio::time::interval`'s absolute-anchor ticking:
//! `interval` is measured from the end of the previous rebuild to the
//! start of the next, i.e. a sleep-after-rebuild loop, so that a slow
//! rebuild can never cause two rebuilds to overlap. Shutdown
//! responsiveness is modeled with a `tokio_util::sync::CancellationToken`
//! raced against each sleep.

use std::{sync::Arc, time::Duration};

use auction_core::{
    models::{FunctionSpec, Presence, Snapshot},
    ports::{EngineOptions, Repository, ScriptEngine, SourceFetcher},
};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

/// Run the fetch-then-compile construction pipeline over one list of
/// [`FunctionSpec`]s, degrading each individual failure to
/// [`Presence::Unavailable`] rather than aborting the whole rebuild.
/// Individual script-level failures do not abort the rebuild.
fn build_presence_map(
    specs: &[FunctionSpec],
    fetcher: &dyn SourceFetcher,
    engine: &dyn ScriptEngine,
    options: &EngineOptions,
) -> FxHashMap<String, Presence> {
    let mut map = FxHashMap::default();
    for spec in specs {
        let presence = match fetcher.fetch(spec) {
            Ok(source) => match engine.compile(&spec.uri, spec.role, &source, options) {
                Ok(script) => Presence::Present(script),
                Err(e) => {
                    tracing::warn!(
                        uri = %spec.uri, error = %e,
                        "script failed to compile; marking unavailable"
                    );
                    Presence::Unavailable
                }
            },
            Err(e) => {
                tracing::warn!(
                    uri = %spec.uri, error = %e,
                    "failed to fetch script source; marking unavailable"
                );
                Presence::Unavailable
            }
        };
        map.insert(spec.uri.clone(), presence);
    }
    map
}

/// Build a complete [`Snapshot`] from the currently configured bidder and
/// scorer specs. Used both at boot, to populate an initial Repository, and
/// by every [`Refresher`] tick: the same pipeline runs periodically.
pub fn build_snapshot(
    fetcher: &dyn SourceFetcher,
    engine: &dyn ScriptEngine,
    bidder_specs: &[FunctionSpec],
    scorer_specs: &[FunctionSpec],
    options: &EngineOptions,
) -> Snapshot {
    let bidders = build_presence_map(bidder_specs, fetcher, engine, options);
    let scorers = build_presence_map(scorer_specs, fetcher, engine, options);
    Snapshot::new(bidders, scorers)
}

/// The timer-driven rebuild-and-swap loop.
///
/// Cheaply `Clone`: every field is either an `Arc` or a `Copy` value, so the
/// running loop can hand a copy of itself to `tokio::task::spawn_blocking`
/// for each rebuild without borrowing across the `.await` point.
pub struct Refresher<F, E, R> {
    fetcher: Arc<F>,
    engine: Arc<E>,
    repository: Arc<R>,
    bidder_specs: Arc<Vec<FunctionSpec>>,
    scorer_specs: Arc<Vec<FunctionSpec>>,
    options: EngineOptions,
    first_delay: Duration,
    interval: Duration,
}

impl<F, E, R> Clone for Refresher<F, E, R> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            engine: self.engine.clone(),
            repository: self.repository.clone(),
            bidder_specs: self.bidder_specs.clone(),
            scorer_specs: self.scorer_specs.clone(),
            options: self.options,
            first_delay: self.first_delay,
            interval: self.interval,
        }
    }
}

/// Default `interval`, measured from the end of one rebuild to the start of
/// the next.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

impl<F, E, R> Refresher<F, E, R>
where
    F: SourceFetcher,
    E: ScriptEngine,
    R: Repository,
{
    /// Build a refresher with the given timer parameters,
    /// `(first_delay, interval)`.
    pub fn new(
        fetcher: Arc<F>,
        engine: Arc<E>,
        repository: Arc<R>,
        bidder_specs: Vec<FunctionSpec>,
        scorer_specs: Vec<FunctionSpec>,
        options: EngineOptions,
        first_delay: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            engine,
            repository,
            bidder_specs: Arc::new(bidder_specs),
            scorer_specs: Arc::new(scorer_specs),
            options,
            first_delay,
            interval,
        }
    }

    /// A test factory producing refresher handles whose timers are
    /// disabled but whose "run now" method synchronously invokes the
    /// rebuild on the calling thread, so integration tests are
    /// deterministic. The timer fields are set to values [`Refresher::run`]
    /// is simply never called against in tests
    /// that only use [`Refresher::run_now`]; they exist so the same type
    /// serves both the disabled-timer test path and the live `run` loop.
    pub fn for_testing(
        fetcher: Arc<F>,
        engine: Arc<E>,
        repository: Arc<R>,
        bidder_specs: Vec<FunctionSpec>,
        scorer_specs: Vec<FunctionSpec>,
        options: EngineOptions,
    ) -> Self {
        Self::new(
            fetcher,
            engine,
            repository,
            bidder_specs,
            scorer_specs,
            options,
            Duration::ZERO,
            Duration::MAX,
        )
    }

    /// Synchronously rebuild a snapshot from the current configuration and
    /// publish it, on the calling thread: the "run now" half of the test
    /// factory contract.
    pub fn run_now(&self) {
        let snapshot = build_snapshot(
            &*self.fetcher,
            &*self.engine,
            &self.bidder_specs,
            &self.scorer_specs,
            &self.options,
        );
        self.repository.publish(snapshot);
    }

    /// Run the refresher until `shutdown` is cancelled. Refresher shutdown
    /// is responsive.
    ///
    /// Each rebuild runs on a dedicated blocking thread via
    /// `spawn_blocking`, distinct from request workers, since the Source
    /// Fetcher performs blocking HTTP GETs. `interval` is slept only after
    /// that rebuild completes, so consecutive rebuilds never overlap.
    pub async fn run(self, shutdown: CancellationToken)
    where
        F: 'static,
        E: 'static,
        R: 'static,
    {
        let cancelled = tokio::select! {
            _ = shutdown.cancelled() => true,
            _ = tokio::time::sleep(self.first_delay) => false,
        };
        if cancelled {
            return;
        }

        loop {
            let span = tracing::info_span!("function_repository_refresh");
            let this = self.clone();
            let _ = tokio::task::spawn_blocking(move || {
                let _enter = span.enter();
                this.run_now();
            })
            .await;

            let cancelled = tokio::select! {
                _ = shutdown.cancelled() => true,
                _ = tokio::time::sleep(self.interval) => false,
            };
            if cancelled {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::models::FunctionRole;
    use auction_registry::Registry;
    use auction_script_engine::InProcessSandbox;
    use std::sync::Mutex;

    /// A fetcher whose source for one URI can be swapped mid-test, to
    /// simulate a refresh swap without a real HTTP endpoint.
    struct SwappableFetcher(Mutex<FxHashMap<String, String>>);

    impl SwappableFetcher {
        fn new(entries: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
            Self(Mutex::new(
                entries.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ))
        }

        fn set(&self, uri: &str, source: &str) {
            self.0.lock().unwrap().insert(uri.to_string(), source.to_string());
        }
    }

    impl SourceFetcher for SwappableFetcher {
        fn fetch(&self, spec: &FunctionSpec) -> Result<String, auction_core::AuctionError> {
            self.0
                .lock()
                .unwrap()
                .get(&spec.uri)
                .cloned()
                .ok_or_else(|| auction_core::AuctionError::not_found(spec.uri.clone()))
        }
    }

    /// The refresher must expose a test factory whose "run now" method
    /// synchronously invokes the rebuild on the calling thread.
    #[test]
    fn run_now_synchronously_publishes_a_fresh_snapshot() {
        let fetcher = Arc::new(SwappableFetcher::new([(
            "local://double",
            "input => ({ bid: input.perBuyerSignals.foo * 2 })",
        )]));
        let engine = Arc::new(InProcessSandbox::new());
        let repository = Arc::new(Registry::new());

        assert!(repository.get_bidder("local://double").is_err());

        let refresher = Refresher::for_testing(
            fetcher,
            engine,
            repository.clone(),
            vec![FunctionSpec::remote("local://double", FunctionRole::Bidder)],
            vec![],
            EngineOptions::default(),
        );
        refresher.run_now();

        assert!(repository.get_bidder("local://double").is_ok());
    }

    /// The refresher half of a refresh swap: swapping the underlying
    /// source and calling `run_now` again changes what the next lookup
    /// returns, without needing the timer loop at all.
    #[test]
    fn run_now_twice_picks_up_changed_source() {
        let fetcher = Arc::new(SwappableFetcher::new([(
            "local://scorer",
            "input => ({ desirabilityScore: input.bid * 2 })",
        )]));
        let engine = Arc::new(InProcessSandbox::new());
        let repository = Arc::new(Registry::new());

        let refresher = Refresher::for_testing(
            fetcher.clone(),
            engine,
            repository.clone(),
            vec![],
            vec![FunctionSpec::remote("local://scorer", FunctionRole::Scorer)],
            EngineOptions::default(),
        );
        refresher.run_now();
        let first = repository.get_scorer("local://scorer").unwrap();
        assert!(first.source().contains("bid * 2"));

        fetcher.set("local://scorer", "input => ({ desirabilityScore: input.bid * 1.5 })");
        refresher.run_now();
        let second = repository.get_scorer("local://scorer").unwrap();
        assert!(second.source().contains("bid * 1.5"));
    }

    /// A script-level fetch failure degrades that one entry to
    /// `Unavailable` rather than aborting the whole rebuild.
    #[test]
    fn an_unreachable_script_becomes_unavailable_not_a_failed_rebuild() {
        let fetcher = Arc::new(SwappableFetcher::new([(
            "local://ok",
            "input => ({ bid: 1 })",
        )]));
        let engine = Arc::new(InProcessSandbox::new());
        let repository = Arc::new(Registry::new());

        let refresher = Refresher::for_testing(
            fetcher,
            engine,
            repository.clone(),
            vec![
                FunctionSpec::remote("local://ok", FunctionRole::Bidder),
                FunctionSpec::remote("local://missing", FunctionRole::Bidder),
            ],
            vec![],
            EngineOptions::default(),
        );
        refresher.run_now();

        assert!(repository.get_bidder("local://ok").is_ok());
        let err = repository.get_bidder("local://missing").unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::Unavailable);
    }

    /// A pending initial delay must not block shutdown.
    #[tokio::test]
    async fn shutdown_during_the_initial_delay_returns_promptly() {
        let fetcher = Arc::new(SwappableFetcher::new([]));
        let engine = Arc::new(InProcessSandbox::new());
        let repository = Arc::new(Registry::new());

        let refresher = Refresher::new(
            fetcher,
            engine,
            repository,
            vec![],
            vec![],
            EngineOptions::default(),
            Duration::from_secs(3600),
            DEFAULT_INTERVAL,
        );

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(refresher.run(shutdown_clone));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresher should shut down promptly, not wait out the initial delay")
            .unwrap();
    }
}
