#![warn(missing_docs)]
//! Function Repository: an atomically-published, read-mostly snapshot of
//! compiled bidding and scoring scripts.
//!
//! Grounded on the one example repo in the retrieval pack that depends on
//! `arc-swap` for exactly this shape (a real-time ad-serving hot path that
//! is rebuilt occasionally and read constantly). This system has no
//! database; the Repository's job is to publish in-memory snapshots, not
//! to store rows.

use std::sync::Arc;

use arc_swap::ArcSwap;
use auction_core::{
    AuctionError,
    models::{CompiledScript, Presence, Snapshot},
    ports::Repository as RepositoryPort,
};

/// The concrete, `arc-swap`-backed Repository.
///
/// Readers (`get_bidder`/`get_scorer`) never block a concurrent writer, and
/// the writer (the Periodic Refresher) never blocks concurrent readers: a
/// `publish` call is a single atomic pointer swap, writers publish by CAS.
/// A reader that loaded its `Arc<Snapshot>` before a swap keeps observing
/// that generation for as long as it holds the `Arc`, even after a newer
/// snapshot is published; a request observes exactly one Repository
/// snapshot for its entire duration.
pub struct Registry {
    snapshot: ArcSwap<Snapshot>,
}

impl Registry {
    /// Build a registry, initially publishing an empty snapshot (no
    /// bidders, no scorers configured).
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// Build a registry pre-seeded with `snapshot`, for tests that want to
    /// skip the fetch/compile pipeline entirely.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(
    snapshot: &Snapshot,
    uri: &str,
    find: impl FnOnce(&Snapshot, &str) -> Option<&Presence>,
    kind_name: &str,
) -> Result<CompiledScript, AuctionError> {
    match find(snapshot, uri) {
        None => Err(AuctionError::not_found(format!(
            "no {kind_name} configured for uri {uri}"
        ))),
        Some(Presence::Unavailable) => Err(AuctionError::unavailable(format!(
            "{kind_name} {uri} failed to compile at the last refresh"
        ))),
        Some(Presence::Present(script)) => Ok(script.clone()),
    }
}

impl RepositoryPort for Registry {
    fn get_bidder(&self, uri: &str) -> Result<CompiledScript, AuctionError> {
        lookup(&self.snapshot.load(), uri, Snapshot::bidder, "bidder")
    }

    fn get_scorer(&self, uri: &str) -> Result<CompiledScript, AuctionError> {
        lookup(&self.snapshot.load(), uri, Snapshot::scorer, "scorer")
    }

    fn publish(&self, snapshot: Snapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::models::FunctionRole;
    use rustc_hash::FxHashMap;

    fn snapshot_with_one_bidder(uri: &str, presence: Presence) -> Snapshot {
        let mut bidders = FxHashMap::default();
        bidders.insert(uri.to_string(), presence);
        Snapshot::new(bidders, FxHashMap::default())
    }

    #[test]
    fn absent_key_is_not_found() {
        let registry = Registry::new();
        let err = registry.get_bidder("local://nope").unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::NotFound);
    }

    #[test]
    fn unavailable_key_is_unavailable() {
        let registry =
            Registry::with_snapshot(snapshot_with_one_bidder("local://broken", Presence::Unavailable));
        let err = registry.get_bidder("local://broken").unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::Unavailable);
    }

    #[test]
    fn present_key_returns_script() {
        let script = CompiledScript::new("local://ok", FunctionRole::Bidder, "input => input");
        let registry =
            Registry::with_snapshot(snapshot_with_one_bidder("local://ok", Presence::Present(script)));
        let found = registry.get_bidder("local://ok").expect("should be present");
        assert_eq!(found.uri(), "local://ok");
    }

    #[test]
    fn publish_swaps_the_generation_readers_see() {
        let registry = Registry::new();
        assert!(registry.get_bidder("local://double").is_err());

        let script = CompiledScript::new("local://double", FunctionRole::Bidder, "input => input");
        registry.publish(snapshot_with_one_bidder(
            "local://double",
            Presence::Present(script),
        ));

        assert!(registry.get_bidder("local://double").is_ok());
    }

    #[test]
    fn a_held_snapshot_reference_is_unaffected_by_a_later_publish() {
        let script = CompiledScript::new("local://double", FunctionRole::Bidder, "input => input");
        let registry = Registry::with_snapshot(snapshot_with_one_bidder(
            "local://double",
            Presence::Present(script),
        ));

        let held = registry.snapshot();
        registry.publish(Snapshot::default());

        assert!(held.bidder("local://double").is_some());
        assert!(registry.get_bidder("local://double").is_err());
    }
}
