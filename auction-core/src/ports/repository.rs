use crate::{AuctionError, models::{CompiledScript, Snapshot}};

/// An atomically-published, read-mostly view of every configured bidder and
/// scorer.
///
/// A request obtains its [`CompiledScript`] references once; every lookup
/// made during that request observes the same generation, since a request
/// observes exactly one Repository snapshot for its entire duration.
/// `get_bidder`/`get_scorer` already translate the tri-state presence model
/// into the *not-found* / *unavailable* [`AuctionError`] kinds, so callers
/// never match on [`Snapshot`] internals directly.
pub trait Repository: Send + Sync {
    /// Look up a bidder by URI: absent → *not-found*; configured but failed
    /// to compile → *unavailable*; else the compiled script.
    fn get_bidder(&self, uri: &str) -> Result<CompiledScript, AuctionError>;

    /// Look up a scorer by URI, with the same tri-state semantics as
    /// [`Repository::get_bidder`].
    fn get_scorer(&self, uri: &str) -> Result<CompiledScript, AuctionError>;

    /// Atomically replace the published snapshot by CAS. Only the Periodic
    /// Refresher calls this.
    fn publish(&self, snapshot: Snapshot);

    /// Expose the current snapshot generation, for tests and diagnostics
    /// that need to assert on repository contents directly rather than
    /// through a lookup.
    fn snapshot(&self) -> std::sync::Arc<Snapshot>;
}
