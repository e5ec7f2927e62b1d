use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::FunctionRole;

/// An opaque, thread-safe handle naming one validated bidding or scoring
/// function.
///
/// Construction (in `auction-script-engine`) validates that `source` parses,
/// evaluates without throwing, and exports a callable, so a `CompiledScript`
/// reaching a [`Snapshot`] is known good at the time it was built. It does
/// not itself own a running VM: each invocation spins up a fresh isolate, so
/// every invocation builds its own short-lived engine context from `source`.
/// See `DESIGN.md` for why this crate represents a "compiled script" as
/// validated source text rather than a literal engine snapshot.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    uri: Arc<str>,
    role: FunctionRole,
    source: Arc<str>,
}

impl CompiledScript {
    /// Construct a handle around already-validated source.
    pub fn new(uri: impl Into<Arc<str>>, role: FunctionRole, source: impl Into<Arc<str>>) -> Self {
        Self {
            uri: uri.into(),
            role,
            source: source.into(),
        }
    }

    /// The function's stable identity.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The calling convention this function follows.
    pub fn role(&self) -> FunctionRole {
        self.role
    }

    /// The validated source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// The tri-state presence of a configured function in a [`Snapshot`]: a key
/// appears in exactly one mapping, with one of these two values, never
/// absent from both mappings if it was ever configured.
#[derive(Debug, Clone)]
pub enum Presence {
    /// The function compiled successfully at the last refresh.
    Present(CompiledScript),
    /// The function was configured but failed to compile at the last
    /// refresh; per-script failures degrade to `Unavailable` rather than
    /// aborting the whole rebuild.
    Unavailable,
}

/// An immutable, published view of every configured bidder and scorer.
///
/// Two independent mappings, keyed by `uri`: a key configured as a bidder
/// appears only in `bidders`, never in `scorers`, and vice versa. Snapshots
/// are never mutated after construction; a new configuration state is a
/// wholly new `Snapshot`, published by replacing an `ArcSwap<Snapshot>`
/// pointer (see `auction-registry`), not by mutating this one in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    bidders: FxHashMap<String, Presence>,
    scorers: FxHashMap<String, Presence>,
}

impl Snapshot {
    /// Build a snapshot from its two mappings.
    pub fn new(bidders: FxHashMap<String, Presence>, scorers: FxHashMap<String, Presence>) -> Self {
        Self { bidders, scorers }
    }

    /// Look up a bidder by URI. `None` means "never configured"; a
    /// [`Presence::Unavailable`] entry is distinct from that.
    pub fn bidder(&self, uri: &str) -> Option<&Presence> {
        self.bidders.get(uri)
    }

    /// Look up a scorer by URI. `None` means "never configured"; a
    /// [`Presence::Unavailable`] entry is distinct from that.
    pub fn scorer(&self, uri: &str) -> Option<&Presence> {
        self.scorers.get(uri)
    }

    /// Iterate every configured bidder URI and its presence.
    pub fn bidders(&self) -> impl Iterator<Item = (&str, &Presence)> {
        self.bidders.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate every configured scorer URI and its presence.
    pub fn scorers(&self) -> impl Iterator<Item = (&str, &Presence)> {
        self.scorers.iter().map(|(k, v)| (k.as_str(), v))
    }
}
