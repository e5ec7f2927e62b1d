use serde::{Deserialize, Serialize};

/// Which FLEDGE calling convention a script follows.
///
/// Selects both the global function name the Script Engine looks for when
/// the top-level expression is not itself callable (`generateBid` /
/// `scoreAd`), and the argument shape passed at invocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionRole {
    /// A buyer-supplied bidding function (`generateBid`).
    Bidder,
    /// A seller-supplied scoring function (`scoreAd`).
    Scorer,
}

impl FunctionRole {
    /// The global name the Script Engine falls back to if the top-level
    /// script expression does not itself evaluate to a callable.
    pub fn export_name(self) -> &'static str {
        match self {
            Self::Bidder => "generateBid",
            Self::Scorer => "scoreAd",
        }
    }
}

/// The location and, for `local://` URIs, literal source of one bidding or
/// scoring function.
///
/// `uri` is the stable identity of the function across the system.
/// Specs are unique by `uri` within a configuration (enforced by
/// `auction-config`, not by this type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Stable identity of the function. A `local://...` URI requires
    /// `inline_source`; any other scheme denotes a remote fetch and forbids
    /// it.
    pub uri: String,
    /// Literal script text, present iff `uri` begins with `local://`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_source: Option<String>,
    /// Which calling convention this function follows.
    pub role: FunctionRole,
}

impl FunctionSpec {
    /// Build a spec for an inline (`local://`) function.
    pub fn local(uri: impl Into<String>, source: impl Into<String>, role: FunctionRole) -> Self {
        Self {
            uri: uri.into(),
            inline_source: Some(source.into()),
            role,
        }
    }

    /// Build a spec for a remote (`http`/`https`) function.
    pub fn remote(uri: impl Into<String>, role: FunctionRole) -> Self {
        Self {
            uri: uri.into(),
            inline_source: None,
            role,
        }
    }

    /// `true` if this spec's URI uses the `local://` scheme.
    pub fn is_local(&self) -> bool {
        self.uri.starts_with("local://")
    }
}
