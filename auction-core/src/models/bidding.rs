use serde::{Deserialize, Serialize};

use super::Signals;

/// One candidate in a `RunAdAuction` call: an interest group's auction
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestGroup {
    /// The buyer this interest group bids on behalf of.
    pub owner: String,
    /// Human-readable name, scoped to `owner`.
    pub name: String,
    /// URI of the bidding function to invoke for this group.
    pub bidding_logic_url: String,
    /// Candidate ads, each carrying arbitrary metadata and a render URL.
    pub ads: Vec<Ad>,
    /// Buyer-supplied signals attached at registration time.
    pub user_bidding_signals: Signals,
    /// Signals fetched from a trusted bidding-signals server.
    pub trusted_bidding_signals: Signals,
    /// Browser-observed context (e.g. top-level origin) the bidder receives.
    pub browser_signals: Signals,
}

/// One candidate ad within an [`InterestGroup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    /// Buyer-supplied metadata describing the creative.
    pub metadata: Signals,
    /// Canonical identity of the ad creative; key into trusted scoring
    /// signals.
    pub render_url: String,
}

/// The five FLEDGE arguments passed to a bidding function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiddingFunctionInput {
    /// The interest group bidding in this call.
    pub interest_group: InterestGroup,
    /// Seller-supplied, auction-wide signals.
    pub auction_signals: Signals,
    /// Buyer-specific signals keyed by owner, projected down to this
    /// bidder's own entry; a missing key omits the field entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_buyer_signals: Option<Signals>,
    /// Signals fetched from a trusted bidding-signals server.
    pub trusted_bidding_signals: Signals,
    /// Browser-observed context.
    pub browser_signals: Signals,
}

/// What a bidding function returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiddingFunctionOutput {
    /// The chosen ad's metadata, echoed back for the scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad: Option<Signals>,
    /// The bid price, in the buyer's own currency/units.
    pub bid: f64,
    /// The render URL of the ad being bid on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_url: Option<String>,
}
