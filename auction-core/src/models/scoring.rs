use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::Signals;

/// Seller-provided configuration for one `RunAdAuction` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionConfiguration {
    /// The seller running this auction.
    pub seller: String,
    /// URI of the scoring function to invoke for every candidate.
    pub decision_logic_url: String,
    /// Allow-set of buyer owners eligible to participate.
    pub interest_group_buyers: Vec<String>,
    /// Seller-supplied, auction-wide signals passed through to the scorer.
    pub auction_signals: Signals,
    /// Seller-supplied signals passed through to bidders.
    pub seller_signals: Signals,
    /// Buyer-specific signals, keyed by owner.
    #[serde(default)]
    pub per_buyer_signals: FxHashMap<String, Signals>,
}

/// The arguments passed to a scoring function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdScoringFunctionInput {
    /// The ad metadata the winning bid was computed against.
    pub ad_metadata: Signals,
    /// The bid price returned by the bidder.
    pub bid: f64,
    /// The auction configuration in effect.
    pub auction_config: AuctionConfiguration,
    /// Trusted scoring signals for this ad's render URL, if any were
    /// supplied (absent otherwise).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_scoring_signals: Option<Signals>,
    /// Browser-observed context.
    pub browser_signals: Signals,
}

/// What a scoring function returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdScoringFunctionOutput {
    /// Higher is better; non-positive scores never win.
    pub desirability_score: f64,
}

/// One candidate's outcome after bidding and scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredBid {
    /// The bidding buyer.
    pub owner: String,
    /// The interest group's name, scoped to `owner`.
    pub name: String,
    /// The render URL of the bid ad.
    pub render_url: Option<String>,
    /// The bid price.
    pub bid_price: f64,
    /// The score assigned by the seller's scoring function.
    pub desirability_score: f64,
}

/// The result of a `RunAdAuction` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunAdAuctionResponse {
    /// The highest-scoring candidate, iff its score is strictly positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_bid: Option<ScoredBid>,
    /// Every other candidate, sorted by score descending.
    #[serde(default)]
    pub losing_bids: Vec<ScoredBid>,
}
