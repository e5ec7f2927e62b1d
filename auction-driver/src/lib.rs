#![warn(missing_docs)]
//! Auction Driver: the per-request pipeline that filters, bids, scores,
//! ranks, and classifies outcomes with well-defined partial-failure
//! semantics.
//!
//! Generic over nothing beyond the `auction-core` port traits: this system
//! has exactly one Repository implementation and one Script Engine
//! implementation, so there is nothing to parameterize. An
//! `Application<Repository>`-style generic would be inventing flexibility
//! nobody asked for.

use std::sync::Arc;

use auction_core::{
    AuctionError,
    models::{
        AdScoringFunctionInput, AuctionConfiguration, BiddingFunctionInput, BiddingFunctionOutput,
        InterestGroup, RunAdAuctionResponse, ScoredBid,
    },
    ports::{EngineOptions, Repository, ScriptEngine},
};
use rustc_hash::FxHashMap;

/// Orchestrates `ComputeBid` and `RunAdAuction` against a [`Repository`]
/// and a [`ScriptEngine`].
pub struct AuctionDriver<R, E> {
    repository: Arc<R>,
    engine: Arc<E>,
    options: EngineOptions,
}

impl<R, E> AuctionDriver<R, E>
where
    R: Repository,
    E: ScriptEngine,
{
    /// Build a driver over a repository and script engine, with the given
    /// invocation tunables.
    pub fn new(repository: Arc<R>, engine: Arc<E>, options: EngineOptions) -> Self {
        Self {
            repository,
            engine,
            options,
        }
    }

    /// `ComputeBid(name, input) -> BiddingFunctionOutput`.
    ///
    /// Acquires the current Repository snapshot once, looks up the named
    /// bidder (propagating *not-found*/*unavailable* verbatim), and invokes
    /// it exactly once against `input` (see `DESIGN.md`'s Open Question #2:
    /// this never routes through a multi-input batch path).
    pub fn compute_bid(
        &self,
        name: &str,
        input: &BiddingFunctionInput,
    ) -> Result<BiddingFunctionOutput, AuctionError> {
        let script = self.repository.get_bidder(name)?;
        self.engine.invoke_bidder(&script, input, &self.options)
    }

    /// `RunAdAuction(interest_groups, auction_config, trusted_scoring_signals)
    /// -> { winner?, losers[] }`.
    pub fn run_ad_auction(
        &self,
        interest_groups: &[InterestGroup],
        auction_config: &AuctionConfiguration,
        trusted_scoring_signals_by_render_url: &FxHashMap<String, auction_core::models::Signals>,
    ) -> Result<RunAdAuctionResponse, AuctionError> {
        let allow_set: std::collections::HashSet<&str> = auction_config
            .interest_group_buyers
            .iter()
            .map(String::as_str)
            .collect();

        let mut scored = Vec::with_capacity(interest_groups.len());

        for group in interest_groups {
            // 2a. Not in the allow-set: dropped silently, never a loser.
            if !allow_set.contains(group.owner.as_str()) {
                continue;
            }

            // 2b. Project per-buyer signals for this owner (missing -> omit).
            let per_buyer_signals = auction_config.per_buyer_signals.get(&group.owner).cloned();
            let bidding_input = BiddingFunctionInput {
                interest_group: group.clone(),
                auction_signals: auction_config.auction_signals.clone(),
                per_buyer_signals,
                trusted_bidding_signals: group.trusted_bidding_signals.clone(),
                browser_signals: group.browser_signals.clone(),
            };

            // 2c. Missing/unavailable bidder: skip silently.
            let bidder_script = match self.repository.get_bidder(&group.bidding_logic_url) {
                Ok(script) => script,
                Err(_) => {
                    tracing::debug!(
                        owner = %group.owner, name = %group.name,
                        "skipping candidate: bidder unavailable"
                    );
                    continue;
                }
            };

            // 2d. Any bidder invocation failure: skip silently.
            let bid = match self
                .engine
                .invoke_bidder(&bidder_script, &bidding_input, &self.options)
            {
                Ok(bid) => bid,
                Err(e) => {
                    tracing::debug!(
                        owner = %group.owner, name = %group.name, error = %e,
                        "skipping candidate: bidder invocation failed"
                    );
                    continue;
                }
            };

            // 2e. Missing scorer: fail the whole auction (configuration
            // error, distinct from a routine missing-bidder availability
            // issue).
            let scorer_script = self.repository.get_scorer(&auction_config.decision_logic_url)?;

            // 2f. Scorer invocation failure: fail the whole auction with
            // the scorer's own error kind.
            let render_url = bid.render_url.clone();
            let trusted_scoring_signals = render_url
                .as_deref()
                .and_then(|url| trusted_scoring_signals_by_render_url.get(url))
                .cloned();

            let scoring_input = AdScoringFunctionInput {
                ad_metadata: bid.ad.clone().unwrap_or(serde_json::Value::Null),
                bid: bid.bid,
                auction_config: auction_config.clone(),
                trusted_scoring_signals,
                browser_signals: group.browser_signals.clone(),
            };

            let score = self
                .engine
                .invoke_scorer(&scorer_script, &scoring_input, &self.options)?;

            // 2g. Append a ScoredBid.
            scored.push(ScoredBid {
                owner: group.owner.clone(),
                name: group.name.clone(),
                render_url,
                bid_price: bid.bid,
                desirability_score: score.desirability_score,
            });
        }

        // 3. Stable sort by desirability_score descending; ties preserve
        // insertion order (Rust's `sort_by` is a stable sort).
        scored.sort_by(|a, b| {
            b.desirability_score
                .partial_cmp(&a.desirability_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // 4. Winner iff non-empty and the head score is strictly positive.
        let response = match scored.first() {
            Some(head) if head.desirability_score > 0.0 => {
                let mut losers = scored;
                let winner = losers.remove(0);
                RunAdAuctionResponse {
                    winning_bid: Some(winner),
                    losing_bids: losers,
                }
            }
            _ => RunAdAuctionResponse {
                winning_bid: None,
                losing_bids: scored,
            },
        };

        Ok(response)
    }
}
