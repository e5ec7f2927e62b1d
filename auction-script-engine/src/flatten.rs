//! Flattened-mode argument building: field flattening from a reflective
//! input, expressed here as a per-input trait providing `flatten_args`,
//! implemented once per input shape.
//!
//! The original's reflective field walk (over protobuf field descriptors)
//! has no equivalent in a statically typed Rust DTO: every field of
//! [`BiddingFunctionInput`]/[`AdScoringFunctionInput`] is already a known,
//! JSON-representable Rust type, so "message fields become objects; double
//! fields become numbers" is simply what `serde_json::to_value` already
//! does for them. The "any other field type → failed-precondition" clause
//! has no reachable case here since the type system rules it out at
//! compile time; `flatten_args` still returns a `Result` so a future field
//! addition that fails to serialize degrades gracefully instead of
//! panicking.

use auction_core::{
    AuctionError,
    models::{AdScoringFunctionInput, BiddingFunctionInput},
};
use serde_json::Value;

/// Projects a DTO's top-level fields, in declaration order, into the
/// positional arguments a flattened-mode invocation passes to the JS
/// function.
pub(crate) trait FlattenArgs {
    /// A missing optional field is omitted from the returned vector
    /// entirely, so the JS function simply receives one fewer trailing
    /// argument rather than an explicit `null`.
    fn flatten_args(&self) -> Result<Vec<Value>, AuctionError>;
}

fn to_value<T: serde::Serialize>(value: &T, field: &str) -> Result<Value, AuctionError> {
    serde_json::to_value(value).map_err(|e| {
        AuctionError::failed_precondition(format!("could not convert field {field} to JSON: {e}"))
    })
}

impl FlattenArgs for BiddingFunctionInput {
    fn flatten_args(&self) -> Result<Vec<Value>, AuctionError> {
        let mut args = vec![
            to_value(&self.interest_group, "interestGroup")?,
            self.auction_signals.clone(),
        ];
        if let Some(per_buyer_signals) = &self.per_buyer_signals {
            args.push(per_buyer_signals.clone());
        }
        args.push(self.trusted_bidding_signals.clone());
        args.push(self.browser_signals.clone());
        Ok(args)
    }
}

impl FlattenArgs for AdScoringFunctionInput {
    fn flatten_args(&self) -> Result<Vec<Value>, AuctionError> {
        let mut args = vec![
            self.ad_metadata.clone(),
            Value::from(self.bid),
            to_value(&self.auction_config, "auctionConfig")?,
        ];
        if let Some(trusted_scoring_signals) = &self.trusted_scoring_signals {
            args.push(trusted_scoring_signals.clone());
        }
        args.push(self.browser_signals.clone());
        Ok(args)
    }
}
