//! Domain entities.

mod function;
pub use function::{FunctionRole, FunctionSpec};

mod snapshot;
pub use snapshot::{CompiledScript, Presence, Snapshot};

mod bidding;
pub use bidding::{Ad, BiddingFunctionInput, BiddingFunctionOutput, InterestGroup};

mod scoring;
pub use scoring::{
    AdScoringFunctionInput, AdScoringFunctionOutput, AuctionConfiguration, RunAdAuctionResponse,
    ScoredBid,
};

/// A generic JSON-like structured value (null, number, bool, string, list,
/// map), round-tripped through JSON whenever it crosses the JS sandbox
/// boundary. `serde_json::Value` is exactly what the pack's script-sandbox
/// examples (`revm-inspectors`' `JsInspector`, `jstz_core::Runtime`) hand to
/// `boa_engine::JsValue::from_json`.
pub type Signals = serde_json::Value;
