use std::time::Duration;

use crate::{
    AuctionError,
    models::{AdScoringFunctionInput, AdScoringFunctionOutput, BiddingFunctionInput,
        BiddingFunctionOutput, CompiledScript, FunctionRole},
};

/// Per-construction/invocation tunables, also surfaced as CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Selects the JS argument-building convention at invocation time:
    /// object mode (`false`) passes the whole input as one JSON object;
    /// flattened mode (`true`) passes each top-level field positionally.
    pub flatten_arguments: bool,
    /// `kAsyncWait`: how long to cooperatively drain the microtask queue for
    /// a returned Promise before treating it as timed out. Default 50ms.
    pub async_wait: Duration,
    /// `kExecuteDeadline`: wall-clock bound on a single invocation,
    /// enforced by the sandbox layer and disarmed between invocations.
    /// Default 1s.
    pub execute_deadline: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            flatten_arguments: false,
            async_wait: Duration::from_millis(50),
            execute_deadline: Duration::from_secs(1),
        }
    }
}

/// Compiles, warms up, and invokes a single JS function inside an isolated
/// sandbox; the core of the core.
///
/// A `ScriptEngine` implementation is constructed once and reused across
/// every `compile`/`invoke_*` call; the isolation guarantee is per-call (a
/// fresh VM context per invocation), not per `ScriptEngine` instance.
pub trait ScriptEngine: Send + Sync {
    /// Compile and warm up `source` under `role`.
    ///
    /// Returns a [`CompiledScript`] handle suitable for storing in a
    /// `Repository` snapshot, or an `invalid-argument` [`AuctionError`] on
    /// compile/runtime/export failure.
    fn compile(
        &self,
        uri: &str,
        role: FunctionRole,
        source: &str,
        options: &EngineOptions,
    ) -> Result<CompiledScript, AuctionError>;

    /// Invoke a compiled bidding function once, using the `Bidder` calling
    /// convention.
    fn invoke_bidder(
        &self,
        script: &CompiledScript,
        input: &BiddingFunctionInput,
        options: &EngineOptions,
    ) -> Result<BiddingFunctionOutput, AuctionError>;

    /// Invoke a compiled scoring function once, using the `Scorer` calling
    /// convention.
    fn invoke_scorer(
        &self,
        script: &CompiledScript,
        input: &AdScoringFunctionInput,
        options: &EngineOptions,
    ) -> Result<AdScoringFunctionOutput, AuctionError>;
}
