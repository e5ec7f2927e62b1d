//! The in-process `ScriptEngine` implementation.
//!
//! Grounded on two pack examples: `revm-inspectors::JsInspector` for the
//! embedding shape (`Context::eval`, `as_object().filter(is_callable)`,
//! `JsValue::from_json`/`to_json`, `RuntimeLimits` loop/recursion bounds)
//! and `jstz_core::Runtime` for the promise-draining job queue
//! (`runtime::drain_promise`, in this crate).

use std::rc::Rc;

use boa_engine::{Context, JsObject, JsValue, Source, js_string};
use serde_json::Value;

use auction_core::{
    AuctionError,
    models::{
        AdScoringFunctionInput, AdScoringFunctionOutput, BiddingFunctionInput,
        BiddingFunctionOutput, CompiledScript, FunctionRole,
    },
    ports::{EngineOptions, ScriptEngine},
};

use crate::{flatten::FlattenArgs, runtime};

/// `kWarmupIterations`: repeated pre-invocation calls during construction,
/// errors swallowed, to stabilize JIT-produced code.
const WARMUP_ITERATIONS: usize = 10;

/// A generous, wall-clock-independent instruction budget applied to every
/// fresh context as defense-in-depth against runaway scripts, on top of the
/// `kExecuteDeadline` wall-clock bound `invoke` enforces around the whole
/// call (see `DESIGN.md`: `boa_engine::Context` cannot be safely preempted
/// mid-instruction from the thread that owns it, so the deadline is a
/// give-up-waiting bound from the caller's side, not a true kill of the VM;
/// the instruction-count budget below is what actually stops a runaway
/// script in-process). Grounded on `jstz_core::Runtime`'s use of
/// `instructions_remaining`.
const INSTRUCTION_BUDGET: u64 = 64_000_000;

/// Loop-iteration and recursion bounds, grounded directly on
/// `revm-inspectors::JsInspector`'s `RuntimeLimits` configuration.
const LOOP_ITERATION_LIMIT: u64 = 200_000;
const RECURSION_LIMIT: usize = 10_000;

/// The default, always-available `ScriptEngine`: every `compile`/`invoke_*`
/// call builds and tears down its own `boa_engine::Context` in the calling
/// thread: each invocation spins up a fresh isolate.
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessSandbox;

impl InProcessSandbox {
    /// Construct the engine. Stateless: every method call is independent.
    pub fn new() -> Self {
        Self
    }
}

fn fresh_context() -> Context {
    let job_queue = Rc::new(crate::runtime::JobQueue::default());
    let mut context = Context::builder()
        .job_queue(job_queue)
        .instructions_remaining(INSTRUCTION_BUDGET)
        .build()
        .expect("a context with no custom host hooks always builds");
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(LOOP_ITERATION_LIMIT);
    context
        .runtime_limits_mut()
        .set_recursion_limit(RECURSION_LIMIT);
    context
}

/// Evaluate `source` as a top-level script and locate its exported
/// callable.
fn prepare(context: &mut Context, source: &str, role: FunctionRole) -> Result<JsObject, AuctionError> {
    let wrapped = format!("({source})");
    let top_level = context
        .eval(Source::from_bytes(wrapped.as_bytes()))
        .or_else(|_| context.eval(Source::from_bytes(source.as_bytes())))
        .map_err(|e| AuctionError::invalid_argument(format!("script compile/run failed: {e}")))?;

    if let Some(object) = top_level.as_object() {
        if object.is_callable() {
            return Ok(object.clone());
        }
    }

    let global = context
        .global_object()
        .get(js_string!(role.export_name()), context)
        .map_err(|e| AuctionError::invalid_argument(format!("{e}")))?;

    global
        .as_object()
        .filter(|o| o.is_callable())
        .cloned()
        .ok_or_else(|| {
            AuctionError::invalid_argument(format!(
                "script does not evaluate to a callable and exports no global named {}",
                role.export_name()
            ))
        })
}

fn warmup(context: &mut Context, callable: &JsObject) {
    let Ok(empty) = JsValue::from_json(&Value::Object(Default::default()), context) else {
        return;
    };
    for _ in 0..WARMUP_ITERATIONS {
        // Swallowed -- a function that throws on an empty
        // input is still valid once given real input.
        let _ = callable.call(&JsValue::undefined(), &[empty.clone()], context);
    }
}

fn to_json_value<T: serde::Serialize>(value: &T) -> Result<Value, AuctionError> {
    serde_json::to_value(value)
        .map_err(|e| AuctionError::internal(format!("could not serialize invocation input: {e}")))
}

/// `kExecuteDeadline`: the `boa_engine::Context`
/// that does the real work is `!Send` (it's built on `Rc`), so it cannot be
/// handed to a watchdog thread and aborted from outside. Instead the whole
/// invocation runs to completion on a dedicated thread that owns nothing but
/// `Send` inputs, and this thread waits for it with a timeout -- the same
/// shape as `tokio::time::timeout` around a `spawn_blocking`'d call, minus
/// the runtime. A timed-out invocation's thread is left to finish (or hit the
/// instruction budget) on its own; the deadline bounds how long the caller
/// waits, not the VM's own lifetime.
pub(crate) fn invoke(
    source: &str,
    role: FunctionRole,
    args: Vec<Value>,
    options: &EngineOptions,
) -> Result<Value, AuctionError> {
    let source = source.to_owned();
    let options = *options;
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let _ = tx.send(invoke_in_fresh_context(&source, role, args, &options));
    });

    match rx.recv_timeout(options.execute_deadline) {
        Ok(result) => result,
        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => Err(AuctionError::internal(format!(
            "invocation exceeded kExecuteDeadline ({:?})",
            options.execute_deadline
        ))),
        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => Err(AuctionError::internal(
            "invocation thread ended without a result",
        )),
    }
}

fn invoke_in_fresh_context(
    source: &str,
    role: FunctionRole,
    args: Vec<Value>,
    options: &EngineOptions,
) -> Result<Value, AuctionError> {
    let mut context = fresh_context();
    let callable = prepare(&mut context, source, role)?;

    let js_args = args
        .iter()
        .map(|v| JsValue::from_json(v, &mut context))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AuctionError::internal(format!("could not convert argument to JS: {e}")))?;

    let result = callable
        .call(&JsValue::undefined(), &js_args, &mut context)
        .map_err(|e| AuctionError::internal(format!("{e}")))?;

    let settled = runtime::drain_promise(&mut context, result, options.async_wait)?;

    settled.to_json(&mut context).map_err(|e| {
        AuctionError::failed_precondition(format!("could not convert invocation result to JSON: {e}"))
    })
}

impl ScriptEngine for InProcessSandbox {
    fn compile(
        &self,
        uri: &str,
        role: FunctionRole,
        source: &str,
        _options: &EngineOptions,
    ) -> Result<CompiledScript, AuctionError> {
        let mut context = fresh_context();
        let callable = prepare(&mut context, source, role)?;
        warmup(&mut context, &callable);
        Ok(CompiledScript::new(uri, role, source))
    }

    fn invoke_bidder(
        &self,
        script: &CompiledScript,
        input: &BiddingFunctionInput,
        options: &EngineOptions,
    ) -> Result<BiddingFunctionOutput, AuctionError> {
        let args = if options.flatten_arguments {
            input.flatten_args()?
        } else {
            vec![to_json_value(input)?]
        };

        let json = invoke(script.source(), script.role(), args, options)?;
        serde_json::from_value(json).map_err(|_| {
            AuctionError::failed_precondition(
                "Unable to convert the bidding function output from JSON",
            )
        })
    }

    fn invoke_scorer(
        &self,
        script: &CompiledScript,
        input: &AdScoringFunctionInput,
        options: &EngineOptions,
    ) -> Result<AdScoringFunctionOutput, AuctionError> {
        let args = if options.flatten_arguments {
            input.flatten_args()?
        } else {
            vec![to_json_value(input)?]
        };

        let json = invoke(script.source(), script.role(), args, options)?;
        serde_json::from_value(json).map_err(|_| {
            AuctionError::failed_precondition(
                "Unable to convert the ad scoring function output from JSON",
            )
        })
    }
}
