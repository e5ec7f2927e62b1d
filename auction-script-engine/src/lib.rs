#![warn(missing_docs)]
//! Script Engine: compiles, warms up, and safely invokes a single bidding
//! or scoring function inside an isolated `boa_engine` VM, the core of the
//! core, with an optional OS-process sandbox variant behind the `sandbox`
//! feature.

mod engine;
pub use engine::InProcessSandbox;

mod flatten;

mod runtime;

#[cfg(feature = "sandbox")]
pub mod sandbox;
