#![warn(missing_docs)]
//! Domain model, error taxonomy, and port traits shared by every crate that
//! makes up the sandboxed bidding/scoring auction engine.
//!
//! This crate has no opinion on how scripts are fetched, compiled, stored, or
//! invoked; it only names the types and traits (the "ports", in hexagonal
//! terms) that the adapter crates (`auction-fetcher`, `auction-script-engine`,
//! `auction-registry`, `auction-driver`) implement and consume.

/// Core domain entities: function specs, repository snapshots, auction
/// inputs and outputs.
pub mod models;

/// Interface traits implemented by the fetcher, script engine, and
/// repository adapters.
pub mod ports;

mod error;
pub use error::{AuctionError, ErrorKind, StatusCode};
