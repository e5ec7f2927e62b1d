//! Command-line interface: a `clap::Parser` derive with flags mirrored by
//! environment variables.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};

use crate::io::IOArgs;

/// Top-level CLI, shared across every subcommand.
///
/// Flag names are `snake_case` (`--configuration_file`, not
/// `--configuration-file`) to match the specified flag list exactly.
#[derive(Parser)]
#[command(version, about, long_about = None, rename_all = "snake_case")]
pub struct Cli {
    /// Path to the YAML configuration file listing bidding and ad-scoring
    /// functions.
    #[arg(long, env = "CONFIGURATION_FILE")]
    pub configuration_file: PathBuf,

    /// Address the RPC shell would bind to. Accepted for CLI-surface
    /// completeness only; binding an RPC listener is explicitly out of
    /// scope for this binary. The RPC server shell is treated as an
    /// external collaborator.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:50051")]
    pub bind_address: String,

    /// Run each compiled script in a separate OS-level process sandbox
    /// with a minimal syscall policy.
    #[arg(long, env = "USE_SANDBOX2")]
    pub use_sandbox2: bool,

    /// How often the Periodic Refresher rebuilds the Function Repository.
    /// Default 1 minute.
    #[arg(
        long,
        env = "FUNCTION_REFRESH_INTERVAL",
        default_value = "1min",
        value_parser = parse_duration,
    )]
    pub function_refresh_interval: Duration,

    /// `kAsyncWait`: how long a bidding/scoring invocation cooperatively
    /// drains a returned promise before treating it as timed out. Default
    /// 50ms.
    #[arg(
        long,
        env = "BIDDING_FUNCTION_ASYNC_WAIT",
        default_value = "50ms",
        value_parser = parse_duration,
    )]
    pub bidding_function_async_wait: Duration,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// The two RPC-equivalent operations, each driven from a JSON request read
/// from a file or stdin, plus a `serve` subcommand that keeps the Periodic
/// Refresher running the way a real RPC shell's long-lived process would.
#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one bidding script against one input (`ComputeBid`). Reads
    /// a `{ "biddingFunctionName", "input" }` JSON request, writes a
    /// `BiddingFunctionOutput` JSON response.
    ComputeBid {
        #[command(flatten)]
        io: IOArgs,
    },
    /// Run a full sealed-bid auction (`RunAdAuction`). Reads a
    /// `{ "interestGroups", "auctionConfiguration", "trustedScoringSignals"
    /// }` JSON request, writes a `RunAdAuctionResponse` JSON response.
    RunAuction {
        #[command(flatten)]
        io: IOArgs,
    },
    /// Boot the service once and keep the Periodic Refresher running until
    /// terminated. The RPC surface itself is out of scope; this is the
    /// host loop a real RPC shell would wrap.
    Serve,
}
