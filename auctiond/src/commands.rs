//! One module per subcommand.

pub mod compute_bid;
pub mod run_auction;
pub mod serve;
