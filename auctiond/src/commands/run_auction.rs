//! `RunAuction` subcommand: `RunAdAuction(RunAdAuctionRequest) ->
//! RunAdAuctionResponse`.

use auction_core::models::{AuctionConfiguration, InterestGroup, Signals};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{io::IOArgs, service::AuctionService};

/// The JSON request shape read from the subcommand's input: the RPC
/// `RunAdAuctionRequest` message.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunAuctionRequest {
    interest_groups: Vec<InterestGroup>,
    auction_configuration: AuctionConfiguration,
    #[serde(default)]
    trusted_scoring_signals: FxHashMap<String, Signals>,
}

/// Read a `RunAdAuctionRequest`, run it against the service's Driver, and
/// write the `RunAdAuctionResponse` (or propagate the classified error).
pub fn run(io: &IOArgs, service: &AuctionService) -> anyhow::Result<()> {
    let request: RunAuctionRequest = serde_json::from_reader(io.read()?)?;

    let response = service.driver().run_ad_auction(
        &request.interest_groups,
        &request.auction_configuration,
        &request.trusted_scoring_signals,
    )?;

    serde_json::to_writer_pretty(io.write()?, &response)?;
    Ok(())
}
