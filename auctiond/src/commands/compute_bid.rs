//! `ComputeBid` subcommand: `ComputeBid(ComputeBidRequest) ->
//! BiddingFunctionOutput`.

use auction_core::models::BiddingFunctionInput;
use serde::Deserialize;

use crate::{io::IOArgs, service::AuctionService};

/// The JSON request shape read from the subcommand's input: the RPC
/// `ComputeBidRequest` message, flattened to a file-friendly shape.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputeBidRequest {
    bidding_function_name: String,
    input: BiddingFunctionInput,
}

/// Read a `ComputeBidRequest`, invoke it against the service's Driver, and
/// write the `BiddingFunctionOutput` (or propagate the classified error).
pub fn run(io: &IOArgs, service: &AuctionService) -> anyhow::Result<()> {
    let request: ComputeBidRequest = serde_json::from_reader(io.read()?)?;

    let output = service
        .driver()
        .compute_bid(&request.bidding_function_name, &request.input)?;

    serde_json::to_writer_pretty(io.write()?, &output)?;
    Ok(())
}
