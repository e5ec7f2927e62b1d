//! `Serve` subcommand: boots the service and keeps the Periodic Refresher
//! running until a termination signal arrives.
//!
//! The RPC surface itself (binding `bind_address`, handling `ComputeBid`/
//! `RunAdAuction` requests over the wire) is explicitly out of scope; this
//! is the host loop a real RPC shell would wrap its listener around.

use crate::service::AuctionService;

/// Run until `Ctrl-C`, keeping the refresher alive in the background.
pub async fn run(service: &AuctionService, bind_address: &str) -> anyhow::Result<()> {
    tracing::info!(
        %bind_address,
        "RPC shell is out of scope for this binary; \
         serving only the Periodic Refresher loop"
    );

    let (refresher_handle, shutdown) = service.spawn_refresher();

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, stopping the refresher");
    shutdown.cancel();
    refresher_handle.await?;

    Ok(())
}
