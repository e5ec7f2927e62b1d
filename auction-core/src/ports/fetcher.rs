use crate::{AuctionError, models::FunctionSpec};

/// Resolves a [`FunctionSpec`] to raw script text.
///
/// Implementations must be stateless and safe to call concurrently; they may
/// cache by URI but must not serve stale content across refresh cycles
/// without revalidation. Fetching is a blocking operation by contract: it
/// performs blocking HTTP GETs during Repository construction only, never on
/// the request path; the refresher is responsible for running it off the
/// async executor.
pub trait SourceFetcher: Send + Sync {
    /// Resolve `spec` to its raw script text, or a classified
    /// [`AuctionError`] per the status mapping.
    fn fetch(&self, spec: &FunctionSpec) -> Result<String, AuctionError>;
}
