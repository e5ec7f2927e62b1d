#![warn(missing_docs)]
//! Source Fetcher: resolves a `FunctionSpec` to raw script text, either
//! verbatim from its inline source or by blocking HTTP GET.

use auction_core::{AuctionError, models::FunctionSpec, ports::SourceFetcher};

/// The concrete `SourceFetcher` used outside of tests: inline for
/// `local://`, blocking `reqwest::blocking` GET for `http`/`https`.
///
/// Stateless and safe to call concurrently; holds only a shared
/// `reqwest::blocking::Client` so connections can be pooled across refresh
/// cycles.
pub struct BlockingSourceFetcher {
    client: reqwest::blocking::Client,
}

impl BlockingSourceFetcher {
    /// Build a fetcher with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for BlockingSourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher for BlockingSourceFetcher {
    fn fetch(&self, spec: &FunctionSpec) -> Result<String, AuctionError> {
        let url = url::Url::parse(&spec.uri)
            .map_err(|e| AuctionError::invalid_argument(format!("malformed uri: {e}")))?;

        match url.scheme() {
            "local" => spec.inline_source.clone().ok_or_else(|| {
                AuctionError::invalid_argument(format!(
                    "local:// uri {} requires inline_source",
                    spec.uri
                ))
            }),
            "http" | "https" => {
                tracing::debug!(uri = %spec.uri, "fetching remote function source");
                let response = self.client.get(url).send().map_err(|e| {
                    AuctionError::internal(format!("fetch transport failure: {e}"))
                })?;

                let status = response.status();
                if status.is_success() {
                    response
                        .text()
                        .map_err(|e| AuctionError::internal(format!("reading response body: {e}")))
                } else if status.as_u16() == 400 {
                    Err(AuctionError::invalid_argument(format!(
                        "{} returned 400",
                        spec.uri
                    )))
                } else if status.as_u16() == 401 || status.as_u16() == 403 {
                    Err(AuctionError::permission_denied(format!(
                        "{} rejected the fetch ({status})",
                        spec.uri
                    )))
                } else if status.as_u16() == 404 {
                    Err(AuctionError::not_found(format!("{} not found", spec.uri)))
                } else {
                    Err(AuctionError::internal(format!(
                        "{} returned unexpected status {status}",
                        spec.uri
                    )))
                }
            }
            other => Err(AuctionError::invalid_argument(format!(
                "unsupported uri scheme {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::models::FunctionRole;

    #[test]
    fn local_uri_returns_inline_source_verbatim() {
        let fetcher = BlockingSourceFetcher::new();
        let spec = FunctionSpec::local(
            "local://double",
            "input => ({ bid: input.perBuyerSignals.foo * 2 })",
            FunctionRole::Bidder,
        );
        let source = fetcher.fetch(&spec).expect("inline fetch should succeed");
        assert_eq!(source, "input => ({ bid: input.perBuyerSignals.foo * 2 })");
    }

    #[test]
    fn local_uri_without_inline_source_is_invalid_argument() {
        let fetcher = BlockingSourceFetcher::new();
        let spec = FunctionSpec {
            uri: "local://missing".into(),
            inline_source: None,
            role: FunctionRole::Bidder,
        };
        let err = fetcher.fetch(&spec).unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn malformed_uri_is_invalid_argument() {
        let fetcher = BlockingSourceFetcher::new();
        let spec = FunctionSpec {
            uri: "not a uri".into(),
            inline_source: None,
            role: FunctionRole::Bidder,
        };
        let err = fetcher.fetch(&spec).unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::InvalidArgument);
    }
}
