#![warn(missing_docs)]
//! Configuration file model.
//!
//! Follows a "read a file, map the filesystem/parse failure into a typed
//! error, validate before returning" shape: a single authoritative YAML
//! source, per the specification, with no environment-variable overlay of
//! its own.

use std::{collections::HashSet, path::Path};

use auction_core::{
    AuctionError,
    models::{FunctionRole, FunctionSpec},
};
use serde::Deserialize;

/// One `{ uri, source? }` entry in either function list.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionEntry {
    /// Stable identity of the function.
    pub uri: String,
    /// Literal script text. Required iff `uri` uses the `local://` scheme,
    /// forbidden otherwise.
    #[serde(default)]
    pub source: Option<String>,
}

/// The top-level configuration file shape: two lists of function entries,
/// one per [`FunctionRole`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Buyer-supplied bidding functions.
    #[serde(default)]
    pub bidding_functions: Vec<FunctionEntry>,
    /// Seller-supplied ad scoring functions.
    #[serde(default)]
    pub ad_scoring_functions: Vec<FunctionEntry>,
}

impl Config {
    /// Load and validate a configuration file from disk.
    ///
    /// Missing file → *not-found*; structurally malformed YAML or a
    /// validation failure → *invalid-argument*.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AuctionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuctionError::not_found(format!(
                    "configuration file {} does not exist",
                    path.display()
                ))
            } else {
                AuctionError::internal(format!(
                    "reading configuration file {}: {e}",
                    path.display()
                ))
            }
        })?;
        Self::parse(&text)
    }

    /// Parse and validate configuration from an in-memory YAML document
    /// (the `load` logic split out so tests don't need a filesystem).
    pub fn parse(yaml: &str) -> Result<Self, AuctionError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| AuctionError::invalid_argument(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuctionError> {
        reject_duplicates(&self.bidding_functions)?;
        reject_duplicates(&self.ad_scoring_functions)?;
        for entry in self.bidding_functions.iter().chain(&self.ad_scoring_functions) {
            entry.validate_source_requirement()?;
        }
        Ok(())
    }

    /// Project the configured bidding functions into [`FunctionSpec`]s, for
    /// handing to the Source Fetcher / Script Engine construction pipeline.
    pub fn bidder_specs(&self) -> Vec<FunctionSpec> {
        self.bidding_functions
            .iter()
            .map(|e| e.to_spec(FunctionRole::Bidder))
            .collect()
    }

    /// The ad-scoring counterpart of [`Config::bidder_specs`].
    pub fn scorer_specs(&self) -> Vec<FunctionSpec> {
        self.ad_scoring_functions
            .iter()
            .map(|e| e.to_spec(FunctionRole::Scorer))
            .collect()
    }
}

fn reject_duplicates(entries: &[FunctionEntry]) -> Result<(), AuctionError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.uri.as_str()) {
            return Err(AuctionError::invalid_argument(format!(
                "uri {} defined more than once",
                entry.uri
            )));
        }
    }
    Ok(())
}

impl FunctionEntry {
    fn validate_source_requirement(&self) -> Result<(), AuctionError> {
        let is_local = self.uri.starts_with("local://");
        if is_local && self.source.is_none() {
            return Err(AuctionError::invalid_argument(format!(
                "uri {} uses the local:// scheme and requires source",
                self.uri
            )));
        }
        if !is_local && self.source.is_some() {
            return Err(AuctionError::invalid_argument(format!(
                "uri {} is not local:// but specifies source",
                self.uri
            )));
        }
        Ok(())
    }

    fn to_spec(&self, role: FunctionRole) -> FunctionSpec {
        FunctionSpec {
            uri: self.uri.clone(),
            inline_source: self.source.clone(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_function_lists() {
        let config = Config::parse(
            r#"
biddingFunctions:
  - uri: "local://double"
    source: "input => ({ bid: input.perBuyerSignals.foo * 2 })"
adScoringFunctions:
  - uri: "local://preferFunnyAds"
    source: "input => ({ desirabilityScore: input.bid })"
"#,
        )
        .expect("valid config should parse");

        assert_eq!(config.bidder_specs().len(), 1);
        assert_eq!(config.scorer_specs().len(), 1);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let config = Config::parse("{}").expect("an empty document is valid");
        assert!(config.bidder_specs().is_empty());
        assert!(config.scorer_specs().is_empty());
    }

    #[test]
    fn local_uri_without_source_is_invalid_argument() {
        let err = Config::parse(
            r#"
biddingFunctions:
  - uri: "local://missing-source"
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn remote_uri_with_source_is_invalid_argument() {
        let err = Config::parse(
            r#"
biddingFunctions:
  - uri: "https://example.com/bid.js"
    source: "should not be here"
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn duplicate_uri_is_invalid_argument() {
        let err = Config::parse(
            r#"
biddingFunctions:
  - uri: "local://double"
    source: "a"
  - uri: "local://double"
    source: "b"
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::InvalidArgument);
        assert!(err.message().contains("defined more than once"));
    }

    #[test]
    fn malformed_yaml_is_invalid_argument() {
        let err = Config::parse("bidding_functions: [").unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Config::load("/nonexistent/path/to/config.yaml").unwrap_err();
        assert_eq!(err.kind(), auction_core::ErrorKind::NotFound);
    }
}
