//! Interface traits (the hexagonal "ports") implemented by the adapter
//! crates: one trait per seam, defined so the CORE (the driver and the
//! refresher) can be written once against the trait and tested against
//! fakes, with a concrete `boa_engine`/`reqwest`/`arc-swap` implementation
//! swapped in at the edge.

mod fetcher;
pub use fetcher::SourceFetcher;

mod engine;
pub use engine::{EngineOptions, ScriptEngine};

mod repository;
pub use repository::Repository;
