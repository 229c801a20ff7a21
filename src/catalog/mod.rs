//! Catalog loading split across logical submodules: configuration, the wire
//! payload, the source that performs requests and the store that owns the
//! snapshot.

mod config;
mod payload;
mod source;
mod store;

pub use config::{
    data_dir, CatalogConfig, MarketScope, DEFAULT_ENDPOINT, ENDPOINT_ENV, MARKET_ENV, TIMEOUT_ENV,
};
pub use payload::{parse_catalog, ParsedCatalog};
pub use source::{CatalogSource, HttpCatalogSource};
pub use store::{ApplyResult, CatalogStore, LoadOutcome, LoadState, LoadTicket};
