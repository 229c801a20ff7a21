//! Core library surface for the code search TUI.
//!
//! `catalog` fetches the instrument catalog and owns the snapshot, `ui`
//! filters it by category, offers it for selection and hosts the terminal
//! page. The binary only wires configuration and logging around them.
pub mod catalog;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;

/// Loading side: configuration, the HTTP source and the snapshot owner.
pub use catalog::{
    CatalogConfig, CatalogSource, CatalogStore, HttpCatalogSource, LoadOutcome, LoadState,
    LoadTicket,
};

pub use error::{LoadError, MalformedRecord};

/// The data types passed between the catalog and the selector.
pub use models::{CatalogRecord, CategoryFilter, CodeDetail, SearchableEntry};

/// The interactive application entry point and state container.
pub use ui::{run_app, App, FilterableSelector};
