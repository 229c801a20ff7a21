//! Ratatui front-end: the filterable selector, the page that hosts it, and
//! the terminal loop that drives both.

mod app;
mod helpers;
mod selector;
mod terminal;

pub use app::{App, AppEvent, DetailOutcome, DetailPanel};
pub use selector::FilterableSelector;
pub use terminal::run_app;
