//! Binary entry point: resolve configuration, start logging, and hand the
//! catalog store to the terminal page.
use std::sync::Arc;

use code_search::catalog::data_dir;
use code_search::logging::init_logging;
use code_search::{run_app, App, CatalogConfig, CatalogStore, HttpCatalogSource};
use tracing::info;

/// Returning a `Result` bubbles fatal startup problems (unreadable config,
/// unusable terminal) up to the shell instead of crashing silently.
fn main() -> anyhow::Result<()> {
    let log_path = init_logging(&data_dir()?)?;
    let config = CatalogConfig::load()?;
    info!(
        endpoint = %config.endpoint,
        market = ?config.market,
        log = %log_path.display(),
        "starting code search"
    );

    let source = HttpCatalogSource::new(config)?;
    let mut app = App::new(CatalogStore::new(Arc::new(source)));
    app.start();
    run_app(&mut app)
}
