//! Log setup. The terminal belongs to the UI, so events go to a file in the
//! data directory instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Filter directives read before falling back to `RUST_LOG`.
pub const LOG_ENV: &str = "CODE_SEARCH_LOG";
const LOG_FILE_NAME: &str = "code-search.log";

/// Install the global subscriber writing to `<dir>/code-search.log` and
/// return the file path. Later calls only resolve the path.
pub fn init_logging(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("failed to create data directory")?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
            .try_init();
    });

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let first = init_logging(dir.path()).unwrap();
        let second = init_logging(dir.path()).unwrap();
        assert_eq!(first, second);
        assert!(first.exists());
        tracing::info!("logging initialized in test");
    }
}
