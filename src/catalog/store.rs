use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::payload::ParsedCatalog;
use super::source::CatalogSource;
use crate::error::LoadError;
use crate::models::{CatalogRecord, SearchableEntry};

/// Identifies one issued catalog request. Tickets grow monotonically, so the
/// most recently issued one is always the largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Result of a finished request, tagged with the ticket it was issued under.
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub result: Result<ParsedCatalog, LoadError>,
}

/// Observable lifecycle of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing requested yet.
    Idle,
    /// The most recently issued request has not come back.
    Loading,
    Loaded { count: usize, dropped: usize },
    /// The last request failed; the snapshot is empty.
    Failed(String),
}

/// What [`CatalogStore::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    /// A newer request had been issued (or the store was cancelled) before
    /// this one came back; the outcome was dropped.
    Stale,
}

/// Owns the catalog snapshot. Only the owning thread mutates it: requests run
/// on worker threads, but their outcomes come back as messages and are folded
/// in through [`CatalogStore::apply`].
pub struct CatalogStore {
    source: Arc<dyn CatalogSource>,
    records: Arc<[CatalogRecord]>,
    snapshot: Arc<[SearchableEntry]>,
    settled: LoadState,
    latest: u64,
    in_flight: Option<u64>,
}

impl CatalogStore {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            records: Arc::from(Vec::new()),
            snapshot: Arc::from(Vec::new()),
            settled: LoadState::Idle,
            latest: 0,
            in_flight: None,
        }
    }

    /// Shared handle to the source, for callers that need per-code lookups.
    pub fn source(&self) -> Arc<dyn CatalogSource> {
        Arc::clone(&self.source)
    }

    /// Issue a new ticket and mark it as the only one whose outcome counts.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest += 1;
        self.in_flight = Some(self.latest);
        info!(ticket = self.latest, "catalog load issued");
        LoadTicket(self.latest)
    }

    /// Fetch the catalog on a worker thread. The outcome is delivered through
    /// `events`; the caller applies it on its own turn. If the receiver is
    /// gone by then the outcome is simply lost.
    pub fn load<E>(&mut self, events: &Sender<E>) -> LoadTicket
    where
        E: From<LoadOutcome> + Send + 'static,
    {
        let ticket = self.begin_load();
        let source = Arc::clone(&self.source);
        let events = events.clone();

        let spawned = thread::Builder::new()
            .name("catalog-load".to_string())
            .spawn(move || {
                let result = source.fetch_catalog();
                let _ = events.send(E::from(LoadOutcome { ticket, result }));
            });

        if let Err(err) = spawned {
            self.apply(LoadOutcome {
                ticket,
                result: Err(LoadError::Transport {
                    url: String::new(),
                    message: format!("could not start catalog worker: {err}"),
                }),
            });
        }

        ticket
    }

    /// Fetch and apply on the calling thread.
    pub fn load_blocking(&mut self) -> ApplyResult {
        let ticket = self.begin_load();
        let result = self.source.fetch_catalog();
        self.apply(LoadOutcome { ticket, result })
    }

    /// Fold a finished request into the store. Only the outcome of the most
    /// recently issued ticket is accepted; everything else is stale no matter
    /// when it arrives. Failures empty the snapshot and never propagate.
    pub fn apply(&mut self, outcome: LoadOutcome) -> ApplyResult {
        let LoadTicket(ticket) = outcome.ticket;
        if self.in_flight != Some(ticket) {
            debug!(ticket, latest = self.latest, "discarding stale catalog response");
            return ApplyResult::Stale;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(parsed) => {
                let snapshot: Vec<SearchableEntry> =
                    parsed.records.iter().map(SearchableEntry::from).collect();
                info!(
                    ticket,
                    count = snapshot.len(),
                    dropped = parsed.dropped,
                    "catalog loaded"
                );
                self.settled = LoadState::Loaded {
                    count: snapshot.len(),
                    dropped: parsed.dropped,
                };
                self.records = Arc::from(parsed.records);
                self.snapshot = Arc::from(snapshot);
            }
            Err(err) => {
                warn!(ticket, error = %err, "catalog load failed");
                self.settled = LoadState::Failed(err.to_string());
                self.records = Arc::from(Vec::new());
                self.snapshot = Arc::from(Vec::new());
            }
        }

        ApplyResult::Applied
    }

    /// Invalidate every request issued so far. Their outcomes will be stale.
    pub fn cancel(&mut self) {
        if self.in_flight.take().is_some() {
            debug!(ticket = self.latest, "cancelling in-flight catalog load");
        }
        self.latest += 1;
    }

    /// Current searchable snapshot. Cheap to call and free of side effects;
    /// calls between two applied loads return the same allocation.
    pub fn get_all(&self) -> Arc<[SearchableEntry]> {
        Arc::clone(&self.snapshot)
    }

    /// Decoded records behind the current snapshot.
    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn state(&self) -> LoadState {
        if self.is_loading() {
            LoadState::Loading
        } else {
            self.settled.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::models::CodeDetail;

    /// Hands out scripted catalog results, one per call.
    struct ScriptedSource {
        results: Mutex<Vec<Result<ParsedCatalog, LoadError>>>,
    }

    impl ScriptedSource {
        fn new(mut results: Vec<Result<ParsedCatalog, LoadError>>) -> Arc<Self> {
            results.reverse();
            Arc::new(Self {
                results: Mutex::new(results),
            })
        }
    }

    impl CatalogSource for ScriptedSource {
        fn fetch_catalog(&self) -> Result<ParsedCatalog, LoadError> {
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(ParsedCatalog::default()))
        }

        fn fetch_detail(&self, code: &str) -> Result<CodeDetail, LoadError> {
            Err(LoadError::NotFound {
                code: code.to_string(),
            })
        }
    }

    fn catalog(codes: &[&str]) -> ParsedCatalog {
        ParsedCatalog {
            records: codes
                .iter()
                .map(|code| CatalogRecord {
                    code: code.to_string(),
                    name: format!("Name {code}"),
                    market: "1".to_string(),
                    is_etf: false,
                    is_spac: false,
                })
                .collect(),
            dropped: 0,
        }
    }

    fn codes(store: &CatalogStore) -> Vec<String> {
        store.get_all().iter().map(|e| e.value.clone()).collect()
    }

    #[test]
    fn starts_idle_and_empty() {
        let store = CatalogStore::new(ScriptedSource::new(vec![]));
        assert_eq!(store.state(), LoadState::Idle);
        assert!(store.get_all().is_empty());
        assert!(!store.is_loading());
    }

    #[test]
    fn blocking_load_populates_snapshot() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![Ok(catalog(&["B", "A"]))]));
        assert_eq!(store.load_blocking(), ApplyResult::Applied);
        assert_eq!(codes(&store), ["B", "A"]);
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.state(), LoadState::Loaded { count: 2, dropped: 0 });
    }

    #[test]
    fn get_all_is_stable_between_loads() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![Ok(catalog(&["A"]))]));
        store.load_blocking();
        let first = store.get_all();
        let second = store.get_all();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn failure_empties_snapshot() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![
            Ok(catalog(&["A"])),
            Err(LoadError::Status {
                url: "http://example".to_string(),
                status: 500,
            }),
        ]));
        store.load_blocking();
        assert_eq!(codes(&store), ["A"]);

        assert_eq!(store.load_blocking(), ApplyResult::Applied);
        assert!(store.get_all().is_empty());
        assert!(store.records().is_empty());
        assert!(matches!(store.state(), LoadState::Failed(msg) if msg.contains("500")));
    }

    #[test]
    fn later_issued_request_wins_even_when_it_resolves_first() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![]));
        let first = store.begin_load();
        let second = store.begin_load();
        assert!(second > first);

        let applied = store.apply(LoadOutcome {
            ticket: second,
            result: Ok(catalog(&["NEW"])),
        });
        assert_eq!(applied, ApplyResult::Applied);

        let stale = store.apply(LoadOutcome {
            ticket: first,
            result: Ok(catalog(&["OLD"])),
        });
        assert_eq!(stale, ApplyResult::Stale);
        assert_eq!(codes(&store), ["NEW"]);
    }

    #[test]
    fn superseded_request_is_stale_even_when_it_resolves_first() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![]));
        let first = store.begin_load();
        let second = store.begin_load();

        let stale = store.apply(LoadOutcome {
            ticket: first,
            result: Ok(catalog(&["OLD"])),
        });
        assert_eq!(stale, ApplyResult::Stale);
        assert!(store.is_loading());
        assert!(store.get_all().is_empty());

        store.apply(LoadOutcome {
            ticket: second,
            result: Ok(catalog(&["NEW"])),
        });
        assert_eq!(codes(&store), ["NEW"]);
    }

    #[test]
    fn cancel_discards_in_flight_outcome() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![Ok(catalog(&["A"]))]));
        store.load_blocking();
        let ticket = store.begin_load();
        store.cancel();
        assert!(!store.is_loading());
        assert_eq!(store.state(), LoadState::Loaded { count: 1, dropped: 0 });

        let result = store.apply(LoadOutcome {
            ticket,
            result: Ok(catalog(&["B"])),
        });
        assert_eq!(result, ApplyResult::Stale);
        assert_eq!(codes(&store), ["A"]);
    }

    #[test]
    fn worker_delivers_outcome_over_channel() {
        let mut store = CatalogStore::new(ScriptedSource::new(vec![Ok(catalog(&["A", "B"]))]));
        let (tx, rx) = mpsc::channel::<LoadOutcome>();
        let ticket = store.load(&tx);
        assert_eq!(store.state(), LoadState::Loading);

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.ticket, ticket);
        assert_eq!(store.apply(outcome), ApplyResult::Applied);
        assert_eq!(codes(&store), ["A", "B"]);
    }
}
