//! In-memory listing source shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use compact_str::CompactString;

use fsv_core::{
    Config, ListingEngine,
    fs::{AdapterError, AdapterRegistry, Continuation, ListPage, ListingAdapter},
    model::{Entry, EntryRecord, EntryType, Url},
};

pub const SCHEME: &str = "dir";

type Page = Result<Vec<EntryRecord>, String>;

#[derive(Default)]
struct Listings {
    pages: HashMap<String, Vec<Page>>,
    page_delay: Duration,
    annotations: HashMap<String, String>,
    calls: usize,
}

/// Serves `dir://` URLs from pages set up by the test.
#[derive(Clone, Default)]
pub struct MemoryAdapter {
    inner: Arc<Mutex<Listings>>,
    read_only: bool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// Serve `records` for `path` in one page.
    pub fn set(&self, path: &str, records: Vec<EntryRecord>) {
        self.set_pages(path, vec![Ok(records)]);
    }

    pub fn set_pages(&self, path: &str, pages: Vec<Page>) {
        self.inner
            .lock()
            .expect("lock")
            .pages
            .insert(path.to_owned(), pages);
    }

    pub fn fail(&self, path: &str, message: &str) {
        self.set_pages(path, vec![Err(message.to_owned())]);
    }

    /// Virtual time every page (the first included) takes to arrive.
    pub fn set_page_delay(&self, delay: Duration) {
        self.inner.lock().expect("lock").page_delay = delay;
    }

    pub fn annotate_name(&self, name: &str, text: &str) {
        self.inner
            .lock()
            .expect("lock")
            .annotations
            .insert(name.to_owned(), text.to_owned());
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().expect("lock").calls
    }
}

fn next_page(mut remaining: VecDeque<Page>, delay: Duration) -> Continuation {
    Box::pin(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let entries = remaining
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
            .map_err(AdapterError::message)?;

        if remaining.is_empty() {
            Ok(ListPage::last(entries))
        } else {
            Ok(ListPage::more(entries, next_page(remaining, delay)))
        }
    })
}

#[async_trait]
impl ListingAdapter for MemoryAdapter {
    fn scheme(&self) -> &str {
        SCHEME
    }

    async fn list(&self, url: &Url, _columns: &[CompactString]) -> Result<ListPage, AdapterError> {
        let (pages, delay) = {
            let mut inner = self.inner.lock().expect("lock");
            inner.calls += 1;
            let pages = inner
                .pages
                .get(url.path())
                .cloned()
                .ok_or_else(|| AdapterError::NotListable(CompactString::new(url.path())))?;
            (pages, inner.page_delay)
        };

        next_page(pages.into(), delay).await
    }

    fn is_mutable(&self) -> bool {
        !self.read_only
    }

    fn annotate(&self, entry: &Entry) -> Option<CompactString> {
        self.inner
            .lock()
            .expect("lock")
            .annotations
            .get(entry.name.as_str())
            .map(CompactString::new)
    }
}

pub fn file(name: &str) -> EntryRecord {
    EntryRecord::new(name, EntryType::File)
}

pub fn dir(name: &str) -> EntryRecord {
    EntryRecord::new(name, EntryType::Directory)
}

/// Config with no columns so lines are just `/NNN name`.
pub fn bare_config() -> Config {
    Config {
        columns: Vec::new(),
        ..Config::default()
    }
}

pub fn engine_with(adapter: &MemoryAdapter, config: Config) -> ListingEngine {
    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(adapter.clone()));
    ListingEngine::new(config, adapters).expect("engine")
}
