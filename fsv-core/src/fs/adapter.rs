//! ``src/fs/adapter.rs``
//!
//! # Listing Source Adapter Contract
//!
//! A listing source streams its entries page by page. Every page may carry a
//! continuation; awaiting it yields the next page. A page without a
//! continuation ends the listing, an error aborts it.

use std::{fmt, io, path::Path, sync::Arc};

use ahash::AHashMap;
use async_trait::async_trait;
use compact_str::{CompactString, ToCompactString};
use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    error::{CoreError, CoreResult},
    model::{
        entry::{Entry, EntryRecord},
        url::Url,
    },
};

/// Failure reported by a listing source.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(CompactString),

    #[error("I/O error on {path}: {message}")]
    Io {
        path: CompactString,
        kind: io::ErrorKind,
        message: CompactString,
    },

    #[error("Not a listable location: {0}")]
    NotListable(CompactString),
}

impl AdapterError {
    pub fn message(msg: impl ToCompactString) -> Self {
        Self::Message(msg.to_compact_string())
    }

    #[must_use]
    pub fn io(path: &Path, err: &io::Error) -> Self {
        Self::Io {
            path: CompactString::new(path.to_string_lossy()),
            kind: err.kind(),
            message: err.to_compact_string(),
        }
    }
}

/// Resumes a listing: awaiting it produces the next page.
pub type Continuation = BoxFuture<'static, Result<ListPage, AdapterError>>;

/// One batch of entries plus an optional way to fetch more.
pub struct ListPage {
    pub entries: Vec<EntryRecord>,
    pub next: Option<Continuation>,
}

impl ListPage {
    /// Final page of a listing.
    #[must_use]
    pub const fn last(entries: Vec<EntryRecord>) -> Self {
        Self {
            entries,
            next: None,
        }
    }

    /// Page followed by more data.
    #[must_use]
    pub fn more(entries: Vec<EntryRecord>, next: Continuation) -> Self {
        Self {
            entries,
            next: Some(next),
        }
    }

    #[inline]
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

impl fmt::Debug for ListPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPage")
            .field("entries", &self.entries.len())
            .field("has_more", &self.has_more())
            .finish()
    }
}

/// Capability interface every listing source exposes.
#[async_trait]
pub trait ListingAdapter: Send + Sync {
    /// URL scheme this adapter serves (`file`, `trash`, ...).
    fn scheme(&self) -> &str;

    /// Start listing `url`. `columns` names the columns the view will render
    /// so the source can skip expensive metadata nobody asked for.
    async fn list(&self, url: &Url, columns: &[CompactString]) -> Result<ListPage, AdapterError>;

    /// Whether views of this source accept edits.
    fn is_mutable(&self) -> bool {
        true
    }

    /// Extra hint drawn next to an entry. Defaults to the original location
    /// a trash-like source recorded for it.
    fn annotate(&self, entry: &Entry) -> Option<CompactString> {
        entry.meta.original_path.clone()
    }
}

/// Scheme → adapter lookup.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: AHashMap<CompactString, Arc<dyn ListingAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same scheme.
    pub fn register(&mut self, adapter: Arc<dyn ListingAdapter>) {
        let scheme = CompactString::new(adapter.scheme());
        self.adapters.insert(scheme, adapter);
    }

    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn ListingAdapter>> {
        self.adapters.get(scheme).cloned()
    }

    pub fn for_url(&self, url: &Url) -> CoreResult<Arc<dyn ListingAdapter>> {
        self.get(url.scheme()).ok_or_else(|| CoreError::MissingAdapter {
            scheme: CompactString::new(url.scheme()),
        })
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("schemes", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{EntryMeta, EntryType};

    struct StaticAdapter;

    #[async_trait]
    impl ListingAdapter for StaticAdapter {
        fn scheme(&self) -> &str {
            "static"
        }

        async fn list(
            &self,
            _url: &Url,
            _columns: &[CompactString],
        ) -> Result<ListPage, AdapterError> {
            let second: Continuation = Box::pin(async {
                Ok(ListPage::last(vec![EntryRecord::new("b", EntryType::File)]))
            });
            Ok(ListPage::more(
                vec![EntryRecord::new("a", EntryType::File)],
                second,
            ))
        }
    }

    #[tokio::test]
    async fn test_continuation_yields_next_page() {
        let adapter = StaticAdapter;
        let url = Url::parse("static://x/").expect("valid url");

        let first = adapter.list(&url, &[]).await.expect("first page");
        assert!(first.has_more());
        assert_eq!(first.entries[0].name, "a");

        let second = first.next.expect("continuation").await.expect("second page");
        assert!(!second.has_more());
        assert_eq!(second.entries[0].name, "b");
    }

    #[test]
    fn test_annotation_defaults_to_original_path() {
        let trashed = Entry::from_record(
            1,
            EntryRecord::new("report.pdf", EntryType::File).with_meta(EntryMeta {
                original_path: Some(CompactString::const_new("/home/me/report.pdf")),
                ..EntryMeta::default()
            }),
        );
        let plain = Entry::from_record(2, EntryRecord::new("notes", EntryType::File));

        assert_eq!(
            StaticAdapter.annotate(&trashed).as_deref(),
            Some("/home/me/report.pdf")
        );
        assert_eq!(StaticAdapter.annotate(&plain), None);
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(StaticAdapter));

        let known = Url::parse("static://x/").expect("valid url");
        assert!(registry.for_url(&known).is_ok());

        let unknown = Url::parse("ssh://host/").expect("valid url");
        assert!(matches!(
            registry.for_url(&unknown),
            Err(CoreError::MissingAdapter { .. })
        ));
    }
}
