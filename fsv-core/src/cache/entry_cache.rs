//! `src/cache/entry_cache.rs`
//! ============================================================================
//! # Content-addressable entry cache
//!
//! Process-wide store of every listed entry:
//! - `url → (name → id)` for listing a source
//! - `id → Entry` for O(1) lookup of a rendered line's entry
//! - update sessions bracket each refresh of a URL; closing a session evicts
//!   every entry of that URL that was not re-stored since it opened
//!
//! Ids are handed out once per `(url, name)` and survive re-fetches, which
//! is what lets views keep the cursor on the same entry across renders.

use ahash::{AHashMap, AHashSet};
use compact_str::{CompactString, ToCompactString};
use tracing::{debug, info, instrument, trace};

use crate::{
    error::{CoreError, CoreResult},
    model::{
        entry::{Entry, EntryId, EntryRecord, PARENT_ENTRY_ID},
        url::Url,
    },
};

/// Counters for monitoring and debugging
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub stored: u64,
    pub reused_ids: u64,
    pub evicted: u64,
    pub sessions: u64,
    pub clears: u64,
}

/// Names touched since `begin_session`.
#[derive(Debug, Default)]
struct UpdateSession {
    touched: AHashSet<CompactString>,
}

#[derive(Debug)]
pub struct EntryCache {
    by_url: AHashMap<Url, AHashMap<CompactString, EntryId>>,
    by_id: AHashMap<EntryId, Entry>,
    sessions: AHashMap<Url, UpdateSession>,
    next_id: EntryId,
    stats: CacheStats,
}

impl EntryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_url: AHashMap::new(),
            by_id: AHashMap::with_capacity(2048),
            sessions: AHashMap::new(),
            next_id: PARENT_ENTRY_ID + 1,
            stats: CacheStats::default(),
        }
    }

    /// Open the update session for `url`. One session per URL at a time.
    #[instrument(skip(self), fields(url = %url))]
    pub fn begin_session(&mut self, url: &Url) -> CoreResult<()> {
        if self.sessions.contains_key(url) {
            return Err(CoreError::SessionAlreadyOpen {
                url: url.to_compact_string(),
            });
        }

        self.sessions.insert(url.clone(), UpdateSession::default());
        self.stats.sessions += 1;

        debug!(
            marker = "CACHE_SESSION",
            operation_type = "begin_session",
            "Update session opened"
        );

        Ok(())
    }

    #[must_use]
    pub fn is_session_open(&self, url: &Url) -> bool {
        self.sessions.contains_key(url)
    }

    /// Upsert an entry reported for `url`, keeping its id when the name is
    /// already known.
    pub fn store(&mut self, url: &Url, record: EntryRecord) -> CoreResult<EntryId> {
        let session = self
            .sessions
            .get_mut(url)
            .ok_or_else(|| CoreError::NoOpenSession {
                url: url.to_compact_string(),
            })?;

        session.touched.insert(record.name.clone());

        let names = self.by_url.entry(url.clone()).or_default();
        let id = match names.get(&record.name) {
            Some(&id) => {
                self.stats.reused_ids += 1;
                id
            }

            None => {
                let id = self.next_id;
                self.next_id += 1;
                names.insert(record.name.clone(), id);
                id
            }
        };

        trace!(url = %url, name = %record.name, id, "Stored entry");

        self.by_id.insert(id, Entry::from_record(id, record));
        self.stats.stored += 1;

        Ok(id)
    }

    /// Close the session for `url`, evicting every entry it did not touch.
    /// Returns the number of evicted entries.
    #[instrument(skip(self), fields(url = %url))]
    pub fn end_session(&mut self, url: &Url) -> CoreResult<usize> {
        let session = self
            .sessions
            .remove(url)
            .ok_or_else(|| CoreError::NoOpenSession {
                url: url.to_compact_string(),
            })?;

        let mut evicted = 0usize;
        if let Some(names) = self.by_url.get_mut(url) {
            let by_id = &mut self.by_id;

            names.retain(|name: &CompactString, id: &mut EntryId| -> bool {
                let keep = session.touched.contains(name);
                if !keep {
                    by_id.remove(id);
                    evicted += 1;
                }
                keep
            });
        }

        self.stats.evicted += evicted as u64;

        debug!(
            marker = "CACHE_SESSION",
            operation_type = "end_session",
            touched = session.touched.len(),
            evicted,
            "Update session closed"
        );

        Ok(evicted)
    }

    /// Drop the session for `url` without evicting anything. Entries stored
    /// so far are kept. Returns `false` if no session was open.
    pub fn abandon_session(&mut self, url: &Url) -> bool {
        let Some(session) = self.sessions.remove(url) else {
            return false;
        };

        debug!(
            marker = "CACHE_SESSION",
            operation_type = "abandon_session",
            url = %url,
            touched = session.touched.len(),
            "Update session abandoned"
        );

        true
    }

    #[inline]
    #[must_use]
    pub fn get_by_id(&self, id: EntryId) -> Option<&Entry> {
        self.by_id.get(&id)
    }

    /// Current `name → Entry` mapping for `url`. Non-atomic while a session
    /// is open.
    #[must_use]
    pub fn list(&self, url: &Url) -> AHashMap<&str, &Entry> {
        self.entries(url)
            .map(|entry| (entry.name.as_str(), entry))
            .collect()
    }

    /// Entries of `url` in arbitrary order.
    pub fn entries<'a>(&'a self, url: &Url) -> impl Iterator<Item = &'a Entry> + use<'a> {
        let by_id = &self.by_id;
        self.by_url
            .get(url)
            .into_iter()
            .flat_map(|names| names.values())
            .filter_map(move |id: &EntryId| by_id.get(id))
    }

    /// Drop everything. Ids keep counting up so stale lines never alias new
    /// entries.
    pub fn clear_all(&mut self) {
        let dropped = self.by_id.len();

        self.by_url.clear();
        self.by_id.clear();
        self.sessions.clear();
        self.stats.clears += 1;

        info!(
            marker = "CACHE_SESSION",
            operation_type = "clear_all",
            dropped,
            "Entry cache cleared"
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::EntryType;

    fn url() -> Url {
        Url::parse("dir://a/").expect("valid url")
    }

    fn refresh(cache: &mut EntryCache, url: &Url, names: &[&str]) -> Vec<EntryId> {
        cache.begin_session(url).expect("begin");
        let ids = names
            .iter()
            .map(|name| {
                cache
                    .store(url, EntryRecord::new(*name, EntryType::File))
                    .expect("store")
            })
            .collect();
        cache.end_session(url).expect("end");
        ids
    }

    #[test]
    fn test_ids_are_stable_across_fetches() {
        let mut cache = EntryCache::new();
        let url = url();

        let first = refresh(&mut cache, &url, &["foo.txt", "bar"]);
        let second = refresh(&mut cache, &url, &["bar", "foo.txt"]);

        assert_eq!(first[0], second[1]);
        assert_eq!(first[1], second[0]);
        assert_eq!(cache.stats().reused_ids, 2);
    }

    #[test]
    fn test_ids_never_use_parent_slot() {
        let mut cache = EntryCache::new();
        let ids = refresh(&mut cache, &url(), &["x"]);
        assert_ne!(ids[0], PARENT_ENTRY_ID);
    }

    #[test]
    fn test_same_name_under_different_urls_gets_distinct_ids() {
        let mut cache = EntryCache::new();
        let a = refresh(&mut cache, &url(), &["x"]);
        let b = refresh(&mut cache, &Url::parse("dir://b/").expect("valid"), &["x"]);
        assert_ne!(a[0], b[0]);
    }

    #[test]
    fn test_untouched_entries_are_evicted_at_session_end() {
        let mut cache = EntryCache::new();
        let url = url();

        let ids = refresh(&mut cache, &url, &["keep", "drop"]);
        cache.begin_session(&url).expect("begin");
        cache
            .store(&url, EntryRecord::new("keep", EntryType::File))
            .expect("store");

        // Stale entries stay visible until the session closes
        assert_eq!(cache.list(&url).len(), 2);

        assert_eq!(cache.end_session(&url).expect("end"), 1);
        let listing = cache.list(&url);
        assert!(listing.contains_key("keep"));
        assert!(!listing.contains_key("drop"));
        assert!(cache.get_by_id(ids[1]).is_none());
        assert_eq!(cache.get_by_id(ids[0]).map(|e| e.name.as_str()), Some("keep"));
    }

    #[test]
    fn test_store_updates_entry_in_place() {
        let mut cache = EntryCache::new();
        let url = url();
        let id = refresh(&mut cache, &url, &["thing"])[0];

        cache.begin_session(&url).expect("begin");
        let again = cache
            .store(&url, EntryRecord::new("thing", EntryType::Directory))
            .expect("store");
        cache.end_session(&url).expect("end");

        assert_eq!(id, again);
        assert_eq!(
            cache.get_by_id(id).map(|e| e.entry_type),
            Some(EntryType::Directory)
        );
    }

    #[test]
    fn test_one_session_per_url() {
        let mut cache = EntryCache::new();
        let url = url();

        cache.begin_session(&url).expect("begin");
        assert!(matches!(
            cache.begin_session(&url),
            Err(CoreError::SessionAlreadyOpen { .. })
        ));

        // A different URL may refresh concurrently
        cache
            .begin_session(&Url::parse("dir://b/").expect("valid"))
            .expect("other url");
    }

    #[test]
    fn test_store_and_end_require_a_session() {
        let mut cache = EntryCache::new();
        let url = url();

        assert!(matches!(
            cache.store(&url, EntryRecord::new("x", EntryType::File)),
            Err(CoreError::NoOpenSession { .. })
        ));
        assert!(matches!(
            cache.end_session(&url),
            Err(CoreError::NoOpenSession { .. })
        ));
    }

    #[test]
    fn test_clear_all_drops_everything() {
        let mut cache = EntryCache::new();
        let url = url();
        let old = refresh(&mut cache, &url, &["x"])[0];

        cache.clear_all();
        assert!(cache.is_empty());
        assert!(cache.list(&url).is_empty());

        let new = refresh(&mut cache, &url, &["x"])[0];
        assert!(new > old);
    }

    #[test]
    fn test_abandoned_session_keeps_entries_and_frees_url() {
        let mut cache = EntryCache::new();
        let url = url();
        refresh(&mut cache, &url, &["a", "b"]);

        cache.begin_session(&url).expect("begin");
        cache
            .store(&url, EntryRecord::new("c", EntryType::File))
            .expect("store");

        assert!(cache.abandon_session(&url));
        assert!(!cache.is_session_open(&url));
        assert!(!cache.abandon_session(&url));

        // Nothing evicted: the partial fetch proves nothing about `a` or `b`
        assert_eq!(cache.list(&url).len(), 3);
        cache.begin_session(&url).expect("url usable again");
    }
}
