//! `src/model/entry.rs`
//! ============================================================
//! Listing entries as reported by adapters and held by the cache.
//!
//! Adapters produce [`EntryRecord`]s (no identity); the entry cache turns
//! them into [`Entry`]s carrying an id that stays stable for the lifetime
//! of the cached `(url, name)` pair.

use std::{sync::Arc, time::SystemTime};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Identity of a cached entry. `0` is reserved for the virtual parent row.
pub type EntryId = u64;

pub const PARENT_ENTRY_ID: EntryId = 0;

pub const PARENT_ENTRY_NAME: &str = "..";

// ------------------------------------------------------------
// EntryType: directory, file, link or socket.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Directory,
    File,
    Link,
    Socket,
}

impl EntryType {
    /// Sort ordinal: directories first, sockets last.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Directory => 0,
            Self::File => 1,
            Self::Link => 2,
            Self::Socket => 3,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Link => "link",
            Self::Socket => "socket",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------------------------------------
// EntryMeta: adapter-defined extension data.
// ------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMeta {
    /// Link target text, as stored in the link.
    pub link: Option<CompactString>,

    /// Type of the resolved link target, `None` when dangling.
    pub link_type: Option<EntryType>,

    pub size: Option<u64>,

    pub modified: Option<SystemTime>,

    /// Unix permission bits.
    pub mode: Option<u32>,

    /// Where a trashed entry used to live.
    pub original_path: Option<CompactString>,
}

// ------------------------------------------------------------
// EntryRecord: what an adapter reports.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name: CompactString,
    pub entry_type: EntryType,
    pub meta: EntryMeta,
}

impl EntryRecord {
    #[must_use]
    pub fn new(name: impl Into<CompactString>, entry_type: EntryType) -> Self {
        Self {
            name: name.into(),
            entry_type,
            meta: EntryMeta::default(),
        }
    }

    #[must_use]
    pub fn with_meta(mut self, meta: EntryMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Link record pointing at `target`, resolving to `target_type`.
    #[must_use]
    pub fn link(
        name: impl Into<CompactString>,
        target: impl Into<CompactString>,
        target_type: Option<EntryType>,
    ) -> Self {
        Self::new(name, EntryType::Link).with_meta(EntryMeta {
            link: Some(target.into()),
            link_type: target_type,
            ..EntryMeta::default()
        })
    }
}

// ------------------------------------------------------------
// Entry: immutable cached record with stable identity.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub name: CompactString,
    pub entry_type: EntryType,
    pub meta: Arc<EntryMeta>,
}

impl Entry {
    #[must_use]
    pub fn from_record(id: EntryId, record: EntryRecord) -> Self {
        Self {
            id,
            name: record.name,
            entry_type: record.entry_type,
            meta: Arc::new(record.meta),
        }
    }

    /// The synthetic `..` row meaning "go up".
    #[must_use]
    pub fn parent_placeholder() -> Self {
        Self {
            id: PARENT_ENTRY_ID,
            name: CompactString::const_new(PARENT_ENTRY_NAME),
            entry_type: EntryType::Directory,
            meta: Arc::new(EntryMeta::default()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_parent(&self) -> bool {
        self.id == PARENT_ENTRY_ID
    }

    /// Type used for ordering and styling: links take their target's type.
    #[inline]
    #[must_use]
    pub fn resolved_type(&self) -> EntryType {
        match (self.entry_type, self.meta.link_type) {
            (EntryType::Link, Some(target)) if target != EntryType::Link => target,
            (kind, _) => kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_directory_like(&self) -> bool {
        self.resolved_type() == EntryType::Directory
    }
}
