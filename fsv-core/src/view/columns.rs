//! src/view/columns.rs
//! ============================================================================
//! # Columns: per-entry display chunks and sort keys
//!
//! A column renders one chunk of a listing line for every entry. Sorting and
//! mutability are optional capabilities; a column that does not declare them
//! is skipped by the sort engine and treated as read-only by the cursor
//! constraint.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use ahash::AHashMap;
use bytesize::ByteSize;
use chrono::{DateTime, Local};
use compact_str::{CompactString, ToCompactString, format_compact};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::{
    model::entry::{Entry, EntryType},
    util::warn_once::WarnOnce,
};

pub const TYPE_COLUMN: &str = "type";
pub const SIZE_COLUMN: &str = "size";
pub const MTIME_COLUMN: &str = "mtime";
pub const PERMISSIONS_COLUMN: &str = "permissions";

/// Placeholder for missing metadata.
const EMPTY_CELL: &str = "-";

/// Display text with an optional highlight group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: CompactString,
    pub style: Option<CompactString>,
}

impl Chunk {
    #[must_use]
    pub fn plain(text: impl Into<CompactString>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    #[must_use]
    pub fn styled(text: impl Into<CompactString>, style: impl Into<CompactString>) -> Self {
        Self {
            text: text.into(),
            style: Some(style.into()),
        }
    }

    /// Display width in terminal cells.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        UnicodeWidthStr::width(self.text.as_str())
    }
}

/// Comparable value produced by a sortable column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Int(i64),
    Text(CompactString),
}

pub trait Column: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn render(&self, entry: &Entry) -> Chunk;

    fn is_sortable(&self) -> bool {
        false
    }

    fn sort_key(&self, _entry: &Entry) -> Option<SortKey> {
        None
    }

    /// Whether users may edit this column's region of a line.
    fn is_mutable(&self) -> bool {
        false
    }

    /// Split this column's rendered value off the front of `text`.
    /// Returns `(value, rest)`.
    fn parse<'a>(&self, text: &'a str) -> Option<(&'a str, &'a str)> {
        split_tokens(text, 1)
    }
}

/// Take `count` space-separated tokens off the front of `text`.
#[must_use]
pub fn split_tokens(text: &str, count: usize) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut idx = 0usize;

    for n in 0..count {
        if n > 0 {
            while idx < bytes.len() && bytes[idx] == b' ' {
                idx += 1;
            }
        }

        let start = idx;
        while idx < bytes.len() && bytes[idx] != b' ' {
            idx += 1;
        }

        if idx == start {
            return None;
        }
    }

    Some((&text[..idx], &text[idx..]))
}

// ------------------------------------------------------------
// Built-in columns
// ------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct TypeColumn;

impl TypeColumn {
    const fn label(kind: EntryType) -> &'static str {
        match kind {
            EntryType::Directory => "dir",
            EntryType::File => "file",
            EntryType::Link => "link",
            EntryType::Socket => "sock",
        }
    }
}

impl Column for TypeColumn {
    fn name(&self) -> &str {
        TYPE_COLUMN
    }

    fn render(&self, entry: &Entry) -> Chunk {
        Chunk::styled(Self::label(entry.entry_type), "type")
    }

    fn is_sortable(&self) -> bool {
        true
    }

    fn sort_key(&self, entry: &Entry) -> Option<SortKey> {
        Some(SortKey::Int(i64::from(entry.resolved_type().ordinal())))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SizeColumn;

impl Column for SizeColumn {
    fn name(&self) -> &str {
        SIZE_COLUMN
    }

    fn render(&self, entry: &Entry) -> Chunk {
        match entry.meta.size {
            Some(size) if entry.entry_type != EntryType::Directory => {
                let human = ByteSize::b(size).to_string().replace(' ', "");
                Chunk::styled(human, "size")
            }
            _ => Chunk::styled(EMPTY_CELL, "size"),
        }
    }

    fn is_sortable(&self) -> bool {
        true
    }

    #[expect(clippy::cast_possible_wrap, reason = "Sizes above i64::MAX do not exist")]
    fn sort_key(&self, entry: &Entry) -> Option<SortKey> {
        entry.meta.size.map(|size: u64| SortKey::Int(size as i64))
    }
}

#[derive(Debug, Clone)]
pub struct MtimeColumn {
    format: CompactString,
}

impl MtimeColumn {
    /// `chrono` format with exactly three space-separated fields.
    pub const DEFAULT_FORMAT: &'static str = "%b %d %H:%M";

    #[must_use]
    pub fn new(format: impl Into<CompactString>) -> Self {
        Self {
            format: format.into(),
        }
    }

    fn field_count(&self) -> usize {
        self.format.split(' ').filter(|part| !part.is_empty()).count().max(1)
    }
}

impl Default for MtimeColumn {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FORMAT)
    }
}

impl Column for MtimeColumn {
    fn name(&self) -> &str {
        MTIME_COLUMN
    }

    fn render(&self, entry: &Entry) -> Chunk {
        match entry.meta.modified {
            Some(modified) => {
                let dt: DateTime<Local> = DateTime::from(modified);
                Chunk::styled(dt.format(&self.format).to_compact_string(), "mtime")
            }
            None => Chunk::styled(EMPTY_CELL, "mtime"),
        }
    }

    fn is_sortable(&self) -> bool {
        true
    }

    #[expect(clippy::cast_possible_truncation, reason = "Millis fit in i64 for any real date")]
    fn sort_key(&self, entry: &Entry) -> Option<SortKey> {
        let modified: SystemTime = entry.meta.modified?;
        let since_epoch: Duration = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Some(SortKey::Int(since_epoch.as_millis() as i64))
    }

    fn parse<'a>(&self, text: &'a str) -> Option<(&'a str, &'a str)> {
        if text.starts_with(EMPTY_CELL) {
            return split_tokens(text, 1);
        }
        split_tokens(text, self.field_count())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionsColumn;

impl PermissionsColumn {
    fn mode_string(mode: u32) -> CompactString {
        const FLAGS: [(u32, char); 9] = [
            (0o400, 'r'),
            (0o200, 'w'),
            (0o100, 'x'),
            (0o040, 'r'),
            (0o020, 'w'),
            (0o010, 'x'),
            (0o004, 'r'),
            (0o002, 'w'),
            (0o001, 'x'),
        ];

        FLAGS
            .iter()
            .map(|&(bit, flag)| if mode & bit != 0 { flag } else { '-' })
            .collect()
    }
}

impl Column for PermissionsColumn {
    fn name(&self) -> &str {
        PERMISSIONS_COLUMN
    }

    fn render(&self, entry: &Entry) -> Chunk {
        match entry.meta.mode {
            Some(mode) => Chunk::styled(Self::mode_string(mode), "permissions"),
            None => Chunk::styled(EMPTY_CELL, "permissions"),
        }
    }

    fn is_sortable(&self) -> bool {
        true
    }

    fn sort_key(&self, entry: &Entry) -> Option<SortKey> {
        entry.meta.mode.map(|mode: u32| SortKey::Int(i64::from(mode)))
    }

    fn is_mutable(&self) -> bool {
        true
    }
}

// ------------------------------------------------------------
// ColumnRegistry
// ------------------------------------------------------------

/// Name → column lookup shared by the formatter and the sort engine.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: AHashMap<CompactString, Arc<dyn Column>>,
}

impl ColumnRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `type`, `size`, `mtime` and `permissions`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TypeColumn));
        registry.register(Arc::new(SizeColumn));
        registry.register(Arc::new(MtimeColumn::default()));
        registry.register(Arc::new(PermissionsColumn));
        registry
    }

    pub fn register(&mut self, column: Arc<dyn Column>) {
        self.columns
            .insert(CompactString::new(column.name()), column);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Column>> {
        self.columns.get(name).cloned()
    }

    /// Resolve configured names, skipping unknown ones with a one-time
    /// warning.
    pub fn resolve(&self, names: &[CompactString], warned: &mut WarnOnce) -> Vec<Arc<dyn Column>> {
        names
            .iter()
            .filter_map(|name: &CompactString| {
                let column = self.get(name);
                if column.is_none() && warned.first_time(&format_compact!("column:{name}")) {
                    warn!(
                        marker = "COLUMN_LOOKUP",
                        column = %name,
                        "Unknown column, skipping it"
                    );
                }
                column
            })
            .collect()
    }
}
