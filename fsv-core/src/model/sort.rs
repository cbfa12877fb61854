//! ``src/model/sort.rs``
//! ============================================================================
//! # Sort Engine
//!
//! Builds a comparator chain from an ordered list of `(column, direction)`
//! pairs. The first key that differs decides; when every configured key
//! ties, entries fall back to their names in ascending byte order, so the
//! result is a total order even with an empty spec.

use std::{cmp::Ordering, fmt, sync::Arc};

use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    model::entry::Entry,
    util::warn_once::WarnOnce,
    view::columns::{Column, ColumnRegistry},
};

/// Pseudo-column sorting by entry name.
pub const NAME_SORT_KEY: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[inline]
    #[must_use]
    pub const fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: CompactString,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn new(column: impl Into<CompactString>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    #[must_use]
    pub fn asc(column: impl Into<CompactString>) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    #[must_use]
    pub fn desc(column: impl Into<CompactString>) -> Self {
        Self::new(column, SortDirection::Desc)
    }
}

/// Name comparison knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameOrder {
    pub natural: bool,
    pub case_insensitive: bool,
}

impl NameOrder {
    fn compare(self, a: &str, b: &str) -> Ordering {
        match (self.natural, self.case_insensitive) {
            (true, true) => alphanumeric_sort::compare_str(a.to_lowercase(), b.to_lowercase()),
            (true, false) => alphanumeric_sort::compare_str(a, b),
            (false, true) => a.to_lowercase().cmp(&b.to_lowercase()),
            (false, false) => a.cmp(b),
        }
    }
}

enum SortTerm {
    Name(SortDirection),
    Column(Arc<dyn Column>, SortDirection),
}

impl fmt::Debug for SortTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(dir) => write!(f, "name {dir:?}"),
            Self::Column(column, dir) => write!(f, "{} {dir:?}", column.name()),
        }
    }
}

/// Resolved comparator chain.
#[derive(Debug)]
pub struct Comparator {
    terms: Vec<SortTerm>,
    names: NameOrder,
}

impl Comparator {
    #[must_use]
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        for term in &self.terms {
            let ord = match term {
                SortTerm::Name(dir) => dir.apply(self.names.compare(&a.name, &b.name)),
                SortTerm::Column(column, dir) => {
                    dir.apply(column.sort_key(a).cmp(&column.sort_key(b)))
                }
            };

            if ord != Ordering::Equal {
                return ord;
            }
        }

        // Total order: distinct names never tie
        a.name.cmp(&b.name)
    }

    /// Number of effective keys before the name fallback.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Builds comparators, remembering which bad sort columns were reported.
#[derive(Debug, Default)]
pub struct SortEngine {
    warned: WarnOnce,
}

impl SortEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comparator(
        &mut self,
        spec: &[SortSpec],
        columns: &ColumnRegistry,
        names: NameOrder,
    ) -> Comparator {
        let terms = spec
            .iter()
            .filter_map(|item: &SortSpec| self.resolve_term(item, columns))
            .collect();

        Comparator { terms, names }
    }

    /// Sort `entries` in place with a freshly built comparator.
    pub fn sort(
        &mut self,
        entries: &mut [&Entry],
        spec: &[SortSpec],
        columns: &ColumnRegistry,
        names: NameOrder,
    ) {
        let comparator = self.comparator(spec, columns, names);
        entries.sort_by(|a: &&Entry, b: &&Entry| comparator.compare(a, b));
    }

    fn resolve_term(&mut self, item: &SortSpec, columns: &ColumnRegistry) -> Option<SortTerm> {
        if item.column == NAME_SORT_KEY {
            return Some(SortTerm::Name(item.direction));
        }

        match columns.get(&item.column) {
            Some(column) if column.is_sortable() => Some(SortTerm::Column(column, item.direction)),

            Some(_) => {
                if self.warned.first_time(&format_compact!("unsortable:{}", item.column)) {
                    warn!(
                        marker = "SORT_ENGINE",
                        column = %item.column,
                        "Column is not sortable, ignoring it in sort order"
                    );
                }
                None
            }

            None => {
                if self.warned.first_time(&format_compact!("unknown:{}", item.column)) {
                    warn!(
                        marker = "SORT_ENGINE",
                        column = %item.column,
                        "Unknown sort column, ignoring it"
                    );
                }
                None
            }
        }
    }
}
