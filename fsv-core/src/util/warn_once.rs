//! Remembers which soft problems were already reported so each one is
//! logged a single time instead of on every render.

use ahash::AHashSet;
use compact_str::CompactString;

#[derive(Debug, Default, Clone)]
pub struct WarnOnce {
    seen: AHashSet<CompactString>,
}

impl WarnOnce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `key` is seen.
    pub fn first_time(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(CompactString::new(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
