//! ``src/model/hidden.rs``
//!
//! Decides which entries a view displays. Two predicates apply:
//! - *hidden* entries are shown only while `show_hidden` is on
//! - *always hidden* entries are never shown

use std::{fmt, sync::Arc};

use regex::Regex;

use crate::{config::ViewOptions, error::CoreResult, model::entry::Entry};

pub type HiddenPredicate = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub display: bool,
    pub hidden: bool,
}

#[derive(Clone)]
pub struct HiddenFilter {
    show_hidden: bool,
    is_hidden: HiddenPredicate,
    is_always_hidden: HiddenPredicate,
}

impl HiddenFilter {
    /// Compile the predicates described by `options`.
    pub fn from_options(options: &ViewOptions) -> CoreResult<Self> {
        let pattern = Regex::new(&options.hidden_pattern)?;
        let always = options.always_hidden.clone();

        Ok(Self {
            show_hidden: options.show_hidden,
            is_hidden: Arc::new(move |entry: &Entry| pattern.is_match(&entry.name)),
            is_always_hidden: Arc::new(move |entry: &Entry| {
                always.iter().any(|name| name.as_str() == entry.name.as_str())
            }),
        })
    }

    #[must_use]
    pub fn should_display(&self, entry: &Entry) -> Visibility {
        if (self.is_always_hidden)(entry) {
            return Visibility {
                display: false,
                hidden: true,
            };
        }

        let hidden = (self.is_hidden)(entry);
        Visibility {
            display: !hidden || self.show_hidden,
            hidden,
        }
    }

    #[must_use]
    pub const fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub const fn set_show_hidden(&mut self, show: bool) {
        self.show_hidden = show;
    }

    pub fn set_hidden_predicate(&mut self, predicate: HiddenPredicate) {
        self.is_hidden = predicate;
    }

    pub fn set_always_hidden_predicate(&mut self, predicate: HiddenPredicate) {
        self.is_always_hidden = predicate;
    }
}

impl fmt::Debug for HiddenFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HiddenFilter")
            .field("show_hidden", &self.show_hidden)
            .finish_non_exhaustive()
    }
}
