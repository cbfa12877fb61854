//! `src/model/url.rs`
//! ============================================================================
//! # `Url`: address of one listing source
//!
//! A URL is an opaque `(scheme, path)` pair written as `scheme://path`.
//! Directory listings conventionally end their path with `/`.

use std::fmt;

use compact_str::{CompactString, format_compact};

use crate::error::{CoreError, CoreResult};

const SCHEME_SEPARATOR: &str = "://";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Url {
    scheme: CompactString,
    path: CompactString,
}

impl Url {
    #[must_use]
    pub fn new(scheme: impl Into<CompactString>, path: impl Into<CompactString>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
        }
    }

    /// Parse `scheme://path`.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let Some((scheme, path)) = input.split_once(SCHEME_SEPARATOR) else {
            return Err(CoreError::invalid_url(input, "missing '://' separator"));
        };

        if scheme.is_empty() {
            return Err(CoreError::invalid_url(input, "empty scheme"));
        }

        let valid_scheme = scheme
            .chars()
            .all(|c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(CoreError::invalid_url(input, "scheme contains invalid characters"));
        }

        if path.is_empty() {
            return Err(CoreError::invalid_url(input, "empty path"));
        }

        Ok(Self::new(scheme, path))
    }

    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }

    /// URL of a child directory of this listing.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let name = name.trim_end_matches('/');
        let path = if self.is_dir() {
            format_compact!("{}{name}/", self.path)
        } else {
            format_compact!("{}/{name}/", self.path)
        };

        Self {
            scheme: self.scheme.clone(),
            path,
        }
    }

    /// URL of the enclosing listing, `None` at the top.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.path.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;

        Some(Self {
            scheme: self.scheme.clone(),
            path: CompactString::new(&trimmed[..=idx]),
        })
    }

    /// Last path component, without the trailing separator.
    #[must_use]
    pub fn basename(&self) -> Option<&str> {
        let trimmed = self.path.trim_end_matches('/');
        let name = trimmed.rsplit('/').next()?;
        (!name.is_empty()).then_some(name)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SCHEME_SEPARATOR}{}", self.scheme, self.path)
    }
}
