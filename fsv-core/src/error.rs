//! Core error handling module
//!
//! • One error enum shared by the cache, the render pipeline and the view manager
//! • `CompactString` payloads keep the enum small on the render hot path
//! • `#[non_exhaustive]` for forward-compatible extension
use std::io::{self, ErrorKind};

use compact_str::{CompactString, ToCompactString};
use thiserror::Error;

use crate::fs::adapter::AdapterError;

/// Convenient alias carrying our unified error type
pub type CoreResult<T> = Result<T, CoreError>;

/// Primary error enumeration (grouped by concern)
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    // ────────────────────────────────────────────────────────────
    // Listing sources
    // ────────────────────────────────────────────────────────────
    #[error("Failed to list {url}: {source}")]
    Source {
        url: CompactString,
        #[source]
        source: AdapterError,
    },

    #[error("Invalid URL: {input} - {reason}")]
    InvalidUrl {
        input: CompactString,
        reason: CompactString,
    },

    #[error("No adapter registered for scheme '{scheme}'")]
    MissingAdapter { scheme: CompactString },

    // ────────────────────────────────────────────────────────────
    // Cache sessions
    // ────────────────────────────────────────────────────────────
    #[error("Update session already open for {url}")]
    SessionAlreadyOpen { url: CompactString },

    #[error("No update session open for {url}")]
    NoOpenSession { url: CompactString },

    // ────────────────────────────────────────────────────────────
    // Views
    // ────────────────────────────────────────────────────────────
    #[error("Unknown view: {0}")]
    UnknownView(u64),

    #[error("Cannot {operation} while a view has unsaved changes")]
    UnsavedChanges { operation: CompactString },

    #[error("View {0} is not modifiable")]
    ViewLocked(u64),

    // ────────────────────────────────────────────────────────────
    // Configuration / IO
    // ────────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(CompactString),

    #[error("I/O error: {kind:?} - {message}")]
    Io {
        kind: ErrorKind,
        message: CompactString,
    },
}

impl CoreError {
    pub fn source_error(url: impl ToCompactString, source: AdapterError) -> Self {
        Self::Source {
            url: url.to_compact_string(),
            source,
        }
    }

    pub fn invalid_url(input: &str, reason: &str) -> Self {
        Self::InvalidUrl {
            input: CompactString::new(input),
            reason: CompactString::new(reason),
        }
    }

    pub fn unsaved_changes(operation: &str) -> Self {
        Self::UnsavedChanges {
            operation: CompactString::new(operation),
        }
    }

    /// Soft errors leave every view untouched and may be retried later.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnsavedChanges { .. } | Self::ViewLocked(_))
    }

    /// Errors that abort the current render and replace the view text.
    #[inline]
    #[must_use]
    pub const fn is_fatal_for_render(&self) -> bool {
        matches!(
            self,
            Self::Source { .. } | Self::InvalidUrl { .. } | Self::MissingAdapter { .. }
        )
    }

    // ────────────────────────────────────────────────────────────
    // Attribute helpers – used for structured log grouping
    // ────────────────────────────────────────────────────────────
    #[inline]
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source_listing",

            Self::InvalidUrl { .. } | Self::MissingAdapter { .. } | Self::Config(_) => {
                "configuration"
            }

            Self::SessionAlreadyOpen { .. } | Self::NoOpenSession { .. } => "cache_session",

            Self::UnknownView(_) | Self::ViewLocked(_) => "view_management",

            Self::UnsavedChanges { .. } => "policy",

            Self::Io { .. } => "io",
        }
    }
}

impl From<io::Error> for CoreError {
    fn from(e: io::Error) -> Self {
        Self::Io {
            kind: e.kind(),
            message: e.to_compact_string(),
        }
    }
}

impl From<regex::Error> for CoreError {
    fn from(e: regex::Error) -> Self {
        Self::Config(e.to_compact_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_compact_string())
    }
}
