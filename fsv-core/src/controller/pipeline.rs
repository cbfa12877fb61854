//! src/controller/pipeline.rs
//! ============================================================================
//! # Render pipeline pacing
//!
//! ```text
//! Idle → SessionOpen → Fetching ⇄ RenderingIntermediate → SessionClosing → Done
//!                          └────────────→ Error
//! ```
//!
//! The pacer is a pure decision object: the fetch loop reports every page
//! together with the current time and gets back what to do next. It holds
//! no timers, so the same logic runs under a paused test clock.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    SessionOpen,
    Fetching,
    RenderingIntermediate,
    SessionClosing,
    Done,
    Error,
}

impl PipelineState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SessionOpen => "session_open",
            Self::Fetching => "fetching",
            Self::RenderingIntermediate => "rendering_intermediate",
            Self::SessionClosing => "session_closing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// What the fetch loop does after storing a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStep {
    /// Fetch the next page straight away.
    Continue,
    /// Flush a partial render, yield, then fetch the next page.
    RenderIntermediate,
    /// No more pages: close the session and render for real.
    Finish,
}

#[derive(Debug, Clone)]
pub struct RenderPacer {
    threshold: Duration,
    last_render: Instant,
    intermediate: usize,
}

impl RenderPacer {
    /// Start timing a fetch that began at `now`.
    #[must_use]
    pub const fn start(threshold: Duration, now: Instant) -> Self {
        Self {
            threshold,
            last_render: now,
            intermediate: 0,
        }
    }

    pub fn on_page(&mut self, now: Instant, has_more: bool) -> FetchStep {
        if !has_more {
            return FetchStep::Finish;
        }

        if now.saturating_duration_since(self.last_render) >= self.threshold {
            self.last_render = now;
            self.intermediate += 1;
            return FetchStep::RenderIntermediate;
        }

        FetchStep::Continue
    }

    /// Intermediate renders decided so far.
    #[must_use]
    pub const fn intermediate_renders(&self) -> usize {
        self.intermediate
    }
}

/// Summary of one finished render pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub pages: usize,
    pub entries: usize,
    /// Page numbers (1-based) after which an intermediate render ran.
    pub intermediate_after: Vec<usize>,
    pub evicted: usize,
    /// Fetch skipped, rendered from the cache only.
    pub from_cache: bool,
}
