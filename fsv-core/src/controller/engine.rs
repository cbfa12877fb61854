//! src/controller/engine.rs
//! ============================================================================
//! # Listing engine
//!
//! Single owner of the entry cache, the adapters, the column and sort setup
//! and every view. All methods take `&mut self`, so the cache is only ever
//! mutated by one render pipeline at a time; the `.await` points inside
//! [`ListingEngine::render_view`] are the only places other host work can
//! run while a fetch is in flight.

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use compact_str::{CompactString, ToCompactString};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    cache::entry_cache::EntryCache,
    config::Config,
    controller::{
        cursor::{CursorTracker, constrain_cursor},
        pipeline::{FetchStep, PipelineState, RenderPacer, RenderReport},
        view_manager::ViewManager,
    },
    error::{CoreError, CoreResult},
    fs::adapter::{AdapterError, AdapterRegistry, ListPage},
    model::{
        entry::{Entry, PARENT_ENTRY_ID},
        hidden::{HiddenFilter, HiddenPredicate},
        sort::{SortEngine, SortSpec},
        url::Url,
    },
    util::warn_once::WarnOnce,
    view::{
        columns::{Column, ColumnRegistry},
        format::{build_listing, parse_id},
        listing_view::{Annotation, Cursor, View, ViewId},
    },
};

/// How a render should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Fetch from the adapter first; otherwise render the cached entries.
    pub refetch: bool,
    /// Let the cursor tracker move the cursor after the render.
    pub jump: bool,
    /// With `jump`, fall back to the first row when nothing is remembered.
    pub jump_first: bool,
}

impl RenderOptions {
    /// Render cached entries and restore the cursor.
    pub const CACHED: Self = Self {
        refetch: false,
        jump: true,
        jump_first: false,
    };

    /// Partial flush while a fetch is running.
    const INTERMEDIATE: Self = Self {
        refetch: false,
        jump: false,
        jump_first: false,
    };
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            refetch: true,
            jump: true,
            jump_first: false,
        }
    }
}

/// What a [`ListingEngine::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub destroyed: Vec<ViewId>,
    pub cache_cleared: bool,
    pub annotations_redrawn: Vec<ViewId>,
}

#[derive(Debug)]
pub struct ListingEngine {
    config: Config,
    cache: EntryCache,
    adapters: AdapterRegistry,
    columns: ColumnRegistry,
    active_columns: Vec<Arc<dyn Column>>,
    sort: SortEngine,
    filter: HiddenFilter,
    tracker: CursorTracker,
    views: ViewManager,
    warned: WarnOnce,
}

impl ListingEngine {
    pub fn new(config: Config, adapters: AdapterRegistry) -> CoreResult<Self> {
        let filter = HiddenFilter::from_options(&config.view)?;
        let columns = ColumnRegistry::with_builtins();
        let mut warned = WarnOnce::new();
        let active_columns = columns.resolve(&config.columns, &mut warned);
        let views = ViewManager::new(config.cleanup_delay, config.annotation_cooldown);

        info!(
            marker = "VIEW_MANAGER",
            columns = active_columns.len(),
            adapters = ?adapters,
            "Listing engine ready"
        );

        Ok(Self {
            config,
            cache: EntryCache::new(),
            adapters,
            columns,
            active_columns,
            sort: SortEngine::new(),
            filter,
            tracker: CursorTracker::new(),
            views,
            warned,
        })
    }

    // ------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn cache(&self) -> &EntryCache {
        &self.cache
    }

    #[must_use]
    pub const fn views(&self) -> &ViewManager {
        &self.views
    }

    pub fn view(&self, id: ViewId) -> CoreResult<&View> {
        self.views.get(id)
    }

    /// Columns currently rendered, in display order.
    #[must_use]
    pub fn active_columns(&self) -> &[Arc<dyn Column>] {
        &self.active_columns
    }

    /// Make a custom column available to `columns` and `sort` settings.
    pub fn register_column(&mut self, column: Arc<dyn Column>) {
        self.columns.register(column);
        self.active_columns = self.columns.resolve(&self.config.columns, &mut self.warned);
    }

    // ------------------------------------------------------------
    // View lifecycle
    // ------------------------------------------------------------

    /// Register a view of `url` (`scheme://path`). Nothing is rendered yet.
    pub fn open_view(&mut self, url: &str) -> CoreResult<ViewId> {
        let url = Url::parse(url)?;
        self.open_view_url(url)
    }

    pub fn open_view_url(&mut self, url: Url) -> CoreResult<ViewId> {
        let adapter = self.adapters.for_url(&url)?;
        Ok(self.views.open(url, adapter.is_mutable()))
    }

    pub fn close_view(&mut self, id: ViewId) -> CoreResult<()> {
        self.views.close(id).map(|_| ())
    }

    /// Record a visibility change of a view's surface. A view that comes
    /// back dirty is re-rendered; a zero cleanup delay runs the cleanup
    /// right away.
    pub async fn set_view_visible(
        &mut self,
        id: ViewId,
        visible: bool,
        now: Instant,
    ) -> CoreResult<TickOutcome> {
        if self.views.set_visible(id, visible, now)? {
            debug!(marker = "VIEW_MANAGER", view = id, "Rendering deferred dirty view");
            self.render_view(id, RenderOptions::default()).await?;
        }

        Ok(self.tick(now))
    }

    /// Engage or release the global read-only lock.
    pub fn set_locked(&mut self, locked: bool) {
        self.views.set_locked(locked);
    }

    /// Host edit of a line.
    pub fn edit_line(&mut self, id: ViewId, row: usize, text: impl Into<String>) -> CoreResult<()> {
        self.views.get_mut(id)?.edit_line(row, text)
    }

    /// The host applied the edits of `id` elsewhere.
    pub fn mark_saved(&mut self, id: ViewId) -> CoreResult<()> {
        self.views.get_mut(id)?.mark_saved();
        Ok(())
    }

    // ------------------------------------------------------------
    // Render pipeline
    // ------------------------------------------------------------

    /// Fetch (unless `options.refetch` is off) and render a view.
    ///
    /// Source and configuration errors are written into the view as text
    /// and returned; they never affect other views.
    #[instrument(skip(self), fields(view = id))]
    pub async fn render_view(&mut self, id: ViewId, options: RenderOptions) -> CoreResult<RenderReport> {
        if !options.refetch {
            self.render_from_cache(id, options)?;
            return Ok(RenderReport {
                from_cache: true,
                ..RenderReport::default()
            });
        }

        let url = self.views.get(id)?.url.clone();
        let adapter = match self.adapters.for_url(&url) {
            Ok(adapter) => adapter,
            Err(err) => {
                self.show_error(id, &err);
                return Err(err);
            }
        };

        if let Err(err) = self.cache.begin_session(&url) {
            self.show_error(id, &err);
            return Err(err);
        }

        // From here on, dropping this future releases the session
        let mut fetch = FetchGuard::new(self, id, url.clone());
        let mut state = PipelineState::Idle;
        transition(&mut state, PipelineState::SessionOpen);
        fetch.views.get_mut(id)?.loading = true;

        let column_names: Vec<CompactString> = fetch
            .active_columns
            .iter()
            .map(|column| CompactString::new(column.name()))
            .collect();

        info!(
            marker = "RENDER_PIPELINE",
            operation_type = "render_view",
            url = %url,
            "Fetch started"
        );

        let mut pacer = RenderPacer::start(fetch.config.render.intermediate_threshold, Instant::now());
        let mut report = RenderReport::default();
        transition(&mut state, PipelineState::Fetching);

        let mut next_page = adapter.list(&url, &column_names).await;
        loop {
            let ListPage { entries, next } = match next_page {
                Ok(page) => page,
                Err(source) => return Err(fetch.abort_fetch(id, &url, &mut state, source)),
            };

            report.pages += 1;
            report.entries += entries.len();
            trace!(
                marker = "RENDER_PIPELINE",
                page = report.pages,
                batch = entries.len(),
                "Page received"
            );

            for record in entries {
                fetch.cache.store(&url, record)?;
            }

            let Some(next) = next else {
                break;
            };

            match pacer.on_page(Instant::now(), true) {
                FetchStep::Continue => {}
                FetchStep::Finish => break,
                FetchStep::RenderIntermediate => {
                    transition(&mut state, PipelineState::RenderingIntermediate);
                    fetch.render_from_cache(id, RenderOptions::INTERMEDIATE)?;
                    report.intermediate_after.push(report.pages);
                    fetch.resume_pause().await;
                    transition(&mut state, PipelineState::Fetching);
                }
            }

            next_page = next.await;
        }

        transition(&mut state, PipelineState::SessionClosing);
        report.evicted = fetch.cache.end_session(&url)?;
        fetch.disarm();
        fetch.views.get_mut(id)?.loading = false;
        fetch.render_from_cache(id, options)?;
        transition(&mut state, PipelineState::Done);

        info!(
            marker = "RENDER_PIPELINE",
            operation_type = "render_view",
            url = %url,
            pages = report.pages,
            entries = report.entries,
            intermediate = report.intermediate_after.len(),
            evicted = report.evicted,
            "Fetch complete"
        );

        Ok(report)
    }

    /// Render a view from whatever the cache holds for its URL.
    pub fn render_from_cache(&mut self, id: ViewId, options: RenderOptions) -> CoreResult<()> {
        let Self {
            config,
            cache,
            columns,
            active_columns,
            sort,
            filter,
            tracker,
            views,
            ..
        } = self;

        let view = views.get_mut(id)?;
        let comparator = sort.comparator(&config.view.sort, columns, config.view.name_order());
        let listing = build_listing(cache.entries(&view.url), active_columns, &comparator, filter);

        trace!(
            marker = "RENDER_PIPELINE",
            view = id,
            rows = listing.len(),
            "Render flushed to view"
        );

        view.apply_listing(listing);
        if options.jump {
            tracker.restore(view, options.jump_first);
        }

        self.redraw_annotations(id)?;
        Ok(())
    }

    /// Re-render every visible view; hidden ones are marked dirty and
    /// rendered when they show up again. Returns the views rendered.
    pub async fn rerender_all(&mut self, refetch: bool) -> Vec<ViewId> {
        let targets = self.views.plan_rerender();
        let options = RenderOptions {
            refetch,
            ..RenderOptions::CACHED
        };

        let mut rendered = Vec::with_capacity(targets.len());
        for id in targets {
            match self.render_view(id, options).await {
                Ok(_) => rendered.push(id),
                Err(err) => log_rerender_failure(id, &err),
            }
        }
        rendered
    }

    fn rerender_cached(&mut self) {
        for id in self.views.plan_rerender() {
            if let Err(err) = self.render_from_cache(id, RenderOptions::CACHED) {
                log_rerender_failure(id, &err);
            }
        }
    }

    async fn resume_pause(&self) {
        let delay = self.config.render.resume_delay;
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }

    fn abort_fetch(
        &mut self,
        id: ViewId,
        url: &Url,
        state: &mut PipelineState,
        source: AdapterError,
    ) -> CoreError {
        transition(state, PipelineState::Error);

        if let Err(err) = self.cache.end_session(url) {
            warn!(marker = "CACHE_SESSION", error = %err, "Session already closed");
        }

        let err = CoreError::source_error(url, source);
        error!(
            marker = "RENDER_PIPELINE",
            operation_type = err.operation_type(),
            url = %url,
            error = %err,
            "Fetch failed"
        );

        if let Ok(view) = self.views.get_mut(id) {
            view.loading = false;
        }
        self.show_error(id, &err);
        err
    }

    /// Release what a render left behind when its future was dropped
    /// before the session closed.
    fn cancel_fetch(&mut self, id: ViewId, url: &Url) {
        if self.cache.abandon_session(url) {
            warn!(
                marker = "RENDER_PIPELINE",
                view = id,
                url = %url,
                "Fetch cancelled before completion"
            );
        }

        if let Ok(view) = self.views.get_mut(id) {
            view.loading = false;
        }
    }

    fn show_error(&mut self, id: ViewId, err: &CoreError) {
        if let Ok(view) = self.views.get_mut(id) {
            view.show_error(&err.to_compact_string());
        }
    }

    // ------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------

    /// Remember that the cursor in views of `url` should land on `name` at
    /// the next render.
    pub fn remember_cursor(&mut self, url: &Url, name: impl Into<CompactString>) {
        self.tracker.remember(url, name);
    }

    #[must_use]
    pub fn remembered_cursor(&self, url: &Url) -> Option<&str> {
        self.tracker.remembered(url)
    }

    /// Host moved the cursor. Applies the configured constraint, remembers
    /// the entry under it and returns where the cursor ended up.
    pub fn on_cursor_moved(&mut self, id: ViewId, cursor: Cursor) -> CoreResult<Cursor> {
        let mode = self.config.constrain_cursor;
        let view = self.views.get_mut(id)?;
        view.set_cursor(cursor);

        let Some(line) = view.current_line() else {
            return Ok(view.cursor);
        };

        if let Some(col) = constrain_cursor(mode, line, &self.active_columns, view.cursor.col) {
            trace!(marker = "CURSOR", view = id, col, "Cursor constrained");
            view.cursor.col = col;
        }

        let row = view.cursor.row;
        let result = view.cursor;
        match self.entry_on_line(id, row)? {
            Some(entry) if !entry.is_parent() => {
                let url = self.views.get(id)?.url.clone();
                self.tracker.remember(&url, entry.name);
            }
            _ => {}
        }

        Ok(result)
    }

    /// Entry a line of a view refers to, found through its identity token.
    pub fn entry_on_line(&self, id: ViewId, row: usize) -> CoreResult<Option<Entry>> {
        let view = self.views.get(id)?;
        let Some((entry_id, _)) = view.lines.get(row).and_then(|line| parse_id(line)) else {
            return Ok(None);
        };

        if entry_id == PARENT_ENTRY_ID {
            return Ok(Some(Entry::parent_placeholder()));
        }

        Ok(self.cache.get_by_id(entry_id).cloned())
    }

    // ------------------------------------------------------------
    // Annotations and timers
    // ------------------------------------------------------------

    /// Text of a view changed. Annotations are redrawn now or once the
    /// cooldown expires. Returns `true` if they were redrawn now.
    pub fn on_text_changed(&mut self, id: ViewId, now: Instant) -> CoreResult<bool> {
        let fire = self.views.notify_text_changed(id, now)?;
        if fire {
            self.redraw_annotations(id)?;
        }
        Ok(fire)
    }

    /// Recompute the adapter hints for every line of a view. Returns the
    /// number of annotations.
    pub fn redraw_annotations(&mut self, id: ViewId) -> CoreResult<usize> {
        let Self {
            cache,
            adapters,
            views,
            ..
        } = self;

        let view = views.get_mut(id)?;
        let Some(adapter) = adapters.get(view.url.scheme()) else {
            view.annotations.clear();
            return Ok(0);
        };

        view.annotations = view
            .lines
            .iter()
            .enumerate()
            .filter_map(|(row, line)| {
                let (entry_id, _) = parse_id(line)?;
                let entry = cache.get_by_id(entry_id)?;
                let text = adapter.annotate(entry)?;
                Some(Annotation { row, text })
            })
            .collect();

        Ok(view.annotations.len())
    }

    /// Run whatever timers are due at `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if let Some(destroyed) = self.views.run_cleanup(now) {
            self.cache.clear_all();
            outcome.destroyed = destroyed;
            outcome.cache_cleared = true;
        }

        for id in self.views.due_annotation_redraws(now) {
            if self.redraw_annotations(id).is_ok() {
                outcome.annotations_redrawn.push(id);
            }
        }

        outcome
    }

    /// When [`ListingEngine::tick`] should run next.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.views.next_deadline()
    }

    // ------------------------------------------------------------
    // Display settings
    // ------------------------------------------------------------

    pub fn toggle_hidden(&mut self) -> CoreResult<bool> {
        let show = !self.filter.show_hidden();
        self.set_show_hidden(show)?;
        Ok(show)
    }

    pub fn set_show_hidden(&mut self, show: bool) -> CoreResult<()> {
        self.ensure_no_unsaved("toggle hidden files")?;
        self.filter.set_show_hidden(show);
        self.config.view.show_hidden = show;
        self.rerender_cached();
        Ok(())
    }

    pub fn set_columns(&mut self, names: Vec<CompactString>) -> CoreResult<()> {
        self.ensure_no_unsaved("change columns")?;
        self.active_columns = self.columns.resolve(&names, &mut self.warned);
        self.config.columns = names;
        self.rerender_cached();
        Ok(())
    }

    pub fn set_sort(&mut self, spec: Vec<SortSpec>) -> CoreResult<()> {
        self.ensure_no_unsaved("change sort order")?;
        self.config.view.sort = spec;
        self.rerender_cached();
        Ok(())
    }

    pub fn set_hidden_predicate(&mut self, predicate: HiddenPredicate) {
        self.filter.set_hidden_predicate(predicate);
        self.rerender_cached();
    }

    pub fn set_always_hidden_predicate(&mut self, predicate: HiddenPredicate) {
        self.filter.set_always_hidden_predicate(predicate);
        self.rerender_cached();
    }

    fn ensure_no_unsaved(&self, operation: &str) -> CoreResult<()> {
        if self.views.any_modified() {
            warn!(
                marker = "VIEW_MANAGER",
                operation,
                "Refusing while a view has unsaved changes"
            );
            return Err(CoreError::unsaved_changes(operation));
        }
        Ok(())
    }
}

/// Source and setup failures already show in the view; anything else means
/// the engine itself is out of step.
fn log_rerender_failure(id: ViewId, err: &CoreError) {
    if err.is_fatal_for_render() {
        warn!(
            marker = "VIEW_MANAGER",
            view = id,
            operation_type = err.operation_type(),
            error = %err,
            "Re-render failed"
        );
    } else if err.is_recoverable() {
        debug!(
            marker = "VIEW_MANAGER",
            view = id,
            error = %err,
            "Re-render skipped"
        );
    } else {
        error!(
            marker = "VIEW_MANAGER",
            view = id,
            operation_type = err.operation_type(),
            error = %err,
            "Re-render failed"
        );
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    trace!(
        marker = "RENDER_PIPELINE",
        from = state.as_str(),
        to = next.as_str(),
        "Pipeline transition"
    );
    *state = next;
}

/// Engine borrow held by a running fetch. Dropped while armed, it abandons
/// the URL's session and clears the view's loading flag.
struct FetchGuard<'a> {
    engine: &'a mut ListingEngine,
    view: ViewId,
    url: Url,
    armed: bool,
}

impl<'a> FetchGuard<'a> {
    fn new(engine: &'a mut ListingEngine, view: ViewId, url: Url) -> Self {
        Self {
            engine,
            view,
            url,
            armed: true,
        }
    }

    /// The session closed normally.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Deref for FetchGuard<'_> {
    type Target = ListingEngine;

    fn deref(&self) -> &ListingEngine {
        self.engine
    }
}

impl DerefMut for FetchGuard<'_> {
    fn deref_mut(&mut self) -> &mut ListingEngine {
        self.engine
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.engine.cancel_fetch(self.view, &self.url);
        }
    }
}
