//! src/controller/view_manager.rs
//! ============================================================================
//! # View session manager
//!
//! Owns every live view. Tracks visibility, the global modifiability lock,
//! the hidden-view cleanup timer and the per-view annotation debouncers.
//! Timers are plain deadlines: the host calls [`ViewManager::next_deadline`]
//! to know when to come back, and the engine's `tick` does the work.

use std::{collections::BTreeMap, time::Duration};

use ahash::AHashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    error::{CoreError, CoreResult},
    model::url::Url,
    util::debounce::CooldownDebouncer,
    view::listing_view::{View, ViewId},
};

#[derive(Debug)]
pub struct ViewManager {
    views: BTreeMap<ViewId, View>,
    next_id: ViewId,
    locked: bool,
    cleanup_delay: Option<Duration>,
    cleanup_deadline: Option<Instant>,
    annotation_cooldown: Duration,
    debouncers: AHashMap<ViewId, CooldownDebouncer>,
}

impl ViewManager {
    #[must_use]
    pub fn new(cleanup_delay: Option<Duration>, annotation_cooldown: Duration) -> Self {
        Self {
            views: BTreeMap::new(),
            next_id: 1,
            locked: false,
            cleanup_delay,
            cleanup_deadline: None,
            annotation_cooldown,
            debouncers: AHashMap::new(),
        }
    }

    /// Register a new, visible view of `url`.
    pub fn open(&mut self, url: Url, adapter_mutable: bool) -> ViewId {
        let id = self.next_id;
        self.next_id += 1;

        let mut view = View::new(id, url);
        view.adapter_mutable = adapter_mutable;
        view.locked = self.locked;

        debug!(
            marker = "VIEW_MANAGER",
            operation_type = "open_view",
            view = id,
            url = %view.url,
            "View registered"
        );

        self.views.insert(id, view);
        id
    }

    pub fn close(&mut self, id: ViewId) -> CoreResult<View> {
        let view = self.views.remove(&id).ok_or(CoreError::UnknownView(id))?;
        self.debouncers.remove(&id);

        debug!(
            marker = "VIEW_MANAGER",
            operation_type = "close_view",
            view = id,
            "View deregistered"
        );
        Ok(view)
    }

    pub fn get(&self, id: ViewId) -> CoreResult<&View> {
        self.views.get(&id).ok_or(CoreError::UnknownView(id))
    }

    pub fn get_mut(&mut self, id: ViewId) -> CoreResult<&mut View> {
        self.views.get_mut(&id).ok_or(CoreError::UnknownView(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.views.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Engage or release the global read-only lock.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        for view in self.views.values_mut() {
            view.locked = locked;
        }

        info!(
            marker = "VIEW_MANAGER",
            operation_type = "set_locked",
            locked,
            "Modifiability lock changed"
        );
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    #[must_use]
    pub fn any_modified(&self) -> bool {
        self.views.values().any(|view| view.modified)
    }

    #[must_use]
    pub fn any_visible(&self) -> bool {
        self.views.values().any(|view| view.visible)
    }

    /// Record a visibility change. Returns `true` when the view came back
    /// dirty and needs a render now.
    pub fn set_visible(&mut self, id: ViewId, visible: bool, now: Instant) -> CoreResult<bool> {
        let view = self.get_mut(id)?;
        view.visible = visible;

        if visible {
            return Ok(view.dirty);
        }

        if let Some(delay) = self.cleanup_delay {
            self.cleanup_deadline = Some(now + delay);
            debug!(
                marker = "VIEW_MANAGER",
                view = id,
                delay_ms = delay.as_millis() as u64,
                "Cleanup scheduled"
            );
        }

        Ok(false)
    }

    /// Split views for a full re-render: visible ones are returned, hidden
    /// ones are marked dirty.
    pub fn plan_rerender(&mut self) -> Vec<ViewId> {
        let mut now = Vec::new();
        for view in self.views.values_mut() {
            if view.visible {
                now.push(view.id);
            } else {
                view.dirty = true;
            }
        }
        now
    }

    #[must_use]
    pub const fn cleanup_deadline(&self) -> Option<Instant> {
        self.cleanup_deadline
    }

    /// Run the cleanup if its deadline passed. Returns the destroyed views,
    /// or `None` when nothing ran or the cleanup was vetoed.
    ///
    /// A non-`None` result means the caller must clear the entry cache.
    pub fn run_cleanup(&mut self, now: Instant) -> Option<Vec<ViewId>> {
        let deadline = self.cleanup_deadline?;
        if now < deadline {
            return None;
        }
        self.cleanup_deadline = None;

        if self.any_visible() {
            debug!(marker = "VIEW_MANAGER", "Cleanup skipped: a view is visible");
            return None;
        }

        if self.any_modified() {
            warn!(
                marker = "VIEW_MANAGER",
                "Cleanup skipped: a hidden view has unsaved changes"
            );
            return None;
        }

        let destroyed: Vec<ViewId> = self.views.keys().copied().collect();
        self.views.clear();
        self.debouncers.clear();

        info!(
            marker = "VIEW_MANAGER",
            operation_type = "cleanup",
            destroyed = destroyed.len(),
            "Hidden views destroyed"
        );

        Some(destroyed)
    }

    /// A view's text changed. Returns `true` when annotations should be
    /// redrawn immediately.
    pub fn notify_text_changed(&mut self, id: ViewId, now: Instant) -> CoreResult<bool> {
        if !self.views.contains_key(&id) {
            return Err(CoreError::UnknownView(id));
        }

        let cooldown = self.annotation_cooldown;
        Ok(self
            .debouncers
            .entry(id)
            .or_insert_with(|| CooldownDebouncer::new(cooldown))
            .submit(now))
    }

    /// Views whose trailing annotation redraw is due.
    pub fn due_annotation_redraws(&mut self, now: Instant) -> Vec<ViewId> {
        let mut due: Vec<ViewId> = self
            .debouncers
            .iter_mut()
            .filter_map(|(&id, debouncer)| debouncer.poll(now).then_some(id))
            .collect();
        due.sort_unstable();
        due
    }

    /// Earliest time anything here needs attention.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncers
            .values()
            .filter_map(CooldownDebouncer::deadline)
            .chain(self.cleanup_deadline)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::new("dir", path)
    }

    fn manager(delay: Option<Duration>) -> ViewManager {
        ViewManager::new(delay, Duration::from_millis(100))
    }

    #[test]
    fn test_hidden_views_are_marked_dirty() {
        let mut views = manager(None);
        let t0 = Instant::now();
        let a = views.open(url("a/"), true);
        let b = views.open(url("b/"), true);

        views.set_visible(b, false, t0).expect("known");
        assert_eq!(views.plan_rerender(), [a]);
        assert!(views.get(b).expect("known").dirty);

        // Becoming visible again asks for the deferred render
        assert!(views.set_visible(b, true, t0).expect("known"));
    }

    #[test]
    fn test_cleanup_waits_for_delay_and_destroys_all() {
        let mut views = manager(Some(Duration::from_secs(2)));
        let t0 = Instant::now();
        let a = views.open(url("a/"), true);
        views.set_visible(a, false, t0).expect("known");

        assert_eq!(views.next_deadline(), Some(t0 + Duration::from_secs(2)));
        assert_eq!(views.run_cleanup(t0 + Duration::from_secs(1)), None);
        assert_eq!(views.run_cleanup(t0 + Duration::from_secs(2)), Some(vec![a]));
        assert!(views.is_empty());
    }

    #[test]
    fn test_cleanup_vetoed_by_unsaved_edits_or_visible_view() {
        let mut views = manager(Some(Duration::ZERO));
        let t0 = Instant::now();
        let a = views.open(url("a/"), true);
        let b = views.open(url("b/"), true);

        views.get_mut(a).expect("known").modified = true;
        views.set_visible(a, false, t0).expect("known");
        views.set_visible(b, false, t0).expect("known");
        assert_eq!(views.run_cleanup(t0), None);
        assert_eq!(views.len(), 2);

        views.get_mut(a).expect("known").modified = false;
        views.set_visible(b, true, t0).expect("known");
        views.set_visible(a, false, t0).expect("known");
        assert_eq!(views.run_cleanup(t0), None);
        assert_eq!(views.len(), 2);
    }

    #[test]
    fn test_disabled_cleanup_never_schedules() {
        let mut views = manager(None);
        let t0 = Instant::now();
        let a = views.open(url("a/"), true);
        views.set_visible(a, false, t0).expect("known");

        assert_eq!(views.cleanup_deadline(), None);
        assert_eq!(views.run_cleanup(t0 + Duration::from_secs(60)), None);
        assert_eq!(views.len(), 1);
    }

    #[test]
    fn test_lock_applies_to_existing_and_new_views() {
        let mut views = manager(None);
        let a = views.open(url("a/"), true);
        views.set_locked(true);
        let b = views.open(url("b/"), true);

        assert!(!views.get(a).expect("known").is_modifiable());
        assert!(!views.get(b).expect("known").is_modifiable());

        views.set_locked(false);
        assert!(views.get(a).expect("known").is_modifiable());
    }

    #[test]
    fn test_annotation_redraws_are_coalesced_per_view() {
        let mut views = manager(None);
        let t0 = Instant::now();
        let a = views.open(url("a/"), true);

        assert!(views.notify_text_changed(a, t0).expect("known"));
        assert!(!views.notify_text_changed(a, t0 + Duration::from_millis(30)).expect("known"));
        assert!(!views.notify_text_changed(a, t0 + Duration::from_millis(60)).expect("known"));

        assert!(views.due_annotation_redraws(t0 + Duration::from_millis(99)).is_empty());
        assert_eq!(views.due_annotation_redraws(t0 + Duration::from_millis(100)), [a]);
        assert!(views.due_annotation_redraws(t0 + Duration::from_millis(200)).is_empty());
    }

    #[test]
    fn test_unknown_view_is_an_error() {
        let mut views = manager(None);
        assert!(matches!(views.close(42), Err(CoreError::UnknownView(42))));
        assert!(views.notify_text_changed(42, Instant::now()).is_err());
    }
}
