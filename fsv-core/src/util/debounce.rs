//!  src/util/debounce.rs
//!  ===================================================================
//!  Cooldown debouncer for redraws driven by text-change notifications.
//!
//!  • The first event fires immediately (leading edge) and opens a
//!    cooldown window.
//!  • Events arriving inside the window are coalesced into exactly one
//!    trailing fire once the window expires.
//!  • Purely state-driven: the host passes `now` in and asks for the next
//!    deadline, so the same machine runs under a real or a paused clock.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// Nothing fired recently.
    Idle,
    /// Fired at the leading edge, window open until `until`.
    Cooldown { until: Instant },
    /// Events arrived during the window; one trailing fire owed at `until`.
    Pending { until: Instant },
}

#[derive(Debug, Clone)]
pub struct CooldownDebouncer {
    cooldown: Duration,
    state: DebounceState,
}

impl CooldownDebouncer {
    #[must_use]
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: DebounceState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DebounceState {
        self.state
    }

    /// Record an event. Returns `true` when the caller should fire now.
    pub fn submit(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Idle => self.fire_leading(now),

            DebounceState::Cooldown { until } | DebounceState::Pending { until }
                if now >= until =>
            {
                // Window already over but nobody polled; treat as a fresh edge
                self.fire_leading(now)
            }

            DebounceState::Cooldown { until } => {
                trace!("Coalescing event into trailing fire");
                self.state = DebounceState::Pending { until };
                false
            }

            DebounceState::Pending { .. } => false,
        }
    }

    /// Advance the clock. Returns `true` when the trailing fire is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Pending { until } if now >= until => {
                self.state = DebounceState::Idle;
                true
            }

            DebounceState::Cooldown { until } if now >= until => {
                self.state = DebounceState::Idle;
                false
            }

            _ => false,
        }
    }

    /// When `poll` next needs to run, if ever.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Cooldown { until } | DebounceState::Pending { until } => Some(until),
        }
    }

    fn fire_leading(&mut self, now: Instant) -> bool {
        self.state = DebounceState::Cooldown {
            until: now + self.cooldown,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn test_first_event_fires_immediately() {
        let t0 = Instant::now();
        let mut deb = CooldownDebouncer::new(WINDOW);

        assert!(deb.submit(t0));
        assert_eq!(deb.state(), DebounceState::Cooldown { until: t0 + WINDOW });
    }

    #[test]
    fn test_burst_collapses_into_one_trailing_fire() {
        let t0 = Instant::now();
        let mut deb = CooldownDebouncer::new(WINDOW);

        assert!(deb.submit(t0));
        assert!(!deb.submit(t0 + Duration::from_millis(10)));
        assert!(!deb.submit(t0 + Duration::from_millis(20)));
        assert!(!deb.submit(t0 + Duration::from_millis(90)));

        assert!(!deb.poll(t0 + Duration::from_millis(99)));
        assert!(deb.poll(t0 + WINDOW));
        // Only once
        assert!(!deb.poll(t0 + WINDOW * 2));
        assert_eq!(deb.state(), DebounceState::Idle);
    }

    #[test]
    fn test_quiet_window_expires_without_trailing_fire() {
        let t0 = Instant::now();
        let mut deb = CooldownDebouncer::new(WINDOW);

        assert!(deb.submit(t0));
        assert!(!deb.poll(t0 + WINDOW));
        assert_eq!(deb.deadline(), None);

        // Next event is a new leading edge
        assert!(deb.submit(t0 + WINDOW * 3));
    }

    #[test]
    fn test_event_after_unpolled_expiry_fires_at_once() {
        let t0 = Instant::now();
        let mut deb = CooldownDebouncer::new(WINDOW);

        assert!(deb.submit(t0));
        assert!(!deb.submit(t0 + Duration::from_millis(50)));
        assert!(deb.submit(t0 + WINDOW * 2));
        assert_eq!(deb.deadline(), Some(t0 + WINDOW * 3));
    }
}
