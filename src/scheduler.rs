/*
 *  scheduler.rs
 *
 *  osdcast - pixels over datagrams
 *  (c) 2024-26 the osdcast authors
 *
 *  TODO:
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! Refresh pacing: any number of applied deltas collapse into at most one
//! visual push per throttle window, while an idle engine wakes at the
//! configured idle cap.

use std::time::{Duration, Instant};

/// Minimum spacing between two visual refreshes (~30 Hz).
pub const PUSH_INTERVAL: Duration = Duration::from_millis(32);

/// Bounds for the configurable idle wake interval.
pub const IDLE_CAP_MIN_MS: u64 = 10;
pub const IDLE_CAP_MAX_MS: u64 = 1000;

pub fn clamp_idle_ms(ms: u64) -> u64 {
    ms.clamp(IDLE_CAP_MIN_MS, IDLE_CAP_MAX_MS)
}

#[derive(Debug)]
pub struct UpdateScheduler {
    push_interval: Duration,
    idle_cap: Duration,
    last_push: Option<Instant>,
    pending: bool,
}

impl UpdateScheduler {
    pub fn new(idle_cap_ms: u64) -> Self {
        UpdateScheduler {
            push_interval: PUSH_INTERVAL,
            idle_cap: Duration::from_millis(clamp_idle_ms(idle_cap_ms)),
            last_push: None,
            pending: false,
        }
    }

    #[cfg(test)]
    pub fn with_interval(idle_cap_ms: u64, push_interval: Duration) -> Self {
        let mut s = Self::new(idle_cap_ms);
        s.push_interval = push_interval;
        s
    }

    pub fn set_idle_cap(&mut self, idle_cap_ms: u64) {
        self.idle_cap = Duration::from_millis(clamp_idle_ms(idle_cap_ms));
    }

    pub fn idle_cap(&self) -> Duration {
        self.idle_cap
    }

    /// Marks that state changed and a visual refresh is owed.
    pub fn note_pending(&mut self) {
        self.pending = true;
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    fn window_remaining(&self, now: Instant) -> Duration {
        match self.last_push {
            Some(last) => self
                .push_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Returns true when a refresh is both owed and allowed; the throttle
    /// window restarts at `now` and the pending mark clears.
    pub fn take_refresh(&mut self, now: Instant) -> bool {
        if !self.pending || !self.window_remaining(now).is_zero() {
            return false;
        }
        self.pending = false;
        self.last_push = Some(now);
        true
    }

    /// Records an out-of-band refresh (e.g. config reload) so the throttle
    /// window restarts from it.
    pub fn note_forced_refresh(&mut self, now: Instant) {
        self.pending = false;
        self.last_push = Some(now);
    }

    /// How long the loop may sleep: the remaining throttle window while a
    /// refresh is owed, the idle cap otherwise. Never exceeds the idle cap.
    pub fn wait_budget(&self, now: Instant) -> Duration {
        if self.pending {
            self.window_remaining(now).min(self.idle_cap)
        } else {
            self.idle_cap
        }
    }
}

// ---------- tests ----------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_cap_clamps() {
        assert_eq!(clamp_idle_ms(5), 10);
        assert_eq!(clamp_idle_ms(5000), 1000);
        assert_eq!(clamp_idle_ms(250), 250);
        assert_eq!(UpdateScheduler::new(5).idle_cap(), Duration::from_millis(10));
        assert_eq!(UpdateScheduler::new(5000).idle_cap(), Duration::from_millis(1000));
    }

    #[test]
    fn no_refresh_without_pending() {
        let mut s = UpdateScheduler::new(100);
        assert!(!s.take_refresh(Instant::now()));
    }

    #[test]
    fn first_pending_refresh_fires_immediately() {
        let mut s = UpdateScheduler::new(100);
        s.note_pending();
        assert!(s.take_refresh(Instant::now()));
        assert!(!s.pending());
    }

    #[test]
    fn refresh_within_window_defers() {
        let mut s = UpdateScheduler::new(100);
        let t0 = Instant::now();
        s.note_pending();
        assert!(s.take_refresh(t0));

        // A burst inside the window coalesces into one deferred refresh.
        s.note_pending();
        s.note_pending();
        let t1 = t0 + Duration::from_millis(10);
        assert!(!s.take_refresh(t1));

        // The wait budget is exactly the remaining window.
        assert_eq!(s.wait_budget(t1), PUSH_INTERVAL - Duration::from_millis(10));

        let t2 = t0 + PUSH_INTERVAL;
        assert!(s.take_refresh(t2));
        assert!(!s.take_refresh(t2 + Duration::from_millis(1)));
    }

    #[test]
    fn idle_budget_is_the_cap() {
        let s = UpdateScheduler::new(100);
        assert_eq!(s.wait_budget(Instant::now()), Duration::from_millis(100));
    }

    #[test]
    fn pending_budget_never_exceeds_idle_cap() {
        let mut s = UpdateScheduler::with_interval(10, Duration::from_millis(500));
        let t0 = Instant::now();
        s.note_pending();
        assert!(s.take_refresh(t0));
        s.note_pending();
        assert_eq!(s.wait_budget(t0), Duration::from_millis(10));
    }

    #[test]
    fn forced_refresh_restarts_the_window() {
        let mut s = UpdateScheduler::new(100);
        let t0 = Instant::now();
        s.note_forced_refresh(t0);
        s.note_pending();
        assert!(!s.take_refresh(t0 + Duration::from_millis(1)));
        assert!(s.take_refresh(t0 + PUSH_INTERVAL));
    }
}
