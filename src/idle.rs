// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{arbiter::Arbiter, cancel::CancelHandle, fixture::Head, liveness::Tracker};

/// Watches for the room going quiet and runs the fixture's idle pattern when
/// it does. The beacon belongs to the skyline at night; it shouldn't sit
/// still just because nobody's touching a panel.
pub struct Monitor {
    head: Arc<Head>,
    liveness: Arc<Tracker>,
    arbiter: Arc<Arbiter>,
    quiet_window: Duration,
    state: Mutex<State>,
}

struct State {
    enabled: bool,
    active: bool,
}

impl Monitor {
    /// Creates a new idle monitor.
    pub fn new(
        head: Arc<Head>,
        liveness: Arc<Tracker>,
        arbiter: Arc<Arbiter>,
        quiet_window: Duration,
        enabled: bool,
    ) -> Monitor {
        Monitor {
            head,
            liveness,
            arbiter,
            quiet_window,
            state: Mutex::new(State {
                enabled,
                active: false,
            }),
        }
    }

    /// Enables or disables the idle pattern. Disabling doesn't interrupt a
    /// pattern already running; it only stops the next one from starting.
    /// Returns the new flag for the status notification.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let mut state = self.state.lock();
        if state.enabled != enabled {
            info!(enabled, "Idle pattern toggled.");
        }
        state.enabled = enabled;
        enabled
    }

    /// Returns true if the idle pattern is enabled.
    #[cfg(test)]
    pub(crate) fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Returns true if the idle pattern is currently running the fixture.
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// One evaluation step, factored out of the thread so tests can drive
    /// the clock.
    pub(crate) fn tick(&self, now: Instant) {
        let quiet = !self.liveness.any_activity_within(self.quiet_window, now);

        let mut state = self.state.lock();
        if !quiet {
            if state.active {
                info!("Client activity resumed, idle pattern stands down.");
                state.active = false;
            }
            return;
        }
        if state.active || !state.enabled {
            return;
        }
        state.active = true;
        // Don't hold the state lock through device traffic.
        drop(state);

        info!(
            quiet = format!("{:?}", self.quiet_window),
            "No client activity, starting the idle pattern."
        );
        // A holder that went this long without a ping isn't coming back
        // for the fixture.
        self.arbiter.force_release();
        self.head.idle_pattern();
    }
}

/// Starts the idle monitor thread: one grace period after startup, then an
/// evaluation every tick. Stops within one tick of cancellation.
pub fn start(
    monitor: Arc<Monitor>,
    grace: Duration,
    tick: Duration,
    cancel: CancelHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!(
            grace = format!("{:?}", grace),
            "Idle monitor waiting out the grace period."
        );
        if cancel.wait_timeout(grace) {
            return;
        }
        while !cancel.wait_timeout(tick) {
            monitor.tick(Instant::now());
        }
        debug!("Idle monitor stopped.");
    })
}
