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
    collections::HashMap,
    net::IpAddr,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cancel::CancelHandle;

/// Tracks which client panels are alive. Identity is the source IP alone:
/// the panels reconnect from a fresh ephemeral port constantly but keep
/// their address.
pub struct Tracker {
    window: Duration,
    pings: Mutex<Pings>,
}

struct Pings {
    by_client: HashMap<IpAddr, Instant>,
    /// The most recent activity from anyone, kept past eviction so quiet
    /// time is measured from the last ping rather than the last sweep.
    last_any: Option<Instant>,
}

impl Tracker {
    /// Creates a new tracker with the given liveness window.
    pub fn new(window: Duration) -> Tracker {
        Tracker {
            window,
            pings: Mutex::new(Pings {
                by_client: HashMap::new(),
                last_any: None,
            }),
        }
    }

    /// Records activity from the given client.
    pub fn record(&self, client: IpAddr) {
        self.record_at(client, Instant::now());
    }

    pub(crate) fn record_at(&self, client: IpAddr, at: Instant) {
        let mut pings = self.pings.lock();
        if pings.by_client.insert(client, at).is_none() {
            info!(client = client.to_string(), "New client.");
        }
        pings.last_any = Some(match pings.last_any {
            Some(prev) => prev.max(at),
            None => at,
        });
    }

    /// Returns true if the client produced activity within the liveness
    /// window.
    pub fn is_live(&self, client: IpAddr) -> bool {
        self.is_live_at(client, Instant::now())
    }

    pub(crate) fn is_live_at(&self, client: IpAddr, now: Instant) -> bool {
        self.pings
            .lock()
            .by_client
            .get(&client)
            .is_some_and(|at| now.saturating_duration_since(*at) <= self.window)
    }

    /// Returns true if any client produced activity within the given window.
    pub fn any_activity_within(&self, window: Duration, now: Instant) -> bool {
        self.pings
            .lock()
            .last_any
            .is_some_and(|at| now.saturating_duration_since(at) <= window)
    }

    /// Drops records older than the liveness window. Returns how many were
    /// evicted.
    pub(crate) fn sweep(&self, now: Instant) -> usize {
        let mut pings = self.pings.lock();
        let window = self.window;
        let stale: Vec<IpAddr> = pings
            .by_client
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(**at) > window)
            .map(|(client, _)| *client)
            .collect();
        for client in stale.iter() {
            pings.by_client.remove(client);
            info!(client = client.to_string(), "Client hasn't pinged, removing.");
        }
        stale.len()
    }

    /// Gets the number of clients currently tracked.
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.pings.lock().by_client.len()
    }
}

/// Starts the sweep thread. It wakes every period, evicts stale records,
/// and stops within one period of the handle being cancelled.
pub fn start_sweep(
    tracker: Arc<Tracker>,
    period: Duration,
    cancel: CancelHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Liveness sweep started.");
        while !cancel.wait_timeout(period) {
            tracker.sweep(Instant::now());
        }
        debug!("Liveness sweep stopped.");
    })
}
