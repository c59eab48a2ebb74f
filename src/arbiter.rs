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
use std::{net::IpAddr, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

use crate::liveness::Tracker;

/// The outcome of a control toggle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The requester now holds control, or already did.
    Granted,
    /// Someone else holds control and is still live.
    Denied,
    /// The requester gave control up.
    Released,
    /// The requester tried to release control it never held.
    NotHolder,
}

/// Arbitrates control of the fixture between clients. A vanished holder
/// never wedges the fixture: liveness is consulted at takeover time, under
/// the same lock that moves the holder.
pub struct Arbiter {
    exclusive: bool,
    liveness: Arc<Tracker>,
    holder: Mutex<Option<IpAddr>>,
}

impl Arbiter {
    /// Creates a new arbiter. With `exclusive` unset, holding control is
    /// advisory and movement commands from anyone go through.
    pub fn new(liveness: Arc<Tracker>, exclusive: bool) -> Arbiter {
        Arbiter {
            exclusive,
            liveness,
            holder: Mutex::new(None),
        }
    }

    /// Handles a control toggle from a client. `wants` is true to request
    /// control and false to release it.
    pub fn request_control(&self, client: IpAddr, wants: bool) -> Decision {
        let mut holder = self.holder.lock();
        match (*holder, wants) {
            (None, true) => {
                *holder = Some(client);
                info!(client = client.to_string(), "Control granted.");
                Decision::Granted
            }
            (Some(held), true) if held == client => Decision::Granted,
            (Some(held), true) => {
                if self.liveness.is_live(held) {
                    info!(
                        client = client.to_string(),
                        holder = held.to_string(),
                        "Control denied, holder is live."
                    );
                    Decision::Denied
                } else {
                    *holder = Some(client);
                    info!(
                        client = client.to_string(),
                        previous = held.to_string(),
                        "Control taken over from vanished holder."
                    );
                    Decision::Granted
                }
            }
            (Some(held), false) if held == client => {
                *holder = None;
                info!(client = client.to_string(), "Control released.");
                Decision::Released
            }
            (_, false) => Decision::NotHolder,
        }
    }

    /// Returns true if a movement command from the client should go through.
    /// Anyone may drive an unheld fixture; a held one obeys its holder alone
    /// unless exclusivity is off.
    pub fn permits(&self, client: IpAddr) -> bool {
        if !self.exclusive {
            return true;
        }
        match *self.holder.lock() {
            None => true,
            Some(held) => held == client,
        }
    }

    /// Releases control no matter who holds it. Returns true if someone did.
    pub fn force_release(&self) -> bool {
        match self.holder.lock().take() {
            Some(held) => {
                info!(previous = held.to_string(), "Control forcibly released.");
                true
            }
            None => false,
        }
    }

    /// Gets the current holder.
    #[cfg(test)]
    pub(crate) fn holder(&self) -> Option<IpAddr> {
        *self.holder.lock()
    }
}
