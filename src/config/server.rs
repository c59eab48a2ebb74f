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
use std::net::{AddrParseError, SocketAddr};

use serde::Deserialize;

/// The default address the OSC server listens on.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8000";

/// The stock TouchOSC layout addresses. The `lightControl` alias is the fader
/// name in the older panel layouts; newer layouts use `brightness`.
pub const DEFAULT_PAN_ADDRESS: &str = "/staticLight/pan";
pub const DEFAULT_TILT_ADDRESS: &str = "/staticLight/tilt";
pub const DEFAULT_SPEED_ADDRESS: &str = "/staticLight/speed";
pub const DEFAULT_LAMP_ADDRESSES: [&str; 2] =
    ["/staticLight/lightControl", "/staticLight/brightness"];
pub const DEFAULT_STROBE_ADDRESS: &str = "/staticLight/strobe";
pub const DEFAULT_TOGGLE_ADDRESS: &str = "/control/toggle";
pub const DEFAULT_PING_ADDRESS: &str = "/ping";
pub const DEFAULT_IDLE_ENABLE_ADDRESS: &str = "/admin/idleEnable";

/// A YAML representation of the OSC server configuration.
#[derive(Deserialize, Default, Clone)]
pub struct Server {
    /// The socket address to listen for OSC datagrams on.
    listen: Option<String>,

    /// The OSC address to look for to set the pan position.
    pan: Option<String>,
    /// The OSC address to look for to set the tilt angle.
    tilt: Option<String>,
    /// The OSC address to look for to set the rotation speed.
    speed: Option<String>,
    /// The OSC addresses to look for to set the lamp brightness.
    lamp: Option<Vec<String>>,
    /// The OSC address to look for to set the strobe rate.
    strobe: Option<String>,
    /// The OSC address to look for to request or release control.
    toggle: Option<String>,
    /// The OSC address clients ping to stay live.
    ping: Option<String>,
    /// The OSC address to look for to enable or disable the idle pattern.
    idle_enable: Option<String>,
}

impl Server {
    /// Gets the listen address.
    pub fn listen(&self) -> Result<SocketAddr, AddrParseError> {
        self.listen
            .as_deref()
            .unwrap_or(DEFAULT_LISTEN_ADDRESS)
            .parse()
    }

    /// Gets the pan address.
    pub fn pan(&self) -> String {
        self.pan
            .clone()
            .unwrap_or_else(|| DEFAULT_PAN_ADDRESS.to_string())
    }

    /// Gets the tilt address.
    pub fn tilt(&self) -> String {
        self.tilt
            .clone()
            .unwrap_or_else(|| DEFAULT_TILT_ADDRESS.to_string())
    }

    /// Gets the speed address.
    pub fn speed(&self) -> String {
        self.speed
            .clone()
            .unwrap_or_else(|| DEFAULT_SPEED_ADDRESS.to_string())
    }

    /// Gets the lamp addresses.
    pub fn lamp(&self) -> Vec<String> {
        self.lamp.clone().unwrap_or_else(|| {
            DEFAULT_LAMP_ADDRESSES
                .iter()
                .map(|addr| addr.to_string())
                .collect()
        })
    }

    /// Gets the strobe address.
    pub fn strobe(&self) -> String {
        self.strobe
            .clone()
            .unwrap_or_else(|| DEFAULT_STROBE_ADDRESS.to_string())
    }

    /// Gets the control toggle address.
    pub fn toggle(&self) -> String {
        self.toggle
            .clone()
            .unwrap_or_else(|| DEFAULT_TOGGLE_ADDRESS.to_string())
    }

    /// Gets the ping address.
    pub fn ping(&self) -> String {
        self.ping
            .clone()
            .unwrap_or_else(|| DEFAULT_PING_ADDRESS.to_string())
    }

    /// Gets the idle enable address.
    pub fn idle_enable(&self) -> String {
        self.idle_enable
            .clone()
            .unwrap_or_else(|| DEFAULT_IDLE_ENABLE_ADDRESS.to_string())
    }
}
