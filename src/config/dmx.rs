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
use serde::Deserialize;

/// The default OLA RPC port.
pub const DEFAULT_OLA_PORT: u16 = 9010;

/// The default OpenLighting universe the fixture is patched into.
pub const DEFAULT_UNIVERSE: u32 = 1;

/// A YAML representation of the DMX output configuration.
#[derive(Deserialize, Default, Clone)]
pub struct Dmx {
    /// The port olad's RPC endpoint listens on.
    ola_port: Option<u16>,

    /// The OpenLighting universe the fixture is patched into.
    universe: Option<u32>,
}

impl Dmx {
    /// Gets the OLA RPC port.
    pub fn ola_port(&self) -> u16 {
        self.ola_port.unwrap_or(DEFAULT_OLA_PORT)
    }

    /// Gets the OpenLighting universe.
    pub fn universe(&self) -> u32 {
        self.universe.unwrap_or(DEFAULT_UNIVERSE)
    }
}
