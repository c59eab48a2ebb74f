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
use std::{error::Error, fs, path::Path};

use serde::Deserialize;

mod control;
mod dmx;
mod fixture;
mod server;

pub use control::Control;
pub use dmx::Dmx;
pub use fixture::{Channels, Fixture, PanRange, TiltRange};
pub use server::Server;

/// A YAML representation of the lightkeeper configuration. Every section and
/// every field is optional; an empty file yields the stock beacon setup.
#[derive(Deserialize, Default)]
pub struct Config {
    /// The OSC server configuration.
    #[serde(default)]
    server: Server,

    /// The fixture channel map and motion limits.
    #[serde(default)]
    fixture: Fixture,

    /// Client liveness, arbitration, and idle behavior.
    #[serde(default)]
    control: Control,

    /// The DMX output configuration.
    #[serde(default)]
    dmx: Dmx,
}

impl Config {
    /// Deserializes the configuration from the given YAML file.
    pub fn deserialize(path: &Path) -> Result<Config, Box<dyn Error>> {
        match serde_yml::from_str(&fs::read_to_string(path)?) {
            Ok(config) => Ok(config),
            Err(e) => Err(format!("error parsing file {}: {}", path.display(), e).into()),
        }
    }

    /// Gets the OSC server configuration.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Gets the fixture configuration.
    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// Gets the control configuration.
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Gets the DMX configuration.
    pub fn dmx(&self) -> &Dmx {
        &self.dmx
    }
}
