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

/// The stock channel layout of the beacon head.
pub const DEFAULT_MASTER_CHANNEL: u16 = 4;
pub const DEFAULT_BRIGHTNESS_CHANNEL: u16 = 6;
pub const DEFAULT_STROBE_CHANNEL: u16 = 7;
pub const DEFAULT_PAN_CHANNEL: u16 = 8;
pub const DEFAULT_TILT_CHANNEL: u16 = 10;
pub const DEFAULT_PAN_MOVEMENT_CHANNEL: u16 = 12;
pub const DEFAULT_SPEED_CHANNEL: u16 = 15;

/// The default safe tilt travel. The beam must stay above the crowd but below
/// the point where it washes the ceiling rig.
pub const DEFAULT_TILT_LOW_DEGREES: f64 = -5.0;
pub const DEFAULT_TILT_HIGH_DEGREES: f64 = 70.0;

/// A YAML representation of the fixture configuration.
#[derive(Deserialize, Default, Clone)]
pub struct Fixture {
    /// The fixture's DMX channel layout.
    channels: Option<Channels>,

    /// The safe tilt travel, in degrees.
    tilt_range: Option<TiltRange>,

    /// Pan intervals the head must never be commanded to rest inside.
    #[serde(default)]
    pan_dead_zones: Vec<PanRange>,
}

impl Fixture {
    /// Gets the channel layout.
    pub fn channels(&self) -> Channels {
        self.channels.clone().unwrap_or_default()
    }

    /// Gets the safe tilt travel.
    pub fn tilt_range(&self) -> TiltRange {
        self.tilt_range.unwrap_or_default()
    }

    /// Gets the pan dead zones.
    pub fn pan_dead_zones(&self) -> Vec<PanRange> {
        self.pan_dead_zones.clone()
    }
}

/// A YAML representation of the fixture's DMX channel layout.
#[derive(Deserialize, Default, Clone)]
pub struct Channels {
    /// The master lamp control channel.
    master: Option<u16>,
    /// The lamp brightness channel.
    brightness: Option<u16>,
    /// The strobe rate channel.
    strobe: Option<u16>,
    /// The pan position channel.
    pan: Option<u16>,
    /// The tilt position channel.
    tilt: Option<u16>,
    /// The pan movement mode channel (goto position or continuous rotation).
    pan_movement: Option<u16>,
    /// The pan/tilt motor speed channel.
    speed: Option<u16>,
}

impl Channels {
    /// Gets the master lamp control channel.
    pub fn master(&self) -> u16 {
        self.master.unwrap_or(DEFAULT_MASTER_CHANNEL)
    }

    /// Gets the lamp brightness channel.
    pub fn brightness(&self) -> u16 {
        self.brightness.unwrap_or(DEFAULT_BRIGHTNESS_CHANNEL)
    }

    /// Gets the strobe rate channel.
    pub fn strobe(&self) -> u16 {
        self.strobe.unwrap_or(DEFAULT_STROBE_CHANNEL)
    }

    /// Gets the pan position channel.
    pub fn pan(&self) -> u16 {
        self.pan.unwrap_or(DEFAULT_PAN_CHANNEL)
    }

    /// Gets the tilt position channel.
    pub fn tilt(&self) -> u16 {
        self.tilt.unwrap_or(DEFAULT_TILT_CHANNEL)
    }

    /// Gets the pan movement mode channel.
    pub fn pan_movement(&self) -> u16 {
        self.pan_movement.unwrap_or(DEFAULT_PAN_MOVEMENT_CHANNEL)
    }

    /// Gets the motor speed channel.
    pub fn speed(&self) -> u16 {
        self.speed.unwrap_or(DEFAULT_SPEED_CHANNEL)
    }
}

/// A YAML representation of the safe tilt travel.
#[derive(Deserialize, Clone, Copy)]
pub struct TiltRange {
    /// The lowest safe tilt angle, in degrees.
    low: f64,

    /// The highest safe tilt angle, in degrees.
    high: f64,
}

impl Default for TiltRange {
    fn default() -> TiltRange {
        TiltRange {
            low: DEFAULT_TILT_LOW_DEGREES,
            high: DEFAULT_TILT_HIGH_DEGREES,
        }
    }
}

impl TiltRange {
    /// Creates a new tilt range.
    #[cfg(test)]
    pub(crate) fn new(low: f64, high: f64) -> TiltRange {
        TiltRange { low, high }
    }

    /// Gets the lowest safe tilt angle.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Gets the highest safe tilt angle.
    pub fn high(&self) -> f64 {
        self.high
    }
}

/// A YAML representation of a closed pan interval, in degrees.
#[derive(Deserialize, Clone, Copy)]
pub struct PanRange {
    /// The interval's lower boundary.
    low: f64,

    /// The interval's upper boundary.
    high: f64,
}

impl PanRange {
    /// Creates a new pan range.
    #[cfg(test)]
    pub(crate) fn new(low: f64, high: f64) -> PanRange {
        PanRange { low, high }
    }

    /// Gets the interval's lower boundary.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Gets the interval's upper boundary.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns true if the given angle falls inside the interval, boundaries
    /// included.
    pub fn contains(&self, degrees: f64) -> bool {
        self.low <= degrees && degrees <= self.high
    }
}
