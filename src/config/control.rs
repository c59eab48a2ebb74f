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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

/// How long a client counts as live after its last ping. One second past a
/// full minute, so panels pinging on a 60 second timer survive one loss.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(61);

/// How often stale liveness records are swept out.
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Whether only the control holder may move the fixture.
pub const DEFAULT_EXCLUSIVE: bool = true;

/// How long after startup before the idle monitor starts evaluating.
pub const DEFAULT_IDLE_GRACE: Duration = Duration::from_secs(180);

/// How long all clients must be silent before the idle pattern starts.
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(180);

/// How often the idle monitor evaluates.
pub const DEFAULT_IDLE_TICK: Duration = Duration::from_secs(1);

/// Whether the idle pattern is enabled at startup.
pub const DEFAULT_IDLE_ENABLED: bool = true;

/// A YAML representation of the client liveness, arbitration, and idle
/// configuration.
#[derive(Deserialize, Default, Clone)]
pub struct Control {
    /// How long a client counts as live after its last ping.
    liveness_window: Option<String>,

    /// How often stale liveness records are swept out.
    sweep_period: Option<String>,

    /// Whether only the control holder may move the fixture.
    exclusive: Option<bool>,

    /// How long after startup before the idle monitor starts evaluating.
    idle_grace: Option<String>,

    /// How long all clients must be silent before the idle pattern starts.
    idle_window: Option<String>,

    /// How often the idle monitor evaluates.
    idle_tick: Option<String>,

    /// Whether the idle pattern is enabled at startup.
    idle_enabled: Option<bool>,
}

impl Control {
    /// Gets the liveness window.
    pub fn liveness_window(&self) -> Result<Duration, duration_string::Error> {
        self.liveness_window
            .as_ref()
            .map_or(Ok(DEFAULT_LIVENESS_WINDOW), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }

    /// Gets the sweep period.
    pub fn sweep_period(&self) -> Result<Duration, duration_string::Error> {
        self.sweep_period
            .as_ref()
            .map_or(Ok(DEFAULT_SWEEP_PERIOD), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }

    /// Gets whether control is exclusive.
    pub fn exclusive(&self) -> bool {
        self.exclusive.unwrap_or(DEFAULT_EXCLUSIVE)
    }

    /// Gets the idle grace period.
    pub fn idle_grace(&self) -> Result<Duration, duration_string::Error> {
        self.idle_grace
            .as_ref()
            .map_or(Ok(DEFAULT_IDLE_GRACE), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }

    /// Gets the idle window.
    pub fn idle_window(&self) -> Result<Duration, duration_string::Error> {
        self.idle_window
            .as_ref()
            .map_or(Ok(DEFAULT_IDLE_WINDOW), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }

    /// Gets the idle tick period.
    pub fn idle_tick(&self) -> Result<Duration, duration_string::Error> {
        self.idle_tick
            .as_ref()
            .map_or(Ok(DEFAULT_IDLE_TICK), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }

    /// Gets whether the idle pattern is enabled at startup.
    pub fn idle_enabled(&self) -> bool {
        self.idle_enabled.unwrap_or(DEFAULT_IDLE_ENABLED)
    }
}
