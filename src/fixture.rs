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

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::{
    config::{self, Channels, PanRange, TiltRange},
    dmx::Transport,
};

pub(crate) mod transform;

/// How long the motor needs to spin down before a direction change, and how
/// long the head gets to coast before power-off. Changing direction at speed
/// strips the gearbox.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// The idle pattern's resting numbers: a dim lamp sweeping slowly clockwise
/// with the beam held at a lazy angle.
const IDLE_BRIGHTNESS_PERCENT: f64 = 20.0;
const IDLE_TILT_DEGREES: f64 = 45.0;
const IDLE_SPEED_PERCENT: f64 = 40.0;

/// The pose taken on startup: lamp off, facing the back wall, beam up.
const STARTUP_PAN_DEGREES: f64 = 180.0;
const STARTUP_TILT_DEGREES: f64 = 0.0;

/// The fixture head. All channel traffic to the device funnels through the
/// single lock here, so each committed frame reaches the hardware whole.
pub struct Head {
    inner: Mutex<Inner>,
    channels: Channels,
    tilt_range: TiltRange,
    dead_zones: Vec<PanRange>,
    settle: Duration,
}

struct Inner {
    transport: Box<dyn Transport>,
    staged: Vec<(u16, u8)>,
    degraded: bool,
    shut_down: bool,
}

impl Inner {
    fn stage(&mut self, channel: u16, value: u8) {
        self.staged.push((channel, value));
    }

    /// Flushes the staged values to the device as one frame. The first
    /// transport error puts the head into degraded mode: commands are still
    /// accepted, but nothing further is written to the hardware.
    fn commit(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        if self.degraded {
            debug!("Head is degraded, dropping frame.");
            return;
        }

        for (channel, value) in staged {
            if let Err(e) = self.transport.set_channel(channel, value) {
                error!(
                    err = e.to_string(),
                    channel, "Error staging DMX channel, continuing without output."
                );
                self.degraded = true;
                return;
            }
        }
        if let Err(e) = self.transport.render() {
            error!(
                err = e.to_string(),
                "Error rendering DMX frame, continuing without output."
            );
            self.degraded = true;
        }
    }
}

impl Head {
    /// Creates a new head over the given transport.
    pub fn new(transport: Box<dyn Transport>, config: &config::Fixture) -> Head {
        info!(transport = transport.to_string(), "Fixture head ready.");
        Head {
            inner: Mutex::new(Inner {
                transport,
                staged: Vec::new(),
                degraded: false,
                shut_down: false,
            }),
            channels: config.channels(),
            tilt_range: config.tilt_range(),
            dead_zones: config.pan_dead_zones(),
            settle: SETTLE_DELAY,
        }
    }

    /// Shortens the settle delay so tests don't wait on the real motor.
    #[cfg(test)]
    pub(crate) fn with_settle(self, settle: Duration) -> Head {
        Head { settle, ..self }
    }

    /// Returns true if the head has stopped writing to the hardware.
    #[cfg(test)]
    pub(crate) fn is_degraded(&self) -> bool {
        self.inner.lock().degraded
    }

    /// Sets the lamp brightness. Zero cuts the lamp at the master relay;
    /// anything above zero powers the relay and sets the dimmer.
    pub fn set_lamp(&self, percent: f64) {
        let Some(mut inner) = self.live() else { return };
        if percent <= 0.0 {
            inner.stage(self.channels.master(), transform::MASTER_LAMP_OFF);
        } else {
            inner.stage(self.channels.master(), transform::MASTER_LAMP_ON);
            inner.stage(
                self.channels.brightness(),
                transform::brightness_percent_to_channel(percent),
            );
        }
        inner.commit();
    }

    /// Moves the head to a pan position, steering clear of the dead zones.
    /// The movement channel drops back to goto mode so a position command
    /// takes effect even while the head is rotating.
    pub fn set_pan_degrees(&self, degrees: f64) {
        let adjusted = transform::avoid_pan_dead_zones(degrees, &self.dead_zones);
        let Some(mut inner) = self.live() else { return };
        inner.stage(self.channels.pan(), transform::degrees_to_channel(adjusted));
        inner.stage(self.channels.pan_movement(), transform::PAN_MOVE_GOTO);
        inner.commit();
    }

    /// Aims the beam at a tilt angle within the safe travel.
    pub fn set_tilt_degrees(&self, degrees: f64) {
        let Some(mut inner) = self.live() else { return };
        inner.stage(
            self.channels.tilt(),
            transform::tilt_degrees_to_channel(degrees, &self.tilt_range),
        );
        inner.commit();
    }

    /// Sets the pan/tilt motor speed.
    pub fn set_speed_percent(&self, percent: f64) {
        let Some(mut inner) = self.live() else { return };
        inner.stage(
            self.channels.speed(),
            transform::percent_to_channel(percent),
        );
        inner.commit();
    }

    /// Sets the strobe rate. Zero stops strobing.
    pub fn set_strobe_percent(&self, percent: f64) {
        let Some(mut inner) = self.live() else { return };
        inner.stage(
            self.channels.strobe(),
            transform::percent_to_channel(percent),
        );
        inner.commit();
    }

    /// Starts continuous rotation in the given direction. The motor is
    /// stopped first and given a moment to spin down before the direction
    /// change goes out.
    pub fn set_rotation(&self, clockwise: bool, speed_percent: f64) {
        {
            let Some(mut inner) = self.live() else { return };
            inner.stage(self.channels.speed(), transform::percent_to_channel(0.0));
            inner.commit();
        }

        spin_sleep::sleep(self.settle);

        let Some(mut inner) = self.live() else { return };
        inner.stage(
            self.channels.pan_movement(),
            if clockwise {
                transform::PAN_MOVE_CLOCKWISE
            } else {
                transform::PAN_MOVE_COUNTER_CLOCKWISE
            },
        );
        inner.stage(
            self.channels.speed(),
            transform::percent_to_channel(speed_percent),
        );
        inner.commit();
    }

    /// Drives the head to its startup pose.
    pub fn startup_pose(&self) {
        let adjusted = transform::avoid_pan_dead_zones(STARTUP_PAN_DEGREES, &self.dead_zones);
        let Some(mut inner) = self.live() else { return };
        inner.stage(self.channels.master(), transform::MASTER_LAMP_OFF);
        inner.stage(self.channels.pan(), transform::degrees_to_channel(adjusted));
        inner.stage(
            self.channels.tilt(),
            transform::tilt_degrees_to_channel(STARTUP_TILT_DEGREES, &self.tilt_range),
        );
        inner.commit();
    }

    /// Runs the idle pattern: stop, dim the lamp, quiet the strobe, rest the
    /// beam, then resume a slow clockwise sweep.
    pub fn idle_pattern(&self) {
        {
            let Some(mut inner) = self.live() else { return };
            inner.stage(self.channels.speed(), transform::percent_to_channel(0.0));
            inner.stage(self.channels.master(), transform::MASTER_LAMP_ON);
            inner.stage(
                self.channels.brightness(),
                transform::brightness_percent_to_channel(IDLE_BRIGHTNESS_PERCENT),
            );
            inner.stage(self.channels.strobe(), transform::percent_to_channel(0.0));
            inner.stage(
                self.channels.tilt(),
                transform::tilt_degrees_to_channel(IDLE_TILT_DEGREES, &self.tilt_range),
            );
            inner.commit();
        }

        self.set_rotation(true, IDLE_SPEED_PERCENT);
    }

    /// Parks the head safely and disconnects: rotation stop, lamp off, coast,
    /// close. Safe to call more than once; later calls return immediately.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return;
            }
            inner.shut_down = true;
            info!("Parking fixture head.");
            inner.stage(self.channels.speed(), transform::percent_to_channel(0.0));
            inner.commit();
            inner.stage(self.channels.master(), transform::MASTER_LAMP_OFF);
            inner.commit();
        }

        // Let the motor coast before cutting the link.
        spin_sleep::sleep(self.settle);
        self.inner.lock().transport.close();
    }

    fn live(&self) -> Option<MutexGuard<'_, Inner>> {
        let inner = self.inner.lock();
        if inner.shut_down {
            debug!("Head is shut down, dropping command.");
            return None;
        }
        Some(inner)
    }
}
