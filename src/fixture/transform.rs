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
//! Pure mappings from domain units (degrees, percentages) to DMX channel
//! values. Every function here is total: out-of-domain input is clamped or
//! wrapped, never rejected, because the fixture has no way to report a bad
//! command except by moving somewhere it shouldn't.

use crate::config::{PanRange, TiltRange};

/// Master control values. The lamp relay sits on its own channel; the
/// brightness channel does nothing while the master is off.
pub const MASTER_LAMP_OFF: u8 = 100;
pub const MASTER_LAMP_ON: u8 = 255;

/// Pan movement modes.
pub const PAN_MOVE_GOTO: u8 = 0;
pub const PAN_MOVE_CLOCKWISE: u8 = 128;
pub const PAN_MOVE_COUNTER_CLOCKWISE: u8 = 250;

/// The lowest brightness value the lamp stays visibly lit at.
pub const BRIGHTNESS_FLOOR: u8 = 10;

/// The tilt motor's full travel. 0 degrees is straight up.
pub const TILT_DEVICE_LOW_DEGREES: f64 = -120.0;
pub const TILT_DEVICE_HIGH_DEGREES: f64 = 120.0;

/// How far past a dead zone boundary an avoided pan target lands.
pub const DEAD_ZONE_MARGIN_DEGREES: f64 = 1.0;

/// Maps pan degrees onto the channel range, wrapping modulo 360 first.
pub fn degrees_to_channel(degrees: f64) -> u8 {
    (wrap_degrees(degrees) / 360.0 * 255.0).round() as u8
}

/// Maps a percentage onto the channel range, saturating at either end.
pub fn percent_to_channel(percent: f64) -> u8 {
    (percent.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8
}

/// Maps a brightness percentage onto the channel range, holding the result
/// at or above the visible floor. Turning the lamp fully off is the master
/// channel's job, not this one's.
pub fn brightness_percent_to_channel(percent: f64) -> u8 {
    percent_to_channel(percent).max(BRIGHTNESS_FLOOR)
}

/// Maps tilt degrees onto the channel range. The target is clamped into the
/// configured safe travel before mapping the motor's full span, so no input
/// can aim the beam outside the safe arc.
pub fn tilt_degrees_to_channel(degrees: f64, range: &TiltRange) -> u8 {
    let clamped = degrees
        .max(range.low())
        .min(range.high())
        .max(TILT_DEVICE_LOW_DEGREES)
        .min(TILT_DEVICE_HIGH_DEGREES);
    let span = TILT_DEVICE_HIGH_DEGREES - TILT_DEVICE_LOW_DEGREES;
    ((clamped - TILT_DEVICE_LOW_DEGREES) / span * 255.0).round() as u8
}

/// Moves a pan target out of the configured dead zones. A target inside a
/// zone is nudged to the nearer boundary plus the safety margin, preferring
/// the upper boundary when equidistant. The nudge keeps stepping in the same
/// direction over any further zone it lands in, wrapping off either end of
/// travel, so the result is outside every configured zone.
pub fn avoid_pan_dead_zones(degrees: f64, zones: &[PanRange]) -> f64 {
    let degrees = wrap_degrees(degrees);
    let Some(zone) = zones.iter().find(|zone| zone.contains(degrees)) else {
        return degrees;
    };

    let to_low = degrees - zone.low();
    let to_high = zone.high() - degrees;
    let upward = to_high <= to_low;
    let mut nudged = step_out(zone, upward);

    // Each pass steps out of one zone; one lap of the circle crosses each
    // zone at most once. Running out of passes means the zones cover the
    // whole travel and there's nowhere to land.
    for _ in 0..=zones.len() {
        nudged = wrap_degrees(nudged);
        match zones.iter().find(|zone| zone.contains(nudged)) {
            Some(zone) => nudged = step_out(zone, upward),
            None => return nudged,
        }
    }
    degrees
}

fn step_out(zone: &PanRange, upward: bool) -> f64 {
    if upward {
        zone.high() + DEAD_ZONE_MARGIN_DEGREES
    } else {
        zone.low() - DEAD_ZONE_MARGIN_DEGREES
    }
}

fn wrap_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}
