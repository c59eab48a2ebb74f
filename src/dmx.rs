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
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::config;

pub mod mock;
mod ola;

/// The number of channels in a DMX universe.
pub const UNIVERSE_SIZE: u16 = 512;

/// Errors that can occur when talking to the DMX interface.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The interface could not be reached.
    #[error("unable to connect to the DMX interface: {0}")]
    Connect(String),
    /// A channel outside the universe was addressed.
    #[error("channel {0} is outside the DMX universe")]
    ChannelOutOfRange(u16),
    /// A frame could not be delivered.
    #[error("error sending DMX frame: {0}")]
    Send(String),
}

/// A transport carrying DMX frames to the fixture. Channels are staged one
/// at a time and delivered as a frame on render, matching how the hardware
/// consumes them.
pub trait Transport: fmt::Display + Send {
    /// Stages the given value on the given channel. Channels are 1-based,
    /// as printed on the fixture's DIP switch chart.
    fn set_channel(&mut self, channel: u16, value: u8) -> Result<(), TransportError>;

    /// Sends the staged frame to the interface.
    fn render(&mut self) -> Result<(), TransportError>;

    /// Closes the transport. Further renders are not expected to succeed.
    fn close(&mut self);
}

/// Gets a transport for the given configuration. Falls back to an inert
/// transport when olad isn't reachable so the daemon still serves clients
/// on a bench with no hardware attached.
pub fn get_transport(config: &config::Dmx) -> Box<dyn Transport> {
    match ola::Transport::connect(config) {
        Ok(transport) => Box::new(transport),
        Err(e) => {
            warn!(
                err = e.to_string(),
                "Unable to connect to OLA, continuing without DMX output."
            );
            Box::new(mock::Transport::new())
        }
    }
}
