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
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::debug;

use super::{TransportError, UNIVERSE_SIZE};

/// A frame of channel values.
type Frame = [u8; UNIVERSE_SIZE as usize];

/// A mock transport. Frames land in a shadow buffer instead of hardware.
/// Clones share state, so a test can keep one half and hand the other to
/// the head under test.
#[derive(Clone)]
pub struct Transport {
    staged: Arc<Mutex<Frame>>,
    rendered: Arc<Mutex<Frame>>,
    renders: Arc<AtomicUsize>,
    fail_renders: Arc<AtomicBool>,
}

impl Transport {
    /// Creates a new mock transport.
    pub fn new() -> Transport {
        Transport {
            staged: Arc::new(Mutex::new([0; UNIVERSE_SIZE as usize])),
            rendered: Arc::new(Mutex::new([0; UNIVERSE_SIZE as usize])),
            renders: Arc::new(AtomicUsize::new(0)),
            fail_renders: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Gets the last rendered value of the given 1-based channel.
    #[cfg(test)]
    pub fn channel(&self, channel: u16) -> u8 {
        self.rendered.lock()[(channel - 1) as usize]
    }

    /// Gets the number of frames rendered so far.
    #[cfg(test)]
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::Relaxed)
    }

    /// Makes every subsequent render fail, simulating a dead interface.
    #[cfg(test)]
    pub fn fail_renders(&self, fail: bool) {
        self.fail_renders.store(fail, Ordering::Relaxed);
    }
}

impl Default for Transport {
    fn default() -> Transport {
        Transport::new()
    }
}

impl super::Transport for Transport {
    fn set_channel(&mut self, channel: u16, value: u8) -> Result<(), TransportError> {
        if channel == 0 || channel > UNIVERSE_SIZE {
            return Err(TransportError::ChannelOutOfRange(channel));
        }
        self.staged.lock()[(channel - 1) as usize] = value;
        Ok(())
    }

    fn render(&mut self) -> Result<(), TransportError> {
        if self.fail_renders.load(Ordering::Relaxed) {
            return Err(TransportError::Send("mock render failure".to_string()));
        }
        *self.rendered.lock() = *self.staged.lock();
        self.renders.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) {
        debug!("Mock DMX transport closed.");
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DMX (Mock)")
    }
}

#[cfg(test)]
mod test {
    use super::super::Transport as _;
    use super::*;

    #[test]
    fn test_mock_transport_shadow() -> Result<(), TransportError> {
        let mut transport = Transport::new();
        let observer = transport.clone();

        transport.set_channel(4, 255)?;
        transport.set_channel(8, 128)?;

        // Nothing lands until a render.
        assert_eq!(observer.channel(4), 0);
        assert_eq!(observer.renders(), 0);

        transport.render()?;
        assert_eq!(observer.channel(4), 255);
        assert_eq!(observer.channel(8), 128);
        assert_eq!(observer.renders(), 1);
        Ok(())
    }

    #[test]
    fn test_mock_transport_channel_range() {
        let mut transport = Transport::new();
        assert!(transport.set_channel(0, 1).is_err());
        assert!(transport.set_channel(513, 1).is_err());
        assert!(transport.set_channel(512, 1).is_ok());
        assert!(transport.set_channel(1, 1).is_ok());
    }

    #[test]
    fn test_mock_transport_failure() {
        let mut transport = Transport::new();
        transport.fail_renders(true);
        assert!(transport.render().is_err());
        assert_eq!(transport.renders(), 0);

        transport.fail_renders(false);
        assert!(transport.render().is_ok());
        assert_eq!(transport.renders(), 1);
    }
}
