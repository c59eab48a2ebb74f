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
use std::{fmt, net::TcpStream, thread, time::Duration};

use ola::{client::StreamingClientConfig, DmxBuffer, StreamingClient};
use tracing::debug;

use super::{TransportError, UNIVERSE_SIZE};
use crate::config;

/// How many times to try reaching olad before giving up.
const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A transport that streams frames to an OpenLighting daemon.
pub(super) struct Transport {
    client: StreamingClient<TcpStream>,
    buffer: DmxBuffer,
    universe: u32,
}

impl Transport {
    /// Connects to olad with the given configuration.
    pub(super) fn connect(config: &config::Dmx) -> Result<Transport, TransportError> {
        let client_config = StreamingClientConfig {
            server_port: config.ola_port(),
            ..Default::default()
        };

        let mut maybe_client = None;
        for i in 0..CONNECT_ATTEMPTS {
            // Don't sleep on the first iteration.
            if i > 0 {
                thread::sleep(CONNECT_RETRY_DELAY);
            }

            match ola::connect_with_config(client_config.clone()) {
                Ok(client) => {
                    maybe_client = Some(client);
                    break;
                }
                Err(e) => debug!(
                    err = e.to_string(),
                    "Error connecting to OLA, trying again."
                ),
            }
        }

        let client = maybe_client
            .ok_or_else(|| TransportError::Connect("no response from olad".to_string()))?;
        Ok(Transport {
            client,
            buffer: DmxBuffer::new(),
            universe: config.universe(),
        })
    }
}

impl super::Transport for Transport {
    fn set_channel(&mut self, channel: u16, value: u8) -> Result<(), TransportError> {
        if channel == 0 || channel > UNIVERSE_SIZE {
            return Err(TransportError::ChannelOutOfRange(channel));
        }
        self.buffer.set_channel((channel - 1) as usize, value);
        Ok(())
    }

    fn render(&mut self) -> Result<(), TransportError> {
        self.client
            .send_dmx(self.universe, &self.buffer)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn close(&mut self) {
        // Dropping the streaming client closes the socket; nothing to flush.
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OLA universe {}", self.universe)
    }
}
