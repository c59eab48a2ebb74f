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
use std::{io, net::SocketAddr, sync::Arc};

use rosc::{OscMessage, OscPacket, OscType};
use tokio::{
    net::UdpSocket,
    select,
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;

/// Binds the OSC listener and starts serving. The returned handle is the
/// whole server; aborting it stops the listener.
pub async fn serve(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> io::Result<JoinHandle<()>> {
    let socket = UdpSocket::bind(addr).await?;
    info!(addr = addr.to_string(), "OSC server started.");
    Ok(tokio::spawn(run(socket, dispatcher)))
}

/// Serves OSC traffic on an already bound socket.
pub(crate) async fn run(socket: UdpSocket, dispatcher: Arc<Dispatcher>) {
    let (rx_sender, mut rx_receiver) = mpsc::channel::<(OscPacket, SocketAddr)>(10);
    let (tx_sender, tx_receiver) = mpsc::channel::<(OscPacket, SocketAddr)>(10);

    tokio::spawn(handle_udp_comms(socket, rx_sender, tx_receiver));

    while let Some((packet, source)) = rx_receiver.recv().await {
        handle_packet(&dispatcher, packet, source, &tx_sender).await;
    }
}

/// Handles UDP sending/receiving. Replies go back to the source of the
/// message that prompted them, nowhere else.
async fn handle_udp_comms(
    socket: UdpSocket,
    rx_sender: Sender<(OscPacket, SocketAddr)>,
    mut tx_receiver: Receiver<(OscPacket, SocketAddr)>,
) {
    let mut buf = [0u8; rosc::decoder::MTU];

    // Handle all UDP communication in this loop. We want to be pretty resilient here,
    // as we don't want the program to fail if we run into spurious errors.
    loop {
        select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((size, source)) => match rosc::decoder::decode_udp(&buf[..size]) {
                        Ok((_, packet)) => {
                            if let Err(e) = rx_sender.send((packet, source)).await {
                                error!(err = e.to_string(), "Error sending packet on channel.");
                            }
                        }
                        Err(e) => warn!(
                            err = e.to_string(),
                            source = source.to_string(),
                            "Dropping undecodable OSC datagram."
                        ),
                    },
                    Err(e) => error!(err = e.to_string(), "Error receiving UDP."),
                }
            }
            reply = tx_receiver.recv() => {
                if let Some((packet, dest)) = reply {
                    match rosc::encoder::encode(&packet) {
                        Ok(bytes) => {
                            // Notifications are best effort.
                            if let Err(e) = socket.send_to(&bytes, dest).await {
                                error!(err = e.to_string(), "Error sending UDP data to client.");
                            }
                        }
                        Err(e) => error!(err = e.to_string(), "Error encoding OSC message."),
                    };
                }
            }
        };
    }
}

/// Handles one inbound packet, flattening bundles. Messages run on the
/// blocking pool: fixture commands can sleep through a motor settle delay,
/// and that shouldn't stall the UDP loop's reactor.
async fn handle_packet(
    dispatcher: &Arc<Dispatcher>,
    packet: OscPacket,
    source: SocketAddr,
    replies: &Sender<(OscPacket, SocketAddr)>,
) {
    match packet {
        OscPacket::Message(msg) => {
            let dispatcher = dispatcher.clone();
            match tokio::task::spawn_blocking(move || dispatcher.handle(msg, source)).await {
                Ok(Some(notification)) => {
                    let reply = OscPacket::Message(OscMessage {
                        addr: notification.addr,
                        args: vec![OscType::Int(notification.value)],
                    });
                    if let Err(e) = replies.send((reply, source)).await {
                        error!(err = e.to_string(), "Error sending reply on channel.");
                    }
                }
                Ok(None) => {}
                Err(e) => error!(err = e.to_string(), "Error running message handler."),
            }
        }
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                Box::pin(handle_packet(dispatcher, packet, source, replies)).await;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, sync::Arc, time::Duration};

    use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
    use tokio::{net::UdpSocket, time::timeout};

    use crate::{
        arbiter::Arbiter,
        config,
        dispatch::Dispatcher,
        dmx::mock,
        fixture::{transform, Head},
        idle,
        liveness::Tracker,
        testutil::eventually,
    };

    struct Harness {
        dispatcher: Arc<Dispatcher>,
        liveness: Arc<Tracker>,
        transport: mock::Transport,
    }

    fn harness() -> Result<Harness, Box<dyn Error>> {
        let transport = mock::Transport::new();
        let head = Arc::new(
            Head::new(Box::new(transport.clone()), &config::Fixture::default())
                .with_settle(Duration::ZERO),
        );
        let liveness = Arc::new(Tracker::new(Duration::from_secs(61)));
        let arbiter = Arc::new(Arbiter::new(liveness.clone(), true));
        let idle = Arc::new(idle::Monitor::new(
            head.clone(),
            liveness.clone(),
            arbiter.clone(),
            Duration::from_secs(180),
            true,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            &config::Server::default(),
            head,
            liveness.clone(),
            arbiter,
            idle,
        )?);
        Ok(Harness {
            dispatcher,
            liveness,
            transport,
        })
    }

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_server_end_to_end() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;

        let server_socket = UdpSocket::bind("127.0.0.1:0").await?;
        let server_addr = server_socket.local_addr()?;
        let server = tokio::spawn(super::run(server_socket, harness.dispatcher.clone()));

        let panel = UdpSocket::bind("127.0.0.1:0").await?;

        // Ask for control and wait for the grant notification.
        let encoded = rosc::encoder::encode(&message("/control/toggle", vec![OscType::Int(1)]))?;
        panel.send_to(&encoded, server_addr).await?;

        let mut buf = [0u8; 1024];
        let (size, _) = timeout(Duration::from_secs(3), panel.recv_from(&mut buf)).await??;
        let (_, reply) = rosc::decoder::decode_udp(&buf[..size])?;
        assert_eq!(
            reply,
            message("/control/toggle", vec![OscType::Int(1)]),
            "Expected a control grant notification"
        );

        // Garbage on the wire must not take the listener down.
        panel.send_to(b"\x00\x01garbage", server_addr).await?;

        // A fader move lands on the fixture.
        let encoded =
            rosc::encoder::encode(&message("/staticLight/tilt", vec![OscType::Float(30.0)]))?;
        panel.send_to(&encoded, server_addr).await?;
        {
            let transport = harness.transport.clone();
            let want = transform::tilt_degrees_to_channel(30.0, &config::TiltRange::default());
            eventually(
                move || transport.channel(10) == want,
                "Tilt command never reached the fixture",
            );
        }

        // Bundles are flattened and handled message by message.
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                message("/staticLight/speed", vec![OscType::Int(100)]),
                message("/staticLight/strobe", vec![OscType::Int(50)]),
            ],
        });
        let encoded = rosc::encoder::encode(&bundle)?;
        panel.send_to(&encoded, server_addr).await?;
        {
            let transport = harness.transport.clone();
            eventually(
                move || transport.channel(15) == 255 && transport.channel(7) == 128,
                "Bundled commands never reached the fixture",
            );
        }

        // Pings land in the liveness tracker.
        let encoded = rosc::encoder::encode(&message("/ping", vec![]))?;
        panel.send_to(&encoded, server_addr).await?;
        {
            let liveness = harness.liveness.clone();
            eventually(
                move || liveness.tracked() == 1,
                "Ping never reached the liveness tracker",
            );
        }

        server.abort();
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replies_only_reach_the_requesting_panel() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;

        let server_socket = UdpSocket::bind("127.0.0.1:0").await?;
        let server_addr = server_socket.local_addr()?;
        let server = tokio::spawn(super::run(server_socket, harness.dispatcher.clone()));

        // Identity is the source IP, so the second panel needs its own
        // loopback address to count as a different client.
        let panel_a = UdpSocket::bind("127.0.0.1:0").await?;
        let panel_b = UdpSocket::bind("127.0.0.2:0").await?;

        let toggle_on = rosc::encoder::encode(&message("/control/toggle", vec![OscType::Int(1)]))?;

        // Panel A takes control.
        panel_a.send_to(&toggle_on, server_addr).await?;
        let mut buf = [0u8; 1024];
        let (size, _) = timeout(Duration::from_secs(3), panel_a.recv_from(&mut buf)).await??;
        let (_, reply) = rosc::decoder::decode_udp(&buf[..size])?;
        assert_eq!(reply, message("/control/toggle", vec![OscType::Int(1)]));

        // Panel A pings so it counts as live; otherwise panel B would be
        // allowed to take over from a vanished holder.
        let ping = rosc::encoder::encode(&message("/ping", vec![]))?;
        panel_a.send_to(&ping, server_addr).await?;
        {
            let liveness = harness.liveness.clone();
            eventually(
                move || liveness.tracked() == 1,
                "Ping never reached the liveness tracker",
            );
        }

        // Panel B is denied, and the denial lands on panel B alone.
        panel_b.send_to(&toggle_on, server_addr).await?;
        let (size, _) = timeout(Duration::from_secs(3), panel_b.recv_from(&mut buf)).await??;
        let (_, reply) = rosc::decoder::decode_udp(&buf[..size])?;
        assert_eq!(reply, message("/control/toggle", vec![OscType::Int(0)]));

        assert!(
            timeout(Duration::from_millis(200), panel_a.recv_from(&mut buf))
                .await
                .is_err(),
            "Panel A received a notification meant for panel B"
        );

        server.abort();
        Ok(())
    }
}
