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
use std::{error::Error, net::SocketAddr, sync::Arc};

use rosc::{
    address::{Matcher, OscAddress},
    OscMessage, OscType,
};
use tracing::{debug, info, warn};

use crate::{
    arbiter::{Arbiter, Decision},
    config,
    fixture::Head,
    idle,
    liveness::Tracker,
};

/// Routes inbound OSC messages to the fixture, the liveness tracker, the
/// access arbiter, or the idle monitor. Anything that doesn't route cleanly
/// is logged and dropped; a touch panel should never be able to fault the
/// daemon.
pub struct Dispatcher {
    head: Arc<Head>,
    liveness: Arc<Tracker>,
    arbiter: Arc<Arbiter>,
    idle: Arc<idle::Monitor>,
    routes: Routes,
}

/// The OSC addresses the dispatcher understands. Reply notifications reuse
/// the inbound address strings, which is how TouchOSC keeps its widgets in
/// sync with the server.
struct Routes {
    /// Pan position in degrees.
    pan: Matcher,
    /// Tilt position in degrees.
    tilt: Matcher,
    /// Rotation speed as a percentage.
    speed: Matcher,
    /// Strobe rate as a percentage.
    strobe: Matcher,
    /// Lamp power and brightness. Several panel layouts exist, so this is
    /// a list.
    lamp: Vec<Matcher>,
    /// Control request and release.
    toggle: Matcher,
    /// Liveness signal.
    ping: Matcher,
    /// Admin toggle for the idle pattern.
    idle_enable: Matcher,
    /// TouchOSC touch events: one "/z" suffixed address per fader. Matched
    /// so they don't show up as unrecognized, then ignored.
    touch: Vec<Matcher>,
    /// Reply address for control toggle notifications.
    toggle_reply: String,
    /// Reply address for idle enable notifications.
    idle_enable_reply: String,
}

/// A best-effort status notification for the client a message came from.
#[derive(Debug, PartialEq)]
pub struct Notification {
    pub addr: String,
    pub value: i32,
}

impl Dispatcher {
    pub fn new(
        config: &config::Server,
        head: Arc<Head>,
        liveness: Arc<Tracker>,
        arbiter: Arc<Arbiter>,
        idle: Arc<idle::Monitor>,
    ) -> Result<Dispatcher, Box<dyn Error>> {
        let mut touch = Vec::new();
        for addr in [config.pan(), config.tilt(), config.speed(), config.strobe()]
            .iter()
            .chain(config.lamp().iter())
        {
            touch.push(Matcher::new(format!("{}/z", addr).as_str())?);
        }

        Ok(Dispatcher {
            head,
            liveness,
            arbiter,
            idle,
            routes: Routes {
                pan: Matcher::new(config.pan().as_str())?,
                tilt: Matcher::new(config.tilt().as_str())?,
                speed: Matcher::new(config.speed().as_str())?,
                strobe: Matcher::new(config.strobe().as_str())?,
                lamp: config
                    .lamp()
                    .iter()
                    .map(|addr| Matcher::new(addr.as_str()))
                    .collect::<Result<Vec<Matcher>, rosc::OscError>>()?,
                toggle: Matcher::new(config.toggle().as_str())?,
                ping: Matcher::new(config.ping().as_str())?,
                idle_enable: Matcher::new(config.idle_enable().as_str())?,
                touch,
                toggle_reply: config.toggle(),
                idle_enable_reply: config.idle_enable(),
            },
        })
    }

    /// Handles a single OSC message from the given source, returning a
    /// notification to send back to that source if the message warrants one.
    pub fn handle(&self, msg: OscMessage, source: SocketAddr) -> Option<Notification> {
        let address = match OscAddress::new(msg.addr.clone()) {
            Ok(address) => address,
            Err(e) => {
                warn!(
                    err = e.to_string(),
                    addr = msg.addr,
                    "Dropping message with an invalid OSC address."
                );
                return None;
            }
        };
        // TouchOSC relaunches move the source port around, so a client is
        // identified by address alone.
        let client = source.ip();
        let routes = &self.routes;

        if routes.ping.match_address(&address) {
            self.liveness.record(client);
            return None;
        }
        if routes.toggle.match_address(&address) {
            let wants = integer_argument(&msg)? != 0;
            // The reply reflects this transition's outcome, not a second
            // read that another request could have changed in between.
            let decision = self.arbiter.request_control(client, wants);
            return Some(Notification {
                addr: routes.toggle_reply.clone(),
                value: matches!(decision, Decision::Granted) as i32,
            });
        }
        if routes.idle_enable.match_address(&address) {
            let enabled = self.idle.set_enabled(integer_argument(&msg)? != 0);
            return Some(Notification {
                addr: routes.idle_enable_reply.clone(),
                value: enabled as i32,
            });
        }
        if routes.touch.iter().any(|m| m.match_address(&address)) {
            debug!(addr = msg.addr, "Ignoring touch event.");
            return None;
        }

        // Everything past this point moves the fixture.
        if !self.arbiter.permits(client) {
            info!(
                client = client.to_string(),
                addr = msg.addr,
                "Dropping command from a client that doesn't hold control."
            );
            return None;
        }

        if routes.pan.match_address(&address) {
            self.head.set_pan_degrees(integer_argument(&msg)? as f64);
        } else if routes.tilt.match_address(&address) {
            self.head.set_tilt_degrees(integer_argument(&msg)? as f64);
        } else if routes.speed.match_address(&address) {
            self.head.set_speed_percent(integer_argument(&msg)? as f64);
        } else if routes.strobe.match_address(&address) {
            self.head.set_strobe_percent(integer_argument(&msg)? as f64);
        } else if routes.lamp.iter().any(|m| m.match_address(&address)) {
            self.head.set_lamp(integer_argument(&msg)? as f64);
        } else {
            warn!(addr = msg.addr, "Unrecognized OSC address.");
        }
        None
    }
}

/// Pulls the first argument out of a message as an integer. Touch panels
/// send faders as floats, so those are truncated rather than rejected.
/// Logs and returns None for anything else.
fn integer_argument(msg: &OscMessage) -> Option<i64> {
    let value = match msg.args.first() {
        Some(OscType::Int(value)) => *value as i64,
        Some(OscType::Long(value)) => *value,
        Some(OscType::Float(value)) => *value as i64,
        Some(OscType::Double(value)) => *value as i64,
        Some(other) => {
            warn!(
                addr = msg.addr,
                arg = format!("{:?}", other),
                "Dropping message with a non-numeric argument."
            );
            return None;
        }
        None => {
            warn!(addr = msg.addr, "Dropping message with no arguments.");
            return None;
        }
    };
    Some(value)
}

#[cfg(test)]
mod test {
    use std::{error::Error, net::SocketAddr, sync::Arc, time::Duration};

    use rosc::{OscMessage, OscType};

    use super::{Dispatcher, Notification};
    use crate::{
        arbiter::Arbiter,
        config,
        dmx::mock,
        fixture::{transform, Head},
        idle,
        liveness::Tracker,
    };

    struct Harness {
        dispatcher: Dispatcher,
        liveness: Arc<Tracker>,
        arbiter: Arc<Arbiter>,
        idle: Arc<idle::Monitor>,
        transport: mock::Transport,
    }

    fn harness() -> Result<Harness, Box<dyn Error>> {
        let fixture: config::Fixture = serde_yml::from_str(
            "pan_dead_zones:
  - low: 50.0
    high: 70.0
",
        )?;
        let transport = mock::Transport::new();
        let head = Arc::new(
            Head::new(Box::new(transport.clone()), &fixture).with_settle(Duration::ZERO),
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
        let dispatcher = Dispatcher::new(
            &config::Server::default(),
            head,
            liveness.clone(),
            arbiter.clone(),
            idle.clone(),
        )?;
        Ok(Harness {
            dispatcher,
            liveness,
            arbiter,
            idle,
            transport,
        })
    }

    fn source(addr: &str) -> SocketAddr {
        addr.parse().expect("bad test address")
    }

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn test_control_toggle_scenario() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let dispatcher = &harness.dispatcher;
        let panel_a = source("10.0.0.5:9000");
        let panel_b = source("10.0.0.9:9000");

        // Panel A requests control and gets it.
        let reply = dispatcher.handle(
            message("/control/toggle", vec![OscType::Int(1)]),
            panel_a,
        );
        assert_eq!(
            reply,
            Some(Notification {
                addr: "/control/toggle".to_string(),
                value: 1,
            })
        );
        assert_eq!(harness.arbiter.holder(), Some(panel_a.ip()));

        // Panel A is live, so panel B is turned away.
        harness.liveness.record(panel_a.ip());
        let reply = dispatcher.handle(
            message("/control/toggle", vec![OscType::Int(1)]),
            panel_b,
        );
        assert_eq!(
            reply,
            Some(Notification {
                addr: "/control/toggle".to_string(),
                value: 0,
            })
        );

        // Panel B's movement commands go nowhere.
        dispatcher.handle(
            message("/staticLight/tilt", vec![OscType::Int(30)]),
            panel_b,
        );
        assert_eq!(harness.transport.renders(), 0);

        // Panel A's do.
        dispatcher.handle(
            message("/staticLight/tilt", vec![OscType::Int(30)]),
            panel_a,
        );
        assert_eq!(harness.transport.renders(), 1);

        // Panel A steps away; panel B asks again and takes over.
        let reply = dispatcher.handle(
            message("/control/toggle", vec![OscType::Int(0)]),
            panel_a,
        );
        assert_eq!(
            reply,
            Some(Notification {
                addr: "/control/toggle".to_string(),
                value: 0,
            })
        );
        let reply = dispatcher.handle(
            message("/control/toggle", vec![OscType::Int(1)]),
            panel_b,
        );
        assert_eq!(
            reply,
            Some(Notification {
                addr: "/control/toggle".to_string(),
                value: 1,
            })
        );
        assert_eq!(harness.arbiter.holder(), Some(panel_b.ip()));
        Ok(())
    }

    #[test]
    fn test_movement_routes_reach_the_fixture() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let dispatcher = &harness.dispatcher;
        let panel = source("10.0.0.5:9000");

        // Nobody holds control, so commands flow freely. The pan target sits
        // inside the configured dead zone and lands just past it.
        dispatcher.handle(message("/staticLight/pan", vec![OscType::Int(65)]), panel);
        assert_eq!(
            harness.transport.channel(8),
            transform::degrees_to_channel(71.0)
        );
        assert_eq!(harness.transport.channel(12), transform::PAN_MOVE_GOTO);

        dispatcher.handle(message("/staticLight/tilt", vec![OscType::Int(0)]), panel);
        assert_eq!(harness.transport.channel(10), 128);

        dispatcher.handle(
            message("/staticLight/speed", vec![OscType::Int(100)]),
            panel,
        );
        assert_eq!(harness.transport.channel(15), 255);

        dispatcher.handle(
            message("/staticLight/strobe", vec![OscType::Int(0)]),
            panel,
        );
        assert_eq!(harness.transport.channel(7), 0);

        // Both lamp addresses drive the same channels.
        dispatcher.handle(
            message("/staticLight/lightControl", vec![OscType::Int(100)]),
            panel,
        );
        assert_eq!(harness.transport.channel(4), transform::MASTER_LAMP_ON);
        assert_eq!(harness.transport.channel(6), 255);

        dispatcher.handle(
            message("/staticLight/brightness", vec![OscType::Int(0)]),
            panel,
        );
        assert_eq!(harness.transport.channel(4), transform::MASTER_LAMP_OFF);
        Ok(())
    }

    #[test]
    fn test_float_arguments_truncate() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let panel = source("10.0.0.5:9000");

        // TouchOSC faders send floats.
        harness.dispatcher.handle(
            message("/staticLight/tilt", vec![OscType::Float(12.9)]),
            panel,
        );
        assert_eq!(
            harness.transport.channel(10),
            transform::tilt_degrees_to_channel(12.0, &config::TiltRange::default())
        );
        Ok(())
    }

    #[test]
    fn test_malformed_messages_dropped() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let panel = source("10.0.0.5:9000");

        harness
            .dispatcher
            .handle(message("/staticLight/tilt", vec![]), panel);
        harness.dispatcher.handle(
            message(
                "/staticLight/tilt",
                vec![OscType::String("sideways".to_string())],
            ),
            panel,
        );
        harness
            .dispatcher
            .handle(message("/control/toggle", vec![]), panel);
        harness
            .dispatcher
            .handle(message("/somewhere/else", vec![OscType::Int(1)]), panel);
        harness
            .dispatcher
            .handle(message("no-leading-slash", vec![OscType::Int(1)]), panel);

        assert_eq!(harness.transport.renders(), 0);
        assert_eq!(harness.arbiter.holder(), None);
        Ok(())
    }

    #[test]
    fn test_touch_events_ignored() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let panel = source("10.0.0.5:9000");

        for addr in [
            "/staticLight/pan/z",
            "/staticLight/tilt/z",
            "/staticLight/brightness/z",
        ] {
            harness
                .dispatcher
                .handle(message(addr, vec![OscType::Int(1)]), panel);
        }
        assert_eq!(harness.transport.renders(), 0);
        Ok(())
    }

    #[test]
    fn test_ping_records_liveness() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let panel = source("10.0.0.5:9000");

        assert!(!harness.liveness.is_live(panel.ip()));
        harness.dispatcher.handle(message("/ping", vec![]), panel);
        assert!(harness.liveness.is_live(panel.ip()));
        Ok(())
    }

    #[test]
    fn test_idle_enable_toggle() -> Result<(), Box<dyn Error>> {
        let harness = harness()?;
        let panel = source("10.0.0.5:9000");

        let reply = harness.dispatcher.handle(
            message("/admin/idleEnable", vec![OscType::Int(0)]),
            panel,
        );
        assert_eq!(
            reply,
            Some(Notification {
                addr: "/admin/idleEnable".to_string(),
                value: 0,
            })
        );
        assert!(!harness.idle.is_enabled());

        let reply = harness.dispatcher.handle(
            message("/admin/idleEnable", vec![OscType::Float(1.0)]),
            panel,
        );
        assert_eq!(
            reply,
            Some(Notification {
                addr: "/admin/idleEnable".to_string(),
                value: 1,
            })
        );
        assert!(harness.idle.is_enabled());
        Ok(())
    }
}
