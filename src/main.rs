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
mod arbiter;
mod cancel;
mod config;
mod dispatch;
mod dmx;
mod fixture;
mod idle;
mod liveness;
mod server;
mod testutil;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::{error, info};

// KillSignal=SIGINT so that systemctl stop takes the same path as Ctrl-C
// and the fixture gets parked.
const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=OSC beacon controller

[Service]
Type=simple
Restart=on-failure
KillSignal=SIGINT
EnvironmentFile=-/etc/default/lightkeeper
ExecStart=/usr/local/bin/lightkeeper start "$LIGHTKEEPER_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=lightkeeper.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An OSC controlled DMX beacon."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parses the given config and prints the resolved setup.
    Check {
        /// The path to the lightkeeper config.
        config_path: String,
    },
    /// Start will start the beacon daemon.
    Start {
        /// The path to the lightkeeper config.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config_path } => {
            let config = config::Config::deserialize(&PathBuf::from(config_path))?;
            let control = config.control();

            println!("Configuration OK.");
            println!("- listen: {}", config.server().listen()?);
            println!(
                "- DMX: universe {} via olad port {}",
                config.dmx().universe(),
                config.dmx().ola_port()
            );
            println!("- exclusive control: {}", control.exclusive());
            println!(
                "- liveness: window {:?}, sweep every {:?}",
                control.liveness_window()?,
                control.sweep_period()?
            );
            println!(
                "- idle pattern: enabled={}, grace {:?}, window {:?}",
                control.idle_enabled(),
                control.idle_grace()?,
                control.idle_window()?
            );
        }
        Commands::Start { config_path } => {
            let config = config::Config::deserialize(&PathBuf::from(config_path))?;
            start(config).await?;
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}

/// Runs the beacon daemon until interrupted.
async fn start(config: config::Config) -> Result<(), Box<dyn Error>> {
    let control = config.control();

    let head = Arc::new(fixture::Head::new(
        dmx::get_transport(config.dmx()),
        config.fixture(),
    ));
    head.startup_pose();

    let liveness = Arc::new(liveness::Tracker::new(control.liveness_window()?));
    let arbiter = Arc::new(arbiter::Arbiter::new(
        liveness.clone(),
        control.exclusive(),
    ));
    let idle_monitor = Arc::new(idle::Monitor::new(
        head.clone(),
        liveness.clone(),
        arbiter.clone(),
        control.idle_window()?,
        control.idle_enabled(),
    ));

    let cancel = cancel::CancelHandle::new();
    let sweeper = liveness::start_sweep(liveness.clone(), control.sweep_period()?, cancel.clone());
    let idler = idle::start(
        idle_monitor.clone(),
        control.idle_grace()?,
        control.idle_tick()?,
        cancel.clone(),
    );

    let dispatcher = Arc::new(dispatch::Dispatcher::new(
        config.server(),
        head.clone(),
        liveness,
        arbiter,
        idle_monitor,
    )?);
    let server = server::serve(config.server().listen()?, dispatcher).await?;

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down.");

    // Stop taking commands before parking the fixture so nothing undoes
    // the parked pose.
    server.abort();
    cancel.cancel();
    if sweeper.join().is_err() {
        error!("Error joining the liveness sweeper.");
    }
    if idler.join().is_err() {
        error!("Error joining the idle monitor.");
    }
    head.shutdown();

    Ok(())
}
