//! slooper - two-button looper controller
//!
//! Turns taps, holds and encoder turns on a MIDI controller into transport
//! commands for an OSC-controlled looping engine.
//!
//! ## Subcommands
//!
//! - `run`: drive the engine from the active device profile
//! - `learn`: print raw MIDI events to build a profile
//! - `send` / `listen`: poke the engine or watch OSC traffic by hand
//! - `ports`, `profiles`, `init-config`: inspect and bootstrap setup

mod runtime;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rosc::OscMessage;
use slooper_midi::config::{self, SlooperConfig};
use slooper_midi::osc::{decode_datagram, parse_args};
use slooper_midi::{MidiConnection, OscEmitter};
use std::net::UdpSocket;
use std::path::PathBuf;

/// Largest datagram accepted by `listen`
const OSC_BUFFER: usize = 1536;

#[derive(Parser, Debug)]
#[command(name = "slooper", version, about = "MIDI gestures in, looper transport out")]
struct Cli {
    /// Config file (default: <config dir>/slooper/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the controller
    Run {
        /// Device profile to use instead of the configured one
        #[arg(long)]
        profile: Option<String>,
        /// Engine host override
        #[arg(long)]
        osc_host: Option<String>,
        /// Engine port override
        #[arg(long)]
        osc_port: Option<u16>,
    },
    /// Print raw MIDI events from a device
    Learn {
        /// Input port name substring (default: first port)
        #[arg(long, default_value = "")]
        port: String,
    },
    /// Send one OSC message to the engine
    Send {
        address: String,
        /// Integers, floats or strings
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print incoming OSC messages
    Listen {
        #[arg(long, default_value_t = 9001)]
        port: u16,
    },
    /// List MIDI ports
    Ports,
    /// List device profiles
    Profiles,
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug to see raw MIDI and OSC traffic
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    match cli.command {
        Command::Run {
            profile,
            osc_host,
            osc_port,
        } => {
            let mut config = config::load_config(&config_path);
            if let Some(host) = osc_host {
                config.osc.host = host;
            }
            if let Some(port) = osc_port {
                config.osc.port = port;
            }
            let name = profile.unwrap_or_else(|| config.profile.clone());
            let profile = config.profile(&name)?.clone();
            runtime::run(&config, &profile)?;
        }
        Command::Learn { port } => runtime::learn(&port)?,
        Command::Send { address, args } => {
            let config = config::load_config(&config_path);
            let emitter = OscEmitter::connect(&config.osc)?;
            let message = OscMessage {
                addr: address,
                args: parse_args(&args),
            };
            log::info!("[OSC OUT] {} {:?}", message.addr, message.args);
            emitter.send_message(message)?;
        }
        Command::Listen { port } => listen(port)?,
        Command::Ports => list_ports()?,
        Command::Profiles => {
            let config = config::load_config(&config_path);
            print_profiles(&config);
        }
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            config::save_config(&SlooperConfig::default(), &config_path)?;
            println!("wrote {}", config_path.display());
        }
    }

    Ok(())
}

fn listen(port: u16) -> Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port))
        .with_context(|| format!("Failed to bind UDP port {}", port))?;
    println!("Listening for OSC on port {} (Ctrl-C to stop)...", port);

    let mut buf = [0u8; OSC_BUFFER];
    loop {
        let (len, from) = socket.recv_from(&mut buf).context("Failed to receive")?;
        match decode_datagram(&buf[..len]) {
            Ok(messages) => {
                for msg in messages {
                    println!("{} {} {:?}", from, msg.addr, msg.args);
                }
            }
            Err(e) => log::warn!("OSC: {} from {}", e, from),
        }
    }
}

fn list_ports() -> Result<()> {
    println!("Input ports:");
    for name in MidiConnection::list_input_ports()? {
        println!("  {}", name);
    }
    println!("Output ports:");
    for name in MidiConnection::list_output_ports()? {
        println!("  {}", name);
    }
    Ok(())
}

fn print_profiles(config: &SlooperConfig) {
    for profile in &config.profiles {
        let active = if profile.name.eq_ignore_ascii_case(&config.profile) {
            " (active)"
        } else {
            ""
        };
        println!("{}{}  [port: {}]", profile.name, active, profile.port_match);
        for (index, slot) in profile.slots.iter().enumerate() {
            print!("  slot {}: button {}", index + 1, slot.button);
            if let Some(encoder) = slot.encoder {
                print!(", encoder {}", encoder);
            }
            if let Some(press) = slot.encoder_press {
                print!(", reset {}", press);
            }
            println!();
        }
        for (index, monitor) in profile.monitors.iter().enumerate() {
            println!("  monitor {}: button {}", index + 1, monitor.button);
        }
        if let Err(e) = profile.validate() {
            println!("  ! {}", e);
        }
    }
}
