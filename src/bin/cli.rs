//! osclink CLI
//!
//! Command-line wrapper around the control layer, intended for agents and
//! scripts driving the workstation via `exec`-style tooling. All results
//! are JSON on stdout; exit code 0 on success, 1 on failure.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use osclink::control::addresses;
use osclink::{CalibrationRequest, Config, Controller, OscArg, VerifiedWrite};

/// osclink CLI
#[derive(Parser, Debug)]
#[command(name = "osclink-cli")]
#[command(about = "Control a running audio workstation over OSC/UDP")]
#[command(version)]
struct Args {
    /// Peer host/IP (overrides OSCLINK_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Peer command port (overrides OSCLINK_COMMAND_PORT)
    #[arg(long)]
    command_port: Option<u16>,

    /// Local response port (overrides OSCLINK_RESPONSE_PORT)
    #[arg(long)]
    response_port: Option<u16>,

    /// Round-trip timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fire-and-forget send: address plus raw arguments
    Send {
        /// OSC address pattern, e.g. /live/song/set/tempo
        address: String,

        /// Arguments; ints and floats are detected, everything else is a
        /// string. Use 1.0 (not 1) to force a float.
        args: Vec<String>,
    },

    /// Send and wait for a response
    Get {
        /// OSC address pattern
        address: String,

        /// Arguments (same coercion as `send`)
        args: Vec<String>,
    },

    /// Read one device parameter (value, display string, and range)
    ParamGet {
        track: i32,
        device: i32,
        param: usize,
    },

    /// Set one device parameter to a normalized value, verified by readback
    ParamSet {
        track: i32,
        device: i32,
        param: usize,

        /// Normalized value in [0, 1]
        value: f32,

        /// Verified-write attempts
        #[arg(long, default_value = "3")]
        retries: u32,
    },

    /// Converge a parameter onto a target display value (Hz, dB, %, ratio)
    Calibrate {
        track: i32,
        device: i32,
        param: usize,

        /// Target in display units, e.g. 500 for 500 Hz
        target: f64,

        /// Iteration cap
        #[arg(long, default_value = "5")]
        max_iterations: u32,

        /// Tolerance as % of the target
        #[arg(long, default_value = "5.0")]
        tolerance_pct: f64,
    },

    /// Sweep a parameter and persist its learned curve
    Sweep {
        track: i32,
        device: i32,
        param: usize,
    },

    /// Check connectivity to the peer
    Probe,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,osclink=info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    match run(args) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).expect("serializable result"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "success": false, "message": e.to_string() }))
                    .expect("serializable error")
            );
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> osclink::Result<serde_json::Value> {
    let mut config = Config::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.command_port {
        config.command_port = port;
    }
    if let Some(port) = args.response_port {
        config.response_port = port;
    }
    if let Some(ms) = args.timeout_ms {
        config.reply_timeout_ms = ms;
    }

    let controller = Controller::connect(config)?;

    let result = match args.command {
        Commands::Send { address, args } => {
            controller.send(&address, coerce_args(&args))?;
            json!({ "success": true, "message": format!("sent {address}") })
        }

        Commands::Get { address, args } => {
            let timeout = controller.config().reply_timeout();
            match controller.send_and_wait(&address, &coerce_args(&args), timeout, None) {
                Some((response_address, response_args)) => json!({
                    "success": true,
                    "address": response_address,
                    "args": args_to_json(&response_args),
                }),
                None => json!({
                    "success": false,
                    "message": format!("no response from {address} (timeout)"),
                }),
            }
        }

        Commands::ParamGet { track, device, param } => {
            let value = controller.get_parameter_value(track, device, param)?;
            let display = controller.get_parameter_display(track, device, param).ok();
            let range = controller.parameter_range(track, device, param);
            json!({
                "success": true,
                "value": value,
                "display": display,
                "range": range.map(|r| json!({ "min": r.min, "max": r.max })),
            })
        }

        Commands::ParamSet { track, device, param, value, retries } => {
            if !(0.0..=1.0).contains(&value) {
                return Err(osclink::OscError::RangeExceeded {
                    target: value as f64,
                    min: 0.0,
                    max: 1.0,
                });
            }
            let ids = vec![
                OscArg::Int(track),
                OscArg::Int(device),
                OscArg::Int(param as i32),
            ];
            let mut set_args = ids.clone();
            set_args.push(OscArg::Float(value));

            let write = VerifiedWrite::from_config(
                controller.config(),
                addresses::PARAM_SET,
                set_args,
                addresses::PARAM_GET,
                ids,
                OscArg::Float(value),
            )
            .retries(retries);

            let outcome = controller.verified_write(&write)?;
            serde_json::to_value(outcome).expect("serializable result")
        }

        Commands::Calibrate { track, device, param, target, max_iterations, tolerance_pct } => {
            let request = CalibrationRequest::new(track, device, param, target)
                .max_iterations(max_iterations)
                .tolerance_pct(tolerance_pct);
            let outcome = controller.calibrate(&request);
            serde_json::to_value(outcome).expect("serializable result")
        }

        Commands::Sweep { track, device, param } => {
            let outcome = controller.sweep_parameter(track, device, param)?;
            serde_json::to_value(outcome).expect("serializable result")
        }

        Commands::Probe => {
            controller.probe()?;
            json!({ "success": true, "message": "peer responded" })
        }
    };

    Ok(result)
}

/// Coerce CLI tokens into OSC arguments: int, then float, then string
fn coerce_args(raw: &[String]) -> Vec<OscArg> {
    raw.iter()
        .map(|token| {
            if let Ok(v) = token.parse::<i32>() {
                OscArg::Int(v)
            } else if let Ok(v) = token.parse::<f32>() {
                OscArg::Float(v)
            } else {
                OscArg::Str(token.clone())
            }
        })
        .collect()
}

fn args_to_json(args: &[OscArg]) -> Vec<serde_json::Value> {
    args.iter()
        .map(|arg| match arg {
            OscArg::Int(v) => json!(v),
            OscArg::Float(v) => json!(v),
            OscArg::Str(s) => json!(s),
        })
        .collect()
}
