// rot2prog test application -- CLI tool for exercising a ROT2Prog controller
// or the built-in simulator.
//
// Usage:
//   rot2prog-test-app --port /dev/ttyUSB0 status
//   rot2prog-test-app --port /dev/ttyUSB0 set 180 30
//   rot2prog-test-app --port /dev/ttyUSB0 --ascii --extended-resolutions shell
//   rot2prog-test-app --sim-resolution 2 shell
//   rot2prog-test-app --port /dev/pts/4 simulate --resolution 4
//
// The simulator is usually hosted on one end of a virtual serial pair, e.g.
//   socat -d -d pty,raw,echo=0 pty,raw,echo=0

mod logging;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use rot2prog::{
    DigitEncoding, LimitPolicy, Limits, Position, ProtocolConfig, ResolutionSet, Rot2Prog,
    Rot2ProgBuilder, Simulator, SimulatorHandle,
};
use rot2prog_test_harness::PipeTransport;
use rot2prog_transport::SerialTransport;

use crate::logging::{init_logging, LogLevel};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// rot2prog test application -- drives a ROT2Prog controller from the
/// command line.
#[derive(Parser)]
#[command(name = "rot2prog-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless --sim-resolution is used.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate of the serial link.
    #[arg(long, default_value_t = 600)]
    baud: u32,

    /// How long to wait for a STATUS or STOP response, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Controller uses ASCII digits instead of raw digit values.
    #[arg(long)]
    ascii: bool,

    /// Accept 10 pulses/degree in addition to 1, 2 and 4.
    #[arg(long)]
    extended_resolutions: bool,

    /// Wrap/clamp out-of-range SET targets instead of rejecting them.
    #[arg(long)]
    clamp: bool,

    /// Minimum azimuth in degrees.
    #[arg(long, default_value_t = -180.0, allow_hyphen_values = true)]
    min_az: f64,

    /// Maximum azimuth in degrees.
    #[arg(long, default_value_t = 540.0, allow_hyphen_values = true)]
    max_az: f64,

    /// Minimum elevation in degrees.
    #[arg(long, default_value_t = -21.0, allow_hyphen_values = true)]
    min_el: f64,

    /// Maximum elevation in degrees.
    #[arg(long, default_value_t = 180.0, allow_hyphen_values = true)]
    max_el: f64,

    /// Talk to an in-process simulator with this many pulses/degree
    /// instead of a serial port.
    #[arg(long, value_name = "PPD")]
    sim_resolution: Option<u8>,

    /// Log verbosity (logs go to stderr).
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query the current position.
    Status,

    /// Halt motion and print where the rotator stopped.
    Stop,

    /// Move to a position.
    #[command(allow_negative_numbers = true)]
    Set {
        /// Azimuth in degrees.
        azimuth: f64,
        /// Elevation in degrees.
        elevation: f64,
    },

    /// Print the resolution reported by the controller.
    Resolution,

    /// Print the limits SET targets are checked against.
    Limits,

    /// Interactive prompt.
    Shell,

    /// Act as a controller on --port until Ctrl-C.
    Simulate {
        /// Pulses per degree to report.
        #[arg(long, default_value_t = 1)]
        resolution: u8,

        /// Starting azimuth in degrees.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        azimuth: f64,

        /// Starting elevation in degrees.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        elevation: f64,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn protocol_config(cli: &Cli) -> ProtocolConfig {
    ProtocolConfig {
        digit_encoding: if cli.ascii {
            DigitEncoding::Ascii
        } else {
            DigitEncoding::Raw
        },
        resolutions: if cli.extended_resolutions {
            ResolutionSet::Extended
        } else {
            ResolutionSet::Standard
        },
        limit_policy: if cli.clamp {
            LimitPolicy::Correct
        } else {
            LimitPolicy::Reject
        },
    }
}

fn print_position(position: Position) {
    println!("Azimuth:   {:.1}°", position.azimuth);
    println!("Elevation: {:.1}°", position.elevation);
}

fn print_limits(limits: Limits) {
    println!("Azimuth:   {:.1}° .. {:.1}°", limits.min_az, limits.max_az);
    println!("Elevation: {:.1}° .. {:.1}°", limits.min_el, limits.max_el);
}

/// Read one line from stdin without stalling the runtime. `None` on EOF.
async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| -> io::Result<Option<String>> {
        let mut line = String::new();
        let n = io::stdin().read_line(&mut line)?;
        Ok((n > 0).then_some(line))
    })
    .await??;
    Ok(line)
}

/// Connect to the controller on --port, or to an in-process simulator.
async fn connect(cli: &Cli) -> Result<(Rot2Prog, Option<SimulatorHandle>)> {
    let config = protocol_config(cli);
    let builder = Rot2ProgBuilder::new()
        .config(config)
        .baud_rate(cli.baud)
        .response_timeout(Duration::from_millis(cli.timeout_ms))
        .limits(Limits::new(cli.min_az, cli.max_az, cli.min_el, cli.max_el));

    if let Some(ppd) = cli.sim_resolution {
        let (client, controller) = PipeTransport::pair();
        let sim = Simulator::with_config(Box::new(controller), ppd, config)
            .context("starting simulator")?
            .spawn();
        let rot = builder
            .build_with_transport(Box::new(client))
            .await
            .context("connecting to simulator")?;
        println!("Connected to in-process simulator -- {}", rot.resolution());
        return Ok((rot, Some(sim)));
    }

    let port = cli
        .port
        .as_deref()
        .context("--port is required unless --sim-resolution is given")?;
    let rot = builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("connecting to {port}"))?;
    println!("Connected to {port} at {} baud -- {}", cli.baud, rot.resolution());
    Ok((rot, None))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn shell_help() {
    println!();
    println!("ROT2Prog interactive commands:");
    println!("  help                                display this help message");
    println!("  quit                                end the program");
    println!("  stop                                send stop command");
    println!("  status                              send status command");
    println!("  ppd                                 show pulses per degree");
    println!("  set <azimuth> <elevation>           send set command with a position");
    println!("  limits [min_az max_az min_el max_el] show or replace the limits");
}

fn parse_angles(args: &[&str]) -> Result<Vec<f64>> {
    args.iter()
        .map(|a| a.parse::<f64>().with_context(|| format!("not a number: {a}")))
        .collect()
}

/// Run one shell line. Returns `false` when the user asked to quit.
async fn shell_command(rot: &Rot2Prog, line: &str) -> Result<bool> {
    let args: Vec<&str> = line.split_whitespace().collect();
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(true);
    };

    match cmd.to_lowercase().as_str() {
        "help" => shell_help(),
        "quit" | "exit" => return Ok(false),
        "stop" => print_position(rot.stop().await.context("stop failed")?),
        "status" => print_position(rot.status().await.context("status failed")?),
        "ppd" => println!(
            "Pulses per degree: {}",
            rot.resolution().pulses_per_degree()
        ),
        "set" => match parse_angles(rest)?.as_slice() {
            [az, el] => rot.set(*az, *el).await.context("set failed")?,
            _ => bail!("usage: set <azimuth> <elevation>"),
        },
        "limits" => match parse_angles(rest)?.as_slice() {
            [] => print_limits(rot.limits()),
            [min_az, max_az, min_el, max_el] => {
                rot.set_limits(Limits::new(*min_az, *max_az, *min_el, *max_el));
                print_limits(rot.limits());
            }
            _ => bail!("usage: limits [min_az max_az min_el max_el]"),
        },
        other => bail!("invalid command: {other}"),
    }
    Ok(true)
}

async fn cmd_shell(rot: &Rot2Prog) -> Result<()> {
    shell_help();
    loop {
        print!("\n> ");
        io::stdout().flush().ok();

        let Some(line) = read_line().await? else {
            break;
        };
        match shell_command(rot, &line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("{e:#}"),
        }
    }
    Ok(())
}

async fn cmd_simulate(cli: &Cli, resolution: u8, start: Position) -> Result<()> {
    let port = cli.port.as_deref().context("simulate requires --port")?;
    let transport = SerialTransport::open(port, cli.baud)
        .await
        .with_context(|| format!("opening {port}"))?;

    let sim = Simulator::with_config(Box::new(transport), resolution, protocol_config(cli))
        .context("starting simulator")?
        .with_position(start);
    let mut events = sim.subscribe();
    let handle = sim.spawn();

    info!(port, resolution, "simulator listening");
    println!("Simulating a controller on {port} (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!("[event] {event:?}"),
                Err(RecvError::Lagged(n)) => {
                    println!("[warning] missed {n} events (consumer too slow)");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let position = handle.stop().await?;
    println!("Simulator stopped at {position}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    if let Command::Simulate {
        resolution,
        azimuth,
        elevation,
    } = &cli.command
    {
        if cli.sim_resolution.is_some() {
            bail!("--sim-resolution cannot be combined with simulate");
        }
        return cmd_simulate(&cli, *resolution, Position::new(*azimuth, *elevation)).await;
    }

    let (rot, sim) = connect(&cli).await?;

    let result: Result<()> = match &cli.command {
        Command::Status => rot.status().await.map(print_position).map_err(Into::into),
        Command::Stop => rot.stop().await.map(print_position).map_err(Into::into),
        Command::Set {
            azimuth,
            elevation,
        } => rot
            .set(*azimuth, *elevation)
            .await
            .map(|()| println!("Moving to az {azimuth:.1}°, el {elevation:.1}°"))
            .map_err(Into::into),
        Command::Resolution => {
            println!("{}", rot.resolution());
            Ok(())
        }
        Command::Limits => {
            print_limits(rot.limits());
            Ok(())
        }
        Command::Shell => cmd_shell(&rot).await,
        Command::Simulate { .. } => unreachable!("simulate handled above"),
    };

    rot.close().await.ok();
    if let Some(sim) = sim {
        sim.stop().await.ok();
    }
    result
}
