//! Command-line front end for RPPKit
//!
//! ```bash
//! rppkit ports
//! rppkit translate part.gcode -o part_rpp.gcode
//! rppkit preview part_rpp.gcode --csv trajectory.csv
//! rppkit send part_rpp.gcode --port /dev/ttyUSB0 --baud 115200
//! rppkit command "J1 D10 F500" --port /dev/ttyUSB0
//! rppkit jog 3 -10 --port /dev/ttyUSB0
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rppkit::{
    controller_config, init_json_logging, init_logging, list_ports, preview_file,
    translator_config, DeviceEvent, DialectTranslator, EventDispatcher, JobState, JointAxis,
    LogLevel, MachineConfig, MachineController, SendOutcome, SenderSettings,
};
use rppkit_settings::{default_config_dir, SETTINGS_FILE};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "rppkit", version)]
#[command(about = "G-Code translator, previewer and sender for RPP robots", long_about = None)]
struct Cli {
    /// Machine configuration (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports a device may be attached to
    Ports,

    /// Translate slicer G-Code into the device dialect
    Translate {
        /// Slicer G-Code file
        input: PathBuf,

        /// Output file (default: <input>_rpp.gcode)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dry-run a device-dialect file through the kinematic model
    Preview {
        /// Device-dialect file
        file: PathBuf,

        /// Write the trajectory as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Stream a device-dialect file to the robot
    Send {
        /// Device-dialect file (default: last file sent)
        file: Option<PathBuf>,

        /// Serial port (default: last port used)
        #[arg(long)]
        port: Option<String>,

        /// Baud rate (default: last baud rate used)
        #[arg(long)]
        baud: Option<String>,

        /// Sender settings file
        #[arg(long, default_value = SETTINGS_FILE)]
        settings: PathBuf,
    },

    /// Send a single command and wait for the prompt
    Command {
        /// Device-dialect line, e.g. "G28" or "J2 D-10 F1000"
        line: String,

        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        baud: Option<String>,

        #[arg(long, default_value = SETTINGS_FILE)]
        settings: PathBuf,
    },

    /// Move one joint by a relative distance
    Jog {
        /// Joint number: 1 rotation, 2 vertical, 3 radial
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        axis: u8,

        /// Degrees for joint 1, millimetres otherwise
        #[arg(allow_negative_numbers = true)]
        distance: f64,

        /// Feedrate (default: jog_feedrate from the machine configuration)
        #[arg(long)]
        feedrate: Option<f64>,

        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        baud: Option<String>,

        #[arg(long, default_value = SETTINGS_FILE)]
        settings: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        init_json_logging()?;
    } else {
        init_logging()?;
    }

    let machine = load_machine_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ports => show_ports(),
        Commands::Translate { input, output } => translate(&machine, &input, output),
        Commands::Preview { file, csv } => show_preview(&machine, &file, csv.as_deref()),
        Commands::Send {
            file,
            port,
            baud,
            settings,
        } => send(&machine, file, port, baud, &settings).await,
        Commands::Command {
            line,
            port,
            baud,
            settings,
        } => command(&machine, &line, port, baud, &settings).await,
        Commands::Jog {
            axis,
            distance,
            feedrate,
            port,
            baud,
            settings,
        } => jog(&machine, axis, distance, feedrate, port, baud, &settings).await,
    }
}

fn load_machine_config(path: Option<&Path>) -> Result<MachineConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_dir() {
            Ok(dir) => dir.join("machine.toml"),
            Err(e) => {
                tracing::warn!("{}, using default machine configuration", e);
                return Ok(MachineConfig::default());
            }
        },
    };
    MachineConfig::load_or_default(&path)
        .with_context(|| format!("Loading machine configuration {}", path.display()))
}

fn show_ports() -> Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

fn translate(machine: &MachineConfig, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let translator = DialectTranslator::new(translator_config(machine));
    let report = translator.translate_file(input)?;

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        input.with_file_name(format!("{}_rpp.gcode", stem))
    });
    report.write_to(&output)?;

    for warning in report.warnings() {
        println!("Warning: {}", warning);
    }
    println!("{}", report);
    println!("Saved to {}", output.display());
    Ok(())
}

fn show_preview(machine: &MachineConfig, file: &Path, csv: Option<&Path>) -> Result<()> {
    let report = preview_file(file, machine.geometry)?;
    for rejected in &report.rejected {
        println!(
            "Line {} ({}): {}",
            rejected.index + 1,
            rejected.command,
            rejected.error
        );
    }
    println!("{}", report);
    if let Some(csv) = csv {
        report.trajectory.save_csv(csv)?;
        println!("Trajectory saved to {}", csv.display());
    }
    Ok(())
}

/// Merge command-line values into the saved settings
fn resolve_connection(
    settings: &mut SenderSettings,
    port: Option<String>,
    baud: Option<String>,
) -> Result<(String, u32)> {
    if let Some(port) = port {
        settings.port = port;
    }
    if let Some(baud) = baud {
        settings.baud = baud;
    }
    if settings.port.is_empty() {
        bail!("No serial port given; use --port");
    }
    let baud = settings.baud_rate()?;
    Ok((settings.port.clone(), baud))
}

async fn connect(
    machine: &MachineConfig,
    settings: &mut SenderSettings,
    port: Option<String>,
    baud: Option<String>,
) -> Result<MachineController> {
    let (port, baud) = resolve_connection(settings, port, baud)?;
    let (events, rx) = EventDispatcher::channel();
    tokio::spawn(print_events(rx));

    let controller = MachineController::with_serial(controller_config(machine), events);
    controller.connect(&port, baud).await?;
    Ok(controller)
}

async fn send(
    machine: &MachineConfig,
    file: Option<PathBuf>,
    port: Option<String>,
    baud: Option<String>,
    settings_path: &Path,
) -> Result<()> {
    let mut settings = SenderSettings::load(settings_path);
    if let Some(file) = file {
        settings.file = file.display().to_string();
    }
    if settings.file.is_empty() {
        bail!("No file given");
    }

    let controller = connect(machine, &mut settings, port, baud).await?;
    let job = controller.start_file(&settings.file)?;

    let stopper = controller.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            stopper.stop();
        }
    });

    let summary = job.await?;
    interrupt.abort();
    controller.disconnect().await?;
    settings.save(settings_path)?;

    println!(
        "{}: {} of {} lines sent, {} timeouts",
        summary.state, summary.sent, summary.total, summary.timeouts
    );
    if summary.state != JobState::Complete {
        bail!("Job did not complete");
    }
    Ok(())
}

async fn command(
    machine: &MachineConfig,
    line: &str,
    port: Option<String>,
    baud: Option<String>,
    settings_path: &Path,
) -> Result<()> {
    let mut settings = SenderSettings::load(settings_path);
    let controller = connect(machine, &mut settings, port, baud).await?;

    let outcome = controller.send_manual(line).await?;
    let position = controller.snapshot().position;
    controller.disconnect().await?;
    settings.save(settings_path)?;

    match outcome {
        SendOutcome::Acknowledged => println!("Position: {}", position),
        SendOutcome::TimedOut => println!("No prompt from device (model position: {})", position),
    }
    Ok(())
}

async fn jog(
    machine: &MachineConfig,
    axis: u8,
    distance: f64,
    feedrate: Option<f64>,
    port: Option<String>,
    baud: Option<String>,
    settings_path: &Path,
) -> Result<()> {
    let axis = JointAxis::from_number(axis).with_context(|| format!("No joint {}", axis))?;
    let feedrate = feedrate.unwrap_or(machine.jog_feedrate);

    let mut settings = SenderSettings::load(settings_path);
    let controller = connect(machine, &mut settings, port, baud).await?;
    let outcome = controller.jog(axis, distance, feedrate).await?;
    let snapshot = controller.snapshot();
    controller.disconnect().await?;
    settings.save(settings_path)?;

    if outcome == SendOutcome::TimedOut {
        println!("No prompt from device");
    }
    println!("Joints: {}", snapshot.joints);
    println!("Position: {}", snapshot.position);
    Ok(())
}

async fn print_events(mut rx: UnboundedReceiver<DeviceEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            DeviceEvent::LineReceived(_) | DeviceEvent::Progress { .. } => println!("{}", event),
            DeviceEvent::Log {
                level: LogLevel::Warn | LogLevel::Error,
                ..
            } => println!("{}", event),
            _ => {}
        }
    }
}
