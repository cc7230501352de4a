//! Command-line interface

use crate::{console, menu};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use microstep_camera::{
    default_backend, enumerate_cameras, CameraNameSource, CameraStream, CaptureBackend,
    FfmpegDeviceNames, Frame, NoCameraNames,
};
use microstep_communication::{
    list_ports, CncProbe, CncSession, PortOpener, SerialPortInfo, SessionConfig,
    SystemPortOpener,
};
use microstep_core::{Axis, JogDirection};
use microstep_settings::Config;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

/// Serial CNC and camera control for a desktop microscope
#[derive(Parser, Debug)]
#[command(author, version = LONG_VERSION, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read settings from a .json or .toml file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial baud rate
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    /// Serial read timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Wait after opening the CNC port, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// FFmpeg executable used to name cameras
    #[arg(long, global = true, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports
    Ports {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Also probe each port for a CNC controller
        #[arg(long)]
        probe: bool,
    },
    /// List cameras that deliver frames
    Cameras {
        /// Scan indices below this value
        #[arg(long)]
        max_index: Option<u32>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a port answers like a CNC controller
    Probe {
        /// Port to probe; every port when omitted
        port: Option<String>,
        /// Probe command, may be repeated (default from config: M115)
        #[arg(long = "command", value_name = "CMD")]
        commands: Vec<String>,
    },
    /// Run the homing cycle
    Home {
        /// CNC port
        port: String,
    },
    /// Jog one axis by one step
    Jog {
        /// CNC port
        port: String,
        /// Axis: x, y or z
        axis: Axis,
        /// Direction: + or -
        #[arg(allow_hyphen_values = true)]
        direction: JogDirection,
        /// Step size in mm
        #[arg(long)]
        step: Option<f64>,
    },
    /// Send G-code lines and print each reply
    Send {
        /// CNC port
        port: String,
        /// Lines to send in order
        #[arg(required = true, allow_hyphen_values = true)]
        commands: Vec<String>,
    },
    /// Pick a CNC port and a camera interactively, home the CNC and start the feed
    Select,
    /// Interactive jog console
    Console {
        /// CNC port
        port: String,
    },
    /// Stream a camera until Ctrl-C
    Stream {
        /// Camera index
        index: u32,
        /// Requested frame width
        #[arg(long)]
        width: Option<u32>,
        /// Requested frame height
        #[arg(long)]
        height: Option<u32>,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

impl Cli {
    /// Load the config file, if any, and apply command-line overrides
    pub fn settings(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(timeout) = self.timeout_ms {
            config.serial.timeout_ms = timeout;
        }
        if let Some(settle) = self.settle_ms {
            config.serial.settle_delay_ms = settle;
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            config.camera.ffmpeg_path = Some(ffmpeg.clone());
        }
        if let Command::Stream { width, height, .. } = &self.command {
            config.camera.width = width.unwrap_or(config.camera.width);
            config.camera.height = height.unwrap_or(config.camera.height);
        }

        config.validate().context("Invalid settings")?;
        Ok(config)
    }
}

/// Run the selected subcommand
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.settings()?;
    tracing::debug!("Settings: {:?}", config);

    match cli.command {
        Command::Ports { json, probe } => cmd_ports(&config, json, probe),
        Command::Cameras { max_index, json } => {
            cmd_cameras(&config, max_index.unwrap_or(config.camera.max_index), json)
        }
        Command::Probe { port, commands } => cmd_probe(&config, port, commands),
        Command::Home { port } => {
            let session = connect(&config, &port)?;
            println!("{}", response_text(session.home()));
            Ok(())
        }
        Command::Jog {
            port,
            axis,
            direction,
            step,
        } => {
            let mut session = connect(&config, &port)?;
            if let Some(step) = step {
                session.set_step_size(step)?;
            }
            let report = session.jog(axis, direction)?;
            println!("{}", report);
            Ok(())
        }
        Command::Send { port, commands } => {
            let session = connect(&config, &port)?;
            for command in &commands {
                let reply = session
                    .request(command)
                    .with_context(|| format!("Failed to send {}", command))?;
                println!("{} -> {}", command, response_text(Some(reply)));
            }
            Ok(())
        }
        Command::Select => cmd_select(&config),
        Command::Console { port } => {
            let mut session = connect(&config, &port)?;
            let stdin = io::stdin();
            console::run_console(&mut session, &mut stdin.lock(), &mut io::stdout())?;
            Ok(())
        }
        Command::Stream { index, seconds, .. } => {
            stream_camera(&config, index, seconds.map(Duration::from_secs))
        }
    }
}

fn session_config(config: &Config, port: &str) -> SessionConfig {
    SessionConfig {
        baud_rate: config.serial.baud_rate,
        timeout: config.serial.timeout(),
        settle_delay: config.serial.settle_delay(),
        step_size: config.motion.step_size_mm,
        feed_rate: config.motion.feed_rate,
        ..SessionConfig::new(port)
    }
}

fn connect(config: &Config, port: &str) -> anyhow::Result<CncSession> {
    let opener: Arc<dyn PortOpener> = Arc::new(SystemPortOpener);
    let mut session = CncSession::new(session_config(config, port), opener);
    session
        .connect()
        .with_context(|| format!("Failed to connect to {}", port))?;
    Ok(session)
}

fn probe_for(config: &Config) -> CncProbe {
    CncProbe::new()
        .commands(config.serial.probe_commands.clone())
        .baud_rate(config.serial.baud_rate)
        .timeout(config.serial.probe_timeout())
}

fn camera_names(config: &Config) -> Box<dyn CameraNameSource> {
    match &config.camera.ffmpeg_path {
        Some(path) => Box::new(FfmpegDeviceNames::new(path.clone())),
        None => Box::new(NoCameraNames),
    }
}

fn response_text(response: Option<String>) -> String {
    match response {
        Some(r) if !r.is_empty() => r,
        _ => "No response.".to_string(),
    }
}

/// One row of `ports` output; `cnc` is only present when ports were probed
#[derive(Debug, Serialize)]
struct PortReport<'a> {
    #[serde(flatten)]
    port: &'a SerialPortInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    cnc: Option<bool>,
}

fn port_reports<'a>(
    ports: &'a [SerialPortInfo],
    cnc_ports: Option<&[String]>,
) -> Vec<PortReport<'a>> {
    ports
        .iter()
        .map(|port| PortReport {
            port,
            cnc: cnc_ports.map(|found| found.contains(&port.device)),
        })
        .collect()
}

fn cmd_ports(config: &Config, json: bool, probe: bool) -> anyhow::Result<()> {
    let ports = list_ports();

    let cnc_ports = if probe {
        probe_for(config).find_cnc_ports(&ports)
    } else {
        Vec::new()
    };

    if json {
        let reports = port_reports(&ports, probe.then_some(cnc_ports.as_slice()));
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports available.");
    }
    for port in &ports {
        let marker = if cnc_ports.contains(&port.device) { "  [CNC]" } else { "" };
        println!("{}{}", port, marker);
    }
    Ok(())
}

fn cmd_cameras(config: &Config, max_index: u32, json: bool) -> anyhow::Result<()> {
    let backend = default_backend();
    let names = camera_names(config);
    let cameras = enumerate_cameras(backend.as_ref(), names.as_ref(), max_index);

    if json {
        println!("{}", serde_json::to_string_pretty(&cameras)?);
    } else if cameras.is_empty() {
        println!("No cameras found.");
    } else {
        for camera in &cameras {
            println!("{}", camera);
        }
    }
    Ok(())
}

fn cmd_probe(config: &Config, port: Option<String>, commands: Vec<String>) -> anyhow::Result<()> {
    let mut probe = probe_for(config);
    if !commands.is_empty() {
        probe = probe.commands(commands);
    }

    let targets = match port {
        Some(port) => vec![port],
        None => list_ports().into_iter().map(|p| p.device).collect(),
    };
    if targets.is_empty() {
        println!("No serial ports available.");
    }

    for port in targets {
        if probe.is_cnc_port(&port) {
            println!("Port {} is a CNC device.", port);
        } else {
            println!("Port {} is not a CNC device or not responding.", port);
        }
    }
    Ok(())
}

fn cmd_select(config: &Config) -> anyhow::Result<()> {
    let ports = list_ports();
    let backend: Arc<dyn CaptureBackend> = Arc::from(default_backend());
    let names = camera_names(config);
    let cameras = enumerate_cameras(backend.as_ref(), names.as_ref(), config.camera.max_index);
    let probe = probe_for(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let selection = menu::select_devices(
        &ports,
        &cameras,
        |port| probe.is_cnc_port(port),
        &mut stdin.lock(),
        &mut stdout,
    )?;

    match &selection.cnc_port {
        Some(port) => {
            println!("Selected CNC: {}", port);
            let mut session = connect(config, port)?;
            println!("{}", response_text(session.home()));
            session.disconnect();
        }
        None => println!("No CNC selected."),
    }

    match selection.camera_index {
        Some(index) => {
            println!("Selected camera: {}", index);
            run_stream(backend, config, index, None)
        }
        None => {
            println!("No camera selected.");
            Ok(())
        }
    }
}

fn stream_camera(config: &Config, index: u32, limit: Option<Duration>) -> anyhow::Result<()> {
    run_stream(Arc::from(default_backend()), config, index, limit)
}

fn run_stream(
    backend: Arc<dyn CaptureBackend>,
    config: &Config,
    index: u32,
    limit: Option<Duration>,
) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Release))
        .context("Failed to install Ctrl-C handler")?;

    let sink = Box::new(|frame: &Frame| {
        tracing::trace!("Frame {}x{}", frame.width(), frame.height());
    });
    let mut stream = CameraStream::start(backend, index, Some(config.camera.resolution()), sink)
        .with_context(|| format!("Failed to open camera {}", index))?;

    println!("Stream started. Press Ctrl-C to stop.");
    io::stdout().flush()?;

    let started = Instant::now();
    while stream.is_running() && !stop.load(Ordering::Acquire) {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    if stop.load(Ordering::Acquire) {
        println!("Stream stopped by user.");
    }
    let stats = stream.stop();
    println!("{} frames, {:.1} fps", stats.frames, stats.fps());

    if stats.frames == 0 {
        bail!("Camera {} delivered no frames", index);
    }
    Ok(())
}
