use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use iinic::{DynChannel, Target};
use iinic_nic::{Bitrate, Deadline, Nic, NicConfig};
use iinic_transport::DEFAULT_PORT;
use tracing::debug;

use crate::exit::{nic_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod listen;
pub mod ping;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reset the device and print its identity and radio settings.
    Info(InfoArgs),
    /// Measure ping round trips to the device.
    Ping(PingArgs),
    /// Send a single frame.
    Send(SendArgs),
    /// Listen and print received frames.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, conn, format),
        Command::Ping(args) => ping::run(args, conn, format),
        Command::Send(args) => send::run(args, conn, format),
        Command::Listen(args) => listen::run(args, conn, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the device. Shared by every command that talks to it.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Serial device path. Auto-detected when neither --device nor --host is given.
    #[arg(long, env = "IINIC_DEVICE", value_name = "PATH", global = true)]
    pub device: Option<PathBuf>,

    /// TCP relay host. Takes precedence over --device.
    #[arg(long, env = "IINIC_HOST", global = true)]
    pub host: Option<String>,

    /// TCP relay port.
    #[arg(long, env = "IINIC_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Timeout for the device reset and for each wait (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,

    /// Radio bit rate in bits per second.
    #[arg(long, value_name = "BPS", default_value = "9600", value_parser = parse_bitrate, global = true)]
    pub bitrate: Bitrate,
}

impl ConnectionArgs {
    pub fn target(&self) -> Target {
        match (&self.host, &self.device) {
            (Some(host), _) => Target::Tcp {
                host: host.clone(),
                port: self.port,
            },
            (None, Some(path)) => Target::Serial(path.clone()),
            (None, None) => Target::DetectSerial,
        }
    }

    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }

    /// Open the channel and reset the device.
    pub fn open(&self) -> CliResult<Nic<DynChannel>> {
        let timeout = self.timeout()?;
        let target = self.target();
        let config = NicConfig {
            bitrate: self.bitrate,
            ..NicConfig::default()
        };
        debug!(%target, bps = self.bitrate.nominal_bps(), "opening iinic");
        iinic::connect(&target, config, Deadline::after(timeout))
            .map_err(|err| nic_error(&format!("cannot open iinic at {target}"), err))
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Skip the latency probe.
    #[arg(long)]
    pub no_ping: bool,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Number of round trips.
    #[arg(long, short = 'c', default_value_t = 4)]
    pub count: u32,
    /// Pause between round trips (e.g. 1s, 200ms).
    #[arg(long, default_value = "200ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Frame type: a single character or a number.
    #[arg(long = "type", short = 't', default_value = "D", value_parser = parse_frame_type)]
    pub frame_type: u8,
    /// Destination node id.
    #[arg(long, default_value_t = u16::MAX)]
    pub to: u16,
    /// Source node id. Default: the device unique id.
    #[arg(long)]
    pub from: Option<u16>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Transmit this long after now and attach the send time as timestamp
    /// (e.g. 2s, 300ms).
    #[arg(long)]
    pub delay: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print frames of these types (comma-separated).
    #[arg(long = "type", value_delimiter = ',', value_parser = parse_frame_type)]
    pub types: Option<Vec<u8>>,
    /// Only print frames addressed to this node id.
    #[arg(long)]
    pub to: Option<u16>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn parse_frame_type(input: &str) -> Result<u8, String> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && !c.is_ascii_digit() => Ok(c as u8),
        _ => input
            .parse::<u8>()
            .ok()
            .filter(|t| *t < 0x80)
            .ok_or_else(|| format!("invalid frame type {input:?}: expected one character or 0-127")),
    }
}

fn parse_bitrate(input: &str) -> Result<Bitrate, String> {
    let supported = || {
        Bitrate::ALL
            .iter()
            .map(|b| b.nominal_bps().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let bps: u32 = input
        .parse()
        .map_err(|_| format!("invalid bit rate {input:?}"))?;
    Bitrate::from_nominal_bps(bps)
        .ok_or_else(|| format!("unsupported bit rate {bps}; one of {}", supported()))
}
