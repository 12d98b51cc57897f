use std::time::Instant;

use iinic_nic::Deadline;
use serde::Serialize;

use crate::cmd::{ConnectionArgs, InfoArgs};
use crate::exit::{nic_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ChannelInfo {
    frequency_mhz: f64,
    deviation_khz: u32,
    bandwidth_khz: u32,
}

#[derive(Serialize)]
struct InfoOutput {
    kind: &'static str,
    target: String,
    uniq_id: u16,
    firmware_version: String,
    channel: ChannelInfo,
    bitrate_bps: u32,
    power: String,
    gain: String,
    rssi_threshold: String,
    ping_latency_ms: Option<f64>,
}

pub fn run(args: InfoArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = conn.timeout()?;
    let mut nic = conn.open()?;

    let ping_latency_ms = if args.no_ping {
        None
    } else {
        let start = Instant::now();
        let acked = nic
            .sync(Deadline::after(timeout))
            .map_err(|err| nic_error("ping failed", err))?;
        acked.then(|| (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0)
    };

    let (high, low) = nic.firmware_version();
    let channel = nic.channel();
    let out = InfoOutput {
        kind: "device-info",
        target: conn.target().to_string(),
        uniq_id: nic.uniq_id(),
        firmware_version: format!("{high}.{low}"),
        channel: ChannelInfo {
            frequency_mhz: channel.frequency_mhz(),
            deviation_khz: channel.deviation_khz(),
            bandwidth_khz: channel.bandwidth_khz(),
        },
        bitrate_bps: nic.bitrate().nominal_bps(),
        power: format!("{:?}", nic.power()),
        gain: format!("{:?}", nic.gain()),
        rssi_threshold: format!("{:?}", nic.rssi()),
        ping_latency_ms,
    };

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Device Info:");
            println!("  Target:           {}", out.target);
            println!("  Unique ID:        {} (0x{:04x})", out.uniq_id, out.uniq_id);
            println!("  Firmware:         {}", out.firmware_version);
            println!(
                "  Channel:          {:.6} MHz, {} kHz deviation, {} kHz bandwidth",
                out.channel.frequency_mhz, out.channel.deviation_khz, out.channel.bandwidth_khz
            );
            println!("  Bit rate:         {} bps", out.bitrate_bps);
            println!("  Power:            {}", out.power);
            println!("  Gain:             {}", out.gain);
            println!("  RSSI threshold:   {}", out.rssi_threshold);
            match out.ping_latency_ms {
                Some(ms) => println!("  Ping:             {ms:.2}ms"),
                None => println!("  Ping:             unavailable"),
            }
        }
        OutputFormat::Raw => {
            println!("{}", out.uniq_id);
        }
    }
}
