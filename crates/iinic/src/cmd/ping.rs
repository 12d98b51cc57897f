use std::thread;
use std::time::Instant;

use iinic_nic::Deadline;
use serde::Serialize;
use tracing::warn;

use crate::cmd::{parse_duration, ConnectionArgs, PingArgs};
use crate::exit::{nic_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    kind: &'static str,
    sent: u32,
    received: u32,
    rtt_ms: Vec<Option<f64>>,
    min_ms: Option<f64>,
    avg_ms: Option<f64>,
    max_ms: Option<f64>,
}

pub fn run(args: PingArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = conn.timeout()?;
    let interval = parse_duration(&args.interval)?;
    let mut nic = conn.open()?;

    let mut rtt_ms = Vec::with_capacity(args.count as usize);
    for i in 0..args.count {
        if i > 0 {
            thread::sleep(interval);
        }
        let start = Instant::now();
        let handle = nic.ping().map_err(|err| nic_error("ping failed", err))?;
        let acked = handle
            .wait(&mut nic, Deadline::after(timeout))
            .map_err(|err| nic_error("ping failed", err))?;
        if acked {
            rtt_ms.push(Some(round_ms(start.elapsed().as_secs_f64() * 1000.0)));
        } else {
            warn!(seq = handle.seq(), "ping timed out");
            rtt_ms.push(None);
        }
    }

    let out = summarize(args.count, rtt_ms);
    print_ping(&out, format);

    if out.received == 0 && out.sent > 0 {
        return Err(CliError::new(TIMEOUT, "no ping was echoed by the device"));
    }
    Ok(SUCCESS)
}

fn summarize(sent: u32, rtt_ms: Vec<Option<f64>>) -> PingOutput {
    let ok: Vec<f64> = rtt_ms.iter().flatten().copied().collect();
    let received = ok.len() as u32;
    let min_ms = ok.iter().copied().reduce(f64::min);
    let max_ms = ok.iter().copied().reduce(f64::max);
    let avg_ms = (!ok.is_empty()).then(|| round_ms(ok.iter().sum::<f64>() / ok.len() as f64));
    PingOutput {
        kind: "ping",
        sent,
        received,
        rtt_ms,
        min_ms,
        avg_ms,
        max_ms,
    }
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

fn print_ping(out: &PingOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            for (i, rtt) in out.rtt_ms.iter().enumerate() {
                match rtt {
                    Some(ms) => println!("ping {}: {ms:.2}ms", i + 1),
                    None => println!("ping {}: timeout", i + 1),
                }
            }
            println!("{} sent, {} received", out.sent, out.received);
            if let (Some(min), Some(avg), Some(max)) = (out.min_ms, out.avg_ms, out.max_ms) {
                println!("rtt min/avg/max = {min:.2}/{avg:.2}/{max:.2} ms");
            }
        }
        OutputFormat::Raw => println!("{}", out.received),
    }
}
