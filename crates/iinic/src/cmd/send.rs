use std::fs;

use iinic_frame::{Frame, FrameLayer};
use iinic_nic::Deadline;
use serde::Serialize;

use crate::cmd::{parse_duration, ConnectionArgs, SendArgs};
use crate::exit::{frame_error, nic_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_frame, print_json, OutputFormat};

#[derive(Serialize)]
struct SendOutput {
    kind: &'static str,
    frame_type: u8,
    from: u16,
    to: u16,
    payload_size: usize,
    wire_size: usize,
    timestamp: Option<u32>,
    confirmed: bool,
}

pub fn run(args: SendArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = conn.timeout()?;
    let delay = args.delay.as_deref().map(parse_duration).transpose()?;
    let payload = resolve_payload(&args)?;

    let nic = conn.open()?;
    let mut layer = FrameLayer::new(nic, args.from);
    let from = layer.my_id();

    let timing = delay.map(|delay| {
        let delay_us = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        layer.nic().approx_timing().saturating_add(delay_us)
    });

    let handle = layer
        .send_frame(args.frame_type, from, args.to, &payload, timing)
        .map_err(|err| frame_error("send failed", err))?;

    let wait = timeout + delay.unwrap_or_default();
    let confirmed = match handle {
        Some(handle) => handle
            .wait(layer.nic_mut(), Deadline::after(wait))
            .map_err(|err| nic_error("send failed", err))?,
        None => true,
    };

    let sent = Frame::to_send(
        args.frame_type,
        from,
        args.to,
        &payload,
        timing.map(|t| t as u32),
    )
    .map_err(|err| frame_error("send failed", err))?;
    print_sent(&sent, confirmed, format);

    if !confirmed {
        return Err(CliError::new(
            TIMEOUT,
            format!("device did not confirm transmission within {wait:?}"),
        ));
    }
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

fn print_sent(frame: &Frame, confirmed: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SendOutput {
            kind: "frame-sent",
            frame_type: frame.frame_type(),
            from: frame.from_id(),
            to: frame.to_id(),
            payload_size: frame.payload_len(),
            wire_size: frame.wire_size(),
            timestamp: frame.timestamp(),
            confirmed,
        }),
        _ => print_frame(frame, format),
    }
}
