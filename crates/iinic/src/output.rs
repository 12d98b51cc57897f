use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use iinic_frame::Frame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    kind: &'static str,
    frame_type: u8,
    from: u16,
    to: u16,
    payload_size: usize,
    payload: String,
    timestamp: Option<u32>,
    timing_us: Option<i64>,
    rssi: Option<u16>,
}

impl FrameOutput {
    fn new(frame: &Frame) -> Self {
        Self {
            kind: "frame",
            frame_type: frame.frame_type(),
            from: frame.from_id(),
            to: frame.to_id(),
            payload_size: frame.payload_len(),
            payload: payload_preview(frame.payload()),
            timestamp: frame.timestamp(),
            timing_us: frame.timing(),
            rssi: frame.rssi(),
        }
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FrameOutput::new(frame)),
        OutputFormat::Table => {
            let out = FrameOutput::new(frame);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FROM", "TO", "TYPE", "SIZE", "TIMING", "RSSI", "PAYLOAD"])
                .add_row(vec![
                    out.from.to_string(),
                    out.to.to_string(),
                    type_label(out.frame_type),
                    out.payload_size.to_string(),
                    optional(out.timing_us),
                    optional(out.rssi),
                    out.payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{frame} payload={}", payload_preview(frame.payload()));
        }
        OutputFormat::Raw => print_raw(frame.payload()),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Frame types are usually printable letters.
pub fn type_label(frame_type: u8) -> String {
    if frame_type.is_ascii_graphic() {
        format!("{frame_type} ({})", frame_type as char)
    } else {
        frame_type.to_string()
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
