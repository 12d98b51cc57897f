//! Echo every frame addressed to this node back to its sender.
//!
//! Run with:
//!   cargo run --example echo-frames -- 127.0.0.1
//!
//! or against a serial adapter (auto-detected when no host is given):
//!   cargo run --example echo-frames

use std::time::Duration;

use iinic::frame::FrameLayer;
use iinic::nic::NicConfig;
use iinic::transport::{Deadline, DEFAULT_PORT};
use iinic::Target;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = match std::env::args().nth(1) {
        Some(host) => Target::Tcp {
            host,
            port: DEFAULT_PORT,
        },
        None => Target::DetectSerial,
    };

    let nic = iinic::connect(
        &target,
        NicConfig::default(),
        Deadline::after(Duration::from_secs(5)),
    )?;
    let mut layer = FrameLayer::new(nic, None);
    let me = layer.my_id();
    eprintln!("Listening on {target} as node {me}");

    loop {
        let Some(frame) = layer.receive_frame(Deadline::Forever)? else {
            continue;
        };
        if frame.to_id() != me {
            continue;
        }
        eprintln!("{frame}");
        layer.send_frame(
            frame.frame_type(),
            me,
            frame.from_id(),
            frame.payload(),
            None,
        )?;
    }
}
