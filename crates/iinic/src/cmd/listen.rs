use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use iinic_frame::{Frame, FrameLayer};
use iinic_nic::Deadline;

use crate::cmd::{ConnectionArgs, ListenArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// How often the Ctrl-C flag is checked while the air is quiet.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let nic = conn.open()?;
    let mut layer = FrameLayer::new(nic, None);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let frame = match layer.receive_frame(Deadline::after(POLL_INTERVAL)) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        if !accepts(&args, &frame) {
            continue;
        }

        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

fn accepts(args: &ListenArgs, frame: &Frame) -> bool {
    if let Some(types) = &args.types {
        if !types.contains(&frame.frame_type()) {
            return false;
        }
    }
    args.to.is_none_or(|to| frame.to_id() == to)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
