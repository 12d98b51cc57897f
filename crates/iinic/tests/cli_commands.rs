#![cfg(all(unix, feature = "cli"))]

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use iinic_frame::Frame;
use iinic_nic::testing::FakeDevice;
use iinic_nic::Deadline;
use iinic_token::Token;

/// Serves one connection from the CLI with an emulated device.
struct FakeRelay {
    port: u16,
    handle: JoinHandle<FakeDevice>,
}

impl FakeRelay {
    /// `after_reset` runs once, right after the device saw its first ping,
    /// which is when the host has finished resetting it.
    fn spawn(device: FakeDevice, after_reset: impl FnOnce(&mut FakeDevice) + Send + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept should succeed");
            serve(stream, device, after_reset)
        });
        Self { port, handle }
    }

    fn join(self) -> FakeDevice {
        self.handle.join().expect("relay thread should not panic")
    }
}

fn serve(
    mut stream: TcpStream,
    mut device: FakeDevice,
    after_reset: impl FnOnce(&mut FakeDevice),
) -> FakeDevice {
    stream
        .set_read_timeout(Some(Duration::from_millis(10)))
        .expect("set timeout");
    let mut after_reset = Some(after_reset);
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => device.handle_host_bytes(&buf[..n]),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => break,
        }

        let synced = device
            .control_tokens()
            .iter()
            .any(|t| matches!(t, Token::Ping { .. }));
        if synced {
            if let Some(hook) = after_reset.take() {
                hook(&mut device);
            }
        }

        if let Some(out) = device.take_output(Deadline::Immediate) {
            if stream.write_all(&out).is_err() {
                break;
            }
        }
    }
    device
}

fn iinic(port: u16, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_iinic"))
        .env_remove("IINIC_DEVICE")
        .env_remove("IINIC_HOST")
        .env_remove("IINIC_PORT")
        .args(["--log-level", "error", "--format", "json", "--timeout", "2s"])
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(args)
        .output()
        .expect("iinic should run")
}

#[test]
fn info_reports_device_identity() {
    let relay = FakeRelay::spawn(FakeDevice::new(0x1234).with_version(2, 7), |_| {});
    let output = iinic(relay.port, &["info"]);
    relay.join();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"uniq_id\":4660"));
    assert!(stdout.contains("\"firmware_version\":\"2.7\""));
    assert!(stdout.contains("\"bitrate_bps\":9600"));
}

#[test]
fn send_transmits_one_frame() {
    let relay = FakeRelay::spawn(FakeDevice::new(5), |_| {});
    let output = iinic(
        relay.port,
        &["send", "--type", "D", "--from", "1", "--to", "9", "--data", "hello"],
    );
    let device = relay.join();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"confirmed\":true"));

    let expected = Frame::to_send(b'D', 1, 9, b"hello", None).unwrap();
    assert_eq!(device.transmitted(), &[expected.as_bytes().to_vec()]);
}

#[test]
fn delayed_send_programs_timing_and_timestamp() {
    let relay = FakeRelay::spawn(FakeDevice::new(5), |_| {});
    let output = iinic(relay.port, &["send", "--data", "later", "--delay", "100ms"]);
    let device = relay.join();

    assert!(output.status.success(), "{output:?}");
    assert!(device
        .control_tokens()
        .iter()
        .any(|t| matches!(t, Token::Timing { .. })));

    let wire = device.transmitted()[0].clone();
    let frame = Frame::from_received(wire.into(), 0, 0)
        .into_valid()
        .expect("transmitted frame should be valid");
    assert!(frame.timestamp().is_some());
    assert_eq!(frame.from_id(), 5);
    assert_eq!(frame.to_id(), u16::MAX);
}

#[test]
fn listen_prints_matching_frames() {
    let relay = FakeRelay::spawn(FakeDevice::new(5), |device| {
        for (frame_type, payload) in [(b'A', "skip"), (b'D', "first"), (b'D', "second")] {
            let frame = Frame::to_send(frame_type, 7, 5, payload.as_bytes(), None).unwrap();
            device.inject_rx(frame.as_bytes(), 30, 1000);
        }
    });
    let output = iinic(relay.port, &["listen", "--type", "D", "--count", "2"]);
    relay.join();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"payload\":\"first\""));
    assert!(lines[1].contains("\"payload\":\"second\""));
    assert!(lines[0].contains("\"rssi\":30"));
}

#[test]
fn silent_device_times_out_with_124() {
    let mut device = FakeDevice::new(5);
    device.set_answer_reset(false);
    let relay = FakeRelay::spawn(device, |_| {});

    let output = Command::new(env!("CARGO_BIN_EXE_iinic"))
        .args(["--host", "127.0.0.1", "--port", &relay.port.to_string()])
        .args(["--timeout", "300ms", "info"])
        .output()
        .expect("iinic should run");
    relay.join();

    assert_eq!(output.status.code(), Some(124));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("reset acknowledgement"));
}

#[test]
fn refused_connection_fails() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        listener.local_addr().expect("local addr").port()
    };

    let output = iinic(port, &["info"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_iinic"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("iinic {}", env!("CARGO_PKG_VERSION")));
}
