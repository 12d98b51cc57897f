use iinic_frame::{Frame, FrameError, FrameLayer, FrameLayerConfig, TIMING_CORRECTION_FACTOR};
use iinic_nic::testing::{FakeDevice, PingMode};
use iinic_nic::{us_to_ticks, Bitrate, Deadline, Nic, NicError, OverrunPolicy};
use iinic_token::Token;

fn open_layer(device: FakeDevice) -> FrameLayer<FakeDevice> {
    let nic = Nic::open(device, Deadline::Immediate).unwrap();
    FrameLayer::new(nic, None)
}

fn corrected(timing_us: u64, bitrate: Bitrate) -> i64 {
    (timing_us as f64 - TIMING_CORRECTION_FACTOR * bitrate.byte_time()) as i64
}

#[test]
fn untimed_frame_goes_out_immediately() {
    let mut layer = open_layer(FakeDevice::new(3));
    layer.nic_mut().get_mut().clear_control_tokens();

    let handle = layer
        .send_frame(0x44, 1, 2, b"AB", None)
        .unwrap()
        .unwrap();
    assert!(handle.wait(layer.nic_mut(), Deadline::Immediate).unwrap());

    let device = layer.nic().get_ref();
    assert_eq!(
        device.transmitted(),
        &[vec![0x02, 0x44, 0x01, 0x00, 0x02, 0x00, 0x41, 0x42, 0xA8]]
    );
    assert!(!device
        .control_tokens()
        .iter()
        .any(|t| matches!(t, Token::Timing { .. })));
}

#[test]
fn timed_frame_programs_timing_and_embeds_low_bits() {
    let mut layer = open_layer(FakeDevice::new(3));
    layer.nic_mut().get_mut().clear_control_tokens();

    let timing = (1u64 << 32) + 5;
    layer.send_frame(7, 3, 4, b"hello", Some(timing)).unwrap();

    let device = layer.nic().get_ref();
    assert_eq!(device.control_tokens()[0], Token::timing(us_to_ticks(timing)));

    let wire = device.transmitted()[0].clone();
    let frame = Frame::from_received(wire.into(), 0, 0).into_valid().unwrap();
    assert_eq!(frame.timestamp(), Some(5));
    assert_eq!(frame.frame_type(), 7);
    assert_eq!(frame.payload(), b"hello");
}

#[test]
fn oversized_payload_sends_nothing() {
    let mut layer = open_layer(FakeDevice::new(3));
    let err = layer.send_frame(1, 0, 0, &[0u8; 256], None).unwrap_err();
    assert!(matches!(err, FrameError::PayloadTooLarge { size: 256, max: 255 }));
    assert!(!err.is_fatal());
    assert!(layer.nic().get_ref().transmitted().is_empty());
}

#[test]
fn receives_frame_with_corrected_timing() {
    let mut layer = open_layer(FakeDevice::new(3));
    let sent = Frame::to_send(0x44, 9, 3, b"ping", None).unwrap();
    layer.nic_mut().get_mut().inject_rx(sent.as_bytes(), 55, 1_843_200);

    let frame = layer.receive_frame(Deadline::Immediate).unwrap().unwrap();
    assert_eq!(frame.from_id(), 9);
    assert_eq!(frame.to_id(), 3);
    assert_eq!(frame.payload(), b"ping");
    assert_eq!(frame.rssi(), Some(55));
    assert_eq!(frame.timing(), Some(corrected(1_000_000, Bitrate::Bps9600)));

    assert!(layer.receive_frame(Deadline::Immediate).unwrap().is_none());
}

#[test]
fn bad_runs_are_skipped() {
    let mut layer = open_layer(FakeDevice::new(3));
    let good = Frame::to_send(1, 2, 3, b"good", None).unwrap();

    let device = layer.nic_mut().get_mut();
    device.inject_rx(&good.as_bytes()[..4], 0, 0);
    let mut corrupt = good.as_bytes().to_vec();
    corrupt[6] ^= 0x10;
    device.inject_rx(&corrupt, 0, 0);
    device.inject_rx(good.as_bytes(), 0, 0);

    let frame = layer.receive_frame(Deadline::Immediate).unwrap().unwrap();
    assert_eq!(frame.payload(), b"good");
}

#[test]
fn fail_fast_overrun_surfaces_as_nic_error() {
    let mut layer = open_layer(FakeDevice::new(3));
    layer.nic_mut().get_mut().set_ping_mode(PingMode::Hold);

    let payload = [0xAB; 255];
    for _ in 0..5 {
        layer.send_frame(1, 0, 0, &payload, None).unwrap();
    }
    let err = layer.send_frame(1, 0, 0, &payload, None).unwrap_err();
    assert!(matches!(err, FrameError::Nic(NicError::Overrun { .. })));
    assert_eq!(layer.nic().get_ref().transmitted().len(), 5);
}

#[test]
fn blocking_policy_waits_for_room() {
    let mut nic = Nic::open(FakeDevice::new(3), Deadline::Immediate).unwrap();
    nic.get_mut().set_ping_mode(PingMode::Hold);
    let config = FrameLayerConfig {
        overrun: OverrunPolicy::Block,
        tx_deadline: Deadline::Forever,
    };
    let mut layer = FrameLayer::with_config(nic, Some(1), config);

    let payload = [0xAB; 255];
    for _ in 0..8 {
        layer.send_frame(1, 1, 2, &payload, None).unwrap();
    }
    assert_eq!(layer.nic().get_ref().transmitted().len(), 8);
    assert!(layer.nic().tx_queued() <= iinic_nic::TX_BUFFER_SIZE);
}

#[test]
fn pass_through_settings_reach_the_session() {
    let mut layer = open_layer(FakeDevice::new(3));
    layer.set_bitrate(Bitrate::Bps57600).unwrap();
    assert_eq!(layer.nic().bitrate(), Bitrate::Bps57600);
    assert_eq!(layer.byte_send_time(), Bitrate::Bps57600.byte_time());
    assert!(layer.sync(Deadline::Immediate).unwrap());
}
