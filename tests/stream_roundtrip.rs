//! Loopback round-trips for both UDP channels, plus an end-to-end pass from
//! synthetic capture through the worker to a datagram on the wire.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use depth_sentry::transport::wire::{decode_box_datagram, ImageReassembler};
use depth_sentry::{
    process_frame, spawn_worker, to_packets, BoxPacket, DetectionStore, DistanceThresholds,
    FrameSlot, FrameSource, LumaBlobBackend, StreamerConfig, SyntheticConfig, SyntheticSource,
    UdpStreamer, WorkerConfig, MAX_REPORTED_BOXES,
};

fn loopback_receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

fn streamer_to(data_port: u16, image_port: u16) -> UdpStreamer {
    UdpStreamer::new(&StreamerConfig {
        host: "127.0.0.1".to_string(),
        data_port,
        image_port,
        ..StreamerConfig::default()
    })
    .expect("streamer setup")
}

#[test]
fn box_channel_round_trips_over_loopback() {
    let (receiver, port) = loopback_receiver();
    let streamer = streamer_to(port, port);

    let packets: Vec<BoxPacket> = (0..20)
        .map(|i| BoxPacket {
            min_distance: 0.5 + i as f32 * 0.1,
            x_min: i,
            x_max: i + 100,
            y_min: 2 * i,
            y_max: 2 * i + 50,
        })
        .collect();
    streamer.send_boxes(42, &packets).unwrap();

    let mut buf = [0u8; 65_535];
    let (n, _) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(n, 4 + 20 * packets.len());

    let (sender_id, decoded) = decode_box_datagram(&buf[..n]).unwrap();
    assert_eq!(sender_id, 42);
    assert_eq!(decoded, packets);
}

#[test]
fn image_channel_reassembles_to_a_decodable_jpeg() {
    let (receiver, port) = loopback_receiver();
    let streamer = streamer_to(port, port);

    let mut source = SyntheticSource::new(SyntheticConfig {
        width: 96,
        height: 64,
        target_fps: 1000,
        depth_scale: 0.001,
    });
    let frame = source.next_frame().unwrap();
    streamer.send_image(&frame).unwrap();

    let mut rx = ImageReassembler::new();
    let mut buf = [0u8; 65_535];
    let payload = loop {
        let (n, _) = receiver.recv_from(&mut buf).expect("image datagram");
        if let Some(payload) = rx.feed(&buf[..n]) {
            break payload;
        }
    };

    let decoded = image::load_from_memory_with_format(&payload, image::ImageFormat::Jpeg)
        .expect("reassembled payload is a valid jpeg");
    assert_eq!(decoded.to_rgb8().dimensions(), (96, 64));
}

#[test]
fn capture_to_datagram_end_to_end() {
    let (receiver, port) = loopback_receiver();
    let streamer = streamer_to(port, port);

    let mut source = SyntheticSource::new(SyntheticConfig {
        width: 160,
        height: 120,
        target_fps: 1000,
        depth_scale: 0.001,
    });

    let frames = Arc::new(FrameSlot::new());
    let store = Arc::new(DetectionStore::new());
    let stop = Arc::new(AtomicBool::new(false));
    let worker = spawn_worker(
        Box::new(LumaBlobBackend::new()),
        frames.clone(),
        store.clone(),
        stop.clone(),
        WorkerConfig::default(),
    )
    .unwrap();

    // Feed frames until a published set measures the synthetic subject on a
    // frame close enough to the inference frame to overlap it. The subject
    // sweeps 0.5m..3.5m against a 4m background, so an overlapping
    // measurement always lands below it.
    let deadline = Instant::now() + Duration::from_secs(10);
    let report = loop {
        assert!(
            Instant::now() < deadline,
            "worker never measured the subject"
        );
        let mut frame = source.next_frame().unwrap();
        frame.normalize_shadows();
        let frame = Arc::new(frame);
        frames.publish(frame.clone());

        let report = process_frame(&frame, &store, &DistanceThresholds::default());
        if report.boxes.iter().any(|b| b.distance_m < 3.6) {
            break report;
        }
        thread::sleep(Duration::from_millis(5));
    };
    let packets = to_packets(&report);
    assert!(packets.len() <= MAX_REPORTED_BOXES);

    streamer.send_boxes(1, &packets).unwrap();

    let mut buf = [0u8; 65_535];
    let (n, _) = receiver.recv_from(&mut buf).unwrap();
    let (sender_id, decoded) = decode_box_datagram(&buf[..n]).unwrap();
    assert_eq!(sender_id, 1);
    assert_eq!(decoded.len(), packets.len());

    // The synthetic subject sweeps 0.5m..3.5m; the measured distance must be
    // a sane sensor reading, not a shadow artifact or the far background.
    let d = decoded
        .iter()
        .find(|d| d.min_distance < 3.6)
        .expect("measured subject survived the wire");
    assert!(d.min_distance > 0.1, "shadow pixel won the scan");
    assert!(d.x_min >= 0 && d.x_max < 160);
    assert!(d.y_min >= 0 && d.y_max < 120);
    assert!(d.x_min <= d.x_max && d.y_min <= d.y_max);

    stop.store(true, Ordering::Relaxed);
    worker.join().unwrap();
}
