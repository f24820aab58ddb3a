//! sentryd - RGB-D proximity sentry daemon
//!
//! This daemon:
//! 1. Captures aligned color+depth frames (synthetic source in this build;
//!    a real camera plugs in behind `FrameSource`)
//! 2. Publishes each frame into the hand-off slot for the inference worker
//! 3. Reads the latest detection set and measures per-box minimum distance
//! 4. Streams box telemetry and JPEG frames over UDP, fire-and-forget
//!
//! The inference worker runs on its own thread at its own cadence; a slow
//! pass only makes detections staler, it never stalls this loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use depth_sentry::{
    process_frame, spawn_worker, to_packets, DetectionStore, DistanceThresholds, FrameSlot,
    FrameSource, LumaBlobBackend, SentrydConfig, StreamerConfig, SyntheticConfig, SyntheticSource,
    UdpStreamer, WorkerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "sentryd", about = "RGB-D proximity sentry daemon")]
struct Args {
    /// Path to a JSON config file
    #[arg(long, env = "SENTRY_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Stop after this many frames (0 = run until interrupted)
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Disable the image channel (telemetry only)
    #[arg(long)]
    no_images: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = SentrydConfig::load_from(args.config.as_deref())?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            stop.store(true, Ordering::Relaxed);
        })
        .context("failed to install shutdown handler")?;
    }

    let mut source = SyntheticSource::new(SyntheticConfig {
        width: cfg.camera.width,
        height: cfg.camera.height,
        target_fps: cfg.camera.target_fps,
        depth_scale: cfg.camera.depth_scale,
    });
    let (width, height) = source.dimensions();
    log::info!(
        "capture running: {}x{} @ {} fps, depth scale {:.6}",
        width,
        height,
        cfg.camera.target_fps,
        source.depth_scale()
    );

    // Socket setup failure is fatal at startup; send failures later are not.
    let streamer = UdpStreamer::new(&StreamerConfig {
        host: cfg.telemetry.host.clone(),
        data_port: cfg.telemetry.data_port,
        image_port: cfg.telemetry.image_port,
        ..StreamerConfig::default()
    })?;
    log::info!(
        "streaming to {} (boxes :{}, images :{})",
        cfg.telemetry.host,
        cfg.telemetry.data_port,
        cfg.telemetry.image_port
    );

    let frames = Arc::new(FrameSlot::new());
    let store = Arc::new(DetectionStore::new());
    let thresholds = DistanceThresholds {
        near_m: cfg.thresholds.near_m,
        caution_m: cfg.thresholds.caution_m,
    };

    let worker = spawn_worker(
        Box::new(LumaBlobBackend::new()),
        frames.clone(),
        store.clone(),
        stop.clone(),
        WorkerConfig::default(),
    )?;

    let mut frame_count = 0u64;
    let mut last_health_log = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        if worker.is_finished() {
            log::error!("inference worker died, shutting down");
            break;
        }

        let mut frame = source.next_frame()?;
        frame.normalize_shadows();
        let frame = Arc::new(frame);
        frames.publish(frame.clone());

        let report = process_frame(&frame, &store, &thresholds);
        if let Some(closest) = report.closest_m {
            log::debug!("frame {}: closest object {:.2} m", report.seq, closest);
        }

        if !report.boxes.is_empty() {
            let packets = to_packets(&report);
            if let Err(e) = streamer.send_boxes(cfg.telemetry.sender_id, &packets) {
                log::warn!("box send failed: {:#}", e);
            }
        }
        if !args.no_images {
            if let Err(e) = streamer.send_image(&frame) {
                log::warn!("image send failed: {:#}", e);
            }
        }

        frame_count += 1;
        if args.frames != 0 && frame_count >= args.frames {
            log::info!("frame limit reached ({})", args.frames);
            break;
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            log::info!(
                "health: frames={} published_set={}",
                source.frames_captured(),
                store.len()
            );
            last_health_log = Instant::now();
        }
    }

    stop.store(true, Ordering::Relaxed);
    if worker.join().is_err() {
        log::error!("inference worker panicked");
    }
    log::info!("sentryd stopped after {} frames", frame_count);
    Ok(())
}
