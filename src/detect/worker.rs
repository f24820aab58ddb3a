//! Inference worker thread.
//!
//! Runs at its own cadence, fully decoupled from capture rate:
//! wait for a fresh frame, run the backend, filter + suppress, publish to the
//! detection store, repeat. A pass that takes longer than one capture
//! interval only makes the published set staler; it never stalls capture or
//! the consumer loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::filter::{non_max_suppression, retain_class};
use crate::detect::store::DetectionStore;
use crate::detect::{CONFIDENCE_THRESHOLD, NMS_IOU_THRESHOLD, PERSON_CLASS_ID};
use crate::frame::FrameSlot;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Class retained after inference.
    pub class_id: u32,
    pub confidence_threshold: f32,
    pub nms_iou: f32,
    /// Upper bound on one frame wait, so the stop flag is observed promptly.
    pub frame_wait: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            class_id: PERSON_CLASS_ID,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            nms_iou: NMS_IOU_THRESHOLD,
            frame_wait: Duration::from_millis(100),
        }
    }
}

/// Spawn the inference worker.
///
/// The worker runs until `stop` is set or the backend fails. A backend
/// failure is fatal to the worker (logged, loop exits); the daemon notices
/// the dead thread and shuts down. Recovery belongs to a supervising layer,
/// not here.
pub fn spawn_worker(
    mut backend: Box<dyn DetectorBackend>,
    frames: Arc<FrameSlot>,
    store: Arc<DetectionStore>,
    stop: Arc<AtomicBool>,
    config: WorkerConfig,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("inference-worker".into())
        .spawn(move || run_worker(backend.as_mut(), &frames, &store, &stop, &config))
        .context("failed to spawn inference worker thread")
}

fn run_worker(
    backend: &mut dyn DetectorBackend,
    frames: &FrameSlot,
    store: &DetectionStore,
    stop: &AtomicBool,
    config: &WorkerConfig,
) {
    if let Err(e) = backend.warm_up() {
        log::error!("backend '{}' warm-up failed: {:#}", backend.name(), e);
        return;
    }
    log::info!("inference worker running, backend '{}'", backend.name());

    let mut last_seq = 0u64;
    while !stop.load(Ordering::Relaxed) {
        // WAITING_FOR_FRAME: bounded wait, then re-check the stop flag.
        let Some(frame) = frames.wait_newer(last_seq, config.frame_wait) else {
            continue;
        };

        // RUNNING_INFERENCE: dominant-cost step, runs on an immutable
        // snapshot with no locks held.
        let raw = match backend.detect(&frame.color, frame.width, frame.height) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("backend '{}' inference failed: {:#}", backend.name(), e);
                return;
            }
        };

        let raw_count = raw.len();
        let filtered = retain_class(raw, config.class_id, config.confidence_threshold);
        let set = non_max_suppression(filtered, config.nms_iou);

        // PUBLISHING
        store.publish(&set);
        last_seq = frame.seq;

        log::debug!(
            "pass on frame {}: {} raw -> {} published",
            frame.seq,
            raw_count,
            set.len()
        );
    }
    log::info!("inference worker stopped");
}
