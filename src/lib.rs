//! depth-sentry
//!
//! Person detection over an RGB-D camera with per-person distance
//! measurement, streamed to a remote consumer over UDP.
//!
//! # Architecture
//!
//! Two long-lived threads, fully decoupled in rate:
//!
//! 1. **Consumer loop** (capture thread): reads aligned color+depth frames,
//!    normalizes depth shadows, publishes each frame into a single-writer
//!    slot, measures the latest detection set against the depth image, and
//!    transmits results.
//! 2. **Inference worker**: at its own cadence, snapshots the latest frame,
//!    runs the detection backend, filters and suppresses candidates, and
//!    publishes the set into a double-buffered store.
//!
//! The `DetectionStore` is the only shared mutable detection state. A slow
//! inference pass degrades only the freshness of the published set; it never
//! stalls capture, measurement, or transmission.
//!
//! # Module Structure
//!
//! - `frame`: camera frame types and the frame hand-off slot
//! - `capture`: frame source seam + synthetic source
//! - `detect`: detection model, backend seam, NMS, store, worker
//! - `measure`: pixel geometry, depth scans, severity tiers
//! - `pipeline`: the per-frame consumer step
//! - `transport`: UDP wire formats and the channel streamer
//! - `config`: daemon configuration

pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod measure;
pub mod pipeline;
pub mod transport;

pub use capture::{FrameSource, SyntheticConfig, SyntheticSource};
pub use config::SentrydConfig;
pub use detect::{
    spawn_worker, Detection, DetectionStore, DetectorBackend, LumaBlobBackend, NormBox,
    ScriptedBackend, WorkerConfig, CONFIDENCE_THRESHOLD, NMS_IOU_THRESHOLD, PERSON_CLASS_ID,
};
pub use frame::{CameraFrame, FrameSlot, SHADOW_FLOOR_RAW, SHADOW_REMAP_RAW};
pub use measure::{DistanceThresholds, PixelRect, Severity};
pub use pipeline::{process_frame, to_packets, BoxReport, FrameReport, MAX_REPORTED_BOXES};
pub use transport::wire::BoxPacket;
pub use transport::{StreamerConfig, UdpStreamer};
