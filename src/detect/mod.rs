//! Detection domain: data model, inference backend seam, post-processing,
//! the double-buffered detection store, and the inference worker.

mod backend;
mod backends;
mod filter;
mod store;
mod worker;

pub use backend::DetectorBackend;
pub use backends::{LumaBlobBackend, ScriptedBackend};
pub use filter::{iou, non_max_suppression, retain_class, NMS_IOU_THRESHOLD};
pub use store::DetectionStore;
pub use worker::{spawn_worker, WorkerConfig};

/// Class index the sentry cares about. Class 0 is "person" in the detection
/// model's label ordering.
pub const PERSON_CLASS_ID: u32 = 0;

/// Detections below this confidence are discarded before NMS.
pub const CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Center-based bounding box in normalized frame-fraction coordinates.
///
/// `x`/`y` locate the box center, `w`/`h` its extent; all four are fractions
/// of the frame in `[0, 1]`. This matches the detection model's output
/// convention; conversion to pixel rectangles happens on the consumer side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// One inferred object instance. Immutable once created; grouped into the
/// detection set of a single inference pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: NormBox,
}
