//! Camera frame types and the cross-thread frame hand-off slot.
//!
//! - `CameraFrame`: Owned color+depth capture, immutable once published.
//! - `FrameSlot`: Single-writer slot the consumer loop publishes into and the
//!   inference worker reads from.
//!
//! Frames are wrapped in `Arc` before publication. The capture side never
//! mutates a frame after it enters the slot, so the worker can hold its
//! snapshot for the full duration of an inference pass without coordinating
//! with capture.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Raw depth values below this are sensor shadow artifacts.
pub const SHADOW_FLOOR_RAW: u16 = 20;

/// Shadow pixels are remapped to the maximum representable distance so they
/// never register as "closest".
pub const SHADOW_REMAP_RAW: u16 = u16::MAX;

// ----------------------------------------------------------------------------
// CameraFrame
// ----------------------------------------------------------------------------

/// One aligned color+depth capture.
///
/// The depth image is aligned to the color image: same dimensions, and the
/// depth pixel at `(x, y)` measures the surface shown by the color pixel at
/// `(x, y)`. Depth values are in sensor-native integer units; multiply by
/// `depth_scale` for meters.
pub struct CameraFrame {
    /// BGR8 pixel data, row-major, 3 bytes per pixel.
    pub color: Vec<u8>,
    /// Raw depth values, row-major, one `u16` per pixel.
    pub depth: Vec<u16>,
    pub width: u32,
    pub height: u32,
    /// Meters per raw depth unit.
    pub depth_scale: f32,
    /// Capture sequence number, starting at 1.
    pub seq: u64,
}

impl CameraFrame {
    /// Raw depth at a pixel. Callers must stay in bounds.
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> u16 {
        self.depth[(y * self.width + x) as usize]
    }

    /// Remap sensor-shadow pixels to the maximum representable distance.
    ///
    /// The depth sensor reports unmeasurable pixels (shadows) as zero or
    /// near-zero. Left alone they would dominate every minimum-distance scan,
    /// so anything below [`SHADOW_FLOOR_RAW`] becomes [`SHADOW_REMAP_RAW`].
    /// Runs on the owned frame before it is shared.
    pub fn normalize_shadows(&mut self) {
        for v in &mut self.depth {
            if *v < SHADOW_FLOOR_RAW {
                *v = SHADOW_REMAP_RAW;
            }
        }
    }
}

// ----------------------------------------------------------------------------
// FrameSlot
// ----------------------------------------------------------------------------

/// Single-writer hand-off slot for the latest captured frame.
///
/// The consumer loop publishes each frame after depth normalization; the
/// inference worker takes `Arc` snapshots at its own cadence. Publishing
/// replaces the previous frame, so a slow worker only ever skips frames, it
/// never delays capture.
pub struct FrameSlot {
    latest: Mutex<Option<Arc<CameraFrame>>>,
    arrived: Condvar,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            arrived: Condvar::new(),
        }
    }

    /// Replace the slot contents with a newer frame and wake any waiter.
    pub fn publish(&self, frame: Arc<CameraFrame>) {
        let mut slot = self.latest.lock().unwrap();
        *slot = Some(frame);
        self.arrived.notify_all();
    }

    /// Current frame without waiting. `None` only before the first publish.
    pub fn latest(&self) -> Option<Arc<CameraFrame>> {
        self.latest.lock().unwrap().clone()
    }

    /// Wait up to `timeout` for a frame with `seq > newer_than`.
    ///
    /// Returns `None` on timeout so callers can re-check their stop flag.
    /// Sequence numbers start at 1, so `newer_than = 0` accepts the first
    /// frame ever published.
    pub fn wait_newer(&self, newer_than: u64, timeout: Duration) -> Option<Arc<CameraFrame>> {
        let guard = self.latest.lock().unwrap();
        let (guard, _timed_out) = self
            .arrived
            .wait_timeout_while(guard, timeout, |slot| {
                slot.as_ref().map_or(true, |f| f.seq <= newer_than)
            })
            .unwrap();
        guard.as_ref().filter(|f| f.seq > newer_than).cloned()
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
