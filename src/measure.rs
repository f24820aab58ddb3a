//! Geometry and depth measurement shared by the consumer loop.
//!
//! Converts normalized detection boxes into clamped pixel rectangles, scans
//! the aligned depth image for the closest surface inside each rectangle, and
//! classifies distances into severity tiers.

use crate::detect::NormBox;
use crate::frame::CameraFrame;

/// Closed pixel rectangle, clamped inside the frame.
/// Bounds are inclusive: `x_min..=x_max`, `y_min..=y_max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

/// Convert a center-based normalized box to pixel coordinates and clamp to
/// `[0, width-1] x [0, height-1]`. Coordinates never go negative; a box
/// already inside the frame is unchanged by the clamp.
pub fn to_pixel_rect(bbox: &NormBox, width: u32, height: u32) -> PixelRect {
    let fw = width as f32;
    let fh = height as f32;

    let half_w = bbox.w * fw / 2.0;
    let half_h = bbox.h * fh / 2.0;
    let cx = bbox.x * fw;
    let cy = bbox.y * fh;

    let x_min = (cx - half_w) as i32;
    let x_max = (cx + half_w) as i32;
    let y_min = (cy - half_h) as i32;
    let y_max = (cy + half_h) as i32;

    PixelRect {
        x_min: x_min.clamp(0, width as i32 - 1),
        x_max: x_max.clamp(0, width as i32 - 1),
        y_min: y_min.clamp(0, height as i32 - 1),
        y_max: y_max.clamp(0, height as i32 - 1),
    }
}

/// Minimum raw depth inside a clamped rectangle.
///
/// Expects the frame's shadows to be normalized already, so zero-depth
/// dropouts cannot win the scan. Returns `u16::MAX` for a degenerate
/// (zero-pixel) rectangle.
pub fn min_depth_in_rect(frame: &CameraFrame, rect: &PixelRect) -> u16 {
    let mut min = u16::MAX;
    for y in rect.y_min..=rect.y_max {
        for x in rect.x_min..=rect.x_max {
            let v = frame.depth_at(x as u32, y as u32);
            if v < min {
                min = v;
            }
        }
    }
    min
}

// ----------------------------------------------------------------------------
// Severity tiers
// ----------------------------------------------------------------------------

/// Proximity tier for one detection, nearest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Inside the near threshold (default 1 m).
    Near,
    /// Inside the caution threshold (default 2 m).
    Caution,
    /// Beyond both thresholds.
    Clear,
}

/// Severity thresholds in meters, converted once per frame into raw sensor
/// units with that frame's depth scale.
#[derive(Clone, Copy, Debug)]
pub struct DistanceThresholds {
    pub near_m: f32,
    pub caution_m: f32,
}

impl Default for DistanceThresholds {
    fn default() -> Self {
        Self {
            near_m: 1.0,
            caution_m: 2.0,
        }
    }
}

impl DistanceThresholds {
    /// Thresholds in raw depth units for a sensor with the given scale.
    pub fn to_raw(&self, depth_scale: f32) -> RawThresholds {
        RawThresholds {
            near: (self.near_m / depth_scale) as u32,
            caution: (self.caution_m / depth_scale) as u32,
        }
    }
}

/// Per-frame thresholds in the sensor's native integer units.
#[derive(Clone, Copy, Debug)]
pub struct RawThresholds {
    pub near: u32,
    pub caution: u32,
}

pub fn classify(min_depth_raw: u16, thresholds: &RawThresholds) -> Severity {
    let v = min_depth_raw as u32;
    if v < thresholds.near {
        Severity::Near
    } else if v < thresholds.caution {
        Severity::Caution
    } else {
        Severity::Clear
    }
}
