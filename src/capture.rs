//! Frame capture sources.
//!
//! The depth-camera pipeline itself (driver, stream alignment, intrinsics) is
//! an external collaborator. This module defines the narrow interface the rest
//! of the crate consumes:
//! - `FrameSource`: blocking per-frame capture of aligned color+depth.
//! - `SyntheticSource`: a driverless stand-in for tests and bench runs.
//!
//! Sources produce owned `CameraFrame`s. Depth normalization is the consumer
//! loop's job, not the source's.

use std::time::{Duration, Instant};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::CameraFrame;

/// Aligned color+depth capture source.
///
/// `next_frame` blocks until the next capture cycle completes and returns an
/// owned frame with a strictly increasing `seq`.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<CameraFrame>;

    /// Color/depth dimensions (depth is aligned to color).
    fn dimensions(&self) -> (u32, u32);

    /// Meters per raw depth unit.
    fn depth_scale(&self) -> f32;

    /// Frames captured so far.
    fn frames_captured(&self) -> u64;
}

// ----------------------------------------------------------------------------
// Synthetic source
// ----------------------------------------------------------------------------

/// Configuration for the synthetic capture source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    pub depth_scale: f32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            target_fps: 30,
            depth_scale: 0.001,
        }
    }
}

/// Driverless capture source that renders a bright subject drifting across a
/// dim background, with the subject's depth sweeping toward and away from the
/// sensor. Paced to `target_fps`.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    last_capture: Option<Instant>,
    rng: StdRng,
}

/// Background distance of the synthetic scene, in meters.
const SYNTHETIC_BACKGROUND_M: f32 = 4.0;

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            last_capture: None,
            rng: StdRng::from_entropy(),
        }
    }

    fn to_raw(&self, meters: f32) -> u16 {
        ((meters / self.config.depth_scale) as u32).min(u16::MAX as u32) as u16
    }

    /// Subject rectangle for the current frame, in pixels: a square covering
    /// about a third of the frame height, drifting horizontally.
    fn subject_rect(&self) -> (u32, u32, u32, u32) {
        let side = (self.config.height / 3).max(1);
        let span = self.config.width.saturating_sub(side).max(1);
        let x = ((self.frame_count * 3) % span as u64) as u32;
        let y = self.config.height / 3;
        (x, y, side, side)
    }

    /// Subject distance for the current frame, sweeping 0.5m..3.5m.
    fn subject_depth_raw(&self) -> u16 {
        let phase = (self.frame_count % 120) as f32 / 120.0;
        let meters = 0.5 + 3.0 * (phase * std::f32::consts::TAU).sin().abs();
        self.to_raw(meters)
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<CameraFrame> {
        // Pace to target fps.
        let interval = Duration::from_secs(1) / self.config.target_fps.max(1);
        if let Some(last) = self.last_capture {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_capture = Some(Instant::now());
        self.frame_count += 1;

        let w = self.config.width;
        let h = self.config.height;
        let (sx, sy, sw, sh) = self.subject_rect();
        let subject_depth = self.subject_depth_raw();

        let mut color = vec![40u8; (w * h * 3) as usize];
        let mut depth = vec![self.to_raw(SYNTHETIC_BACKGROUND_M); (w * h) as usize];

        for y in sy..(sy + sh).min(h) {
            for x in sx..(sx + sw).min(w) {
                let ci = ((y * w + x) * 3) as usize;
                color[ci] = 200;
                color[ci + 1] = 200;
                color[ci + 2] = 200;
                // Sensor noise, including the occasional shadow dropout.
                let jitter: i32 = self.rng.gen_range(-5..=5);
                depth[(y * w + x) as usize] = if self.rng.gen_ratio(1, 64) {
                    0
                } else {
                    subject_depth.saturating_add_signed(jitter as i16)
                };
            }
        }

        Ok(CameraFrame {
            color,
            depth,
            width: w,
            height: h,
            depth_scale: self.config.depth_scale,
            seq: self.frame_count,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn depth_scale(&self) -> f32 {
        self.config.depth_scale
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SyntheticConfig {
        SyntheticConfig {
            width: 64,
            height: 48,
            target_fps: 1000,
            depth_scale: 0.001,
        }
    }

    #[test]
    fn synthetic_frames_have_increasing_seq() {
        let mut source = SyntheticSource::new(fast_config());
        let a = source.next_frame().unwrap();
        let b = source.next_frame().unwrap();
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
    }

    #[test]
    fn synthetic_subject_is_nearer_than_background() {
        let mut source = SyntheticSource::new(fast_config());
        let background = source.to_raw(SYNTHETIC_BACKGROUND_M);
        let mut frame = source.next_frame().unwrap();
        frame.normalize_shadows();
        let min = frame.depth.iter().copied().min().unwrap();
        assert!(min < background);
    }

    #[test]
    fn synthetic_dimensions_match_config() {
        let mut source = SyntheticSource::new(fast_config());
        let frame = source.next_frame().unwrap();
        assert_eq!((frame.width, frame.height), source.dimensions());
        assert_eq!(frame.color.len(), (frame.width * frame.height * 3) as usize);
        assert_eq!(frame.depth.len(), (frame.width * frame.height) as usize);
    }
}
