//! Brightness-blob backend.
//!
//! A model-free CPU heuristic: finds the bounding box of bright pixels and
//! reports it as a single person candidate. It exists so the daemon can run
//! end-to-end against the synthetic capture source without a model file;
//! production deployments plug a real engine in behind `DetectorBackend`.

use anyhow::{bail, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::{Detection, NormBox, PERSON_CLASS_ID};

/// Pixels with average channel value above this count as "bright".
const LUMA_THRESHOLD: u16 = 140;

/// Minimum fraction of bright pixels inside the blob's bounding box for the
/// blob to count as a detection rather than speckle.
const MIN_FILL: f32 = 0.25;

#[derive(Default)]
pub struct LumaBlobBackend;

impl LumaBlobBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorBackend for LumaBlobBackend {
    fn name(&self) -> &'static str {
        "luma-blob"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let expected = (width * height * 3) as usize;
        if pixels.len() != expected {
            bail!(
                "frame size mismatch: got {} bytes, expected {} for {}x{} BGR8",
                pixels.len(),
                expected,
                width,
                height
            );
        }

        let mut x_min = u32::MAX;
        let mut x_max = 0u32;
        let mut y_min = u32::MAX;
        let mut y_max = 0u32;
        let mut bright = 0u64;

        for y in 0..height {
            for x in 0..width {
                let i = ((y * width + x) * 3) as usize;
                let luma =
                    (pixels[i] as u16 + pixels[i + 1] as u16 + pixels[i + 2] as u16) / 3;
                if luma > LUMA_THRESHOLD {
                    bright += 1;
                    x_min = x_min.min(x);
                    x_max = x_max.max(x);
                    y_min = y_min.min(y);
                    y_max = y_max.max(y);
                }
            }
        }

        if bright == 0 {
            return Ok(vec![]);
        }

        let box_w = (x_max - x_min + 1) as f32;
        let box_h = (y_max - y_min + 1) as f32;
        let fill = bright as f32 / (box_w * box_h);
        if fill < MIN_FILL {
            return Ok(vec![]);
        }

        let fw = width as f32;
        let fh = height as f32;
        Ok(vec![Detection {
            class_id: PERSON_CLASS_ID,
            // Denser blobs read as more confident, capped below certainty.
            confidence: fill.min(0.99),
            bbox: NormBox {
                x: (x_min as f32 + box_w / 2.0) / fw,
                y: (y_min as f32 + box_h / 2.0) / fh,
                w: box_w / fw,
                h: box_h / fh,
            },
        }])
    }
}
