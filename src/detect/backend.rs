//! Inference backend seam.
//!
//! The neural-network engine is an external collaborator; this trait is the
//! narrow interface it is reached through. Backends receive a read-only pixel
//! slice and return raw (unfiltered) detections; thresholding and NMS are the
//! worker's job so every backend gets identical post-processing.

use anyhow::Result;

use crate::detect::Detection;

/// Detector backend trait.
///
/// Implementations must treat the pixel slice as read-only and ephemeral: it
/// borrows from a frame snapshot that is dropped after the call.
pub trait DetectorBackend: Send {
    /// Backend identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Run one inference pass over a BGR8 frame.
    ///
    /// Returns every candidate the model produced, including low-confidence
    /// and non-person classes. A backend failure is fatal to the worker that
    /// owns it; there is no per-frame retry.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook (model load, first-pass allocation).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
