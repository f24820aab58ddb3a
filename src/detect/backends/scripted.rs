//! Scripted backend for tests.

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::Detection;

/// Backend that replays a prepared sequence of detection sets, one per call.
/// After the script runs out it keeps returning the last set (or an empty one
/// for an empty script). Can be armed to fail for fatal-path tests.
pub struct ScriptedBackend {
    script: Vec<Vec<Detection>>,
    next: usize,
    fail_after: Option<usize>,
    calls: usize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script,
            next: 0,
            fail_after: None,
            calls: 0,
        }
    }

    /// Fail every `detect` call once `calls` successful passes have run.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        if let Some(limit) = self.fail_after {
            if self.calls >= limit {
                return Err(anyhow!("scripted backend failure"));
            }
        }
        self.calls += 1;

        let set = match self.script.get(self.next) {
            Some(set) => set.clone(),
            None => self.script.last().cloned().unwrap_or_default(),
        };
        if self.next < self.script.len() {
            self.next += 1;
        }
        Ok(set)
    }
}
