//! Daemon configuration.
//!
//! Layered the usual way: defaults, then an optional JSON config file named
//! by `SENTRY_CONFIG`, then environment-variable overrides, then validation.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 360;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_DEPTH_SCALE: f32 = 0.001;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DATA_PORT: u16 = 45_100;
const DEFAULT_IMAGE_PORT: u16 = 45_101;
const DEFAULT_SENDER_ID: u8 = 0;
const DEFAULT_NEAR_M: f32 = 1.0;
const DEFAULT_CAUTION_M: f32 = 2.0;

#[derive(Debug, Deserialize, Default)]
struct SentrydConfigFile {
    camera: Option<CameraConfigFile>,
    telemetry: Option<TelemetryConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    depth_scale: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct TelemetryConfigFile {
    host: Option<String>,
    data_port: Option<u16>,
    image_port: Option<u16>,
    sender_id: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdConfigFile {
    near_m: Option<f32>,
    caution_m: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct SentrydConfig {
    pub camera: CameraSettings,
    pub telemetry: TelemetrySettings,
    pub thresholds: ThresholdSettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Meters per raw depth unit; a real sensor reports its own scale, this
    /// value drives the synthetic source.
    pub depth_scale: f32,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub host: String,
    pub data_port: u16,
    pub image_port: u16,
    pub sender_id: u8,
}

#[derive(Debug, Clone)]
pub struct ThresholdSettings {
    pub near_m: f32,
    pub caution_m: f32,
}

impl SentrydConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SentrydConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentrydConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let telemetry = file.telemetry.unwrap_or_default();
        let thresholds = file.thresholds.unwrap_or_default();
        Self {
            camera: CameraSettings {
                width: camera.width.unwrap_or(DEFAULT_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_FPS),
                depth_scale: camera.depth_scale.unwrap_or(DEFAULT_DEPTH_SCALE),
            },
            telemetry: TelemetrySettings {
                host: telemetry.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                data_port: telemetry.data_port.unwrap_or(DEFAULT_DATA_PORT),
                image_port: telemetry.image_port.unwrap_or(DEFAULT_IMAGE_PORT),
                sender_id: telemetry.sender_id.unwrap_or(DEFAULT_SENDER_ID),
            },
            thresholds: ThresholdSettings {
                near_m: thresholds.near_m.unwrap_or(DEFAULT_NEAR_M),
                caution_m: thresholds.caution_m.unwrap_or(DEFAULT_CAUTION_M),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SENTRY_TELEMETRY_HOST") {
            if !host.trim().is_empty() {
                self.telemetry.host = host;
            }
        }
        if let Ok(port) = std::env::var("SENTRY_DATA_PORT") {
            self.telemetry.data_port = port
                .parse()
                .map_err(|_| anyhow!("SENTRY_DATA_PORT must be a port number"))?;
        }
        if let Ok(port) = std::env::var("SENTRY_IMAGE_PORT") {
            self.telemetry.image_port = port
                .parse()
                .map_err(|_| anyhow!("SENTRY_IMAGE_PORT must be a port number"))?;
        }
        if let Ok(id) = std::env::var("SENTRY_SENDER_ID") {
            self.telemetry.sender_id = id
                .parse()
                .map_err(|_| anyhow!("SENTRY_SENDER_ID must be 0..=255"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be non-zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be non-zero"));
        }
        if self.camera.depth_scale <= 0.0 {
            return Err(anyhow!("camera depth_scale must be positive"));
        }
        if self.thresholds.near_m <= 0.0 {
            return Err(anyhow!("near threshold must be positive"));
        }
        if self.thresholds.near_m >= self.thresholds.caution_m {
            return Err(anyhow!(
                "near threshold ({}) must be below caution threshold ({})",
                self.thresholds.near_m,
                self.thresholds.caution_m
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentrydConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
