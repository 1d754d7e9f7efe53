use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{Hsv, HsvRange};

/// Settings for the ball detector and motion estimator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Colour box selecting the ball's pixels.
    pub hsv_range: HsvRange,
    /// Side of the square structuring element used to open the mask, in pixels.
    pub open_kernel_size: u32,
    /// Blobs whose enclosing circle is not larger than this are ignored, in pixels.
    pub min_radius_px: f64,
    /// Physical diameter of the ball in meters.
    pub ball_diameter_m: f64,
    /// Focal length of the camera in pixels. Only used for the range estimate.
    pub focal_length_px: f64,
    /// Number of positions kept for the motion estimate.
    pub history_capacity: usize,
    /// Font used to write text onto frames. Text overlays are skipped without one.
    pub overlay_font: Option<PathBuf>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            hsv_range: HsvRange::new(Hsv::new(35, 100, 50), Hsv::new(50, 255, 150)),
            open_kernel_size: 5,
            min_radius_px: 5.0,
            ball_diameter_m: 0.074,
            focal_length_px: 700.0,
            history_capacity: 10,
            overlay_font: None,
        }
    }
}

/// Settings for the MJPEG camera process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Capture program, invoked with libcamera-vid compatible arguments.
    pub program: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// Size of a single read from the capture process' stdout.
    pub read_chunk_size: usize,
}

impl CameraSettings {
    /// Arguments for `program` that make it write an endless MJPEG stream to stdout.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--codec".to_string(),
            "mjpeg".to_string(),
            "--width".to_string(),
            self.width.to_string(),
            "--height".to_string(),
            self.height.to_string(),
            "--framerate".to_string(),
            self.framerate.to_string(),
            "-t".to_string(),
            "0".to_string(),
            "-o".to_string(),
            "-".to_string(),
        ]
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            program: "libcamera-vid".to_string(),
            width: 640,
            height: 480,
            framerate: 30,
            read_chunk_size: 4096,
        }
    }
}

/// Settings for the two speed controllers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscSettings {
    /// Address of the pigpio daemon's command socket.
    pub pigpio_addr: String,
    /// GPIO (Broadcom numbering) driving ESC 1.
    pub esc1_gpio: u32,
    /// GPIO (Broadcom numbering) driving ESC 2.
    pub esc2_gpio: u32,
}

impl EscSettings {
    pub fn gpio(&self, channel: crate::EscChannel) -> u32 {
        match channel {
            crate::EscChannel::Esc1 => self.esc1_gpio,
            crate::EscChannel::Esc2 => self.esc2_gpio,
        }
    }
}

impl Default for EscSettings {
    fn default() -> Self {
        Self {
            pigpio_addr: "127.0.0.1:8888".to_string(),
            esc1_gpio: 16,
            esc2_gpio: 12,
        }
    }
}

/// All settings, as stored in the settings file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallcamSettings {
    pub tracker: TrackerSettings,
    pub camera: CameraSettings,
    pub esc: EscSettings,
}

impl BallcamSettings {
    /// Load the settings from a file, or store the default settings if the file does not
    /// exist. A file that exists but cannot be parsed is left alone and the defaults are
    /// used.
    pub fn load_or_insert(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    tracing::info!("Loaded settings from {}", path.display());
                    Ok(settings)
                }
                Err(err) => {
                    tracing::error!("Failed to parse settings in {}: {}", path.display(), err);
                    Ok(Self::default())
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.store(path)?;
                tracing::info!("Wrote default settings to {}", path.display());
                Ok(settings)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read settings from {}", path.display()))
            }
        }
    }

    /// Store the settings in the given file.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}
