use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum CameraSource {
    /// Frames from the camera capture program.
    Libcamera,
    /// Generated frames with a moving ball.
    Synthetic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum EscMode {
    /// Pulses are sent to the pigpio daemon.
    Pigpio,
    /// Pulses are only logged.
    DryRun,
}

#[derive(Debug, Parser)]
#[command(name = "ballcam", about = "Track a coloured ball and drive two ESCs")]
pub(crate) struct Args {
    #[clap(long, short = 'f', default_value = "ballcam-settings.json")]
    pub settings_file: PathBuf,

    #[clap(long, default_value = "8000")]
    pub webui_port: u16,

    #[clap(long, default_value = "libcamera")]
    pub camera: CameraSource,

    #[clap(long, default_value = "pigpio")]
    pub esc: EscMode,

    #[clap(long, default_value = "info")]
    pub log_level: String,

    #[clap(long, default_value = "logs")]
    pub log_directory: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ballcam"]);
        assert_eq!(args.settings_file, PathBuf::from("ballcam-settings.json"));
        assert_eq!(args.webui_port, 8000);
        assert!(matches!(args.camera, CameraSource::Libcamera));
        assert!(matches!(args.esc, EscMode::Pigpio));
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_value_enums() {
        let args = Args::parse_from(["ballcam", "--camera", "synthetic", "--esc", "dry-run"]);
        assert!(matches!(args.camera, CameraSource::Synthetic));
        assert!(matches!(args.esc, EscMode::DryRun));
    }

    #[test]
    fn test_rejects_unknown_camera() {
        assert!(Args::try_parse_from(["ballcam", "--camera", "webcam"]).is_err());
    }
}
