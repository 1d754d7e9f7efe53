use std::{f64::consts::TAU, time::Duration};

use anyhow::Result;
use ballcam_core::CameraSettings;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::FrameSource;

/// Colour of the synthetic ball. Inside the default tracking range.
pub const BALL_COLOR: Rgb<u8> = Rgb([82, 120, 26]);
const BACKGROUND: Rgb<u8> = Rgb([90, 70, 60]);
/// Time for one revolution of the synthetic ball, in seconds.
const ORBIT_PERIOD: f64 = 4.0;

/// Generates frames with a ball circling the image center, paced at the configured
/// framerate. Useful for running the pipeline without a camera.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    framerate: u32,
    ball_radius: i32,
    frame_idx: u64,
    limit: Option<u64>,
    /// Created on the first frame, timers need a running runtime.
    ticker: Option<Interval>,
}

impl SyntheticSource {
    pub fn new(settings: &CameraSettings) -> Self {
        let framerate = settings.framerate.max(1);
        Self {
            width: settings.width,
            height: settings.height,
            framerate,
            ball_radius: (settings.width.min(settings.height) / 16).max(8) as i32,
            frame_idx: 0,
            limit: None,
            ticker: None,
        }
    }

    /// Stop after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Ball center in frame `idx`.
    pub fn ball_position(&self, idx: u64) -> (f64, f64) {
        let t = idx as f64 / self.framerate as f64;
        let phase = TAU * t / ORBIT_PERIOD;
        let orbit = self.width.min(self.height) as f64 / 3.0;
        (
            self.width as f64 / 2.0 + orbit * phase.cos(),
            self.height as f64 / 2.0 + orbit * phase.sin(),
        )
    }

    /// Render frame `idx`.
    pub fn render(&self, idx: u64) -> RgbImage {
        let mut frame = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let (x, y) = self.ball_position(idx);
        draw_filled_circle_mut(&mut frame, (x as i32, y as i32), self.ball_radius, BALL_COLOR);
        frame
    }
}

impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.limit.is_some_and(|limit| self.frame_idx >= limit) {
            return Ok(None);
        }
        let framerate = self.framerate;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(Duration::from_secs_f64(1.0 / framerate as f64));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
        let frame = self.render(self.frame_idx);
        self.frame_idx += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CameraSettings {
        CameraSettings {
            width: 160,
            height: 120,
            framerate: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_ball_starts_right_of_center() {
        let source = SyntheticSource::new(&settings());
        let (x, y) = source.ball_position(0);
        assert_eq!((x, y), (120.0, 60.0));

        let frame = source.render(0);
        assert_eq!(*frame.get_pixel(120, 60), BALL_COLOR);
        assert_eq!(*frame.get_pixel(0, 0), BACKGROUND);
    }

    #[tokio::test]
    async fn test_limit() {
        let mut source = SyntheticSource::new(&settings()).with_limit(3);
        for _ in 0..3 {
            let frame = source.next_frame().await.unwrap().unwrap();
            assert_eq!(frame.dimensions(), (160, 120));
        }
        assert!(source.next_frame().await.unwrap().is_none());
    }
}
