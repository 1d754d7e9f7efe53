use ballcam_core::{PositionSample, TrackingState};

use crate::PositionHistory;

/// Estimates speed and heading of the ball from the ends of the position history.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    ball_diameter_m: f64,
}

impl MotionEstimator {
    pub fn new(ball_diameter_m: f64) -> Self {
        Self { ball_diameter_m }
    }

    /// New estimate from the oldest and newest sample, or `None` if the history holds
    /// fewer than two samples.
    pub fn estimate(&self, history: &PositionHistory) -> Option<TrackingState> {
        if history.len() < 2 {
            return None;
        }
        let (oldest, newest) = (history.oldest()?, history.newest()?);
        let (pixel_speed, angle_deg) = pixel_motion(oldest, newest);
        Some(TrackingState {
            speed_mps: pixel_speed_to_mps(pixel_speed, history, self.ball_diameter_m),
            angle_deg,
        })
    }
}

/// Pixel speed (px/s) and heading (degrees) between two samples.
///
/// The heading is measured with +y pointing up, so image rows (which grow downward) are
/// flipped. A non-positive time difference gives a speed of zero.
pub fn pixel_motion(from: &PositionSample, to: &PositionSample) -> (f64, f64) {
    let dt = to.timestamp - from.timestamp;
    let dx = to.position.x - from.position.x;
    let dy = from.position.y - to.position.y;

    let dist_px = dx.hypot(dy);
    let pixel_speed = if dt > 0.0 { dist_px / dt } else { 0.0 };
    (pixel_speed, dy.atan2(dx).to_degrees())
}

/// Convert a pixel speed to m/s.
///
/// The scale is taken from the mean distance between consecutive samples, which stands in
/// for the apparent ball diameter in pixels. This only holds when the ball moves about one
/// diameter per sample. Returns 0 when the samples never moved.
pub fn pixel_speed_to_mps(pixel_speed: f64, history: &PositionHistory, ball_diameter_m: f64) -> f64 {
    match history.mean_step_px() {
        Some(ball_px) if ball_px > 0.0 => {
            let px_per_meter = ball_px / ball_diameter_m;
            pixel_speed / px_per_meter
        }
        _ => 0.0,
    }
}
