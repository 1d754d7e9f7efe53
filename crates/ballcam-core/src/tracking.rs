use serde::{Deserialize, Serialize};

use crate::Vector2;

/// The ball as seen in a single frame, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Center of the minimum enclosing circle. `x` grows to the right, `y` grows downward.
    pub center: Vector2,
    /// Radius of the minimum enclosing circle in pixels.
    pub radius: f64,
}

impl Detection {
    /// Pinhole estimate of the distance between camera and ball, from the apparent
    /// diameter of the ball.
    pub fn distance_m(&self, focal_length_px: f64, ball_diameter_m: f64) -> Option<f64> {
        if self.radius > 0.0 {
            Some(focal_length_px * ball_diameter_m / (2.0 * self.radius))
        } else {
            None
        }
    }
}

/// A timestamped ball position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Seconds, from any clock that is shared by all samples.
    pub timestamp: f64,
    pub position: Vector2,
}

impl PositionSample {
    pub fn new(timestamp: f64, x: f64, y: f64) -> Self {
        Self {
            timestamp,
            position: Vector2::new(x, y),
        }
    }
}

/// The most recent motion estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingState {
    /// Speed in m/s.
    pub speed_mps: f64,
    /// Heading in degrees, counter-clockwise from the image's +x axis with +y pointing up.
    pub angle_deg: f64,
}

impl TrackingState {
    /// The state as it is reported to clients.
    pub fn report(&self) -> TrackingReport {
        TrackingReport {
            speed_mps: round2(self.speed_mps),
            angle_deg: round2(self.angle_deg),
        }
    }
}

/// [`TrackingState`] rounded to two decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingReport {
    pub speed_mps: f64,
    pub angle_deg: f64,
}

/// Message pushed to telemetry subscribers after every processed frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    /// Pipeline time of the frame, in seconds.
    pub timestamp: f64,
    #[serde(flatten)]
    pub report: TrackingReport,
    /// The detection in this frame, if the ball was found.
    pub detection: Option<Detection>,
    /// Pinhole range estimate for `detection`.
    pub distance_m: Option<f64>,
}

/// Two decimals, exact halves go to the even neighbour.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
