mod color;
mod detector;
mod geometry;
mod history;
mod motion;
mod overlay;
mod sampler;
mod tracker;

pub use color::{color_mask, rgb_to_hsv};
pub use detector::{accept_circle, BallDetector};
pub use geometry::{min_enclosing_circle, Circle};
pub use history::PositionHistory;
pub use motion::{pixel_motion, pixel_speed_to_mps, MotionEstimator};
pub use overlay::Overlay;
pub use sampler::{sample_pixel, FrameStore, SampleError};
pub use tracker::{Tracker, TrackingHandle};

/// A decoded camera frame, 8 bits per channel in RGB order.
pub type Frame = image::RgbImage;
