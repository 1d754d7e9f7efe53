use std::future::Future;

use anyhow::Result;
use image::RgbImage;

mod capture;
mod mjpeg;
mod synthetic;

pub use capture::{decode_jpeg, CameraCapture};
pub use mjpeg::MjpegSplitter;
pub use synthetic::{SyntheticSource, BALL_COLOR};

/// A source of decoded frames.
pub trait FrameSource: Send {
    /// Wait for the next frame. `Ok(None)` means the source is exhausted.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<RgbImage>>> + Send;

    /// Release whatever produces the frames.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized,
    {
        async { Ok(()) }
    }
}
