use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use ballcam_core::Hsv;
use thiserror::Error;

use crate::{rgb_to_hsv, Frame};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("No frame available")]
    NoFrameAvailable,
    #[error("Pixel ({x}, {y}) is outside the {width}x{height} frame")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
}

/// HSV colour of the pixel at column `x`, row `y`.
pub fn sample_pixel(frame: &Frame, x: i64, y: i64) -> Result<Hsv, SampleError> {
    let (width, height) = frame.dimensions();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return Err(SampleError::OutOfBounds {
            x,
            y,
            width,
            height,
        });
    }
    Ok(rgb_to_hsv(*frame.get_pixel(x as u32, y as u32)))
}

/// The most recent processed frame and the last colour sampled from it.
///
/// Written by the frame pipeline and the sample query, read by request handlers. Cheap to
/// clone.
#[derive(Clone)]
pub struct FrameStore {
    inner: Arc<FrameStoreInner>,
}

struct FrameStoreInner {
    last_frame: ArcSwapOption<Frame>,
    last_sampled: ArcSwap<Hsv>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FrameStoreInner {
                last_frame: ArcSwapOption::empty(),
                last_sampled: ArcSwap::from_pointee(Hsv::default()),
            }),
        }
    }

    pub fn set_frame(&self, frame: Frame) {
        self.inner.last_frame.store(Some(Arc::new(frame)));
    }

    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.inner.last_frame.load_full()
    }

    /// Sample a pixel of the last frame and remember its colour.
    pub fn sample(&self, x: i64, y: i64) -> Result<Hsv, SampleError> {
        let frame = self.last_frame().ok_or(SampleError::NoFrameAvailable)?;
        let hsv = sample_pixel(&frame, x, y)?;
        self.inner.last_sampled.store(Arc::new(hsv));
        tracing::info!("Sampled HSV at ({}, {}): {:?}", x, y, hsv);
        Ok(hsv)
    }

    /// The colour of the last successful sample, all zeros before the first one.
    pub fn last_sampled(&self) -> Hsv {
        **self.inner.last_sampled.load()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}
