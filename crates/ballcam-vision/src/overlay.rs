use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use ballcam_core::{Detection, TrackingState};
use image::Rgb;
use imageproc::drawing::{draw_hollow_circle_mut, draw_text_mut};

use crate::Frame;

const CIRCLE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_SCALE: f32 = 22.0;
const CLOCK_SCALE: f32 = 18.0;

/// Draws the detection and telemetry text onto frames.
pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    /// An overlay that only draws shapes.
    pub fn without_text() -> Self {
        Self { font: None }
    }

    /// Load the font used for text. If the font cannot be loaded, a warning is logged and
    /// text is skipped.
    pub fn load(font_path: Option<&Path>) -> Self {
        let Some(path) = font_path else {
            return Self::without_text();
        };
        let font = std::fs::read(path)
            .map_err(|err| err.to_string())
            .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|err| err.to_string()));
        match font {
            Ok(font) => Self { font: Some(font) },
            Err(err) => {
                tracing::warn!("Failed to load overlay font {}: {}", path.display(), err);
                Self::without_text()
            }
        }
    }

    pub fn has_text(&self) -> bool {
        self.font.is_some()
    }

    /// Outline the ball and print the last estimate in the top-left corner.
    pub fn draw_ball(&self, frame: &mut Frame, detection: &Detection, state: &TrackingState) {
        let center = (detection.center.x as i32, detection.center.y as i32);
        let radius = detection.radius as i32;
        draw_hollow_circle_mut(frame, center, radius, CIRCLE_COLOR);
        draw_hollow_circle_mut(frame, center, radius + 1, CIRCLE_COLOR);

        if let Some(font) = &self.font {
            let scale = PxScale::from(TEXT_SCALE);
            let speed = format!("{:.1} m/s", state.speed_mps);
            let angle = format!("{:.1} deg", state.angle_deg);
            draw_text_mut(frame, TEXT_COLOR, 10, 12, scale, font, &speed);
            draw_text_mut(frame, TEXT_COLOR, 10, 42, scale, font, &angle);
        }
    }

    /// Print `text` in the bottom-right corner.
    pub fn draw_clock(&self, frame: &mut Frame, text: &str) {
        if let Some(font) = &self.font {
            let x = frame.width() as i32 - 180;
            let y = frame.height() as i32 - 26;
            draw_text_mut(frame, TEXT_COLOR, x, y, PxScale::from(CLOCK_SCALE), font, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballcam_core::Vector2;

    #[test]
    fn test_missing_font_disables_text() {
        let overlay = Overlay::load(Some(Path::new("/nonexistent/font.ttf")));
        assert!(!overlay.has_text());
        assert!(!Overlay::load(None).has_text());
    }

    #[test]
    fn test_draws_circle_outline() {
        let overlay = Overlay::without_text();
        let mut frame = Frame::new(100, 100);
        let detection = Detection {
            center: Vector2::new(50.4, 50.7),
            radius: 20.9,
        };
        overlay.draw_ball(&mut frame, &detection, &TrackingState::default());

        assert_eq!(*frame.get_pixel(70, 50), CIRCLE_COLOR);
        assert_eq!(*frame.get_pixel(50, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_clock_without_font_is_a_no_op() {
        let overlay = Overlay::without_text();
        let mut frame = Frame::new(640, 480);
        overlay.draw_clock(&mut frame, "12:00:00");
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
