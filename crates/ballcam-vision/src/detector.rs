use ballcam_core::{Detection, HsvRange, TrackerSettings, TrackingState, Vector2};
use imageproc::{
    contours::{find_contours, BorderType, Contour},
    distance_transform::Norm,
    geometry::contour_area,
    morphology::open,
};

use crate::{color_mask, min_enclosing_circle, Circle, Frame, Overlay};

/// Finds the ball in a frame by colour segmentation.
pub struct BallDetector {
    hsv_range: HsvRange,
    /// Half the side of the square opening kernel.
    open_radius: u8,
    min_radius_px: f64,
    overlay: Overlay,
}

impl BallDetector {
    pub fn new(settings: &TrackerSettings) -> Self {
        Self::with_overlay(settings, Overlay::load(settings.overlay_font.as_deref()))
    }

    pub fn with_overlay(settings: &TrackerSettings, overlay: Overlay) -> Self {
        Self {
            hsv_range: settings.hsv_range,
            open_radius: (settings.open_kernel_size / 2).min(u8::MAX as u32) as u8,
            min_radius_px: settings.min_radius_px,
            overlay,
        }
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Look for the ball and, if found, draw it and `last_state` onto the frame.
    ///
    /// Returns the (possibly annotated) frame together with the detection.
    pub fn detect(&self, mut frame: Frame, last_state: &TrackingState) -> (Frame, Option<Detection>) {
        let detection = self.find_ball(&frame);
        if let Some(detection) = &detection {
            self.overlay.draw_ball(&mut frame, detection, last_state);
        }
        (frame, detection)
    }

    /// The enclosing circle of the largest blob of ball-coloured pixels, unless it is too
    /// small to be the ball.
    pub fn find_ball(&self, frame: &Frame) -> Option<Detection> {
        let mask = color_mask(frame, &self.hsv_range);
        // Drop speckles before looking for blobs
        let mask = if self.open_radius > 0 {
            open(&mask, Norm::LInf, self.open_radius)
        } else {
            mask
        };

        let contours = find_contours::<i32>(&mask);
        let largest = largest_outer_contour(&contours)?;
        let points: Vec<Vector2> = largest
            .points
            .iter()
            .map(|p| Vector2::new(p.x as f64, p.y as f64))
            .collect();
        let circle = min_enclosing_circle(&points)?;
        accept_circle(circle, self.min_radius_px)
    }
}

/// Turn an enclosing circle into a detection if its radius is strictly larger than
/// `min_radius_px`.
pub fn accept_circle(circle: Circle, min_radius_px: f64) -> Option<Detection> {
    if circle.radius > min_radius_px {
        Some(Detection {
            center: circle.center,
            radius: circle.radius,
        })
    } else {
        None
    }
}

/// Outermost contour with the largest area. Ties go to the first contour found.
fn largest_outer_contour(contours: &[Contour<i32>]) -> Option<&Contour<i32>> {
    contours
        .iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .map(|c| (c, contour_area(&c.points).abs()))
        .fold(None, |best: Option<(&Contour<i32>, f64)>, (contour, area)| match best {
            Some((_, best_area)) if area <= best_area => best,
            _ => Some((contour, area)),
        })
        .map(|(contour, _)| contour)
}
