mod esc;
mod settings;
mod tracking;

pub use esc::*;
pub use settings::*;
pub use tracking::*;

pub type Vector2 = nalgebra::Vector2<f64>;

use serde::{Deserialize, Serialize};

/// A colour in the 8-bit HSV convention used by the calibration constants:
/// hue in `0..180` (degrees halved), saturation and value in `0..=255`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

impl From<(u8, u8, u8)> for Hsv {
    fn from((h, s, v): (u8, u8, u8)) -> Self {
        Self { h, s, v }
    }
}

/// An inclusive box in HSV space. A pixel is inside when every channel lies between the
/// corresponding lower and upper bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, color: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&color.h)
            && (self.lower.s..=self.upper.s).contains(&color.s)
            && (self.lower.v..=self.upper.v).contains(&color.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_inclusive() {
        let range = HsvRange::new(Hsv::new(35, 100, 50), Hsv::new(50, 255, 150));
        assert!(range.contains(Hsv::new(35, 100, 50)));
        assert!(range.contains(Hsv::new(50, 255, 150)));
        assert!(range.contains(Hsv::new(42, 200, 120)));
        assert!(!range.contains(Hsv::new(34, 200, 120)));
        assert!(!range.contains(Hsv::new(42, 99, 120)));
        assert!(!range.contains(Hsv::new(42, 200, 151)));
    }
}
