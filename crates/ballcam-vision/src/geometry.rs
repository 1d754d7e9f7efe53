use ballcam_core::Vector2;
use rand::seq::SliceRandom;

const EPS: f64 = 1e-9;

/// A circle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Vector2,
    pub radius: f64,
}

impl Circle {
    fn point(p: Vector2) -> Self {
        Circle {
            center: p,
            radius: 0.0,
        }
    }

    fn with_diameter(a: Vector2, b: Vector2) -> Self {
        Circle {
            center: (a + b) / 2.0,
            radius: (a - b).norm() / 2.0,
        }
    }

    /// Circle through three points, `None` if they are collinear.
    fn through(a: Vector2, b: Vector2, c: Vector2) -> Option<Self> {
        let ab = b - a;
        let ac = c - a;
        let d = 2.0 * (ab.x * ac.y - ab.y * ac.x);
        if d.abs() < EPS {
            return None;
        }
        let ab2 = ab.norm_squared();
        let ac2 = ac.norm_squared();
        let offset = Vector2::new(
            (ac.y * ab2 - ab.y * ac2) / d,
            (ab.x * ac2 - ac.x * ab2) / d,
        );
        Some(Circle {
            center: a + offset,
            radius: offset.norm(),
        })
    }

    /// Smallest circle that has all three points on or inside it, given that `a` and `b`
    /// lie on its border.
    fn enclosing3(a: Vector2, b: Vector2, c: Vector2) -> Self {
        match Circle::through(a, b, c) {
            Some(circle) => circle,
            None => [
                Circle::with_diameter(a, b),
                Circle::with_diameter(a, c),
                Circle::with_diameter(b, c),
            ]
            .into_iter()
            .fold(Circle::point(a), |widest, circle| {
                if circle.radius > widest.radius {
                    circle
                } else {
                    widest
                }
            }),
        }
    }

    pub fn contains(&self, p: &Vector2) -> bool {
        (p - self.center).norm() <= self.radius + EPS * self.radius.max(1.0)
    }
}

/// Smallest circle enclosing all `points` (Welzl's algorithm, iterative form).
///
/// Returns `None` for an empty slice.
pub fn min_enclosing_circle(points: &[Vector2]) -> Option<Circle> {
    let mut points = points.to_vec();
    // Contour points come in border order, which is the worst case for the
    // incremental construction.
    points.shuffle(&mut rand::thread_rng());

    let first = *points.first()?;
    let mut circle = Circle::point(first);
    for i in 1..points.len() {
        if circle.contains(&points[i]) {
            continue;
        }
        circle = Circle::point(points[i]);
        for j in 0..i {
            if circle.contains(&points[j]) {
                continue;
            }
            circle = Circle::with_diameter(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(&points[k]) {
                    circle = Circle::enclosing3(points[i], points[j], points[k]);
                }
            }
        }
    }
    Some(circle)
}
