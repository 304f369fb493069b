use rand::Rng;
use std::f64::consts::{PI, TAU};

/// A point in world space with a heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, rotation: f64) -> Self {
        Self { x, y, rotation }
    }

    /// Same position, different heading.
    pub fn facing(self, rotation: f64) -> Self {
        Self { rotation, ..self }
    }

    /// Points at the origin or with non-finite coordinates are never handed
    /// to the interpolator.
    pub fn is_degenerate(&self) -> bool {
        !self.x.is_finite() || !self.y.is_finite() || (self.x == 0.0 && self.y == 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        assert!(left <= right, "bounding box left {left} is greater than right {right}");
        assert!(top <= bottom, "bounding box top {top} is greater than bottom {bottom}");
        Self { left, right, top, bottom }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// Folds an out-of-range point back inside by mirroring across the edges.
    /// Points far outside bounce repeatedly until they land in range.
    pub fn reflect(&self, location: Location) -> Location {
        Location {
            x: fold(location.x, self.left, self.right),
            y: fold(location.y, self.top, self.bottom),
            rotation: location.rotation,
        }
    }
}

fn fold(value: f64, low: f64, high: f64) -> f64 {
    if !value.is_finite() {
        return low;
    }
    if value >= low && value <= high {
        return value;
    }
    let span = high - low;
    if span <= 0.0 {
        return low;
    }
    let period = span * 2.0;
    let offset = (value - low).rem_euclid(period);
    if offset > span {
        low + (period - offset)
    } else {
        low + offset
    }
}

/// Canonicalizes any radian value into `(-π, π]`.
pub fn unwrap(rotation: f64) -> f64 {
    let angle = rotation.rem_euclid(TAU);
    if angle > PI {
        angle - TAU
    } else {
        angle
    }
}

/// Bearing from `from` to `to`, or `None` when the two points coincide.
pub fn bearing(from: &Location, to: &Location) -> Option<f64> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if (dx == 0.0 && dy == 0.0) || !dx.is_finite() || !dy.is_finite() {
        None
    } else {
        Some(dy.atan2(dx))
    }
}

/// Bearing from `a` to `b`. A missing endpoint falls back to the other's own
/// heading; with both missing the result is 0.
pub fn angle(a: Option<&Location>, b: Option<&Location>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => bearing(a, b).unwrap_or(a.rotation),
        (Some(only), None) | (None, Some(only)) => only.rotation,
        (None, None) => 0.0,
    }
}

/// Signed shortest turn from heading `a` to heading `b`, in `(-π, π]`.
pub fn rotation_diff(a: f64, b: f64) -> f64 {
    unwrap(b - a)
}

/// Signed turn `from` would need to face `to`. Coincident points need none.
pub fn heading_diff(from: &Location, to: &Location) -> f64 {
    match bearing(from, to) {
        Some(b) => rotation_diff(from.rotation, b),
        None => 0.0,
    }
}

/// Unsigned angle between `from`'s heading and the bearing to `to`.
pub fn rotation_diff_abs(from: &Location, to: &Location) -> f64 {
    heading_diff(from, to).abs()
}

/// Heading halfway between `a` and `b` along the shorter arc.
pub fn angular_midpoint(a: f64, b: f64) -> f64 {
    unwrap(a + rotation_diff(a, b) / 2.0)
}

pub fn distance(a: &Location, b: &Location) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Point `magnitude` units ahead along `start.rotation`.
pub fn target_point(start: &Location, magnitude: f64) -> Location {
    Location {
        x: start.x + magnitude * start.rotation.cos(),
        y: start.y + magnitude * start.rotation.sin(),
        rotation: start.rotation,
    }
}

/// Like [`target_point`], with the heading first jittered by up to
/// `±jitter / 2` radians.
pub fn jittered_target_point<R: Rng + ?Sized>(
    start: &Location,
    magnitude: f64,
    jitter: f64,
    rng: &mut R,
) -> Location {
    let rotation = unwrap(start.rotation + (rng.gen::<f64>() - 0.5) * jitter);
    target_point(&start.facing(rotation), magnitude)
}

/// Whether `agent` overlaps a circular target of `radius`.
pub fn hit(agent: &Location, target: &Location, radius: f64) -> bool {
    distance(agent, target) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DEG: f64 = PI / 180.0;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn unwrap_whole_turns() {
        assert_eq!(unwrap(0.0), 0.0);
        assert!(close(unwrap(PI), PI, 1e-12));
        assert!(close(unwrap(TAU), 0.0, 1e-12));
        assert!(close(unwrap(3.0 * PI), PI, 1e-9));
        assert!(close(unwrap(4.0 * PI), 0.0, 1e-9));
    }

    #[test]
    fn unwrap_negative_and_positive_overflow() {
        assert!(close(unwrap(-1.0), -1.0, 1e-12));
        assert!(close(unwrap(-DEG), -DEG, 1e-9));
        assert!(close(unwrap(-181.0 * DEG), 179.0 * DEG, 1e-9));
        assert!(close(unwrap(181.0 * DEG), -179.0 * DEG, 1e-9));
        assert!(close(unwrap(721.0 * DEG), DEG, 1e-9));
        assert!(close(unwrap(541.0 * DEG), -179.0 * DEG, 1e-9));
    }

    #[test]
    fn unwrap_is_periodic_and_in_range() {
        for i in -50..50 {
            let r = i as f64 * 0.37;
            let u = unwrap(r);
            assert!(u > -PI && u <= PI, "{r} unwrapped to {u}");
            for k in -3..=3 {
                assert!(close(unwrap(r + TAU * k as f64), u, 1e-9));
            }
        }
        assert_eq!(unwrap(-PI), PI);
    }

    #[test]
    fn rotation_diff_abs_right_angles() {
        let ant = Location::new(100.0, 100.0, 0.0);
        assert!(close(rotation_diff_abs(&ant, &Location::new(100.0, 200.0, 0.0)), 90.0 * DEG, 1e-9));
        assert!(close(rotation_diff_abs(&ant, &Location::new(100.0, 0.0, 0.0)), 90.0 * DEG, 1e-9));
    }

    #[test]
    fn rotation_diff_abs_nearly_behind() {
        let ant = Location::new(100.0, 100.0, 0.0);
        let expected = 179.42 * DEG;
        assert!(close(rotation_diff_abs(&ant, &Location::new(0.0, 99.0, 0.0)), expected, 0.005));
        assert!(close(rotation_diff_abs(&ant, &Location::new(0.0, 101.0, 0.0)), expected, 0.005));
    }

    #[test]
    fn rotation_diff_abs_across_the_wrap() {
        let other = Location::new(0.0, 101.0, 0.0);
        assert!(close(rotation_diff_abs(&Location::new(100.0, 100.0, PI), &Location::new(0.0, 100.0, 0.0)), 0.0, 0.005));
        assert!(close(rotation_diff_abs(&Location::new(100.0, 100.0, PI), &other), 0.0099, 0.0005));
        assert!(close(rotation_diff_abs(&Location::new(100.0, 100.0, -179.42 * DEG), &other), 0.0201, 0.0005));
    }

    #[test]
    fn heading_diff_is_signed() {
        let ant = Location::new(100.0, 100.0, 0.0);
        assert!(close(heading_diff(&ant, &Location::new(100.0, 200.0, 0.0)), 90.0 * DEG, 1e-9));
        assert!(close(heading_diff(&ant, &Location::new(100.0, 0.0, 0.0)), -90.0 * DEG, 1e-9));
        let flipped = Location::new(100.0, 100.0, -179.42 * DEG);
        assert!(close(heading_diff(&flipped, &Location::new(0.0, 101.0, 0.0)), -0.0201, 0.0005));
    }

    #[test]
    fn angle_fallbacks() {
        let a = Location::new(0.0, 0.0, 1.25);
        let b = Location::new(10.0, 10.0, -0.5);
        assert!(close(angle(Some(&a), Some(&b)), PI / 4.0, 1e-12));
        assert_eq!(angle(Some(&a), None), 1.25);
        assert_eq!(angle(None, Some(&b)), -0.5);
        assert_eq!(angle(None, None), 0.0);
        assert_eq!(angle(Some(&a), Some(&a.facing(3.0))), 1.25);
    }

    #[test]
    fn midpoint_takes_the_short_way_round() {
        assert!(close(angular_midpoint(0.0, PI / 2.0), PI / 4.0, 1e-12));
        let mid = angular_midpoint(170.0 * DEG, -170.0 * DEG);
        assert!(close(mid.abs(), PI, 1e-9));
    }

    #[test]
    fn reflect_mirrors_instead_of_clamping() {
        let bounds = BoundingBox::new(0.0, 100.0, 0.0, 50.0);
        let r = bounds.reflect(Location::new(-10.0, 60.0, 0.3));
        assert!(close(r.x, 10.0, 1e-12));
        assert!(close(r.y, 40.0, 1e-12));
        assert_eq!(r.rotation, 0.3);

        let far = bounds.reflect(Location::new(350.0, -120.0, 0.0));
        assert!(bounds.contains(far.x, far.y));
        assert!(close(far.x, 50.0, 1e-9));
        assert!(close(far.y, 20.0, 1e-9));
    }

    #[test]
    fn target_point_projects_along_heading() {
        let p = target_point(&Location::new(10.0, 10.0, PI / 2.0), 5.0);
        assert!(close(p.x, 10.0, 1e-9));
        assert!(close(p.y, 15.0, 1e-9));

        let mut rng = StdRng::seed_from_u64(7);
        let start = Location::new(0.0, 0.0, 0.0);
        for _ in 0..100 {
            let j = jittered_target_point(&start, 10.0, 0.5, &mut rng);
            assert!(j.rotation.abs() <= 0.25 + 1e-12);
            assert!(close(distance(&start, &j), 10.0, 1e-9));
        }
    }

    #[test]
    fn hit_is_inclusive() {
        let food = Location::new(50.0, 50.0, 0.0);
        assert!(hit(&Location::new(53.0, 54.0, 0.0), &food, 5.0));
        assert!(!hit(&Location::new(56.0, 54.0, 0.0), &food, 5.0));
    }

    #[test]
    fn degenerate_points() {
        assert!(Location::new(0.0, 0.0, 1.0).is_degenerate());
        assert!(Location::new(f64::NAN, 10.0, 0.0).is_degenerate());
        assert!(Location::new(10.0, f64::INFINITY, 0.0).is_degenerate());
        assert!(Location::new(f64::NEG_INFINITY, 0.0, 0.0).is_degenerate());
        assert!(!Location::new(0.0, 10.0, 0.0).is_degenerate());
        assert!(!Location::new(10.0, 0.0, f64::NAN).is_degenerate());
    }
}
