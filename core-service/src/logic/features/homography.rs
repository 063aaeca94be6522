//! Image -> ground plane projection

use super::geometry::Point;

/// Row-major 3x3 matrix
pub type Homography = [[f64; 3]; 3];

/// Project an image point. A point at infinity (w == 0) maps to the origin.
pub fn apply_homography(x: f64, y: f64, h: &Homography) -> Point {
    let px = h[0][0] * x + h[0][1] * y + h[0][2];
    let py = h[1][0] * x + h[1][1] * y + h[1][2];
    let w = h[2][0] * x + h[2][1] * y + h[2][2];

    if w == 0.0 {
        return (0.0, 0.0);
    }
    (px / w, py / w)
}

/// Like [`apply_homography`] but drops non-finite results
pub fn project(point: Point, h: &Homography) -> Option<Point> {
    let (x, y) = apply_homography(point.0, point.1, h);
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: Homography = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[test]
    fn test_identity_and_scale() {
        assert_eq!(apply_homography(3.0, 4.0, &IDENTITY), (3.0, 4.0));

        let scaled = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        assert_eq!(apply_homography(3.0, 4.0, &scaled), (1.5, 2.0));
    }

    #[test]
    fn test_point_at_infinity() {
        let h = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        assert_eq!(apply_homography(3.0, 4.0, &h), (0.0, 0.0));
    }

    #[test]
    fn test_project_drops_nan() {
        let h = [[f64::NAN, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(project((1.0, 1.0), &h), None);
        assert_eq!(project((1.0, 1.0), &IDENTITY), Some((1.0, 1.0)));
    }
}
