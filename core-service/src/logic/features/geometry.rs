//! Geometry helpers for boxes and 2D points

use crate::logic::detection::BBox;

pub type Point = (f64, f64);

/// Intersection over union, 0 when both boxes are degenerate
pub fn iou(a: &BBox, b: &BBox) -> f64 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.w).min(b.x + b.w);
    let y2 = (a.y + a.h).min(b.y + b.h);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;
    if union == 0.0 {
        return 0.0;
    }
    intersection / union
}

pub fn euclidean_distance(p1: Point, p2: Point) -> f64 {
    (p1.0 - p2.0).hypot(p1.1 - p2.1)
}

/// Pixels per second; 0 for a non-positive interval
pub fn speed(p1: Point, p2: Point, delta_secs: f64) -> f64 {
    if delta_secs <= 0.0 {
        return 0.0;
    }
    euclidean_distance(p1, p2) / delta_secs
}

/// Movement direction in degrees (0 = +x, 90 = +y)
pub fn direction_degrees(from: Point, to: Point) -> f64 {
    (to.1 - from.1).atan2(to.0 - from.0).to_degrees()
}

/// Ray casting. Points exactly on an edge may land either way.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let (x, y) = point;
    let n = polygon.len();
    let mut inside = false;

    for i in 0..n {
        let (x1, y1) = polygon[i];
        let (x2, y2) = polygon[(i + 1) % n];
        if (y1 > y) != (y2 > y) {
            let x_intersect = (x2 - x1) * (y - y1) / (y2 - y1 + 1e-9) + x1;
            if x < x_intersect {
                inside = !inside;
            }
        }
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(&a, &a), 1.0);
        let b = BBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(iou(&a, &BBox::new(20.0, 20.0, 5.0, 5.0)), 0.0);
        assert_eq!(iou(&BBox::default(), &BBox::default()), 0.0);
    }

    #[test]
    fn test_speed() {
        assert_eq!(speed((0.0, 0.0), (3.0, 4.0), 0.5), 10.0);
        assert_eq!(speed((0.0, 0.0), (3.0, 4.0), 0.0), 0.0);
        assert_eq!(speed((0.0, 0.0), (3.0, 4.0), -1.0), 0.0);
    }

    #[test]
    fn test_direction() {
        assert_eq!(direction_degrees((0.0, 0.0), (1.0, 0.0)), 0.0);
        assert!((direction_degrees((0.0, 0.0), (0.0, 1.0)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!(point_in_polygon((5.0, 5.0), &square));
        assert!(!point_in_polygon((15.0, 5.0), &square));
        assert!(!point_in_polygon((5.0, -1.0), &square));
        assert!(!point_in_polygon((5.0, 5.0), &[]));
    }
}
