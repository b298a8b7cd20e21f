// src/motion/path.rs - Straight-line waypoint generation
use crate::geometry::Point2;

/// `steps` evenly spaced points from `start` to `target`, both included,
/// computed as they are consumed.
///
/// A single step goes straight to the target. Returns `None` for zero steps.
pub fn linear_waypoints(
    start: Point2,
    target: Point2,
    steps: usize,
) -> Option<impl ExactSizeIterator<Item = Point2> + DoubleEndedIterator> {
    let last = steps.checked_sub(1)?;
    Some((0..steps).map(move |i| {
        // land exactly on the target rather than on a rounded lerp
        if i == last {
            target
        } else {
            start.lerp(&target, i as f64 / last as f64)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_steps() {
        assert!(linear_waypoints(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), 0).is_none());
    }

    #[test]
    fn test_single_step_goes_to_target() {
        let points: Vec<Point2> =
            linear_waypoints(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0), 1).unwrap().collect();
        assert_eq!(points, vec![Point2::new(3.0, 4.0)]);
    }

    #[test]
    fn test_even_spacing_includes_both_ends() {
        let start = Point2::new(-40.0, 20.0);
        let target = Point2::new(-40.0, 140.0);
        let points: Vec<Point2> = linear_waypoints(start, target, 7).unwrap().collect();
        assert_eq!(points.len(), 7);
        assert_eq!(points[0], start);
        assert_eq!(points[6], target);
        for (i, p) in points.iter().enumerate() {
            assert!((p.y - (20.0 + 20.0 * i as f64)).abs() < 1e-9);
            assert_eq!(p.x, -40.0);
        }
    }

    #[test]
    fn test_huge_step_count_is_lazy() {
        let start = Point2::new(0.0, 20.0);
        let target = Point2::new(10.0, 40.0);
        let mut points = linear_waypoints(start, target, usize::MAX).unwrap();
        assert_eq!(points.len(), usize::MAX);
        assert_eq!(points.next(), Some(start));
        assert_eq!(points.next_back(), Some(target));
        assert_eq!(points.len(), usize::MAX - 2);
    }
}
