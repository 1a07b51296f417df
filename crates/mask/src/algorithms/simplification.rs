use annokit_common::Point;
use geo_types::{Coord, LineString};

use crate::traits::ShapeSimplifier;

/// Distance from `point` to the infinite line through `start` and `end`.
///
/// A zero-length chord has no direction; every point counts as on it.
pub fn perpendicular_distance(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return 0.0;
    }
    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    point.distance_to(Point::new(start.x + t * dx, start.y + t * dy))
}

/// Distance from `point` to the closed segment `start`-`end`.
pub fn segment_distance(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return point.distance_to(start);
    }
    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    point.distance_to(Point::new(start.x + t * dx, start.y + t * dy))
}

/// Douglas-Peucker measuring against the chord line.
///
/// With `close_ring` set, the input is a closed contour: it is split at the
/// point farthest from its first point and both halves are reduced, the second
/// one running back to the first point. Vertices at either end of the result
/// that sit on the closing edge are then dropped. Without `close_ring` the
/// input is reduced as an open walk.
#[derive(Debug, Clone)]
pub struct DouglasPeuckerSimplifier {
    pub close_ring: bool,
}

impl Default for DouglasPeuckerSimplifier {
    fn default() -> Self {
        Self { close_ring: true }
    }
}

impl DouglasPeuckerSimplifier {
    fn reduce(points: &[Point], tolerance: f64) -> Vec<Point> {
        if points.len() <= 2 {
            return points.to_vec();
        }

        let last = points.len() - 1;
        let mut keep = vec![false; points.len()];
        keep[0] = true;
        keep[last] = true;

        let mut stack = vec![(0, last)];
        while let Some((first, end)) = stack.pop() {
            let mut max_dist = 0.0;
            let mut max_index = first;
            for i in first + 1..end {
                let dist = perpendicular_distance(points[i], points[first], points[end]);
                if dist > max_dist {
                    max_dist = dist;
                    max_index = i;
                }
            }

            if max_dist > tolerance {
                keep[max_index] = true;
                stack.push((first, max_index));
                stack.push((max_index, end));
            }
        }

        points
            .iter()
            .zip(keep)
            .filter_map(|(&point, kept)| kept.then_some(point))
            .collect()
    }

    fn reduce_ring(points: &[Point], tolerance: f64) -> Vec<Point> {
        if points.len() <= 3 {
            return points.to_vec();
        }

        let seed = points[0];
        let (far, _) = points
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, 0.0), |(best, best_dist), (i, point)| {
                let dist = point.distance_to(seed);
                if dist > best_dist { (i, dist) } else { (best, best_dist) }
            });
        if far == 0 {
            return vec![seed];
        }

        let mut ring = Self::reduce(&points[..=far], tolerance);
        let mut back_half = points[far..].to_vec();
        back_half.push(seed);
        let back = Self::reduce(&back_half, tolerance);
        // Drop the shared split point and the repeated seed.
        ring.extend_from_slice(&back[1..back.len() - 1]);
        ring
    }

    fn close(mut ring: Vec<Point>, tolerance: f64) -> Vec<Point> {
        while ring.len() > 3 {
            let n = ring.len();
            if segment_distance(ring[n - 1], ring[n - 2], ring[0]) > tolerance {
                break;
            }
            ring.pop();
        }
        while ring.len() > 3 {
            let n = ring.len();
            if segment_distance(ring[0], ring[n - 1], ring[1]) > tolerance {
                break;
            }
            ring.remove(0);
        }
        ring
    }
}

impl ShapeSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, points: &[Point], tolerance: f64) -> Vec<Point> {
        if self.close_ring {
            Self::close(Self::reduce_ring(points, tolerance), tolerance)
        } else {
            Self::reduce(points, tolerance)
        }
    }
}

/// Ramer-Douglas-Peucker from the geo crate, which measures against segments.
#[derive(Debug, Clone, Default)]
pub struct GeoSimplifier;

impl ShapeSimplifier for GeoSimplifier {
    fn simplify(&self, points: &[Point], tolerance: f64) -> Vec<Point> {
        use geo::Simplify;

        let line: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        line.simplify(&tolerance)
            .coords()
            .map(|c| Point::new(c.x, c.y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::BoundaryTraceExtractor, traits::ContourExtractor, types::BinaryMask};

    fn traced_rectangle(x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<Point> {
        let mut mask = BinaryMask::new(x1 + 5, y1 + 5);
        mask.fill_rect(x0, y0, x1, y1);
        BoundaryTraceExtractor::default()
            .extract_contours(&mask)
            .remove(0)
    }

    #[test]
    fn test_perpendicular_distance() {
        let d = perpendicular_distance(Point::new(5.0, 3.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(d, 3.0);
        // Beyond the chord end the infinite line still applies.
        let d = perpendicular_distance(Point::new(20.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(d, 4.0);
        let d = perpendicular_distance(Point::new(7.0, 7.0), Point::new(1.0, 1.0), Point::new(1.0, 1.0));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_segment_distance_clamps_to_endpoints() {
        let d = segment_distance(Point::new(13.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn test_collinear_points_collapse() {
        let line: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 0.0)).collect();
        let simplified = DouglasPeuckerSimplifier { close_ring: false }.simplify(&line, 1.0);
        assert_eq!(simplified, vec![Point::new(0.0, 0.0), Point::new(9.0, 0.0)]);
    }

    #[test]
    fn test_rectangle_reduces_to_corners() {
        for tolerance in [1.0, 2.0, 3.5] {
            let contour = traced_rectangle(3, 4, 30, 20);
            let simplified = DouglasPeuckerSimplifier::default().simplify(&contour, tolerance);

            assert_eq!(simplified.len(), 4, "tolerance {tolerance}: {simplified:?}");
            for corner in [
                Point::new(3.0, 4.0),
                Point::new(30.0, 4.0),
                Point::new(30.0, 20.0),
                Point::new(3.0, 20.0),
            ] {
                assert!(simplified.contains(&corner), "missing {corner:?}");
            }
        }
    }

    #[test]
    fn test_small_rectangles_keep_all_corners() {
        for (x1, y1, tolerance) in [(3, 3, 2.0), (9, 9, 6.0), (3, 3, 1.0)] {
            let contour = traced_rectangle(0, 0, x1, y1);
            let simplified = DouglasPeuckerSimplifier::default().simplify(&contour, tolerance);

            let (w, h) = (x1 as f64, y1 as f64);
            assert_eq!(
                simplified,
                vec![
                    Point::new(w, h),
                    Point::new(0.0, h),
                    Point::new(0.0, 0.0),
                    Point::new(w, 0.0),
                ],
                "{}x{} at tolerance {tolerance}",
                x1 + 1,
                y1 + 1
            );
        }
    }

    #[test]
    fn test_open_walk_keeps_trailing_vertex() {
        let contour = traced_rectangle(3, 4, 30, 20);
        let simplified = DouglasPeuckerSimplifier { close_ring: false }.simplify(&contour, 2.0);
        assert_eq!(simplified.len(), 5);
        assert_eq!(simplified[4], Point::new(30.0, 19.0));
    }

    #[test]
    fn test_order_follows_walk() {
        let contour = traced_rectangle(3, 4, 30, 20);
        let simplified = DouglasPeuckerSimplifier::default().simplify(&contour, 2.0);
        assert_eq!(
            simplified,
            vec![
                Point::new(30.0, 20.0),
                Point::new(3.0, 20.0),
                Point::new(3.0, 4.0),
                Point::new(30.0, 4.0),
            ]
        );
    }

    #[test]
    fn test_geo_simplifier_drops_midpoints() {
        let line = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.1),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        let simplified = GeoSimplifier.simplify(&line, 1.0);
        assert_eq!(simplified.len(), 3);
    }
}
