use annokit_common::Point;

use crate::{
    traits::ContourExtractor,
    types::{BinaryMask, Contour},
};

/// Neighbour scan order: E, SE, S, SW, W, NW, N, NE.
const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Greedy 8-connected walk over boundary pixels.
///
/// Seeds are taken from the end of the row-major boundary list, so tracing
/// starts at the bottom-right of the mask. Each walk steps to the first
/// unvisited boundary neighbour in [`NEIGHBOURS`] order and stops when none
/// is left. Walks shorter than `min_points` are dropped as noise.
#[derive(Debug, Clone)]
pub struct BoundaryTraceExtractor {
    pub min_points: usize,
}

impl Default for BoundaryTraceExtractor {
    fn default() -> Self {
        Self { min_points: 10 }
    }
}

impl BoundaryTraceExtractor {
    fn boundary_pixels(mask: &BinaryMask) -> Vec<(i64, i64)> {
        let mut pixels = Vec::new();
        for y in 0..mask.height() as i64 {
            for x in 0..mask.width() as i64 {
                if mask.is_boundary(x, y) {
                    pixels.push((x, y));
                }
            }
        }
        pixels
    }
}

impl ContourExtractor for BoundaryTraceExtractor {
    fn extract_contours(&self, mask: &BinaryMask) -> Vec<Contour> {
        let width = mask.width() as usize;
        let mut visited = vec![false; width * mask.height() as usize];
        let index = |x: i64, y: i64| y as usize * width + x as usize;

        let mut seeds = Self::boundary_pixels(mask);
        let mut contours = Vec::new();

        while let Some((sx, sy)) = seeds.pop() {
            if visited[index(sx, sy)] {
                continue;
            }
            visited[index(sx, sy)] = true;

            let mut contour = vec![Point::new(sx as f64, sy as f64)];
            let (mut cx, mut cy) = (sx, sy);

            loop {
                let next = NEIGHBOURS.iter().map(|(dx, dy)| (cx + dx, cy + dy)).find(
                    |&(nx, ny)| mask.is_boundary(nx, ny) && !visited[index(nx, ny)],
                );
                let Some((nx, ny)) = next else {
                    break;
                };
                visited[index(nx, ny)] = true;
                contour.push(Point::new(nx as f64, ny as f64));
                (cx, cy) = (nx, ny);
            }

            if contour.len() >= self.min_points {
                contours.push(contour);
            }
        }

        contours
    }
}

/// Longest contour; the first one wins a tie.
pub fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
    contours
        .into_iter()
        .reduce(|best, next| if next.len() > best.len() { next } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_walk_covers_perimeter() {
        let mut mask = BinaryMask::new(20, 20);
        mask.fill_rect(4, 5, 13, 12);

        let contours = BoundaryTraceExtractor::default().extract_contours(&mask);
        assert_eq!(contours.len(), 1);

        let contour = &contours[0];
        // 10 wide, 8 tall: 2 * (10 + 8) - 4 perimeter pixels.
        assert_eq!(contour.len(), 32);
        assert_eq!(contour[0], Point::new(13.0, 12.0));
        assert_eq!(contour[1], Point::new(12.0, 12.0));
    }

    #[test]
    fn test_small_blobs_are_noise() {
        let mut mask = BinaryMask::new(10, 10);
        mask.fill_rect(1, 1, 2, 2);
        assert!(BoundaryTraceExtractor::default().extract_contours(&mask).is_empty());
    }

    #[test]
    fn test_empty_mask_has_no_contours() {
        let mask = BinaryMask::new(8, 8);
        assert!(BoundaryTraceExtractor::default().extract_contours(&mask).is_empty());
    }

    #[test]
    fn test_mask_edge_pixels_are_boundary() {
        let mut mask = BinaryMask::new(6, 6);
        mask.fill_rect(0, 0, 5, 5);

        let contours = BoundaryTraceExtractor::default().extract_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 20);
    }

    #[test]
    fn test_largest_contour_prefers_first_on_tie() {
        let a = vec![Point::new(0.0, 0.0); 3];
        let b = vec![Point::new(1.0, 1.0); 3];
        let c = vec![Point::new(2.0, 2.0); 2];
        assert_eq!(largest_contour(vec![a.clone(), b, c]), Some(a));
        assert_eq!(largest_contour(vec![]), None);
    }
}
