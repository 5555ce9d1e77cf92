//! Enclosed area of a closed cursor path.
//!
//! Cursor paths self-intersect routinely, and the signed shoelace sum lets
//! opposite-winding lobes cancel (a figure-eight would report zero). The
//! area here is the one a plotted path visually encloses: the closed walk is
//! split at every segment crossing, decomposed into simple loops, and the
//! absolute area of each loop is summed.

use nalgebra::Point2;
use std::collections::HashMap;

const EPSILON: f64 = 1e-12;
/// Grid used to match revisited vertices; trajectory coordinates are
/// height-normalized, so 1e-9 is far below any real cursor resolution.
const QUANTUM: f64 = 1e-9;

/// Area enclosed by the path, with the closing edge from the last point back
/// to the first implied. Tolerates self-intersection; 0 for fewer than three
/// distinct points.
pub fn enclosed_area(path: &[Point2<f64>]) -> f64 {
    let ring = dedup_ring(path);
    if ring.len() < 3 {
        return 0.0;
    }
    let walk = split_at_crossings(&ring);

    let mut area = 0.0;
    let mut stack: Vec<Point2<f64>> = Vec::new();
    let mut open: HashMap<(i64, i64), usize> = HashMap::new();
    for point in walk {
        let key = quantize(point);
        if let Some(&start) = open.get(&key) {
            // Revisited vertex: everything since the first visit is a
            // simple loop.
            if stack.len() - start >= 3 {
                area += shoelace_abs(&stack[start..]);
            }
            for removed in &stack[start + 1..] {
                open.remove(&quantize(*removed));
            }
            stack.truncate(start + 1);
        } else {
            open.insert(key, stack.len());
            stack.push(point);
        }
    }
    if stack.len() >= 3 {
        area += shoelace_abs(&stack);
    }
    area
}

/// Perimeter of the same closed construction.
pub fn closed_path_length(path: &[Point2<f64>]) -> f64 {
    let open_length: f64 = path
        .windows(2)
        .map(|pair| nalgebra::distance(&pair[0], &pair[1]))
        .sum();
    match (path.first(), path.last()) {
        (Some(first), Some(last)) if path.len() > 1 => {
            open_length + nalgebra::distance(last, first)
        }
        _ => open_length,
    }
}

fn quantize(p: Point2<f64>) -> (i64, i64) {
    ((p.x / QUANTUM).round() as i64, (p.y / QUANTUM).round() as i64)
}

fn dedup_ring(path: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut ring: Vec<Point2<f64>> = Vec::with_capacity(path.len());
    for &p in path {
        if ring
            .last()
            .map_or(true, |last| nalgebra::distance(last, &p) > EPSILON)
        {
            ring.push(p);
        }
    }
    // The closing edge is implied; drop an explicit repeat of the start.
    while ring.len() > 1
        && nalgebra::distance(ring.last().unwrap(), &ring[0]) <= EPSILON
    {
        ring.pop();
    }
    ring
}

/// Rewrites the ring so every pairwise segment crossing appears as an
/// explicit vertex on both segments involved.
fn split_at_crossings(ring: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let n = ring.len();
    let segment = |i: usize| (ring[i], ring[(i + 1) % n]);

    let mut splits: Vec<Vec<(f64, Point2<f64>)>> = vec![Vec::new(); n];
    for i in 0..n {
        let (a1, a2) = segment(i);
        for j in (i + 1)..n {
            // Neighbours share an endpoint, not a crossing.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = segment(j);
            if let Some((t, u, point)) = segment_intersection(a1, a2, b1, b2) {
                if t > EPSILON && t < 1.0 - EPSILON {
                    splits[i].push((t, point));
                }
                if u > EPSILON && u < 1.0 - EPSILON {
                    splits[j].push((u, point));
                }
            }
        }
    }

    let mut walk = Vec::with_capacity(n);
    for i in 0..n {
        walk.push(ring[i]);
        splits[i].sort_by(|a, b| a.0.total_cmp(&b.0));
        walk.extend(splits[i].iter().map(|&(_, p)| p));
    }
    walk
}

/// Proper intersection of two segments, with the parameters along each.
/// Collinear overlaps are ignored.
fn segment_intersection(
    a1: Point2<f64>,
    a2: Point2<f64>,
    b1: Point2<f64>,
    b2: Point2<f64>,
) -> Option<(f64, f64, Point2<f64>)> {
    let da = a2 - a1;
    let db = b2 - b1;
    let denom = da.x * db.y - da.y * db.x;
    if denom.abs() < EPSILON {
        return None;
    }
    let offset = b1 - a1;
    let t = (offset.x * db.y - offset.y * db.x) / denom;
    let u = (offset.x * da.y - offset.y * da.x) / denom;
    if (-EPSILON..=1.0 + EPSILON).contains(&t) && (-EPSILON..=1.0 + EPSILON).contains(&u) {
        Some((t, u, a1 + da * t))
    } else {
        None
    }
}

fn shoelace_abs(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice_area += a.x * b.y - b.x * a.y;
    }
    twice_area.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn degenerate_paths_enclose_nothing() {
        assert_eq!(enclosed_area(&[]), 0.0);
        assert_eq!(enclosed_area(&[p(0.1, 0.1)]), 0.0);
        assert_eq!(enclosed_area(&[p(0.0, 0.0), p(0.4, 0.2)]), 0.0);
    }

    #[test]
    fn unit_square() {
        let square = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        assert_relative_eq!(enclosed_area(&square), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn explicitly_closed_ring_counts_once() {
        let square = [
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 1.0),
            p(0.0, 0.0),
        ];
        assert_relative_eq!(enclosed_area(&square), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn triangle() {
        let triangle = [p(0.0, 0.0), p(2.0, 0.0), p(0.0, 2.0)];
        assert_relative_eq!(enclosed_area(&triangle), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn bowtie_lobes_add_instead_of_cancelling() {
        // Figure-eight: the signed shoelace sum of this ring is 0.
        let bowtie = [p(0.0, 0.0), p(1.0, 1.0), p(1.0, 0.0), p(0.0, 1.0)];
        assert_relative_eq!(enclosed_area(&bowtie), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn closed_length_includes_the_closing_edge() {
        let triangle = [p(0.0, 0.0), p(3.0, 0.0), p(3.0, 4.0)];
        assert_relative_eq!(closed_path_length(&triangle), 12.0, epsilon = 1e-12);
        assert_eq!(closed_path_length(&[]), 0.0);
        assert_eq!(closed_path_length(&[p(1.0, 1.0)]), 0.0);
    }
}
