//! Pure 2-D geometry used by every higher layer.

use crate::types::Coord;

/// Ray-casting point-in-polygon test.
///
/// Walks each edge `(v[j], v[i])` where `j` is the previous index and
/// toggles the inside flag on every crossing of the horizontal ray
/// from `point`. Polygons with fewer than three vertices never contain
/// any point. The result for points exactly on a polygon edge is
/// implementation-defined.
pub fn point_in_polygon(point: Coord, polygon: &[Coord]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let vi = polygon[i];
        let vj = polygon[j];
        if (vi.y > point.y) != (vj.y > point.y)
            && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Euclidean distance between two points.
pub fn distance(a: Coord, b: Coord) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Whether `b` lies strictly within `radius` of `a`.
pub fn within_radius(a: Coord, b: Coord, radius: f64) -> bool {
    distance(a, b) < radius
}
