//! Point-in-polygon (even-odd ray casting)

use crate::types::Coordinate;

/// Returns true when the point lies inside the polygon.
///
/// The vertex list is closed implicitly: the last vertex connects back to the
/// first. A horizontal ray at the point's latitude is cast and every edge it
/// crosses toggles the result. Points exactly on an edge or vertex may land on
/// either side.
pub fn point_in_polygon(latitude: f64, longitude: f64, vertices: &[Coordinate]) -> bool {
    if vertices.is_empty() {
        return false;
    }

    let x = longitude;
    let y = latitude;
    let mut inside = false;
    let mut j = vertices.len() - 1;

    for (i, vi) in vertices.iter().enumerate() {
        let vj = &vertices[j];
        let (xi, yi) = (vi.longitude, vi.latitude);
        let (xj, yj) = (vj.longitude, vj.latitude);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}
