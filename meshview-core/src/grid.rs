//! Reference grid drawn on the three coordinate planes

use nalgebra::Point3;

pub type Segment = (Point3<f64>, Point3<f64>);

/// Line segments of a `size` x `size` grid with `divisions` cells per side on
/// each of the XY, XZ and YZ planes through the origin.
pub fn grid_lines(size: f64, divisions: u32) -> Vec<Segment> {
    if divisions == 0 || size <= 0.0 {
        return Vec::new();
    }

    let half = size / 2.0;
    let step = size / divisions as f64;
    // (a, b) are the in-plane axes; the third coordinate stays 0
    let planes = [(0usize, 1usize), (0, 2), (1, 2)];
    let mut segments = Vec::with_capacity(planes.len() * 2 * (divisions as usize + 1));

    for (a, b) in planes {
        let point = |u: f64, v: f64| {
            let mut p = Point3::origin();
            p[a] = u;
            p[b] = v;
            p
        };
        for i in 0..=divisions {
            let pos = -half + i as f64 * step;
            segments.push((point(-half, pos), point(half, pos)));
            segments.push((point(pos, -half), point(pos, half)));
        }
    }

    segments
}
