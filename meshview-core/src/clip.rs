//! Axis-aligned cross-section planes.
//!
//! Exactly three planes exist, one per axis. They are never created or
//! destroyed, only toggled and moved. The renderer reads the derived
//! [`ClipPlaneEquation`]s of the enabled planes and never mutates them.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Unit, Vector3};
use serde::Serialize;

use crate::error::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(ViewerError::InvalidAxis(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClippingPlane {
    pub id: Axis,
    normal: Unit<Vector3<f64>>,
    pub position: Vector3<f64>,
    pub enabled: bool,
}

impl ClippingPlane {
    fn new(id: Axis) -> Self {
        Self {
            id,
            normal: id.unit(),
            position: Vector3::zeros(),
            enabled: false,
        }
    }

    pub fn normal(&self) -> Unit<Vector3<f64>> {
        self.normal
    }

    pub fn equation(&self) -> ClipPlaneEquation {
        ClipPlaneEquation {
            axis: self.id,
            normal: self.normal,
            point: Point3::from(self.position),
        }
    }
}

/// Half-space `dot(normal, p) - dot(normal, point) >= 0` that survives clipping
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipPlaneEquation {
    pub axis: Axis,
    pub normal: Unit<Vector3<f64>>,
    /// A point on the plane
    pub point: Point3<f64>,
}

impl ClipPlaneEquation {
    /// Plane constant `d` in `dot(normal, p) + d = 0`.
    pub fn constant(&self) -> f64 {
        -self.normal.dot(&self.point.coords)
    }

    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) + self.constant()
    }

    /// Whether `p` is on the visible side of the plane.
    pub fn keeps(&self, p: &Point3<f64>) -> bool {
        self.signed_distance(p) >= 0.0
    }

    /// Corners of a `size` x `size` square centered on `point` and lying in
    /// the plane, in winding order. Used for the translucent plane quad.
    pub fn quad_corners(&self, size: f64) -> [Point3<f64>; 4] {
        let n = self.normal.as_ref();
        // Any axis not parallel to the normal gives a valid tangent
        let helper = if n.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u = n.cross(&helper).normalize() * (size / 2.0);
        let v = n.cross(&u);
        [
            self.point - u - v,
            self.point + u - v,
            self.point + u + v,
            self.point - u + v,
        ]
    }
}

/// True when every active plane keeps `p`.
pub fn is_visible(planes: &[ClipPlaneEquation], p: &Point3<f64>) -> bool {
    planes.iter().all(|plane| plane.keeps(p))
}

/// The renderer-side clipping state the core pushes plane equations into.
pub trait ClipTarget {
    /// Replace the active clip set. An empty slice disables clipping.
    fn set_clip_planes(&mut self, planes: &[ClipPlaneEquation]);
}

/// The fixed x/y/z plane set
#[derive(Debug, Clone, PartialEq)]
pub struct ClippingPlaneSet {
    planes: [ClippingPlane; 3],
}

impl ClippingPlaneSet {
    pub fn new() -> Self {
        Self {
            planes: Axis::ALL.map(ClippingPlane::new),
        }
    }

    pub fn plane(&self, axis: Axis) -> &ClippingPlane {
        &self.planes[axis.index()]
    }

    pub fn planes(&self) -> &[ClippingPlane; 3] {
        &self.planes
    }

    pub fn set_enabled(&mut self, axis: Axis, enabled: bool) {
        self.planes[axis.index()].enabled = enabled;
        log::debug!("clip plane {axis} {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Replace the plane's position. Components off the plane's own axis are
    /// stored as given; they only shift the reference point within the plane.
    /// Non-finite positions are ignored.
    pub fn set_position(&mut self, axis: Axis, position: Vector3<f64>) {
        if !position.iter().all(|c| c.is_finite()) {
            log::warn!("ignoring non-finite position {position:?} for clip plane {axis}");
            return;
        }
        self.planes[axis.index()].position = position;
        log::debug!("clip plane {axis} moved to {position:?}");
    }

    /// Move the plane to `offset` along its own axis.
    pub fn set_offset(&mut self, axis: Axis, offset: f64) {
        self.set_position(axis, axis.unit().into_inner() * offset);
    }

    /// Offset of the plane along its own axis.
    pub fn offset(&self, axis: Axis) -> f64 {
        self.plane(axis).position[axis.index()]
    }

    /// Equations of the enabled planes in x, y, z order.
    pub fn active_planes(&self) -> Vec<ClipPlaneEquation> {
        self.planes
            .iter()
            .filter(|p| p.enabled)
            .map(ClippingPlane::equation)
            .collect()
    }

    pub fn reset(&mut self) {
        for plane in &mut self.planes {
            plane.enabled = false;
            plane.position = Vector3::zeros();
        }
        log::debug!("clip planes reset");
    }

    /// Push the active planes to a renderer.
    pub fn apply_to(&self, target: &mut impl ClipTarget) {
        target.set_clip_planes(&self.active_planes());
    }
}

impl Default for ClippingPlaneSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_state() {
        let set = ClippingPlaneSet::new();
        for axis in Axis::ALL {
            let plane = set.plane(axis);
            assert_eq!(plane.id, axis);
            assert!(!plane.enabled);
            assert_eq!(plane.position, Vector3::zeros());
            assert_eq!(plane.normal(), axis.unit());
        }
        assert!(set.active_planes().is_empty());
    }

    #[test]
    fn test_active_set() {
        let mut set = ClippingPlaneSet::new();
        set.set_enabled(Axis::X, true);
        set.set_position(Axis::X, Vector3::new(1.0, 0.0, 0.0));
        set.set_enabled(Axis::Y, false);
        set.set_enabled(Axis::Z, true);
        set.set_position(Axis::Z, Vector3::new(0.0, 0.0, 2.0));

        let active = set.active_planes();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].normal.into_inner(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(active[0].point, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(active[1].normal.into_inner(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(active[1].point, Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_non_finite_position_is_ignored() {
        let mut set = ClippingPlaneSet::new();
        set.set_offset(Axis::Y, 1.5);
        set.set_offset(Axis::Y, f64::NAN);
        assert_eq!(set.offset(Axis::Y), 1.5);
        set.set_offset(Axis::Y, f64::INFINITY);
        set.set_position(Axis::Y, Vector3::new(f64::NAN, 0.0, 0.0));
        assert_eq!(set.plane(Axis::Y).position, Vector3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn test_active_planes_follow_axis_order() {
        let mut set = ClippingPlaneSet::new();
        for axis in [Axis::Z, Axis::X, Axis::Y] {
            set.set_enabled(axis, true);
        }
        let axes: Vec<Axis> = set.active_planes().iter().map(|p| p.axis).collect();
        assert_eq!(axes, Axis::ALL.to_vec());
    }

    #[test]
    fn test_axis_isolation() {
        let mut set = ClippingPlaneSet::new();
        let y_before = set.plane(Axis::Y).clone();
        let z_before = set.plane(Axis::Z).clone();
        set.set_enabled(Axis::X, true);
        set.set_offset(Axis::X, 2.5);
        assert_eq!(set.plane(Axis::Y), &y_before);
        assert_eq!(set.plane(Axis::Z), &z_before);
        assert_eq!(set.offset(Axis::X), 2.5);
    }

    #[test]
    fn test_set_enabled_is_idempotent() {
        let mut set = ClippingPlaneSet::new();
        set.set_enabled(Axis::Y, true);
        let once = set.clone();
        set.set_enabled(Axis::Y, true);
        assert_eq!(set, once);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut set = ClippingPlaneSet::new();
        set.set_enabled(Axis::X, true);
        set.set_offset(Axis::Y, -1.0);
        set.reset();
        let once = set.clone();
        set.reset();
        assert_eq!(set, once);
        assert_eq!(set, ClippingPlaneSet::new());
    }

    #[test]
    fn test_axis_parsing() {
        assert_eq!("x".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!(" Z ".parse::<Axis>().unwrap(), Axis::Z);
        assert!(matches!("w".parse::<Axis>(), Err(ViewerError::InvalidAxis(s)) if s == "w"));
    }

    #[test]
    fn test_half_space() {
        let mut set = ClippingPlaneSet::new();
        set.set_enabled(Axis::X, true);
        set.set_offset(Axis::X, 1.0);
        let plane = set.active_planes()[0];
        assert_relative_eq!(plane.constant(), -1.0);
        assert!(plane.keeps(&Point3::new(1.5, 0.0, 0.0)));
        assert!(plane.keeps(&Point3::new(1.0, 9.0, 9.0)));
        assert!(!plane.keeps(&Point3::new(0.5, 0.0, 0.0)));
        assert!(!is_visible(&set.active_planes(), &Point3::origin()));
        assert!(is_visible(&[], &Point3::origin()));
    }

    #[test]
    fn test_quad_lies_in_plane() {
        for axis in Axis::ALL {
            let mut set = ClippingPlaneSet::new();
            set.set_enabled(axis, true);
            set.set_offset(axis, 0.75);
            let plane = set.active_planes()[0];
            let corners = plane.quad_corners(8.0);
            for corner in &corners {
                assert_relative_eq!(plane.signed_distance(corner), 0.0, epsilon = 1e-12);
            }
            assert_relative_eq!((corners[1] - corners[0]).norm(), 8.0, epsilon = 1e-12);
            assert_relative_eq!((corners[2] - corners[1]).norm(), 8.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_apply_to_target() {
        struct Recorder(Vec<ClipPlaneEquation>);
        impl ClipTarget for Recorder {
            fn set_clip_planes(&mut self, planes: &[ClipPlaneEquation]) {
                self.0 = planes.to_vec();
            }
        }

        let mut set = ClippingPlaneSet::new();
        set.set_enabled(Axis::Y, true);
        let mut recorder = Recorder(Vec::new());
        set.apply_to(&mut recorder);
        assert_eq!(recorder.0, set.active_planes());
    }
}
