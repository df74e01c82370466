//! Camera, projection and orbit utilities

use nalgebra::{Matrix4, Point2, Point3, Vector3};
use serde::Serialize;

use crate::config::CameraConfig;
use crate::pick::Ray;

/// Closest the polar angle may get to either pole while orbiting
const POLAR_MARGIN: f64 = 0.1;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

impl ProjectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionMode::Orthographic => "orthographic",
            ProjectionMode::Perspective => "perspective",
        }
    }
}

/// Where the camera is and what it looks at, as handed to a host renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vector3<f64>,
}

/// Orbit camera. `target` is the orbit center the camera always looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vector3<f64>,
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(&CameraConfig::default(), width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Point3::from(config.position),
            target: Point3::from(config.target),
            up: Vector3::y(),
            fov: config.fov_degrees.to_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
            mode: ProjectionMode::Perspective,
        };
        camera.set_viewport_size(width, height);
        camera
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f64 / height as f64;
        }
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            target: self.target,
            up: self.up,
        }
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.target = pose.target;
        self.up = pose.up;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f64> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self) -> Matrix4<f64> {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point in normalized device coordinates.
    ///
    /// `None` when the current projection cannot be inverted, e.g. when the
    /// camera sits on its target or `up` is parallel to the view direction.
    pub fn ray_through_ndc(&self, ndc: Point2<f64>) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;
        let near = inverse.transform_point(&Point3::new(ndc.x, ndc.y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc.x, ndc.y, 1.0));
        if !(near.coords.iter().chain(far.coords.iter()).all(|c| c.is_finite())) {
            return None;
        }
        Ray::try_new(near, far - near)
    }

    /// Project a world-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with depth in NDC. Points behind the camera
    /// yield `None`; points beside the surface are returned as-is so callers
    /// can clip partially visible primitives.
    pub fn project_to_screen(
        &self,
        point: &Point3<f64>,
        width: u32,
        height: u32,
    ) -> Option<(f64, f64, f64)> {
        let clip = self.view_projection() * point.to_homogeneous();

        if clip.w <= 1e-9 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f64;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f64;

        Some((screen_x, screen_y, ndc.z))
    }

    /// Rotate around the target. `horizontal` turns about the world Y axis,
    /// `vertical` tilts towards the poles.
    pub fn orbit(&mut self, horizontal: f64, vertical: f64) {
        let offset = self.position - self.target;
        let radius = offset.norm();
        if radius < 1e-9 {
            return;
        }

        let theta = offset.x.atan2(offset.z) + horizontal;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + vertical)
            .clamp(POLAR_MARGIN, std::f64::consts::PI - POLAR_MARGIN);

        self.position = self.target
            + Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Shift the orbit target in world X/Y; the camera keeps its position.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.target.x += dx;
        self.target.y += dy;
    }

    /// Dolly along the view direction. Factors above 1 move closer.
    pub fn zoom(&mut self, factor: f64) {
        let Some(direction) = (self.target - self.position).try_normalize(1e-9) else {
            return;
        };
        let step = (factor - 1.0) * 2.0;
        let remaining = (self.target - self.position).norm() - step;
        if remaining > self.near {
            self.position += direction * step;
        }
    }

    /// Jump to a position and target without animating. The up vector goes
    /// back to +Y.
    pub fn reset_to(&mut self, position: Point3<f64>, target: Point3<f64>) {
        self.position = position;
        self.target = target;
        self.up = Vector3::y();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
