//! Placement of a mesh in world space

use nalgebra::{Matrix4, Point3, Vector3};

/// Uniform scale followed by a translation, as driven by the model controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub translation: Vector3<f64>,
    pub scale: f64,
}

impl ModelTransform {
    pub fn new(translation: Vector3<f64>, scale: f64) -> Self {
        Self { translation, scale }
    }

    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), 1.0)
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.translation) * Matrix4::new_scaling(self.scale)
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(point.coords * self.scale + self.translation)
    }

    /// Transform of a child placed in this transform's space.
    pub fn compose(&self, child: &ModelTransform) -> ModelTransform {
        Self::new(
            child.translation * self.scale + self.translation,
            child.scale * self.scale,
        )
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::identity()
    }
}
