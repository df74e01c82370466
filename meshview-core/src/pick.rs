//! Ray casting from a pointer position into the scene.
//!
//! Only [`Role::Model`] geometry is pickable. Measurement markers, clip plane
//! quads and other helpers are tagged [`Role::Auxiliary`] when they are
//! created and are skipped together with everything below them.

use nalgebra::{Point2, Point3, Unit, Vector3};

use crate::geometry::Mesh;
use crate::projection::Camera;
use crate::transform::ModelTransform;

/// A world-space point obtained by picking
pub type PickPoint = Point3<f64>;

/// Triangles more parallel to the ray than this are ignored
const PARALLEL_EPSILON: f64 = 1e-12;
/// Hits closer than this to the ray origin are ignored
const MIN_HIT_DISTANCE: f64 = 1e-9;

/// A ray in 3D space defined by origin and unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
}

impl Ray {
    /// `None` if `direction` has no usable length.
    pub fn try_new(origin: Point3<f64>, direction: Vector3<f64>) -> Option<Self> {
        let direction = Unit::try_new(direction, f64::EPSILON)?;
        Some(Self { origin, direction })
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction.as_ref() * t
    }

    /// Möller-Trumbore ray/triangle test. Returns the ray parameter of the hit.
    pub fn intersect_triangle(
        &self,
        v0: &Point3<f64>,
        v1: &Point3<f64>,
        v2: &Point3<f64>,
    ) -> Option<f64> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = self.direction.cross(&edge2);
        let a = edge1.dot(&h);

        if a.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t > MIN_HIT_DISTANCE).then_some(t)
    }
}

/// What a renderable exists for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Loaded model geometry; the only thing picking can hit.
    Model,
    /// Visualization of viewer state: markers, plane quads, grid lines.
    Auxiliary,
}

/// A renderable in the scene tree
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub role: Role,
    pub mesh: Mesh,
    /// Placement relative to the parent object
    pub transform: ModelTransform,
    pub children: Vec<SceneObject>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, role: Role, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            role,
            mesh,
            transform: ModelTransform::identity(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: ModelTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneObject) -> Self {
        self.children.push(child);
        self
    }
}

/// The candidate object set for picking
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Drop every object with the given role.
    pub fn remove_role(&mut self, role: Role) {
        self.objects.retain(|o| o.role != role);
    }

    pub fn find(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    /// Closest model intersection along `ray`, as `(t, point)`.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, PickPoint)> {
        let mut closest: Option<f64> = None;
        for object in &self.objects {
            intersect_object(object, &ModelTransform::identity(), ray, &mut closest);
        }
        closest.map(|t| (t, ray.at(t)))
    }
}

fn intersect_object(
    object: &SceneObject,
    parent: &ModelTransform,
    ray: &Ray,
    closest: &mut Option<f64>,
) {
    if object.role == Role::Auxiliary {
        return;
    }

    let world = parent.compose(&object.transform);
    for triangle in &object.mesh.triangles {
        let [a, b, c] = triangle.positions().map(|p| world.apply(&p));
        if let Some(t) = ray.intersect_triangle(&a, &b, &c) {
            if closest.map_or(true, |best| t < best) {
                *closest = Some(t);
            }
        }
    }

    for child in &object.children {
        intersect_object(child, &world, ray, closest);
    }
}

/// The render surface in client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Surface anchored at the client origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Normalized device coordinates of a client position, y pointing up.
    ///
    /// `None` outside the surface or for an empty surface.
    pub fn to_ndc(&self, client_x: f64, client_y: f64) -> Option<Point2<f64>> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = client_x - self.left;
        let y = client_y - self.top;
        if !(0.0..=self.width).contains(&x) || !(0.0..=self.height).contains(&y) {
            return None;
        }
        Some(Point2::new(
            x / self.width * 2.0 - 1.0,
            -(y / self.height) * 2.0 + 1.0,
        ))
    }
}

/// Pick the closest model point under a pointer position.
///
/// Returns `None` when the pointer is outside the viewport, the camera has no
/// usable projection, or nothing pickable is under the cursor.
pub fn pick(
    client_x: f64,
    client_y: f64,
    viewport: &Viewport,
    camera: &Camera,
    scene: &Scene,
) -> Option<PickPoint> {
    let ndc = viewport.to_ndc(client_x, client_y)?;
    let ray = camera.ray_through_ndc(ndc)?;
    let (t, point) = scene.intersect(&ray)?;
    log::trace!("pick hit at t={t:.4}: {point:?}");
    Some(point)
}
