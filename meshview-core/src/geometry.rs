//! Mesh primitives shared by the picker, the renderers and the loaders

use std::collections::HashSet;

use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// A mesh vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Build a flat-shaded triangle, deriving the normal from the winding.
    pub fn from_points(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        let normal = (b - a)
            .cross(&(c - a))
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        Self::new(
            Vertex::new(a, normal),
            Vertex::new(b, normal),
            Vertex::new(c, normal),
        )
    }

    pub fn positions(&self) -> [Point3<f64>; 3] {
        [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ]
    }

    /// Face normal from the vertex winding; zero for degenerate triangles.
    pub fn calculate_normal(&self) -> Vector3<f64> {
        let [v0, v1, v2] = self.positions();
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis, as shown in the dimensions panel.
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box of all vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut points = self.triangles.iter().flat_map(|t| t.positions());
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        });
        Some(Aabb { min, max })
    }

    /// Copy of the mesh translated so its bounding box is centered on the origin.
    pub fn centered(&self) -> Self {
        let Some(bounds) = self.bounds() else {
            return self.clone();
        };
        let offset = -bounds.center().coords;
        let triangles = self
            .triangles
            .iter()
            .map(|t| {
                let mut t = t.clone();
                for v in &mut t.vertices {
                    v.position += offset;
                }
                t
            })
            .collect();
        Self { triangles }
    }

    /// Unique undirected edges, for wireframe rendering.
    ///
    /// STL meshes repeat shared vertices per facet, so edges are deduplicated
    /// by exact coordinate match.
    pub fn edges(&self) -> Vec<(Point3<f64>, Point3<f64>)> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for triangle in &self.triangles {
            let [a, b, c] = triangle.positions();
            for (p, q) in [(a, b), (b, c), (c, a)] {
                let (kp, kq) = (point_key(&p), point_key(&q));
                let key = if kp <= kq { (kp, kq) } else { (kq, kp) };
                if kp != kq && seen.insert(key) {
                    edges.push((p, q));
                }
            }
        }
        edges
    }

    /// Axis-aligned cube centered on the origin, useful when no file is given.
    pub fn cube(size: f64) -> Self {
        let h = size / 2.0;
        let mut mesh = Self::with_capacity(12);
        // Each face: outward normal plus two in-plane axes with u x v == normal.
        let faces = [
            (Vector3::x(), Vector3::y(), Vector3::z()),
            (-Vector3::x(), Vector3::z(), Vector3::y()),
            (Vector3::y(), Vector3::z(), Vector3::x()),
            (-Vector3::y(), Vector3::x(), Vector3::z()),
            (Vector3::z(), Vector3::x(), Vector3::y()),
            (-Vector3::z(), Vector3::y(), Vector3::x()),
        ];
        for (n, u, v) in faces {
            let center = Point3::from(n * h);
            let corner = |su: f64, sv: f64| center + u * (su * h) + v * (sv * h);
            let (p0, p1, p2, p3) = (
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            );
            mesh.add_triangle(Triangle::new(
                Vertex::new(p0, n),
                Vertex::new(p1, n),
                Vertex::new(p2, n),
            ));
            mesh.add_triangle(Triangle::new(
                Vertex::new(p0, n),
                Vertex::new(p2, n),
                Vertex::new(p3, n),
            ));
        }
        mesh
    }
}

fn point_key(p: &Point3<f64>) -> [u64; 3] {
    // + 0.0 folds -0.0 into 0.0
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}
