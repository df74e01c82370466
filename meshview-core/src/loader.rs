//! Model file loading, dispatched on the file extension.
//!
//! STL and PLY are parsed in-crate; OBJ goes through `tobj` and glTF/GLB
//! through `gltf`. Every format ends up as a flat-shaded triangle [`Mesh`].

use std::collections::HashMap;
use std::fmt;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use nalgebra::{Matrix4, Point3};

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Triangle};
use crate::ply::parse_ply;
use crate::stl::parse_stl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Stl,
    Obj,
    Ply,
    Gltf,
    Glb,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 5] = [
        ModelFormat::Stl,
        ModelFormat::Obj,
        ModelFormat::Ply,
        ModelFormat::Gltf,
        ModelFormat::Glb,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::Stl => "stl",
            ModelFormat::Obj => "obj",
            ModelFormat::Ply => "ply",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Glb => "glb",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .parse()
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ModelFormat {
    type Err = ViewerError;

    /// Accepts `"stl"`, `".STL"` and the like.
    fn from_str(s: &str) -> Result<Self> {
        let ext = s.trim().trim_start_matches('.').to_ascii_lowercase();
        ModelFormat::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or_else(|| ViewerError::UnsupportedFormat(s.to_string()))
    }
}

/// Parse model bytes in the format named by `extension`.
pub fn load_mesh(bytes: &[u8], extension: &str) -> Result<Mesh> {
    let format: ModelFormat = extension.parse()?;
    let mesh = match format {
        ModelFormat::Stl => parse_stl(bytes)?,
        ModelFormat::Obj => parse_obj(bytes)?,
        ModelFormat::Ply => parse_ply(bytes)?,
        ModelFormat::Gltf | ModelFormat::Glb => parse_gltf(bytes)?,
    };
    log::info!("parsed {format} model: {} triangles", mesh.triangles.len());
    Ok(mesh)
}

/// Read and parse a model file. Unknown extensions fail before any I/O.
pub fn load_path(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let format = ModelFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    load_mesh(&bytes, format.extension())
}

/// Parse a Wavefront OBJ file. Materials are not loaded.
pub fn parse_obj(bytes: &[u8]) -> Result<Mesh> {
    let mut reader = BufReader::new(bytes);
    let options = tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    };
    let (models, _) = tobj::load_obj_buf(&mut reader, &options, |_| {
        Ok((Vec::new(), HashMap::new()))
    })?;

    let mut mesh = Mesh::new();
    for model in &models {
        let positions = &model.mesh.positions;
        let corner = |index: u32| {
            let start = index as usize * 3;
            positions
                .get(start..start + 3)
                .map(|p| Point3::new(p[0], p[1], p[2]))
                .ok_or(ViewerError::Obj(tobj::LoadError::FaceVertexOutOfBounds))
        };
        for face in model.mesh.indices.chunks_exact(3) {
            mesh.add_triangle(Triangle::from_points(
                corner(face[0])?,
                corner(face[1])?,
                corner(face[2])?,
            ));
        }
    }
    Ok(mesh)
}

/// Parse a glTF 2.0 document (JSON with embedded buffers, or binary GLB).
/// Node transforms of the default scene are baked into the positions.
pub fn parse_gltf(bytes: &[u8]) -> Result<Mesh> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;

    let mut mesh = Mesh::new();
    let identity = Matrix4::identity();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, &identity, &buffers, &mut mesh);
            }
        }
        None => {
            for gltf_mesh in document.meshes() {
                collect_primitives(&gltf_mesh, &identity, &buffers, &mut mesh);
            }
        }
    }
    Ok(mesh)
}

fn collect_node(
    node: &gltf::Node,
    parent: &Matrix4<f64>,
    buffers: &[gltf::buffer::Data],
    mesh: &mut Mesh,
) {
    let local = Matrix4::from(node.transform().matrix()).cast::<f64>();
    let world = parent * local;
    if let Some(gltf_mesh) = node.mesh() {
        collect_primitives(&gltf_mesh, &world, buffers, mesh);
    }
    for child in node.children() {
        collect_node(&child, &world, buffers, mesh);
    }
}

fn collect_primitives(
    gltf_mesh: &gltf::Mesh,
    transform: &Matrix4<f64>,
    buffers: &[gltf::buffer::Data],
    mesh: &mut Mesh,
) {
    for primitive in gltf_mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::debug!("skipping {:?} primitive", primitive.mode());
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<Point3<f64>> = positions
            .map(|[x, y, z]| {
                transform.transform_point(&Point3::new(x as f64, y as f64, z as f64))
            })
            .collect();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        for face in indices.chunks_exact(3) {
            let corner = |i: u32| positions.get(i as usize).copied();
            if let (Some(a), Some(b), Some(c)) = (corner(face[0]), corner(face[1]), corner(face[2])) {
                mesh.add_triangle(Triangle::from_points(a, b, c));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ_QUAD: &str = "\
# unit square
o square
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    const TRIANGLE_BASE64: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA";

    fn triangle_gltf(buffer: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "mesh": 0, "translation": [0.0, 0.0, 2.0] }}],
  "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }}],
  "accessors": [{{
    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
  }}],
  "bufferViews": [{{ "buffer": 0, "byteLength": 36 }}],
  "buffers": [{buffer}]
}}"#
        )
    }

    fn triangle_positions() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(bin);
        out
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!("STL".parse::<ModelFormat>().unwrap(), ModelFormat::Stl);
        assert_eq!(".glb".parse::<ModelFormat>().unwrap(), ModelFormat::Glb);
        assert_eq!(
            ModelFormat::from_path(Path::new("parts/bracket.Obj")).unwrap(),
            ModelFormat::Obj
        );
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            load_mesh(b"anything", "fbx"),
            Err(ViewerError::UnsupportedFormat(ext)) if ext == "fbx"
        ));
        assert!(matches!(
            load_path("no/such/model.3ds"),
            Err(ViewerError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ModelFormat::from_path(Path::new("README")),
            Err(ViewerError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_obj_quad_is_triangulated() {
        let mesh = load_mesh(OBJ_QUAD.as_bytes(), "obj").unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.triangles[0].calculate_normal(), nalgebra::Vector3::z());
    }

    #[test]
    fn test_obj_without_faces_is_empty() {
        let mesh = parse_obj(b"v 0 0 0\nv 1 0 0\n").unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_stl_through_dispatcher() {
        let mut data = vec![0u8; 80];
        data.extend_from_slice(&0u32.to_le_bytes());
        let mesh = load_mesh(&data, "stl").unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_gltf_with_embedded_buffer() {
        let buffer = format!(
            r#"{{ "byteLength": 36, "uri": "data:application/octet-stream;base64,{TRIANGLE_BASE64}" }}"#
        );
        let mesh = load_mesh(triangle_gltf(&buffer).as_bytes(), "gltf").unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        // Node translation is baked in
        assert_eq!(mesh.triangles[0].positions()[1], Point3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_glb_binary_chunk() {
        let data = glb(&triangle_gltf(r#"{ "byteLength": 36 }"#), &triangle_positions());
        let mesh = load_mesh(&data, "glb").unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].positions()[2], Point3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn test_malformed_gltf() {
        assert!(matches!(load_mesh(b"{ not json", "gltf"), Err(ViewerError::Gltf(_))));
    }
}
