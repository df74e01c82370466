//! meshview core library - the interactive part of the model viewer
//!
//! Loading STL, OBJ, PLY and glTF models, picking points on them, pairing
//! picks into distance measurements, axis-aligned clipping planes and
//! animated camera presets. Rendering is left to the front ends, which read
//! back plane equations, overlays and camera poses from a [`ViewerSession`].

pub mod clip;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod loader;
pub mod measure;
pub mod pick;
pub mod ply;
pub mod presets;
pub mod projection;
pub mod stl;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use clip::{Axis, ClipPlaneEquation, ClipTarget, ClippingPlaneSet};
pub use config::{AppearanceConfig, HexColor, ViewerConfig};
pub use error::{Result, ViewerError};
pub use geometry::{Aabb, Mesh, Triangle, Vertex};
pub use loader::{load_mesh, load_path, ModelFormat};
pub use measure::{Measurement, MeasurementEvent, MeasurementSession};
pub use pick::{pick, PickPoint, Role, Scene, SceneObject, Viewport};
pub use presets::{AnimationStatus, CameraAnimator, ViewPreset};
pub use projection::{Camera, CameraPose, ProjectionMode};
pub use transform::ModelTransform;
pub use viewer::{Overlay, ViewerSession};
