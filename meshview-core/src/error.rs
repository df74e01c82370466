//! Error types for the viewer core.

use thiserror::Error;

/// Errors surfaced by the viewer core.
///
/// All of them are recoverable: the host decides whether to show, log or
/// ignore them.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// A clipping plane id other than `x`, `y` or `z`.
    #[error("unknown clipping axis: {0:?}")]
    InvalidAxis(String),

    /// A view preset name that is not recognized.
    #[error("unknown view preset: {0:?}")]
    InvalidPreset(String),

    /// Binary STL data shorter than its 84-byte header.
    #[error("file too small to be a valid STL ({0} bytes)")]
    StlTooShort(usize),

    /// Binary STL data ending before the declared triangle count.
    #[error("STL declares {expected} triangles but only {actual} are present")]
    StlTruncated { expected: usize, actual: usize },

    /// ASCII STL that could not be parsed.
    #[error("failed to parse ASCII STL: {0}")]
    StlAscii(String),

    /// A file extension no loader handles.
    #[error("unsupported model format: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to load OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("failed to parse PLY: {0}")]
    Ply(String),

    #[error("failed to load glTF: {0}")]
    Gltf(#[from] gltf::Error),

    /// A model without any triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Malformed TOML configuration.
    #[error("invalid configuration file: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration values that parse but make no sense.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for viewer core operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
