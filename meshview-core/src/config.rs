//! Viewer configuration.
//!
//! Every value has a default, so an empty TOML document is a valid
//! configuration. Example:
//!
//! ```toml
//! [clipping]
//! min_offset = -5.0
//! max_offset = 5.0
//!
//! [presets]
//! duration_ms = 300.0
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub fov_degrees: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [3.0, 3.0, 3.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Slider range for the clip plane offsets
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClippingConfig {
    pub min_offset: f64,
    pub max_offset: f64,
    pub step: f64,
    /// Edge length of the translucent plane quad
    pub quad_size: f64,
}

impl ClippingConfig {
    /// NaN passes through; callers reject non-finite offsets first.
    pub fn clamp_offset(&self, offset: f64) -> f64 {
        offset.max(self.min_offset).min(self.max_offset)
    }
}

impl Default for ClippingConfig {
    fn default() -> Self {
        Self {
            min_offset: -3.0,
            max_offset: 3.0,
            step: 0.1,
            quad_size: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    /// Distance from the orbit target for every preset but `reset`
    pub distance: f64,
    pub duration_ms: f64,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            distance: 5.0,
            duration_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    pub marker_radius: f64,
    pub label_precision: usize,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            marker_radius: 0.05,
            label_precision: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub scale: f64,
    pub position: [f64; 3],
    /// Recenter loaded geometry on its bounding box
    pub center: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: [0.0, 0.0, 0.0],
            center: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WireframeConfig {
    pub enabled: bool,
    pub show_solid: bool,
}

impl Default for WireframeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            show_solid: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub show: bool,
    pub size: f64,
    pub divisions: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            show: true,
            size: 10.0,
            divisions: 10,
        }
    }
}

/// `#rrggbb` color, parsed case-insensitively and written back lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for HexColor {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ViewerError::InvalidConfig(format!("invalid color {s:?}, expected #rrggbb"));
        let digits = s.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for HexColor {
    type Error = ViewerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Colors and opacities handed to the renderers. Opacities lie in (0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub model_color: HexColor,
    pub solid_opacity: f64,
    pub wireframe_color: HexColor,
    pub wireframe_opacity: f64,
    pub grid_color: HexColor,
    pub grid_opacity: f64,
    pub clip_plane_color: HexColor,
    pub clip_plane_opacity: f64,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            model_color: HexColor::new(0xff, 0xaa, 0x00),
            solid_opacity: 1.0,
            wireframe_color: HexColor::new(0xff, 0xff, 0xff),
            wireframe_opacity: 1.0,
            grid_color: HexColor::new(0x88, 0x88, 0x88),
            grid_opacity: 0.5,
            clip_plane_color: HexColor::new(0xff, 0xff, 0x00),
            clip_plane_opacity: 0.3,
        }
    }
}

impl AppearanceConfig {
    fn opacities(&self) -> [(&'static str, f64); 4] {
        [
            ("appearance.solid_opacity", self.solid_opacity),
            ("appearance.wireframe_opacity", self.wireframe_opacity),
            ("appearance.grid_opacity", self.grid_opacity),
            ("appearance.clip_plane_opacity", self.clip_plane_opacity),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub clipping: ClippingConfig,
    pub presets: PresetConfig,
    pub measurement: MeasurementConfig,
    pub model: ModelConfig,
    pub wireframe: WireframeConfig,
    pub grid: GridConfig,
    pub appearance: AppearanceConfig,
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ViewerError::InvalidConfig(msg.to_string()));
        let clipping = &self.clipping;
        if !(clipping.min_offset.is_finite()
            && clipping.max_offset.is_finite()
            && clipping.min_offset < clipping.max_offset)
        {
            return invalid("clipping.min_offset must be below clipping.max_offset");
        }
        if !(clipping.step.is_finite() && clipping.step > 0.0) {
            return invalid("clipping.step must be positive");
        }
        if !(clipping.quad_size.is_finite() && clipping.quad_size > 0.0) {
            return invalid("clipping.quad_size must be positive");
        }
        if !(self.presets.duration_ms > 0.0) {
            return invalid("presets.duration_ms must be positive");
        }
        if !(self.presets.distance > 0.0) {
            return invalid("presets.distance must be positive");
        }
        if !(self.model.scale > 0.0) {
            return invalid("model.scale must be positive");
        }
        if self.grid.divisions == 0 {
            return invalid("grid.divisions must be at least 1");
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return invalid("camera.near must be positive and below camera.far");
        }
        for (key, opacity) in self.appearance.opacities() {
            if !(opacity > 0.0 && opacity <= 1.0) {
                return Err(ViewerError::InvalidConfig(format!("{key} must be in (0, 1]")));
            }
        }
        Ok(())
    }
}
