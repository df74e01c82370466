//! WASM bindings for the meshview model viewer.
//!
//! The browser host owns rendering. It feeds pointer clicks, timestamps and
//! UI toggles into a [`WebViewer`] and reads back JSON for the overlay, the
//! active clip planes and the camera pose.

use meshview_core::{load_mesh, Aabb, Axis, ViewerConfig, ViewerSession, Viewport};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&e.to_string()))
}

fn js_err(e: meshview_core::ViewerError) -> JsError {
    JsError::new(&e.to_string())
}

/// One viewer session bound to a canvas.
#[wasm_bindgen]
pub struct WebViewer {
    session: ViewerSession,
}

#[wasm_bindgen]
impl WebViewer {
    /// Create a viewer, optionally configured from TOML text.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>, width: u32, height: u32) -> Result<WebViewer, JsError> {
        let config = match config {
            Some(text) => ViewerConfig::from_toml_str(&text).map_err(js_err)?,
            None => ViewerConfig::default(),
        };
        Ok(Self::with_config(config, width, height))
    }

    #[wasm_bindgen(js_name = setViewportSize)]
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.session.set_viewport_size(width, height);
    }

    /// Parse model bytes in the format named by `extension` ("stl", "obj",
    /// "ply", "gltf" or "glb") and install them as the model. Returns the
    /// world-space bounds as JSON.
    #[wasm_bindgen(js_name = loadModel)]
    pub fn load_model(
        &mut self,
        bytes: &js_sys::Uint8Array,
        extension: &str,
    ) -> Result<String, JsError> {
        let bounds = self.load_bytes(&bytes.to_vec(), extension).map_err(js_err)?;
        to_json(&bounds)
    }

    #[wasm_bindgen(js_name = loadStl)]
    pub fn load_stl(&mut self, bytes: &js_sys::Uint8Array) -> Result<String, JsError> {
        self.load_model(bytes, "stl")
    }

    #[wasm_bindgen(getter, js_name = modelReady)]
    pub fn model_ready(&self) -> bool {
        self.session.model_ready()
    }

    /// World-space `[x, y, z]` extent of the model, `undefined` before load.
    #[wasm_bindgen(getter, js_name = modelDimensions)]
    pub fn model_dimensions(&self) -> Option<Vec<f64>> {
        self.session
            .model_dimensions()
            .map(|size| vec![size.x, size.y, size.z])
    }

    /// Colors and opacities from the `[appearance]` config section, as JSON.
    pub fn appearance(&self) -> Result<String, JsError> {
        to_json(&self.session.config().appearance)
    }

    /// Pick at a pointer position. Returns the measurement event as JSON,
    /// or `undefined` when nothing changed.
    #[wasm_bindgen(js_name = pointerClick)]
    pub fn pointer_click(
        &mut self,
        canvas: &HtmlCanvasElement,
        client_x: f64,
        client_y: f64,
    ) -> Result<Option<String>, JsError> {
        let rect = canvas.get_bounding_client_rect();
        let viewport = Viewport::new(rect.left(), rect.top(), rect.width(), rect.height());
        self.session
            .click(client_x, client_y, &viewport)
            .map(|event| to_json(&event))
            .transpose()
    }

    #[wasm_bindgen(js_name = toggleMeasurementMode)]
    pub fn toggle_measurement_mode(&mut self) -> Result<String, JsError> {
        to_json(&self.session.toggle_measurement_mode())
    }

    #[wasm_bindgen(getter, js_name = measurementMode)]
    pub fn measurement_mode(&self) -> bool {
        self.session.measurements().mode_enabled()
    }

    #[wasm_bindgen(js_name = clearMeasurements)]
    pub fn clear_measurements(&mut self) -> Result<String, JsError> {
        to_json(&self.session.clear_measurements())
    }

    #[wasm_bindgen(js_name = cancelMeasurement)]
    pub fn cancel_measurement(&mut self) -> Result<Option<String>, JsError> {
        self.session
            .cancel_measurement()
            .map(|event| to_json(&event))
            .transpose()
    }

    #[wasm_bindgen(js_name = setShowMeasurements)]
    pub fn set_show_measurements(&mut self, show: bool) {
        self.session.set_show_measurements(show);
    }

    /// Measurements, pending marker and prompt as JSON.
    pub fn overlay(&self) -> Result<String, JsError> {
        to_json(&self.session.overlay())
    }

    #[wasm_bindgen(js_name = setClipEnabled)]
    pub fn set_clip_enabled(&mut self, axis: &str, enabled: bool) -> Result<(), JsError> {
        let axis: Axis = axis.parse().map_err(js_err)?;
        self.session.set_clip_enabled(axis, enabled);
        Ok(())
    }

    /// Move a plane along its axis. Returns the offset after clamping.
    #[wasm_bindgen(js_name = setClipOffset)]
    pub fn set_clip_offset(&mut self, axis: &str, offset: f64) -> Result<f64, JsError> {
        let axis: Axis = axis.parse().map_err(js_err)?;
        Ok(self.session.set_clip_offset(axis, offset))
    }

    #[wasm_bindgen(js_name = resetClipping)]
    pub fn reset_clipping(&mut self) {
        self.session.reset_clipping();
    }

    /// Plane equations for the material's clipping planes, as JSON.
    #[wasm_bindgen(js_name = activePlanes)]
    pub fn active_planes(&self) -> Result<String, JsError> {
        to_json(&self.session.active_planes())
    }

    /// Corners of the translucent plane helpers, as JSON.
    #[wasm_bindgen(js_name = clipQuads)]
    pub fn clip_quads(&self) -> Result<String, JsError> {
        to_json(&self.session.clip_quads())
    }

    /// Start a transition to a named preset. Returns the destination pose.
    #[wasm_bindgen(js_name = goTo)]
    pub fn go_to(&mut self, preset: &str, now_ms: f64) -> Result<String, JsError> {
        let pose = self.session.go_to_named(preset, now_ms).map_err(js_err)?;
        to_json(&pose)
    }

    /// Step the camera animation. Returns whether it is still running.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        self.session.advance(now_ms);
        self.session.is_animating()
    }

    #[wasm_bindgen(js_name = cameraPose)]
    pub fn camera_pose(&self) -> Result<String, JsError> {
        to_json(&self.session.camera().pose())
    }

    pub fn orbit(&mut self, horizontal: f64, vertical: f64) {
        self.session.orbit(horizontal, vertical);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.session.pan(dx, dy);
    }

    pub fn zoom(&mut self, factor: f64) {
        self.session.zoom(factor);
    }

    #[wasm_bindgen(js_name = resetCamera)]
    pub fn reset_camera(&mut self) {
        self.session.reset_camera();
    }

    #[wasm_bindgen(js_name = toggleWireframe)]
    pub fn toggle_wireframe(&mut self) -> bool {
        self.session.toggle_wireframe()
    }

    #[wasm_bindgen(js_name = setShowSolid)]
    pub fn set_show_solid(&mut self, show: bool) {
        self.session.set_show_solid(show);
    }

    #[wasm_bindgen(js_name = toggleGrid)]
    pub fn toggle_grid(&mut self) -> bool {
        self.session.toggle_grid()
    }

    /// Switch between perspective and orthographic. Returns the new mode name.
    #[wasm_bindgen(js_name = toggleProjection)]
    pub fn toggle_projection(&mut self) -> String {
        self.session.toggle_projection().as_str().to_string()
    }
}

impl WebViewer {
    pub fn with_config(config: ViewerConfig, width: u32, height: u32) -> Self {
        log::info!("creating web viewer {width}x{height}");
        Self {
            session: ViewerSession::new(config, width, height),
        }
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ViewerSession {
        &mut self.session
    }

    /// Parse and install a model from raw bytes.
    pub fn load_bytes(&mut self, bytes: &[u8], extension: &str) -> meshview_core::Result<Aabb> {
        let mesh = load_mesh(bytes, extension)?;
        self.session.load_model(mesh)
    }
}
