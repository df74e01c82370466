//! One viewer session: a loaded model plus the interactive tools on top of it.
//!
//! Front ends translate their input into calls on [`ViewerSession`] and read
//! back an [`Overlay`], the active clip planes and the camera pose to draw.

use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::clip::{Axis, ClipPlaneEquation, ClipTarget, ClippingPlaneSet};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::geometry::{Aabb, Mesh};
use crate::grid::{grid_lines, Segment};
use crate::measure::{MeasurementEvent, MeasurementSession};
use crate::pick::{pick, PickPoint, Role, Scene, SceneObject, Viewport};
use crate::presets::{AnimationStatus, CameraAnimator, ViewPreset};
use crate::projection::{Camera, CameraPose, ProjectionMode};
use crate::transform::ModelTransform;

/// Scene name of the loaded model object
pub const MODEL_NAME: &str = "model";

const PROMPT_FIRST: &str = "Click first point to start measurement";
const PROMPT_SECOND: &str = "Click second point to complete measurement";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireframeSettings {
    pub enabled: bool,
    pub show_solid: bool,
}

/// A completed measurement ready to draw: markers, line and label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementOverlay {
    pub id: u64,
    pub start: PickPoint,
    pub end: PickPoint,
    pub midpoint: Point3<f64>,
    pub distance: f64,
    pub label: String,
}

/// Everything a renderer needs to draw measurement state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub measurements: Vec<MeasurementOverlay>,
    /// First point of a measurement in progress
    pub pending: Option<PickPoint>,
    /// Status line while measurement mode is on
    pub prompt: Option<&'static str>,
    pub marker_radius: f64,
}

pub struct ViewerSession {
    config: ViewerConfig,
    scene: Scene,
    camera: Camera,
    measurements: MeasurementSession,
    clipping: ClippingPlaneSet,
    animator: CameraAnimator,
    wireframe: WireframeSettings,
    show_measurements: bool,
    show_grid: bool,
    model_bounds: Option<Aabb>,
}

impl ViewerSession {
    pub fn new(config: ViewerConfig, width: u32, height: u32) -> Self {
        let camera = Camera::from_config(&config.camera, width, height);
        let animator = CameraAnimator::new(&camera, &config.presets);
        Self {
            scene: Scene::new(),
            camera,
            measurements: MeasurementSession::new(),
            clipping: ClippingPlaneSet::new(),
            animator,
            wireframe: WireframeSettings {
                enabled: config.wireframe.enabled,
                show_solid: config.wireframe.show_solid,
            },
            show_measurements: true,
            show_grid: config.grid.show,
            model_bounds: None,
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.camera.set_viewport_size(width, height);
    }

    /// Install a freshly loaded mesh as the pickable model, replacing any
    /// previous one. Measurements taken on the previous model are cleared.
    /// Returns the model's world-space bounds.
    pub fn load_model(&mut self, mesh: Mesh) -> Result<Aabb> {
        if mesh.is_empty() {
            return Err(ViewerError::EmptyMesh);
        }
        let mesh = if self.config.model.center {
            mesh.centered()
        } else {
            mesh
        };
        let transform = ModelTransform::new(
            Vector3::from(self.config.model.position),
            self.config.model.scale,
        );
        let bounds = mesh.bounds().ok_or(ViewerError::EmptyMesh)?;
        let world = Aabb {
            min: transform.apply(&bounds.min),
            max: transform.apply(&bounds.max),
        };

        log::info!(
            "model ready: {} triangles, size {:.3} x {:.3} x {:.3}",
            mesh.triangles.len(),
            world.size().x,
            world.size().y,
            world.size().z
        );

        self.measurements.clear_all();
        self.scene.remove_role(Role::Model);
        self.scene
            .add(SceneObject::new(MODEL_NAME, Role::Model, mesh).with_transform(transform));
        self.model_bounds = Some(world);
        Ok(world)
    }

    pub fn model_ready(&self) -> bool {
        self.model_bounds.is_some()
    }

    /// World-space extent of the model, for the dimensions readout.
    pub fn model_dimensions(&self) -> Option<Vector3<f64>> {
        self.model_bounds.map(|b| b.size())
    }

    // Measurement

    pub fn measurements(&self) -> &MeasurementSession {
        &self.measurements
    }

    /// Handle a pointer click. Only does anything in measurement mode with a
    /// model loaded and geometry under the cursor.
    pub fn click(
        &mut self,
        client_x: f64,
        client_y: f64,
        viewport: &Viewport,
    ) -> Option<MeasurementEvent> {
        if !self.measurements.mode_enabled() || !self.model_ready() {
            return None;
        }
        let point = pick(client_x, client_y, viewport, &self.camera, &self.scene)?;
        self.measurements.record(point)
    }

    pub fn toggle_measurement_mode(&mut self) -> MeasurementEvent {
        self.measurements.toggle_mode()
    }

    pub fn cancel_measurement(&mut self) -> Option<MeasurementEvent> {
        self.measurements.cancel()
    }

    pub fn clear_measurements(&mut self) -> MeasurementEvent {
        self.measurements.clear_all()
    }

    pub fn show_measurements(&self) -> bool {
        self.show_measurements
    }

    pub fn set_show_measurements(&mut self, show: bool) {
        self.show_measurements = show;
    }

    pub fn overlay(&self) -> Overlay {
        let precision = self.config.measurement.label_precision;
        let measurements = if self.show_measurements {
            self.measurements
                .measurements()
                .iter()
                .map(|m| MeasurementOverlay {
                    id: m.id,
                    start: m.start,
                    end: m.end,
                    midpoint: m.midpoint(),
                    distance: m.distance,
                    label: m.label(precision),
                })
                .collect()
        } else {
            Vec::new()
        };
        let prompt = self.measurements.mode_enabled().then(|| {
            if self.measurements.pending_start().is_some() {
                PROMPT_SECOND
            } else {
                PROMPT_FIRST
            }
        });
        Overlay {
            measurements,
            pending: self.measurements.pending_start(),
            prompt,
            marker_radius: self.config.measurement.marker_radius,
        }
    }

    // Clipping

    pub fn clipping(&self) -> &ClippingPlaneSet {
        &self.clipping
    }

    pub fn set_clip_enabled(&mut self, axis: Axis, enabled: bool) {
        self.clipping.set_enabled(axis, enabled);
    }

    pub fn set_clip_position(&mut self, axis: Axis, position: Vector3<f64>) {
        self.clipping.set_position(axis, position);
    }

    /// Move a plane along its axis, clamped to the configured slider range.
    /// A non-finite offset leaves the plane where it is. Returns the offset
    /// the plane ends up at.
    pub fn set_clip_offset(&mut self, axis: Axis, offset: f64) -> f64 {
        if !offset.is_finite() {
            log::warn!("ignoring non-finite clip offset {offset} for {axis}");
            return self.clipping.offset(axis);
        }
        let clamped = self.config.clipping.clamp_offset(offset);
        if clamped != offset {
            log::warn!("clip offset {offset} for {axis} clamped to {clamped}");
        }
        self.clipping.set_offset(axis, clamped);
        clamped
    }

    /// Nudge a plane by `steps` slider steps.
    pub fn step_clip_offset(&mut self, axis: Axis, steps: i32) -> f64 {
        let offset = self.clipping.offset(axis) + steps as f64 * self.config.clipping.step;
        self.set_clip_offset(axis, offset)
    }

    pub fn reset_clipping(&mut self) {
        self.clipping.reset();
    }

    pub fn active_planes(&self) -> Vec<ClipPlaneEquation> {
        self.clipping.active_planes()
    }

    /// Translucent quads visualizing the enabled planes.
    pub fn clip_quads(&self) -> Vec<(Axis, [Point3<f64>; 4])> {
        let size = self.config.clipping.quad_size;
        self.active_planes()
            .iter()
            .map(|p| (p.axis, p.quad_corners(size)))
            .collect()
    }

    pub fn sync_clipping(&self, target: &mut impl ClipTarget) {
        self.clipping.apply_to(target);
    }

    // Camera

    pub fn go_to(&mut self, preset: ViewPreset, now_ms: f64) -> CameraPose {
        self.animator.go_to(preset, now_ms, &self.camera)
    }

    pub fn go_to_named(&mut self, name: &str, now_ms: f64) -> Result<CameraPose> {
        self.animator.go_to_named(name, now_ms, &self.camera)
    }

    pub fn advance(&mut self, now_ms: f64) -> AnimationStatus {
        self.animator.advance(now_ms, &mut self.camera)
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    /// Direct camera manipulation takes over from any preset transition.
    pub fn orbit(&mut self, horizontal: f64, vertical: f64) {
        self.animator.stop();
        self.camera.orbit(horizontal, vertical);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.animator.stop();
        self.camera.pan(dx, dy);
    }

    pub fn zoom(&mut self, factor: f64) {
        self.animator.stop();
        self.camera.zoom(factor);
    }

    /// Snap back to the configured camera placement, cancelling any preset.
    pub fn reset_camera(&mut self) {
        self.animator.stop();
        let config = &self.config.camera;
        self.camera
            .reset_to(Point3::from(config.position), Point3::from(config.target));
    }

    pub fn toggle_projection(&mut self) -> ProjectionMode {
        self.camera.mode = match self.camera.mode {
            ProjectionMode::Perspective => ProjectionMode::Orthographic,
            ProjectionMode::Orthographic => ProjectionMode::Perspective,
        };
        self.camera.mode
    }

    // Display toggles

    pub fn wireframe(&self) -> WireframeSettings {
        self.wireframe
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.wireframe.enabled = !self.wireframe.enabled;
        self.wireframe.enabled
    }

    pub fn set_show_solid(&mut self, show: bool) {
        self.wireframe.show_solid = show;
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.show_grid
    }

    pub fn grid_lines(&self) -> Vec<Segment> {
        if !self.show_grid {
            return Vec::new();
        }
        grid_lines(self.config.grid.size, self.config.grid.divisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn session() -> ViewerSession {
        ViewerSession::new(ViewerConfig::default(), 100, 100)
    }

    #[test]
    fn test_fresh_session_state() {
        let session = session();
        assert!(!session.model_ready());
        assert!(session.active_planes().is_empty());
        assert!(!session.is_animating());
        assert_eq!(session.overlay().prompt, None);
        assert!(session.overlay().measurements.is_empty());
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut session = session();
        assert!(matches!(session.load_model(Mesh::new()), Err(ViewerError::EmptyMesh)));
        assert!(!session.model_ready());
    }

    #[test]
    fn test_load_model_applies_config_placement() {
        let mut config = ViewerConfig::default();
        config.model.scale = 0.5;
        config.model.position = [1.0, 0.0, 0.0];
        let mut session = ViewerSession::new(config, 100, 100);

        let bounds = session.load_model(Mesh::cube(4.0)).unwrap();
        assert_relative_eq!(bounds.center(), Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(session.model_dimensions().unwrap(), Vector3::new(2.0, 2.0, 2.0));

        // Reloading replaces the model
        session.load_model(Mesh::cube(2.0)).unwrap();
        assert_eq!(session.scene().objects.len(), 1);
    }

    #[test]
    fn test_click_requires_mode_and_model() {
        let mut session = session();
        let viewport = Viewport::sized(100.0, 100.0);
        session.toggle_measurement_mode();
        assert_eq!(session.click(50.0, 50.0, &viewport), None);

        session.load_model(Mesh::cube(2.0)).unwrap();
        assert!(matches!(
            session.click(50.0, 50.0, &viewport),
            Some(MeasurementEvent::Started { .. })
        ));
        assert_eq!(session.overlay().prompt, Some(PROMPT_SECOND));
    }

    #[test]
    fn test_overlay_visibility() {
        let mut session = session();
        session.load_model(Mesh::cube(2.0)).unwrap();
        session.toggle_measurement_mode();
        let viewport = Viewport::sized(100.0, 100.0);
        session.click(50.0, 50.0, &viewport);
        session.click(55.0, 50.0, &viewport);

        let overlay = session.overlay();
        assert_eq!(overlay.measurements.len(), 1);
        assert!(overlay.measurements[0].label.ends_with(" units"));
        assert_eq!(overlay.prompt, Some(PROMPT_FIRST));

        session.set_show_measurements(false);
        assert!(session.overlay().measurements.is_empty());
        assert_eq!(session.measurements().measurements().len(), 1);
    }

    #[test]
    fn test_clip_offset_is_clamped_to_range() {
        let mut session = session();
        assert_eq!(session.set_clip_offset(Axis::Y, 10.0), 3.0);
        assert_eq!(session.clipping().offset(Axis::Y), 3.0);
        session.set_clip_offset(Axis::Y, 0.0);
        assert_relative_eq!(session.step_clip_offset(Axis::Y, -2), -0.2);
    }

    #[test]
    fn test_non_finite_clip_offset_keeps_position() {
        let mut session = session();
        session.set_clip_offset(Axis::X, 1.0);
        assert_eq!(session.set_clip_offset(Axis::X, f64::NAN), 1.0);
        assert_eq!(session.set_clip_offset(Axis::X, f64::NEG_INFINITY), 1.0);
        assert_eq!(session.clipping().offset(Axis::X), 1.0);
    }

    #[test]
    fn test_reloading_clears_measurements() {
        let mut session = session();
        let viewport = Viewport::sized(100.0, 100.0);
        session.load_model(Mesh::cube(2.0)).unwrap();
        session.toggle_measurement_mode();
        session.click(50.0, 50.0, &viewport);
        session.click(55.0, 50.0, &viewport);
        session.click(50.0, 55.0, &viewport);
        assert_eq!(session.measurements().measurements().len(), 1);
        assert!(session.measurements().pending_start().is_some());

        session.load_model(Mesh::cube(1.0)).unwrap();
        assert!(session.measurements().measurements().is_empty());
        assert!(session.measurements().pending_start().is_none());
        assert!(session.overlay().measurements.is_empty());
        // Mode survives the reload
        assert!(session.measurements().mode_enabled());
    }

    #[test]
    fn test_clip_quads_follow_enabled_planes() {
        let mut session = session();
        session.set_clip_enabled(Axis::Z, true);
        let quads = session.clip_quads();
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].0, Axis::Z);
    }

    #[test]
    fn test_manual_orbit_stops_animation() {
        let mut session = session();
        session.go_to(ViewPreset::Top, 0.0);
        assert!(session.is_animating());
        session.orbit(0.1, 0.0);
        assert!(!session.is_animating());
        assert_eq!(session.advance(100.0), AnimationStatus::Idle);
    }

    #[test]
    fn test_reset_camera_cancels_preset() {
        let mut session = session();
        session.orbit(0.5, 0.2);
        session.go_to(ViewPreset::Left, 0.0);
        session.reset_camera();
        assert!(!session.is_animating());
        assert_relative_eq!(session.camera().position, Point3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_projection_toggle_round_trips() {
        let mut session = session();
        assert_eq!(session.toggle_projection(), ProjectionMode::Orthographic);
        assert_eq!(session.toggle_projection(), ProjectionMode::Perspective);
    }

    #[test]
    fn test_grid_toggle() {
        let mut session = session();
        assert!(!session.grid_lines().is_empty());
        session.toggle_grid();
        assert!(session.grid_lines().is_empty());
    }
}
