use approx::assert_relative_eq;
use meshview_core::stl::parse_stl;
use meshview_core::{
    AnimationStatus, Axis, ClipPlaneEquation, ClipTarget, Mesh, MeasurementEvent, ViewPreset,
    ViewerConfig, ViewerError, ViewerSession, Viewport,
};
use nalgebra::{Point3, Vector3};

#[derive(Default)]
struct MaterialClipState {
    planes: Vec<ClipPlaneEquation>,
    updates: usize,
}

impl ClipTarget for MaterialClipState {
    fn set_clip_planes(&mut self, planes: &[ClipPlaneEquation]) {
        self.planes = planes.to_vec();
        self.updates += 1;
    }
}

fn ascii_cube() -> Vec<u8> {
    let mut text = String::from("solid cube\n");
    for t in &Mesh::cube(2.0).triangles {
        let n = t.vertices[0].normal;
        text.push_str(&format!("facet normal {} {} {}\nouter loop\n", n.x, n.y, n.z));
        for v in &t.vertices {
            let p = v.position;
            text.push_str(&format!("vertex {} {} {}\n", p.x, p.y, p.z));
        }
        text.push_str("endloop\nendfacet\n");
    }
    text.push_str("endsolid cube\n");
    text.into_bytes()
}

fn front_session() -> ViewerSession {
    let config = ViewerConfig::from_toml_str(
        "[camera]\nposition = [0.0, 0.0, 5.0]\n\n[presets]\nduration_ms = 400.0\n",
    )
    .unwrap();
    let mut session = ViewerSession::new(config, 200, 200);
    let mesh = parse_stl(&ascii_cube()).unwrap();
    session.load_model(mesh).unwrap();
    session
}

#[test]
fn measure_across_the_front_face() {
    let mut session = front_session();
    let viewport = Viewport::new(100.0, 50.0, 200.0, 200.0);
    session.toggle_measurement_mode();

    // Screen center hits the front face at z = 1
    let Some(MeasurementEvent::Started { start }) = session.click(200.0, 150.0, &viewport) else {
        panic!("first click should start a measurement");
    };
    assert_relative_eq!(start, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-9);

    // Clicks outside the surface are ignored without touching state
    assert_eq!(session.click(10.0, 10.0, &viewport), None);
    assert_eq!(session.measurements().pending_start(), Some(start));

    let Some(MeasurementEvent::Completed { measurement }) =
        session.click(220.0, 150.0, &viewport)
    else {
        panic!("second click should complete the measurement");
    };
    assert_relative_eq!(measurement.end.z, 1.0, epsilon = 1e-9);
    assert!(measurement.end.x > 0.0);
    assert_eq!(
        measurement.distance,
        meshview_core::measure::distance(&measurement.start, &measurement.end)
    );

    let overlay = session.overlay();
    assert_eq!(overlay.measurements.len(), 1);
    assert_eq!(overlay.pending, None);
}

#[test]
fn clipping_reaches_the_renderer() {
    let mut session = front_session();
    let mut material = MaterialClipState::default();

    session.set_clip_enabled(Axis::X, true);
    session.set_clip_position(Axis::X, Vector3::new(1.0, 0.0, 0.0));
    session.set_clip_enabled(Axis::Z, true);
    session.set_clip_offset(Axis::Z, 2.0);
    session.sync_clipping(&mut material);

    assert_eq!(material.planes.len(), 2);
    assert_eq!(material.planes[0].point, Point3::new(1.0, 0.0, 0.0));
    assert_eq!(material.planes[1].normal.into_inner(), Vector3::z());

    let err = "q".parse::<Axis>().unwrap_err();
    assert!(matches!(err, ViewerError::InvalidAxis(_)));

    session.reset_clipping();
    session.sync_clipping(&mut material);
    assert!(material.planes.is_empty());
    assert_eq!(material.updates, 2);
}

#[test]
fn preset_animation_is_frame_rate_independent() {
    let mut a = front_session();
    let mut b = front_session();
    a.go_to(ViewPreset::Isometric, 0.0);
    b.go_to(ViewPreset::Isometric, 0.0);

    // One session renders at 60 fps, the other drops most frames
    let mut t = 0.0;
    while a.advance(t) != AnimationStatus::Finished {
        t += 16.0;
    }
    assert!(matches!(b.advance(100.0), AnimationStatus::Animating { .. }));
    assert_eq!(b.advance(400.0), AnimationStatus::Finished);

    assert_eq!(a.camera().pose(), b.camera().pose());
    assert_eq!(a.camera().position, Point3::new(5.0, 5.0, 5.0));
}

#[test]
fn unknown_preset_is_an_error_without_side_effects() {
    let mut session = front_session();
    session.go_to(ViewPreset::Top, 0.0);
    let err = session.go_to_named("upside-down", 10.0).unwrap_err();
    assert!(matches!(err, ViewerError::InvalidPreset(_)));
    assert!(session.is_animating());
    assert_eq!(session.advance(400.0), AnimationStatus::Finished);
    assert_eq!(session.camera().position, Point3::new(0.0, 5.0, 0.0));
}
