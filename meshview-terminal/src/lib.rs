//! Terminal front end for the meshview model viewer

use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::Color,
    terminal::{self},
};
use meshview_core::viewer::MODEL_NAME;
use meshview_core::{Axis, HexColor, MeasurementEvent, ViewPreset, ViewerSession, Viewport};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

const ORBIT_STEP: f64 = 0.1;
const ZOOM_STEP: f64 = 1.1;
const PAN_STEP: f64 = 0.1;

/// What a key press asks the viewer to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Orbit(f64, f64),
    Pan(f64, f64),
    Zoom(f64),
    ToggleProjection,
    ResetCamera,
    ToggleMeasurementMode,
    ClearMeasurements,
    CancelMeasurement,
    ToggleMeasurementVisibility,
    ToggleClip(Axis),
    SelectClip(Axis),
    NudgeClip(i32),
    ResetClipping,
    ToggleWireframe,
    ToggleSolid,
    ToggleGrid,
    GoTo(ViewPreset),
}

/// Key bindings. Lowercase axis letters toggle a plane, uppercase select the
/// plane that `[` and `]` move.
pub fn key_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('w') | KeyCode::Up => Action::Orbit(0.0, -ORBIT_STEP),
        KeyCode::Char('s') | KeyCode::Down => Action::Orbit(0.0, ORBIT_STEP),
        KeyCode::Char('a') | KeyCode::Left => Action::Orbit(-ORBIT_STEP, 0.0),
        KeyCode::Char('d') | KeyCode::Right => Action::Orbit(ORBIT_STEP, 0.0),
        KeyCode::Char('i') => Action::Pan(0.0, PAN_STEP),
        KeyCode::Char('k') => Action::Pan(0.0, -PAN_STEP),
        KeyCode::Char('j') => Action::Pan(-PAN_STEP, 0.0),
        KeyCode::Char('l') => Action::Pan(PAN_STEP, 0.0),
        KeyCode::Char('+') | KeyCode::Char('=') => Action::Zoom(ZOOM_STEP),
        KeyCode::Char('-') => Action::Zoom(1.0 / ZOOM_STEP),
        KeyCode::Char('p') => Action::ToggleProjection,
        KeyCode::Char('h') => Action::ResetCamera,
        KeyCode::Char('m') => Action::ToggleMeasurementMode,
        KeyCode::Char('c') => Action::ClearMeasurements,
        KeyCode::Esc => Action::CancelMeasurement,
        KeyCode::Char('v') => Action::ToggleMeasurementVisibility,
        KeyCode::Char('x') => Action::ToggleClip(Axis::X),
        KeyCode::Char('y') => Action::ToggleClip(Axis::Y),
        KeyCode::Char('z') => Action::ToggleClip(Axis::Z),
        KeyCode::Char('X') => Action::SelectClip(Axis::X),
        KeyCode::Char('Y') => Action::SelectClip(Axis::Y),
        KeyCode::Char('Z') => Action::SelectClip(Axis::Z),
        KeyCode::Char('[') => Action::NudgeClip(-1),
        KeyCode::Char(']') => Action::NudgeClip(1),
        KeyCode::Char('r') => Action::ResetClipping,
        KeyCode::Char('f') => Action::ToggleWireframe,
        KeyCode::Char('o') => Action::ToggleSolid,
        KeyCode::Char('g') => Action::ToggleGrid,
        KeyCode::Char(c @ '0'..='7') => {
            // '0' is Reset, the last preset
            let index = c.to_digit(10)? as usize;
            let preset = if index == 0 {
                ViewPreset::Reset
            } else {
                ViewPreset::ALL[index - 1]
            };
            Action::GoTo(preset)
        }
        _ => return None,
    };
    Some(action)
}

/// Status line text for a measurement event
/// Truecolor equivalent of a configured color.
pub fn rgb(color: HexColor) -> Color {
    Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

pub fn describe(event: &MeasurementEvent, precision: usize) -> String {
    match event {
        MeasurementEvent::Started { start } => format!(
            "First point at ({:.*}, {:.*}, {:.*})",
            precision, start.x, precision, start.y, precision, start.z
        ),
        MeasurementEvent::Completed { measurement } => {
            format!("Measurement #{}: {}", measurement.id, measurement.label(precision))
        }
        MeasurementEvent::Cancelled { .. } => "Measurement cancelled".to_string(),
        MeasurementEvent::ModeChanged { enabled: true, .. } => "Measurement mode on".to_string(),
        MeasurementEvent::ModeChanged { enabled: false, .. } => "Measurement mode off".to_string(),
        MeasurementEvent::Cleared { removed } => format!("Cleared {removed} measurements"),
    }
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    session: ViewerSession,
    renderer: AsciiRenderer,
    selected_axis: Axis,
    status: String,
    running: bool,
    started: Instant,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(session: ViewerSession) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(session, width, height))
    }

    pub fn with_size(mut session: ViewerSession, width: u16, height: u16) -> Self {
        // Character cells are about twice as tall as wide
        session.set_viewport_size(width as u32, height as u32 * 2);
        Self {
            session,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            selected_axis: Axis::X,
            status: String::new(),
            running: true,
            started: Instant::now(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            self.session.advance(self.now_ms());
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            // Presses only; some terminals also report releases and repeats.
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => {
                if let Some(action) = key_action(code) {
                    let now = self.now_ms();
                    self.apply(action, now);
                }
            }
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                ..
            }) => self.click(column, row),
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.session
                    .set_viewport_size(width as u32, height as u32 * 2);
            }
            _ => {}
        }
    }

    /// Pick through the center of a character cell.
    pub fn click(&mut self, column: u16, row: u16) {
        let viewport = Viewport::sized(self.renderer.width() as f64, self.renderer.height() as f64);
        let event = self
            .session
            .click(column as f64 + 0.5, row as f64 + 0.5, &viewport);
        match event {
            Some(event) => self.report(&event),
            None if self.session.measurements().mode_enabled() => {
                self.status = "No surface under cursor".to_string();
            }
            None => {}
        }
    }

    fn report(&mut self, event: &MeasurementEvent) {
        let precision = self.session.config().measurement.label_precision;
        self.status = describe(event, precision);
        log::debug!("{}", self.status);
    }

    pub fn apply(&mut self, action: Action, now_ms: f64) {
        match action {
            Action::Quit => self.running = false,
            Action::Orbit(h, v) => self.session.orbit(h, v),
            Action::Pan(dx, dy) => self.session.pan(dx, dy),
            Action::Zoom(factor) => self.session.zoom(factor),
            Action::ResetCamera => self.session.reset_camera(),
            Action::ToggleProjection => {
                let mode = self.session.toggle_projection();
                self.status = format!("Projection: {mode:?}");
            }
            Action::ToggleMeasurementMode => {
                let event = self.session.toggle_measurement_mode();
                self.report(&event);
            }
            Action::ClearMeasurements => {
                let event = self.session.clear_measurements();
                self.report(&event);
            }
            Action::CancelMeasurement => {
                if let Some(event) = self.session.cancel_measurement() {
                    self.report(&event);
                }
            }
            Action::ToggleMeasurementVisibility => {
                let show = !self.session.show_measurements();
                self.session.set_show_measurements(show);
            }
            Action::ToggleClip(axis) => {
                let enabled = !self.session.clipping().plane(axis).enabled;
                self.session.set_clip_enabled(axis, enabled);
                self.selected_axis = axis;
                self.status = format!(
                    "Clip {axis} {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            Action::SelectClip(axis) => {
                self.selected_axis = axis;
                self.status = format!("Clip {axis} selected");
            }
            Action::NudgeClip(steps) => {
                let offset = self.session.step_clip_offset(self.selected_axis, steps);
                self.status = format!("Clip {} offset {:.2}", self.selected_axis, offset);
            }
            Action::ResetClipping => {
                self.session.reset_clipping();
                self.status = "Clipping reset".to_string();
            }
            Action::ToggleWireframe => {
                self.session.toggle_wireframe();
            }
            Action::ToggleSolid => {
                let show = !self.session.wireframe().show_solid;
                self.session.set_show_solid(show);
            }
            Action::ToggleGrid => {
                self.session.toggle_grid();
            }
            Action::GoTo(preset) => {
                self.session.go_to(preset, now_ms);
                self.status = format!("View: {preset}");
            }
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let camera = self.session.camera();
        let appearance = &self.session.config().appearance;

        self.renderer.clear();
        self.session.sync_clipping(&mut self.renderer);

        self.renderer
            .render_segments(&self.session.grid_lines(), camera, '.', rgb(appearance.grid_color));

        if let Some(model) = self.session.scene().find(MODEL_NAME) {
            let wireframe = self.session.wireframe();
            if !wireframe.enabled || wireframe.show_solid {
                self.renderer.render_mesh(
                    &model.mesh,
                    &model.transform,
                    camera,
                    Some(rgb(appearance.model_color)),
                );
            }
            if wireframe.enabled {
                self.renderer.render_edges(
                    &model.mesh.edges(),
                    &model.transform,
                    camera,
                    rgb(appearance.wireframe_color),
                );
            }
        }

        for (_, [a, b, c, d]) in self.session.clip_quads() {
            let outline = [(a, b), (b, c), (c, d), (d, a)];
            self.renderer
                .render_segments(&outline, camera, '~', rgb(appearance.clip_plane_color));
        }

        let overlay = self.session.overlay();
        for m in &overlay.measurements {
            self.renderer
                .render_segments(&[(m.start, m.end)], camera, '-', Color::Red);
            self.renderer.draw_marker(camera, m.start, 'o', Color::Red);
            self.renderer.draw_marker(camera, m.end, 'o', Color::Red);
            self.renderer.draw_label(camera, m.midpoint, &m.label, Color::White);
        }
        if let Some(start) = overlay.pending {
            self.renderer.draw_marker(camera, start, 'o', Color::Green);
        }

        // HUD
        let mode = if self.session.measurements().mode_enabled() {
            "MEASURE"
        } else {
            "VIEW"
        };
        let header = format!(
            "meshview | FPS: {:.1} | {} | clip axis {} | {}",
            self.fps, mode, self.selected_axis, self.status
        );
        self.renderer.draw_text(0, 0, &header, Color::Yellow);
        if let Some(size) = self.session.model_dimensions() {
            let dims = format!("Model {:.2} x {:.2} x {:.2}", size.x, size.y, size.z);
            self.renderer.draw_text(0, 1, &dims, Color::Grey);
        }
        let footer = overlay.prompt.unwrap_or(
            "WASD orbit  +/- zoom  m measure  x/y/z clip  [ ] nudge  f wire  g grid  1-7 views  0 reset  q quit",
        );
        let bottom = self.renderer.height().saturating_sub(1);
        self.renderer.draw_text(0, bottom, footer, Color::Yellow);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use meshview_core::{Mesh, ViewerConfig};

    fn app() -> TerminalApp {
        let mut session = ViewerSession::new(ViewerConfig::default(), 80, 40);
        session.load_model(Mesh::cube(2.0)).unwrap();
        TerminalApp::with_size(session, 80, 40)
    }

    #[test]
    fn test_digit_keys_map_to_presets() {
        assert_eq!(key_action(KeyCode::Char('1')), Some(Action::GoTo(ViewPreset::Isometric)));
        assert_eq!(key_action(KeyCode::Char('7')), Some(Action::GoTo(ViewPreset::Right)));
        assert_eq!(key_action(KeyCode::Char('0')), Some(Action::GoTo(ViewPreset::Reset)));
        assert_eq!(key_action(KeyCode::Char('8')), None);
    }

    #[test]
    fn test_escape_cancels_instead_of_quitting() {
        assert_eq!(key_action(KeyCode::Esc), Some(Action::CancelMeasurement));
        assert_eq!(key_action(KeyCode::Char('q')), Some(Action::Quit));
    }

    #[test]
    fn test_clip_toggle_and_nudge() {
        let mut app = app();
        app.apply(Action::ToggleClip(Axis::Y), 0.0);
        assert_eq!(app.session().active_planes().len(), 1);

        app.apply(Action::NudgeClip(3), 0.0);
        assert!((app.session().clipping().offset(Axis::Y) - 0.3).abs() < 1e-9);
        assert_eq!(app.session().clipping().offset(Axis::X), 0.0);

        app.apply(Action::ResetClipping, 0.0);
        assert!(app.session().active_planes().is_empty());
    }

    #[test]
    fn test_click_in_measurement_mode() {
        let mut app = app();
        app.click(40, 20);
        assert!(app.session().measurements().pending_start().is_none());

        app.apply(Action::ToggleMeasurementMode, 0.0);
        app.click(40, 20);
        assert!(app.status().starts_with("First point"));
        app.click(42, 20);
        assert!(app.status().starts_with("Measurement #1"));

        app.click(0, 0);
        assert_eq!(app.status(), "No surface under cursor");
    }

    #[test]
    fn test_only_key_presses_trigger_actions() {
        let mut app = app();
        let key = |kind| {
            Event::Key(KeyEvent::new_with_kind(
                KeyCode::Char('m'),
                KeyModifiers::NONE,
                kind,
            ))
        };

        app.handle_event(key(KeyEventKind::Release));
        app.handle_event(key(KeyEventKind::Repeat));
        assert!(!app.session().measurements().mode_enabled());

        app.handle_event(key(KeyEventKind::Press));
        assert!(app.session().measurements().mode_enabled());
        app.handle_event(key(KeyEventKind::Release));
        assert!(app.session().measurements().mode_enabled());
    }

    #[test]
    fn test_configured_colors_map_to_rgb() {
        let app = app();
        let appearance = &app.session().config().appearance;
        assert_eq!(rgb(appearance.grid_color), Color::Rgb { r: 0x88, g: 0x88, b: 0x88 });
        assert_eq!(rgb(appearance.model_color), Color::Rgb { r: 0xff, g: 0xaa, b: 0x00 });
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        app.apply(Action::Quit, 0.0);
        assert!(!app.is_running());
    }
}
