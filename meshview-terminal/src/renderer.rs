//! ASCII rasterizer for terminal rendering

use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshview_core::clip::is_visible;
use meshview_core::{Camera, ClipPlaneEquation, ClipTarget, Mesh, ModelTransform};
use nalgebra::Point3;
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Lines drawn over a surface lose the depth test by less than this
const LINE_DEPTH_BIAS: f64 = 1e-4;

/// A projected vertex: screen x, screen y, NDC depth and its world position
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f64,
    y: f64,
    depth: f64,
    world: Point3<f64>,
}

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f64>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Option<Color>>,
    clip_planes: Vec<ClipPlaneEquation>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f64::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![None; size],
            clip_planes: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let planes = std::mem::take(&mut self.clip_planes);
        *self = Self::new(width, height);
        self.clip_planes = planes;
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f64::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(None);
    }

    fn project(&self, camera: &Camera, world: Point3<f64>) -> Option<ScreenVertex> {
        let (x, y, depth) = camera.project_to_screen(&world, self.width as u32, self.height as u32)?;
        Some(ScreenVertex { x, y, depth, world })
    }

    /// Depth-tested write; fragments on the clipped side of any plane are
    /// discarded when `clipped` is set.
    fn plot(&mut self, x: i64, y: i64, fragment: ScreenVertex, clipped: bool, c: char, color: Option<Color>) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        if clipped && !is_visible(&self.clip_planes, &fragment.world) {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if fragment.depth < self.depth_buffer[idx] {
            self.depth_buffer[idx] = fragment.depth;
            self.char_buffer[idx] = c;
            self.color_buffer[idx] = color;
        }
    }

    /// Shaded solid surfaces, lit from the camera. Faces are double sided so
    /// cut-open models show their inside. `color` tints the ramp characters;
    /// `None` keeps the terminal's foreground color.
    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        transform: &ModelTransform,
        camera: &Camera,
        color: Option<Color>,
    ) {
        let light_dir = (camera.position - camera.target)
            .try_normalize(1e-9)
            .unwrap_or_else(nalgebra::Vector3::z);

        for triangle in &mesh.triangles {
            let world = triangle.positions().map(|p| transform.apply(&p));
            let [Some(a), Some(b), Some(c)] = world.map(|p| self.project(camera, p)) else {
                continue; // Triangle reaches behind the camera
            };

            let brightness = triangle.calculate_normal().dot(&light_dir).abs();
            let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f64) as usize;
            let character = LUMINOSITY_RAMP[char_index.clamp(1, LUMINOSITY_RAMP.len() - 1)];

            self.rasterize_triangle([a, b, c], character, color);
        }
    }

    fn rasterize_triangle(&mut self, v: [ScreenVertex; 3], character: char, color: Option<Color>) {
        let [v0, v1, v2] = v;

        // Bounding box clipped to screen bounds
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i64;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(self.width as f64 - 1.0) as i64;
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i64;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(self.height as f64 - 1.0) as i64;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f64 + 0.5, y as f64 + 0.5);
                let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), p)
                else {
                    return; // Degenerate on screen
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let fragment = ScreenVertex {
                    x: p.0,
                    y: p.1,
                    depth: w0 * v0.depth + w1 * v1.depth + w2 * v2.depth,
                    world: Point3::from(
                        v0.world.coords * w0 + v1.world.coords * w1 + v2.world.coords * w2,
                    ),
                };
                self.plot(x, y, fragment, true, character, color);
            }
        }
    }

    /// Model edges for wireframe mode; clipped like the solid.
    pub fn render_edges(
        &mut self,
        edges: &[(Point3<f64>, Point3<f64>)],
        transform: &ModelTransform,
        camera: &Camera,
        color: Color,
    ) {
        for (p, q) in edges {
            self.draw_line(camera, transform.apply(p), transform.apply(q), true, '+', Some(color));
        }
    }

    /// Helper geometry such as the grid or plane outlines; never clipped.
    pub fn render_segments(
        &mut self,
        segments: &[(Point3<f64>, Point3<f64>)],
        camera: &Camera,
        c: char,
        color: Color,
    ) {
        for (p, q) in segments {
            self.draw_line(camera, *p, *q, false, c, Some(color));
        }
    }

    fn draw_line(
        &mut self,
        camera: &Camera,
        from: Point3<f64>,
        to: Point3<f64>,
        clipped: bool,
        c: char,
        color: Option<Color>,
    ) {
        let (Some(a), Some(b)) = (self.project(camera, from), self.project(camera, to)) else {
            return;
        };
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0);
        // Lines far off screen would take forever to walk
        if steps > 4.0 * (self.width + self.height) as f64 {
            return;
        }
        for i in 0..=steps as i64 {
            let t = i as f64 / steps;
            let fragment = ScreenVertex {
                x: a.x + (b.x - a.x) * t,
                y: a.y + (b.y - a.y) * t,
                depth: a.depth + (b.depth - a.depth) * t - LINE_DEPTH_BIAS,
                world: Point3::from(a.world.coords.lerp(&b.world.coords, t)),
            };
            self.plot(fragment.x.floor() as i64, fragment.y.floor() as i64, fragment, clipped, c, color);
        }
    }

    /// A marker drawn on top of everything.
    pub fn draw_marker(&mut self, camera: &Camera, point: Point3<f64>, c: char, color: Color) {
        if let Some(mut v) = self.project(camera, point) {
            v.depth = f64::NEG_INFINITY;
            self.plot(v.x.floor() as i64, v.y.floor() as i64, v, false, c, Some(color));
        }
    }

    /// Text centered on a projected point, drawn on top of everything.
    pub fn draw_label(&mut self, camera: &Camera, anchor: Point3<f64>, text: &str, color: Color) {
        let Some(v) = self.project(camera, anchor) else {
            return;
        };
        let start = v.x.floor() as i64 - text.chars().count() as i64 / 2;
        let mut fragment = v;
        fragment.depth = f64::NEG_INFINITY;
        for (i, c) in text.chars().enumerate() {
            self.plot(start + i as i64, v.y.floor() as i64, fragment, false, c, Some(color));
        }
    }

    /// Overlay a line of text in screen space, e.g. a status bar.
    pub fn draw_text(&mut self, x: usize, y: usize, text: &str, color: Color) {
        if y >= self.height {
            return;
        }
        for (i, c) in text.chars().enumerate().take(self.width.saturating_sub(x)) {
            let idx = y * self.width + x + i;
            self.char_buffer[idx] = c;
            self.color_buffer[idx] = Some(color);
            self.depth_buffer[idx] = f64::NEG_INFINITY;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let c = self.char_buffer[idx];

                // Shaded surfaces are colored by intensity
                let color = self.color_buffer[idx].unwrap_or(match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                });

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }

    #[cfg(test)]
    fn char_at(&self, x: usize, y: usize) -> char {
        self.char_buffer[y * self.width + x]
    }

    #[cfg(test)]
    fn color_at(&self, x: usize, y: usize) -> Option<Color> {
        self.color_buffer[y * self.width + x]
    }
}

impl ClipTarget for AsciiRenderer {
    fn set_clip_planes(&mut self, planes: &[ClipPlaneEquation]) {
        self.clip_planes = planes.to_vec();
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f64, f64),
    v1: (f64, f64),
    v2: (f64, f64),
    p: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-9 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
