/// ASCII draw target for side-by-side stereo in the terminal
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use gazeweb_core::{
    projection::project_to_viewport, ContentDraw, DrawTarget, Eye, GazeError, PointerDraw,
    ProgramLayout, Result, Viewport,
};
use nalgebra::{Matrix4, Vector3, Vector4};
use std::io::Write;

/// Glyphs standing in for rows of a web page
const PAGE_RAMP: &[char] = &['=', '-', ':', '.', ' '];

const POINTER_GLYPH: char = '@';

/// Screen-space vertex: position, depth and texture coordinates
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    u: f32,
    v: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fill {
    Page,
    Placeholder,
    Pointer,
}

/// Character rasterizer that stands in for the GPU
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
    programs_ready: bool,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::DarkGrey; size],
            programs_ready: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let size = width * height;
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; size];
        self.char_buffer = vec![' '; size];
        self.color_buffer = vec![Color::DarkGrey; size];
    }

    /// Character at a cell, for tests and overlays
    pub fn glyph(&self, x: usize, y: usize) -> Option<char> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.char_buffer[y * self.width + x])
    }

    /// Stereo viewports splitting the buffer into left and right halves
    pub fn eye_viewports(&self) -> [Viewport; 2] {
        let half = (self.width / 2) as u32;
        let height = self.height as u32;
        [
            Viewport::new(0, 0, half, height),
            Viewport::new(half, 0, half, height),
        ]
    }

    fn project_strip(
        &self,
        mvp: &Matrix4<f32>,
        positions: &[f32],
        tex_coords: Option<(&[f32], &Matrix4<f32>)>,
        viewport: &Viewport,
    ) -> Option<Vec<ScreenVertex>> {
        let mut projected = Vec::with_capacity(positions.len() / 3);
        for (i, p) in positions.chunks_exact(3).enumerate() {
            let (x, y, depth) = project_to_viewport(mvp, &Vector3::new(p[0], p[1], p[2]), viewport)?;
            let (u, v) = match tex_coords {
                Some((coords, st)) => {
                    let corrected = st * Vector4::new(coords[i * 2], coords[i * 2 + 1], 0.0, 1.0);
                    (corrected.x, corrected.y)
                }
                None => (0.0, 0.0),
            };
            projected.push(ScreenVertex { x, y, depth, u, v });
        }
        Some(projected)
    }

    fn rasterize_strip(&mut self, strip: &[ScreenVertex], fill: Fill, viewport: &Viewport) {
        for i in 0..strip.len().saturating_sub(2) {
            // Keep a consistent winding for odd triangles of the strip
            let tri = if i % 2 == 0 {
                [strip[i], strip[i + 1], strip[i + 2]]
            } else {
                [strip[i + 1], strip[i], strip[i + 2]]
            };
            self.rasterize_triangle(&tri, fill, viewport);
        }
    }

    fn rasterize_triangle(&mut self, tri: &[ScreenVertex; 3], fill: Fill, viewport: &Viewport) {
        let [v0, v1, v2] = *tri;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to the eye's viewport
        let min_x = min_x.max(viewport.x as i32);
        let max_x = max_x.min((viewport.x + viewport.width) as i32 - 1);
        let min_y = min_y.max(viewport.y as i32);
        let max_y = max_y
            .min((viewport.y + viewport.height) as i32 - 1)
            .min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                let idx = y as usize * self.width + x as usize;
                if depth >= self.depth_buffer[idx] {
                    continue;
                }

                let (glyph, color) = match fill {
                    Fill::Pointer => (POINTER_GLYPH, Color::Red),
                    Fill::Placeholder => ('.', Color::DarkGrey),
                    Fill::Page => {
                        let u = w0 * v0.u + w1 * v1.u + w2 * v2.u;
                        let v = w0 * v0.v + w1 * v1.v + w2 * v2.v;
                        page_texel(u, v)
                    }
                };
                self.depth_buffer[idx] = depth;
                self.char_buffer[idx] = glyph;
                self.color_buffer[idx] = color;
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.color_buffer[idx];
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl DrawTarget for AsciiRenderer {
    fn create_programs(&mut self, content: &ProgramLayout, pointer: &ProgramLayout) -> Result<()> {
        for layout in [content, pointer] {
            if !layout.attributes.contains(&"a_Position") || !layout.uniforms.contains(&"u_MVP") {
                return Err(GazeError::ShaderProgram {
                    program: layout.name,
                    reason: "rasterizer needs a_Position and u_MVP".to_string(),
                });
            }
        }
        self.programs_ready = true;
        Ok(())
    }

    fn clear(&mut self, eye: &Eye) {
        let vp = eye.viewport;
        let x_end = ((vp.x + vp.width) as usize).min(self.width);
        let y_end = ((vp.y + vp.height) as usize).min(self.height);
        for y in vp.y as usize..y_end {
            for x in vp.x as usize..x_end {
                let idx = y * self.width + x;
                self.depth_buffer[idx] = f32::INFINITY;
                self.char_buffer[idx] = ' ';
                self.color_buffer[idx] = Color::DarkGrey;
            }
        }
    }

    fn draw_content(&mut self, eye: &Eye, draw: &ContentDraw) {
        if !self.programs_ready {
            return;
        }
        let (fill, tex) = match draw.texture {
            Some(_) => (Fill::Page, Some((draw.tex_coords, &draw.texture_transform))),
            None => (Fill::Placeholder, None),
        };
        if let Some(strip) =
            self.project_strip(&draw.model_view_projection, draw.positions, tex, &eye.viewport)
        {
            self.rasterize_strip(&strip, fill, &eye.viewport);
        }
    }

    fn draw_pointer(&mut self, eye: &Eye, draw: &PointerDraw) {
        if !self.programs_ready {
            return;
        }
        if let Some(strip) =
            self.project_strip(&draw.model_view_projection, &draw.positions, None, &eye.viewport)
        {
            self.rasterize_strip(&strip, Fill::Pointer, &eye.viewport);
            // The reticle is smaller than a cell from most distances; always mark its center.
            let cx = (strip[0].x + strip[3].x) * 0.5;
            let cy = (strip[0].y + strip[3].y) * 0.5;
            let depth = strip[0].depth.min(strip[3].depth);
            self.plot_pointer(cx, cy, depth, &eye.viewport);
        }
    }
}

impl AsciiRenderer {
    fn plot_pointer(&mut self, x: f32, y: f32, depth: f32, viewport: &Viewport) {
        if x < viewport.x as f32
            || x >= (viewport.x + viewport.width) as f32
            || y < 0.0
            || y >= self.height as f32
        {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth <= self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = POINTER_GLYPH;
            self.color_buffer[idx] = Color::Red;
        }
    }
}

/// Stand-in web page: a header band, text rows and a margin
fn page_texel(u: f32, v: f32) -> (char, Color) {
    let u = u.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    if v > 0.88 {
        return ('#', Color::Cyan);
    }
    if u < 0.06 || u > 0.94 {
        return (' ', Color::White);
    }
    let row = (v * 24.0) as usize;
    let glyph = PAGE_RAMP[row % PAGE_RAMP.len()];
    let color = if row % 5 == 0 { Color::Blue } else { Color::White };
    (glyph, color)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
