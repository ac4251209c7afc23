/// Camera, eye and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::transform::Transform;

/// Which eye a draw pass renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EyeIndex {
    Left,
    Right,
}

impl EyeIndex {
    pub const BOTH: [EyeIndex; 2] = [EyeIndex::Left, EyeIndex::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Pixel rectangle an eye renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Per-eye parameters supplied by the stereo-view provider
#[derive(Debug, Clone, PartialEq)]
pub struct Eye {
    pub index: EyeIndex,
    /// Head-to-eye transform, already including the head pose
    pub view: Matrix4<f32>,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Physical width over height of the viewport
    pub aspect: f32,
    pub viewport: Viewport,
}

impl Eye {
    pub fn new(index: EyeIndex, view: Matrix4<f32>, fov_y: f32, viewport: Viewport) -> Self {
        Self {
            index,
            view,
            fov_y,
            aspect: viewport.aspect(),
            viewport,
        }
    }

    /// Override the aspect for displays whose pixels are not square
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Perspective projection for this eye's lens and viewport
    pub fn perspective(&self, near: f32, far: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov_y, near, far)
    }
}

/// Fixed camera looking at the origin from just in front of it.
///
/// Rebuilt identically every frame.
pub fn camera_matrix(camera_z: f32) -> Matrix4<f32> {
    Transform::look_at(
        Point3::new(0.0, 0.0, camera_z),
        Point3::origin(),
        Vector3::y(),
    )
}

/// Project a model-space point into viewport pixels.
///
/// Returns `(x, y, depth)` with depth in NDC, or `None` when the point is
/// behind the eye or outside the view volume.
pub fn project_to_viewport(
    mvp: &Matrix4<f32>,
    point: &Vector3<f32>,
    viewport: &Viewport,
) -> Option<(f32, f32, f32)> {
    let clip = mvp * Vector4::new(point.x, point.y, point.z, 1.0);

    // Prevent division by near-zero depth values
    if clip.w < 1e-6 {
        return None;
    }

    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let depth = clip.z / clip.w;

    if !(-1.0..=1.0).contains(&depth) {
        return None;
    }

    // Convert to screen space
    let screen_x = viewport.x as f32 + (ndc_x + 1.0) * 0.5 * viewport.width as f32;
    let screen_y = viewport.y as f32 + (1.0 - ndc_y) * 0.5 * viewport.height as f32;

    Some((screen_x, screen_y, depth))
}
