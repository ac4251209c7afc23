/// Scene state: content plane, head pose, camera and per-eye matrices
use nalgebra::Matrix4;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::geometry::ContentPlane;
use crate::projection::{camera_matrix, Eye};
use crate::error::Result;
use crate::transform::Transform;

/// Matrices derived for one eye pass. Never reused for the other eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeFrame {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub model_view: Matrix4<f32>,
    pub model_view_projection: Matrix4<f32>,
    pub eye_view_projection: Matrix4<f32>,
}

/// Scene owned by the render thread
#[derive(Debug, Clone)]
pub struct SceneState {
    plane: ContentPlane,
    head_view: Matrix4<f32>,
    camera: Matrix4<f32>,
    camera_z: f32,
}

impl SceneState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            plane: ContentPlane::in_front(config.object_distance),
            head_view: Matrix4::identity(),
            camera: camera_matrix(config.camera_z),
            camera_z: config.camera_z,
        }
    }

    pub fn plane(&self) -> &ContentPlane {
        &self.plane
    }

    pub fn plane_mut(&mut self) -> &mut ContentPlane {
        &mut self.plane
    }

    pub fn head_view(&self) -> &Matrix4<f32> {
        &self.head_view
    }

    pub fn camera(&self) -> &Matrix4<f32> {
        &self.camera
    }

    /// Head-to-world transform derived from the current head pose.
    ///
    /// Fails with `SingularMatrix` when the tracker handed over a degenerate pose.
    pub fn head_to_world(&self) -> Result<Matrix4<f32>> {
        Transform::invert(&self.head_view)
    }

    /// Overwrite the head transform
    pub fn update_head(&mut self, head_view: Matrix4<f32>) {
        self.head_view = head_view;
    }

    /// Move the content plane to a new model transform
    pub fn reposition_plane(&mut self, model: Matrix4<f32>) {
        self.plane.model = model;
    }

    /// Rebuild the fixed look-at camera
    pub fn refresh_camera(&mut self) {
        self.camera = camera_matrix(self.camera_z);
    }

    /// Compose camera, eye and model matrices for one eye pass
    pub fn eye_frame(&self, eye: &Eye, near: f32, far: f32) -> EyeFrame {
        let view = Transform::multiply(&eye.view, &self.camera);
        let projection = eye.perspective(near, far);
        let model_view = Transform::multiply(&view, &self.plane.model);
        let model_view_projection = Transform::multiply(&projection, &model_view);
        let eye_view_projection = Transform::multiply(&projection, &view);

        EyeFrame {
            view,
            projection,
            model_view,
            model_view_projection,
            eye_view_projection,
        }
    }
}

/// Latest head transform handed from the tracking thread to the render thread
#[derive(Debug, Clone)]
pub struct HeadPoseSlot {
    latest: Arc<Mutex<(Matrix4<f32>, u64)>>,
}

impl HeadPoseSlot {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(Mutex::new((Matrix4::identity(), 0))),
        }
    }

    /// Replace the pose. Called by the head-tracking provider.
    pub fn publish(&self, head_view: Matrix4<f32>) {
        let mut latest = self.latest.lock();
        latest.0 = head_view;
        latest.1 += 1;
    }

    /// Current pose and how many poses were published so far
    pub fn latest(&self) -> (Matrix4<f32>, u64) {
        *self.latest.lock()
    }
}

impl Default for HeadPoseSlot {
    fn default() -> Self {
        Self::new()
    }
}
