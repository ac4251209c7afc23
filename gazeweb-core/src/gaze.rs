/// Gaze intersection with the content plane.
///
/// The gaze ray is the eye-space Z axis: it starts at the eye and looks
/// straight ahead, so the reticle always sits where the center of view
/// crosses the plane. Only the depth along that axis is solved for; the
/// hit is then carried back into plane-local space.
use nalgebra::{Matrix4, Vector4};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::error::{GazeError, Result};
use crate::geometry::ContentPlane;
use crate::transform::Transform;

/// Normal Z magnitude below which the plane counts as edge-on
pub const EDGE_ON_EPSILON: f32 = 1e-6;

/// One solved gaze hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    /// Depth along the eye-space Z axis where the plane is crossed
    pub depth: f32,
    /// Hit point in plane-local coordinates (`w = 1`)
    pub local: Vector4<f32>,
}

/// Solve where straight-ahead gaze crosses the plane.
///
/// `plane_vertex` and `normal` are in plane-local space. `head_view` maps
/// world into eye space and `plane_model` maps plane-local into world.
pub fn focus_intersection(
    head_view: &Matrix4<f32>,
    plane_model: &Matrix4<f32>,
    plane_vertex: &Vector4<f32>,
    normal: &Vector4<f32>,
) -> Result<GazeSample> {
    let model_view = Transform::multiply(head_view, plane_model);
    let c_vertex = Transform::transform_vector(&model_view, plane_vertex);
    let c_normal = Transform::transform_vector(&model_view, normal);

    if !c_normal.z.is_finite() || c_normal.z.abs() < EDGE_ON_EPSILON {
        return Err(GazeError::DegenerateGeometry {
            reason: "content plane is viewed edge-on",
        });
    }

    let depth = (c_normal.x * c_vertex.x + c_normal.y * c_vertex.y) / c_normal.z + c_vertex.z;
    if !depth.is_finite() {
        return Err(GazeError::DegenerateGeometry {
            reason: "gaze depth is not finite",
        });
    }

    let eye_point = Vector4::new(0.0, 0.0, depth, 1.0);
    let inverted = Transform::invert(&model_view)?;
    let local = Transform::transform_vector(&inverted, &eye_point);
    trace!(depth, ?local, "gaze intersection solved");

    Ok(GazeSample { depth, local })
}

/// Latest plane-local gaze hit, readable from any thread.
///
/// Starts at the plane center.
#[derive(Debug, Clone)]
pub struct SharedGaze {
    inner: Arc<Mutex<Vector4<f32>>>,
}

impl SharedGaze {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ContentPlane::reference_vertex())),
        }
    }

    pub fn get(&self) -> Vector4<f32> {
        *self.inner.lock()
    }

    fn set(&self, point: Vector4<f32>) {
        *self.inner.lock() = point;
    }
}

impl Default for SharedGaze {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame gaze engine that keeps the last good hit on failure
#[derive(Debug, Clone)]
pub struct GazeTracker {
    shared: SharedGaze,
    failures: u64,
}

impl GazeTracker {
    pub fn new() -> Self {
        Self {
            shared: SharedGaze::new(),
            failures: 0,
        }
    }

    /// Handle for readers outside the render thread
    pub fn handle(&self) -> SharedGaze {
        self.shared.clone()
    }

    pub fn current(&self) -> Vector4<f32> {
        self.shared.get()
    }

    /// Number of frames whose solve failed
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Recompute the hit for this frame.
    ///
    /// On failure the previous hit is kept and the error is returned so the
    /// caller can skip anything derived from a fresh hit.
    pub fn update(&mut self, head_view: &Matrix4<f32>, plane: &ContentPlane) -> Result<GazeSample> {
        match focus_intersection(
            head_view,
            &plane.model,
            &ContentPlane::reference_vertex(),
            &ContentPlane::normal(),
        ) {
            Ok(sample) => {
                self.shared.set(sample.local);
                Ok(sample)
            }
            Err(err) => {
                self.failures += 1;
                warn!(%err, "gaze update skipped, keeping previous intersection");
                Err(err)
            }
        }
    }
}

impl Default for GazeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RotationState;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_straight_ahead_hits_center() {
        let plane = ContentPlane::in_front(1.5);
        let sample = focus_intersection(
            &Matrix4::identity(),
            &plane.model,
            &ContentPlane::reference_vertex(),
            &ContentPlane::normal(),
        )
        .unwrap();
        assert_relative_eq!(sample.depth, -1.5);
        assert_relative_eq!(sample.local, Vector4::new(0.0, 0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_moves_hit_sideways() {
        let plane = ContentPlane::in_front(1.5);
        let yaw = 0.2_f32;
        let head = Transform::head_view(&RotationState::new(0.0, yaw, 0.0));
        let sample = focus_intersection(
            &head,
            &plane.model,
            &ContentPlane::reference_vertex(),
            &ContentPlane::normal(),
        )
        .unwrap();
        // Turning left (positive yaw) looks at the left half of the plane.
        assert_relative_eq!(sample.local.x, -1.5 * yaw.tan(), epsilon = 1e-5);
        assert_relative_eq!(sample.local.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(sample.local.z, 0.0, epsilon = 1e-5);
        assert!(sample.depth < -1.5);
    }

    #[test]
    fn test_pitch_moves_hit_up() {
        let plane = ContentPlane::in_front(2.0);
        let pitch = 0.1_f32;
        let head = Transform::head_view(&RotationState::new(pitch, 0.0, 0.0));
        let sample = focus_intersection(
            &head,
            &plane.model,
            &ContentPlane::reference_vertex(),
            &ContentPlane::normal(),
        )
        .unwrap();
        assert_relative_eq!(sample.local.y, 2.0 * pitch.tan(), epsilon = 1e-5);
    }

    #[test]
    fn test_edge_on_is_degenerate() {
        let mut plane = ContentPlane::in_front(1.5);
        plane.model *= Transform::rotation_about(90.0, Vector3::y());
        let result = focus_intersection(
            &Matrix4::identity(),
            &plane.model,
            &ContentPlane::reference_vertex(),
            &ContentPlane::normal(),
        );
        assert!(matches!(result, Err(GazeError::DegenerateGeometry { .. })));
    }

    #[test]
    fn test_singular_model_view_propagates() {
        let flat = Transform::scale_matrix(0.0, 1.0, 1.0);
        let result = focus_intersection(
            &flat,
            &ContentPlane::in_front(1.5).model,
            &ContentPlane::reference_vertex(),
            &ContentPlane::normal(),
        );
        assert!(matches!(result, Err(GazeError::SingularMatrix { .. })));
    }

    #[test]
    fn test_tracker_keeps_previous_hit_on_edge_on() {
        let mut tracker = GazeTracker::new();
        let plane = ContentPlane::in_front(1.5);
        let head = Transform::head_view(&RotationState::new(0.0, 0.1, 0.0));
        tracker.update(&head, &plane).unwrap();
        let before = tracker.current();

        let mut edge_on = plane.clone();
        edge_on.model *= Transform::rotation_about(90.0, Vector3::y());
        assert!(tracker.update(&Matrix4::identity(), &edge_on).is_err());
        assert_eq!(tracker.current(), before);
        assert_eq!(tracker.failures(), 1);
    }

    #[test]
    fn test_handle_sees_updates() {
        let mut tracker = GazeTracker::new();
        let handle = tracker.handle();
        assert_eq!(handle.get(), Vector4::new(0.0, 0.0, 0.0, 1.0));

        let head = Transform::head_view(&RotationState::new(0.0, -0.3, 0.0));
        tracker.update(&head, &ContentPlane::in_front(1.5)).unwrap();
        assert!(handle.get().x > 0.0);
    }
}
