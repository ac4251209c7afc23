/// Content plane layout and pointer reticle geometry
use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

use crate::transform::Transform;

/// Content quad as a triangle strip, spanning [-1, 1] in local X and Y
pub const PLANE_COORDS: [f32; 12] = [
    -1.0, -1.0, 0.0, //
    1.0, -1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    1.0, 1.0, 0.0,
];

/// Texture coordinates matching `PLANE_COORDS`
pub const PLANE_TEX_COORDS: [f32; 8] = [
    0.0, 0.0, //
    1.0, 0.0, //
    0.0, 1.0, //
    1.0, 1.0,
];

/// Reference point on the plane in local space
pub const PLANE_VERTEX: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Front-face normal in local space
pub const PLANE_NORMAL: [f32; 4] = [0.0, 0.0, 1.0, 0.0];

pub const COORDS_PER_VERTEX: usize = 3;

/// Reticle half-size in plane-local units
pub const POINTER_HALF_SIZE: f32 = 0.005;

/// Reticle offset toward the viewer, avoids z-fighting with the content
pub const POINTER_LIFT: f32 = 0.05;

/// The rectangle in world space that carries the web content
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPlane {
    pub model: Matrix4<f32>,
    pub width: f32,
    pub height: f32,
}

impl ContentPlane {
    /// A plane straight ahead of the viewer at `distance`
    pub fn in_front(distance: f32) -> Self {
        Self {
            model: Transform::translation_matrix(0.0, 0.0, -distance),
            width: 2.0,
            height: 2.0,
        }
    }

    /// Horizontal distance from the viewer, read from the model translation
    pub fn distance(&self) -> f32 {
        Vector2::new(self.model[(0, 3)], self.model[(2, 3)]).norm()
    }

    pub fn reference_vertex() -> Vector4<f32> {
        Vector4::from(PLANE_VERTEX)
    }

    pub fn normal() -> Vector4<f32> {
        Vector4::from(PLANE_NORMAL)
    }

    /// Move the plane around the viewer.
    ///
    /// The current position is swung `angle_xz_deg` about +Y and pushed out
    /// to `distance`, then raised so it sits `elevation_deg` above the
    /// horizon.
    pub fn relocate(&mut self, angle_xz_deg: f32, distance: f32, elevation_deg: f32) {
        let current = self.distance();
        let scale = if current > f32::EPSILON {
            distance / current
        } else {
            1.0
        };
        let swing = Transform::scale(
            &Transform::rotation_about(angle_xz_deg, Vector3::y()),
            scale,
            scale,
            scale,
        );
        let position = swing * self.model.column(3).into_owned();
        let lifted_y = elevation_deg.to_radians().tan() * distance;

        self.model = Transform::translation_matrix(position.x, lifted_y, position.z);
    }
}

impl Default for ContentPlane {
    fn default() -> Self {
        Self::in_front(1.5)
    }
}

/// Reticle marker quad in plane-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerReticle {
    /// Triangle strip: bottom-left, bottom-right, top-left, top-right
    pub vertices: [Vector3<f32>; 4],
}

impl PointerReticle {
    pub fn around(intersection: &Vector4<f32>) -> Self {
        Self::with_size(intersection, POINTER_HALF_SIZE, POINTER_LIFT)
    }

    pub fn with_size(intersection: &Vector4<f32>, half_size: f32, lift: f32) -> Self {
        let lx = intersection.x - half_size;
        let rx = intersection.x + half_size;
        let by = intersection.y - half_size;
        let ty = intersection.y + half_size;
        let z = intersection.z + lift;

        Self {
            vertices: [
                Vector3::new(lx, by, z),
                Vector3::new(rx, by, z),
                Vector3::new(lx, ty, z),
                Vector3::new(rx, ty, z),
            ],
        }
    }

    /// Flattened positions for a vertex attribute upload
    pub fn to_coords(&self) -> [f32; 12] {
        let mut coords = [0.0; 12];
        for (chunk, v) in coords.chunks_exact_mut(COORDS_PER_VERTEX).zip(&self.vertices) {
            chunk.copy_from_slice(v.as_slice());
        }
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reticle_around_origin() {
        let reticle = PointerReticle::around(&Vector4::new(0.0, 0.0, 0.0, 1.0));
        let expected = [
            Vector3::new(-0.005, -0.005, 0.05),
            Vector3::new(0.005, -0.005, 0.05),
            Vector3::new(-0.005, 0.005, 0.05),
            Vector3::new(0.005, 0.005, 0.05),
        ];
        for (got, want) in reticle.vertices.iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_reticle_coords_follow_strip_order() {
        let reticle = PointerReticle::with_size(&Vector4::new(0.5, -0.25, 0.0, 1.0), 0.1, 0.0);
        let coords = reticle.to_coords();
        assert_relative_eq!(coords[0], 0.4, epsilon = 1e-6);
        assert_relative_eq!(coords[1], -0.35, epsilon = 1e-6);
        assert_relative_eq!(coords[9], 0.6, epsilon = 1e-6);
        assert_relative_eq!(coords[10], -0.15, epsilon = 1e-6);
    }

    #[test]
    fn test_default_plane_is_ahead() {
        let plane = ContentPlane::default();
        let center = plane.model * ContentPlane::reference_vertex();
        assert_relative_eq!(center, Vector4::new(0.0, 0.0, -1.5, 1.0));
        assert_eq!(plane.width, 2.0);
    }

    #[test]
    fn test_relocate_half_turn_keeps_level() {
        let mut plane = ContentPlane::in_front(1.5);
        plane.relocate(180.0, 3.0, 0.0);
        let center = plane.model * ContentPlane::reference_vertex();
        assert_relative_eq!(center, Vector4::new(0.0, 0.0, 3.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(plane.distance(), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_relocate_after_direct_move() {
        let mut plane = ContentPlane::in_front(1.5);
        plane.model = Transform::translation_matrix(0.0, 0.0, -3.0);
        assert_relative_eq!(plane.distance(), 3.0);

        plane.relocate(0.0, 3.0, 0.0);
        let center = plane.model * ContentPlane::reference_vertex();
        assert_relative_eq!(center, Vector4::new(0.0, 0.0, -3.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_repeated_elevated_relocations_keep_distance() {
        let mut plane = ContentPlane::in_front(1.5);
        plane.relocate(35.0, 2.0, 10.0);
        plane.relocate(-70.0, 1.5, -5.0);
        assert_relative_eq!(plane.distance(), 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_relocate_elevation() {
        let mut plane = ContentPlane::in_front(2.0);
        plane.relocate(0.0, 2.0, 45.0);
        let center = plane.model * ContentPlane::reference_vertex();
        assert_relative_eq!(center.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(center.z, -2.0, epsilon = 1e-5);
    }
}
