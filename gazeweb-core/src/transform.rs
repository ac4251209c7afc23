/// 4x4 transform utilities and head rotation state
///
/// All matrices are column-major (OpenGL convention) and compose right to
/// left: `multiply(a, b)` applies `b` first.
use nalgebra::{Matrix4, Point3, Unit, Vector3, Vector4};

use crate::error::{GazeError, Result};

/// Determinant magnitude below which a matrix is treated as singular
pub const SINGULAR_EPSILON: f32 = 1e-8;

/// Head rotation around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    /// Clamp pitch so the head cannot flip over
    pub fn clamp_pitch(&mut self, limit: f32) {
        self.x = self.x.clamp(-limit, limit);
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    pub fn identity() -> Matrix4<f32> {
        Matrix4::identity()
    }

    /// Head orientation: roll about Z, then pitch about X, then yaw about Y
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        ry * rx * rz
    }

    /// World-to-head matrix for a head orientation.
    ///
    /// The orientation is orthonormal so its inverse is its transpose.
    pub fn head_view(rotation: &RotationState) -> Matrix4<f32> {
        Self::rotation_matrix(rotation).transpose()
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Rotation of `angle_deg` degrees around `axis`.
    ///
    /// A zero-length axis yields the identity.
    pub fn rotation_about(angle_deg: f32, axis: Vector3<f32>) -> Matrix4<f32> {
        match Unit::try_new(axis, f32::EPSILON) {
            Some(axis) => Matrix4::from_axis_angle(&axis, angle_deg.to_radians()),
            None => Matrix4::identity(),
        }
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Post-multiply `m` by a translation, like `Matrix.translateM`
    pub fn translate(m: &Matrix4<f32>, x: f32, y: f32, z: f32) -> Matrix4<f32> {
        m * Self::translation_matrix(x, y, z)
    }

    /// Post-multiply `m` by a scale
    pub fn scale(m: &Matrix4<f32>, sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        m * Self::scale_matrix(sx, sy, sz)
    }

    pub fn multiply(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
        a * b
    }

    /// Transform a homogeneous vector as given (w is preserved through `m`)
    pub fn transform_vector(m: &Matrix4<f32>, v: &Vector4<f32>) -> Vector4<f32> {
        m * v
    }

    /// Transform a 3D point, treating it as `w = 1`
    pub fn transform_point(m: &Matrix4<f32>, p: &Vector3<f32>) -> Vector4<f32> {
        m * Vector4::new(p.x, p.y, p.z, 1.0)
    }

    /// Invert `m`, failing when the determinant is within tolerance of zero
    pub fn invert(m: &Matrix4<f32>) -> Result<Matrix4<f32>> {
        let determinant = m.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(GazeError::SingularMatrix { determinant });
        }
        m.try_inverse()
            .ok_or(GazeError::SingularMatrix { determinant })
    }

    /// Right-handed look-at view matrix
    pub fn look_at(eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
        Matrix4::look_at_rh(&eye, &target, &up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_transform() -> Matrix4<f32> {
        let r = Transform::rotation_about(30.0, Vector3::new(0.3, 1.0, 0.2));
        let t = Transform::translation_matrix(0.5, -1.25, -3.0);
        let s = Transform::scale_matrix(2.0, 0.5, 1.5);
        t * r * s
    }

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        assert_eq!(state.x, 0.0);
        assert_eq!(state.y, 0.0);
        assert_eq!(state.z, 0.0);

        state.rotate(0.1, 0.2, 0.3);
        assert!((state.x - 0.1).abs() < 1e-6);
        assert!((state.y - 0.2).abs() < 1e-6);
        assert!((state.z - 0.3).abs() < 1e-6);

        state.rotate(2.0, 0.0, 0.0);
        state.clamp_pitch(1.5);
        assert_eq!(state.x, 1.5);
    }

    #[test]
    fn test_identity_rotation() {
        let rotation = RotationState::zero();
        let matrix = Transform::rotation_matrix(&rotation);
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_head_view_undoes_orientation() {
        let rotation = RotationState::new(0.2, -0.7, 0.1);
        let product = Transform::head_view(&rotation) * Transform::rotation_matrix(&rotation);
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_about_y_degrees() {
        let m = Transform::rotation_about(90.0, Vector3::y());
        let v = Transform::transform_vector(&m, &Vector4::new(0.0, 0.0, -1.0, 0.0));
        assert_relative_eq!(v, Vector4::new(-1.0, 0.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        let m = Transform::rotation_about(45.0, Vector3::zeros());
        assert_eq!(m, Matrix4::identity());
    }

    #[test]
    fn test_translate_post_multiplies() {
        let m = Transform::translate(&Transform::identity(), 0.0, 0.0, -1.5);
        let p = Transform::transform_point(&m, &Vector3::zeros());
        assert_relative_eq!(p, Vector4::new(0.0, 0.0, -1.5, 1.0));
    }

    #[test]
    fn test_multiply_applies_right_first() {
        let t = Transform::translation_matrix(1.0, 0.0, 0.0);
        let s = Transform::scale_matrix(2.0, 2.0, 2.0);
        let p = Transform::transform_point(&Transform::multiply(&t, &s), &Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vector4::new(3.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_transform_vector_keeps_direction_w() {
        let t = Transform::translation_matrix(4.0, 5.0, 6.0);
        let d = Transform::transform_vector(&t, &Vector4::new(0.0, 0.0, 1.0, 0.0));
        assert_relative_eq!(d, Vector4::new(0.0, 0.0, 1.0, 0.0));
    }

    #[test]
    fn test_double_inverse_round_trips() {
        let m = sample_transform();
        let back = Transform::invert(&Transform::invert(&m).unwrap()).unwrap();
        assert_relative_eq!(back, m, epsilon = 1e-4);
    }

    #[test]
    fn test_multiply_is_associative() {
        let a = sample_transform();
        let b = Transform::rotation_about(-70.0, Vector3::x());
        let c = Transform::translation_matrix(0.0, 2.0, 0.25);
        let left = Transform::multiply(&Transform::multiply(&a, &b), &c);
        let right = Transform::multiply(&a, &Transform::multiply(&b, &c));
        assert_relative_eq!(left, right, epsilon = 1e-4);
    }

    #[test]
    fn test_invert_singular_fails() {
        let flat = Transform::scale_matrix(1.0, 0.0, 1.0);
        assert!(matches!(
            Transform::invert(&flat),
            Err(GazeError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_invert_rejects_nan() {
        let mut m = Matrix4::identity();
        m[(0, 0)] = f32::NAN;
        assert!(Transform::invert(&m).is_err());
    }
}
