//! 数学工具
//!
//! 基于 `nalgebra`，补充 DirectXMath 风格的左手坐标系辅助函数。
//! 投影矩阵使用 [0, 1] 深度范围，与 D3D12 和 wgpu 的裁剪空间一致。
//! 矩阵按列向量约定使用（`P * V * M * v`），`as_slice()` 为列主序。

pub use nalgebra::{Matrix4 as Mat4, Point3, Unit, Vector3 as Vec3};

pub type Vector3 = Vec3<f32>;
pub type Matrix4 = Mat4<f32>;

/// 角度转弧度
#[inline]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// 左手坐标系的 look-at 视图矩阵
pub fn look_at_lh(eye: &Vector3, focus: &Vector3, up: &Vector3) -> Matrix4 {
    Matrix4::look_at_lh(&Point3::from(*eye), &Point3::from(*focus), up)
}

/// 左手坐标系透视投影（深度映射到 [0, 1]）
///
/// `fov_y` 为垂直视野（弧度）。
pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
    let h = 1.0 / (fov_y * 0.5).tan();
    let w = h / aspect;
    let range = far / (far - near);

    #[rustfmt::skip]
    let m = Matrix4::new(
        w,   0.0, 0.0,   0.0,
        0.0, h,   0.0,   0.0,
        0.0, 0.0, range, -range * near,
        0.0, 0.0, 1.0,   0.0,
    );
    m
}

/// 绕任意轴旋转（弧度）
///
/// 轴长度为零时返回单位矩阵。
pub fn rotation_axis_angle(axis: &Vector3, angle: f32) -> Matrix4 {
    match Unit::try_new(*axis, f32::EPSILON) {
        Some(axis) => Matrix4::from_axis_angle(&axis, angle),
        None => Matrix4::identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn project(m: &Matrix4, p: Vector3) -> Vector3 {
        let clip = m * Vector4::new(p.x, p.y, p.z, 1.0);
        Vector3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = perspective_fov_lh(deg_to_rad(45.0), 2.0, 0.1, 100.0);

        let near = project(&proj, Vector3::new(0.0, 0.0, 0.1));
        let far = project(&proj, Vector3::new(0.0, 0.0, 100.0));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_look_at_lh_places_focus_in_front() {
        let view = look_at_lh(
            &Vector3::new(0.0, 0.0, -5.0),
            &Vector3::zeros(),
            &Vector3::y(),
        );

        // 左手坐标系中观察点位于 +Z
        let origin = view.transform_point(&Point3::origin());
        assert!((origin.z - 5.0).abs() < 1e-5);
        assert!(origin.x.abs() < 1e-5);
    }

    #[test]
    fn test_mvp_keeps_origin_centered() {
        let view = look_at_lh(&Vector3::new(0.0, 0.0, -5.0), &Vector3::zeros(), &Vector3::y());
        let proj = perspective_fov_lh(deg_to_rad(45.0), 2400.0 / 1200.0, 0.1, 100.0);
        let ndc = project(&(proj * view), Vector3::zeros());

        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_rotation_axis_angle() {
        let rot = rotation_axis_angle(&Vector3::new(0.0, 1.0, 1.0), 0.0);
        assert_eq!(rot, Matrix4::identity());

        let rot = rotation_axis_angle(&Vector3::zeros(), 1.0);
        assert_eq!(rot, Matrix4::identity());
    }
}
