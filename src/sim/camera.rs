//! Robot camera projection
//!
//! Maps world points into the robot's normalized screen space, where the
//! visible range is (-0.5, 0.5) on both axes and +Y is up on screen.

use glam::{Mat4, Vec2, Vec3};

use crate::settings::Arena;

/// Fixed camera intrinsics and mount, shared by every robot
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Mat4,
    /// Camera pose in the robot body frame
    mount: Mat4,
}

impl Camera {
    pub fn new(arena: &Arena) -> Self {
        let projection = Mat4::perspective_rh_gl(
            arena.robot_camera_fov.to_radians(),
            arena.robot_camera_aspect,
            arena.robot_camera_near,
            arena.robot_camera_far,
        );
        let mount = Mat4::from_translation(Vec3::new(
            arena.robot_camera_x,
            arena.robot_camera_y,
            arena.robot_camera_z,
        )) * Mat4::from_rotation_x(arena.robot_camera_r);

        Self { projection, mount }
    }

    /// World-to-clip transform for a robot at `position`/`z` with heading `angle`
    pub fn world_to_clip(&self, position: Vec2, z: f32, angle: f32) -> Mat4 {
        let body = Mat4::from_translation(position.extend(z)) * Mat4::from_rotation_z(angle);
        self.projection * (body * self.mount).inverse()
    }
}

/// Project a world point to normalized screen coordinates.
///
/// Returns `None` for points behind the camera or outside the frame.
pub fn project(world_to_clip: &Mat4, point: Vec3) -> Option<Vec2> {
    let clip = *world_to_clip * point.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let screen = Vec2::new(clip.x, clip.y) / clip.w / 2.0;
    (screen.abs().max_element() < 0.5).then_some(screen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at_origin() -> (Arena, Mat4) {
        let arena = Arena::default();
        let camera = Camera::new(&arena);
        let m = camera.world_to_clip(Vec2::ZERO, 0.0, 0.0);
        (arena, m)
    }

    #[test]
    fn test_optical_axis_hits_screen_center() {
        let (arena, m) = camera_at_origin();
        let r = arena.robot_camera_r;
        let axis = Vec3::new(0.0, r.sin(), -r.cos());
        let point = Vec3::new(0.0, 0.0, arena.robot_camera_z) + axis * 1.5;
        let screen = project(&m, point).expect("point on axis is visible");
        assert!(screen.length() < 1e-4, "got {screen}");
    }

    #[test]
    fn test_ball_ahead_is_visible() {
        let (_, m) = camera_at_origin();
        let screen = project(&m, Vec3::new(0.0, 1.0, 0.02)).expect("ball ahead is visible");
        assert!(screen.x.abs() < 1e-4);
        // Past the spot where the optical axis meets the floor, so above center
        assert!(screen.y > 0.0);
    }

    #[test]
    fn test_left_is_left_on_screen() {
        let (_, m) = camera_at_origin();
        let screen = project(&m, Vec3::new(-0.2, 1.0, 0.02)).expect("visible");
        assert!(screen.x < 0.0);
    }

    #[test]
    fn test_behind_camera_is_hidden() {
        let (_, m) = camera_at_origin();
        assert!(project(&m, Vec3::new(0.0, -1.0, 0.02)).is_none());
    }

    #[test]
    fn test_far_off_axis_is_hidden() {
        let (_, m) = camera_at_origin();
        assert!(project(&m, Vec3::new(2.0, 0.5, 0.02)).is_none());
    }

    #[test]
    fn test_heading_rotates_view() {
        let arena = Arena::default();
        let camera = Camera::new(&arena);
        // Facing +X
        let m = camera.world_to_clip(Vec2::ZERO, 0.0, -std::f32::consts::FRAC_PI_2);
        assert!(project(&m, Vec3::new(1.0, 0.0, 0.02)).is_some());
        assert!(project(&m, Vec3::new(0.0, 1.0, 0.02)).is_none());
    }
}
