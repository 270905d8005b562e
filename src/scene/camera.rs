//! Orbit camera with damped yaw/pitch
//!
//! Pointer drags set a target orbit; `update` eases the camera toward it.

use glam::{Vec2, Vec3};

/// Default eye position (looking at the wall from the launch side)
pub const DEFAULT_EYE: Vec3 = Vec3::new(0.0, 2.0, 10.0);
/// Vertical field of view in degrees
pub const DEFAULT_FOV_DEG: f32 = 75.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

/// Fraction of the remaining orbit covered per 1/60 s
const DAMPING: f32 = 0.05;
/// Radians of orbit per pixel of drag
const DRAG_SENSITIVITY: f32 = 0.005;
const MAX_PITCH: f32 = 1.4;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    target_yaw: f32,
    target_pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_from(DEFAULT_EYE, Vec3::ZERO, 16.0 / 9.0)
    }
}

impl OrbitCamera {
    /// Camera at `eye` orbiting `target`
    pub fn looking_from(eye: Vec3, target: Vec3, aspect: f32) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(NEAR);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        Self {
            target,
            distance,
            yaw,
            pitch,
            target_yaw: yaw,
            target_pitch: pitch,
            fov_y: DEFAULT_FOV_DEG.to_radians(),
            aspect,
        }
    }

    /// Set aspect ratio from viewport size
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Pointer drag by `delta` pixels
    pub fn drag(&mut self, delta: Vec2) {
        self.target_yaw -= delta.x * DRAG_SENSITIVITY;
        self.target_pitch = (self.target_pitch + delta.y * DRAG_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Ease toward the dragged orbit
    pub fn update(&mut self, dt: f32) {
        // Frame-rate independent exponential smoothing
        let t = 1.0 - (1.0 - DAMPING).powf(dt * 60.0);
        self.yaw += (self.target_yaw - self.yaw) * t;
        self.pitch += (self.target_pitch - self.pitch) * t;
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(sy * cp, sp, cy * cp) * self.distance
    }

    /// Project a world point to normalized device coordinates (x, y in -1..1)
    ///
    /// Returns `None` for points behind the near plane.
    pub fn project(&self, point: Vec3) -> Option<(Vec2, f32)> {
        let eye = self.eye();
        let forward = (self.target - eye).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);

        let rel = point - eye;
        let depth = rel.dot(forward);
        if !(NEAR..=FAR).contains(&depth) {
            return None;
        }
        let f = 1.0 / (self.fov_y * 0.5).tan();
        let ndc = Vec2::new(
            rel.dot(right) * f / (depth * self.aspect),
            rel.dot(up) * f / depth,
        );
        Some((ndc, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye_round_trips() {
        let camera = OrbitCamera::default();
        assert!((camera.eye() - DEFAULT_EYE).length() < 1e-4);
    }

    #[test]
    fn test_target_projects_to_centre() {
        let camera = OrbitCamera::default();
        let (ndc, depth) = camera.project(Vec3::ZERO).unwrap();
        assert!(ndc.length() < 1e-5);
        assert!((depth - DEFAULT_EYE.length()).abs() < 1e-4);
    }

    #[test]
    fn test_point_behind_camera_is_culled() {
        let camera = OrbitCamera::default();
        assert!(camera.project(Vec3::new(0.0, 2.0, 20.0)).is_none());
    }

    #[test]
    fn test_drag_eases_in() {
        let mut camera = OrbitCamera::default();
        let start = camera.yaw;
        camera.drag(Vec2::new(-100.0, 0.0));
        camera.update(1.0 / 60.0);
        let after_one = camera.yaw;
        assert!(after_one > start);
        assert!(after_one < start + 0.5);
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        assert!((camera.yaw - (start + 0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_viewport_aspect() {
        let mut camera = OrbitCamera::default();
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(800, 0);
        assert_eq!(camera.aspect, 2.0);
    }
}
