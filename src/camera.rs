use glam::{Mat4, Vec3};

use crate::render::CameraParams;

const MIN_PITCH: f32 = -1.5;
const MAX_PITCH: f32 = 1.5;
const MIN_DISTANCE: f32 = 2.0;
const MAX_DISTANCE: f32 = 2000.0;
const ROTATE_SENSITIVITY: f32 = 0.005;
const ZOOM_SENSITIVITY: f32 = 0.1;

/// Orbit camera driven by mouse drag and wheel input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
}

impl OrbitCamera {
    /// Builds an orbit camera looking from `position` at `target`.
    pub fn from_position(position: Vec3, target: Vec3, fov: f32) -> Self {
        let offset = position - target;
        let distance = offset.length().max(MIN_DISTANCE);
        let pitch = (offset.y / distance).asin();
        let yaw = offset.z.atan2(offset.x);
        Self {
            target,
            distance,
            yaw,
            pitch,
            fov,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.target
            + self.distance
                * Vec3::new(
                    self.yaw.cos() * self.pitch.cos(),
                    self.pitch.sin(),
                    self.yaw.sin() * self.pitch.cos(),
                )
    }

    /// Applies a mouse drag delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * ROTATE_SENSITIVITY;
        self.pitch = (self.pitch + dy * ROTATE_SENSITIVITY).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Applies a scroll delta; positive values move the camera closer.
    pub fn zoom(&mut self, amount: f32) {
        self.distance =
            (self.distance * (1.0 - amount * ZOOM_SENSITIVITY)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Camera uniforms for the given viewport aspect ratio.
    pub fn params(&self, aspect: f32) -> CameraParams {
        let position = self.position();
        let view = Mat4::look_at_rh(position, self.target, Vec3::Y);
        let projection =
            Mat4::perspective_rh_gl(self.fov.to_radians(), aspect.max(0.01), 1.0, 10000.0);
        CameraParams {
            view_proj: projection * view,
            position,
        }
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        // Starting pose of the room walkthrough.
        Self::from_position(Vec3::new(30.0, 20.0, 20.0), Vec3::ZERO, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_position_round_trips() {
        let camera = OrbitCamera::from_position(Vec3::new(30.0, 20.0, 20.0), Vec3::ZERO, 30.0);
        let position = camera.position();
        assert!((position - Vec3::new(30.0, 20.0, 20.0)).length() < 1e-3);
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate(0.0, 10_000.0);
        assert!(camera.pitch <= MAX_PITCH);
        camera.rotate(0.0, -100_000.0);
        assert!(camera.pitch >= MIN_PITCH);
    }

    #[test]
    fn zoom_stays_clamped() {
        let mut camera = OrbitCamera::default();
        for _ in 0..1000 {
            camera.zoom(1.0);
        }
        assert!(camera.distance >= MIN_DISTANCE);
        for _ in 0..1000 {
            camera.zoom(-1.0);
        }
        assert!(camera.distance <= MAX_DISTANCE);
    }

    #[test]
    fn params_are_deterministic_for_an_aspect() {
        let camera = OrbitCamera::default();
        let first = camera.params(16.0 / 9.0);
        let second = camera.params(16.0 / 9.0);
        assert_eq!(first.view_proj, second.view_proj);
        assert_eq!(first.position, second.position);
    }
}
