//! Orbit camera producing terrain camera views

use glam::{Mat4, Vec3};
use strata_terrain::CameraView;

/// A perspective camera orbiting a target point
pub struct OrbitCamera {
    /// Point the camera looks at
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    /// Horizontal angle in radians
    pub yaw: f32,
    /// Vertical angle in radians
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 300.0,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: std::f32::consts::FRAC_PI_6,
            fov: 45.0,
            near: 0.5,
            far: 20_000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aim at the middle of a terrain extent and back off far enough to see
    /// all of it.
    pub fn framing(world_width: f32, world_depth: f32, mid_height: f32) -> Self {
        let extent = world_width.max(world_depth);
        Self {
            target: Vec3::new(world_width * 0.5, mid_height, world_depth * 0.5),
            distance: extent * 1.1,
            far: (extent * 4.0).max(1000.0),
            ..Self::default()
        }
    }

    /// World-space eye position derived from the orbit parameters
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Orbit horizontally (rotate around target)
    pub fn orbit_horizontal(&mut self, delta: f32) {
        self.yaw += delta;
    }

    /// Orbit vertically, stopping just short of the poles
    pub fn orbit_vertical(&mut self, delta: f32) {
        self.pitch = (self.pitch + delta).clamp(-1.56, 1.56);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).max(1.0);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Perspective projection with wgpu's [0, 1] depth range
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view(&self) -> CameraView {
        CameraView::new(self.view_matrix(), self.projection_matrix())
    }
}
