//! Camera view, view frustum and bounding boxes for visibility culling

use glam::{Mat4, Vec3, Vec4};

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any `grow` call replaces.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// View frustum as six inward-facing planes `(n, d)` with `n·p + d >= 0`
/// inside: left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix using a [0, 1] clip depth
    /// range (wgpu convention).
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    /// True when the box is at least partially inside. Conservative: boxes
    /// near frustum corners may pass even when fully outside.
    pub fn overlaps(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            // Corner furthest along the plane normal
            let positive = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(positive) + plane.w >= 0.0
        })
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let len = plane.truncate().length();
    if len > 0.0 {
        plane / len
    } else {
        plane
    }
}

/// The camera matrices terrain streaming and culling consume
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
}

impl CameraView {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn inverse_view(&self) -> Mat4 {
        self.view.inverse()
    }

    /// World-space eye position, taken from the inverse view's translation.
    pub fn position(&self) -> Vec3 {
        self.inverse_view().w_axis.truncate()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_negative_z() -> CameraView {
        CameraView::new(
            Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y),
            Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0),
        )
    }

    #[test]
    fn aabb_grows_to_contain_points() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        aabb.grow(Vec3::new(1.0, -2.0, 3.0));
        aabb.grow(Vec3::new(-1.0, 4.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 3.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 1.0, 1.5));
    }

    #[test]
    fn box_in_front_is_visible() {
        let frustum = looking_down_negative_z().frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
        assert!(frustum.overlaps(&aabb));
    }

    #[test]
    fn box_behind_is_culled() {
        let frustum = looking_down_negative_z().frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 11.0));
        assert!(!frustum.overlaps(&aabb));
    }

    #[test]
    fn box_beyond_far_plane_is_culled() {
        let frustum = looking_down_negative_z().frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -300.0), Vec3::new(1.0, 1.0, -200.0));
        assert!(!frustum.overlaps(&aabb));
    }

    #[test]
    fn box_far_to_the_side_is_culled() {
        let frustum = looking_down_negative_z().frustum();
        let aabb = Aabb::new(Vec3::new(50.0, -1.0, -11.0), Vec3::new(52.0, 1.0, -9.0));
        assert!(!frustum.overlaps(&aabb));
    }

    #[test]
    fn straddling_box_is_visible() {
        let frustum = looking_down_negative_z().frustum();
        let aabb = Aabb::new(Vec3::new(-100.0, -1.0, -20.0), Vec3::new(100.0, 1.0, 20.0));
        assert!(frustum.overlaps(&aabb));
    }

    #[test]
    fn empty_box_is_never_visible() {
        let frustum = looking_down_negative_z().frustum();
        assert!(!frustum.overlaps(&Aabb::EMPTY));
    }

    #[test]
    fn position_comes_from_inverse_view() {
        let eye = Vec3::new(12.0, 30.0, -4.0);
        let camera = CameraView::new(
            Mat4::look_at_rh(eye, Vec3::new(0.0, 0.0, 0.0), Vec3::Y),
            Mat4::IDENTITY,
        );
        assert!((camera.position() - eye).length() < 1e-3);
    }
}
