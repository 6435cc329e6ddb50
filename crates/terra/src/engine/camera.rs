//! Application-defined cameras (spec §6's `add_camera`/`set_camera`):
//! a view/projection pair plus the frustum the VS-indirect culling pass
//! tests AABBs against.

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::foundation::Frustum;
use crate::handles::CameraKey;

/// A perspective camera. `up` is world-space, not normalized on input.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn frustum(&self, aspect: f32) -> Frustum {
        Frustum::from_view_projection(&self.view_projection(aspect))
    }
}

/// Stable-handle storage for live cameras, with one designated "active"
/// camera the renderer draws from.
#[derive(Default)]
pub struct CameraContainer {
    cameras: SlotMap<CameraKey, Camera>,
    active: Option<CameraKey>,
}

impl CameraContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, camera: Camera) -> CameraKey {
        let key = self.cameras.insert(camera);
        if self.active.is_none() {
            self.active = Some(key);
        }
        key
    }

    pub fn remove(&mut self, key: CameraKey) -> Option<Camera> {
        let removed = self.cameras.remove(key);
        if self.active == Some(key) {
            self.active = self.cameras.keys().next();
        }
        removed
    }

    pub fn set_active(&mut self, key: CameraKey) {
        self.active = Some(key);
    }

    pub fn active(&self) -> Option<&Camera> {
        self.active.and_then(|key| self.cameras.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Aabb;

    #[test]
    fn boundary_scenario_4_indirect_cull_frustum_cull() {
        let camera = Camera {
            eye: Vec3::new(0.0, 0.0, 0.0),
            target: Vec3::new(0.0, 0.0, 1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov_y: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: 10.0,
        };
        let frustum = camera.frustum(1.0);

        let near_box = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        assert!(frustum.intersects_aabb(&near_box));

        let far_box = Aabb::new(Vec3::new(99.0, -1.0, 4.0), Vec3::new(101.0, 1.0, 6.0));
        assert!(!frustum.intersects_aabb(&far_box));
    }
}
