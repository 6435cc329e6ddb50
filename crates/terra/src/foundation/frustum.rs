//! View frustum extraction and AABB intersection, used by the GPU culling
//! compute pass's CPU-side counterpart (and by tests that verify the
//! compute shader's logic against a reference) — spec §4.9's VS-indirect
//! variant.

use super::aabb::Aabb;
use super::math::{Mat4, Vec3};

/// A plane in `ax + by + cz + d = 0` form, normal pointing inward.
#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vec3,
    d: f32,
}

impl Plane {
    fn normalize(self) -> Self {
        let len = self.normal.norm();
        if len < f32::EPSILON {
            return self;
        }
        Self {
            normal: self.normal / len,
            d: self.d / len,
        }
    }

    /// Signed distance from `point` to the plane.
    fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.d
    }
}

/// Six half-spaces bounding the visible volume of a `projection * view`
/// matrix, extracted via the standard Gribb-Hartmann method.
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let m = view_projection;

        let make = |r0: f32, r1: f32, r2: f32, r3: f32,
                    r0b: f32, r1b: f32, r2b: f32, r3b: f32| {
            Plane {
                normal: Vec3::new(r0 + r0b, r1 + r1b, r2 + r2b),
                d: r3 + r3b,
            }
            .normalize()
        };

        let left = make(
            m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)],
            m[(0, 0)], m[(0, 1)], m[(0, 2)], m[(0, 3)],
        );
        let right = Plane {
            normal: Vec3::new(m[(3, 0)] - m[(0, 0)], m[(3, 1)] - m[(0, 1)], m[(3, 2)] - m[(0, 2)]),
            d: m[(3, 3)] - m[(0, 3)],
        }
        .normalize();
        let bottom = make(
            m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)],
            m[(1, 0)], m[(1, 1)], m[(1, 2)], m[(1, 3)],
        );
        let top = Plane {
            normal: Vec3::new(m[(3, 0)] - m[(1, 0)], m[(3, 1)] - m[(1, 1)], m[(3, 2)] - m[(1, 2)]),
            d: m[(3, 3)] - m[(1, 3)],
        }
        .normalize();
        let near = Plane {
            normal: Vec3::new(m[(2, 0)], m[(2, 1)], m[(2, 2)]),
            d: m[(2, 3)],
        }
        .normalize();
        let far = Plane {
            normal: Vec3::new(m[(3, 0)] - m[(2, 0)], m[(3, 1)] - m[(2, 1)], m[(3, 2)] - m[(2, 2)]),
            d: m[(3, 3)] - m[(2, 3)],
        }
        .normalize();

        Self {
            planes: [left, right, bottom, top, near, far],
        }
    }

    /// The six half-space planes as `(normal.x, normal.y, normal.z, d)`
    /// tuples, in `left, right, bottom, top, near, far` order — the layout
    /// the culling compute shader's push constant expects.
    pub fn planes(&self) -> [[f32; 4]; 6] {
        self.planes.map(|p| [p.normal.x, p.normal.y, p.normal.z, p.d])
    }

    /// True if `aabb` is at least partially inside every half-space
    /// (standard positive-vertex test: reject only if the vertex furthest
    /// along the plane's normal is still behind it).
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let positive = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if plane.distance(positive) < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;

    #[test]
    fn centered_box_survives_wide_frustum() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let frustum = Frustum::from_view_projection(&(proj * view));
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(frustum.intersects_aabb(&aabb));
    }

    #[test]
    fn box_far_behind_camera_is_culled() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let frustum = Frustum::from_view_projection(&(proj * view));
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 90.0), Vec3::new(1.0, 1.0, 92.0));
        assert!(!frustum.intersects_aabb(&aabb));
    }
}
