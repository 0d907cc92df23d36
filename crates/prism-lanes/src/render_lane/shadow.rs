// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sun shadow transforms: the static map and the two camera splits.

use prism_core::math::{Aabb, Mat4, Vec3, Vec4};
use prism_core::renderer::light::MainLightSettings;
use prism_core::renderer::settings::ShadowLevel;
use prism_core::scene::Camera;

/// Edge of the static sun shadow map, before clamping to the device limit.
pub const STATIC_SHADOW_MAP_SIZE: u32 = 8192;

/// Number of dynamic shadow splits.
pub const SHADOW_SPLITS: usize = 2;

/// Depth slack added in front of and behind the fitted volume so that casters
/// outside the view still land in the map.
const Z_PADDING: f32 = 100.0;

/// Edge of the dynamic split maps for a shadow tier, `None` when disabled.
pub fn dynamic_shadow_size(level: ShadowLevel) -> Option<u32> {
    match level {
        ShadowLevel::None => None,
        ShadowLevel::Low | ShadowLevel::Medium => Some(512),
        ShadowLevel::High => Some(1024),
    }
}

/// Blur iterations applied to each split for a shadow tier.
pub fn shadow_blur_passes(level: ShadowLevel) -> u32 {
    match level {
        ShadowLevel::None | ShadowLevel::Low => 0,
        ShadowLevel::Medium | ShadowLevel::High => 1,
    }
}

/// Camera depth range covered by split `split`.
pub fn split_range(camera: &Camera, light: &MainLightSettings, split: usize) -> (f32, f32) {
    let near = camera.near;
    if split == 0 {
        (near, near + light.dynamic_shadow_middle)
    } else {
        (
            near + light.dynamic_shadow_middle - light.dynamic_shadow_middle_blend,
            near + light.dynamic_shadow_end,
        )
    }
}

/// World-space corners of the camera frustum slice between `near` and `far`.
pub fn frustum_slice_corners(camera: &Camera, near: f32, far: f32) -> [Vec3; 8] {
    // View rows hold the camera basis.
    let right = camera.view.get_row(0).truncate();
    let up = camera.view.get_row(1).truncate();
    let forward = -camera.view.get_row(2).truncate();
    let tan = (camera.fov_y * 0.5).tan();

    let mut corners = [Vec3::ZERO; 8];
    for (slot, distance) in [near, far].into_iter().enumerate() {
        let center = camera.position + forward * distance;
        let half_h = distance * tan;
        let half_w = half_h * camera.aspect;
        let mut i = slot * 4;
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                corners[i] = center + right * (half_w * sx) + up * (half_h * sy);
                i += 1;
            }
        }
    }
    corners
}

/// Orthographic sun transform enclosing `points`.
pub fn fit_sun_view_proj(direction: Vec3, points: &[Vec3]) -> Mat4 {
    let light_dir = direction.normalize();
    let up = if light_dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };

    let mut center = Vec3::ZERO;
    for p in points {
        center = center + *p;
    }
    center = center / points.len().max(1) as f32;

    let light_view = Mat4::look_at_rh(center, center + light_dir, up).unwrap_or(Mat4::IDENTITY);

    let mut min = Vec3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut max = Vec3::new(f32::MIN, f32::MIN, f32::MIN);
    for p in points {
        let ls = light_view * Vec4::from_vec3(*p, 1.0);
        min.x = min.x.min(ls.x);
        max.x = max.x.max(ls.x);
        min.y = min.y.min(ls.y);
        max.y = max.y.max(ls.y);
        min.z = min.z.min(ls.z);
        max.z = max.z.max(ls.z);
    }
    // Degenerate extents would produce an infinite projection.
    let widen = |lo: f32, hi: f32| if hi - lo < 1e-3 { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    let (l, r) = widen(min.x, max.x);
    let (b, t) = widen(min.y, max.y);

    // View space looks down -z.
    let light_proj = Mat4::orthographic_rh_zo(l, r, b, t, -max.z - Z_PADDING, -min.z + Z_PADDING);
    light_proj * light_view
}

/// Sun transform of the static map, covering `bounds` whatever the camera.
pub fn static_view_proj(light: &MainLightSettings, bounds: &Aabb) -> Mat4 {
    let (lo, hi) = (bounds.min, bounds.max);
    let corners = [
        Vec3::new(lo.x, lo.y, lo.z),
        Vec3::new(hi.x, lo.y, lo.z),
        Vec3::new(lo.x, hi.y, lo.z),
        Vec3::new(hi.x, hi.y, lo.z),
        Vec3::new(lo.x, lo.y, hi.z),
        Vec3::new(hi.x, lo.y, hi.z),
        Vec3::new(lo.x, hi.y, hi.z),
        Vec3::new(hi.x, hi.y, hi.z),
    ];
    fit_sun_view_proj(light.direction(), &corners)
}

/// Sun transform of dynamic split `split`.
pub fn split_view_proj(camera: &Camera, light: &MainLightSettings, split: usize) -> Mat4 {
    let (near, far) = split_range(camera, light, split);
    let corners = frustum_slice_corners(camera, near, far);
    fit_sun_view_proj(light.direction(), &corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prism_core::math::FRAC_PI_2;

    fn camera() -> Camera {
        Camera::look_at(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::Y,
            FRAC_PI_2,
            1.0,
            1.0,
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_split_ranges_overlap_by_blend() {
        let light = MainLightSettings::default();
        let cam = camera();
        let (n0, f0) = split_range(&cam, &light, 0);
        let (n1, f1) = split_range(&cam, &light, 1);
        assert_relative_eq!(n0, 1.0);
        assert_relative_eq!(f0, 13.0);
        assert_relative_eq!(n1, 11.0);
        assert_relative_eq!(f1, 51.0);
    }

    #[test]
    fn test_slice_corners_lie_on_frustum() {
        let corners = frustum_slice_corners(&camera(), 2.0, 4.0);
        // 90 degree fov: half extent equals distance.
        assert_relative_eq!(corners[0].x, -2.0, epsilon = 1e-5);
        assert_relative_eq!(corners[0].z, -2.0, epsilon = 1e-5);
        assert_relative_eq!(corners[7].x, 4.0, epsilon = 1e-5);
        assert_relative_eq!(corners[7].y, 4.0, epsilon = 1e-5);
        assert_relative_eq!(corners[7].z, -4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fitted_volume_contains_points() {
        let light = MainLightSettings::default();
        let bounds = Aabb::from_min_max(Vec3::new(-5.0, 0.0, -5.0), Vec3::new(5.0, 2.0, 5.0));
        let vp = static_view_proj(&light, &bounds);
        for p in [bounds.min, bounds.max, bounds.center()] {
            let clip = vp * Vec4::from_vec3(p, 1.0);
            assert!(clip.x.abs() <= 1.0 + 1e-4, "{clip:?}");
            assert!(clip.y.abs() <= 1.0 + 1e-4, "{clip:?}");
            assert!((0.0..=1.0).contains(&clip.z), "{clip:?}");
        }
    }

    #[test]
    fn test_tier_tables() {
        assert_eq!(dynamic_shadow_size(ShadowLevel::None), None);
        assert_eq!(dynamic_shadow_size(ShadowLevel::Medium), Some(512));
        assert_eq!(dynamic_shadow_size(ShadowLevel::High), Some(1024));
        assert_eq!(shadow_blur_passes(ShadowLevel::Low), 0);
        assert_eq!(shadow_blur_passes(ShadowLevel::High), 1);
    }
}
