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

//! Perspective cameras and their post-processing chain.

use crate::math::{Frustum, LinearRgba, Mat4, Vec3, FRAC_PI_2};
use crate::renderer::api::CubeFace;
use serde::{Deserialize, Serialize};

/// Post-processing applied to the lit buffer by the post-fx pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFxSettings {
    /// Color faded to.
    pub fade_color: LinearRgba,
    /// Fade amount in `[0, 1]`.
    pub fade: f32,
    /// Radial blur strength in `[0, 1]`.
    pub radial_blur: f32,
    /// Saturation multiplier.
    pub saturation: f32,
    /// Brightness multiplier.
    pub brightness: f32,
}

impl Default for PostFxSettings {
    fn default() -> Self {
        Self {
            fade_color: LinearRgba::BLACK,
            fade: 0.0,
            radial_blur: 0.0,
            saturation: 1.0,
            brightness: 1.0,
        }
    }
}

impl PostFxSettings {
    /// Returns `true` when no effect would change the image.
    pub fn is_identity(&self) -> bool {
        self.fade <= 0.0
            && self.radial_blur <= 0.0
            && self.saturation == 1.0
            && self.brightness == 1.0
    }
}

/// A perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space eye position.
    pub position: Vec3,
    /// World to view transform.
    pub view: Mat4,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
    /// Post-processing chain.
    pub post_fx: PostFxSettings,
}

impl Camera {
    /// A camera at `position` looking at `target`.
    ///
    /// Returns `None` for a degenerate orientation.
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Option<Self> {
        Some(Self {
            position,
            view: Mat4::look_at_rh(position, target, up)?,
            fov_y,
            aspect,
            near,
            far,
            post_fx: PostFxSettings::default(),
        })
    }

    /// The camera rendering one face of a cube probe centered at `position`.
    pub fn cube_face(position: Vec3, face: CubeFace, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(position, position + face.forward(), face.up())
            .unwrap_or(Mat4::IDENTITY);
        Self {
            position,
            view,
            fov_y: FRAC_PI_2,
            aspect: 1.0,
            near,
            far,
            post_fx: PostFxSettings::default(),
        }
    }

    /// The camera mirrored about the horizontal plane `y = level`.
    pub fn reflected(&self, level: f32) -> Self {
        Self {
            position: Vec3::new(self.position.x, 2.0 * level - self.position.y, self.position.z),
            view: self.view * Mat4::reflection_y(level),
            post_fx: PostFxSettings::default(),
            ..*self
        }
    }

    /// Projection over the camera's full depth range.
    pub fn projection(&self) -> Mat4 {
        self.projection_range(self.near, self.far)
    }

    /// Projection over a sub-range of depths, used by shadow splits.
    pub fn projection_range(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_zo(self.fov_y, self.aspect, near.max(1e-3), far.max(near + 1e-3))
    }

    /// World to clip transform.
    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view
    }

    /// Culling volume of the camera.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_proj(&self.view_proj())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;

    #[test]
    fn test_cube_face_camera_sees_along_axis() {
        let cam = Camera::cube_face(Vec3::ZERO, CubeFace::PositiveX, 0.1, 100.0);
        let frustum = cam.frustum();
        let on_axis = Aabb::from_center_half_extents(Vec3::new(10.0, 0.0, 0.0), Vec3::ONE);
        let behind = Aabb::from_center_half_extents(Vec3::new(-10.0, 0.0, 0.0), Vec3::ONE);
        assert!(frustum.intersects_aabb(&on_axis));
        assert!(!frustum.intersects_aabb(&behind));
    }

    #[test]
    fn test_reflected_camera_sees_mirrored_geometry() {
        let cam = Camera::look_at(
            Vec3::new(0.0, 5.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        )
        .unwrap();
        let mirrored = cam.reflected(0.0);
        assert_eq!(mirrored.position.y, -5.0);
        let above = Aabb::from_center_half_extents(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE);
        assert!(mirrored.frustum().intersects_aabb(&above));
    }

    #[test]
    fn test_post_fx_default_is_identity() {
        assert!(PostFxSettings::default().is_identity());
    }
}
