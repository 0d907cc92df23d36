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

//! Drawable categories other than meshes.

use super::InstanceId;
use crate::math::{Aabb, LinearRgba, Mat4, Vec2, Vec3};
use crate::renderer::api::TextureHandle;

/// Placement and visibility shared by every non-mesh drawable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Identity, assigned when the drawable is added to a scene.
    pub id: InstanceId,
    /// Object to world transform.
    pub transform: Mat4,
    /// World-space bounds.
    pub bounds: Aabb,
    /// Base color.
    pub color: LinearRgba,
    /// Skipped by every executor.
    pub hidden: bool,
}

impl Placement {
    /// Places unit geometry with `transform`.
    pub fn new(transform: Mat4, color: LinearRgba) -> Self {
        let unit = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE * 0.5);
        Self {
            id: InstanceId::default(),
            transform,
            bounds: unit.transform(&transform),
            color,
            hidden: false,
        }
    }
}

/// A projected texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Decal {
    /// Placement of the projection box.
    pub placement: Placement,
    /// Projected texture.
    pub texture: Option<TextureHandle>,
}

/// A camera-facing quad.
#[derive(Debug, Clone, PartialEq)]
pub struct Billboard {
    /// Placement; only the translation is used for orientation.
    pub placement: Placement,
    /// World-space size of the quad.
    pub size: Vec2,
    /// Quad texture.
    pub texture: Option<TextureHandle>,
}

/// A ribbon through a list of points, such as a trail.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeForm {
    /// Placement of the ribbon; bounds enclose every point.
    pub placement: Placement,
    /// World-space points.
    pub points: Vec<Vec3>,
    /// Ribbon width.
    pub width: f32,
}

impl FreeForm {
    /// A ribbon through `points`.
    pub fn new(points: Vec<Vec3>, width: f32, color: LinearRgba) -> Self {
        let bounds = Aabb::from_points(points.iter().copied());
        let bounds = Aabb::from_min_max(
            bounds.min - Vec3::ONE * width,
            bounds.max + Vec3::ONE * width,
        );
        Self {
            placement: Placement {
                bounds,
                ..Placement::new(Mat4::IDENTITY, color)
            },
            points,
            width,
        }
    }
}

/// A smooth curve through control points, drawn as a ribbon.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    /// The ribbon the curve is tessellated into.
    pub ribbon: FreeForm,
    /// Segments per control-point interval.
    pub subdivisions: u32,
}

impl Spline {
    /// Samples the Catmull-Rom curve through the control points.
    pub fn tessellate(&self) -> Vec<Vec3> {
        let pts = &self.ribbon.points;
        if pts.len() < 2 {
            return pts.clone();
        }
        let steps = self.subdivisions.max(1);
        let at = |i: isize| pts[i.clamp(0, pts.len() as isize - 1) as usize];
        let mut out = Vec::with_capacity((pts.len() - 1) * steps as usize + 1);
        for i in 0..pts.len() as isize - 1 {
            let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
            for s in 0..steps {
                let t = s as f32 / steps as f32;
                let t2 = t * t;
                let t3 = t2 * t;
                let p = (p1 * 2.0
                    + (p2 - p0) * t
                    + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
                    + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
                    * 0.5;
                out.push(p);
            }
        }
        out.push(pts[pts.len() - 1]);
        out
    }
}

/// A solid box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxInstance {
    /// Placement of the unit cube.
    pub placement: Placement,
}

/// A patch of grass blades.
#[derive(Debug, Clone, PartialEq)]
pub struct GrassPatch {
    /// Placement of the patch.
    pub placement: Placement,
    /// Crossed quads per patch.
    pub density: u32,
}

/// A horizontal water surface.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterPatch {
    /// Placement of the unit plane.
    pub placement: Placement,
    /// Height of the surface, the mirror plane of planar reflections.
    pub level: f32,
    /// Renders a planar reflection when visible.
    pub reflective: bool,
}

/// The scene background.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Sky {
    /// Nothing drawn; the fog clear color shows.
    #[default]
    None,
    /// A dome around the camera.
    Sphere {
        /// Tint of the dome.
        color: LinearRgba,
        /// Dome texture.
        texture: Option<TextureHandle>,
    },
    /// A cube around the camera.
    Box {
        /// Tint of the box.
        color: LinearRgba,
        /// Cube texture.
        texture: Option<TextureHandle>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spline_passes_through_control_points() {
        let spline = Spline {
            ribbon: FreeForm::new(
                vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 1.0, 0.0)],
                0.1,
                LinearRgba::WHITE,
            ),
            subdivisions: 4,
        };
        let pts = spline.tessellate();
        assert_eq!(pts.len(), 2 * 4 + 1);
        assert_eq!(pts[0], Vec3::ZERO);
        assert_eq!(pts[4], Vec3::X);
        assert_eq!(pts[8], Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_free_form_bounds_cover_width() {
        let ribbon = FreeForm::new(vec![Vec3::ZERO, Vec3::X], 0.5, LinearRgba::WHITE);
        assert!(ribbon.placement.bounds.contains_point(Vec3::new(0.5, 0.4, 0.0)));
    }
}
