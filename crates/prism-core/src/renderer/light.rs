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

//! Light sources and atmospheric parameters of a scene.

use crate::math::{Aabb, LinearRgba, Vec3, FRAC_PI_2, PI};
use serde::{Deserialize, Serialize};

/// An omnidirectional light with a finite influence radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    /// Influence radius; the light contributes nothing beyond it.
    pub radius: f32,
    /// Light color.
    pub color: LinearRgba,
    /// Intensity multiplier.
    pub intensity: f32,
}

impl PointLight {
    /// Creates a white point light.
    pub fn new(position: Vec3, radius: f32, intensity: f32) -> Self {
        Self {
            position,
            radius,
            color: LinearRgba::WHITE,
            intensity,
        }
    }

    /// The influence coefficient of the light over a bounding box.
    ///
    /// Zero when the influence sphere misses the box, otherwise the intensity
    /// attenuated linearly by the distance to the closest point of the box.
    pub fn influence(&self, bounds: &Aabb) -> f32 {
        if self.radius <= 0.0 {
            return 0.0;
        }
        let distance = bounds.distance_to_point(self.position);
        if distance >= self.radius {
            return 0.0;
        }
        self.intensity * (1.0 - distance / self.radius)
    }
}

/// The sun: direction, colors and shadow distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainLightSettings {
    /// Fades every light term and the fog color, `1.0` is full daylight.
    pub global_fade: f32,
    /// Angle between the sun and the zenith, radians.
    pub sun_angle_to_zenith: f32,
    /// Angle between the sun and north, radians.
    pub sun_angle_to_north: f32,
    /// Ambient term.
    pub ambient: LinearRgba,
    /// Main diffuse term.
    pub diffuse0: LinearRgba,
    /// Secondary diffuse term.
    pub diffuse1: LinearRgba,
    /// Back-light diffuse term.
    pub diffuse2: LinearRgba,
    /// Specular term.
    pub specular: LinearRgba,
    /// Scales the diffuse terms.
    pub mul_intensity: f32,
    /// Depth bias of the static shadow map.
    pub static_shadow_bias: f32,
    /// Opacity of static shadows.
    pub static_shadow_opacity: f32,
    /// Softening of static shadows.
    pub static_shadow_diffusion: f32,
    /// Opacity of dynamic shadows.
    pub dynamic_shadow_opacity: f32,
    /// Distance from the near plane where the first split ends.
    pub dynamic_shadow_middle: f32,
    /// Overlap between the two splits.
    pub dynamic_shadow_middle_blend: f32,
    /// Distance from the near plane where dynamic shadows end.
    pub dynamic_shadow_end: f32,
    /// Fade length at the end of the second split.
    pub dynamic_shadow_end_blend: f32,
}

impl Default for MainLightSettings {
    fn default() -> Self {
        Self {
            global_fade: 1.0,
            sun_angle_to_zenith: 0.25 * FRAC_PI_2,
            sun_angle_to_north: 0.125 * PI,
            ambient: LinearRgba::rgb(0.05, 0.05, 0.05),
            diffuse0: LinearRgba::rgb(0.8, 0.8, 0.8),
            diffuse1: LinearRgba::rgb(0.0, 0.0, 0.0),
            diffuse2: LinearRgba::rgb(0.2, 0.2, 0.4),
            specular: LinearRgba::rgb(0.8, 0.8, 0.8),
            mul_intensity: 1.0,
            static_shadow_bias: 0.001,
            static_shadow_opacity: 0.6,
            static_shadow_diffusion: 0.05,
            dynamic_shadow_opacity: 0.6,
            dynamic_shadow_middle: 12.0,
            dynamic_shadow_middle_blend: 2.0,
            dynamic_shadow_end: 50.0,
            dynamic_shadow_end_blend: 10.0,
        }
    }
}

impl MainLightSettings {
    /// The direction light travels in, derived from the sun angles.
    pub fn direction(&self) -> Vec3 {
        let teta = FRAC_PI_2 + self.sun_angle_to_north;
        let phi = self.sun_angle_to_zenith;
        let y = phi.cos();
        let x = phi.sin() * teta.cos();
        let z = phi.sin() * teta.sin();
        -Vec3::new(x, y, z)
    }

    /// Ambient term with the global fade applied.
    pub fn faded_ambient(&self) -> LinearRgba {
        self.ambient.scale_rgb(self.global_fade)
    }

    /// Main diffuse term with intensity and fade applied.
    pub fn faded_diffuse(&self) -> LinearRgba {
        self.diffuse0
            .scale_rgb(self.mul_intensity * self.global_fade)
    }
}

/// Distance fog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogSettings {
    /// Fog color, also the clear color of color passes.
    pub color: LinearRgba,
    /// Distance where fog starts.
    pub start: f32,
    /// Distance where fog is opaque.
    pub end: f32,
    /// Fog opacity applied to the sky.
    pub sky_fog_opacity: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            color: LinearRgba::TRANSPARENT,
            start: 0.0,
            end: 1000.0,
            sky_fog_opacity: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_influence_is_zero_outside_radius() {
        let light = PointLight::new(Vec3::new(10.0, 0.0, 0.0), 5.0, 1.0);
        let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert_eq!(light.influence(&bounds), 0.0);
    }

    #[test]
    fn test_influence_decreases_with_distance() {
        let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let near = PointLight::new(Vec3::new(2.0, 0.0, 0.0), 10.0, 1.0);
        let far = PointLight::new(Vec3::new(6.0, 0.0, 0.0), 10.0, 1.0);
        let inside = PointLight::new(Vec3::ZERO, 10.0, 2.0);
        assert!(near.influence(&bounds) > far.influence(&bounds));
        assert_relative_eq!(near.influence(&bounds), 0.9);
        assert_relative_eq!(inside.influence(&bounds), 2.0);
    }

    #[test]
    fn test_sun_direction_points_down() {
        let sun = MainLightSettings::default();
        let dir = sun.direction();
        assert!(dir.y < 0.0);
        assert_relative_eq!(dir.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zenith_sun_is_vertical() {
        let sun = MainLightSettings {
            sun_angle_to_zenith: 0.0,
            ..MainLightSettings::default()
        };
        let dir = sun.direction();
        assert_relative_eq!(dir.y, -1.0);
    }
}
