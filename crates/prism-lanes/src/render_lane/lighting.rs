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

//! Per-instance point light selection.

use prism_core::math::{Aabb, LinearRgba};
use prism_core::renderer::light::PointLight;
use prism_core::scene::{LightInfluence, LightingData, Scene};

/// Point lights kept per instance.
pub const MAX_POINT_LIGHTS: usize = 3;

/// The lights influencing `bounds`, highest coefficient first.
///
/// Equal coefficients keep their enumeration order. At most
/// [`MAX_POINT_LIGHTS`] entries are returned.
pub fn compute_lighting(lights: &[PointLight], bounds: &Aabb) -> LightingData {
    let mut influences: Vec<LightInfluence> = lights
        .iter()
        .enumerate()
        .filter_map(|(light, l)| {
            let coefficient = l.influence(bounds);
            (coefficient > 0.0).then_some(LightInfluence { light, coefficient })
        })
        .collect();
    // `sort_by` is stable.
    influences.sort_by(|a, b| b.coefficient.total_cmp(&a.coefficient));
    influences.truncate(MAX_POINT_LIGHTS);
    LightingData {
        lights: influences,
    }
}

/// Rebuilds the lighting data of every instance of the scene.
pub fn update_scene_lighting(scene: &mut Scene) {
    let Scene {
        point_lights,
        meshes,
        skin_meshes,
        ..
    } = scene;
    for mesh in meshes.iter_mut() {
        mesh.lighting = compute_lighting(point_lights, &mesh.bounds());
    }
    for mesh in skin_meshes.iter_mut() {
        mesh.lighting = compute_lighting(point_lights, &mesh.bounds());
    }
}

/// The summed point light contribution of `data`.
pub fn point_light_color(lights: &[PointLight], data: &LightingData) -> LinearRgba {
    data.lights
        .iter()
        .filter_map(|inf| lights.get(inf.light).map(|l| (l, inf.coefficient)))
        .fold(LinearRgba::BLACK, |acc, (l, c)| acc + l.color.scale_rgb(c))
        .with_alpha(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::math::Vec3;

    fn unit_box() -> Aabb {
        Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_keeps_the_strongest_lights() {
        let intensities = [0.2, 0.9, 0.5, 0.1, 0.7];
        let lights: Vec<PointLight> = intensities
            .iter()
            .map(|&i| PointLight::new(Vec3::ZERO, 10.0, i))
            .collect();

        let data = compute_lighting(&lights, &unit_box());
        let kept: Vec<usize> = data.lights.iter().map(|l| l.light).collect();
        assert_eq!(kept, vec![1, 4, 2]);
    }

    #[test]
    fn test_ties_keep_enumeration_order() {
        let lights: Vec<PointLight> = (0..5).map(|_| PointLight::new(Vec3::ZERO, 10.0, 1.0)).collect();
        let data = compute_lighting(&lights, &unit_box());
        let kept: Vec<usize> = data.lights.iter().map(|l| l.light).collect();
        assert_eq!(kept, vec![0, 1, 2]);
    }

    #[test]
    fn test_lights_out_of_range_are_ignored() {
        let lights = vec![PointLight::new(Vec3::new(100.0, 0.0, 0.0), 5.0, 1.0)];
        assert!(compute_lighting(&lights, &unit_box()).lights.is_empty());
    }

    #[test]
    fn test_point_light_color_sums_coefficients() {
        let mut light = PointLight::new(Vec3::ZERO, 10.0, 1.0);
        light.color = LinearRgba::RED;
        let data = compute_lighting(&[light, light], &unit_box());
        let color = point_light_color(&[light, light], &data);
        assert_eq!(color, LinearRgba::new(2.0, 0.0, 0.0, 1.0));
    }
}
