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

//! Ambient occlusion bake of a single mesh instance.

use super::{baked_mesh, BakeError};
use crate::render_lane::{Command, DefaultTexture, DrawStates, GpuResolver, RenderContext, StateSet};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{LinearRgba, Mat4};
use prism_core::renderer::api::{AddressMode, BlendMode, DrawCall, VertexSpace};
use prism_core::renderer::settings::PolygonMode;
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Darkening contributed by each neighbouring mesh.
const OCCLUDER_WEIGHT: f32 = 0.15;
/// Floor of the occlusion term.
const MIN_OCCLUSION: f32 = 0.25;

/// Coarse occlusion of `scene.meshes[index]` by the other visible meshes.
///
/// Each mesh whose world bounds overlap the instance removes a fixed share of
/// ambient light. Returns `1.0` for an unoccluded instance.
pub fn occlusion_factor(scene: &Scene, index: usize) -> f32 {
    let Some(target) = scene.meshes.get(index) else {
        return 1.0;
    };
    let bounds = target.bounds();
    let occluders = scene
        .meshes
        .iter()
        .enumerate()
        .filter(|&(i, m)| i != index && !m.gpu.hidden && m.bounds().intersects_aabb(&bounds))
        .count();
    (1.0 - OCCLUDER_WEIGHT * occluders as f32).max(MIN_OCCLUSION)
}

/// Renders an ambient occlusion term into a mesh's UV layout.
#[derive(Debug, Default)]
pub struct OcclusionLane {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl OcclusionLane {
    /// Clear color of the bake target.
    pub const CLEAR: LinearRgba = LinearRgba::new(1.0, 1.0, 1.0, 0.0);

    /// Dilation passes applied after read-back.
    pub const BORDER_PASSES: u32 = 4;

    /// Creates an uninitialised lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the bake draw of the instance selected by `ctx`.
    pub fn gather(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) -> Result<(), BakeError> {
        let states = self.draw.ok_or(BakeError::NotInitialized)?;
        let (index, mesh) = baked_mesh(ctx, scene, gpu)?;
        let instance = &scene.meshes[index];
        let occlusion = occlusion_factor(scene, index);

        out.push(Command::draw(
            CommandMode::Solid,
            DrawCall {
                tag: instance.id.0,
                vertex_buffer: mesh.vertex_buffer,
                index_buffer: mesh.index_buffer,
                index_count: mesh.index_count,
                model: instance.transform,
                view_proj: Mat4::IDENTITY,
                space: VertexSpace::Texel,
                color: LinearRgba::rgb(occlusion, occlusion, occlusion),
                shade: None,
                blend: BlendMode::Opaque,
                polygon: PolygonMode::Solid,
                states: states.to_vec(),
                textures: gpu
                    .default_texture(DefaultTexture::White)
                    .into_iter()
                    .collect(),
            },
        ));
        Ok(())
    }
}

impl Lane for OcclusionLane {
    fn strategy_name(&self) -> &'static str {
        "OcclusionBake"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Bake
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.draw = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (false, false),
            BlendMode::Opaque,
            AddressMode::Clamp,
        )?);
        Ok(())
    }

    fn on_shutdown(&mut self, ctx: &mut LaneContext<'_>) {
        self.states.release_all(ctx);
        self.draw = None;
    }

    fn is_initialized(&self) -> bool {
        self.draw.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prism_core::math::{Aabb, Vec3};
    use prism_core::renderer::api::MeshHandle;
    use prism_core::scene::{Material, MeshInstance};

    fn cube_at(x: f32) -> MeshInstance {
        MeshInstance::new(
            MeshHandle(0),
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE * 0.5),
            Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
            Material::default(),
        )
    }

    #[test]
    fn test_occlusion_counts_overlapping_meshes() {
        let mut scene = Scene::new();
        scene.add_mesh(cube_at(0.0));
        scene.add_mesh(cube_at(0.5));
        scene.add_mesh(cube_at(10.0));

        assert_relative_eq!(occlusion_factor(&scene, 0), 0.85, epsilon = 1e-6);
        assert_eq!(occlusion_factor(&scene, 2), 1.0);
        assert_eq!(occlusion_factor(&scene, 99), 1.0);
    }

    #[test]
    fn test_occlusion_is_floored() {
        let mut scene = Scene::new();
        for _ in 0..10 {
            scene.add_mesh(cube_at(0.0));
        }
        assert_eq!(occlusion_factor(&scene, 0), MIN_OCCLUSION);
    }
}
