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

//! Light-map bake of a single mesh instance.

use super::{baked_mesh, BakeError};
use crate::render_lane::lighting::point_light_color;
use crate::render_lane::{Command, DefaultTexture, DrawStates, GpuResolver, RenderContext, StateSet};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{LinearRgba, Mat4};
use prism_core::renderer::api::{AddressMode, BlendMode, DrawCall, ShadeParams, VertexSpace};
use prism_core::renderer::settings::PolygonMode;
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Renders the lighting a mesh receives into its UV layout.
///
/// Sun and point lights are evaluated per triangle; the static shadow map,
/// when the caller rendered one, is bound as the second texture.
#[derive(Debug, Default)]
pub struct LightMapLane {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl LightMapLane {
    /// Clear color of the bake target. Alpha 0 marks unbaked texels.
    pub const CLEAR: LinearRgba = LinearRgba::new(0.5, 0.5, 0.5, 0.0);

    /// Dilation passes applied after read-back.
    pub const BORDER_PASSES: u32 = 40;

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

        let shade = ShadeParams {
            point_lights: point_light_color(&scene.point_lights, &instance.lighting),
            ..ctx.shade
        };
        let mut textures: Vec<_> = gpu.default_texture(DefaultTexture::White).into_iter().collect();
        textures.extend(ctx.shadows.static_map);

        log::trace!(
            "LightMapLane: Baking instance {} ({} triangles)",
            instance.id.0,
            mesh.triangle_count()
        );
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
                color: LinearRgba::WHITE,
                shade: Some(shade),
                blend: BlendMode::Opaque,
                polygon: PolygonMode::Solid,
                states: states.to_vec(),
                textures,
            },
        ));
        Ok(())
    }
}

impl Lane for LightMapLane {
    fn strategy_name(&self) -> &'static str {
        "LightMapBake"
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
