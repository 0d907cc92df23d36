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

//! Standard lit meshes, static and skinned.

use super::{mesh_draw, texture_or_white};
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::lighting::point_light_color;
use crate::render_lane::{Command, ContextFlags, GpuMesh, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::Mat4;
use prism_core::renderer::api::{
    AddressMode, BlendMode, PassKind, ProbeHandle, ShadeParams, TextureId,
};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::{InstanceFlags, InstanceId, LightingData, Material, MaterialKind, Scene};

/// Draws every instance whose material is [`MaterialKind::Standard`].
///
/// Opaque instances are gathered first, translucent ones after them with
/// alpha blending and without depth writes.
#[derive(Debug, Default)]
pub struct StandardMaterialExecutor {
    states: StateSet,
    solid: Option<DrawStates>,
    translucent: Option<DrawStates>,
}

/// What the executor needs of a static or skinned instance.
struct Lit<'a> {
    id: InstanceId,
    mesh: Option<GpuMesh>,
    transform: Mat4,
    material: &'a Material,
    flags: InstanceFlags,
    lighting: &'a LightingData,
    probe: Option<ProbeHandle>,
}

impl StandardMaterialExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }

    fn textures(&self, ctx: &RenderContext, lit: &Lit<'_>, gpu: &dyn GpuResolver) -> Vec<TextureId> {
        let mut textures = texture_or_white(gpu, lit.material.texture);
        if let Some(light_map) = lit.material.light_map.and_then(|h| gpu.texture(h)) {
            textures.push(light_map);
        }
        if lit.material.is_reflective() {
            if let Some(probe) = lit.probe.and_then(|p| gpu.probe_texture(p)) {
                textures.push(probe);
            }
        }
        if ctx.flags.contains(ContextFlags::STATIC_SHADOW_ON) {
            textures.extend(ctx.shadows.static_map);
        }
        if lit.flags.dynamic_shadow_receiver && ctx.flags.contains(ContextFlags::DYNAMIC_SHADOW_ON) {
            textures.extend(ctx.shadows.splits.iter().flatten());
        }
        textures
    }

    fn gather_one(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        lit: &Lit<'_>,
        translucent: bool,
        out: &mut Vec<Command>,
    ) {
        if lit.material.kind != MaterialKind::Standard || lit.material.is_translucent() != translucent {
            return;
        }
        let states = if translucent { self.translucent } else { self.solid };
        let (Some(states), Some(mesh)) = (states, lit.mesh) else {
            return;
        };
        // A baked light map replaces dynamic lighting.
        let baked = lit.flags.static_lighting && lit.material.light_map.is_some();
        let shade = (!baked).then(|| ShadeParams {
            point_lights: point_light_color(&scene.point_lights, lit.lighting),
            ..ctx.shade
        });
        let mut color = lit.material.diffuse;
        let (blend, mode) = if translucent {
            color.a *= 1.0 - lit.material.transparency.clamp(0.0, 1.0);
            (BlendMode::Alpha, CommandMode::Transparent)
        } else {
            (BlendMode::Opaque, CommandMode::Solid)
        };
        out.push(Command::draw(
            mode,
            mesh_draw(
                lit.id.0,
                mesh,
                lit.transform,
                ctx,
                color,
                shade,
                blend,
                &states,
                self.textures(ctx, lit, gpu),
            ),
        ));
    }
}

impl Lane for StandardMaterialExecutor {
    fn strategy_name(&self) -> &'static str {
        "StandardMaterial"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Render
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.solid = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (true, true),
            BlendMode::Opaque,
            AddressMode::Repeat,
        )?);
        self.translucent = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (true, false),
            BlendMode::Alpha,
            AddressMode::Repeat,
        )?);
        Ok(())
    }

    fn on_shutdown(&mut self, ctx: &mut LaneContext<'_>) {
        self.states.release_all(ctx);
        self.solid = None;
        self.translucent = None;
    }

    fn is_initialized(&self) -> bool {
        self.solid.is_some()
    }
}

impl RenderExecutor for StandardMaterialExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        matches!(pass, PassKind::Lighting | PassKind::Reflection)
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        let statics = ctx.visible.meshes.iter().map(|&i| {
            let m = &scene.meshes[i];
            Lit {
                id: m.id,
                mesh: gpu.mesh(m.mesh),
                transform: m.transform,
                material: &m.material,
                flags: m.flags,
                lighting: &m.lighting,
                probe: m.gpu.probe,
            }
        });
        let skinned = ctx.visible.skin_meshes.iter().map(|&i| {
            let m = &scene.skin_meshes[i];
            Lit {
                id: m.id,
                mesh: gpu.skin_mesh(m.mesh),
                transform: m.transform,
                material: &m.material,
                flags: m.flags,
                lighting: &m.lighting,
                probe: None,
            }
        });
        let all: Vec<Lit<'_>> = statics.chain(skinned).collect();

        for translucent in [false, true] {
            for lit in &all {
                self.gather_one(ctx, scene, gpu, lit, translucent, out);
            }
        }
    }
}
