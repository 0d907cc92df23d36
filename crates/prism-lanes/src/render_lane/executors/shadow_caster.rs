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

//! Shadow map casters.

use super::mesh_draw;
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::shadow::shadow_blur_passes;
use crate::render_lane::{Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::LinearRgba;
use prism_core::renderer::api::{AddressMode, BlendMode, FullscreenEffect, PassKind};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Draws the casters culled for a shadow pass in black over the white map.
///
/// Dynamic splits are blurred afterwards according to the shadow tier.
#[derive(Debug, Default)]
pub struct ShadowCasterExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl ShadowCasterExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lane for ShadowCasterExecutor {
    fn strategy_name(&self) -> &'static str {
        "ShadowCaster"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Shadow
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.draw = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (true, true),
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

impl RenderExecutor for ShadowCasterExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        pass.is_shadow()
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        let Some(states) = self.draw else {
            return;
        };
        let statics = ctx
            .visible
            .meshes
            .iter()
            .map(|&i| &scene.meshes[i])
            .filter_map(|m| gpu.mesh(m.mesh).map(|g| (m.id, g, m.transform)));
        let skinned = ctx
            .visible
            .skin_meshes
            .iter()
            .map(|&i| &scene.skin_meshes[i])
            .filter_map(|m| gpu.skin_mesh(m.mesh).map(|g| (m.id, g, m.transform)));

        for (id, mesh, transform) in statics.chain(skinned) {
            out.push(Command::draw(
                CommandMode::Solid,
                mesh_draw(
                    id.0,
                    mesh,
                    transform,
                    ctx,
                    LinearRgba::BLACK,
                    None,
                    BlendMode::Opaque,
                    &states,
                    Vec::new(),
                ),
            ));
        }

        if let PassKind::DynamicShadow { .. } = ctx.pass {
            let passes = shadow_blur_passes(ctx.settings.shadow);
            if passes > 0 {
                out.push(Command::effect(
                    CommandMode::Solid,
                    FullscreenEffect::Blur { passes },
                ));
            }
        }
    }
}
