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

//! Grass patches, drawn as crossed quads.

use super::{mesh_draw, quad_model, texture_or_white};
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{BuiltinMesh, Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{Vec3, PI};
use prism_core::renderer::api::{AddressMode, BlendMode, PassKind};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Upper bound of crossed quads per patch.
const MAX_BLADES: u32 = 16;

/// Draws `density` vertical quads per patch, rotated evenly around the patch axis.
#[derive(Debug, Default)]
pub struct GrassExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl GrassExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lane for GrassExecutor {
    fn strategy_name(&self) -> &'static str {
        "Grass"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Render
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

impl RenderExecutor for GrassExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        pass == PassKind::Lighting
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        let (Some(states), Some(quad)) = (self.draw, gpu.builtin(BuiltinMesh::Quad)) else {
            return;
        };
        let textures = texture_or_white(gpu, None);
        for &i in &ctx.visible.grass {
            let patch = &scene.grass[i];
            let p = &patch.placement;
            let blades = patch.density.clamp(1, MAX_BLADES);
            for blade in 0..blades {
                let angle = blade as f32 * PI / blades as f32;
                let local = quad_model(Vec3::ZERO, Vec3::new(angle.cos(), 0.0, angle.sin()), Vec3::Y);
                out.push(Command::draw(
                    CommandMode::Solid,
                    mesh_draw(
                        p.id.0,
                        quad,
                        p.transform * local,
                        ctx,
                        p.color,
                        Some(ctx.shade),
                        BlendMode::Opaque,
                        &states,
                        textures.clone(),
                    ),
                ));
            }
        }
    }
}
