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

//! Glow extraction.

use super::mesh_draw;
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::renderer::api::{AddressMode, BlendMode, FullscreenEffect, PassKind};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Blur iterations applied to the glow buffer.
pub const GLOW_BLUR_PASSES: u32 = 2;

/// Draws glowing instances additively into the glow buffer, then blurs it.
#[derive(Debug, Default)]
pub struct GlowExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl GlowExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lane for GlowExecutor {
    fn strategy_name(&self) -> &'static str {
        "Glow"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::PostProcess
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.draw = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (false, false),
            BlendMode::Additive,
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

impl RenderExecutor for GlowExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        pass == PassKind::Glow
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
        let before = out.len();
        for &i in &ctx.visible.meshes {
            let m = &scene.meshes[i];
            if m.material.glow <= 0.0 {
                continue;
            }
            let Some(mesh) = gpu.mesh(m.mesh) else {
                continue;
            };
            out.push(Command::draw(
                CommandMode::Solid,
                mesh_draw(
                    m.id.0,
                    mesh,
                    m.transform,
                    ctx,
                    m.material.diffuse.scale_rgb(m.material.glow),
                    None,
                    BlendMode::Additive,
                    &states,
                    Vec::new(),
                ),
            ));
        }
        if out.len() > before {
            out.push(Command::effect(
                CommandMode::Solid,
                FullscreenEffect::Blur {
                    passes: GLOW_BLUR_PASSES,
                },
            ));
        }
    }
}
