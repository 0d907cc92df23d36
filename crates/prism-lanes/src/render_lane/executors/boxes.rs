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

//! Lit boxes.

use super::{mesh_draw, texture_or_white};
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{BuiltinMesh, Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::renderer::api::{AddressMode, BlendMode, PassKind};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Draws the built-in cube for every visible box, lit by the sun.
#[derive(Debug, Default)]
pub struct BoxExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl BoxExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lane for BoxExecutor {
    fn strategy_name(&self) -> &'static str {
        "Box"
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
            AddressMode::Repeat,
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

impl RenderExecutor for BoxExecutor {
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
        let (Some(states), Some(cube)) = (self.draw, gpu.builtin(BuiltinMesh::Cube)) else {
            return;
        };
        for &i in &ctx.visible.boxes {
            let p = &scene.boxes[i].placement;
            out.push(Command::draw(
                CommandMode::Solid,
                mesh_draw(
                    p.id.0,
                    cube,
                    p.transform,
                    ctx,
                    p.color,
                    Some(ctx.shade),
                    BlendMode::Opaque,
                    &states,
                    texture_or_white(gpu, None),
                ),
            ));
        }
    }
}
