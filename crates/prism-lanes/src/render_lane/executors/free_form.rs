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

//! Free-form ribbons and trails.

use super::{mesh_draw, ribbon_segments, texture_or_white};
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{BuiltinMesh, Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::renderer::api::{AddressMode, BlendMode, PassKind};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::{FreeForm, Scene};

/// Draws each ribbon as one camera-facing quad per segment.
#[derive(Debug, Default)]
pub struct FreeFormExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl FreeFormExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Gathers the segments of a ribbon through `points`.
pub(super) fn gather_ribbon(
    ctx: &RenderContext,
    gpu: &dyn GpuResolver,
    states: &DrawStates,
    ribbon: &FreeForm,
    points: &[prism_core::math::Vec3],
    out: &mut Vec<Command>,
) {
    let Some(quad) = gpu.builtin(BuiltinMesh::Quad) else {
        return;
    };
    let textures = texture_or_white(gpu, None);
    let p = &ribbon.placement;
    for model in ribbon_segments(points, ribbon.width, ctx.camera.position) {
        out.push(Command::draw(
            CommandMode::Transparent,
            mesh_draw(
                p.id.0,
                quad,
                model,
                ctx,
                p.color,
                None,
                BlendMode::Alpha,
                states,
                textures.clone(),
            ),
        ));
    }
}

impl Lane for FreeFormExecutor {
    fn strategy_name(&self) -> &'static str {
        "FreeForm"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Render
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.draw = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (true, false),
            BlendMode::Alpha,
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

impl RenderExecutor for FreeFormExecutor {
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
        let Some(states) = self.draw else {
            return;
        };
        for &i in &ctx.visible.free_forms {
            let ribbon = &scene.free_forms[i];
            gather_ribbon(ctx, gpu, &states, ribbon, &ribbon.points, out);
        }
    }
}
