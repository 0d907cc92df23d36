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

//! Splines, tessellated into ribbons.

use super::free_form::gather_ribbon;
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::renderer::api::{AddressMode, BlendMode, PassKind};
use prism_core::scene::Scene;

/// Samples each spline curve and draws the result like a free-form ribbon.
#[derive(Debug, Default)]
pub struct SplineExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl SplineExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lane for SplineExecutor {
    fn strategy_name(&self) -> &'static str {
        "Spline"
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

impl RenderExecutor for SplineExecutor {
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
        for &i in &ctx.visible.splines {
            let spline = &scene.splines[i];
            let points = spline.tessellate();
            gather_ribbon(ctx, gpu, &states, &spline.ribbon, &points, out);
        }
    }
}
