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

//! Shadow map inspection blits.

use crate::render_lane::{Command, ContextFlags, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::Rect;
use prism_core::renderer::api::{BlitOp, PassKind, TargetView};
use prism_core::renderer::settings::RenderMode;
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;

/// Screen rectangles of the two overlay slots, in view pixels.
pub const DEBUG_BLIT_RECTS: [Rect; 2] = [
    Rect::new(20.0, 20.0, 128.0, 128.0),
    Rect::new(168.0, 20.0, 128.0, 128.0),
];

/// Blits the shadow maps of the frame in [`RenderMode::DebugShadowMap`].
#[derive(Debug, Default)]
pub struct DebugOverlayExecutor {
    initialized: bool,
}

impl DebugOverlayExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lane for DebugOverlayExecutor {
    fn strategy_name(&self) -> &'static str {
        "DebugOverlay"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Overlay
    }

    fn on_initialize(&mut self, _ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.initialized = true;
        Ok(())
    }

    fn on_shutdown(&mut self, _ctx: &mut LaneContext<'_>) {
        self.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl RenderExecutor for DebugOverlayExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        pass == PassKind::Debug
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        _scene: &Scene,
        _gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        if !self.initialized || ctx.debug.render_mode != RenderMode::DebugShadowMap {
            return;
        }
        let blit = |texture, rect| {
            Command::blit(
                CommandMode::Solid,
                BlitOp::copy(TargetView::whole(texture)).to_rect(rect),
            )
        };
        if let Some(map) = ctx.shadows.static_map {
            out.push(blit(map, DEBUG_BLIT_RECTS[0]));
        }
        if ctx.flags.contains(ContextFlags::DYNAMIC_SHADOW_ON) {
            for (split, rect) in ctx.shadows.splits.iter().zip(DEBUG_BLIT_RECTS) {
                if let Some(map) = split {
                    out.push(blit(*map, rect));
                }
            }
        }
    }
}
