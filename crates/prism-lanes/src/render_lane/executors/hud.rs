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

//! 2D overlay.

use super::mesh_draw;
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{BuiltinMesh, Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{Mat4, Rect, Vec3};
use prism_core::renderer::api::{AddressMode, BlendMode, BlitOp, PassKind, TargetView};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::{HudItem, Scene};

/// Draws HUD items back to front: fills as quads, pictures as blits.
#[derive(Debug, Default)]
pub struct HudExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl HudExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pixel-space projection of a target, y pointing down.
pub fn pixel_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh_zo(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
}

fn rect_model(rect: Rect) -> Mat4 {
    let center = Vec3::new(rect.x + rect.width * 0.5, rect.y + rect.height * 0.5, 0.0);
    Mat4::from_translation(center) * Mat4::from_scale(Vec3::new(rect.width, rect.height, 1.0))
}

impl Lane for HudExecutor {
    fn strategy_name(&self) -> &'static str {
        "Hud"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Overlay
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.draw = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (false, false),
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

impl RenderExecutor for HudExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        pass == PassKind::Hud
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        _scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        let Some(states) = self.draw else {
            return;
        };
        let quad = gpu.builtin(BuiltinMesh::Quad);
        let projection = pixel_projection(ctx.target_size.0, ctx.target_size.1);

        for item in &ctx.hud {
            match item {
                HudItem::Fill { rect, color } => {
                    let Some(quad) = quad else {
                        continue;
                    };
                    let mut call = mesh_draw(
                        0,
                        quad,
                        rect_model(*rect),
                        ctx,
                        *color,
                        None,
                        BlendMode::Alpha,
                        &states,
                        Vec::new(),
                    );
                    call.view_proj = projection;
                    out.push(Command::draw(CommandMode::Transparent, call));
                }
                HudItem::Picture {
                    bank,
                    frame,
                    rect,
                    color,
                } => {
                    let Some((texture, source)) = gpu.picture(*bank, *frame) else {
                        log::debug!("Hud: picture {frame} of {bank:?} is not resident");
                        continue;
                    };
                    let mut blit = BlitOp::copy(TargetView::whole(texture))
                        .to_rect(*rect)
                        .blended(BlendMode::Alpha);
                    blit.source_rect = Some(source);
                    blit.tint = *color;
                    out.push(Command::blit(CommandMode::Transparent, blit));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prism_core::math::Vec4;

    #[test]
    fn test_pixel_projection_maps_corners() {
        let p = pixel_projection(200, 100);
        let top_left = p * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = p * Vec4::new(200.0, 100.0, 0.0, 1.0);
        assert_relative_eq!(top_left.x, -1.0);
        assert_relative_eq!(top_left.y, 1.0);
        assert_relative_eq!(bottom_right.x, 1.0);
        assert_relative_eq!(bottom_right.y, -1.0);
        assert!((0.0..=1.0).contains(&top_left.z));
    }

    #[test]
    fn test_rect_model_covers_rect() {
        let m = rect_model(Rect::new(10.0, 20.0, 30.0, 40.0));
        let corner = m * Vec4::new(-0.5, -0.5, 0.0, 1.0);
        assert_relative_eq!(corner.x, 10.0);
        assert_relative_eq!(corner.y, 20.0);
    }
}
