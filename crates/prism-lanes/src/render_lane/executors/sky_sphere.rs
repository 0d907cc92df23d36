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

//! Sky dome.

use super::{mesh_draw, texture_or_white};
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::{BuiltinMesh, Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{LinearRgba, Mat4, Vec3};
use prism_core::renderer::api::{AddressMode, BlendMode, PassKind, TextureHandle};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::{Scene, Sky};

/// Fraction of the far plane used as the sky radius.
const SKY_EXTENT: f32 = 0.9;

/// Draws [`Sky::Sphere`] centered on the camera.
#[derive(Debug, Default)]
pub struct SkySphereExecutor {
    states: StateSet,
    draw: Option<DrawStates>,
}

impl SkySphereExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

/// The model of a sky mesh of radius 0.5 around the camera, and its fogged color.
pub(super) fn sky_placement(ctx: &RenderContext, color: LinearRgba) -> (Mat4, LinearRgba) {
    // The unit meshes have a radius of 0.5.
    let scale = ctx.camera.far * SKY_EXTENT * 2.0 / 3f32.sqrt();
    let model = Mat4::from_translation(ctx.camera.position) * Mat4::from_scale(Vec3::ONE * scale);
    let fogged = color.lerp(ctx.fog.color, ctx.fog.sky_fog_opacity);
    (model, fogged)
}

/// Gathers one sky draw.
pub(super) fn gather_sky(
    ctx: &RenderContext,
    gpu: &dyn GpuResolver,
    states: &DrawStates,
    mesh: BuiltinMesh,
    color: LinearRgba,
    texture: Option<TextureHandle>,
    out: &mut Vec<Command>,
) {
    let Some(mesh) = gpu.builtin(mesh) else {
        return;
    };
    let (model, color) = sky_placement(ctx, color);
    out.push(Command::draw(
        CommandMode::SkySphere,
        mesh_draw(
            0,
            mesh,
            model,
            ctx,
            color.with_alpha(1.0),
            None,
            BlendMode::Opaque,
            states,
            texture_or_white(gpu, texture),
        ),
    ));
}

/// Sky meshes are depth tested so that they stay behind the scene.
pub(super) fn acquire_sky_states(
    set: &mut StateSet,
    ctx: &mut LaneContext<'_>,
) -> Result<DrawStates, LaneError> {
    DrawStates::acquire(set, ctx, (true, false), BlendMode::Opaque, AddressMode::Clamp)
}

impl Lane for SkySphereExecutor {
    fn strategy_name(&self) -> &'static str {
        "SkySphere"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Render
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.draw = Some(acquire_sky_states(&mut self.states, ctx)?);
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

impl RenderExecutor for SkySphereExecutor {
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
        let (Some(states), Sky::Sphere { color, texture }) = (self.draw, &scene.sky) else {
            return;
        };
        gather_sky(ctx, gpu, &states, BuiltinMesh::Sphere, *color, *texture, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sky_stays_inside_far_plane() {
        // The farthest corner of the scaled cube is half its diagonal away.
        let far: f32 = 100.0;
        let scale = far * SKY_EXTENT * 2.0 / 3f32.sqrt();
        let corner = 0.5 * scale * 3f32.sqrt();
        assert_relative_eq!(corner, far * SKY_EXTENT, epsilon = 1e-3);
        assert!(corner < far);
    }
}
