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

//! The closed set of executors, one per drawable category.

mod billboard;
mod boxes;
mod custom_material;
mod debug_overlay;
mod decal;
mod free_form;
mod glow;
mod grass;
mod hud;
mod post_fx;
mod shadow_caster;
mod sky_box;
mod sky_sphere;
mod spline;
mod standard_material;
mod water;

pub use self::billboard::BillboardExecutor;
pub use self::boxes::BoxExecutor;
pub use self::custom_material::{CustomEffect, CustomMaterialExecutor};
pub use self::debug_overlay::{DebugOverlayExecutor, DEBUG_BLIT_RECTS};
pub use self::decal::DecalExecutor;
pub use self::free_form::FreeFormExecutor;
pub use self::glow::GlowExecutor;
pub use self::grass::GrassExecutor;
pub use self::hud::HudExecutor;
pub use self::post_fx::PostFxExecutor;
pub use self::shadow_caster::ShadowCasterExecutor;
pub use self::sky_box::SkyBoxExecutor;
pub use self::sky_sphere::SkySphereExecutor;
pub use self::spline::SplineExecutor;
pub use self::standard_material::StandardMaterialExecutor;
pub use self::water::WaterExecutor;

use super::{Command, GpuMesh, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{LinearRgba, Mat4, Vec3, Vec4};
use prism_core::renderer::api::{
    BlendMode, DrawCall, PassKind, ShadeParams, TextureHandle, TextureId, VertexSpace,
};
use prism_core::renderer::{RenderPass, ResourceError};
use prism_core::scene::Scene;

use super::executor::DrawStates;
use super::resolver::DefaultTexture;

/// Every executor, as a tagged variant.
#[derive(Debug)]
pub enum Executor {
    /// Standard lit meshes.
    StandardMaterial(StandardMaterialExecutor),
    /// Meshes with a named custom effect.
    CustomMaterial(CustomMaterialExecutor),
    /// Projected decals.
    Decal(DecalExecutor),
    /// Camera-facing quads.
    Billboard(BillboardExecutor),
    /// Free-form ribbons and trails.
    FreeForm(FreeFormExecutor),
    /// Tessellated splines.
    Spline(SplineExecutor),
    /// Boxes.
    Box(BoxExecutor),
    /// Sky dome.
    SkySphere(SkySphereExecutor),
    /// Sky box.
    SkyBox(SkyBoxExecutor),
    /// Grass patches.
    Grass(GrassExecutor),
    /// Water surfaces.
    Water(WaterExecutor),
    /// Shadow map casters.
    ShadowCaster(ShadowCasterExecutor),
    /// Glow extraction.
    Glow(GlowExecutor),
    /// Post-processing.
    PostFx(PostFxExecutor),
    /// Debug blits.
    DebugOverlay(DebugOverlayExecutor),
    /// 2D overlay.
    Hud(HudExecutor),
}

macro_rules! dispatch {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            Executor::StandardMaterial($e) => $body,
            Executor::CustomMaterial($e) => $body,
            Executor::Decal($e) => $body,
            Executor::Billboard($e) => $body,
            Executor::FreeForm($e) => $body,
            Executor::Spline($e) => $body,
            Executor::Box($e) => $body,
            Executor::SkySphere($e) => $body,
            Executor::SkyBox($e) => $body,
            Executor::Grass($e) => $body,
            Executor::Water($e) => $body,
            Executor::ShadowCaster($e) => $body,
            Executor::Glow($e) => $body,
            Executor::PostFx($e) => $body,
            Executor::DebugOverlay($e) => $body,
            Executor::Hud($e) => $body,
        }
    };
}

impl Executor {
    /// A fresh executor of every category, in registration order.
    pub fn registration_order() -> Vec<Executor> {
        vec![
            Executor::StandardMaterial(StandardMaterialExecutor::new()),
            Executor::CustomMaterial(CustomMaterialExecutor::new()),
            Executor::Decal(DecalExecutor::new()),
            Executor::Billboard(BillboardExecutor::new()),
            Executor::FreeForm(FreeFormExecutor::new()),
            Executor::Spline(SplineExecutor::new()),
            Executor::Box(BoxExecutor::new()),
            Executor::SkySphere(SkySphereExecutor::new()),
            Executor::SkyBox(SkyBoxExecutor::new()),
            Executor::Grass(GrassExecutor::new()),
            Executor::Water(WaterExecutor::new()),
            Executor::ShadowCaster(ShadowCasterExecutor::new()),
            Executor::Glow(GlowExecutor::new()),
            Executor::PostFx(PostFxExecutor::new()),
            Executor::DebugOverlay(DebugOverlayExecutor::new()),
            Executor::Hud(HudExecutor::new()),
        ]
    }
}

impl Lane for Executor {
    fn strategy_name(&self) -> &'static str {
        dispatch!(self, e => e.strategy_name())
    }

    fn lane_kind(&self) -> LaneKind {
        dispatch!(self, e => e.lane_kind())
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        dispatch!(self, e => e.on_initialize(ctx))
    }

    fn on_shutdown(&mut self, ctx: &mut LaneContext<'_>) {
        dispatch!(self, e => e.on_shutdown(ctx))
    }

    fn is_initialized(&self) -> bool {
        dispatch!(self, e => e.is_initialized())
    }
}

impl RenderExecutor for Executor {
    fn accepts(&self, pass: PassKind) -> bool {
        dispatch!(self, e => e.accepts(pass))
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        dispatch!(self, e => e.gather_commands(ctx, scene, gpu, out))
    }

    fn execute_commands(
        &self,
        commands: &[Command],
        pass: &mut dyn RenderPass,
    ) -> Result<(), ResourceError> {
        dispatch!(self, e => e.execute_commands(commands, pass))
    }
}

// --- Shared draw helpers ---

/// A clip-space draw of `mesh` with the pass camera.
#[allow(clippy::too_many_arguments)]
pub(crate) fn mesh_draw(
    tag: u64,
    mesh: GpuMesh,
    model: Mat4,
    ctx: &RenderContext,
    color: LinearRgba,
    shade: Option<ShadeParams>,
    blend: BlendMode,
    states: &DrawStates,
    textures: Vec<TextureId>,
) -> DrawCall {
    DrawCall {
        tag,
        vertex_buffer: mesh.vertex_buffer,
        index_buffer: mesh.index_buffer,
        index_count: mesh.index_count,
        model,
        view_proj: ctx.view_proj,
        space: VertexSpace::Clip,
        color,
        shade,
        blend,
        polygon: ctx.debug.polygon_mode,
        states: states.to_vec(),
        textures,
    }
}

/// The texture of `handle`, or the white default texture.
pub(crate) fn texture_or_white(gpu: &dyn GpuResolver, handle: Option<TextureHandle>) -> Vec<TextureId> {
    handle
        .and_then(|h| gpu.texture(h))
        .or_else(|| gpu.default_texture(DefaultTexture::White))
        .into_iter()
        .collect()
}

/// Model matrix mapping the unit quad onto the given axes around `center`.
pub(crate) fn quad_model(center: Vec3, right: Vec3, up: Vec3) -> Mat4 {
    let normal = right.cross(up).normalize();
    Mat4::from_cols(
        Vec4::from_vec3(right, 0.0),
        Vec4::from_vec3(up, 0.0),
        Vec4::from_vec3(normal, 0.0),
        Vec4::from_vec3(center, 1.0),
    )
}

/// One camera-facing quad per segment of the polyline.
pub(crate) fn ribbon_segments(points: &[Vec3], width: f32, eye: Vec3) -> Vec<Mat4> {
    points
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let along = b - a;
            if along.length_squared() < 1e-10 {
                return None;
            }
            let center = (a + b) * 0.5;
            let side = along.cross(eye - center);
            if side.length_squared() < 1e-10 {
                return None;
            }
            Some(quad_model(center, along, side.normalize() * width))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_is_fixed() {
        let names: Vec<&str> = Executor::registration_order()
            .iter()
            .map(|e| e.strategy_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "StandardMaterial",
                "CustomMaterial",
                "Decal",
                "Billboard",
                "FreeForm",
                "Spline",
                "Box",
                "SkySphere",
                "SkyBox",
                "Grass",
                "Water",
                "ShadowCaster",
                "Glow",
                "PostFx",
                "DebugOverlay",
                "Hud",
            ]
        );
    }

    #[test]
    fn test_executors_start_uninitialized() {
        assert!(Executor::registration_order()
            .iter()
            .all(|e| !e.is_initialized()));
    }

    #[test]
    fn test_ribbon_segments_skip_degenerate_points() {
        let points = [Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)];
        let segments = ribbon_segments(&points, 0.5, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].translation(), Vec3::new(0.5, 0.0, 0.0));
    }
}
