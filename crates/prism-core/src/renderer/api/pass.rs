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

//! Pass identities and the draw payloads submitted inside a render pass.

use super::resource::{BlendMode, BufferId, StateId, TargetView, TextureId};
use crate::math::{LinearRgba, Mat4, Rect, Vec3};
use crate::renderer::settings::PolygonMode;
use std::fmt;

/// The identity of a pass, carried by every render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Sun shadow map for high quality preview and light-map baking.
    StaticShadow,
    /// One cascade of the camera-dependent shadow map.
    DynamicShadow {
        /// Cascade index, `0` is the near split.
        split: u8,
    },
    /// A reflection render (cube probe face or planar water reflection).
    Reflection,
    /// The main color pass.
    Lighting,
    /// Bright-region extraction and blur.
    Glow,
    /// Full-screen post-processing.
    PostFx,
    /// Debug overlay blits.
    Debug,
    /// 2D overlay.
    Hud,
    /// Texel-space light-map bake.
    LightMapGeneration,
    /// Texel-space ambient occlusion bake.
    OcclusionGeneration,
    /// Texel-space layer compositing.
    LayerComposite,
}

impl PassKind {
    /// Returns `true` for either shadow pass.
    pub fn is_shadow(self) -> bool {
        matches!(self, PassKind::StaticShadow | PassKind::DynamicShadow { .. })
    }

    /// Returns `true` for the bake passes, which rasterize in texel space.
    pub fn is_bake(self) -> bool {
        matches!(
            self,
            PassKind::LightMapGeneration | PassKind::OcclusionGeneration | PassKind::LayerComposite
        )
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::StaticShadow => write!(f, "STATIC_SHADOW"),
            PassKind::DynamicShadow { split } => write!(f, "DYN_SHADOW_{split}"),
            PassKind::Reflection => write!(f, "REFLECTION"),
            PassKind::Lighting => write!(f, "LIGHTING"),
            PassKind::Glow => write!(f, "GLOW"),
            PassKind::PostFx => write!(f, "POSTFX"),
            PassKind::Debug => write!(f, "DEBUG"),
            PassKind::Hud => write!(f, "HUD"),
            PassKind::LightMapGeneration => write!(f, "LIGHTMAP"),
            PassKind::OcclusionGeneration => write!(f, "OCCLUSION"),
            PassKind::LayerComposite => write!(f, "LAYERMAP"),
        }
    }
}

/// Describes a render pass: what it renders into and how the target is cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    /// The pass identity, used for logging and statistics.
    pub kind: PassKind,
    /// The color target.
    pub color: TargetView,
    /// Clear color applied when the pass begins, if any.
    pub clear_color: Option<LinearRgba>,
    /// Clears the depth of the target when the pass begins.
    pub clear_depth: bool,
    /// Restricts rasterization to a sub-rectangle of the target.
    pub viewport: Option<Rect>,
}

impl RenderPassDescriptor {
    /// A pass clearing `color` to `clear` (and its depth).
    pub fn cleared(kind: PassKind, color: TargetView, clear: LinearRgba) -> Self {
        Self {
            kind,
            color,
            clear_color: Some(clear),
            clear_depth: true,
            viewport: None,
        }
    }

    /// A pass that keeps the target's contents.
    pub fn load(kind: PassKind, color: TargetView) -> Self {
        Self {
            kind,
            color,
            clear_color: None,
            clear_depth: false,
            viewport: None,
        }
    }
}

/// The space vertex positions are expressed in once transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexSpace {
    /// Positions go through `view_proj * model` into clip space.
    #[default]
    Clip,
    /// Vertex UVs are the raster position; used by bakes.
    Texel,
}

/// Per-draw directional shading parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadeParams {
    /// Direction the light travels, world space.
    pub light_dir: Vec3,
    /// Ambient term.
    pub ambient: LinearRgba,
    /// Diffuse term of the main light.
    pub diffuse: LinearRgba,
    /// Summed point light contribution.
    pub point_lights: LinearRgba,
}

/// A single draw of an indexed mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Identity of the drawn instance, recorded by diagnostic backends.
    pub tag: u64,
    /// Vertex buffer.
    pub vertex_buffer: BufferId,
    /// Index buffer.
    pub index_buffer: BufferId,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Object to world transform.
    pub model: Mat4,
    /// World to clip transform.
    pub view_proj: Mat4,
    /// Vertex space.
    pub space: VertexSpace,
    /// Base color.
    pub color: LinearRgba,
    /// Directional shading, `None` for unlit draws.
    pub shade: Option<ShadeParams>,
    /// Blending with the target.
    pub blend: BlendMode,
    /// Fill mode.
    pub polygon: PolygonMode,
    /// Bound state objects.
    pub states: Vec<StateId>,
    /// Bound textures.
    pub textures: Vec<TextureId>,
}

/// Copies a texture into a rectangle of the current target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlitOp {
    /// Source texture.
    pub source: TargetView,
    /// Normalized source region, `None` for the whole texture.
    pub source_rect: Option<Rect>,
    /// Destination rectangle in target pixels, `None` for the whole target.
    pub dest: Option<Rect>,
    /// Blending with the target.
    pub blend: BlendMode,
    /// Color the source is modulated with.
    pub tint: LinearRgba,
}

impl BlitOp {
    /// An opaque copy of `source` over the whole target.
    pub fn copy(source: TargetView) -> Self {
        Self {
            source,
            source_rect: None,
            dest: None,
            blend: BlendMode::Opaque,
            tint: LinearRgba::WHITE,
        }
    }

    /// Sets the destination rectangle.
    pub fn to_rect(mut self, dest: Rect) -> Self {
        self.dest = Some(dest);
        self
    }

    /// Sets the blending.
    pub fn blended(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// A full-screen operation applied to the current target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FullscreenEffect {
    /// Blends the target towards a color.
    Fade {
        /// Fade color.
        color: LinearRgba,
        /// Blend amount in `[0, 1]`.
        amount: f32,
    },
    /// Scales saturation (`1.0` keeps the image).
    Saturation(f32),
    /// Scales brightness (`1.0` keeps the image).
    Brightness(f32),
    /// Box blur repeated `passes` times.
    Blur {
        /// Number of blur iterations.
        passes: u32,
    },
    /// Radial blur towards the center of the target.
    RadialBlur {
        /// Blur strength in `[0, 1]`.
        strength: f32,
    },
}
