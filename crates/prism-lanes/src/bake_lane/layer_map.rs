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

//! Layer map compositing.
//!
//! Up to [`LAYER_COUNT`] layers are composited per pass. Longer stacks are
//! chained through two ping-pong targets, the previous result becoming the
//! bottom layer of the next group.

use super::{baked_mesh, BakeError};
use crate::render_lane::executors::texture_or_white;
use crate::render_lane::{Command, DrawStates, GpuMesh, GpuResolver, RenderContext, StateSet};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::{LinearRgba, Mat4};
use prism_core::renderer::api::{
    AddressMode, BlendMode, DrawCall, TextureHandle, TextureId, VertexSpace,
};
use prism_core::renderer::settings::PolygonMode;
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::Scene;
use std::ops::Range;

/// Layers composited by a single pass.
pub const LAYER_COUNT: usize = 4;

/// One color layer of a layer map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakeLayer {
    /// Source texture, white when absent.
    pub texture: Option<TextureHandle>,
    /// Tint; alpha is the layer opacity.
    pub color: LinearRgba,
}

impl BakeLayer {
    /// A textured layer at full opacity.
    pub fn textured(texture: TextureHandle) -> Self {
        Self {
            texture: Some(texture),
            color: LinearRgba::WHITE,
        }
    }

    /// A flat color layer.
    pub fn colored(color: LinearRgba) -> Self {
        Self {
            texture: None,
            color,
        }
    }
}

/// Splits `count` layers into compositing groups.
///
/// The first group takes [`LAYER_COUNT`] layers; every later group takes one
/// less since its first slot holds the previous result.
pub fn layer_groups(count: usize) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < count {
        let size = if start == 0 { LAYER_COUNT } else { LAYER_COUNT - 1 };
        let end = (start + size).min(count);
        groups.push(start..end);
        start = end;
    }
    groups
}

/// Composites color layers into a mesh's UV layout.
#[derive(Debug, Default)]
pub struct LayerMapLane {
    states: StateSet,
    opaque: Option<DrawStates>,
    blended: Option<DrawStates>,
}

impl LayerMapLane {
    /// Clear color of the bake targets.
    pub const CLEAR: LinearRgba = LinearRgba::new(0.0, 0.0, 0.0, 0.0);

    /// Creates an uninitialised lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the draws compositing one group.
    ///
    /// `previous` is the result of the preceding group, drawn first and
    /// opaque. Without it the first layer is drawn opaque instead.
    pub fn gather_group(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        previous: Option<TextureId>,
        layers: &[BakeLayer],
        out: &mut Vec<Command>,
    ) -> Result<(), BakeError> {
        let (Some(opaque), Some(blended)) = (self.opaque, self.blended) else {
            return Err(BakeError::NotInitialized);
        };
        if layers.is_empty() && previous.is_none() {
            return Err(BakeError::NoLayers);
        }
        let (index, mesh) = baked_mesh(ctx, scene, gpu)?;
        let tag = scene.meshes[index].id.0;

        let mut first = true;
        let mut push = |color: LinearRgba, textures: Vec<TextureId>| {
            let (blend, states) = if first {
                (BlendMode::Opaque, &opaque)
            } else {
                (BlendMode::Alpha, &blended)
            };
            first = false;
            out.push(Command::draw(
                CommandMode::Solid,
                texel_draw(tag, mesh, color, blend, states, textures),
            ));
        };

        if let Some(previous) = previous {
            push(LinearRgba::WHITE, vec![previous]);
        }
        for layer in layers {
            push(layer.color, texture_or_white(gpu, layer.texture));
        }
        Ok(())
    }
}

fn texel_draw(
    tag: u64,
    mesh: GpuMesh,
    color: LinearRgba,
    blend: BlendMode,
    states: &DrawStates,
    textures: Vec<TextureId>,
) -> DrawCall {
    DrawCall {
        tag,
        vertex_buffer: mesh.vertex_buffer,
        index_buffer: mesh.index_buffer,
        index_count: mesh.index_count,
        model: Mat4::IDENTITY,
        view_proj: Mat4::IDENTITY,
        space: VertexSpace::Texel,
        color,
        shade: None,
        blend,
        polygon: PolygonMode::Solid,
        states: states.to_vec(),
        textures,
    }
}

impl Lane for LayerMapLane {
    fn strategy_name(&self) -> &'static str {
        "LayerMapBake"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Bake
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.opaque = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (false, false),
            BlendMode::Opaque,
            AddressMode::Repeat,
        )?);
        self.blended = Some(DrawStates::acquire(
            &mut self.states,
            ctx,
            (false, false),
            BlendMode::Alpha,
            AddressMode::Repeat,
        )?);
        Ok(())
    }

    fn on_shutdown(&mut self, ctx: &mut LaneContext<'_>) {
        self.states.release_all(ctx);
        self.opaque = None;
        self.blended = None;
    }

    fn is_initialized(&self) -> bool {
        self.opaque.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_groups_chain_through_previous_result() {
        assert!(layer_groups(0).is_empty());
        assert_eq!(layer_groups(3), vec![0..3]);
        assert_eq!(layer_groups(4), vec![0..4]);
        assert_eq!(layer_groups(5), vec![0..4, 4..5]);
        assert_eq!(layer_groups(10), vec![0..4, 4..7, 7..10]);
    }
}
