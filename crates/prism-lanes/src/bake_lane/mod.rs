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

//! Texel-space bakes: light maps, occlusion maps and layer maps.
//!
//! Each bake lane gathers the draws of one mesh instance rasterized through
//! its UVs. Target allocation, read-back and dilation are driven by the
//! caller; [`border`] holds the CPU side of that work.

pub mod border;
mod layer_map;
mod light_map;
mod occlusion;

pub use self::layer_map::{layer_groups, BakeLayer, LayerMapLane, LAYER_COUNT};
pub use self::light_map::LightMapLane;
pub use self::occlusion::{occlusion_factor, OcclusionLane};

use crate::render_lane::{GpuMesh, GpuResolver, RenderContext};
use prism_core::renderer::ResourceError;
use prism_core::scene::Scene;
use thiserror::Error;

/// Errors raised while baking a map.
#[derive(Debug, Error)]
pub enum BakeError {
    /// No mesh instance has this id.
    #[error("No mesh instance with id {0}")]
    UnknownInstance(u64),
    /// The instance references a mesh that was never uploaded.
    #[error("Mesh of instance {0} is not resident")]
    MeshNotResident(u64),
    /// The requested map size is empty or exceeds the device limit.
    #[error("Invalid bake size {width}x{height}")]
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The read-back image does not match the target size.
    #[error("Read-back size mismatch: expected {expected} bytes, got {actual}")]
    ReadbackSize {
        /// Bytes expected.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },
    /// The bake lane was used before `on_initialize`.
    #[error("Bake lane used before initialization")]
    NotInitialized,
    /// A layer map was requested without layers.
    #[error("Layer map requested without layers")]
    NoLayers,
    /// The device refused an operation.
    #[error("Device error during bake: {0}")]
    Resource(#[from] ResourceError),
}

/// The single instance a bake context was built for, with its GPU mesh.
pub(crate) fn baked_mesh(
    ctx: &RenderContext,
    scene: &Scene,
    gpu: &dyn GpuResolver,
) -> Result<(usize, GpuMesh), BakeError> {
    let &index = ctx
        .visible
        .meshes
        .first()
        .ok_or(BakeError::UnknownInstance(0))?;
    let instance = scene
        .meshes
        .get(index)
        .ok_or(BakeError::UnknownInstance(index as u64))?;
    let mesh = gpu
        .mesh(instance.mesh)
        .ok_or(BakeError::MeshNotResident(instance.id.0))?;
    Ok((index, mesh))
}
