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

//! Lookup of GPU-resident resources from scene handles.
//!
//! Executors never own meshes or textures. The agent that owns the resource
//! cache implements [`GpuResolver`] and lends it for the duration of a pass.

use prism_core::math::Rect;
use prism_core::renderer::api::{
    BufferId, MeshHandle, PictureBankHandle, ProbeHandle, SkinMeshHandle, TextureHandle, TextureId,
};

/// Vertex and index buffers of an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuMesh {
    /// Vertex buffer.
    pub vertex_buffer: BufferId,
    /// Index buffer, `u32` indices.
    pub index_buffer: BufferId,
    /// Number of indices.
    pub index_count: u32,
}

impl GpuMesh {
    /// Number of triangles drawn by the mesh.
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

/// Geometry every renderer instance uploads on initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinMesh {
    /// Unit quad in the XY plane, UVs over `[0, 1]`.
    Quad,
    /// Unit plane in the XZ plane.
    Plane,
    /// Unit cube.
    Cube,
    /// Unit sphere.
    Sphere,
}

impl BuiltinMesh {
    /// Every built-in mesh.
    pub const ALL: [BuiltinMesh; 4] = [
        BuiltinMesh::Quad,
        BuiltinMesh::Plane,
        BuiltinMesh::Cube,
        BuiltinMesh::Sphere,
    ];
}

/// Textures owned by the resource cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultTexture {
    /// Opaque white.
    White,
    /// Transparent black.
    Black,
    /// Flat normal map.
    FlatBump,
    /// One distinct color per mip level.
    DebugMips,
}

impl DefaultTexture {
    /// Every default texture.
    pub const ALL: [DefaultTexture; 4] = [
        DefaultTexture::White,
        DefaultTexture::Black,
        DefaultTexture::FlatBump,
        DefaultTexture::DebugMips,
    ];
}

/// Resolves scene handles to device resources.
///
/// `None` means the handle is stale or its resource is not resident; callers
/// skip the drawable.
pub trait GpuResolver {
    /// An uploaded static mesh.
    fn mesh(&self, handle: MeshHandle) -> Option<GpuMesh>;
    /// An uploaded skinned mesh.
    fn skin_mesh(&self, handle: SkinMeshHandle) -> Option<GpuMesh>;
    /// A built-in mesh.
    fn builtin(&self, mesh: BuiltinMesh) -> Option<GpuMesh>;
    /// An uploaded texture.
    fn texture(&self, handle: TextureHandle) -> Option<TextureId>;
    /// One frame of a picture bank: the bank texture and the normalized source rectangle.
    fn picture(&self, bank: PictureBankHandle, frame: usize) -> Option<(TextureId, Rect)>;
    /// The cube texture of a reflection probe.
    fn probe_texture(&self, probe: ProbeHandle) -> Option<TextureId>;
    /// A default texture.
    fn default_texture(&self, texture: DefaultTexture) -> Option<TextureId>;
}
