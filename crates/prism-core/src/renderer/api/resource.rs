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

//! Device-level resource identifiers and creation descriptors.

use crate::math::Vec3;
use crate::renderer::settings::MsaaLevel;

/// An opaque handle to a texture owned by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a vertex or index buffer owned by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// An opaque handle to a state object (sampler, blend, depth-stencil, vertex layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

/// An opaque handle to a swap chain owned by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwapChainId(pub usize);

/// The memory layout of texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized.
    Rgba8Unorm,
    /// 16-bit float RGBA, used by high tier lighting and glow buffers.
    Rgba16Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub fn bytes_per_texel(self) -> u64 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }

    /// Returns `true` for depth formats.
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }
}

/// Describes a texture to create.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: String,
    /// Width in texels of mip 0.
    pub width: u32,
    /// Height in texels of mip 0.
    pub height: u32,
    /// Number of mip levels, at least 1.
    pub mip_levels: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Render-target-bound textures are released on device loss.
    pub render_target: bool,
    /// Six-faced cube texture.
    pub cube: bool,
}

impl TextureDescriptor {
    /// A sampled 2D texture.
    pub fn sampled(label: impl Into<String>, width: u32, height: u32, mip_levels: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            mip_levels: mip_levels.max(1),
            format: TextureFormat::Rgba8Unorm,
            render_target: false,
            cube: false,
        }
    }

    /// A 2D render target.
    pub fn render_target(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            mip_levels: 1,
            format,
            render_target: true,
            cube: false,
        }
    }

    /// A square cube render target, one face per axis direction.
    pub fn cube_render_target(label: impl Into<String>, size: u32) -> Self {
        Self {
            cube: true,
            ..Self::render_target(label, size, size, TextureFormat::Rgba8Unorm)
        }
    }

    /// Number of bytes the texture occupies in video memory, mip chain included.
    pub fn byte_size(&self) -> u64 {
        let faces = if self.cube { 6 } else { 1 };
        let bpp = self.format.bytes_per_texel();
        let mut total = 0u64;
        let (mut w, mut h) = (u64::from(self.width), u64::from(self.height));
        for _ in 0..self.mip_levels.max(1) {
            total += w * h * bpp;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        total * faces
    }
}

/// One face of a cube texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// Looking along +X.
    PositiveX,
    /// Looking along -X.
    NegativeX,
    /// Looking along +Y.
    PositiveY,
    /// Looking along -Y.
    NegativeY,
    /// Looking along +Z.
    PositiveZ,
    /// Looking along -Z.
    NegativeZ,
}

impl CubeFace {
    /// All faces in layer order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of the face.
    pub fn layer(self) -> usize {
        self as usize
    }

    /// The direction a camera rendering this face looks at.
    pub fn forward(self) -> Vec3 {
        match self {
            CubeFace::PositiveX => Vec3::X,
            CubeFace::NegativeX => -Vec3::X,
            CubeFace::PositiveY => Vec3::Y,
            CubeFace::NegativeY => -Vec3::Y,
            CubeFace::PositiveZ => Vec3::Z,
            CubeFace::NegativeZ => -Vec3::Z,
        }
    }

    /// The up vector of the face camera.
    pub fn up(self) -> Vec3 {
        match self {
            CubeFace::PositiveY => -Vec3::Z,
            CubeFace::NegativeY => Vec3::Z,
            _ => Vec3::Y,
        }
    }
}

/// A renderable view of a texture: the whole 2D texture or one cube face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetView {
    /// The texture rendered into.
    pub texture: TextureId,
    /// The cube face, for cube textures.
    pub face: Option<CubeFace>,
}

impl TargetView {
    /// A view of a whole 2D texture.
    pub fn whole(texture: TextureId) -> Self {
        Self {
            texture,
            face: None,
        }
    }

    /// A view of one face of a cube texture.
    pub fn face(texture: TextureId, face: CubeFace) -> Self {
        Self {
            texture,
            face: Some(face),
        }
    }
}

/// How a buffer is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Holds [`Vertex`](super::Vertex) records.
    Vertex,
    /// Holds `u32` indices.
    Index,
}

/// Describes a buffer to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Debug label.
    pub label: String,
    /// Binding usage.
    pub usage: BufferUsage,
}

/// Texture filtering used by samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Point sampling.
    Nearest,
    /// Bilinear, no mip interpolation.
    Bilinear,
    /// Trilinear.
    Trilinear,
    /// Anisotropic with the given maximum.
    Anisotropic(u8),
}

/// Texture coordinate handling outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Coordinates wrap around.
    Repeat,
    /// Coordinates are clamped to the edge.
    Clamp,
}

/// How fragments combine with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Replace the target.
    #[default]
    Opaque,
    /// Source-alpha blending.
    Alpha,
    /// Additive blending.
    Additive,
    /// Modulate the target.
    Multiply,
}

/// Data type of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two floats.
    Float2,
    /// Three floats.
    Float3,
    /// Four floats.
    Float4,
    /// Four unsigned bytes.
    UByte4,
}

/// Semantic meaning of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Object-space position.
    Position,
    /// Object-space normal.
    Normal,
    /// Texture coordinates.
    TexCoord,
    /// Skinning bone indices.
    BoneIndices,
    /// Skinning bone weights.
    BoneWeights,
}

/// One vertex attribute in a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// What the attribute means.
    pub semantic: VertexSemantic,
    /// How it is stored.
    pub format: VertexFormat,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

/// Describes a shareable, device-side state object.
///
/// Descriptors are the keys of the renderer's state cache, so every variant
/// is hashable and compares structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateDescriptor {
    /// A texture sampler.
    Sampler {
        /// Filtering mode.
        filter: FilterMode,
        /// Addressing mode.
        address: AddressMode,
    },
    /// A color blend state.
    Blend(BlendMode),
    /// A depth-stencil state.
    DepthStencil {
        /// Enables the depth test.
        depth_test: bool,
        /// Enables depth writes.
        depth_write: bool,
    },
    /// A vertex input declaration.
    VertexLayout {
        /// Attributes in declaration order.
        attributes: Vec<VertexAttribute>,
        /// Size of one vertex in bytes.
        stride: u32,
    },
}

impl StateDescriptor {
    /// Vertex layouts are rebuilt in place when the device is reset.
    pub fn is_vertex_layout(&self) -> bool {
        matches!(self, StateDescriptor::VertexLayout { .. })
    }
}

/// Describes the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapChainDescriptor {
    /// Back buffer width.
    pub width: u32,
    /// Back buffer height.
    pub height: u32,
    /// Back buffer format.
    pub format: TextureFormat,
    /// Number of back buffers.
    pub buffer_count: u32,
    /// Exclusive full-screen mode.
    pub fullscreen: bool,
    /// Present waits for vertical blank.
    pub vsync: bool,
    /// Multisampling level of the back buffer.
    pub msaa: MsaaLevel,
}

/// Texels copied back from a render target into system memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadbackImage {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// RGBA8 texels, row-major.
    pub rgba8: Vec<u8>,
}

impl ReadbackImage {
    /// The texel at `(x, y)`.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba8[i], self.rgba8[i + 1], self.rgba8[i + 2], self.rgba8[i + 3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_includes_mips_and_faces() {
        let tex = TextureDescriptor::sampled("debug", 4, 4, 3);
        assert_eq!(tex.byte_size(), (16 + 4 + 1) * 4);

        let cube = TextureDescriptor::cube_render_target("probe", 2);
        assert_eq!(cube.byte_size(), 2 * 2 * 4 * 6);
    }

    #[test]
    fn test_cube_face_bases_are_orthogonal() {
        for face in CubeFace::ALL {
            assert_eq!(face.forward().dot(face.up()), 0.0);
        }
        assert_eq!(CubeFace::NegativeZ.layer(), 5);
    }
}
