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

//! CPU-side geometry and image payloads handed to the upload entry points.

use super::resource::{VertexAttribute, VertexFormat, VertexSemantic};
use crate::math::{Aabb, Rect, Vec2, Vec3, PI, TAU};

/// The vertex record shared by every mesh category.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Object-space position.
    pub position: Vec3,
    /// Object-space unit normal.
    pub normal: Vec3,
    /// Texture coordinates, also the texel-space position when baking.
    pub uv: Vec2,
}

impl Vertex {
    /// Creates a new vertex.
    pub const fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// The attribute layout matching the `#[repr(C)]` record.
    pub fn layout() -> (Vec<VertexAttribute>, u32) {
        (
            vec![
                VertexAttribute {
                    semantic: VertexSemantic::Position,
                    format: VertexFormat::Float3,
                    offset: 0,
                },
                VertexAttribute {
                    semantic: VertexSemantic::Normal,
                    format: VertexFormat::Float3,
                    offset: 12,
                },
                VertexAttribute {
                    semantic: VertexSemantic::TexCoord,
                    format: VertexFormat::Float2,
                    offset: 24,
                },
            ],
            std::mem::size_of::<Vertex>() as u32,
        )
    }
}

/// An indexed triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Vertex records.
    pub vertices: Vec<Vertex>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Object-space bounding box.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// A unit quad in the XY plane facing +Z, UVs covering `[0, 1]`.
    pub fn unit_quad() -> Self {
        let n = Vec3::Z;
        Self {
            vertices: vec![
                Vertex::new(Vec3::new(-0.5, -0.5, 0.0), n, Vec2::new(0.0, 1.0)),
                Vertex::new(Vec3::new(0.5, -0.5, 0.0), n, Vec2::new(1.0, 1.0)),
                Vertex::new(Vec3::new(0.5, 0.5, 0.0), n, Vec2::new(1.0, 0.0)),
                Vertex::new(Vec3::new(-0.5, 0.5, 0.0), n, Vec2::new(0.0, 0.0)),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// A horizontal unit plane facing +Y.
    pub fn unit_plane() -> Self {
        let mut quad = Self::unit_quad();
        for v in &mut quad.vertices {
            v.position = Vec3::new(v.position.x, 0.0, -v.position.y);
            v.normal = Vec3::Y;
        }
        quad
    }

    /// A unit cube centered on the origin.
    ///
    /// Each face is a separate UV chart laid out in a 3x2 atlas.
    pub fn unit_cube() -> Self {
        let faces = [
            (Vec3::X, Vec3::Y),
            (-Vec3::X, Vec3::Y),
            (Vec3::Y, -Vec3::Z),
            (-Vec3::Y, Vec3::Z),
            (Vec3::Z, Vec3::Y),
            (-Vec3::Z, Vec3::Y),
        ];
        let mut mesh = Self::default();
        for (i, (normal, up)) in faces.into_iter().enumerate() {
            let right = up.cross(normal);
            let chart = Vec2::new((i % 3) as f32 / 3.0, (i / 3) as f32 / 2.0);
            // Charts are inset so neighbouring faces never share texels.
            let inset = 0.02;
            let size = Vec2::new(1.0 / 3.0 - 2.0 * inset, 0.5 - 2.0 * inset);
            let base = mesh.vertices.len() as u32;
            for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = normal * 0.5 + right * (0.5 * sx) + up * (0.5 * sy);
                let uv = Vec2::new(
                    chart.x + inset + size.x * (sx + 1.0) * 0.5,
                    chart.y + inset + size.y * (1.0 - sy) * 0.5,
                );
                mesh.vertices.push(Vertex::new(position, normal, uv));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// A UV sphere of radius 0.5 centered on the origin.
    pub fn uv_sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut mesh = Self::default();
        for r in 0..=rings {
            let v = r as f32 / rings as f32;
            let phi = v * PI;
            for s in 0..=segments {
                let u = s as f32 / segments as f32;
                let theta = u * TAU;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                mesh.vertices
                    .push(Vertex::new(normal * 0.5, normal, Vec2::new(u, v)));
            }
        }
        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                mesh.indices
                    .extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh
    }
}

/// A mesh deformed by a bone palette.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinMeshData {
    /// Bind-pose geometry.
    pub mesh: MeshData,
    /// Up to four bone indices per vertex.
    pub bone_indices: Vec<[u8; 4]>,
    /// Matching bone weights per vertex.
    pub bone_weights: Vec<[f32; 4]>,
    /// Size of the bone palette.
    pub bone_count: u32,
}

/// An RGBA8 image with an optional mip chain, or a cube texture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureData {
    /// Width of mip 0.
    pub width: u32,
    /// Height of mip 0.
    pub height: u32,
    /// RGBA8 texels per mip level (per face for cube textures, faces concatenated).
    pub mips: Vec<Vec<u8>>,
    /// Six-faced cube texture.
    pub cube: bool,
}

impl TextureData {
    /// A 1x1 texture filled with an `0xAARRGGBB` color.
    pub fn solid(argb: u32) -> Self {
        let px = crate::math::LinearRgba::from_argb_u32(argb).to_rgba8();
        Self {
            width: 1,
            height: 1,
            mips: vec![px.to_vec()],
            cube: false,
        }
    }
}

/// A texture atlas of HUD pictures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PictureBankData {
    /// The atlas image.
    pub texture: TextureData,
    /// Pixel rectangle of every picture inside the atlas.
    pub frames: Vec<Rect>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_record() {
        let (attributes, stride) = Vertex::layout();
        assert_eq!(stride, 32);
        assert_eq!(attributes.last().map(|a| a.offset), Some(24));
    }

    #[test]
    fn test_cube_has_six_separate_charts() {
        let cube = MeshData::unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        let bounds = cube.bounds();
        assert_eq!(bounds.min, Vec3::new(-0.5, -0.5, -0.5));
        assert!(cube
            .vertices
            .iter()
            .all(|v| (0.0..=1.0).contains(&v.uv.x) && (0.0..=1.0).contains(&v.uv.y)));
    }

    #[test]
    fn test_sphere_index_count() {
        let sphere = MeshData::uv_sphere(8, 4);
        assert_eq!(sphere.triangle_count(), 8 * 4 * 2);
    }
}
