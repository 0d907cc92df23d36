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

//! Resource ingestion: meshes, skinned meshes, textures and picture banks.
//!
//! Uploads are synchronous. Once an upload call returns, the resource is
//! resident and its handle resolves.

use super::resource_cache::{CachedPictureBank, CachedTexture, ResourceCache};
use prism_core::math::Rect;
use prism_core::renderer::api::{
    BufferDescriptor, BufferUsage, MeshData, MeshHandle, PictureBankData, PictureBankHandle,
    SkinMeshData, SkinMeshHandle, TextureData, TextureDescriptor, TextureHandle, TextureId,
};
use prism_core::renderer::settings::TextureLevel;
use prism_core::renderer::{GraphicsDevice, ResourceError};
use prism_lanes::render_lane::GpuMesh;

impl ResourceCache {
    /// Uploads a static mesh.
    ///
    /// # Errors
    ///
    /// `BackendError` for malformed geometry, `OutOfVideoMemory` when the
    /// buffers do not fit.
    pub fn upload_mesh(&mut self, data: &MeshData) -> Result<MeshHandle, ResourceError> {
        let handle = MeshHandle(self.meshes.len() as u32);
        let gpu = create_mesh_buffers(self.device(), &format!("mesh {}", handle.0), data)?;
        self.meshes.push(gpu);
        log::debug!(
            "ResourceCache: Uploaded mesh {:?} ({} triangles)",
            handle,
            data.triangle_count()
        );
        Ok(handle)
    }

    /// Uploads a skinned mesh in its bind pose.
    pub fn upload_skin_mesh(&mut self, data: &SkinMeshData) -> Result<SkinMeshHandle, ResourceError> {
        let vertices = data.mesh.vertices.len();
        if data.bone_indices.len() != vertices || data.bone_weights.len() != vertices {
            return Err(ResourceError::BackendError(format!(
                "Skinned mesh has {} vertices but {} bone indices and {} weights",
                vertices,
                data.bone_indices.len(),
                data.bone_weights.len()
            )));
        }
        if let Some(bad) = data
            .bone_indices
            .iter()
            .flatten()
            .find(|&&b| u32::from(b) >= data.bone_count)
        {
            return Err(ResourceError::BackendError(format!(
                "Bone index {bad} outside a palette of {}",
                data.bone_count
            )));
        }
        let handle = SkinMeshHandle(self.skin_meshes.len() as u32);
        let gpu = create_mesh_buffers(self.device(), &format!("skin mesh {}", handle.0), &data.mesh)?;
        self.skin_meshes.push(gpu);
        Ok(handle)
    }

    /// Uploads a texture, dropping top mip levels according to the texture tier.
    pub fn upload_texture(&mut self, data: TextureData) -> Result<TextureHandle, ResourceError> {
        let handle = TextureHandle(self.textures.len() as u32);
        let id = create_texture_from(
            self.device(),
            &format!("texture {}", handle.0),
            &data,
            self.texture_level,
        )?;
        self.textures.push(CachedTexture {
            id: Some(id),
            source: data,
        });
        Ok(handle)
    }

    /// Uploads a picture atlas. Frame rectangles are given in atlas pixels.
    pub fn upload_picture_bank(&mut self, data: PictureBankData) -> Result<PictureBankHandle, ResourceError> {
        let (w, h) = (data.texture.width.max(1) as f32, data.texture.height.max(1) as f32);
        let frames = data
            .frames
            .iter()
            .map(|f| Rect::new(f.x / w, f.y / h, f.width / w, f.height / h))
            .collect();
        let texture = self.upload_texture(data.texture)?;
        let handle = PictureBankHandle(self.picture_banks.len() as u32);
        self.picture_banks.push(CachedPictureBank { texture, frames });
        Ok(handle)
    }

    /// Rebuilds every uploaded texture for a new texture tier.
    ///
    /// Handles are kept; only the device textures behind them change.
    pub fn set_texture_level(&mut self, level: TextureLevel) -> Result<(), ResourceError> {
        if level == self.texture_level {
            return Ok(());
        }
        log::info!(
            "ResourceCache: Texture level {:?} -> {:?}, re-uploading {} textures",
            self.texture_level,
            level,
            self.textures.len()
        );
        self.texture_level = level;
        let device = self.device.as_ref();
        for (i, texture) in self.textures.iter_mut().enumerate() {
            if let Some(old) = texture.id.take() {
                if let Err(e) = device.destroy_texture(old) {
                    log::warn!("ResourceCache: Failed to free texture {old:?}: {e}");
                }
            }
            texture.id = Some(create_texture_from(
                device,
                &format!("texture {i}"),
                &texture.source,
                level,
            )?);
        }
        Ok(())
    }
}

/// Number of top mip levels skipped at a texture tier.
pub(crate) fn mip_skip(level: TextureLevel, mip_count: usize) -> usize {
    let skip = match level {
        TextureLevel::High => 0,
        TextureLevel::Medium => 1,
        TextureLevel::Low => 2,
    };
    skip.min(mip_count.saturating_sub(1))
}

/// Creates and fills a sampled texture.
pub(crate) fn create_texture_from(
    device: &dyn GraphicsDevice,
    label: &str,
    data: &TextureData,
    level: TextureLevel,
) -> Result<TextureId, ResourceError> {
    if data.mips.is_empty() {
        return Err(ResourceError::BackendError(format!("Texture '{label}' has no texels")));
    }
    let skip = mip_skip(level, data.mips.len());
    let mips = &data.mips[skip..];
    let descriptor = TextureDescriptor {
        cube: data.cube,
        ..TextureDescriptor::sampled(
            label,
            (data.width >> skip).max(1),
            (data.height >> skip).max(1),
            mips.len() as u32,
        )
    };
    let id = device.create_texture(&descriptor)?;
    for (mip, texels) in mips.iter().enumerate() {
        if let Err(e) = device.write_texture(id, mip as u32, texels) {
            let _ = device.destroy_texture(id);
            return Err(e);
        }
    }
    Ok(id)
}

/// Uploads the vertex and index buffers of a mesh.
pub(crate) fn create_mesh_buffers(
    device: &dyn GraphicsDevice,
    label: &str,
    data: &MeshData,
) -> Result<GpuMesh, ResourceError> {
    if data.indices.len() % 3 != 0 {
        return Err(ResourceError::BackendError(format!(
            "Mesh '{label}' has {} indices, not a triangle list",
            data.indices.len()
        )));
    }
    let vertex_count = data.vertices.len() as u32;
    if let Some(bad) = data.indices.iter().find(|&&i| i >= vertex_count) {
        return Err(ResourceError::BackendError(format!(
            "Mesh '{label}' indexes vertex {bad} of {vertex_count}"
        )));
    }

    // 1. Vertex buffer.
    let vertex_buffer = device.create_buffer(
        &BufferDescriptor {
            label: format!("{label} vertices"),
            usage: BufferUsage::Vertex,
        },
        bytemuck::cast_slice(&data.vertices),
    )?;

    // 2. Index buffer.
    let index_buffer = match device.create_buffer(
        &BufferDescriptor {
            label: format!("{label} indices"),
            usage: BufferUsage::Index,
        },
        bytemuck::cast_slice(&data.indices),
    ) {
        Ok(id) => id,
        Err(e) => {
            let _ = device.destroy_buffer(vertex_buffer);
            return Err(e);
        }
    };

    Ok(GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: data.indices.len() as u32,
    })
}

/// Frees the buffers of a mesh.
pub(crate) fn destroy_mesh_buffers(device: &dyn GraphicsDevice, mesh: GpuMesh) {
    for buffer in [mesh.vertex_buffer, mesh.index_buffer] {
        if let Err(e) = device.destroy_buffer(buffer) {
            log::warn!("ResourceCache: Failed to free buffer {buffer:?}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::{DeviceCaps, Vertex};
    use prism_infra::HeadlessDevice;
    use prism_lanes::render_lane::GpuResolver;
    use std::sync::Arc;

    fn cache(level: TextureLevel) -> (HeadlessDevice, ResourceCache) {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let cache = ResourceCache::new(Arc::new(device.clone()), level).unwrap();
        (device, cache)
    }

    fn checker(size: u32, mips: usize) -> TextureData {
        TextureData {
            width: size,
            height: size,
            mips: (0..mips)
                .map(|m| vec![200u8; ((size >> m).max(1) * (size >> m).max(1) * 4) as usize])
                .collect(),
            cube: false,
        }
    }

    #[test]
    fn test_mip_skip_keeps_at_least_one_level() {
        assert_eq!(mip_skip(TextureLevel::High, 5), 0);
        assert_eq!(mip_skip(TextureLevel::Medium, 5), 1);
        assert_eq!(mip_skip(TextureLevel::Low, 5), 2);
        assert_eq!(mip_skip(TextureLevel::Low, 1), 0);
    }

    #[test]
    fn test_uploaded_mesh_resolves() {
        let (_device, mut cache) = cache(TextureLevel::High);
        let handle = cache.upload_mesh(&MeshData::unit_cube()).unwrap();
        let gpu = cache.mesh(handle).unwrap();
        assert_eq!(gpu.triangle_count(), 12);
        assert_eq!(cache.mesh(MeshHandle(7)), None);
        cache.shutdown();
    }

    #[test]
    fn test_malformed_meshes_are_rejected() {
        let (device, mut cache) = cache(TextureLevel::High);
        let buffers = device.live_buffers();
        let bad = MeshData {
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 5],
        };
        assert!(cache.upload_mesh(&bad).is_err());
        let skin = SkinMeshData {
            mesh: MeshData::unit_quad(),
            bone_indices: vec![[0; 4]],
            bone_weights: vec![[1.0, 0.0, 0.0, 0.0]],
            bone_count: 1,
        };
        assert!(cache.upload_skin_mesh(&skin).is_err());
        assert_eq!(device.live_buffers(), buffers);
        cache.shutdown();
    }

    #[test]
    fn test_texture_level_change_rebuilds_textures() {
        let (device, mut cache) = cache(TextureLevel::High);
        let handle = cache.upload_texture(checker(64, 3)).unwrap();
        let before = device.vram_usage();
        let old = cache.texture(handle).unwrap();

        cache.set_texture_level(TextureLevel::Low).unwrap();
        let new = cache.texture(handle).unwrap();
        assert_ne!(old, new);
        assert!(device.vram_usage() < before);
        cache.shutdown();
    }

    #[test]
    fn test_picture_frames_are_normalized() {
        let (_device, mut cache) = cache(TextureLevel::High);
        let bank = cache
            .upload_picture_bank(PictureBankData {
                texture: checker(64, 1),
                frames: vec![Rect::new(32.0, 0.0, 32.0, 16.0)],
            })
            .unwrap();
        let (_, rect) = cache.picture(bank, 0).unwrap();
        assert_eq!(rect, Rect::new(0.5, 0.0, 0.5, 0.25));
        assert!(cache.picture(bank, 1).is_none());
        cache.shutdown();
    }
}
