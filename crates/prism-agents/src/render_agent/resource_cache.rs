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

//! The renderer's resource plane.
//!
//! The [`ResourceCache`] owns every GPU object the renderer creates:
//!
//! - **State objects** are deduplicated by descriptor and reference counted.
//!   The cache keeps one reference of its own, so a released state stays
//!   resident until shutdown.
//! - **Uploaded resources** (meshes, textures, picture banks) live in flat
//!   tables indexed by their renderer handle.
//! - **Render targets** (view swap chains, shadow maps, probe cubes, bake
//!   targets) are registered with the descriptor they are rebuilt from. Their
//!   handles stay valid across a device lost/reset cycle.
//! - **Default objects** (default textures, built-in meshes) are created on
//!   initialisation.

use super::uploads::{create_mesh_buffers, create_texture_from, destroy_mesh_buffers};
use ahash::AHashMap;
use prism_core::math::Rect;
use prism_core::renderer::api::{
    MeshData, MeshHandle, PictureBankHandle, ProbeHandle, RenderTargetHandle, SkinMeshHandle,
    StateDescriptor, StateId, SwapChainDescriptor, SwapChainId, TextureData, TextureDescriptor,
    TextureHandle, TextureId,
};
use prism_core::renderer::settings::TextureLevel;
use prism_core::renderer::{GraphicsDevice, ResourceError, StateCache};
use prism_lanes::render_lane::{BuiltinMesh, DefaultTexture, GpuMesh, GpuResolver};
use std::collections::HashMap;
use std::sync::Arc;

/// Colors of the mip levels of the debug texture, `0xAARRGGBB`, largest first.
const DEBUG_MIP_COLORS: [u32; 11] = [
    0xFFFF0000, 0xFF00FF00, 0xFF0000FF, 0xFFFFFF00, 0xFF00FFFF, 0xFFFF00FF, 0xFFFF8000,
    0xFF8000FF, 0xFF0080FF, 0xFF80FF00, 0xFFFFFFFF,
];

/// Edge of mip 0 of the debug texture.
const DEBUG_MIP_SIZE: u32 = 1024;

#[derive(Debug)]
struct CachedState {
    id: StateId,
    refs: u32,
    /// `false` between a device loss and the following reset.
    live: bool,
}

/// What a registered render target is rebuilt from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDescriptor {
    /// A render-target texture.
    Texture(TextureDescriptor),
    /// A swap chain; its current back buffer is the target.
    SwapChain(SwapChainDescriptor),
}

impl TargetDescriptor {
    /// Nominal size of the target.
    pub fn size(&self) -> (u32, u32) {
        match self {
            TargetDescriptor::Texture(t) => (t.width, t.height),
            TargetDescriptor::SwapChain(s) => (s.width, s.height),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LiveTarget {
    Texture(TextureId),
    SwapChain(SwapChainId),
}

#[derive(Debug)]
struct RegisteredTarget {
    descriptor: TargetDescriptor,
    live: Option<LiveTarget>,
}

/// An uploaded texture, with the source texels it is rebuilt from when the
/// texture tier changes.
#[derive(Debug)]
pub(crate) struct CachedTexture {
    pub(crate) id: Option<TextureId>,
    pub(crate) source: TextureData,
}

/// An uploaded picture bank.
#[derive(Debug)]
pub(crate) struct CachedPictureBank {
    pub(crate) texture: TextureHandle,
    /// Normalized source rectangles.
    pub(crate) frames: Vec<Rect>,
}

/// Deduplicating, reference-counting owner of the renderer's GPU objects.
#[derive(Debug)]
pub struct ResourceCache {
    pub(crate) device: Arc<dyn GraphicsDevice>,
    states: AHashMap<StateDescriptor, CachedState>,
    state_keys: AHashMap<StateId, StateDescriptor>,
    pub(crate) meshes: Vec<GpuMesh>,
    pub(crate) skin_meshes: Vec<GpuMesh>,
    pub(crate) textures: Vec<CachedTexture>,
    pub(crate) picture_banks: Vec<CachedPictureBank>,
    targets: Vec<Option<RegisteredTarget>>,
    probes: Vec<Option<RenderTargetHandle>>,
    defaults: AHashMap<DefaultTexture, TextureId>,
    builtins: AHashMap<BuiltinMesh, GpuMesh>,
    pub(crate) texture_level: TextureLevel,
    /// `false` while render-target-bound objects are released.
    alive: bool,
}

impl ResourceCache {
    /// Creates the cache and its default objects.
    pub fn new(device: Arc<dyn GraphicsDevice>, texture_level: TextureLevel) -> Result<Self, ResourceError> {
        let mut cache = Self {
            device,
            states: AHashMap::new(),
            state_keys: AHashMap::new(),
            meshes: Vec::new(),
            skin_meshes: Vec::new(),
            textures: Vec::new(),
            picture_banks: Vec::new(),
            targets: Vec::new(),
            probes: Vec::new(),
            defaults: AHashMap::new(),
            builtins: AHashMap::new(),
            texture_level,
            alive: true,
        };
        cache.create_default_textures()?;
        cache.create_builtin_meshes()?;
        Ok(cache)
    }

    /// The device every object lives on.
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    // --- Default objects ---

    fn create_default_textures(&mut self) -> Result<(), ResourceError> {
        self.destroy_default_textures();
        for texture in DefaultTexture::ALL {
            let data = match texture {
                DefaultTexture::White => TextureData::solid(0xFFFFFFFF),
                DefaultTexture::Black => TextureData::solid(0x00000000),
                DefaultTexture::FlatBump => TextureData::solid(0xFF8080FF),
                DefaultTexture::DebugMips => debug_mip_texture(),
            };
            // Default textures are never downscaled by the texture tier.
            let id = create_texture_from(self.device(), &format!("{texture:?}"), &data, TextureLevel::High)?;
            self.defaults.insert(texture, id);
        }
        Ok(())
    }

    fn create_builtin_meshes(&mut self) -> Result<(), ResourceError> {
        for mesh in BuiltinMesh::ALL {
            let data = match mesh {
                BuiltinMesh::Quad => MeshData::unit_quad(),
                BuiltinMesh::Plane => MeshData::unit_plane(),
                BuiltinMesh::Cube => MeshData::unit_cube(),
                BuiltinMesh::Sphere => MeshData::uv_sphere(16, 12),
            };
            let gpu = create_mesh_buffers(self.device(), &format!("{mesh:?}"), &data)?;
            self.builtins.insert(mesh, gpu);
        }
        Ok(())
    }

    fn destroy_default_textures(&mut self) {
        for (texture, id) in self.defaults.drain() {
            if let Err(e) = self.device.destroy_texture(id) {
                log::warn!("ResourceCache: Failed to free default texture {texture:?}: {e}");
            }
        }
    }

    // --- Render targets ---

    /// Registers a render target and creates it if the device is usable.
    pub fn register_target(&mut self, descriptor: TargetDescriptor) -> Result<RenderTargetHandle, ResourceError> {
        let live = if self.alive {
            Some(create_live(self.device(), &descriptor)?)
        } else {
            None
        };
        let handle = RenderTargetHandle(self.targets.len() as u32);
        self.targets.push(Some(RegisteredTarget { descriptor, live }));
        Ok(handle)
    }

    /// Frees a render target. Its handle is never reused.
    pub fn unregister_target(&mut self, handle: RenderTargetHandle) {
        let Some(slot) = self.targets.get_mut(handle.index()) else {
            return;
        };
        if let Some(target) = slot.take() {
            if let Some(live) = target.live {
                destroy_live(self.device.as_ref(), live);
            }
        }
    }

    /// Changes the descriptor of a render target, recreating it if it is live.
    pub fn replace_target(
        &mut self,
        handle: RenderTargetHandle,
        descriptor: TargetDescriptor,
    ) -> Result<(), ResourceError> {
        let alive = self.alive;
        let device = self.device.as_ref();
        let target = self
            .targets
            .get_mut(handle.index())
            .and_then(Option::as_mut)
            .ok_or(ResourceError::InvalidHandle)?;
        if let Some(live) = target.live.take() {
            destroy_live(device, live);
        }
        target.descriptor = descriptor;
        if alive {
            target.live = Some(create_live(device, &target.descriptor)?);
        }
        Ok(())
    }

    /// The texture currently bound to a render target, `None` while released.
    pub fn target_texture(&self, handle: RenderTargetHandle) -> Option<TextureId> {
        let target = self.targets.get(handle.index())?.as_ref()?;
        match target.live? {
            LiveTarget::Texture(id) => Some(id),
            LiveTarget::SwapChain(chain) => self.device.back_buffer(chain).ok(),
        }
    }

    /// The swap chain behind a render target, if it is one.
    pub fn swap_chain(&self, handle: RenderTargetHandle) -> Option<SwapChainId> {
        match self.targets.get(handle.index())?.as_ref()?.live? {
            LiveTarget::SwapChain(chain) => Some(chain),
            LiveTarget::Texture(_) => None,
        }
    }

    /// The descriptor a render target is rebuilt from.
    pub fn target_descriptor(&self, handle: RenderTargetHandle) -> Option<&TargetDescriptor> {
        Some(&self.targets.get(handle.index())?.as_ref()?.descriptor)
    }

    /// Number of registered render targets.
    pub fn target_count(&self) -> usize {
        self.targets.iter().flatten().count()
    }

    // --- Reflection probes ---

    /// Creates the cube render target of a reflection probe.
    pub fn create_probe(&mut self, size: u32) -> Result<ProbeHandle, ResourceError> {
        let probe = ProbeHandle(self.probes.len() as u32);
        let target = self.register_target(TargetDescriptor::Texture(
            TextureDescriptor::cube_render_target(format!("reflection probe {}", probe.0), size),
        ))?;
        self.probes.push(Some(target));
        Ok(probe)
    }

    /// The render target of a probe.
    pub fn probe_target(&self, probe: ProbeHandle) -> Option<RenderTargetHandle> {
        *self.probes.get(probe.index())?
    }

    /// Frees the cube of one probe. Its handle is never reused.
    pub fn release_probe(&mut self, probe: ProbeHandle) {
        if let Some(target) = self.probes.get_mut(probe.index()).and_then(Option::take) {
            self.unregister_target(target);
        }
    }

    /// Number of probes holding a cube.
    pub fn probe_count(&self) -> usize {
        self.probes.iter().flatten().count()
    }

    /// Frees every probe cube.
    pub fn release_probes(&mut self) {
        let targets: Vec<RenderTargetHandle> = self.probes.drain(..).flatten().collect();
        for target in targets {
            self.unregister_target(target);
        }
    }

    // --- Device lifecycle ---

    /// Frees every render-target-bound object and the device-dependent
    /// defaults. Descriptors and handles are kept.
    pub fn on_device_lost(&mut self) {
        if !self.alive {
            return;
        }
        self.release_live_objects();
        self.alive = false;
        log::info!(
            "ResourceCache: Released {} render targets and the device defaults",
            self.target_count()
        );
    }

    /// Rebuilds what [`on_device_lost`](Self::on_device_lost) released.
    ///
    /// On failure everything recreated so far is freed again, so the cache
    /// is back in its released state and the reset can be retried.
    pub fn on_device_reset(&mut self) -> Result<(), ResourceError> {
        if self.alive {
            return Ok(());
        }
        if let Err(e) = self.recreate_live_objects() {
            log::warn!("ResourceCache: Reset failed, releasing partial objects: {e}");
            self.release_live_objects();
            return Err(e);
        }
        self.alive = true;
        log::info!("ResourceCache: Recreated {} render targets", self.target_count());
        Ok(())
    }

    fn release_live_objects(&mut self) {
        let device = self.device.as_ref();
        for target in self.targets.iter_mut().flatten() {
            if let Some(live) = target.live.take() {
                destroy_live(device, live);
            }
        }
        self.destroy_default_textures();
        for (descriptor, state) in self.states.iter_mut() {
            if descriptor.is_vertex_layout() && state.live {
                if let Err(e) = self.device.destroy_state(state.id) {
                    log::warn!("ResourceCache: Failed to free vertex layout {:?}: {e}", state.id);
                }
                self.state_keys.remove(&state.id);
                state.live = false;
            }
        }
    }

    fn recreate_live_objects(&mut self) -> Result<(), ResourceError> {
        self.create_default_textures()?;
        for (descriptor, state) in self.states.iter_mut().filter(|(_, s)| !s.live) {
            state.id = self.device.create_state(descriptor)?;
            state.live = true;
            self.state_keys.insert(state.id, descriptor.clone());
        }
        let device = self.device.as_ref();
        for target in self.targets.iter_mut().flatten() {
            if target.live.is_none() {
                target.live = Some(create_live(device, &target.descriptor)?);
            }
        }
        Ok(())
    }

    /// Returns `true` unless render-target-bound objects are released.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    // --- Introspection ---

    /// Reference count of every cached state object, the cache's own included.
    pub fn state_ref_counts(&self) -> HashMap<StateDescriptor, u32> {
        self.states
            .iter()
            .map(|(d, s)| (d.clone(), s.refs))
            .collect()
    }

    /// Number of distinct cached state objects.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    // --- Shutdown ---

    /// Destroys every object of the cache.
    ///
    /// # Panics
    ///
    /// If a state object is still referenced by someone other than the cache.
    pub fn shutdown(&mut self) {
        let leaked: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| s.refs > 1)
            .map(|(d, s)| format!("{d:?} ({} refs)", s.refs))
            .collect();
        assert!(
            leaked.is_empty(),
            "ResourceCache: {} state objects leaked at shutdown: {}",
            leaked.len(),
            leaked.join(", ")
        );

        for (_, state) in self.states.drain() {
            if state.live {
                if let Err(e) = self.device.destroy_state(state.id) {
                    log::warn!("ResourceCache: Failed to free state {:?}: {e}", state.id);
                }
            }
        }
        self.state_keys.clear();
        self.probes.clear();
        for handle in 0..self.targets.len() {
            self.unregister_target(RenderTargetHandle(handle as u32));
        }
        self.destroy_default_textures();
        let device = self.device.as_ref();
        let meshes = self.meshes.drain(..).chain(self.skin_meshes.drain(..));
        for mesh in meshes.chain(self.builtins.drain().map(|(_, m)| m)) {
            destroy_mesh_buffers(device, mesh);
        }
        for texture in self.textures.drain(..) {
            if let Some(id) = texture.id {
                if let Err(e) = device.destroy_texture(id) {
                    log::warn!("ResourceCache: Failed to free texture {id:?}: {e}");
                }
            }
        }
        self.picture_banks.clear();
        log::info!("ResourceCache: Shut down");
    }
}

impl StateCache for ResourceCache {
    fn acquire(&mut self, descriptor: &StateDescriptor) -> Result<StateId, ResourceError> {
        if let Some(state) = self.states.get_mut(descriptor) {
            state.refs += 1;
            return Ok(state.id);
        }
        let id = self.device.create_state(descriptor)?;
        log::trace!("ResourceCache: New state {id:?} for {descriptor:?}");
        self.states.insert(
            descriptor.clone(),
            CachedState {
                id,
                refs: 2,
                live: true,
            },
        );
        self.state_keys.insert(id, descriptor.clone());
        Ok(id)
    }

    fn release(&mut self, id: StateId) {
        let Some(descriptor) = self.state_keys.get(&id) else {
            debug_assert!(false, "ResourceCache: release of unknown state {id:?}");
            return;
        };
        if let Some(state) = self.states.get_mut(descriptor) {
            debug_assert!(state.refs > 1, "ResourceCache: over-release of {descriptor:?}");
            state.refs = state.refs.saturating_sub(1).max(1);
        }
    }
}

impl GpuResolver for ResourceCache {
    fn mesh(&self, handle: MeshHandle) -> Option<GpuMesh> {
        self.meshes.get(handle.index()).copied()
    }

    fn skin_mesh(&self, handle: SkinMeshHandle) -> Option<GpuMesh> {
        self.skin_meshes.get(handle.index()).copied()
    }

    fn builtin(&self, mesh: BuiltinMesh) -> Option<GpuMesh> {
        self.builtins.get(&mesh).copied()
    }

    fn texture(&self, handle: TextureHandle) -> Option<TextureId> {
        self.textures.get(handle.index())?.id
    }

    fn picture(&self, bank: PictureBankHandle, frame: usize) -> Option<(TextureId, Rect)> {
        let bank = self.picture_banks.get(bank.index())?;
        let rect = *bank.frames.get(frame)?;
        Some((self.texture(bank.texture)?, rect))
    }

    fn probe_texture(&self, probe: ProbeHandle) -> Option<TextureId> {
        self.target_texture(self.probe_target(probe)?)
    }

    fn default_texture(&self, texture: DefaultTexture) -> Option<TextureId> {
        self.defaults.get(&texture).copied()
    }
}

fn create_live(device: &dyn GraphicsDevice, descriptor: &TargetDescriptor) -> Result<LiveTarget, ResourceError> {
    match descriptor {
        TargetDescriptor::Texture(t) => device.create_texture(t).map(LiveTarget::Texture),
        TargetDescriptor::SwapChain(s) => device.create_swap_chain(s).map(LiveTarget::SwapChain),
    }
}

fn destroy_live(device: &dyn GraphicsDevice, live: LiveTarget) {
    let result = match live {
        LiveTarget::Texture(id) => device.destroy_texture(id),
        LiveTarget::SwapChain(id) => device.destroy_swap_chain(id),
    };
    if let Err(e) = result {
        log::warn!("ResourceCache: Failed to free render target {live:?}: {e}");
    }
}

/// The debug texture: one solid color per mip level.
fn debug_mip_texture() -> TextureData {
    let mips = DEBUG_MIP_COLORS
        .iter()
        .enumerate()
        .map(|(level, &argb)| {
            let size = (DEBUG_MIP_SIZE >> level).max(1) as usize;
            let px = TextureData::solid(argb).mips.remove(0);
            px.repeat(size * size)
        })
        .collect();
    TextureData {
        width: DEBUG_MIP_SIZE,
        height: DEBUG_MIP_SIZE,
        mips,
        cube: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::{BlendMode, DeviceCaps, DeviceState, TextureFormat};
    use prism_infra::HeadlessDevice;

    fn cache() -> (HeadlessDevice, ResourceCache) {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let cache = ResourceCache::new(Arc::new(device.clone()), TextureLevel::High).unwrap();
        (device, cache)
    }

    #[test]
    fn test_states_are_deduplicated_and_counted() {
        let (device, mut cache) = cache();
        let a = cache.acquire(&StateDescriptor::Blend(BlendMode::Alpha)).unwrap();
        let b = cache.acquire(&StateDescriptor::Blend(BlendMode::Alpha)).unwrap();
        assert_eq!(a, b);
        assert_eq!(device.live_states(), 1);
        assert_eq!(
            cache.state_ref_counts()[&StateDescriptor::Blend(BlendMode::Alpha)],
            3
        );

        cache.release(a);
        cache.release(b);
        assert_eq!(
            cache.state_ref_counts()[&StateDescriptor::Blend(BlendMode::Alpha)],
            1
        );
        // The cache keeps its own reference.
        assert_eq!(device.live_states(), 1);
        cache.shutdown();
        assert_eq!(device.live_states(), 0);
    }

    #[test]
    #[should_panic(expected = "leaked at shutdown")]
    fn test_shutdown_detects_leaked_states() {
        let (_device, mut cache) = cache();
        cache.acquire(&StateDescriptor::Blend(BlendMode::Additive)).unwrap();
        cache.shutdown();
    }

    #[test]
    fn test_debug_texture_has_a_full_mip_chain() {
        let data = debug_mip_texture();
        assert_eq!(data.mips.len(), 11);
        assert_eq!(data.mips[0].len(), 1024 * 1024 * 4);
        assert_eq!(data.mips[10].len(), 4);
        assert_ne!(data.mips[0][..4], data.mips[1][..4]);
    }

    #[test]
    fn test_targets_survive_a_lost_reset_cycle() {
        let (device, mut cache) = cache();
        let target = cache
            .register_target(TargetDescriptor::Texture(TextureDescriptor::render_target(
                "scratch",
                16,
                16,
                TextureFormat::Rgba8Unorm,
            )))
            .unwrap();
        let white = cache.default_texture(DefaultTexture::White);
        assert!(white.is_some());

        device.simulate_device_loss();
        cache.on_device_lost();
        assert_eq!(device.device_state(), DeviceState::NotReset);
        assert_eq!(cache.target_texture(target), None);
        assert_eq!(cache.default_texture(DefaultTexture::White), None);

        let swap = SwapChainDescriptor {
            width: 16,
            height: 16,
            format: TextureFormat::Rgba8Unorm,
            buffer_count: 1,
            fullscreen: false,
            vsync: false,
            msaa: prism_core::renderer::settings::MsaaLevel::None,
        };
        device.reset(&swap).unwrap();
        cache.on_device_reset().unwrap();
        assert!(cache.target_texture(target).is_some());
        assert!(cache.default_texture(DefaultTexture::White).is_some());
        cache.shutdown();
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn test_failed_reset_releases_partial_objects() {
        let (device, mut cache) = cache();
        let target = cache
            .register_target(TargetDescriptor::Texture(TextureDescriptor::render_target(
                "scratch",
                16,
                16,
                TextureFormat::Rgba8Unorm,
            )))
            .unwrap();
        let usage = device.vram_usage();

        device.simulate_device_loss();
        cache.on_device_lost();
        let released = device.live_textures();
        let swap = SwapChainDescriptor {
            width: 16,
            height: 16,
            format: TextureFormat::Rgba8Unorm,
            buffer_count: 1,
            fullscreen: false,
            vsync: false,
            msaa: prism_core::renderer::settings::MsaaLevel::None,
        };
        device.reset(&swap).unwrap();

        // The defaults fit, the scratch target does not.
        device.set_vram_budget(usage - 1);
        let err = cache.on_device_reset().unwrap_err();
        assert!(matches!(err, ResourceError::OutOfVideoMemory { .. }));
        assert!(!cache.is_alive());
        assert_eq!(device.live_textures(), released);
        assert_eq!(cache.default_texture(DefaultTexture::White), None);

        device.set_vram_budget(u64::MAX);
        cache.on_device_reset().unwrap();
        assert!(cache.target_texture(target).is_some());
        assert_eq!(device.vram_usage(), usage);
        cache.shutdown();
        assert_eq!(device.live_textures(), 0);
    }
}
