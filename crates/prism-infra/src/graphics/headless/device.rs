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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use prism_core::renderer::api::{
    BufferDescriptor, BufferId, BufferUsage, DeviceCaps, DeviceState, ReadbackImage,
    RenderPassDescriptor, StateDescriptor, StateId, SwapChainDescriptor, SwapChainId, TargetView,
    TextureDescriptor, TextureId,
};
use prism_core::renderer::traits::RenderPass;
use prism_core::renderer::{GraphicsDevice, RenderError, ResourceError};

use super::frame_log::FrameLog;
use super::pass::HeadlessPass;
use super::raster::Surface;

/// Largest side of the CPU surface backing a texture, unless overridden.
pub const DEFAULT_RASTER_LIMIT: u32 = 2048;

#[derive(Debug)]
pub(crate) struct HeadlessTexture {
    pub(crate) descriptor: TextureDescriptor,
    pub(crate) size: u64,
    /// One surface per layer, allocated on first write.
    pub(crate) layers: Vec<Option<Surface>>,
}

impl HeadlessTexture {
    pub(crate) fn layer_index(&self, view: &TargetView) -> Result<usize, ResourceError> {
        match (view.face, self.descriptor.cube) {
            (Some(face), true) => Ok(face.layer()),
            (None, false) => Ok(0),
            _ => Err(ResourceError::InvalidHandle),
        }
    }
}

#[derive(Debug)]
pub(crate) struct HeadlessBuffer {
    #[allow(dead_code)]
    pub(crate) usage: BufferUsage,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug)]
struct HeadlessSwapChain {
    buffers: Vec<TextureId>,
    current: usize,
}

#[derive(Debug, Default)]
struct LossState {
    lost: bool,
    failed: bool,
}

/// The shared state of a [`HeadlessDevice`].
#[derive(Debug)]
pub(crate) struct HeadlessDeviceInternal {
    caps: DeviceCaps,
    raster_limit: u32,
    vram_budget: AtomicU64,
    loss: Mutex<LossState>,
    pub(crate) textures: Mutex<HashMap<TextureId, HeadlessTexture>>,
    pub(crate) buffers: Mutex<HashMap<BufferId, HeadlessBuffer>>,
    pub(crate) states: Mutex<HashMap<StateId, StateDescriptor>>,
    swap_chains: Mutex<HashMap<SwapChainId, HeadlessSwapChain>>,

    next_texture_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_state_id: AtomicUsize,
    next_swap_chain_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,

    pub(crate) frame_log: Mutex<FrameLog>,
}

pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    what: &str,
) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

impl HeadlessDeviceInternal {
    /// Size of the CPU surface backing a `width` x `height` texture.
    pub(crate) fn storage_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.min(self.raster_limit), height.min(self.raster_limit))
    }

    fn render_targets_alive(&self) -> Result<usize, ResourceError> {
        let textures = lock(&self.textures, "textures")?;
        Ok(textures
            .values()
            .filter(|t| t.descriptor.render_target)
            .count())
    }

    fn state(&self) -> DeviceState {
        let loss = match self.loss.lock() {
            Ok(loss) => loss,
            Err(_) => return DeviceState::Error,
        };
        if loss.failed {
            return DeviceState::Error;
        }
        if !loss.lost {
            return DeviceState::Ok;
        }
        match self.render_targets_alive() {
            Ok(0) => DeviceState::NotReset,
            Ok(_) => DeviceState::Lost,
            Err(_) => DeviceState::Error,
        }
    }

    pub(crate) fn ensure_ok(&self) -> Result<(), ResourceError> {
        match self.state() {
            DeviceState::Ok => Ok(()),
            other => Err(ResourceError::DeviceNotReady(other)),
        }
    }

    fn ensure_not_failed(&self) -> Result<(), ResourceError> {
        match self.state() {
            DeviceState::Error => Err(ResourceError::DeviceNotReady(DeviceState::Error)),
            _ => Ok(()),
        }
    }

    fn reserve_vram(&self, bytes: u64) -> Result<(), ResourceError> {
        let budget = self.vram_budget.load(Ordering::Relaxed);
        self.vram_allocated_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(bytes).filter(|total| *total <= budget)
            })
            .map_err(|current| ResourceError::OutOfVideoMemory {
                requested: bytes,
                available: budget.saturating_sub(current),
            })?;
        let current = self.vram_allocated_bytes.load(Ordering::Relaxed);
        self.vram_peak_bytes.fetch_max(current, Ordering::Relaxed);
        Ok(())
    }

    fn free_vram(&self, bytes: u64) {
        self.vram_allocated_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    fn create_texture_internal(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0
            || descriptor.height == 0
            || descriptor.width > self.caps.max_texture_size
            || descriptor.height > self.caps.max_texture_size
        {
            return Err(ResourceError::BackendError(format!(
                "Texture '{}' of {}x{} exceeds the device limits",
                descriptor.label, descriptor.width, descriptor.height
            )));
        }
        if descriptor.render_target && !self.caps.supports_render_target(descriptor.format) {
            return Err(ResourceError::BackendError(format!(
                "Format {:?} is not renderable on '{}'",
                descriptor.format, self.caps.adapter_name
            )));
        }

        let size_in_bytes = descriptor.byte_size();
        self.reserve_vram(size_in_bytes)?;

        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        let layer_count = if descriptor.cube { 6 } else { 1 };
        lock(&self.textures, "textures")?.insert(
            id,
            HeadlessTexture {
                descriptor: descriptor.clone(),
                size: size_in_bytes,
                layers: vec![None; layer_count],
            },
        );

        log::debug!(
            "HeadlessDevice: Created texture '{}' with ID: {:?}, size: {} bytes (VRAM)",
            descriptor.label,
            id,
            size_in_bytes
        );
        Ok(id)
    }

    fn destroy_texture_internal(&self, id: TextureId) -> Result<(), ResourceError> {
        let removed = lock(&self.textures, "textures")?.remove(&id);
        match removed {
            Some(texture) => {
                self.free_vram(texture.size);
                log::debug!("HeadlessDevice: Destroyed texture with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }
}

/// A CPU-backed implementation of [`GraphicsDevice`].
///
/// Honours the whole device contract: resource tables with VRAM accounting
/// against a budget, the OK / LOST / NOT_RESET / ERROR state machine, real
/// rasterisation into CPU surfaces and read-back. Every executed pass is
/// recorded in a [`FrameLog`] for inspection.
///
/// Surfaces larger than the raster limit are stored downscaled; read-back
/// resamples them to the texture's nominal size.
#[derive(Clone, Debug)]
pub struct HeadlessDevice {
    pub(crate) internal: Arc<HeadlessDeviceInternal>,
}

impl HeadlessDevice {
    /// Creates a device reporting `caps`, with a VRAM budget of `caps.video_memory`.
    pub fn new(caps: DeviceCaps) -> Self {
        Self::with_raster_limit(caps, DEFAULT_RASTER_LIMIT)
    }

    /// Creates a device whose CPU surfaces never exceed `raster_limit` texels per side.
    pub fn with_raster_limit(caps: DeviceCaps, raster_limit: u32) -> Self {
        log::info!(
            "HeadlessDevice: '{}' ({:?}, {} MB)",
            caps.adapter_name,
            caps.pixel_shader,
            caps.video_memory / (1024 * 1024)
        );
        Self {
            internal: Arc::new(HeadlessDeviceInternal {
                vram_budget: AtomicU64::new(caps.video_memory),
                caps,
                raster_limit: raster_limit.max(1),
                loss: Mutex::new(LossState::default()),
                textures: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                states: Mutex::new(HashMap::new()),
                swap_chains: Mutex::new(HashMap::new()),
                next_texture_id: AtomicUsize::new(1),
                next_buffer_id: AtomicUsize::new(1),
                next_state_id: AtomicUsize::new(1),
                next_swap_chain_id: AtomicUsize::new(1),
                vram_allocated_bytes: AtomicU64::new(0),
                vram_peak_bytes: AtomicU64::new(0),
                frame_log: Mutex::new(FrameLog::default()),
            }),
        }
    }

    /// Overrides the video memory budget.
    pub fn set_vram_budget(&self, bytes: u64) {
        self.internal.vram_budget.store(bytes, Ordering::Relaxed);
    }

    /// Highest VRAM usage observed.
    pub fn vram_peak(&self) -> u64 {
        self.internal.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Simulates a platform device loss, such as a mode switch.
    pub fn simulate_device_loss(&self) {
        if let Ok(mut loss) = self.internal.loss.lock() {
            log::warn!("HeadlessDevice: Device lost");
            loss.lost = true;
        }
    }

    /// Simulates an unrecoverable driver failure.
    pub fn simulate_driver_failure(&self) {
        if let Ok(mut loss) = self.internal.loss.lock() {
            log::error!("HeadlessDevice: Driver failure");
            loss.failed = true;
        }
    }

    /// A copy of the passes recorded since the last clear.
    pub fn frame_log(&self) -> FrameLog {
        self.internal
            .frame_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Returns the recorded passes and clears the log.
    pub fn take_frame_log(&self) -> FrameLog {
        self.internal
            .frame_log
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }

    /// Number of live textures.
    pub fn live_textures(&self) -> usize {
        self.internal.textures.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Number of live render-target textures, back buffers included.
    pub fn live_render_targets(&self) -> usize {
        self.internal.render_targets_alive().unwrap_or(0)
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.internal.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Number of live state objects.
    pub fn live_states(&self) -> usize {
        self.internal.states.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Number of live swap chains.
    pub fn live_swap_chains(&self) -> usize {
        self.internal.swap_chains.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn caps(&self) -> DeviceCaps {
        self.internal.caps.clone()
    }

    fn device_state(&self) -> DeviceState {
        self.internal.state()
    }

    fn create_swap_chain(
        &self,
        descriptor: &SwapChainDescriptor,
    ) -> Result<SwapChainId, ResourceError> {
        self.internal.ensure_ok()?;
        let mut buffers = Vec::new();
        for i in 0..descriptor.buffer_count.max(1) {
            let texture = TextureDescriptor::render_target(
                format!("back buffer {i}"),
                descriptor.width,
                descriptor.height,
                descriptor.format,
            );
            match self.internal.create_texture_internal(&texture) {
                Ok(id) => buffers.push(id),
                Err(e) => {
                    for id in buffers {
                        let _ = self.internal.destroy_texture_internal(id);
                    }
                    return Err(e);
                }
            }
        }
        let id = SwapChainId(
            self.internal
                .next_swap_chain_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.swap_chains, "swap_chains")?
            .insert(id, HeadlessSwapChain { buffers, current: 0 });
        log::info!(
            "HeadlessDevice: Created swap chain {:?} ({}x{}, {} buffers)",
            id,
            descriptor.width,
            descriptor.height,
            descriptor.buffer_count.max(1)
        );
        Ok(id)
    }

    fn destroy_swap_chain(&self, id: SwapChainId) -> Result<(), ResourceError> {
        let chain = lock(&self.internal.swap_chains, "swap_chains")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        for buffer in chain.buffers {
            self.internal.destroy_texture_internal(buffer)?;
        }
        log::debug!("HeadlessDevice: Destroyed swap chain {id:?}");
        Ok(())
    }

    fn back_buffer(&self, id: SwapChainId) -> Result<TextureId, ResourceError> {
        let chains = lock(&self.internal.swap_chains, "swap_chains")?;
        let chain = chains.get(&id).ok_or(ResourceError::NotFound)?;
        Ok(chain.buffers[chain.current])
    }

    fn present(&self, id: SwapChainId) -> Result<(), ResourceError> {
        self.internal.ensure_ok()?;
        {
            let mut chains = lock(&self.internal.swap_chains, "swap_chains")?;
            let chain = chains.get_mut(&id).ok_or(ResourceError::NotFound)?;
            chain.current = (chain.current + 1) % chain.buffers.len();
        }
        lock(&self.internal.frame_log, "frame_log")?.presents += 1;
        Ok(())
    }

    fn reset(&self, descriptor: &SwapChainDescriptor) -> Result<(), RenderError> {
        if !self.internal.caps.supports_render_target(descriptor.format) {
            return Err(RenderError::UnsupportedCapability(format!(
                "back buffer format {:?}",
                descriptor.format
            )));
        }
        let alive = self.internal.render_targets_alive()?;
        let mut loss = self
            .internal
            .loss
            .lock()
            .map_err(|e| RenderError::Internal(format!("Mutex poisoned (loss): {e}")))?;
        if loss.failed {
            return Err(RenderError::DeviceError(
                "the driver failed; the device cannot be reset".to_string(),
            ));
        }
        if alive > 0 {
            return Err(RenderError::ResourceError(ResourceError::BackendError(
                format!("reset with {alive} render targets still alive"),
            )));
        }
        loss.lost = false;
        log::info!(
            "HeadlessDevice: Reset ({}x{}, fullscreen: {})",
            descriptor.width,
            descriptor.height,
            descriptor.fullscreen
        );
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        if descriptor.render_target {
            self.internal.ensure_ok()?;
        } else {
            self.internal.ensure_not_failed()?;
        }
        self.internal.create_texture_internal(descriptor)
    }

    fn write_texture(
        &self,
        id: TextureId,
        mip_level: u32,
        rgba8: &[u8],
    ) -> Result<(), ResourceError> {
        let mut textures = lock(&self.internal.textures, "textures")?;
        let texture = textures.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let desc = &texture.descriptor;
        if mip_level >= desc.mip_levels {
            return Err(ResourceError::InvalidHandle);
        }
        let w = (desc.width >> mip_level).max(1);
        let h = (desc.height >> mip_level).max(1);
        let layer_bytes = (w * h * 4) as usize;
        if rgba8.len() != layer_bytes * texture.layers.len() {
            return Err(ResourceError::BackendError(format!(
                "Texture '{}' mip {} expects {} bytes, got {}",
                desc.label,
                mip_level,
                layer_bytes * texture.layers.len(),
                rgba8.len()
            )));
        }
        // Only the top level is sampled by the rasteriser.
        if mip_level > 0 {
            return Ok(());
        }
        let (sw, sh) = self.internal.storage_size(w, h);
        for (layer, bytes) in texture.layers.iter_mut().zip(rgba8.chunks_exact(layer_bytes)) {
            let mut surface = Surface::new(w, h);
            for (dst, src) in surface.texels.iter_mut().zip(bytes.chunks_exact(4)) {
                dst.copy_from_slice(src);
            }
            *layer = Some(surface.resampled(sw, sh));
        }
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.internal.destroy_texture_internal(id)
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.internal.ensure_not_failed()?;
        self.internal.reserve_vram(contents.len() as u64)?;
        let id = BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            HeadlessBuffer {
                usage: descriptor.usage,
                bytes: contents.to_vec(),
            },
        );
        log::debug!(
            "HeadlessDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label,
            id,
            contents.len()
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let removed = lock(&self.internal.buffers, "buffers")?.remove(&id);
        match removed {
            Some(buffer) => {
                self.internal.free_vram(buffer.bytes.len() as u64);
                log::debug!("HeadlessDevice: Destroyed buffer with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_state(&self, descriptor: &StateDescriptor) -> Result<StateId, ResourceError> {
        self.internal.ensure_not_failed()?;
        let id = StateId(self.internal.next_state_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.states, "states")?.insert(id, descriptor.clone());
        log::trace!("HeadlessDevice: Created state {id:?}: {descriptor:?}");
        Ok(id)
    }

    fn destroy_state(&self, id: StateId) -> Result<(), ResourceError> {
        lock(&self.internal.states, "states")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn begin_render_pass<'a>(
        &'a self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPass + 'a>, ResourceError> {
        self.internal.ensure_ok()?;
        let pass = HeadlessPass::begin(&self.internal, descriptor)?;
        Ok(Box::new(pass))
    }

    fn read_back(&self, view: TargetView) -> Result<ReadbackImage, ResourceError> {
        self.internal.ensure_not_failed()?;
        let textures = lock(&self.internal.textures, "textures")?;
        let texture = textures.get(&view.texture).ok_or(ResourceError::NotFound)?;
        let layer = texture.layer_index(&view)?;
        let (w, h) = (texture.descriptor.width, texture.descriptor.height);
        let rgba8 = match &texture.layers[layer] {
            Some(surface) => surface.resampled(w, h).to_rgba8(),
            None => vec![0; (w * h * 4) as usize],
        };
        Ok(ReadbackImage {
            width: w,
            height: h,
            rgba8,
        })
    }

    fn vram_usage(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed)
    }
}
