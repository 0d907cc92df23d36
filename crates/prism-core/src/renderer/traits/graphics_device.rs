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

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::RenderPass;
use std::fmt::Debug;

/// The contract every graphics backend implements.
///
/// Devices are shared behind an `Arc` and every method takes `&self`; the
/// renderer serializes mutating calls through its device-wide lock.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Returns the capabilities reported by the hardware.
    fn caps(&self) -> DeviceCaps;

    /// Polls the device state.
    ///
    /// Called once per frame by the host. A device that has been lost reports
    /// [`DeviceState::Lost`] until every render-target-bound object is destroyed,
    /// then [`DeviceState::NotReset`] until [`reset`](Self::reset) succeeds.
    fn device_state(&self) -> DeviceState;

    /// Creates the presentation surface.
    /// ## Errors
    /// * `ResourceError::DeviceNotReady` - If the device is not in the OK state.
    fn create_swap_chain(&self, descriptor: &SwapChainDescriptor)
        -> Result<SwapChainId, ResourceError>;

    /// Destroys a swap chain and its back buffers.
    fn destroy_swap_chain(&self, id: SwapChainId) -> Result<(), ResourceError>;

    /// Returns the texture of the current back buffer of a swap chain.
    fn back_buffer(&self, id: SwapChainId) -> Result<TextureId, ResourceError>;

    /// Presents the current back buffer.
    fn present(&self, id: SwapChainId) -> Result<(), ResourceError>;

    /// Resets a lost device with the stored presentation parameters.
    /// ## Errors
    /// * `RenderError::DeviceError` - If the driver failed.
    /// * `RenderError::ResourceError` - If render-target-bound objects are still alive.
    fn reset(&self, descriptor: &SwapChainDescriptor) -> Result<(), RenderError>;

    /// Creates a texture.
    /// ## Arguments
    /// * `descriptor` - Size, format and usage of the texture.
    /// ## Returns
    /// The ID of the new texture.
    /// ## Errors
    /// * `ResourceError::OutOfVideoMemory` - If the texture does not fit in video memory.
    /// * `ResourceError::DeviceNotReady` - For render targets while the device is lost.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Uploads RGBA8 texels into one mip level of a texture.
    fn write_texture(&self, id: TextureId, mip_level: u32, rgba8: &[u8])
        -> Result<(), ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a buffer initialized with `contents`.
    /// ## Errors
    /// * `ResourceError::OutOfVideoMemory` - If the buffer does not fit in video memory.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Destroys a buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates a state object.
    fn create_state(&self, descriptor: &StateDescriptor) -> Result<StateId, ResourceError>;

    /// Destroys a state object.
    fn destroy_state(&self, id: StateId) -> Result<(), ResourceError>;

    /// Begins a render pass, binding and clearing its target.
    ///
    /// The pass is submitted and retired when the returned object is dropped.
    fn begin_render_pass<'a>(
        &'a self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPass + 'a>, ResourceError>;

    /// Copies a render target back into system memory.
    fn read_back(&self, view: TargetView) -> Result<ReadbackImage, ResourceError>;

    /// Bytes of video memory currently allocated.
    fn vram_usage(&self) -> u64;
}
