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

//! Ownership of the graphics device and settings negotiation.

use super::resource_cache::ResourceCache;
use super::view::{swap_chain_for, DEFAULT_BUFFER_COUNT};
use prism_core::lane::LaneContext;
use prism_core::renderer::api::{DeviceCaps, DeviceState, SwapChainDescriptor, TextureFormat};
use prism_core::renderer::{
    DebugSettings, GraphicsDevice, MaxRenderSettings, RenderError, RenderSettings, ResourceError,
};
use std::sync::Arc;

/// Owns the device, the hardware ceilings and the resource cache.
///
/// The manager performs the device half of the lost/reset cycle: freeing and
/// rebuilding what is bound to render targets. Re-initialising executors is
/// left to the agent that owns them.
#[derive(Debug)]
pub struct DeviceLifecycleManager {
    // The device every object is created on.
    device: Arc<dyn GraphicsDevice>,
    // Capabilities queried once at construction.
    caps: DeviceCaps,
    // Ceilings derived from `caps`.
    max: MaxRenderSettings,
    // Settings as last requested by the caller.
    requested: RenderSettings,
    // `requested` clamped to `max`.
    effective: RenderSettings,
    // Presentation parameters the device is reset with.
    swap_chain: SwapChainDescriptor,
    // Owner of every GPU object of the renderer.
    cache: ResourceCache,
}

impl DeviceLifecycleManager {
    /// Takes ownership of a device and negotiates the initial settings.
    ///
    /// # Errors
    ///
    /// * `UnsupportedCapability` - If the device cannot render into RGBA8 targets.
    /// * `InitializationFailed` - If the device is not in the OK state.
    /// * `ResourceError` - If the default objects cannot be created.
    pub fn new(device: Arc<dyn GraphicsDevice>, requested: RenderSettings) -> Result<Self, RenderError> {
        let caps = device.caps();
        if !caps.supports_render_target(TextureFormat::Rgba8Unorm) {
            log::error!(
                "DeviceLifecycleManager: '{}' cannot render into RGBA8 targets",
                caps.adapter_name
            );
            return Err(RenderError::UnsupportedCapability(
                "RGBA8 render targets".to_string(),
            ));
        }
        let state = device.device_state();
        if !state.is_ok() {
            log::error!("DeviceLifecycleManager: Device is {state} at startup");
            return Err(RenderError::InitializationFailed(format!(
                "the device is {state}"
            )));
        }

        let max = MaxRenderSettings::from_caps(&caps);
        let effective = max.clamp(&requested, &caps);
        log::info!("DeviceLifecycleManager: Requested settings {requested:?}");
        log::info!("DeviceLifecycleManager: Max settings {max:?}");
        log::info!("DeviceLifecycleManager: Effective settings {effective:?}");

        let cache = ResourceCache::new(Arc::clone(&device), effective.texture)?;
        Ok(Self {
            swap_chain: swap_chain_for(&effective, DEFAULT_BUFFER_COUNT),
            device,
            caps,
            max,
            requested,
            effective,
            cache,
        })
    }

    // --- Accessors ---

    /// The device.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// Capabilities of the device.
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Ceilings of every setting.
    pub fn max_settings(&self) -> &MaxRenderSettings {
        &self.max
    }

    /// The effective settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.effective
    }

    /// The settings as last requested.
    pub fn requested_settings(&self) -> &RenderSettings {
        &self.requested
    }

    /// Presentation parameters of the default view.
    pub fn swap_chain_descriptor(&self) -> &SwapChainDescriptor {
        &self.swap_chain
    }

    /// The resource cache.
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// The resource cache, mutably.
    pub fn cache_mut(&mut self) -> &mut ResourceCache {
        &mut self.cache
    }

    /// Polls the device.
    pub fn device_state(&self) -> DeviceState {
        self.device.device_state()
    }

    /// Returns `true` when frames can be rendered.
    pub fn is_ready(&self) -> bool {
        self.cache.is_alive() && self.device_state().is_ok()
    }

    // --- Settings ---

    /// `requested` clamped to the ceilings of the device.
    pub fn negotiate(&self, requested: &RenderSettings) -> RenderSettings {
        self.max.clamp(requested, &self.caps)
    }

    /// Stores new settings while device objects are released.
    ///
    /// Uploaded textures are rebuilt for the new texture tier.
    pub(crate) fn apply_settings(&mut self, requested: RenderSettings) -> Result<(), ResourceError> {
        self.effective = self.negotiate(&requested);
        self.requested = requested;
        self.swap_chain = swap_chain_for(&self.effective, self.swap_chain.buffer_count);
        self.cache.set_texture_level(self.effective.texture)
    }

    // --- Lost / reset ---

    /// Frees every render-target-bound object.
    pub(crate) fn release_device_objects(&mut self) {
        self.cache.on_device_lost();
    }

    /// Resets the device and rebuilds what was released.
    pub(crate) fn restore_device_objects(&mut self) -> Result<(), RenderError> {
        self.device.reset(&self.swap_chain)?;
        self.cache.on_device_reset()?;
        Ok(())
    }

    /// Runs `f` with a lane context over the device, the state cache and the
    /// effective settings.
    pub(crate) fn with_lane_context<R>(
        &mut self,
        debug: &DebugSettings,
        f: impl FnOnce(&mut LaneContext<'_>) -> R,
    ) -> R {
        let device = Arc::clone(&self.device);
        let mut ctx = LaneContext {
            device: device.as_ref(),
            states: &mut self.cache,
            settings: &self.effective,
            debug,
        };
        f(&mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::ShaderModel;
    use prism_core::renderer::settings::{GlobalLevel, ShaderLevel};
    use prism_infra::HeadlessDevice;

    #[test]
    fn test_initial_settings_are_clamped() {
        let device = HeadlessDevice::new(DeviceCaps::shader_model_2());
        let manager = DeviceLifecycleManager::new(
            Arc::new(device),
            RenderSettings::with_global_level(GlobalLevel::VeryHigh),
        )
        .unwrap();
        assert_eq!(manager.settings().shader, ShaderLevel::Low);
        assert_eq!(manager.requested_settings().shader, ShaderLevel::High);
        assert!(manager.max_settings().admits(manager.settings()));
    }

    #[test]
    fn test_missing_render_target_format_is_fatal() {
        let caps = DeviceCaps {
            render_target_formats: Vec::new(),
            pixel_shader: ShaderModel::Ps3_0,
            ..DeviceCaps::high_end()
        };
        let err = DeviceLifecycleManager::new(
            Arc::new(HeadlessDevice::new(caps)),
            RenderSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedCapability(_)));
    }

    #[test]
    fn test_failed_device_is_rejected() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        device.simulate_driver_failure();
        let err = DeviceLifecycleManager::new(Arc::new(device), RenderSettings::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::InitializationFailed(_)));
    }
}
