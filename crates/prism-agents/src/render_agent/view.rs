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

//! Render views: a presentable light buffer and its companion targets.

use super::resource_cache::{ResourceCache, TargetDescriptor};
use prism_core::renderer::api::{
    RenderTargetHandle, SwapChainDescriptor, TextureDescriptor, TextureFormat,
};
use prism_core::math::{Mat4, Vec3, FRAC_PI_2};
use prism_core::renderer::settings::RenderSettings;
use prism_core::renderer::ResourceError;
use prism_core::scene::{Camera, PostFxSettings};

/// Back buffers of the default view.
pub const DEFAULT_BUFFER_COUNT: u32 = 2;

/// A CPU-side view wrapper.
///
/// Every target of the view is registered in the resource cache, so the view
/// and its handles outlive device loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderView {
    /// Swap chain whose back buffer receives the lit scene.
    pub light_buffer: RenderTargetHandle,
    /// Additive glow, composited by the post-fx pass.
    pub glow_buffer: RenderTargetHandle,
    /// Planar reflection of water surfaces.
    pub reflection_buffer: RenderTargetHandle,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RenderView {
    /// Registers the targets of a new view.
    pub(crate) fn create(
        cache: &mut ResourceCache,
        swap_chain: SwapChainDescriptor,
    ) -> Result<Self, ResourceError> {
        let (width, height) = (swap_chain.width, swap_chain.height);
        let [glow, reflection] = companion_targets(width, height);
        let light_buffer = cache.register_target(TargetDescriptor::SwapChain(swap_chain))?;
        let glow_buffer = match cache.register_target(glow) {
            Ok(handle) => handle,
            Err(e) => {
                cache.unregister_target(light_buffer);
                return Err(e);
            }
        };
        let reflection_buffer = match cache.register_target(reflection) {
            Ok(handle) => handle,
            Err(e) => {
                cache.unregister_target(light_buffer);
                cache.unregister_target(glow_buffer);
                return Err(e);
            }
        };
        Ok(Self {
            light_buffer,
            glow_buffer,
            reflection_buffer,
            width,
            height,
        })
    }

    /// Resizes every target of the view.
    pub(crate) fn resize(
        &mut self,
        cache: &mut ResourceCache,
        swap_chain: SwapChainDescriptor,
    ) -> Result<(), ResourceError> {
        let (width, height) = (swap_chain.width, swap_chain.height);
        let [glow, reflection] = companion_targets(width, height);
        cache.replace_target(self.light_buffer, TargetDescriptor::SwapChain(swap_chain))?;
        cache.replace_target(self.glow_buffer, glow)?;
        cache.replace_target(self.reflection_buffer, reflection)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Frees every target of the view.
    pub(crate) fn release(self, cache: &mut ResourceCache) {
        cache.unregister_target(self.light_buffer);
        cache.unregister_target(self.glow_buffer);
        cache.unregister_target(self.reflection_buffer);
    }
}

/// Swap chain of a view following the presentation settings.
pub fn swap_chain_for(settings: &RenderSettings, buffer_count: u32) -> SwapChainDescriptor {
    SwapChainDescriptor {
        width: settings.width.max(1),
        height: settings.height.max(1),
        format: TextureFormat::Rgba8Unorm,
        buffer_count: buffer_count.max(1),
        fullscreen: settings.fullscreen,
        vsync: settings.vsync,
        msaa: settings.msaa,
    }
}

/// An identity camera for passes drawn in pixel or texel space.
pub(crate) fn screen_camera(width: u32, height: u32) -> Camera {
    Camera {
        position: Vec3::ZERO,
        view: Mat4::IDENTITY,
        fov_y: FRAC_PI_2,
        aspect: width.max(1) as f32 / height.max(1) as f32,
        near: 0.1,
        far: 1.0,
        post_fx: PostFxSettings::default(),
    }
}

fn companion_targets(width: u32, height: u32) -> [TargetDescriptor; 2] {
    [
        TargetDescriptor::Texture(TextureDescriptor::render_target(
            "glow buffer",
            width,
            height,
            TextureFormat::Rgba8Unorm,
        )),
        // Sampled at half resolution.
        TargetDescriptor::Texture(TextureDescriptor::render_target(
            "reflection buffer",
            (width / 2).max(1),
            (height / 2).max(1),
            TextureFormat::Rgba8Unorm,
        )),
    ]
}
