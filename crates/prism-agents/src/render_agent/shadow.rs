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

//! Shadow map targets and the shadow pre-passes.

use super::agent::RenderAgent;
use super::resource_cache::{ResourceCache, TargetDescriptor};
use prism_core::math::{Aabb, LinearRgba, Mat4, Vec3};
use prism_core::renderer::api::{
    PassKind, RenderPassDescriptor, RenderTargetHandle, TargetView, TextureDescriptor,
    TextureFormat, TextureId,
};
use prism_core::renderer::ResourceError;
use prism_core::scene::{Camera, Scene};
use prism_lanes::render_lane::shadow::{
    dynamic_shadow_size, split_view_proj, static_view_proj, SHADOW_SPLITS,
    STATIC_SHADOW_MAP_SIZE,
};
use prism_lanes::render_lane::{ContextFlags, PassSetup, RenderContext, ShadowInputs};

/// A registered shadow target and its edge in texels.
type SizedTarget = (RenderTargetHandle, u32);

/// The shadow maps of the renderer, registered on first use.
///
/// Targets live in the render-target registry, so their handles survive
/// device loss.
#[derive(Debug, Default)]
pub(crate) struct ShadowTargets {
    static_map: Option<SizedTarget>,
    splits: [Option<SizedTarget>; SHADOW_SPLITS],
}

impl ShadowTargets {
    fn ensure(
        cache: &mut ResourceCache,
        slot: &mut Option<SizedTarget>,
        label: &str,
        size: u32,
    ) -> Result<RenderTargetHandle, ResourceError> {
        let descriptor = TargetDescriptor::Texture(TextureDescriptor::render_target(
            label,
            size,
            size,
            TextureFormat::Rgba8Unorm,
        ));
        match *slot {
            Some((handle, current)) if current == size => Ok(handle),
            Some((handle, _)) => {
                log::debug!("ShadowTargets: Resizing '{label}' to {size}");
                cache.replace_target(handle, descriptor)?;
                *slot = Some((handle, size));
                Ok(handle)
            }
            None => {
                let handle = cache.register_target(descriptor)?;
                *slot = Some((handle, size));
                Ok(handle)
            }
        }
    }

    /// The static sun map, clamped to the device texture limit.
    pub(crate) fn static_target(
        &mut self,
        cache: &mut ResourceCache,
        max_texture_size: u32,
    ) -> Result<SizedTarget, ResourceError> {
        let size = STATIC_SHADOW_MAP_SIZE.min(max_texture_size);
        let handle = Self::ensure(cache, &mut self.static_map, "static shadow map", size)?;
        Ok((handle, size))
    }

    /// The map of dynamic split `split`.
    pub(crate) fn split_target(
        &mut self,
        cache: &mut ResourceCache,
        split: usize,
        size: u32,
    ) -> Result<RenderTargetHandle, ResourceError> {
        let label = format!("dynamic shadow split {split}");
        Self::ensure(cache, &mut self.splits[split], &label, size)
    }

    /// Unregisters every shadow target.
    pub(crate) fn release(&mut self, cache: &mut ResourceCache) {
        for (handle, _) in self.static_map.take().into_iter().chain(
            self.splits.iter_mut().filter_map(Option::take),
        ) {
            cache.unregister_target(handle);
        }
    }
}

/// World bounds of every static shadow caster.
fn caster_bounds(scene: &Scene) -> Aabb {
    let corners: Vec<Vec3> = scene
        .meshes
        .iter()
        .filter(|m| m.flags.static_shadow_caster)
        .flat_map(|m| {
            let b = m.bounds();
            [b.min, b.max]
        })
        .collect();
    if corners.is_empty() {
        Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE)
    } else {
        Aabb::from_points(corners)
    }
}

impl RenderAgent {
    /// Renders the camera-independent sun shadow map.
    pub(super) fn render_static_shadow(
        &mut self,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(TextureId, Mat4), ResourceError> {
        let max_texture_size = self.manager.caps().max_texture_size;
        let (handle, size) = self
            .shadows
            .static_target(self.manager.cache_mut(), max_texture_size)?;
        let texture = self
            .manager
            .cache()
            .target_texture(handle)
            .ok_or(ResourceError::InvalidHandle)?;
        let view_proj = static_view_proj(&scene.main_light, &caster_bounds(scene));

        let settings = self.manager.settings().clone();
        let ctx = RenderContext::build(
            PassSetup {
                pass: PassKind::StaticShadow,
                flags: ContextFlags::NONE,
                camera: *camera,
                view_proj: Some(view_proj),
                target: TargetView::whole(texture),
                target_size: (size, size),
                settings: &settings,
                debug: &self.debug,
            },
            scene,
        );
        let descriptor = RenderPassDescriptor::cleared(
            PassKind::StaticShadow,
            ctx.target,
            LinearRgba::WHITE,
        );
        self.run_pass(&ctx, scene, &descriptor)?;
        Ok((texture, view_proj))
    }

    /// Renders both dynamic splits into `inputs`.
    ///
    /// Does nothing when the shadow tier disables dynamic shadows.
    pub(super) fn render_dynamic_shadows(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        inputs: &mut ShadowInputs,
    ) -> Result<bool, ResourceError> {
        let settings = self.manager.settings().clone();
        let Some(size) = dynamic_shadow_size(settings.shadow) else {
            return Ok(false);
        };
        for split in 0..SHADOW_SPLITS {
            let handle = self
                .shadows
                .split_target(self.manager.cache_mut(), split, size)?;
            let texture = self
                .manager
                .cache()
                .target_texture(handle)
                .ok_or(ResourceError::InvalidHandle)?;
            let view_proj = split_view_proj(camera, &scene.main_light, split);
            let pass = PassKind::DynamicShadow { split: split as u8 };
            let ctx = RenderContext::build(
                PassSetup {
                    pass,
                    flags: ContextFlags::NONE,
                    camera: *camera,
                    view_proj: Some(view_proj),
                    target: TargetView::whole(texture),
                    target_size: (size, size),
                    settings: &settings,
                    debug: &self.debug,
                },
                scene,
            );
            let descriptor = RenderPassDescriptor::cleared(pass, ctx.target, LinearRgba::WHITE);
            self.run_pass(&ctx, scene, &descriptor)?;
            inputs.splits[split] = Some(texture);
            inputs.split_view_proj[split] = view_proj;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::DeviceCaps;
    use prism_core::renderer::settings::TextureLevel;
    use prism_infra::HeadlessDevice;
    use std::sync::Arc;

    #[test]
    fn test_static_map_is_clamped_and_reused() {
        let device = HeadlessDevice::new(DeviceCaps::shader_model_2());
        let mut cache = ResourceCache::new(Arc::new(device.clone()), TextureLevel::High).unwrap();
        let mut targets = ShadowTargets::default();

        let (first, size) = targets.static_target(&mut cache, 2048).unwrap();
        assert_eq!(size, 2048);
        let (second, _) = targets.static_target(&mut cache, 2048).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.target_count(), 1);

        targets.release(&mut cache);
        assert_eq!(cache.target_count(), 0);
        cache.shutdown();
    }

    #[test]
    fn test_split_resize_keeps_the_handle() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut cache = ResourceCache::new(Arc::new(device.clone()), TextureLevel::High).unwrap();
        let mut targets = ShadowTargets::default();

        let small = targets.split_target(&mut cache, 1, 512).unwrap();
        let old = cache.target_texture(small).unwrap();
        let large = targets.split_target(&mut cache, 1, 1024).unwrap();
        assert_eq!(small, large);
        assert_ne!(cache.target_texture(large), Some(old));
        assert_eq!(cache.target_descriptor(large).map(|d| d.size()), Some((1024, 1024)));

        targets.release(&mut cache);
        cache.shutdown();
    }
}
