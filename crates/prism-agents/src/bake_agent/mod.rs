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

//! Offline bakes: light maps, occlusion maps and layer maps.
//!
//! A bake renders one mesh instance through its UV layout into a temporary
//! render target, reads the target back and post-processes the image on the
//! CPU. Bakes are synchronous and run outside the frame sequence; the public
//! entry points live on [`RenderAgent`](crate::render_agent::RenderAgent).

use crate::render_agent::pass_sequence::submit_commands;
use crate::render_agent::resource_cache::{ResourceCache, TargetDescriptor};
use crate::render_agent::view::screen_camera;
use image::RgbaImage;
use prism_core::lane::{Lane, LaneContext, LaneError};
use prism_core::math::{LinearRgba, Mat4};
use prism_core::renderer::api::{
    PassKind, RenderPassDescriptor, RenderTargetHandle, TargetView, TextureDescriptor,
    TextureFormat, TextureId,
};
use prism_core::renderer::{DebugSettings, RenderSettings, RenderStats, ResourceError};
use prism_core::scene::Scene;
use prism_lanes::bake_lane::border::{
    border_extend_passes, downsample_half, supersample_factor, MAX_BAKE_TARGET,
};
use prism_lanes::bake_lane::{
    layer_groups, BakeError, BakeLayer, LayerMapLane, LightMapLane, OcclusionLane,
};
use prism_lanes::render_lane::{
    Command, ContextFlags, GpuResolver, PassSetup, RenderContext, ShadowInputs,
};

/// What a bake borrows from the renderer.
pub(crate) struct BakeRun<'a> {
    pub(crate) cache: &'a mut ResourceCache,
    pub(crate) stats: &'a mut RenderStats,
    pub(crate) settings: &'a RenderSettings,
    pub(crate) debug: &'a DebugSettings,
    pub(crate) max_texture_size: u32,
}

/// One texel-space pass.
#[derive(Debug, Clone, Copy)]
struct BakePass {
    kind: PassKind,
    size: (u32, u32),
    clear: LinearRgba,
    shadows: ShadowInputs,
}

/// Owns the bake lanes.
#[derive(Debug, Default)]
pub struct BakeAgent {
    light_map: LightMapLane,
    occlusion: OcclusionLane,
    layer_map: LayerMapLane,
}

impl BakeAgent {
    /// Creates an agent whose lanes are not yet initialised.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.light_map.on_initialize(ctx)?;
        self.occlusion.on_initialize(ctx)?;
        self.layer_map.on_initialize(ctx)?;
        log::debug!("BakeAgent: Bake lanes initialized");
        Ok(())
    }

    pub(crate) fn shutdown(&mut self, ctx: &mut LaneContext<'_>) {
        self.light_map.on_shutdown(ctx);
        self.occlusion.on_shutdown(ctx);
        self.layer_map.on_shutdown(ctx);
    }

    /// Returns `true` once every bake lane holds its states.
    pub fn is_initialized(&self) -> bool {
        self.light_map.is_initialized()
            && self.occlusion.is_initialized()
            && self.layer_map.is_initialized()
    }

    /// Bakes the lighting of `scene.meshes[index]`.
    ///
    /// `shadows` carries the static shadow map rendered by the caller.
    pub(crate) fn light_map(
        &self,
        run: &mut BakeRun<'_>,
        scene: &Scene,
        index: usize,
        size: (u32, u32),
        shadows: ShadowInputs,
    ) -> Result<RgbaImage, BakeError> {
        check_size(run, size)?;
        let pass = BakePass {
            kind: PassKind::LightMapGeneration,
            size,
            clear: LightMapLane::CLEAR,
            shadows,
        };
        let mut image = bake_pass(run, scene, index, pass, |ctx, gpu, out| {
            self.light_map.gather(ctx, scene, gpu, out)
        })?;
        border_extend_passes(&mut image, LightMapLane::BORDER_PASSES);
        Ok(image)
    }

    /// Bakes ambient occlusion of `scene.meshes[index]`.
    ///
    /// Unless `texture_border` is set, the map is rendered supersampled and
    /// reduced with an alpha-weighted box filter.
    pub(crate) fn occlusion_map(
        &self,
        run: &mut BakeRun<'_>,
        scene: &Scene,
        index: usize,
        (width, height): (u32, u32),
        texture_border: bool,
    ) -> Result<RgbaImage, BakeError> {
        check_size(run, (width, height))?;
        let mut factor = supersample_factor(width, height, texture_border);
        while factor > 1 && width.max(height) * factor > run.max_texture_size {
            factor /= 2;
        }
        let pass = BakePass {
            kind: PassKind::OcclusionGeneration,
            size: (width * factor, height * factor),
            clear: OcclusionLane::CLEAR,
            shadows: ShadowInputs::default(),
        };
        let mut image = bake_pass(run, scene, index, pass, |ctx, gpu, out| {
            self.occlusion.gather(ctx, scene, gpu, out)
        })?;
        for _ in 0..factor.trailing_zeros() {
            image = downsample_half(&image);
        }
        border_extend_passes(&mut image, OcclusionLane::BORDER_PASSES);
        Ok(image)
    }

    /// Composites `layers` through the UV layout of `scene.meshes[index]`.
    ///
    /// Layers are composited in groups through two ping-pong targets; from
    /// the second group on, the result of the previous group is drawn first.
    /// The image is not dilated.
    pub(crate) fn layer_map(
        &self,
        run: &mut BakeRun<'_>,
        scene: &Scene,
        index: usize,
        size: (u32, u32),
        layers: &[BakeLayer],
    ) -> Result<RgbaImage, BakeError> {
        check_size(run, size)?;
        if layers.is_empty() {
            return Err(BakeError::NoLayers);
        }
        let ping = register_bake_target(run.cache, "layer map ping", size)?;
        let pong = match register_bake_target(run.cache, "layer map pong", size) {
            Ok(handle) => handle,
            Err(e) => {
                run.cache.unregister_target(ping);
                return Err(e);
            }
        };
        let result = self.composite_layers(run, scene, index, [ping, pong], size, layers);
        run.cache.unregister_target(ping);
        run.cache.unregister_target(pong);
        result
    }

    fn composite_layers(
        &self,
        run: &mut BakeRun<'_>,
        scene: &Scene,
        index: usize,
        targets: [RenderTargetHandle; 2],
        size: (u32, u32),
        layers: &[BakeLayer],
    ) -> Result<RgbaImage, BakeError> {
        let mut previous: Option<TextureId> = None;
        for (group, range) in layer_groups(layers.len()).into_iter().enumerate() {
            let texture = target_texture(run.cache, targets[group % 2])?;
            let ctx = bake_context(run.settings, run.debug, scene, index, PassKind::LayerComposite, texture, size);
            let mut commands = Vec::new();
            self.layer_map.gather_group(
                &ctx,
                scene,
                &*run.cache,
                previous,
                &layers[range],
                &mut commands,
            )?;
            let descriptor =
                RenderPassDescriptor::cleared(PassKind::LayerComposite, ctx.target, LayerMapLane::CLEAR);
            submit_commands(run.cache.device(), run.stats, &descriptor, &commands)?;
            previous = Some(texture);
        }
        let texture = previous.ok_or(BakeError::NoLayers)?;
        read_back(run.cache, texture, size)
    }
}

fn check_size(run: &BakeRun<'_>, (width, height): (u32, u32)) -> Result<(), BakeError> {
    let limit = MAX_BAKE_TARGET.min(run.max_texture_size);
    if width == 0 || height == 0 || width > limit || height > limit {
        return Err(BakeError::InvalidSize { width, height });
    }
    Ok(())
}

fn register_bake_target(
    cache: &mut ResourceCache,
    label: &str,
    (width, height): (u32, u32),
) -> Result<RenderTargetHandle, BakeError> {
    Ok(cache.register_target(TargetDescriptor::Texture(TextureDescriptor::render_target(
        label,
        width,
        height,
        TextureFormat::Rgba8Unorm,
    )))?)
}

fn target_texture(cache: &ResourceCache, handle: RenderTargetHandle) -> Result<TextureId, BakeError> {
    cache
        .target_texture(handle)
        .ok_or(BakeError::Resource(ResourceError::InvalidHandle))
}

fn bake_context(
    settings: &RenderSettings,
    debug: &DebugSettings,
    scene: &Scene,
    index: usize,
    pass: PassKind,
    texture: TextureId,
    (width, height): (u32, u32),
) -> RenderContext {
    RenderContext::for_bake(
        PassSetup {
            pass,
            flags: ContextFlags::NONE,
            camera: screen_camera(width, height),
            view_proj: Some(Mat4::IDENTITY),
            target: TargetView::whole(texture),
            target_size: (width, height),
            settings,
            debug,
        },
        scene,
        index,
    )
}

/// Renders one bake pass into a temporary target and reads it back.
fn bake_pass(
    run: &mut BakeRun<'_>,
    scene: &Scene,
    index: usize,
    pass: BakePass,
    gather: impl FnOnce(&RenderContext, &dyn GpuResolver, &mut Vec<Command>) -> Result<(), BakeError>,
) -> Result<RgbaImage, BakeError> {
    let handle = register_bake_target(run.cache, &format!("{} target", pass.kind), pass.size)?;
    let result = render_and_read(run, scene, index, handle, pass, gather);
    run.cache.unregister_target(handle);
    result
}

fn render_and_read(
    run: &mut BakeRun<'_>,
    scene: &Scene,
    index: usize,
    handle: RenderTargetHandle,
    pass: BakePass,
    gather: impl FnOnce(&RenderContext, &dyn GpuResolver, &mut Vec<Command>) -> Result<(), BakeError>,
) -> Result<RgbaImage, BakeError> {
    let texture = target_texture(run.cache, handle)?;
    let mut ctx = bake_context(run.settings, run.debug, scene, index, pass.kind, texture, pass.size);
    ctx.shadows = pass.shadows;
    if pass.shadows.static_map.is_some() {
        ctx.flags.insert(ContextFlags::STATIC_SHADOW_ON);
    }

    let mut commands = Vec::new();
    gather(&ctx, &*run.cache, &mut commands)?;
    log::trace!(
        "BakeAgent: {} pass of {}x{} with {} commands",
        pass.kind,
        pass.size.0,
        pass.size.1,
        commands.len()
    );
    let descriptor = RenderPassDescriptor::cleared(pass.kind, ctx.target, pass.clear);
    submit_commands(run.cache.device(), run.stats, &descriptor, &commands)?;
    read_back(run.cache, texture, pass.size)
}

fn read_back(
    cache: &ResourceCache,
    texture: TextureId,
    (width, height): (u32, u32),
) -> Result<RgbaImage, BakeError> {
    let readback = cache.device().read_back(TargetView::whole(texture))?;
    let expected = width as usize * height as usize * 4;
    let actual = readback.rgba8.len();
    if readback.width != width || readback.height != height || actual != expected {
        return Err(BakeError::ReadbackSize { expected, actual });
    }
    RgbaImage::from_raw(width, height, readback.rgba8)
        .ok_or(BakeError::ReadbackSize { expected, actual })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::math::{Aabb, Vec3};
    use prism_core::renderer::api::{DeviceCaps, MeshData};
    use prism_core::renderer::settings::TextureLevel;
    use prism_core::scene::{Material, MeshInstance};
    use prism_infra::HeadlessDevice;
    use std::sync::Arc;

    #[test]
    fn test_bake_sizes_are_validated() {
        let device = HeadlessDevice::new(DeviceCaps::shader_model_2());
        let mut cache = ResourceCache::new(Arc::new(device), TextureLevel::High).unwrap();
        let mut stats = RenderStats::default();
        let settings = RenderSettings::default();
        let debug = DebugSettings::default();
        let run = BakeRun {
            cache: &mut cache,
            stats: &mut stats,
            settings: &settings,
            debug: &debug,
            max_texture_size: 1024,
        };
        assert!(check_size(&run, (64, 64)).is_ok());
        assert!(matches!(
            check_size(&run, (0, 64)),
            Err(BakeError::InvalidSize { width: 0, .. })
        ));
        assert!(check_size(&run, (2048, 16)).is_err());
        cache.shutdown();
    }

    #[test]
    fn test_uninitialized_lanes_refuse_to_bake() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut cache = ResourceCache::new(Arc::new(device.clone()), TextureLevel::High).unwrap();
        let mesh = cache.upload_mesh(&MeshData::unit_quad()).unwrap();
        let mut scene = Scene::new();
        scene.add_mesh(MeshInstance::new(
            mesh,
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE),
            Mat4::IDENTITY,
            Material::default(),
        ));
        let mut stats = RenderStats::default();
        let settings = RenderSettings::default();
        let debug = DebugSettings::default();
        let targets = cache.target_count();
        let mut run = BakeRun {
            cache: &mut cache,
            stats: &mut stats,
            settings: &settings,
            debug: &debug,
            max_texture_size: 8192,
        };

        let agent = BakeAgent::new();
        let err = agent
            .light_map(&mut run, &scene, 0, (32, 32), ShadowInputs::default())
            .unwrap_err();
        assert!(matches!(err, BakeError::NotInitialized));
        assert_eq!(cache.target_count(), targets);
        assert_eq!(device.live_render_targets(), 0);
        cache.shutdown();
    }
}
