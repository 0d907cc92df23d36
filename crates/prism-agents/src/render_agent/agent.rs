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

//! Defines the RenderAgent, the central orchestrator of the renderer.

use super::device_manager::DeviceLifecycleManager;
use super::pass_sequence::PassRunner;
use super::resource_cache::ResourceCache;
use super::shadow::ShadowTargets;
use super::view::{screen_camera, swap_chain_for, RenderView};
use crate::bake_agent::{BakeAgent, BakeRun};
use crate::config::RendererConfig;
use ahash::AHashSet;
use image::RgbaImage;
use prism_core::lane::{Lane, LaneError};
use prism_core::math::LinearRgba;
use prism_core::renderer::api::{
    DeviceCaps, DeviceState, MeshData, MeshHandle, PassKind, PictureBankData, PictureBankHandle,
    ProbeHandle, RenderPassDescriptor, RenderTargetHandle, SkinMeshData, SkinMeshHandle,
    TargetView, TextureData, TextureHandle, TextureId, ViewHandle,
};
use prism_core::renderer::settings::{ReflectionLevel, RenderMode};
use prism_core::renderer::{
    DebugSettings, GraphicsDevice, MaxRenderSettings, RenderError, RenderSettings, RenderStats,
    ResourceError,
};
use prism_core::scene::{Camera, Hud, InstanceId, Scene};
use prism_lanes::bake_lane::{BakeError, BakeLayer};
use prism_lanes::render_lane::{
    update_scene_lighting, CommandList, ContextFlags, Executor, PassSetup, RenderContext,
    ShadowInputs,
};
use prism_telemetry::{FrameTimer, FrameTimings};
use std::sync::Arc;

/// Where a scene render lands.
#[derive(Debug, Clone, Copy)]
pub(super) struct SceneTarget {
    pub(super) pass: PassKind,
    pub(super) view: TargetView,
    pub(super) size: (u32, u32),
    // Load instead of clear when `false`.
    pub(super) clear: bool,
    // Target of the planar water reflection; sub-renders have none.
    pub(super) water_buffer: Option<RenderTargetHandle>,
}

/// The agent responsible for the whole frame: pass order, device lifecycle,
/// reflection probes and bakes.
///
/// All methods take `&mut self`; share the agent between threads through
/// [`SharedRenderer`](crate::SharedRenderer).
#[derive(Debug)]
pub struct RenderAgent {
    // Device, settings and resource cache.
    pub(super) manager: DeviceLifecycleManager,
    // The executors, in registration order.
    pub(super) executors: Vec<Executor>,
    // Light, occlusion and layer map generators.
    pub(super) bake: BakeAgent,
    // Render views; slot 0 is the default view.
    pub(super) views: Vec<Option<RenderView>>,
    // Static and dynamic shadow maps.
    pub(super) shadows: ShadowTargets,
    // Probes refreshed since the last device reset.
    pub(super) fresh_probes: AHashSet<ProbeHandle>,
    // Debug settings forwarded to every pass.
    pub(super) debug: DebugSettings,
    // Counters of the current frame.
    pub(super) stats: RenderStats,
    // Edge in texels of a reflection cube face.
    pub(super) reflection_cube_size: u32,
    // Frames rendered since creation.
    frame: u64,
    // CPU time spent in `render_scenes`.
    timer: FrameTimer,
    // Reused by every pass.
    commands: CommandList,
    // Cleared by `shutdown`.
    initialized: bool,
}

impl RenderAgent {
    /// Creates the renderer on `device`.
    ///
    /// The requested settings are clamped to the device, the default view is
    /// registered and every executor is initialised.
    ///
    /// # Errors
    ///
    /// Fails when the device is unusable or an executor cannot acquire its
    /// state objects.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: &RendererConfig) -> Result<Self, RenderError> {
        let mut manager = DeviceLifecycleManager::new(device, config.settings.clone())?;
        let max_texture_size = manager.caps().max_texture_size;
        let reflection_cube_size = config.reflection_cube_size.clamp(1, max_texture_size);
        let swap_chain = manager.swap_chain_descriptor().clone();
        let default_view = RenderView::create(manager.cache_mut(), swap_chain)?;

        let mut agent = Self {
            manager,
            executors: Executor::registration_order(),
            bake: BakeAgent::new(),
            views: vec![Some(default_view)],
            shadows: ShadowTargets::default(),
            fresh_probes: AHashSet::new(),
            debug: config.debug,
            stats: RenderStats::default(),
            reflection_cube_size,
            frame: 0,
            timer: FrameTimer::default(),
            commands: CommandList::new(),
            initialized: true,
        };
        agent.initialize_lanes()?;
        log::info!(
            "RenderAgent: Initialized on '{}' with {} executors",
            agent.manager.caps().adapter_name,
            agent.executors.len()
        );
        Ok(agent)
    }

    /// Creates the renderer with default debug settings.
    pub fn with_settings(
        device: Arc<dyn GraphicsDevice>,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        Self::new(
            device,
            &RendererConfig {
                settings,
                ..RendererConfig::default()
            },
        )
    }

    // --- Lanes ---

    fn initialize_lanes(&mut self) -> Result<(), LaneError> {
        let Self {
            manager,
            executors,
            bake,
            debug,
            ..
        } = self;
        manager.with_lane_context(debug, |ctx| {
            for executor in executors.iter_mut() {
                executor.on_initialize(ctx)?;
                log::debug!("RenderAgent: Initialized executor '{}'", executor.strategy_name());
            }
            bake.initialize(ctx)
        })
    }

    fn shutdown_lanes(&mut self) {
        let Self {
            manager,
            executors,
            bake,
            debug,
            ..
        } = self;
        manager.with_lane_context(debug, |ctx| {
            for executor in executors.iter_mut().filter(|e| e.is_initialized()) {
                executor.on_shutdown(ctx);
            }
            if bake.is_initialized() {
                bake.shutdown(ctx);
            }
        });
    }

    // --- Passes ---

    /// Runs one pass through every accepting executor.
    pub(super) fn run_pass(
        &mut self,
        ctx: &RenderContext,
        scene: &Scene,
        descriptor: &RenderPassDescriptor,
    ) -> Result<(), ResourceError> {
        PassRunner {
            cache: self.manager.cache(),
            executors: &self.executors,
            stats: &mut self.stats,
            commands: &mut self.commands,
        }
        .run(ctx, scene, descriptor)
    }

    fn pass_context(
        &self,
        pass: PassKind,
        flags: ContextFlags,
        camera: &Camera,
        target: TargetView,
        size: (u32, u32),
        scene: &Scene,
    ) -> RenderContext {
        RenderContext::build(
            PassSetup {
                pass,
                flags,
                camera: *camera,
                view_proj: None,
                target,
                target_size: size,
                settings: self.manager.settings(),
                debug: &self.debug,
            },
            scene,
        )
    }

    /// Renders `scene` seen from `camera` into `target`.
    ///
    /// A top-level render runs the shadow pre-passes, refreshes stale probes
    /// and renders the water reflection first. Renders nested in a probe or
    /// water reflection skip all of that, which bounds the recursion.
    pub(super) fn render_scene_into(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        target: &SceneTarget,
        flags: ContextFlags,
    ) -> Result<ShadowInputs, RenderError> {
        let nested = flags.contains(ContextFlags::IN_REFLECTION_UPDATE)
            || flags.contains(ContextFlags::IN_WATER_REFLECTION);
        let mut ctx = self.pass_context(target.pass, flags, camera, target.view, target.size, scene);
        let mut shadows = ShadowInputs::default();

        if !nested {
            let reflection = self.manager.settings().reflection;
            // 1. Static shadow, rendered per frame only in the preview mode.
            if self.debug.render_mode == RenderMode::HqPreview {
                let (map, view_proj) = self.render_static_shadow(scene, camera)?;
                shadows.static_map = Some(map);
                shadows.static_view_proj = view_proj;
                ctx.flags.insert(ContextFlags::STATIC_SHADOW_ON);
            }
            // 2. Dynamic splits.
            if ctx.needs_dynamic_shadow(scene)
                && self.render_dynamic_shadows(scene, camera, &mut shadows)?
            {
                ctx.flags.insert(ContextFlags::DYNAMIC_SHADOW_ON);
            }
            // 3. Reflections.
            if reflection != ReflectionLevel::None {
                let visible = ctx.visible.meshes.clone();
                self.refresh_probes(scene, &visible, camera)?;
                let water = ctx.reflective_water(scene).map(|w| w.level);
                if let (Some(level), Some(buffer)) = (water, target.water_buffer) {
                    ctx.water_reflection =
                        Some(self.render_water_reflection(scene, camera, buffer, level)?);
                }
            }
        }

        // 4. Lighting.
        ctx.shadows = shadows;
        let descriptor = if target.clear {
            RenderPassDescriptor::cleared(target.pass, target.view, ctx.clear_color)
        } else {
            RenderPassDescriptor::load(target.pass, target.view)
        };
        self.run_pass(&ctx, scene, &descriptor)?;
        Ok(shadows)
    }

    // --- Frame ---

    /// Renders `scene` into `view`.
    pub fn render_scene(
        &mut self,
        view: ViewHandle,
        scene: &mut Scene,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        self.render_scenes(view, std::slice::from_mut(scene), camera)
    }

    /// Renders `scenes` into `view`, in order, over one another.
    ///
    /// The first scene clears the light buffer to its fog color; glow,
    /// post-fx and the debug overlay run once, after the last scene. While
    /// the device is lost or not reset the frame is skipped and `Ok` is
    /// returned.
    ///
    /// # Errors
    ///
    /// * `NotInitialized` - After [`shutdown`](Self::shutdown).
    /// * `DeviceError` - If the device reports a driver failure.
    /// * `ResourceError` - If `view` is unknown or a resource cannot be created.
    pub fn render_scenes(
        &mut self,
        view: ViewHandle,
        scenes: &mut [Scene],
        camera: &Camera,
    ) -> Result<(), RenderError> {
        self.check_frame_allowed()?;
        if !self.manager.is_ready() {
            log::debug!(
                "RenderAgent: Skipping frame, device is {}",
                self.manager.device_state()
            );
            return Ok(());
        }
        let view = self.view(view).ok_or(ResourceError::InvalidHandle)?;

        self.frame += 1;
        self.stats.begin_frame(self.frame);
        self.timer.begin();
        let result = self.render_frame(view, scenes, camera);
        for scene in scenes.iter_mut() {
            scene.reflections_updated();
        }
        self.stats.frame_time = self.timer.end();
        self.stats.vram_bytes = self.manager.device().vram_usage();
        if let Err(e) = &result {
            log::error!("RenderAgent: Frame {} failed: {e}", self.frame);
        } else {
            log::trace!("RenderAgent: {}", self.stats);
        }
        result
    }

    fn check_frame_allowed(&self) -> Result<(), RenderError> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }
        if self.manager.device_state() == DeviceState::Error {
            return Err(RenderError::DeviceError(
                "the device reported a driver failure".to_string(),
            ));
        }
        Ok(())
    }

    fn render_frame(
        &mut self,
        view: RenderView,
        scenes: &mut [Scene],
        camera: &Camera,
    ) -> Result<(), RenderError> {
        let Some(last) = scenes.len().checked_sub(1) else {
            log::warn!("RenderAgent: render_scenes called without scenes");
            return Ok(());
        };
        let light = self.target_texture(view.light_buffer)?;
        let size = (view.width, view.height);

        let mut shadows = ShadowInputs::default();
        for (i, scene) in scenes.iter_mut().enumerate() {
            update_scene_lighting(scene);
            let target = SceneTarget {
                pass: PassKind::Lighting,
                view: TargetView::whole(light),
                size,
                clear: i == 0,
                water_buffer: Some(view.reflection_buffer),
            };
            shadows = self.render_scene_into(scene, camera, &target, ContextFlags::NONE)?;
        }
        self.render_composite(view, light, &scenes[last], camera, &shadows)
    }

    /// Glow, post-fx and debug passes over the lit frame.
    fn render_composite(
        &mut self,
        view: RenderView,
        light: TextureId,
        scene: &Scene,
        camera: &Camera,
        shadows: &ShadowInputs,
    ) -> Result<(), RenderError> {
        let size = (view.width, view.height);
        let (glow_on, post_fx_on) = {
            let settings = self.manager.settings();
            (settings.glow, settings.post_fx)
        };
        let mut flags = ContextFlags::NONE;

        // 5. Glow.
        let mut glow_texture = None;
        if glow_on {
            let glow = self.target_texture(view.glow_buffer)?;
            let ctx = self.pass_context(
                PassKind::Glow,
                flags,
                camera,
                TargetView::whole(glow),
                size,
                scene,
            );
            let descriptor = RenderPassDescriptor::cleared(PassKind::Glow, ctx.target, LinearRgba::BLACK);
            self.run_pass(&ctx, scene, &descriptor)?;
            glow_texture = Some(glow);
            flags.insert(ContextFlags::GLOW_ON);
        }

        // 6. Post-fx, also the only way glow reaches the light buffer.
        if post_fx_on || glow_texture.is_some() {
            let mut ctx = self.pass_context(
                PassKind::PostFx,
                flags,
                camera,
                TargetView::whole(light),
                size,
                scene,
            );
            ctx.glow_texture = glow_texture;
            let descriptor = RenderPassDescriptor::load(PassKind::PostFx, ctx.target);
            self.run_pass(&ctx, scene, &descriptor)?;
        }

        // 7. Debug overlay.
        if self.debug.render_mode == RenderMode::DebugShadowMap {
            if shadows.static_map.is_some() {
                flags.insert(ContextFlags::STATIC_SHADOW_ON);
            }
            if shadows.splits.iter().any(Option::is_some) {
                flags.insert(ContextFlags::DYNAMIC_SHADOW_ON);
            }
            let mut ctx = self.pass_context(
                PassKind::Debug,
                flags,
                camera,
                TargetView::whole(light),
                size,
                scene,
            );
            ctx.shadows = *shadows;
            let descriptor = RenderPassDescriptor::load(PassKind::Debug, ctx.target);
            self.run_pass(&ctx, scene, &descriptor)?;
        }
        Ok(())
    }

    /// Draws `hud` over `view` in pixel space.
    pub fn render_hud(&mut self, view: ViewHandle, hud: &Hud) -> Result<(), RenderError> {
        self.check_frame_allowed()?;
        if !self.manager.is_ready() {
            return Ok(());
        }
        let view = self.view(view).ok_or(ResourceError::InvalidHandle)?;
        let light = self.target_texture(view.light_buffer)?;
        let size = (view.width, view.height);
        let scene = Scene::new();
        let mut ctx = self.pass_context(
            PassKind::Hud,
            ContextFlags::NONE,
            &screen_camera(size.0, size.1),
            TargetView::whole(light),
            size,
            &scene,
        );
        ctx.hud = hud.items.clone();
        let descriptor = RenderPassDescriptor::load(PassKind::Hud, ctx.target);
        self.run_pass(&ctx, &scene, &descriptor)?;
        Ok(())
    }

    /// Presents the light buffer of `view`.
    ///
    /// Skipped while the device is not ready.
    pub fn present(&mut self, view: ViewHandle) -> Result<(), RenderError> {
        self.check_frame_allowed()?;
        if !self.manager.is_ready() {
            return Ok(());
        }
        let view = self.view(view).ok_or(ResourceError::InvalidHandle)?;
        let swap_chain = self
            .manager
            .cache()
            .swap_chain(view.light_buffer)
            .ok_or(ResourceError::InvalidHandle)?;
        self.manager.device().present(swap_chain)?;
        Ok(())
    }

    fn target_texture(&self, target: RenderTargetHandle) -> Result<TextureId, ResourceError> {
        self.manager
            .cache()
            .target_texture(target)
            .ok_or(ResourceError::InvalidHandle)
    }

    // --- Device lifecycle ---

    /// Polls the device.
    pub fn device_state(&self) -> DeviceState {
        self.manager.device_state()
    }

    /// Frees every render-target-bound object. Calling it twice is a no-op.
    ///
    /// Registered targets, views, probes and uploaded resources keep their
    /// handles and come back with [`on_device_reset`](Self::on_device_reset).
    pub fn on_device_lost(&mut self) {
        if !self.manager.cache().is_alive() {
            log::debug!("RenderAgent: Device objects already released");
            return;
        }
        log::info!("RenderAgent: Device lost, releasing device objects");
        self.shutdown_lanes();
        self.manager.release_device_objects();
    }

    /// Resets the device and rebuilds what [`on_device_lost`](Self::on_device_lost)
    /// freed. Every probe is refreshed on the next frame.
    ///
    /// # Errors
    ///
    /// Fails while the device still refuses the reset; retry later.
    pub fn on_device_reset(&mut self) -> Result<(), RenderError> {
        if self.manager.cache().is_alive() {
            log::debug!("RenderAgent: Device objects already alive");
            return Ok(());
        }
        self.manager.restore_device_objects()?;
        if let Err(e) = self.initialize_lanes() {
            log::warn!("RenderAgent: Executors failed after reset, releasing again: {e}");
            self.shutdown_lanes();
            self.manager.release_device_objects();
            return Err(e.into());
        }
        self.fresh_probes.clear();
        log::info!("RenderAgent: Device reset complete");
        Ok(())
    }

    // --- Settings ---

    /// The effective settings.
    pub fn render_settings(&self) -> &RenderSettings {
        self.manager.settings()
    }

    /// The settings as last requested.
    pub fn requested_render_settings(&self) -> &RenderSettings {
        self.manager.requested_settings()
    }

    /// Ceilings of every setting on this device.
    pub fn max_render_settings(&self) -> &MaxRenderSettings {
        self.manager.max_settings()
    }

    /// Capabilities of the device.
    pub fn caps(&self) -> &DeviceCaps {
        self.manager.caps()
    }

    /// Applies `requested`, clamped to the device.
    ///
    /// When the effective settings change the renderer goes through a full
    /// lost/reset cycle and the default view follows the new resolution.
    pub fn set_render_settings(&mut self, requested: RenderSettings) -> Result<(), RenderError> {
        self.check_frame_allowed()?;
        let effective = self.manager.negotiate(&requested);
        if effective == *self.manager.settings() {
            log::debug!("RenderAgent: Effective settings unchanged");
            self.manager.apply_settings(requested)?;
            return Ok(());
        }
        log::info!("RenderAgent: Applying settings {effective:?}");

        self.on_device_lost();
        self.manager.apply_settings(requested)?;
        let swap_chain = self.manager.swap_chain_descriptor().clone();
        if let Some(Some(view)) = self.views.first_mut() {
            view.resize(self.manager.cache_mut(), swap_chain)?;
        }
        self.on_device_reset()
    }

    /// The debug settings.
    pub fn debug_settings(&self) -> DebugSettings {
        self.debug
    }

    /// Replaces the debug settings.
    ///
    /// A new polygon mode rebuilds the executor state objects.
    pub fn set_debug_settings(&mut self, debug: DebugSettings) -> Result<(), RenderError> {
        let rebuild = debug.polygon_mode != self.debug.polygon_mode && self.manager.cache().is_alive();
        if rebuild {
            self.shutdown_lanes();
        }
        self.debug = debug;
        if rebuild {
            self.initialize_lanes()?;
        }
        Ok(())
    }

    // --- Statistics ---

    /// Counters of the last frame.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Counters of the last frame as text.
    pub fn render_stats(&self) -> String {
        self.stats.to_string()
    }

    /// Average CPU frame time over recent frames.
    pub fn frame_timings(&self) -> FrameTimings {
        self.timer.timings()
    }

    /// Video memory in use, in bytes.
    pub fn vram_usage(&self) -> u64 {
        self.manager.device().vram_usage()
    }

    /// The resource cache.
    pub fn resource_cache(&self) -> &ResourceCache {
        self.manager.cache()
    }

    // --- Views ---

    /// The view created with the renderer.
    pub fn default_view(&self) -> ViewHandle {
        ViewHandle(0)
    }

    /// The view behind `handle`.
    pub fn view(&self, handle: ViewHandle) -> Option<RenderView> {
        self.views.get(handle.index()).copied().flatten()
    }

    /// Creates an additional view of `width` x `height` pixels.
    pub fn create_view(
        &mut self,
        width: u32,
        height: u32,
        buffer_count: u32,
    ) -> Result<ViewHandle, RenderError> {
        self.check_frame_allowed()?;
        let mut swap_chain = swap_chain_for(self.manager.settings(), buffer_count);
        swap_chain.width = width.max(1);
        swap_chain.height = height.max(1);
        swap_chain.fullscreen = false;
        let view = RenderView::create(self.manager.cache_mut(), swap_chain)?;
        let handle = ViewHandle(self.views.len() as u32);
        self.views.push(Some(view));
        log::debug!("RenderAgent: Created view {handle:?} ({width}x{height})");
        Ok(handle)
    }

    /// Frees a view created with [`create_view`](Self::create_view).
    ///
    /// The default view lives as long as the renderer.
    pub fn release_view(&mut self, handle: ViewHandle) {
        if handle == self.default_view() {
            log::warn!("RenderAgent: The default view cannot be released");
            return;
        }
        if let Some(view) = self.views.get_mut(handle.index()).and_then(Option::take) {
            view.release(self.manager.cache_mut());
        }
    }

    // --- Reflection probes ---

    /// Frees the cube map of a reflection probe.
    ///
    /// Instances still pointing at `probe` get a new one the next time they
    /// are rendered.
    pub fn release_probe(&mut self, probe: ProbeHandle) {
        self.fresh_probes.remove(&probe);
        self.manager.cache_mut().release_probe(probe);
    }

    /// Frees the probes of every mesh of `scene`, before the scene is dropped.
    pub fn release_scene_probes(&mut self, scene: &mut Scene) {
        for instance in &mut scene.meshes {
            if let Some(probe) = instance.gpu.probe.take() {
                self.release_probe(probe);
            }
        }
    }

    // --- Uploads ---

    /// Uploads a static mesh.
    pub fn upload_mesh(&mut self, data: &MeshData) -> Result<MeshHandle, ResourceError> {
        self.manager.cache_mut().upload_mesh(data)
    }

    /// Uploads a skinned mesh.
    pub fn upload_skin_mesh(&mut self, data: &SkinMeshData) -> Result<SkinMeshHandle, ResourceError> {
        self.manager.cache_mut().upload_skin_mesh(data)
    }

    /// Uploads a texture at the current texture tier.
    pub fn upload_texture(&mut self, data: TextureData) -> Result<TextureHandle, ResourceError> {
        self.manager.cache_mut().upload_texture(data)
    }

    /// Uploads a picture bank.
    pub fn upload_picture_bank(
        &mut self,
        data: PictureBankData,
    ) -> Result<PictureBankHandle, ResourceError> {
        self.manager.cache_mut().upload_picture_bank(data)
    }

    // --- Bakes ---

    fn bake_target(&self, scene: &Scene, instance: InstanceId) -> Result<usize, BakeError> {
        if !self.initialized || !self.bake.is_initialized() {
            return Err(BakeError::NotInitialized);
        }
        if !self.manager.is_ready() {
            return Err(ResourceError::DeviceNotReady(self.manager.device_state()).into());
        }
        scene
            .mesh_index(instance)
            .ok_or(BakeError::UnknownInstance(instance.0))
    }

    /// Bakes the sun and point lighting of `instance` into a `size` image.
    pub fn generate_light_map(
        &mut self,
        size: (u32, u32),
        scene: &mut Scene,
        instance: InstanceId,
    ) -> Result<RgbaImage, BakeError> {
        let index = self.bake_target(scene, instance)?;
        update_scene_lighting(scene);
        let (map, view_proj) = self.render_static_shadow(scene, &screen_camera(size.0, size.1))?;
        let shadows = ShadowInputs {
            static_map: Some(map),
            static_view_proj: view_proj,
            ..ShadowInputs::default()
        };

        let settings = self.manager.settings().clone();
        let max_texture_size = self.manager.caps().max_texture_size;
        let mut run = BakeRun {
            cache: self.manager.cache_mut(),
            stats: &mut self.stats,
            settings: &settings,
            debug: &self.debug,
            max_texture_size,
        };
        self.bake.light_map(&mut run, scene, index, size, shadows)
    }

    /// Bakes ambient occlusion of `instance` into a `size` image.
    pub fn generate_occlusion_map(
        &mut self,
        size: (u32, u32),
        scene: &Scene,
        instance: InstanceId,
        texture_border: bool,
    ) -> Result<RgbaImage, BakeError> {
        let index = self.bake_target(scene, instance)?;
        let settings = self.manager.settings().clone();
        let max_texture_size = self.manager.caps().max_texture_size;
        let mut run = BakeRun {
            cache: self.manager.cache_mut(),
            stats: &mut self.stats,
            settings: &settings,
            debug: &self.debug,
            max_texture_size,
        };
        self.bake
            .occlusion_map(&mut run, scene, index, size, texture_border)
    }

    /// Composites `layers` through the UV layout of `instance`.
    pub fn generate_layer_map(
        &mut self,
        size: (u32, u32),
        scene: &Scene,
        instance: InstanceId,
        layers: &[BakeLayer],
    ) -> Result<RgbaImage, BakeError> {
        let index = self.bake_target(scene, instance)?;
        let settings = self.manager.settings().clone();
        let max_texture_size = self.manager.caps().max_texture_size;
        let mut run = BakeRun {
            cache: self.manager.cache_mut(),
            stats: &mut self.stats,
            settings: &settings,
            debug: &self.debug,
            max_texture_size,
        };
        self.bake.layer_map(&mut run, scene, index, size, layers)
    }

    // --- Shutdown ---

    /// Frees every object of the renderer.
    ///
    /// # Panics
    ///
    /// Panics if a state object is still referenced afterwards, which means a
    /// lane leaked it.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        log::info!("RenderAgent: Shutting down after {} frames", self.frame);
        self.shutdown_lanes();
        let cache = self.manager.cache_mut();
        for view in self.views.drain(..).flatten() {
            view.release(cache);
        }
        self.shadows.release(cache);
        cache.release_probes();
        self.fresh_probes.clear();
        cache.shutdown();
        self.initialized = false;
    }

    /// Returns `true` until [`shutdown`](Self::shutdown).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_infra::HeadlessDevice;

    fn agent(device: &HeadlessDevice) -> RenderAgent {
        RenderAgent::new(Arc::new(device.clone()), &RendererConfig::default()).unwrap()
    }

    #[test]
    fn test_lanes_are_initialized_with_the_agent() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut agent = agent(&device);
        assert!(agent.executors.iter().all(|e| e.is_initialized()));
        assert!(agent.bake.is_initialized());
        assert!(agent.view(agent.default_view()).is_some());
        agent.shutdown();
        assert!(!agent.is_initialized());
    }

    #[test]
    fn test_frame_is_skipped_while_lost() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut agent = agent(&device);
        let mut scene = Scene::new();
        let camera = screen_camera(64, 64);

        device.simulate_device_loss();
        agent.on_device_lost();
        device.take_frame_log();
        agent
            .render_scene(agent.default_view(), &mut scene, &camera)
            .unwrap();
        assert!(device.take_frame_log().kinds().is_empty());
        agent.shutdown();
    }

    #[test]
    fn test_unknown_view_is_rejected() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut agent = agent(&device);
        let mut scene = Scene::new();
        let err = agent
            .render_scene(ViewHandle(7), &mut scene, &screen_camera(8, 8))
            .unwrap_err();
        assert!(matches!(err, RenderError::ResourceError(ResourceError::InvalidHandle)));
        agent.shutdown();
    }

    #[test]
    fn test_released_view_frees_its_targets() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut agent = agent(&device);
        let before = agent.resource_cache().target_count();
        let view = agent.create_view(320, 200, 1).unwrap();
        assert_eq!(agent.resource_cache().target_count(), before + 3);
        agent.release_view(view);
        assert_eq!(agent.resource_cache().target_count(), before);
        assert!(agent.view(view).is_none());
        agent.shutdown();
    }

    #[test]
    fn test_render_after_shutdown_fails() {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let mut agent = agent(&device);
        agent.shutdown();
        let mut scene = Scene::new();
        let err = agent
            .render_scene(ViewHandle(0), &mut scene, &screen_camera(8, 8))
            .unwrap_err();
        assert!(matches!(err, RenderError::NotInitialized));
    }
}
