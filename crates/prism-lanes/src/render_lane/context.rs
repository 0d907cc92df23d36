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

//! The per-pass snapshot handed to every executor.
//!
//! A [`RenderContext`] is built fresh for each pass from a [`PassSetup`] and
//! the scene, and dropped once the pass is executed. Culling happens here,
//! once, so executors only walk index lists.

use prism_core::math::{Frustum, LinearRgba, Mat4};
use prism_core::renderer::api::{PassKind, ShadeParams, TargetView, TextureId};
use prism_core::renderer::light::FogSettings;
use prism_core::renderer::settings::{DebugSettings, RenderSettings};
use prism_core::scene::{Camera, HudItem, InstanceFlags, Scene};
use std::ops::BitOr;

/// Per-context switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextFlags(u32);

impl ContextFlags {
    /// No flag set.
    pub const NONE: Self = Self(0);
    /// The pass renders a face of a reflection probe. Nested renders never
    /// refresh probes, cast shadows or post-process.
    pub const IN_REFLECTION_UPDATE: Self = Self(1 << 0);
    /// The static shadow map of this frame is valid.
    pub const STATIC_SHADOW_ON: Self = Self(1 << 1);
    /// The dynamic shadow splits of this frame are valid.
    pub const DYNAMIC_SHADOW_ON: Self = Self(1 << 2);
    /// The pass renders the planar reflection of a water surface.
    pub const IN_WATER_REFLECTION: Self = Self(1 << 3);
    /// The glow buffer of this frame holds the glow of the lit buffer.
    pub const GLOW_ON: Self = Self(1 << 4);

    /// Returns `true` if every flag of `other` is set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the flags of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for ContextFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Shadow maps produced earlier in the frame, sampled by the lighting pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowInputs {
    /// The static sun shadow map.
    pub static_map: Option<TextureId>,
    /// Sun transform of the static map.
    pub static_view_proj: Mat4,
    /// The two dynamic splits.
    pub splits: [Option<TextureId>; 2],
    /// Sun transforms of the splits.
    pub split_view_proj: [Mat4; 2],
}

impl Default for ShadowInputs {
    fn default() -> Self {
        Self {
            static_map: None,
            static_view_proj: Mat4::IDENTITY,
            splits: [None; 2],
            split_view_proj: [Mat4::IDENTITY; 2],
        }
    }
}

/// Indices of the culled drawables, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    /// Into [`Scene::meshes`].
    pub meshes: Vec<usize>,
    /// Into [`Scene::skin_meshes`].
    pub skin_meshes: Vec<usize>,
    /// Into [`Scene::decals`].
    pub decals: Vec<usize>,
    /// Into [`Scene::billboards`].
    pub billboards: Vec<usize>,
    /// Into [`Scene::free_forms`].
    pub free_forms: Vec<usize>,
    /// Into [`Scene::splines`].
    pub splines: Vec<usize>,
    /// Into [`Scene::boxes`].
    pub boxes: Vec<usize>,
    /// Into [`Scene::grass`].
    pub grass: Vec<usize>,
    /// Into [`Scene::water`].
    pub water: Vec<usize>,
}

/// How a pass is set up, before culling.
#[derive(Debug, Clone)]
pub struct PassSetup<'a> {
    /// Identity of the pass.
    pub pass: PassKind,
    /// Context switches.
    pub flags: ContextFlags,
    /// The viewer.
    pub camera: Camera,
    /// Overrides the camera transform, used by shadow passes.
    pub view_proj: Option<Mat4>,
    /// The bound target.
    pub target: TargetView,
    /// Nominal size of the target.
    pub target_size: (u32, u32),
    /// Effective settings.
    pub settings: &'a RenderSettings,
    /// Debug settings.
    pub debug: &'a DebugSettings,
}

/// An immutable-for-the-pass snapshot of everything executors read.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Identity of the pass.
    pub pass: PassKind,
    /// Context switches.
    pub flags: ContextFlags,
    /// The viewer.
    pub camera: Camera,
    /// World to clip transform of the pass.
    pub view_proj: Mat4,
    /// Culling volume of the pass.
    pub frustum: Frustum,
    /// The bound target.
    pub target: TargetView,
    /// Nominal size of the target.
    pub target_size: (u32, u32),
    /// Color the target is cleared to.
    pub clear_color: LinearRgba,
    /// Fog, its color already faded.
    pub fog: FogSettings,
    /// Sun lighting, without point lights.
    pub shade: ShadeParams,
    /// Effective settings.
    pub settings: RenderSettings,
    /// Debug settings.
    pub debug: DebugSettings,
    /// Culled drawables.
    pub visible: VisibleSet,
    /// Shadow maps of the frame.
    pub shadows: ShadowInputs,
    /// Glow buffer to composite, if the glow pass ran.
    pub glow_texture: Option<TextureId>,
    /// Planar reflection of the water, if rendered this frame.
    pub water_reflection: Option<TextureId>,
    /// 2D items of the overlay pass.
    pub hud: Vec<HudItem>,
}

/// Whether an instance takes part in a shadow pass.
pub fn casts_into(pass: PassKind, flags: &InstanceFlags) -> bool {
    match pass {
        PassKind::StaticShadow => flags.static_shadow_caster,
        PassKind::DynamicShadow { .. } => {
            flags.dynamic_shadow_caster
                && !flags.dynamic_shadow_receiver
                && !flags.static_lighting
        }
        _ => true,
    }
}

impl RenderContext {
    /// Builds the context of a pass, culling the scene against its frustum.
    pub fn build(setup: PassSetup<'_>, scene: &Scene) -> Self {
        let view_proj = setup.view_proj.unwrap_or_else(|| setup.camera.view_proj());
        let frustum = Frustum::from_view_proj(&view_proj);
        let light = &scene.main_light;
        let fog = FogSettings {
            color: scene.fog.color.scale_rgb(light.global_fade),
            ..scene.fog
        };

        let mut ctx = Self {
            pass: setup.pass,
            flags: setup.flags,
            camera: setup.camera,
            view_proj,
            frustum,
            target: setup.target,
            target_size: setup.target_size,
            clear_color: fog.color,
            fog,
            shade: ShadeParams {
                light_dir: light.direction(),
                ambient: light.faded_ambient(),
                diffuse: light.faded_diffuse(),
                point_lights: LinearRgba::BLACK,
            },
            settings: setup.settings.clone(),
            debug: *setup.debug,
            visible: VisibleSet::default(),
            shadows: ShadowInputs::default(),
            glow_texture: None,
            water_reflection: None,
            hud: Vec::new(),
        };
        ctx.visible = ctx.cull(scene);
        ctx
    }

    /// A context drawing a single mesh instance in texel space.
    pub fn for_bake(setup: PassSetup<'_>, scene: &Scene, mesh_index: usize) -> Self {
        let mut ctx = Self::build(setup, scene);
        ctx.visible = VisibleSet {
            meshes: vec![mesh_index],
            ..VisibleSet::default()
        };
        ctx
    }

    fn cull(&self, scene: &Scene) -> VisibleSet {
        let pass = self.pass;
        let frustum = &self.frustum;
        let mut visible = VisibleSet::default();

        visible.meshes = scene
            .meshes
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.gpu.hidden && casts_into(pass, &m.flags))
            .filter(|(_, m)| frustum.intersects_aabb(&m.bounds()))
            .map(|(i, _)| i)
            .collect();
        visible.skin_meshes = scene
            .skin_meshes
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.hidden && casts_into(pass, &m.flags))
            .filter(|(_, m)| frustum.intersects_aabb(&m.bounds()))
            .map(|(i, _)| i)
            .collect();

        if pass.is_shadow() {
            return visible;
        }

        macro_rules! cull_placed {
            ($field:ident, $placement:ident $(. $rest:ident)*) => {
                scene
                    .$field
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| {
                        let p = &d.$placement $(.$rest)*;
                        !p.hidden && frustum.intersects_aabb(&p.bounds)
                    })
                    .map(|(i, _)| i)
                    .collect()
            };
        }
        visible.decals = cull_placed!(decals, placement);
        visible.billboards = cull_placed!(billboards, placement);
        visible.free_forms = cull_placed!(free_forms, placement);
        visible.splines = cull_placed!(splines, ribbon.placement);
        visible.boxes = cull_placed!(boxes, placement);
        visible.grass = cull_placed!(grass, placement);
        visible.water = cull_placed!(water, placement);
        visible
    }

    /// Returns `true` inside a reflection probe sub-render.
    #[inline]
    pub fn in_reflection_update(&self) -> bool {
        self.flags.contains(ContextFlags::IN_REFLECTION_UPDATE)
    }

    /// Returns `true` if some visible static mesh receives dynamic shadows.
    pub fn needs_dynamic_shadow(&self, scene: &Scene) -> bool {
        self.visible
            .meshes
            .iter()
            .any(|&i| scene.meshes[i].flags.dynamic_shadow_receiver)
    }

    /// Returns `true` if some visible static mesh samples a reflection probe.
    pub fn has_reflective_meshes(&self, scene: &Scene) -> bool {
        self.visible
            .meshes
            .iter()
            .any(|&i| scene.meshes[i].material.is_reflective())
    }

    /// The first visible reflective water surface.
    pub fn reflective_water<'s>(&self, scene: &'s Scene) -> Option<&'s prism_core::scene::WaterPatch> {
        self.visible
            .water
            .iter()
            .map(|&i| &scene.water[i])
            .find(|w| w.reflective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::math::{Aabb, Vec3, FRAC_PI_2};
    use prism_core::renderer::api::{MeshHandle, TextureId};
    use prism_core::scene::{Material, MeshInstance};

    fn camera() -> Camera {
        Camera::look_at(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        )
        .unwrap()
    }

    fn mesh_at(x: f32, flags: InstanceFlags) -> MeshInstance {
        MeshInstance::new(
            MeshHandle(0),
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE * 0.5),
            Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
            Material::default(),
        )
        .with_flags(flags)
    }

    fn setup<'a>(
        pass: PassKind,
        settings: &'a RenderSettings,
        debug: &'a DebugSettings,
    ) -> PassSetup<'a> {
        PassSetup {
            pass,
            flags: ContextFlags::NONE,
            camera: camera(),
            view_proj: None,
            target: TargetView::whole(TextureId(1)),
            target_size: (64, 64),
            settings,
            debug,
        }
    }

    #[test]
    fn test_culling_skips_hidden_and_out_of_frustum() {
        let mut scene = Scene::new();
        scene.add_mesh(mesh_at(0.0, InstanceFlags::default()));
        scene.add_mesh(mesh_at(500.0, InstanceFlags::default()));
        let hidden = scene.add_mesh(mesh_at(1.0, InstanceFlags::default()));
        scene.mesh_mut(hidden).unwrap().gpu.hidden = true;

        let (settings, debug) = (RenderSettings::default(), DebugSettings::default());
        let ctx = RenderContext::build(setup(PassKind::Lighting, &settings, &debug), &scene);
        assert_eq!(ctx.visible.meshes, vec![0]);
    }

    #[test]
    fn test_dynamic_shadow_casters_exclude_receivers() {
        let mut scene = Scene::new();
        let caster = InstanceFlags {
            dynamic_shadow_caster: true,
            ..InstanceFlags::default()
        };
        let receiver = InstanceFlags {
            dynamic_shadow_caster: true,
            dynamic_shadow_receiver: true,
            ..InstanceFlags::default()
        };
        let baked = InstanceFlags {
            dynamic_shadow_caster: true,
            static_lighting: true,
            ..InstanceFlags::default()
        };
        scene.add_mesh(mesh_at(0.0, caster));
        scene.add_mesh(mesh_at(0.0, receiver));
        scene.add_mesh(mesh_at(0.0, baked));

        let (settings, debug) = (RenderSettings::default(), DebugSettings::default());
        let ctx = RenderContext::build(
            setup(PassKind::DynamicShadow { split: 0 }, &settings, &debug),
            &scene,
        );
        assert_eq!(ctx.visible.meshes, vec![0]);

        let main = RenderContext::build(setup(PassKind::Lighting, &settings, &debug), &scene);
        assert!(main.needs_dynamic_shadow(&scene));
    }

    #[test]
    fn test_fog_color_is_faded() {
        let mut scene = Scene::new();
        scene.fog.color = LinearRgba::WHITE;
        scene.main_light.global_fade = 0.5;
        let (settings, debug) = (RenderSettings::default(), DebugSettings::default());
        let ctx = RenderContext::build(setup(PassKind::Lighting, &settings, &debug), &scene);
        assert_eq!(ctx.clear_color, LinearRgba::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn test_flags() {
        let mut flags = ContextFlags::IN_REFLECTION_UPDATE;
        flags.insert(ContextFlags::GLOW_ON);
        assert!(flags.contains(ContextFlags::GLOW_ON | ContextFlags::IN_REFLECTION_UPDATE));
        assert!(!flags.contains(ContextFlags::DYNAMIC_SHADOW_ON));
    }
}
