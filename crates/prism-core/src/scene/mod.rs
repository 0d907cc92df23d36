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

//! The scene data model consumed by the renderer.
//!
//! Scenes are produced by the simulation; the renderer reads them and only
//! writes back per-frame GPU-side state (`MaterialData`, `LightingData`) and
//! the reflection-refresh flag.

mod camera;
mod drawables;
mod hud;
mod instance;

pub use self::camera::{Camera, PostFxSettings};
pub use self::drawables::{
    Billboard, BoxInstance, Decal, FreeForm, GrassPatch, Placement, Sky, Spline, WaterPatch,
};
pub use self::hud::{Hud, HudItem};
pub use self::instance::{
    InstanceFlags, InstanceId, LightInfluence, LightingData, Material, MaterialData, MaterialKind,
    MeshInstance, SkinMeshInstance,
};

use crate::renderer::light::{FogSettings, MainLightSettings, PointLight};

/// Everything drawn by one call to the scene-render entry point.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// The sun.
    pub main_light: MainLightSettings,
    /// Distance fog.
    pub fog: FogSettings,
    /// Point lights.
    pub point_lights: Vec<PointLight>,
    /// Static meshes.
    pub meshes: Vec<MeshInstance>,
    /// Skinned meshes.
    pub skin_meshes: Vec<SkinMeshInstance>,
    /// Decals.
    pub decals: Vec<Decal>,
    /// Billboards.
    pub billboards: Vec<Billboard>,
    /// Ribbons and trails.
    pub free_forms: Vec<FreeForm>,
    /// Splines.
    pub splines: Vec<Spline>,
    /// Boxes.
    pub boxes: Vec<BoxInstance>,
    /// Grass patches.
    pub grass: Vec<GrassPatch>,
    /// Water surfaces.
    pub water: Vec<WaterPatch>,
    /// Background.
    pub sky: Sky,
    next_id: u64,
    must_update_reflections: bool,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> InstanceId {
        self.next_id += 1;
        InstanceId(self.next_id)
    }

    /// Adds a static mesh instance.
    pub fn add_mesh(&mut self, mut instance: MeshInstance) -> InstanceId {
        instance.id = self.allocate_id();
        let id = instance.id;
        self.meshes.push(instance);
        id
    }

    /// Adds a skinned mesh instance.
    pub fn add_skin_mesh(&mut self, mut instance: SkinMeshInstance) -> InstanceId {
        instance.id = self.allocate_id();
        let id = instance.id;
        self.skin_meshes.push(instance);
        id
    }

    /// Adds a decal.
    pub fn add_decal(&mut self, mut decal: Decal) -> InstanceId {
        decal.placement.id = self.allocate_id();
        let id = decal.placement.id;
        self.decals.push(decal);
        id
    }

    /// Adds a billboard.
    pub fn add_billboard(&mut self, mut billboard: Billboard) -> InstanceId {
        billboard.placement.id = self.allocate_id();
        let id = billboard.placement.id;
        self.billboards.push(billboard);
        id
    }

    /// Adds a ribbon.
    pub fn add_free_form(&mut self, mut ribbon: FreeForm) -> InstanceId {
        ribbon.placement.id = self.allocate_id();
        let id = ribbon.placement.id;
        self.free_forms.push(ribbon);
        id
    }

    /// Adds a spline.
    pub fn add_spline(&mut self, mut spline: Spline) -> InstanceId {
        spline.ribbon.placement.id = self.allocate_id();
        let id = spline.ribbon.placement.id;
        self.splines.push(spline);
        id
    }

    /// Adds a box.
    pub fn add_box(&mut self, mut instance: BoxInstance) -> InstanceId {
        instance.placement.id = self.allocate_id();
        let id = instance.placement.id;
        self.boxes.push(instance);
        id
    }

    /// Adds a grass patch.
    pub fn add_grass(&mut self, mut patch: GrassPatch) -> InstanceId {
        patch.placement.id = self.allocate_id();
        let id = patch.placement.id;
        self.grass.push(patch);
        id
    }

    /// Adds a water surface.
    pub fn add_water(&mut self, mut patch: WaterPatch) -> InstanceId {
        patch.placement.id = self.allocate_id();
        let id = patch.placement.id;
        self.water.push(patch);
        id
    }

    /// Index of a static mesh instance.
    pub fn mesh_index(&self, id: InstanceId) -> Option<usize> {
        self.meshes.iter().position(|m| m.id == id)
    }

    /// A static mesh instance by identity.
    pub fn mesh(&self, id: InstanceId) -> Option<&MeshInstance> {
        self.meshes.iter().find(|m| m.id == id)
    }

    /// A mutable static mesh instance by identity.
    pub fn mesh_mut(&mut self, id: InstanceId) -> Option<&mut MeshInstance> {
        self.meshes.iter_mut().find(|m| m.id == id)
    }

    /// Asks the renderer to refresh every visible reflection probe next frame.
    pub fn request_reflection_update(&mut self) {
        self.must_update_reflections = true;
    }

    /// Returns `true` if probes must be refreshed this frame.
    pub fn must_update_reflections(&self) -> bool {
        self.must_update_reflections
    }

    /// Clears the refresh request; called once the frame is rendered.
    pub fn reflections_updated(&mut self) {
        self.must_update_reflections = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Aabb, LinearRgba, Mat4, Vec3};
    use crate::renderer::api::MeshHandle;

    #[test]
    fn test_instance_ids_are_unique_across_categories() {
        let mut scene = Scene::new();
        let a = scene.add_mesh(MeshInstance::new(
            MeshHandle(0),
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE),
            Mat4::IDENTITY,
            Material::default(),
        ));
        let b = scene.add_box(BoxInstance {
            placement: Placement::new(Mat4::IDENTITY, LinearRgba::WHITE),
        });
        assert_ne!(a, b);
        assert_eq!(scene.mesh_index(a), Some(0));
        assert!(scene.mesh(b).is_none());
    }

    #[test]
    fn test_reflection_request_flag() {
        let mut scene = Scene::new();
        assert!(!scene.must_update_reflections());
        scene.request_reflection_update();
        assert!(scene.must_update_reflections());
        scene.reflections_updated();
        assert!(!scene.must_update_reflections());
    }
}
