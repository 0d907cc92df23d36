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

//! Mesh instances, their materials and their per-frame GPU-side state.

use crate::math::{Aabb, LinearRgba, Mat4};
use crate::renderer::api::{MeshHandle, ProbeHandle, SkinMeshHandle, TextureHandle};

/// Identifies one drawable of a [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InstanceId(pub u64);

/// Shader family of a mesh material.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MaterialKind {
    /// The built-in lit material.
    #[default]
    Standard,
    /// A named custom effect.
    Custom(String),
}

/// Surface parameters of a mesh instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Shader family.
    pub kind: MaterialKind,
    /// Base color.
    pub diffuse: LinearRgba,
    /// Diffuse texture.
    pub texture: Option<TextureHandle>,
    /// Baked light map, used instead of dynamic lighting when present.
    pub light_map: Option<TextureHandle>,
    /// Environment reflection amount, `0.0` disables the cube probe.
    pub reflectivity: f32,
    /// Refraction amount.
    pub refraction: f32,
    /// Transparency amount.
    pub transparency: f32,
    /// Glow intensity, `0.0` keeps the instance out of the glow pass.
    pub glow: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialKind::Standard,
            diffuse: LinearRgba::WHITE,
            texture: None,
            light_map: None,
            reflectivity: 0.0,
            refraction: 0.0,
            transparency: 0.0,
            glow: 0.0,
        }
    }
}

impl Material {
    /// A standard material of a solid color.
    pub fn colored(diffuse: LinearRgba) -> Self {
        Self {
            diffuse,
            ..Self::default()
        }
    }

    /// Returns `true` if the material is drawn with blending.
    pub fn is_translucent(&self) -> bool {
        self.refraction != 0.0 || self.transparency != 0.0
    }

    /// Returns `true` if the material samples a reflection probe.
    pub fn is_reflective(&self) -> bool {
        self.reflectivity != 0.0
    }
}

/// Shadow and lighting participation of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceFlags {
    /// Casts into the static sun shadow map.
    pub static_shadow_caster: bool,
    /// Casts into the dynamic shadow splits.
    pub dynamic_shadow_caster: bool,
    /// Samples the dynamic shadow splits.
    pub dynamic_shadow_receiver: bool,
    /// Lit by a baked light map rather than dynamic lights.
    pub static_lighting: bool,
}

/// GPU-side state attached to a mesh instance.
///
/// `hidden` and `updating_reflection` form the reentrancy guard of the
/// reflection probe refresh: while an instance renders its own probe it is
/// hidden from every sub-render and cannot start a second refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialData {
    /// Skipped by every executor.
    pub hidden: bool,
    /// The instance is rendering its own reflection probe.
    pub updating_reflection: bool,
    /// Lazily created reflection probe.
    pub probe: Option<ProbeHandle>,
}

/// Influence of one point light over an instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightInfluence {
    /// Index of the light in [`Scene::point_lights`](super::Scene::point_lights).
    pub light: usize,
    /// Influence coefficient, strictly positive.
    pub coefficient: f32,
}

/// The point lights affecting an instance, rebuilt every frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightingData {
    /// Highest influences first.
    pub lights: Vec<LightInfluence>,
}

/// A static mesh placed in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    /// Identity of the instance.
    pub id: InstanceId,
    /// Uploaded geometry.
    pub mesh: MeshHandle,
    /// Object to world transform.
    pub transform: Mat4,
    /// Object-space bounds of the geometry.
    pub local_bounds: Aabb,
    /// Surface parameters.
    pub material: Material,
    /// Shadow and lighting participation.
    pub flags: InstanceFlags,
    /// GPU-side state.
    pub gpu: MaterialData,
    /// Per-frame point lights.
    pub lighting: LightingData,
}

impl MeshInstance {
    /// Creates an instance. The identity is assigned when added to a scene.
    pub fn new(mesh: MeshHandle, local_bounds: Aabb, transform: Mat4, material: Material) -> Self {
        Self {
            id: InstanceId::default(),
            mesh,
            transform,
            local_bounds,
            material,
            flags: InstanceFlags::default(),
            gpu: MaterialData::default(),
            lighting: LightingData::default(),
        }
    }

    /// Sets the participation flags.
    pub fn with_flags(mut self, flags: InstanceFlags) -> Self {
        self.flags = flags;
        self
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Aabb {
        self.local_bounds.transform(&self.transform)
    }
}

/// A skinned mesh placed in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinMeshInstance {
    /// Identity of the instance.
    pub id: InstanceId,
    /// Uploaded geometry.
    pub mesh: SkinMeshHandle,
    /// Object to world transform.
    pub transform: Mat4,
    /// Object-space bounds of the bind pose.
    pub local_bounds: Aabb,
    /// Bone palette of the current pose.
    pub palette: Vec<Mat4>,
    /// Surface parameters.
    pub material: Material,
    /// Shadow and lighting participation.
    pub flags: InstanceFlags,
    /// Skipped by every executor.
    pub hidden: bool,
    /// Per-frame point lights.
    pub lighting: LightingData,
}

impl SkinMeshInstance {
    /// Creates an instance in bind pose.
    pub fn new(mesh: SkinMeshHandle, local_bounds: Aabb, transform: Mat4, material: Material) -> Self {
        Self {
            id: InstanceId::default(),
            mesh,
            transform,
            local_bounds,
            palette: Vec::new(),
            material,
            flags: InstanceFlags::default(),
            hidden: false,
            lighting: LightingData::default(),
        }
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Aabb {
        self.local_bounds.transform(&self.transform)
    }
}
