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

//! Scene and renderer builders shared by the integration tests.

#![allow(dead_code)]

use prism_agents::{RenderAgent, RendererConfig};
use prism_core::math::{Mat4, Vec3, FRAC_PI_4};
use prism_core::renderer::api::{DeviceCaps, MeshData};
use prism_core::renderer::settings::GlobalLevel;
use prism_core::renderer::{DebugSettings, RenderSettings};
use prism_core::scene::{Camera, InstanceFlags, InstanceId, Material, MeshInstance, Scene};
use prism_infra::HeadlessDevice;
use std::sync::Arc;

/// Side of the CPU surfaces; keeps frames cheap.
pub const RASTER_LIMIT: u32 = 256;

pub fn device() -> HeadlessDevice {
    HeadlessDevice::with_raster_limit(DeviceCaps::high_end(), RASTER_LIMIT)
}

pub fn settings(level: GlobalLevel) -> RenderSettings {
    RenderSettings {
        width: 128,
        height: 96,
        ..RenderSettings::with_global_level(level)
    }
}

pub fn renderer(device: &HeadlessDevice, settings: RenderSettings, debug: DebugSettings) -> RenderAgent {
    let config = RendererConfig {
        settings,
        debug,
        reflection_cube_size: 32,
        ..RendererConfig::default()
    };
    RenderAgent::new(Arc::new(device.clone()), &config).expect("renderer")
}

pub fn camera() -> Camera {
    Camera::look_at(
        Vec3::new(0.0, 2.0, 8.0),
        Vec3::ZERO,
        Vec3::Y,
        FRAC_PI_4,
        128.0 / 96.0,
        0.1,
        100.0,
    )
    .expect("camera")
}

pub fn receiver() -> InstanceFlags {
    InstanceFlags {
        dynamic_shadow_receiver: true,
        ..InstanceFlags::default()
    }
}

pub fn reflective() -> Material {
    Material {
        reflectivity: 0.5,
        ..Material::default()
    }
}

/// Uploads `mesh` and places one instance of it at `position`.
pub fn add_mesh(
    agent: &mut RenderAgent,
    scene: &mut Scene,
    mesh: &MeshData,
    position: Vec3,
    flags: InstanceFlags,
    material: Material,
) -> InstanceId {
    let handle = agent.upload_mesh(mesh).expect("upload");
    scene.add_mesh(
        MeshInstance::new(handle, mesh.bounds(), Mat4::from_translation(position), material)
            .with_flags(flags),
    )
}
