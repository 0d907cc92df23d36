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

//! Light, occlusion and layer map bakes.

mod common;

use common::{add_mesh, settings};
use prism_agents::{RenderAgent, RendererConfig};
use prism_core::math::{LinearRgba, Vec3};
use prism_core::renderer::api::{DeviceCaps, MeshData};
use prism_core::renderer::settings::GlobalLevel;
use prism_core::renderer::light::PointLight;
use prism_core::scene::{InstanceFlags, InstanceId, Material, Scene};
use prism_infra::HeadlessDevice;
use prism_lanes::bake_lane::border::has_uncovered_texels;
use prism_lanes::bake_lane::{BakeError, BakeLayer};
use std::sync::Arc;

fn baker() -> (HeadlessDevice, RenderAgent) {
    let device = HeadlessDevice::new(DeviceCaps::high_end());
    let config = RendererConfig {
        settings: settings(GlobalLevel::High),
        ..RendererConfig::default()
    };
    let agent = RenderAgent::new(Arc::new(device.clone()), &config).unwrap();
    (device, agent)
}

fn cube_scene(agent: &mut RenderAgent) -> (Scene, InstanceId) {
    let mut scene = Scene::new();
    let flags = InstanceFlags {
        static_shadow_caster: true,
        static_lighting: true,
        ..InstanceFlags::default()
    };
    let cube = add_mesh(agent, &mut scene, &MeshData::unit_cube(), Vec3::ZERO, flags, Material::default());
    (scene, cube)
}

#[test]
fn test_light_map_has_no_uncovered_texels() {
    let (device, mut agent) = baker();
    let (mut scene, cube) = cube_scene(&mut agent);
    scene.point_lights.push(PointLight::new(Vec3::new(0.0, 2.0, 0.0), 5.0, 1.0));
    let targets = agent.resource_cache().target_count();

    let image = agent.generate_light_map((64, 64), &mut scene, cube).unwrap();
    assert_eq!(image.dimensions(), (64, 64));
    assert!(!has_uncovered_texels(&image));
    // The bake target is gone; only the static shadow map stays registered.
    assert_eq!(agent.resource_cache().target_count(), targets + 1);

    let scratch = tempfile::tempdir().unwrap();
    let path = scratch.path().join("light_map.png");
    image.save(&path).unwrap();
    assert!(path.exists());
    assert!(device.live_render_targets() > 0);
    agent.shutdown();
}

#[test]
fn test_occlusion_map_is_downsampled_to_the_request() {
    let (_device, mut agent) = baker();
    let (scene, cube) = cube_scene(&mut agent);

    let supersampled = agent
        .generate_occlusion_map((128, 128), &scene, cube, false)
        .unwrap();
    assert_eq!(supersampled.dimensions(), (128, 128));

    let exact = agent
        .generate_occlusion_map((64, 32), &scene, cube, true)
        .unwrap();
    assert_eq!(exact.dimensions(), (64, 32));
    agent.shutdown();
}

#[test]
fn test_layer_map_chains_groups() {
    let (_device, mut agent) = baker();
    let (scene, cube) = cube_scene(&mut agent);
    let targets = agent.resource_cache().target_count();
    let layers: Vec<_> = (0..6)
        .map(|i| BakeLayer::colored(LinearRgba::new(i as f32 / 6.0, 0.5, 0.5, 0.5)))
        .collect();

    let image = agent.generate_layer_map((32, 32), &scene, cube, &layers).unwrap();
    assert_eq!(image.dimensions(), (32, 32));
    assert_eq!(agent.resource_cache().target_count(), targets);

    let err = agent.generate_layer_map((32, 32), &scene, cube, &[]).unwrap_err();
    assert!(matches!(err, BakeError::NoLayers));
    agent.shutdown();
}

#[test]
fn test_bakes_reject_bad_requests() {
    let (device, mut agent) = baker();
    let (mut scene, cube) = cube_scene(&mut agent);

    let err = agent
        .generate_light_map((64, 64), &mut scene, InstanceId(999))
        .unwrap_err();
    assert!(matches!(err, BakeError::UnknownInstance(999)));

    let err = agent
        .generate_occlusion_map((4096, 16), &scene, cube, true)
        .unwrap_err();
    assert!(matches!(err, BakeError::InvalidSize { .. }));

    device.simulate_device_loss();
    agent.on_device_lost();
    let err = agent
        .generate_occlusion_map((16, 16), &scene, cube, true)
        .unwrap_err();
    assert!(matches!(err, BakeError::Resource(_)));
    agent.shutdown();
}
