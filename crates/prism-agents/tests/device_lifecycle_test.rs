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

//! Device loss, reset, settings changes and video memory exhaustion.

mod common;

use common::{add_mesh, camera, device, receiver, reflective, renderer, settings};
use prism_agents::RenderAgent;
use prism_core::math::Vec3;
use prism_core::renderer::api::{DeviceCaps, DeviceState, MeshData, PassKind};
use prism_core::renderer::settings::{GlobalLevel, RenderMode, ShaderLevel, TextureLevel};
use prism_core::renderer::{DebugSettings, RenderError, RenderSettings};
use prism_core::scene::{InstanceFlags, Material, Scene};
use prism_infra::HeadlessDevice;
use std::sync::Arc;

fn busy_scene(agent: &mut RenderAgent) -> Scene {
    let mut scene = Scene::new();
    add_mesh(agent, &mut scene, &MeshData::unit_cube(), Vec3::ZERO, receiver(), Material::default());
    add_mesh(
        agent,
        &mut scene,
        &MeshData::uv_sphere(8, 4),
        Vec3::new(2.0, 0.0, 0.0),
        InstanceFlags::default(),
        reflective(),
    );
    scene
}

#[test]
fn test_state_machine_follows_the_host() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::Medium), DebugSettings::default());
    assert_eq!(agent.device_state(), DeviceState::Ok);

    device.simulate_device_loss();
    assert_eq!(agent.device_state(), DeviceState::Lost);

    agent.on_device_lost();
    assert_eq!(agent.device_state(), DeviceState::NotReset);

    agent.on_device_reset().unwrap();
    assert_eq!(agent.device_state(), DeviceState::Ok);
    agent.shutdown();
}

#[test]
fn test_lost_reset_cycle_restores_reference_counts() {
    let device = device();
    let debug = DebugSettings {
        render_mode: RenderMode::HqPreview,
        ..DebugSettings::default()
    };
    let mut agent = renderer(&device, settings(GlobalLevel::High), debug);
    let mut scene = busy_scene(&mut agent);
    let view = agent.default_view();
    agent.render_scene(view, &mut scene, &camera()).unwrap();

    let refs = agent.resource_cache().state_ref_counts();
    let targets = device.live_render_targets();
    let textures = device.live_textures();
    let buffers = device.live_buffers();

    device.simulate_device_loss();
    // Frames are skipped, not failed, until the host reacts.
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    agent.on_device_lost();
    agent.on_device_lost();
    assert_eq!(device.live_render_targets(), 0);
    let light_buffer = agent.view(view).unwrap().light_buffer;
    assert!(agent.resource_cache().target_texture(light_buffer).is_none());

    agent.on_device_reset().unwrap();
    agent.on_device_reset().unwrap();
    assert_eq!(agent.resource_cache().state_ref_counts(), refs);
    assert_eq!(device.live_render_targets(), targets);
    assert_eq!(device.live_textures(), textures);
    assert_eq!(device.live_buffers(), buffers);

    device.take_frame_log();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    let log = device.take_frame_log();
    assert!(log.first_index(PassKind::Lighting).is_some());
    assert_eq!(log.passes_of(PassKind::Reflection).count(), 6);
    agent.shutdown();
}

#[test]
fn test_reset_out_of_memory_can_be_retried() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = busy_scene(&mut agent);
    let view = agent.default_view();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    let usage = agent.vram_usage();
    let targets = device.live_render_targets();
    let textures = device.live_textures();

    device.simulate_device_loss();
    agent.on_device_lost();
    let released_textures = device.live_textures();
    device.set_vram_budget(usage - 1);

    let err = agent.on_device_reset().unwrap_err();
    assert!(err.is_out_of_video_memory());
    // Nothing half-built survives the failed attempt.
    assert_eq!(device.live_render_targets(), 0);
    assert_eq!(device.live_textures(), released_textures);
    assert!(!agent.resource_cache().is_alive());

    // A second failure leaves the same state.
    assert!(agent.on_device_reset().is_err());
    assert_eq!(device.live_render_targets(), 0);

    device.set_vram_budget(u64::MAX);
    agent.on_device_reset().unwrap();
    assert_eq!(agent.device_state(), DeviceState::Ok);
    assert_eq!(device.live_render_targets(), targets);
    assert_eq!(device.live_textures(), textures);

    device.take_frame_log();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    assert!(device.take_frame_log().first_index(PassKind::Lighting).is_some());
    agent.shutdown();
}

#[test]
fn test_reset_fails_while_the_driver_is_gone() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::Medium), DebugSettings::default());
    device.simulate_driver_failure();
    assert_eq!(agent.device_state(), DeviceState::Error);

    let mut scene = Scene::new();
    let err = agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap_err();
    assert!(matches!(err, RenderError::DeviceError(_)));

    agent.on_device_lost();
    assert!(matches!(agent.on_device_reset(), Err(RenderError::DeviceError(_))));
    agent.shutdown();
}

#[test]
fn test_settings_change_runs_a_full_cycle() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::Low), DebugSettings::default());
    let mut scene = busy_scene(&mut agent);
    let view = agent.default_view();
    let light_buffer = agent.view(view).unwrap().light_buffer;

    let mut requested = settings(GlobalLevel::VeryHigh);
    requested.width = 200;
    requested.height = 100;
    agent.set_render_settings(requested.clone()).unwrap();

    assert_eq!(agent.device_state(), DeviceState::Ok);
    assert_eq!(agent.render_settings().texture, TextureLevel::High);
    assert_eq!(agent.requested_render_settings(), &requested);
    let resized = agent.view(view).unwrap();
    assert_eq!((resized.width, resized.height), (200, 100));
    assert_eq!(resized.light_buffer, light_buffer);

    device.take_frame_log();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    assert!(device
        .take_frame_log()
        .first_index(PassKind::DynamicShadow { split: 0 })
        .is_some());
    agent.shutdown();
}

#[test]
fn test_unchanged_settings_skip_the_cycle() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::Medium), DebugSettings::default());
    let refs = agent.resource_cache().state_ref_counts();
    let current = agent.render_settings().clone();
    agent.set_render_settings(current).unwrap();
    assert_eq!(agent.resource_cache().state_ref_counts(), refs);
    assert_eq!(agent.device_state(), DeviceState::Ok);
    agent.shutdown();
}

#[test]
fn test_effective_settings_never_exceed_the_device() {
    let device = HeadlessDevice::new(DeviceCaps::shader_model_2());
    let mut agent = RenderAgent::with_settings(
        Arc::new(device.clone()),
        RenderSettings::with_global_level(GlobalLevel::VeryHigh),
    )
    .unwrap();
    let max = *agent.max_render_settings();
    assert!(max.admits(agent.render_settings()));
    assert_eq!(agent.render_settings().shader, ShaderLevel::Low);

    for level in [
        GlobalLevel::VeryLow,
        GlobalLevel::Low,
        GlobalLevel::Medium,
        GlobalLevel::High,
        GlobalLevel::VeryHigh,
    ] {
        agent
            .set_render_settings(RenderSettings::with_global_level(level))
            .unwrap();
        assert!(max.admits(agent.render_settings()), "{level:?} exceeds the device");
    }
    agent.shutdown();
}

#[test]
fn test_out_of_video_memory_is_reported() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::Medium), DebugSettings::default());
    device.set_vram_budget(agent.vram_usage() + 1024);

    let err = agent.create_view(2048, 2048, 2).unwrap_err();
    assert!(err.is_out_of_video_memory());

    // Nothing was half-registered.
    let targets = agent.resource_cache().target_count();
    device.set_vram_budget(u64::MAX);
    let view = agent.create_view(64, 64, 1).unwrap();
    assert_eq!(agent.resource_cache().target_count(), targets + 3);
    agent.release_view(view);
    agent.shutdown();
}
