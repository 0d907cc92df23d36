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

//! Pass ordering of a frame against the headless device.

mod common;

use common::{add_mesh, camera, device, receiver, reflective, renderer, settings};
use prism_core::math::{LinearRgba, Rect, Vec3};
use prism_core::renderer::api::{MeshData, PassKind};
use prism_core::renderer::settings::{GlobalLevel, RenderMode};
use prism_core::renderer::{CommandMode, DebugSettings};
use prism_core::scene::{Hud, HudItem, InstanceFlags, Material, Scene};

fn preview() -> DebugSettings {
    DebugSettings {
        render_mode: RenderMode::HqPreview,
        ..DebugSettings::default()
    }
}

#[test]
fn test_full_frame_runs_passes_in_order() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), preview());
    let mut scene = Scene::new();
    add_mesh(&mut agent, &mut scene, &MeshData::unit_cube(), Vec3::ZERO, receiver(), Material::default());
    add_mesh(
        &mut agent,
        &mut scene,
        &MeshData::uv_sphere(12, 8),
        Vec3::new(2.0, 0.0, 0.0),
        InstanceFlags::default(),
        reflective(),
    );

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();

    let mut expected = vec![
        PassKind::StaticShadow,
        PassKind::DynamicShadow { split: 0 },
        PassKind::DynamicShadow { split: 1 },
    ];
    expected.extend([PassKind::Reflection; 6]);
    expected.extend([PassKind::Lighting, PassKind::Glow, PassKind::PostFx]);
    assert_eq!(device.take_frame_log().kinds(), expected);

    let stats = agent.stats();
    assert_eq!(stats.frame, 1);
    assert_eq!(stats.reflection_refreshes, 1);
    assert_eq!(stats.reflection_faces, 6);
    assert!(stats.commands(PassKind::Lighting, CommandMode::Solid) > 0);
    assert!(agent.render_stats().contains("LIGHTING"));
    agent.shutdown();
}

#[test]
fn test_order_is_stable_across_frames() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), preview());
    let mut scene = Scene::new();
    add_mesh(&mut agent, &mut scene, &MeshData::unit_cube(), Vec3::ZERO, receiver(), Material::default());

    let mut logs = Vec::new();
    for _ in 0..3 {
        device.take_frame_log();
        agent
            .render_scene(agent.default_view(), &mut scene, &camera())
            .unwrap();
        logs.push(device.take_frame_log().kinds());
    }
    assert!(logs.windows(2).all(|w| w[0] == w[1]));

    let log = &logs[0];
    let index = |kind| log.iter().position(|k| *k == kind).unwrap();
    assert!(index(PassKind::StaticShadow) < index(PassKind::DynamicShadow { split: 0 }));
    assert!(index(PassKind::DynamicShadow { split: 1 }) < index(PassKind::Lighting));
    assert!(index(PassKind::Lighting) < index(PassKind::Glow));
    assert!(index(PassKind::Glow) < index(PassKind::PostFx));
    agent.shutdown();
}

#[test]
fn test_optional_passes_follow_the_scene_and_settings() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::VeryLow), DebugSettings::default());
    let mut scene = Scene::new();
    // Receivers and reflectors are ignored when their tiers are off.
    add_mesh(&mut agent, &mut scene, &MeshData::unit_cube(), Vec3::ZERO, receiver(), reflective());

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    assert_eq!(device.take_frame_log().kinds(), vec![PassKind::Lighting]);
    agent.shutdown();
}

#[test]
fn test_dynamic_shadows_need_a_visible_receiver() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = Scene::new();
    add_mesh(
        &mut agent,
        &mut scene,
        &MeshData::unit_cube(),
        Vec3::ZERO,
        InstanceFlags::default(),
        Material::default(),
    );

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    assert_eq!(
        device.take_frame_log().kinds(),
        vec![PassKind::Lighting, PassKind::Glow, PassKind::PostFx]
    );
    agent.shutdown();
}

#[test]
fn test_lighting_clears_to_fog_color() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::VeryLow), DebugSettings::default());
    let mut scene = Scene::new();
    scene.fog.color = LinearRgba::rgb(0.2, 0.4, 0.6);
    scene.main_light.global_fade = 0.5;

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    let log = device.take_frame_log();
    let lighting = log.passes_of(PassKind::Lighting).next().unwrap();
    let clear = lighting.clear.unwrap();
    approx::assert_relative_eq!(clear.r, 0.1);
    approx::assert_relative_eq!(clear.g, 0.2);
    approx::assert_relative_eq!(clear.b, 0.3);
    agent.shutdown();
}

#[test]
fn test_later_scenes_load_the_light_buffer() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::VeryLow), DebugSettings::default());
    let mut scenes = vec![Scene::new(), Scene::new()];

    device.take_frame_log();
    agent
        .render_scenes(agent.default_view(), &mut scenes, &camera())
        .unwrap();
    let log = device.take_frame_log();
    let clears: Vec<_> = log
        .passes_of(PassKind::Lighting)
        .map(|p| p.clear.is_some())
        .collect();
    assert_eq!(clears, vec![true, false]);
    agent.shutdown();
}

#[test]
fn test_debug_overlay_blits_the_splits() {
    let device = device();
    let debug = DebugSettings {
        render_mode: RenderMode::DebugShadowMap,
        ..DebugSettings::default()
    };
    let mut agent = renderer(&device, settings(GlobalLevel::High), debug);
    let mut scene = Scene::new();
    add_mesh(&mut agent, &mut scene, &MeshData::unit_cube(), Vec3::ZERO, receiver(), Material::default());

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    let log = device.take_frame_log();
    assert_eq!(log.kinds().last(), Some(&PassKind::Debug));
    assert!(log.first_index(PassKind::StaticShadow).is_none());
    assert_eq!(log.passes_of(PassKind::Debug).next().unwrap().blits, 2);
    agent.shutdown();
}

#[test]
fn test_hud_and_present_follow_the_frame() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::VeryLow), DebugSettings::default());
    let mut scene = Scene::new();
    let hud = Hud {
        items: vec![HudItem::Fill {
            rect: Rect::new(4.0, 4.0, 32.0, 8.0),
            color: LinearRgba::WHITE,
        }],
    };

    device.take_frame_log();
    let view = agent.default_view();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    agent.render_hud(view, &hud).unwrap();
    agent.present(view).unwrap();

    let log = device.take_frame_log();
    assert_eq!(log.kinds(), vec![PassKind::Lighting, PassKind::Hud]);
    assert_eq!(log.passes_of(PassKind::Hud).next().unwrap().draws.len(), 1);
    assert_eq!(log.presents, 1);
    agent.shutdown();
}
