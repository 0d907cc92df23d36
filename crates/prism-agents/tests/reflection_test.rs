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

//! Reflection probes: self-exclusion and bounded recursion.

mod common;

use common::{add_mesh, camera, device, reflective, renderer, settings};
use prism_core::math::Vec3;
use prism_core::renderer::api::{MeshData, PassKind};
use prism_core::renderer::settings::GlobalLevel;
use prism_core::renderer::DebugSettings;
use prism_core::scene::{InstanceFlags, Material, Scene};

#[test]
fn test_sphere_is_hidden_from_its_own_probe() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = Scene::new();
    let sphere = add_mesh(
        &mut agent,
        &mut scene,
        &MeshData::uv_sphere(16, 8),
        Vec3::ZERO,
        InstanceFlags::default(),
        reflective(),
    );
    // Surrounds the sphere, so every face has something else to draw.
    let mut walls = Vec::new();
    for offset in [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z] {
        walls.push(add_mesh(
            &mut agent,
            &mut scene,
            &MeshData::unit_cube(),
            offset * 3.0,
            InstanceFlags::default(),
            Material::default(),
        ));
    }

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    let log = device.take_frame_log();

    let faces: Vec<_> = log.passes_of(PassKind::Reflection).collect();
    assert_eq!(faces.len(), 6);
    for face in &faces {
        assert!(!face.drew(sphere.0), "the sphere appears in its own reflection");
    }
    for wall in &walls {
        assert!(faces.iter().any(|face| face.drew(wall.0)));
    }

    // The main pass still draws the sphere, and its flags are restored.
    let lighting = log.passes_of(PassKind::Lighting).next().unwrap();
    assert!(lighting.drew(sphere.0));
    let instance = scene.mesh(sphere).unwrap();
    assert!(!instance.gpu.hidden);
    assert!(!instance.gpu.updating_reflection);
    assert!(instance.gpu.probe.is_some());
    agent.shutdown();
}

#[test]
fn test_mutual_reflectors_refresh_once_each() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = Scene::new();
    let sphere = MeshData::uv_sphere(12, 6);
    let left = add_mesh(
        &mut agent,
        &mut scene,
        &sphere,
        Vec3::new(-1.0, 0.0, 0.0),
        InstanceFlags::default(),
        reflective(),
    );
    let right = add_mesh(
        &mut agent,
        &mut scene,
        &sphere,
        Vec3::new(1.0, 0.0, 0.0),
        InstanceFlags::default(),
        reflective(),
    );

    device.take_frame_log();
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    let log = device.take_frame_log();
    assert_eq!(log.passes_of(PassKind::Reflection).count(), 12);
    assert_eq!(agent.stats().reflection_refreshes, 2);

    // Each sphere shows up in the other's probe only.
    let faces: Vec<_> = log.passes_of(PassKind::Reflection).collect();
    assert!(faces[..6].iter().all(|f| !f.drew(left.0)));
    assert!(faces[..6].iter().any(|f| f.drew(right.0)));
    assert!(faces[6..].iter().all(|f| !f.drew(right.0)));
    assert!(faces[6..].iter().any(|f| f.drew(left.0)));

    // Fresh probes are not rendered again.
    agent
        .render_scene(agent.default_view(), &mut scene, &camera())
        .unwrap();
    assert_eq!(device.take_frame_log().passes_of(PassKind::Reflection).count(), 0);
    assert_eq!(agent.stats().reflection_faces, 0);
    agent.shutdown();
}

#[test]
fn test_scene_request_refreshes_every_probe() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = Scene::new();
    add_mesh(
        &mut agent,
        &mut scene,
        &MeshData::uv_sphere(8, 4),
        Vec3::ZERO,
        InstanceFlags::default(),
        reflective(),
    );

    let view = agent.default_view();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    assert_eq!(agent.stats().reflection_refreshes, 0);

    scene.request_reflection_update();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    assert_eq!(agent.stats().reflection_refreshes, 1);
    assert!(!scene.must_update_reflections());
    agent.shutdown();
}

#[test]
fn test_probes_are_refreshed_after_a_reset() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = Scene::new();
    let sphere = add_mesh(
        &mut agent,
        &mut scene,
        &MeshData::uv_sphere(8, 4),
        Vec3::ZERO,
        InstanceFlags::default(),
        reflective(),
    );
    let view = agent.default_view();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    let probe = scene.mesh(sphere).unwrap().gpu.probe;

    device.simulate_device_loss();
    agent.on_device_lost();
    agent.on_device_reset().unwrap();
    agent.render_scene(view, &mut scene, &camera()).unwrap();

    // Same handle, new contents.
    assert_eq!(scene.mesh(sphere).unwrap().gpu.probe, probe);
    assert_eq!(agent.stats().reflection_refreshes, 1);
    agent.shutdown();
}

#[test]
fn test_released_scene_probes_free_their_cubes() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let view = agent.default_view();
    let sphere = MeshData::uv_sphere(8, 4);
    let baseline = agent.resource_cache().target_count();
    let live_baseline = device.live_render_targets();

    for _ in 0..5 {
        let mut scene = Scene::new();
        add_mesh(
            &mut agent,
            &mut scene,
            &sphere,
            Vec3::ZERO,
            InstanceFlags::default(),
            reflective(),
        );
        agent.render_scene(view, &mut scene, &camera()).unwrap();
        assert_eq!(agent.resource_cache().probe_count(), 1);

        agent.release_scene_probes(&mut scene);
        assert!(scene.meshes.iter().all(|m| m.gpu.probe.is_none()));
    }

    assert_eq!(agent.resource_cache().probe_count(), 0);
    assert_eq!(agent.resource_cache().target_count(), baseline);
    assert_eq!(device.live_render_targets(), live_baseline);
    agent.shutdown();
}

#[test]
fn test_released_probe_is_rebuilt_on_next_frame() {
    let device = device();
    let mut agent = renderer(&device, settings(GlobalLevel::High), DebugSettings::default());
    let mut scene = Scene::new();
    let sphere = add_mesh(
        &mut agent,
        &mut scene,
        &MeshData::uv_sphere(8, 4),
        Vec3::ZERO,
        InstanceFlags::default(),
        reflective(),
    );
    let view = agent.default_view();
    agent.render_scene(view, &mut scene, &camera()).unwrap();
    let old = scene.mesh(sphere).unwrap().gpu.probe.unwrap();

    agent.release_probe(old);
    assert_eq!(agent.resource_cache().probe_count(), 0);

    agent.render_scene(view, &mut scene, &camera()).unwrap();
    let new = scene.mesh(sphere).unwrap().gpu.probe.unwrap();
    assert_ne!(new, old);
    assert_eq!(agent.resource_cache().probe_count(), 1);
    assert_eq!(agent.stats().reflection_refreshes, 1);
    agent.shutdown();
}
