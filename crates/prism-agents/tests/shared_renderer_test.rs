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

//! Uploads from a streaming thread interleaved with rendering.

mod common;

use common::{camera, device, renderer, settings};
use prism_agents::SharedRenderer;
use prism_core::math::Mat4;
use prism_core::renderer::api::{MeshData, PassKind};
use prism_core::renderer::settings::GlobalLevel;
use prism_core::renderer::DebugSettings;
use prism_core::scene::{Material, MeshInstance, Scene};
use std::thread;

#[test]
fn test_streaming_thread_uploads_while_rendering() {
    let device = device();
    let shared = SharedRenderer::new(renderer(
        &device,
        settings(GlobalLevel::Medium),
        DebugSettings::default(),
    ));

    let streamer = {
        let shared = shared.clone();
        thread::spawn(move || {
            let mesh = MeshData::unit_cube();
            (0..8)
                .map(|_| shared.lock().upload_mesh(&mesh).unwrap())
                .collect::<Vec<_>>()
        })
    };

    let mut scene = Scene::new();
    for _ in 0..4 {
        let mut renderer = shared.lock();
        let view = renderer.default_view();
        renderer.render_scene(view, &mut scene, &camera()).unwrap();
        renderer.unlock();
    }
    let handles = streamer.join().unwrap();
    assert_eq!(handles.len(), 8);

    let mesh = MeshData::unit_cube();
    for handle in &handles {
        scene.add_mesh(MeshInstance::new(*handle, mesh.bounds(), Mat4::IDENTITY, Material::default()));
    }
    device.take_frame_log();
    {
        let mut renderer = shared.lock();
        let view = renderer.default_view();
        renderer.render_scene(view, &mut scene, &camera()).unwrap();
    }
    let log = device.take_frame_log();
    let lighting = log.passes_of(PassKind::Lighting).next().unwrap();
    assert_eq!(lighting.draws.len(), handles.len());

    let mut agent = shared.into_inner().unwrap();
    agent.shutdown();
}

#[test]
fn test_try_lock_reports_contention() {
    let device = device();
    let shared = SharedRenderer::new(renderer(
        &device,
        settings(GlobalLevel::Low),
        DebugSettings::default(),
    ));
    let other = shared.clone();

    let guard = shared.lock();
    assert!(other.try_lock().is_none());
    guard.unlock();
    assert!(other.try_lock().is_some());

    drop(other);
    shared.into_inner().unwrap().shutdown();
}
