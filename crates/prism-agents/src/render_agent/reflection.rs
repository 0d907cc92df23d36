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

//! Reflection probes and planar water reflections.
//!
//! Both are sub-renders of the scene through [`RenderAgent::render_scene_into`].
//! A sub-render carries a context flag that switches off every pre-pass, so
//! recursion stops after one level whatever the scene contains.

use super::agent::{RenderAgent, SceneTarget};
use prism_core::math::Vec3;
use prism_core::renderer::api::{CubeFace, PassKind, RenderTargetHandle, TargetView, TextureId};
use prism_core::renderer::{RenderError, ResourceError};
use prism_core::scene::{Camera, Scene};
use prism_lanes::render_lane::ContextFlags;

impl RenderAgent {
    /// Refreshes the stale probes of the reflective meshes among `visible`.
    ///
    /// A probe is stale when the scene asked for a refresh, when it was just
    /// created or when its contents were lost with the device.
    pub(super) fn refresh_probes(
        &mut self,
        scene: &mut Scene,
        visible: &[usize],
        camera: &Camera,
    ) -> Result<(), RenderError> {
        let must_update = scene.must_update_reflections();
        for &index in visible {
            let instance = &scene.meshes[index];
            if !instance.material.is_reflective() || instance.gpu.updating_reflection {
                continue;
            }
            let stale = match instance.gpu.probe {
                Some(probe) => must_update || !self.fresh_probes.contains(&probe),
                None => true,
            };
            if stale {
                self.refresh_probe(scene, index, camera)?;
            }
        }
        Ok(())
    }

    fn refresh_probe(
        &mut self,
        scene: &mut Scene,
        index: usize,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        let size = self.reflection_cube_size;
        let current = scene.meshes[index]
            .gpu
            .probe
            .filter(|&probe| self.manager.cache().probe_target(probe).is_some());
        let probe = match current {
            Some(probe) => probe,
            None => {
                let probe = self.manager.cache_mut().create_probe(size)?;
                scene.meshes[index].gpu.probe = Some(probe);
                probe
            }
        };
        let cube = self
            .manager
            .cache()
            .probe_target(probe)
            .and_then(|target| self.manager.cache().target_texture(target))
            .ok_or(ResourceError::InvalidHandle)?;

        // The instance must not appear in its own reflection.
        let instance = &mut scene.meshes[index];
        let center = instance.bounds().center();
        let was_hidden = instance.gpu.hidden;
        instance.gpu.hidden = true;
        instance.gpu.updating_reflection = true;
        log::trace!(
            "RenderAgent: Refreshing probe {:?} of instance {}",
            probe,
            instance.id.0
        );

        let result = self.render_probe_faces(scene, cube, size, center, camera);

        let instance = &mut scene.meshes[index];
        instance.gpu.hidden = was_hidden;
        instance.gpu.updating_reflection = false;
        result?;

        self.fresh_probes.insert(probe);
        self.stats.reflection_refreshes += 1;
        Ok(())
    }

    fn render_probe_faces(
        &mut self,
        scene: &mut Scene,
        cube: TextureId,
        size: u32,
        center: Vec3,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        for face in CubeFace::ALL {
            let face_camera = Camera::cube_face(center, face, camera.near, camera.far);
            let target = SceneTarget {
                pass: PassKind::Reflection,
                view: TargetView::face(cube, face),
                size: (size, size),
                clear: true,
                water_buffer: None,
            };
            self.render_scene_into(
                scene,
                &face_camera,
                &target,
                ContextFlags::IN_REFLECTION_UPDATE,
            )?;
            self.stats.reflection_faces += 1;
        }
        Ok(())
    }

    /// Renders the scene mirrored about `level` into `buffer`.
    pub(super) fn render_water_reflection(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        buffer: RenderTargetHandle,
        level: f32,
    ) -> Result<TextureId, RenderError> {
        let cache = self.manager.cache();
        let texture = cache
            .target_texture(buffer)
            .ok_or(ResourceError::InvalidHandle)?;
        let size = cache
            .target_descriptor(buffer)
            .map(|d| d.size())
            .ok_or(ResourceError::InvalidHandle)?;
        let target = SceneTarget {
            pass: PassKind::Reflection,
            view: TargetView::whole(texture),
            size,
            clear: true,
            water_buffer: None,
        };
        self.render_scene_into(
            scene,
            &camera.reflected(level),
            &target,
            ContextFlags::IN_WATER_REFLECTION,
        )?;
        Ok(texture)
    }
}
