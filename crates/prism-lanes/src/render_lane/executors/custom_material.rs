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

//! Meshes shaded by a named effect.

use super::{mesh_draw, texture_or_white};
use crate::render_lane::executor::{DrawStates, StateSet};
use crate::render_lane::lighting::point_light_color;
use crate::render_lane::{Command, GpuMesh, GpuResolver, RenderContext, RenderExecutor};
use ahash::AHashMap;
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::math::Mat4;
use prism_core::renderer::api::{AddressMode, BlendMode, PassKind, ShadeParams};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::{InstanceId, LightingData, Material, MaterialKind, Scene};

/// How a named effect draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomEffect {
    /// Blending against the target.
    pub blend: BlendMode,
    /// Receives sun and point lighting.
    pub lit: bool,
}

/// Draws every instance whose material is [`MaterialKind::Custom`].
#[derive(Debug)]
pub struct CustomMaterialExecutor {
    effects: AHashMap<String, CustomEffect>,
    states: StateSet,
    by_blend: AHashMap<BlendMode, DrawStates>,
}

impl Default for CustomMaterialExecutor {
    fn default() -> Self {
        let mut effects = AHashMap::new();
        effects.insert(
            "unlit".to_owned(),
            CustomEffect {
                blend: BlendMode::Opaque,
                lit: false,
            },
        );
        effects.insert(
            "additive".to_owned(),
            CustomEffect {
                blend: BlendMode::Additive,
                lit: false,
            },
        );
        effects.insert(
            "multiply".to_owned(),
            CustomEffect {
                blend: BlendMode::Multiply,
                lit: false,
            },
        );
        effects.insert(
            "lit_alpha".to_owned(),
            CustomEffect {
                blend: BlendMode::Alpha,
                lit: true,
            },
        );
        Self {
            effects,
            states: StateSet::default(),
            by_blend: AHashMap::new(),
        }
    }
}

impl CustomMaterialExecutor {
    /// Creates an uninitialised executor with the built-in effects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a named effect.
    pub fn register_effect(&mut self, name: impl Into<String>, effect: CustomEffect) {
        self.effects.insert(name.into(), effect);
    }

    /// The effect drawn for `name`. Unknown names fall back to `unlit`.
    pub fn effect(&self, name: &str) -> CustomEffect {
        self.effects.get(name).copied().unwrap_or(CustomEffect {
            blend: BlendMode::Opaque,
            lit: false,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn gather_one(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        id: InstanceId,
        mesh: Option<GpuMesh>,
        transform: Mat4,
        material: &Material,
        lighting: &LightingData,
        out: &mut Vec<Command>,
    ) {
        let MaterialKind::Custom(name) = &material.kind else {
            return;
        };
        let Some(mesh) = mesh else {
            return;
        };
        let effect = self.effect(name);
        let Some(states) = self.by_blend.get(&effect.blend) else {
            return;
        };
        let shade = effect.lit.then(|| ShadeParams {
            point_lights: point_light_color(&scene.point_lights, lighting),
            ..ctx.shade
        });
        let mode = if effect.blend == BlendMode::Opaque {
            CommandMode::Solid
        } else {
            CommandMode::Transparent
        };
        out.push(Command::draw(
            mode,
            mesh_draw(
                id.0,
                mesh,
                transform,
                ctx,
                material.diffuse,
                shade,
                effect.blend,
                states,
                texture_or_white(gpu, material.texture),
            ),
        ));
    }
}

impl Lane for CustomMaterialExecutor {
    fn strategy_name(&self) -> &'static str {
        "CustomMaterial"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Render
    }

    fn on_initialize(&mut self, ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        let all = [
            BlendMode::Opaque,
            BlendMode::Alpha,
            BlendMode::Additive,
            BlendMode::Multiply,
        ];
        // Fixed order keeps state acquisition deterministic.
        for blend in all {
            let used = blend == BlendMode::Opaque || self.effects.values().any(|e| e.blend == blend);
            if !used {
                continue;
            }
            let depth_write = blend == BlendMode::Opaque;
            let states = DrawStates::acquire(
                &mut self.states,
                ctx,
                (true, depth_write),
                blend,
                AddressMode::Repeat,
            )?;
            self.by_blend.insert(blend, states);
        }
        Ok(())
    }

    fn on_shutdown(&mut self, ctx: &mut LaneContext<'_>) {
        self.states.release_all(ctx);
        self.by_blend.clear();
    }

    fn is_initialized(&self) -> bool {
        !self.by_blend.is_empty()
    }
}

impl RenderExecutor for CustomMaterialExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        matches!(pass, PassKind::Lighting | PassKind::Reflection)
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        for &i in &ctx.visible.meshes {
            let m = &scene.meshes[i];
            self.gather_one(
                ctx,
                scene,
                gpu,
                m.id,
                gpu.mesh(m.mesh),
                m.transform,
                &m.material,
                &m.lighting,
                out,
            );
        }
        for &i in &ctx.visible.skin_meshes {
            let m = &scene.skin_meshes[i];
            self.gather_one(
                ctx,
                scene,
                gpu,
                m.id,
                gpu.skin_mesh(m.mesh),
                m.transform,
                &m.material,
                &m.lighting,
                out,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_effects_fall_back_to_unlit() {
        let mut exec = CustomMaterialExecutor::new();
        assert_eq!(exec.effect("additive").blend, BlendMode::Additive);
        assert_eq!(exec.effect("no such effect").blend, BlendMode::Opaque);

        exec.register_effect(
            "ghost",
            CustomEffect {
                blend: BlendMode::Alpha,
                lit: false,
            },
        );
        assert_eq!(exec.effect("ghost").blend, BlendMode::Alpha);
    }
}
