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

//! Full-screen post-processing of the lit buffer.

use crate::render_lane::{Command, GpuResolver, RenderContext, RenderExecutor};
use prism_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use prism_core::renderer::api::{BlendMode, BlitOp, FullscreenEffect, PassKind, TargetView};
use prism_core::renderer::stats::CommandMode;
use prism_core::scene::{PostFxSettings, Scene};

/// Composites the glow buffer, then applies the camera's post-processing chain.
#[derive(Debug, Default)]
pub struct PostFxExecutor {
    initialized: bool,
}

impl PostFxExecutor {
    /// Creates an uninitialised executor.
    pub fn new() -> Self {
        Self::default()
    }
}

/// The effects of `fx`, in application order.
pub fn post_fx_chain(fx: &PostFxSettings) -> Vec<FullscreenEffect> {
    let mut chain = Vec::new();
    if fx.radial_blur > 0.0 {
        chain.push(FullscreenEffect::RadialBlur {
            strength: fx.radial_blur.min(1.0),
        });
    }
    if fx.saturation != 1.0 {
        chain.push(FullscreenEffect::Saturation(fx.saturation));
    }
    if fx.brightness != 1.0 {
        chain.push(FullscreenEffect::Brightness(fx.brightness));
    }
    if fx.fade > 0.0 {
        chain.push(FullscreenEffect::Fade {
            color: fx.fade_color,
            amount: fx.fade.min(1.0),
        });
    }
    chain
}

impl Lane for PostFxExecutor {
    fn strategy_name(&self) -> &'static str {
        "PostFx"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::PostProcess
    }

    fn on_initialize(&mut self, _ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        self.initialized = true;
        Ok(())
    }

    fn on_shutdown(&mut self, _ctx: &mut LaneContext<'_>) {
        self.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl RenderExecutor for PostFxExecutor {
    fn accepts(&self, pass: PassKind) -> bool {
        pass == PassKind::PostFx
    }

    fn gather_commands(
        &self,
        ctx: &RenderContext,
        _scene: &Scene,
        _gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    ) {
        if !self.initialized {
            return;
        }
        if let Some(glow) = ctx.glow_texture {
            out.push(Command::blit(
                CommandMode::Solid,
                BlitOp::copy(TargetView::whole(glow)).blended(BlendMode::Additive),
            ));
        }
        if ctx.settings.post_fx {
            for effect in post_fx_chain(&ctx.camera.post_fx) {
                out.push(Command::effect(CommandMode::Solid, effect));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::math::LinearRgba;

    #[test]
    fn test_identity_settings_have_no_effects() {
        let fx = PostFxSettings::default();
        assert!(fx.is_identity());
        assert!(post_fx_chain(&fx).is_empty());
    }

    #[test]
    fn test_chain_order() {
        let fx = PostFxSettings {
            fade_color: LinearRgba::RED,
            fade: 2.0,
            radial_blur: 0.3,
            saturation: 0.0,
            brightness: 1.0,
        };
        assert_eq!(
            post_fx_chain(&fx),
            vec![
                FullscreenEffect::RadialBlur { strength: 0.3 },
                FullscreenEffect::Saturation(0.0),
                FullscreenEffect::Fade {
                    color: LinearRgba::RED,
                    amount: 1.0
                },
            ]
        );
    }
}
