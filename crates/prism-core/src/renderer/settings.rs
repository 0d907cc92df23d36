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

//! Quality settings and their negotiation against hardware ceilings.
//!
//! Every tier enum is ordered from cheapest to most expensive, so clamping a
//! request against a [`MaxRenderSettings`] is a field-wise `min`.

use super::api::{DeviceCaps, ShaderModel};
use serde::{Deserialize, Serialize};

// --- Tiers ---

/// Shading quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderLevel {
    /// Fixed function fallback, no per-pixel effects.
    None,
    /// Pixel shader 2.0 path.
    Low,
    /// Pixel shader 2.a path without float targets.
    Medium,
    /// Full path with float targets.
    High,
}

/// Shadow quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShadowLevel {
    /// No dynamic shadows.
    None,
    /// 512 texel cascades, no blur.
    Low,
    /// 512 texel cascades, one blur pass.
    Medium,
    /// 1024 texel cascades, one blur pass.
    High,
}

/// Texture resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TextureLevel {
    /// Lowest mip levels are skipped twice.
    Low,
    /// Lowest mip level is skipped once.
    Medium,
    /// Full resolution.
    High,
}

/// Reflection quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReflectionLevel {
    /// Reflections disabled.
    None,
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
}

/// Refraction quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RefractionLevel {
    /// Refraction disabled.
    None,
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
}

/// Texture filtering tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterLevel {
    /// Bilinear filtering.
    Bilinear,
    /// Trilinear filtering.
    Trilinear,
    /// 2x anisotropic.
    Aniso2x,
    /// 4x anisotropic.
    Aniso4x,
    /// 8x anisotropic.
    Aniso8x,
}

impl FilterLevel {
    /// The sampler filter implementing the tier.
    pub fn filter_mode(self) -> super::api::FilterMode {
        use super::api::FilterMode;
        match self {
            FilterLevel::Bilinear => FilterMode::Bilinear,
            FilterLevel::Trilinear => FilterMode::Trilinear,
            FilterLevel::Aniso2x => FilterMode::Anisotropic(2),
            FilterLevel::Aniso4x => FilterMode::Anisotropic(4),
            FilterLevel::Aniso8x => FilterMode::Anisotropic(8),
        }
    }
}

/// Multisampling tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MsaaLevel {
    /// No multisampling.
    None,
    /// 2 samples.
    X2,
    /// 4 samples.
    X4,
    /// 8 samples.
    X8,
}

/// One-knob quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GlobalLevel {
    /// Fixed function look.
    VeryLow,
    /// Low.
    Low,
    /// Medium, the default.
    Medium,
    /// High.
    High,
    /// Everything on.
    VeryHigh,
}

// --- Settings ---

/// The requested (or, once negotiated, effective) renderer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Shading tier.
    pub shader: ShaderLevel,
    /// Shadow tier.
    pub shadow: ShadowLevel,
    /// Texture tier.
    pub texture: TextureLevel,
    /// Reflection tier.
    pub reflection: ReflectionLevel,
    /// Refraction tier.
    pub refraction: RefractionLevel,
    /// Filtering tier.
    pub filter: FilterLevel,
    /// Multisampling tier.
    pub msaa: MsaaLevel,
    /// Back buffer width.
    pub width: u32,
    /// Back buffer height.
    pub height: u32,
    /// Exclusive full-screen.
    pub fullscreen: bool,
    /// Wait for vertical blank.
    pub vsync: bool,
    /// Glow pass enabled.
    pub glow: bool,
    /// Post-processing enabled.
    pub post_fx: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::with_global_level(GlobalLevel::Medium)
    }
}

impl RenderSettings {
    /// Settings of a preset, with a 1x1 windowed resolution.
    pub fn with_global_level(level: GlobalLevel) -> Self {
        let mut settings = Self {
            shader: ShaderLevel::None,
            shadow: ShadowLevel::None,
            texture: TextureLevel::Low,
            reflection: ReflectionLevel::None,
            refraction: RefractionLevel::None,
            filter: FilterLevel::Bilinear,
            msaa: MsaaLevel::None,
            width: 1,
            height: 1,
            fullscreen: false,
            vsync: false,
            glow: false,
            post_fx: false,
        };
        settings.set_global_level(level);
        settings
    }

    /// Overwrites every quality knob with a preset. Resolution and presentation
    /// flags are left alone.
    pub fn set_global_level(&mut self, level: GlobalLevel) {
        use FilterLevel as F;
        use ReflectionLevel as Rl;
        use RefractionLevel as Rr;
        use ShaderLevel as Sh;
        use ShadowLevel as Sd;
        use TextureLevel as T;

        let (shader, shadow, texture, reflection, refraction, filter, msaa, effects) = match level {
            GlobalLevel::VeryLow => (Sh::None, Sd::None, T::Low, Rl::None, Rr::None, F::Bilinear, MsaaLevel::None, false),
            GlobalLevel::Low => (Sh::Low, Sd::None, T::Low, Rl::Low, Rr::Low, F::Trilinear, MsaaLevel::None, true),
            GlobalLevel::Medium => (Sh::Medium, Sd::Low, T::Medium, Rl::Medium, Rr::Medium, F::Aniso2x, MsaaLevel::None, true),
            GlobalLevel::High => (Sh::High, Sd::Medium, T::High, Rl::High, Rr::Medium, F::Aniso4x, MsaaLevel::X2, true),
            GlobalLevel::VeryHigh => (Sh::High, Sd::High, T::High, Rl::High, Rr::High, F::Aniso8x, MsaaLevel::X4, true),
        };
        self.shader = shader;
        self.shadow = shadow;
        self.texture = texture;
        self.reflection = reflection;
        self.refraction = refraction;
        self.filter = filter;
        self.msaa = msaa;
        self.glow = effects;
        self.post_fx = effects;
    }
}

/// The hardware ceiling of every quality knob, computed once from [`DeviceCaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaxRenderSettings {
    /// Highest shading tier.
    pub shader: ShaderLevel,
    /// Highest shadow tier.
    pub shadow: ShadowLevel,
    /// Highest texture tier.
    pub texture: TextureLevel,
    /// Highest reflection tier.
    pub reflection: ReflectionLevel,
    /// Highest refraction tier.
    pub refraction: RefractionLevel,
    /// Highest filtering tier.
    pub filter: FilterLevel,
    /// Highest multisampling tier.
    pub msaa: MsaaLevel,
    /// Glow can be enabled.
    pub glow: bool,
    /// Post-processing can be enabled.
    pub post_fx: bool,
}

impl MaxRenderSettings {
    /// Derives the ceilings from capability queries.
    pub fn from_caps(caps: &DeviceCaps) -> Self {
        let mut max = Self {
            shader: ShaderLevel::None,
            shadow: ShadowLevel::High,
            texture: TextureLevel::High,
            reflection: ReflectionLevel::High,
            refraction: RefractionLevel::None,
            filter: FilterLevel::Trilinear,
            msaa: caps.max_msaa,
            glow: false,
            post_fx: false,
        };

        if caps.pixel_shader >= ShaderModel::Ps2a {
            max.shader = if caps.float16_textures && caps.float16_blending {
                ShaderLevel::High
            } else {
                ShaderLevel::Medium
            };
            max.glow = true;
            max.post_fx = true;
        } else if caps.pixel_shader >= ShaderModel::Ps2_0 {
            max.shader = ShaderLevel::Low;
            max.glow = true;
            max.post_fx = true;
        } else {
            max.shadow = ShadowLevel::None;
            max.reflection = ReflectionLevel::None;
        }

        if caps.pixel_shader >= ShaderModel::Ps2_0 && caps.blending_ops {
            max.refraction = RefractionLevel::High;
        }

        max.filter = match caps.max_anisotropy {
            a if a >= 8 => FilterLevel::Aniso8x,
            a if a >= 4 => FilterLevel::Aniso4x,
            a if a >= 2 => FilterLevel::Aniso2x,
            _ => FilterLevel::Trilinear,
        };
        log::debug!("MaxRenderSettings: Derived {max:?} from '{}'", caps.adapter_name);
        max
    }

    /// Clamps a request field by field and fits its resolution to a display mode.
    pub fn clamp(&self, requested: &RenderSettings, caps: &DeviceCaps) -> RenderSettings {
        let (width, height) = match caps.best_display_mode(requested.width, requested.height) {
            Some(mode) => {
                if (mode.width, mode.height) != (requested.width, requested.height) {
                    log::debug!(
                        "MaxRenderSettings: Fitted {}x{} to display mode {}x{}",
                        requested.width,
                        requested.height,
                        mode.width,
                        mode.height
                    );
                }
                (mode.width, mode.height)
            }
            None => {
                if requested.fullscreen {
                    log::warn!(
                        "MaxRenderSettings: No display mode reported, keeping {}x{} for full screen",
                        requested.width,
                        requested.height
                    );
                }
                (requested.width.max(1), requested.height.max(1))
            }
        };
        RenderSettings {
            shader: requested.shader.min(self.shader),
            shadow: requested.shadow.min(self.shadow),
            texture: requested.texture.min(self.texture),
            reflection: requested.reflection.min(self.reflection),
            refraction: requested.refraction.min(self.refraction),
            filter: requested.filter.min(self.filter),
            msaa: requested.msaa.min(self.msaa),
            width,
            height,
            fullscreen: requested.fullscreen,
            vsync: requested.vsync,
            glow: requested.glow && self.glow,
            post_fx: requested.post_fx && self.post_fx,
        }
    }

    /// Returns `true` if every knob of `settings` is within the ceiling.
    pub fn admits(&self, settings: &RenderSettings) -> bool {
        settings.shader <= self.shader
            && settings.shadow <= self.shadow
            && settings.texture <= self.texture
            && settings.reflection <= self.reflection
            && settings.refraction <= self.refraction
            && settings.filter <= self.filter
            && settings.msaa <= self.msaa
            && (!settings.glow || self.glow)
            && (!settings.post_fx || self.post_fx)
    }
}

// --- Debug ---

/// How the frame is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Regular frame.
    #[default]
    Normal,
    /// Adds the static sun shadow pass.
    HqPreview,
    /// Blits the shadow maps over the frame.
    DebugShadowMap,
}

/// Rasterization fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolygonMode {
    /// Filled triangles.
    #[default]
    Solid,
    /// Triangle edges only.
    Wireframe,
}

/// Editor-facing debug switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Frame composition mode.
    pub render_mode: RenderMode,
    /// Fill mode of scene geometry.
    pub polygon_mode: PolygonMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [GlobalLevel; 5] = [
        GlobalLevel::VeryLow,
        GlobalLevel::Low,
        GlobalLevel::Medium,
        GlobalLevel::High,
        GlobalLevel::VeryHigh,
    ];

    fn all_caps() -> Vec<DeviceCaps> {
        vec![
            DeviceCaps::high_end(),
            DeviceCaps::shader_model_2(),
            DeviceCaps::fixed_function(),
            DeviceCaps {
                pixel_shader: ShaderModel::Ps2a,
                float16_blending: false,
                ..DeviceCaps::high_end()
            },
        ]
    }

    #[test]
    fn test_default_is_medium_preset() {
        let settings = RenderSettings::default();
        assert_eq!(settings.shader, ShaderLevel::Medium);
        assert_eq!(settings.filter, FilterLevel::Aniso2x);
        assert_eq!((settings.width, settings.height), (1, 1));
        assert!(!settings.fullscreen && !settings.vsync);
    }

    #[test]
    fn test_very_low_disables_effects() {
        let settings = RenderSettings::with_global_level(GlobalLevel::VeryLow);
        assert!(!settings.glow && !settings.post_fx);
        assert_eq!(settings.shader, ShaderLevel::None);
    }

    #[test]
    fn test_max_from_caps() {
        let high = MaxRenderSettings::from_caps(&DeviceCaps::high_end());
        assert_eq!(high.shader, ShaderLevel::High);
        assert_eq!(high.refraction, RefractionLevel::High);
        assert_eq!(high.filter, FilterLevel::Aniso8x);

        let sm2 = MaxRenderSettings::from_caps(&DeviceCaps::shader_model_2());
        assert_eq!(sm2.shader, ShaderLevel::Low);
        assert_eq!(sm2.refraction, RefractionLevel::None);
        assert_eq!(sm2.filter, FilterLevel::Aniso4x);
        assert!(sm2.glow);

        let ff = MaxRenderSettings::from_caps(&DeviceCaps::fixed_function());
        assert_eq!(ff.shader, ShaderLevel::None);
        assert_eq!(ff.shadow, ShadowLevel::None);
        assert_eq!(ff.reflection, ReflectionLevel::None);
        assert_eq!(ff.filter, FilterLevel::Trilinear);
        assert!(!ff.glow && !ff.post_fx);
    }

    #[test]
    fn test_ps2a_without_float_blending_is_medium() {
        let caps = DeviceCaps {
            pixel_shader: ShaderModel::Ps2a,
            float16_blending: false,
            ..DeviceCaps::high_end()
        };
        assert_eq!(MaxRenderSettings::from_caps(&caps).shader, ShaderLevel::Medium);
    }

    #[test]
    fn test_clamped_settings_never_exceed_max() {
        for caps in all_caps() {
            let max = MaxRenderSettings::from_caps(&caps);
            for level in LEVELS {
                for fullscreen in [false, true] {
                    let requested = RenderSettings {
                        fullscreen,
                        width: 1600,
                        height: 900,
                        ..RenderSettings::with_global_level(level)
                    };
                    let effective = max.clamp(&requested, &caps);
                    assert!(max.admits(&effective), "{level:?} on {}", caps.adapter_name);
                    assert_eq!(effective.fullscreen, fullscreen);
                }
            }
        }
    }

    #[test]
    fn test_clamp_fits_resolution() {
        let caps = DeviceCaps::high_end();
        let max = MaxRenderSettings::from_caps(&caps);
        let requested = RenderSettings {
            width: 1910,
            height: 1075,
            ..RenderSettings::default()
        };
        let effective = max.clamp(&requested, &caps);
        assert_eq!((effective.width, effective.height), (1920, 1080));
    }
}
