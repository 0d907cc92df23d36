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

//! Hardware capabilities reported by a device.

use super::resource::TextureFormat;
use crate::renderer::settings::MsaaLevel;
use serde::{Deserialize, Serialize};

/// Pixel shader model supported by the hardware, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderModel {
    /// Fixed function only.
    None,
    /// Pixel shader 1.1.
    Ps1_1,
    /// Pixel shader 1.4.
    Ps1_4,
    /// Pixel shader 2.0.
    Ps2_0,
    /// Pixel shader 2.a.
    Ps2a,
    /// Pixel shader 2.b.
    Ps2b,
    /// Pixel shader 3.0.
    Ps3_0,
}

/// A full-screen resolution the adapter can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Refresh rate in hertz.
    pub refresh_rate: u32,
}

impl DisplayMode {
    /// Creates a display mode.
    pub const fn new(width: u32, height: u32, refresh_rate: u32) -> Self {
        Self {
            width,
            height,
            refresh_rate,
        }
    }

    fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }
}

/// Capability queries answered by the device at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCaps {
    /// Human readable adapter name.
    pub adapter_name: String,
    /// Highest supported pixel shader model.
    pub pixel_shader: ShaderModel,
    /// 16-bit float textures can be rendered into.
    pub float16_textures: bool,
    /// 16-bit float render targets support blending.
    pub float16_blending: bool,
    /// Separate blending operations are available.
    pub blending_ops: bool,
    /// Maximum anisotropic filtering ratio.
    pub max_anisotropy: u32,
    /// Highest multisampling level.
    pub max_msaa: MsaaLevel,
    /// Largest texture side in texels.
    pub max_texture_size: u32,
    /// Total video memory in bytes.
    pub video_memory: u64,
    /// Full-screen modes, in no particular order.
    pub display_modes: Vec<DisplayMode>,
    /// Formats usable as render targets.
    pub render_target_formats: Vec<TextureFormat>,
}

impl DeviceCaps {
    /// A pixel shader 3.0 adapter with float targets and every feature.
    pub fn high_end() -> Self {
        Self {
            adapter_name: "High end adapter".to_owned(),
            pixel_shader: ShaderModel::Ps3_0,
            float16_textures: true,
            float16_blending: true,
            blending_ops: true,
            max_anisotropy: 16,
            max_msaa: MsaaLevel::X8,
            max_texture_size: 8192,
            video_memory: 512 * 1024 * 1024,
            display_modes: vec![
                DisplayMode::new(800, 600, 60),
                DisplayMode::new(1024, 768, 60),
                DisplayMode::new(1280, 720, 60),
                DisplayMode::new(1920, 1080, 60),
            ],
            render_target_formats: vec![
                TextureFormat::Rgba8Unorm,
                TextureFormat::Rgba16Float,
                TextureFormat::Depth24Stencil8,
            ],
        }
    }

    /// A pixel shader 2.0 adapter without float targets.
    pub fn shader_model_2() -> Self {
        Self {
            adapter_name: "Shader model 2 adapter".to_owned(),
            pixel_shader: ShaderModel::Ps2_0,
            float16_textures: false,
            float16_blending: false,
            blending_ops: false,
            max_anisotropy: 4,
            max_msaa: MsaaLevel::X2,
            max_texture_size: 2048,
            video_memory: 128 * 1024 * 1024,
            render_target_formats: vec![TextureFormat::Rgba8Unorm, TextureFormat::Depth24Stencil8],
            ..Self::high_end()
        }
    }

    /// A fixed-function adapter.
    pub fn fixed_function() -> Self {
        Self {
            adapter_name: "Fixed function adapter".to_owned(),
            pixel_shader: ShaderModel::Ps1_1,
            max_anisotropy: 1,
            max_msaa: MsaaLevel::None,
            ..Self::shader_model_2()
        }
    }

    /// Returns `true` if `format` can be rendered into.
    pub fn supports_render_target(&self, format: TextureFormat) -> bool {
        self.render_target_formats.contains(&format)
    }

    /// The display mode closest in area to `width x height`.
    ///
    /// Ties go to the larger mode. Returns `None` when no mode is reported.
    pub fn best_display_mode(&self, width: u32, height: u32) -> Option<DisplayMode> {
        let wanted = i64::from(width) * i64::from(height);
        self.display_modes
            .iter()
            .copied()
            .min_by_key(|m| ((m.area() - wanted).abs(), -m.area()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_display_mode_picks_closest_area() {
        let caps = DeviceCaps::high_end();
        let best = caps.best_display_mode(1000, 700).unwrap();
        assert_eq!((best.width, best.height), (1024, 768));
        let exact = caps.best_display_mode(1920, 1080).unwrap();
        assert_eq!((exact.width, exact.height), (1920, 1080));
    }

    #[test]
    fn test_best_display_mode_empty() {
        let caps = DeviceCaps {
            display_modes: Vec::new(),
            ..DeviceCaps::high_end()
        };
        assert!(caps.best_display_mode(640, 480).is_none());
    }

    #[test]
    fn test_shader_models_are_ordered() {
        assert!(ShaderModel::Ps2a > ShaderModel::Ps2_0);
        assert!(ShaderModel::Ps1_4 < ShaderModel::Ps2_0);
    }
}
