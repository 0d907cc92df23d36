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

//! Renderer configuration, loadable from RON.

use anyhow::Context;
use prism_core::renderer::{DebugSettings, RenderSettings};
use prism_telemetry::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default edge of a reflection cube face, in texels.
pub const DEFAULT_REFLECTION_CUBE_SIZE: u32 = 128;

/// Everything [`RenderAgent::new`](crate::RenderAgent::new) is configured with.
///
/// Missing fields take their default, so a file may list only what it
/// overrides:
///
/// ```ron
/// (
///     settings: (width: 1280, height: 720, shadow: High),
///     debug: (render_mode: HqPreview),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Requested settings, clamped to the device at startup.
    pub settings: RenderSettings,
    /// Initial debug switches.
    pub debug: DebugSettings,
    /// Edge of a reflection cube face, clamped to the device texture limit.
    pub reflection_cube_size: u32,
    /// Logger setup, applied by the host through `prism_telemetry::init_logging`.
    pub logging: LoggingConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            settings: RenderSettings::default(),
            debug: DebugSettings::default(),
            reflection_cube_size: DEFAULT_REFLECTION_CUBE_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Parses a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Reads and parses the RON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read renderer config {}", path.display()))?;
        let config = Self::from_ron_str(&source)
            .with_context(|| format!("Failed to parse renderer config {}", path.display()))?;
        log::debug!("RendererConfig: Loaded {}", path.display());
        Ok(config)
    }

    /// Serializes the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::settings::{RenderMode, ShadowLevel};
    use std::io::Write;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = RendererConfig::from_ron_str(
            "(settings: (width: 640, height: 480, shadow: High), debug: (render_mode: HqPreview))",
        )
        .unwrap();
        assert_eq!(config.settings.width, 640);
        assert_eq!(config.settings.shadow, ShadowLevel::High);
        assert_eq!(config.settings.texture, RenderSettings::default().texture);
        assert_eq!(config.debug.render_mode, RenderMode::HqPreview);
        assert_eq!(config.reflection_cube_size, DEFAULT_REFLECTION_CUBE_SIZE);
    }

    #[test]
    fn test_pretty_output_parses_back() {
        let mut config = RendererConfig::default();
        config.reflection_cube_size = 64;
        config.logging.env_filter = Some("debug".to_string());
        let text = config.to_ron_string().unwrap();
        assert_eq!(RendererConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_reports_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(settings: (width: oops))").unwrap();
        let err = RendererConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse renderer config"));
    }
}
