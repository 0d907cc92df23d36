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

//! Process-wide logger installation.

use env_logger::{Builder, Env, WriteStyle};
use serde::{Deserialize, Serialize};
use std::sync::Once;

static INIT: Once = Once::new();

/// When to colorize log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogWriteStyle {
    /// Colorize when writing to a terminal.
    #[default]
    Auto,
    /// Always colorize.
    Always,
    /// Never colorize.
    Never,
}

impl From<LogWriteStyle> for WriteStyle {
    fn from(style: LogWriteStyle) -> Self {
        match style {
            LogWriteStyle::Auto => WriteStyle::Auto,
            LogWriteStyle::Always => WriteStyle::Always,
            LogWriteStyle::Never => WriteStyle::Never,
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `env_logger` filter such as `"info,prism_agents=debug"`.
    /// `None` defers to `RUST_LOG`, then to `info`.
    pub env_filter: Option<String>,
    /// Output coloring.
    pub write_style: LogWriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: LogWriteStyle::Auto,
        }
    }
}

/// Installs the global logger. Only the first call has an effect.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
        if let Some(filter) = &config.env_filter {
            builder.parse_filters(filter);
        }
        builder.write_style(config.write_style.into());
        // Tests may have installed a logger already.
        if builder.try_init().is_err() {
            log::debug!("Logger already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig {
            env_filter: Some("warn".into()),
            ..LoggingConfig::default()
        };
        init_logging(&config);
        init_logging(&config);
        log::warn!("logger installed once");
    }
}
