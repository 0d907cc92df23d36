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

//! # Lane Abstraction
//!
//! A **Lane** is a swappable processing strategy owned by an agent. In the
//! renderer every render-pass executor and every offline bake is a lane.
//!
//! ## Lifecycle
//!
//! ```text
//! on_initialize(ctx)  →  [ gather / execute ]*  →  on_shutdown(ctx)
//! ```
//!
//! `on_initialize` creates the device-dependent state of the lane (state
//! objects, scratch targets). It runs once at renderer start and again after
//! every device reset. `on_shutdown` releases that state; it runs before a
//! reset and when the renderer is destroyed.

use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::settings::{DebugSettings, RenderSettings};
use crate::renderer::traits::{GraphicsDevice, StateCache};
use std::fmt;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The lane has not been initialized yet.
    NotInitialized,
    /// A resource the lane expected was missing.
    InvalidContext {
        /// What the lane expected.
        expected: &'static str,
        /// Description of what was received.
        received: String,
    },
    /// A domain-specific error occurred during execution.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
    /// A domain-specific error occurred during initialization.
    InitializationFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::NotInitialized => write!(f, "Lane not initialized"),
            LaneError::InvalidContext { expected, received } => {
                write!(f, "Invalid lane context: expected {expected}, got {received}")
            }
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
            LaneError::InitializationFailed(e) => write!(f, "Lane initialization failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) | LaneError::InitializationFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl LaneError {
    /// Convenience constructor for a missing resource.
    pub fn missing(what: &'static str) -> Self {
        LaneError::InvalidContext {
            expected: what,
            received: "not resolved".into(),
        }
    }
}

impl From<ResourceError> for LaneError {
    fn from(e: ResourceError) -> Self {
        LaneError::ExecutionFailed(Box::new(e))
    }
}

impl From<LaneError> for RenderError {
    fn from(e: LaneError) -> Self {
        match e {
            LaneError::ExecutionFailed(inner) | LaneError::InitializationFailed(inner) => {
                match inner.downcast::<ResourceError>() {
                    Ok(resource) => RenderError::ResourceError(*resource),
                    Err(other) => RenderError::Internal(other.to_string()),
                }
            }
            LaneError::NotInitialized => RenderError::NotInitialized,
            other => RenderError::Internal(other.to_string()),
        }
    }
}

/// Classification of lanes, used for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Scene geometry drawn into the lit buffer.
    Render,
    /// Shadow map generation.
    Shadow,
    /// Full-screen effects over the lit buffer.
    PostProcess,
    /// Debug visualisations and 2D overlays.
    Overlay,
    /// Offline texture generation.
    Bake,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Render => write!(f, "Render"),
            LaneKind::Shadow => write!(f, "Shadow"),
            LaneKind::PostProcess => write!(f, "PostProcess"),
            LaneKind::Overlay => write!(f, "Overlay"),
            LaneKind::Bake => write!(f, "Bake"),
        }
    }
}

// --- LaneContext ---

/// The resources a lane may use while initialising or shutting down.
///
/// Built by the owning agent on the stack and passed to one lane at a time.
pub struct LaneContext<'a> {
    /// The device the lane creates its objects on.
    pub device: &'a dyn GraphicsDevice,
    /// Shared state objects.
    pub states: &'a mut dyn StateCache,
    /// Effective quality settings.
    pub settings: &'a RenderSettings,
    /// Debug visualisation settings.
    pub debug: &'a DebugSettings,
}

impl fmt::Debug for LaneContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneContext")
            .field("device", &self.device)
            .field("settings", self.settings)
            .field("debug", self.debug)
            .finish()
    }
}

/// Base trait for every lane.
pub trait Lane: Send + Sync {
    /// Human-readable name identifying this lane's strategy.
    ///
    /// Used for logging. Unique among the lanes of an agent.
    fn strategy_name(&self) -> &'static str;

    /// The kind of processing this lane performs.
    fn lane_kind(&self) -> LaneKind;

    // --- Lifecycle ---

    /// Creates the device-dependent state of the lane.
    ///
    /// Default is a no-op returning `Ok(())`.
    fn on_initialize(&mut self, _ctx: &mut LaneContext<'_>) -> Result<(), LaneError> {
        Ok(())
    }

    /// Releases the device-dependent state of the lane.
    ///
    /// Must be safe to call on a lane that was never initialised.
    fn on_shutdown(&mut self, _ctx: &mut LaneContext<'_>) {}

    /// Returns `true` between a successful `on_initialize` and `on_shutdown`.
    fn is_initialized(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_errors_survive_conversion_to_render_error() {
        let lane: LaneError = ResourceError::OutOfVideoMemory {
            requested: 10,
            available: 5,
        }
        .into();
        let render: RenderError = lane.into();
        assert!(render.is_out_of_video_memory());
    }

    #[test]
    fn test_missing_names_the_resource() {
        let e = LaneError::missing("quad mesh");
        assert_eq!(
            e.to_string(),
            "Invalid lane context: expected quad mesh, got not resolved"
        );
    }
}
