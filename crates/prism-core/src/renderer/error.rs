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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Device loss is not represented here: it is observed by polling
//! [`DeviceState`] once per frame and never travels through `Err`.

use super::api::DeviceState;
use std::fmt;

/// An error related to the creation or use of a GPU resource (buffers, textures, states).
#[derive(Debug)]
pub enum ResourceError {
    /// A resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// The allocation would exceed the device's video memory.
    OutOfVideoMemory {
        /// Bytes requested by the failing allocation.
        requested: u64,
        /// Bytes still available when the request was made.
        available: u64,
    },
    /// Render-target-bound objects cannot be created in the current device state.
    DeviceNotReady(DeviceState),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfVideoMemory {
                requested,
                available,
            } => write!(
                f,
                "Out of video memory: requested {requested} bytes, {available} bytes available"
            ),
            ResourceError::DeviceNotReady(state) => {
                write!(f, "Device is not ready for render targets (state: {state})")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error that can occur within the rendering system.
#[derive(Debug)]
pub enum RenderError {
    /// The renderer was used before its executors were initialised.
    NotInitialized,
    /// Construction of the renderer failed because of its configuration.
    InitializationFailed(String),
    /// The hardware does not expose a capability the configuration needs.
    UnsupportedCapability(String),
    /// The device reported an unrecoverable driver failure.
    DeviceError(String),
    /// A resource-related error occurred.
    ResourceError(ResourceError),
    /// An unexpected internal error.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => write!(f, "Rendering system not initialized."),
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize rendering system: {msg}")
            }
            RenderError::UnsupportedCapability(msg) => {
                write!(f, "Unsupported device capability: {msg}")
            }
            RenderError::DeviceError(msg) => write!(f, "Graphics device error: {msg}"),
            RenderError::ResourceError(err) => write!(f, "Resource error: {err}"),
            RenderError::Internal(msg) => write!(f, "Internal rendering error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl RenderError {
    /// Returns `true` when the error is a video memory exhaustion the caller may
    /// react to by lowering quality settings.
    pub fn is_out_of_video_memory(&self) -> bool {
        matches!(
            self,
            RenderError::ResourceError(ResourceError::OutOfVideoMemory { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn out_of_video_memory_display() {
        let err = ResourceError::OutOfVideoMemory {
            requested: 4096,
            available: 1024,
        };
        let msg = format!("{err}");
        assert!(msg.contains("4096"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn render_error_wraps_resource_error() {
        let err: RenderError = ResourceError::OutOfVideoMemory {
            requested: 1,
            available: 0,
        }
        .into();
        assert!(err.is_out_of_video_memory());
        assert!(err.source().is_some());
        assert!(format!("{err}").starts_with("Resource error:"));
    }

    #[test]
    fn configuration_errors_have_no_source() {
        let err = RenderError::UnsupportedCapability("pixel shader 2.0".into());
        assert!(err.source().is_none());
        assert_eq!(
            format!("{err}"),
            "Unsupported device capability: pixel shader 2.0"
        );
    }

    #[test]
    fn device_not_ready_display() {
        let err = ResourceError::DeviceNotReady(DeviceState::Lost);
        assert!(format!("{err}").contains("LOST"));
    }
}
