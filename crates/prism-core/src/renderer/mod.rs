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

//! # Renderer contracts
//!
//! The types in this module are shared by the pass executors (lanes), the
//! orchestrator (agents) and the backends (infra):
//!
//! - [`GraphicsDevice`] and [`RenderPass`] abstract the GPU. A device owns
//!   textures, buffers, state objects and swap chains, and reports a
//!   [`DeviceState`](api::DeviceState) the host polls once per frame.
//! - [`settings`] holds the quality knobs and their negotiation against the
//!   ceilings derived from [`DeviceCaps`](api::DeviceCaps).
//! - [`light`] and [`stats`] hold per-scene lighting parameters and the
//!   frame counters.

pub mod api;
pub mod error;
pub mod light;
pub mod settings;
pub mod stats;
pub mod traits;

pub use self::error::{RenderError, ResourceError};
pub use self::settings::{DebugSettings, MaxRenderSettings, RenderSettings};
pub use self::stats::{CommandMode, RenderStats};
pub use self::traits::{GraphicsDevice, RenderPass, StateCache};
