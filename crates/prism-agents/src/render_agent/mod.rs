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

//! Acts as the **[A]gent** for the rendering subsystem.
//!
//! The agent owns the frame. It decides which passes run and in what order,
//! keeps the device objects alive across a lost/reset cycle and hands the
//! command generation to the executors of `prism_lanes::render_lane`.
//!
//! A frame of [`RenderAgent::render_scenes`] runs, per scene:
//! 1. the static sun shadow, only in the high-quality preview mode;
//! 2. the dynamic shadow splits, when a visible mesh receives them;
//! 3. the stale reflection probes and the planar water reflection;
//! 4. the lighting pass into the light buffer.
//!
//! Then, once for the frame: glow, post-fx and the debug overlay. The HUD is
//! drawn by a separate call before presenting.
//!
//! Probe and water reflections render the scene again through the same entry
//! point with a context flag set; the flag disables steps 1 to 3, so a mesh
//! reflecting another reflective mesh never recurses.

mod agent;
mod device_manager;
pub(crate) mod pass_sequence;
mod reflection;
pub mod resource_cache;
mod shadow;
mod uploads;
pub mod view;

pub use agent::RenderAgent;
pub use device_manager::DeviceLifecycleManager;
pub use resource_cache::{ResourceCache, TargetDescriptor};
pub use view::RenderView;
