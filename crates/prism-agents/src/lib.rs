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

//! # Prism Agents
//!
//! Control plane of the renderer. [`RenderAgent`] sequences the passes of a
//! frame, drives the device through loss and reset, refreshes reflection
//! probes and runs the offline bakes. GPU objects are owned by the
//! [`ResourceCache`](render_agent::ResourceCache), which the agent reaches
//! through its [`DeviceLifecycleManager`](render_agent::DeviceLifecycleManager).

#![warn(missing_docs)]

pub mod bake_agent;
pub mod config;
pub mod lock;
pub mod render_agent;

pub use self::bake_agent::BakeAgent;
pub use self::config::RendererConfig;
pub use self::lock::{RenderLock, SharedRenderer};
pub use self::render_agent::{RenderAgent, RenderView};
