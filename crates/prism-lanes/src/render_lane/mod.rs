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

//! Rendering lane - hot path of the pass sequence.
//!
//! The orchestrator builds one [`RenderContext`] per pass, lets every
//! [`Executor`] accepting the pass gather [`Command`]s into a
//! [`CommandList`], then executes each executor's slice in registration
//! order. There is no ordering guarantee across executors beyond that.

mod command;
mod context;
mod executor;
pub mod executors;
pub mod lighting;
mod resolver;
pub mod shadow;

pub use self::command::{Command, CommandList, CommandOp};
pub use self::context::{
    casts_into, ContextFlags, PassSetup, RenderContext, ShadowInputs, VisibleSet,
};
pub use self::executor::{DrawStates, RenderExecutor, StateSet};
pub use self::executors::Executor;
pub use self::lighting::{compute_lighting, update_scene_lighting, MAX_POINT_LIGHTS};
pub use self::resolver::{BuiltinMesh, DefaultTexture, GpuMesh, GpuResolver};
