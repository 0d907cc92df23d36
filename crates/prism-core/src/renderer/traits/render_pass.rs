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

use crate::renderer::api::{BlitOp, DrawCall, FullscreenEffect, StateDescriptor, StateId};
use crate::renderer::error::ResourceError;

/// An active render pass, recording into the target it was begun with.
///
/// Passes are immediate: each call is executed before the next one.
pub trait RenderPass {
    /// Draws an indexed mesh.
    fn draw(&mut self, call: &DrawCall) -> Result<(), ResourceError>;

    /// Copies a texture into the target.
    fn blit(&mut self, op: &BlitOp) -> Result<(), ResourceError>;

    /// Applies a full-screen effect to the target.
    fn apply(&mut self, effect: &FullscreenEffect) -> Result<(), ResourceError>;
}

/// Deduplicated access to state objects, keyed by descriptor.
///
/// Executors acquire the states they need when they are initialised and
/// release them when they are shut down.
pub trait StateCache {
    /// Returns the shared state object for `descriptor`, creating it on the first request.
    fn acquire(&mut self, descriptor: &StateDescriptor) -> Result<StateId, ResourceError>;

    /// Drops one reference to a state object.
    fn release(&mut self, id: StateId);
}
