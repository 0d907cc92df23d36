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

//! The two-method contract shared by every executor.

use super::{Command, GpuResolver, RenderContext};
use prism_core::lane::{Lane, LaneContext, LaneError};
use prism_core::renderer::api::{
    AddressMode, BlendMode, PassKind, StateDescriptor, StateId, Vertex,
};
use prism_core::renderer::{RenderPass, ResourceError};
use prism_core::scene::Scene;

/// Translates one drawable category into commands.
///
/// The orchestrator calls [`gather_commands`](Self::gather_commands) on every
/// executor accepting the pass, in registration order, then executes each
/// gathered slice with the executor that produced it.
pub trait RenderExecutor: Lane {
    /// Returns `true` if the executor contributes to passes of this kind.
    fn accepts(&self, pass: PassKind) -> bool;

    /// Appends the commands of this executor for the pass described by `ctx`.
    fn gather_commands(
        &self,
        ctx: &RenderContext,
        scene: &Scene,
        gpu: &dyn GpuResolver,
        out: &mut Vec<Command>,
    );

    /// Submits previously gathered commands to an open pass.
    fn execute_commands(
        &self,
        commands: &[Command],
        pass: &mut dyn RenderPass,
    ) -> Result<(), ResourceError> {
        for command in commands {
            command.submit(pass)?;
        }
        Ok(())
    }
}

/// State objects held by an executor, released together on shutdown.
#[derive(Debug, Default)]
pub struct StateSet {
    held: Vec<StateId>,
}

impl StateSet {
    /// Acquires a state from the shared cache and remembers it.
    pub fn acquire(
        &mut self,
        ctx: &mut LaneContext<'_>,
        descriptor: StateDescriptor,
    ) -> Result<StateId, LaneError> {
        let id = ctx.states.acquire(&descriptor)?;
        self.held.push(id);
        Ok(id)
    }

    /// Releases every held state.
    pub fn release_all(&mut self, ctx: &mut LaneContext<'_>) {
        for id in self.held.drain(..) {
            ctx.states.release(id);
        }
    }

    /// Returns `true` when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// The state objects a draw binds: vertex layout, sampler, depth and blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawStates {
    /// Vertex declaration of [`Vertex`].
    pub layout: StateId,
    /// Sampler of the diffuse texture.
    pub sampler: StateId,
    /// Depth-stencil state.
    pub depth: StateId,
    /// Blend state.
    pub blend: StateId,
}

impl DrawStates {
    /// Acquires a complete state set.
    pub fn acquire(
        set: &mut StateSet,
        ctx: &mut LaneContext<'_>,
        depth: (bool, bool),
        blend: BlendMode,
        address: AddressMode,
    ) -> Result<Self, LaneError> {
        let (attributes, stride) = Vertex::layout();
        let filter = ctx.settings.filter.filter_mode();
        Ok(Self {
            layout: set.acquire(ctx, StateDescriptor::VertexLayout { attributes, stride })?,
            sampler: set.acquire(ctx, StateDescriptor::Sampler { filter, address })?,
            depth: set.acquire(
                ctx,
                StateDescriptor::DepthStencil {
                    depth_test: depth.0,
                    depth_write: depth.1,
                },
            )?,
            blend: set.acquire(ctx, StateDescriptor::Blend(blend))?,
        })
    }

    /// The ids in binding order.
    pub fn to_vec(&self) -> Vec<StateId> {
        vec![self.layout, self.sampler, self.depth, self.blend]
    }
}
