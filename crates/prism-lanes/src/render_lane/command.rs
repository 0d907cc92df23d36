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

//! Typed draw requests gathered by executors.

use prism_core::renderer::api::{BlitOp, DrawCall, FullscreenEffect};
use prism_core::renderer::stats::CommandMode;
use prism_core::renderer::{RenderPass, ResourceError};
use std::ops::Range;

/// What a command does once executed.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOp {
    /// An indexed draw.
    Draw(DrawCall),
    /// A texture copy.
    Blit(BlitOp),
    /// A full-screen effect.
    Effect(FullscreenEffect),
}

/// A draw request. The mode only feeds statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Statistics bucket.
    pub mode: CommandMode,
    /// The operation.
    pub op: CommandOp,
}

impl Command {
    /// A solid draw.
    pub fn draw(mode: CommandMode, call: DrawCall) -> Self {
        Self {
            mode,
            op: CommandOp::Draw(call),
        }
    }

    /// A blit.
    pub fn blit(mode: CommandMode, op: BlitOp) -> Self {
        Self {
            mode,
            op: CommandOp::Blit(op),
        }
    }

    /// A full-screen effect.
    pub fn effect(mode: CommandMode, effect: FullscreenEffect) -> Self {
        Self {
            mode,
            op: CommandOp::Effect(effect),
        }
    }

    /// Submits the command to an open pass.
    pub fn submit(&self, pass: &mut dyn RenderPass) -> Result<(), ResourceError> {
        match &self.op {
            CommandOp::Draw(call) => pass.draw(call),
            CommandOp::Blit(op) => pass.blit(op),
            CommandOp::Effect(effect) => pass.apply(effect),
        }
    }
}

/// The combined command list of a pass, with the slice gathered by each executor.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: Vec<Command>,
    spans: Vec<(usize, Range<usize>)>,
}

impl CommandList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the list, keeping its allocation.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.spans.clear();
    }

    /// Lets executor `executor` gather into the list.
    pub fn gather_into(&mut self, executor: usize, gather: impl FnOnce(&mut Vec<Command>)) {
        let start = self.commands.len();
        gather(&mut self.commands);
        let end = self.commands.len();
        if end > start {
            self.spans.push((executor, start..end));
        }
    }

    /// Every command, in gather order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The non-empty slices, tagged with the executor that gathered them.
    pub fn spans(&self) -> impl Iterator<Item = (usize, &[Command])> {
        self.spans
            .iter()
            .map(|(executor, range)| (*executor, &self.commands[range.clone()]))
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was gathered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::{FullscreenEffect, TargetView, TextureId};

    #[test]
    fn test_spans_skip_empty_executors() {
        let mut list = CommandList::new();
        list.gather_into(0, |out| {
            out.push(Command::effect(CommandMode::Solid, FullscreenEffect::Saturation(0.5)))
        });
        list.gather_into(1, |_| {});
        list.gather_into(2, |out| {
            out.push(Command::blit(
                CommandMode::Solid,
                BlitOp::copy(TargetView::whole(TextureId(3))),
            ));
            out.push(Command::effect(CommandMode::Transparent, FullscreenEffect::Blur { passes: 1 }));
        });

        let spans: Vec<(usize, usize)> = list.spans().map(|(e, c)| (e, c.len())).collect();
        assert_eq!(spans, vec![(0, 1), (2, 2)]);
        assert_eq!(list.len(), 3);

        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.spans().count(), 0);
    }
}
