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

use prism_core::math::LinearRgba;
use prism_core::renderer::api::{FullscreenEffect, PassKind, TargetView};

/// What one render pass did, recorded when the pass is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    /// Identity of the pass.
    pub kind: PassKind,
    /// The bound target.
    pub target: TargetView,
    /// Clear color, if the pass cleared its target.
    pub clear: Option<LinearRgba>,
    /// Tags of the draw calls, in submission order.
    pub draws: Vec<u64>,
    /// Triangles submitted.
    pub triangles: u64,
    /// Number of blits.
    pub blits: u32,
    /// Full-screen effects, in order.
    pub effects: Vec<FullscreenEffect>,
}

impl PassRecord {
    pub(crate) fn new(kind: PassKind, target: TargetView, clear: Option<LinearRgba>) -> Self {
        Self {
            kind,
            target,
            clear,
            draws: Vec::new(),
            triangles: 0,
            blits: 0,
            effects: Vec::new(),
        }
    }

    /// Returns `true` if a draw carrying `tag` was submitted.
    pub fn drew(&self, tag: u64) -> bool {
        self.draws.contains(&tag)
    }
}

/// Every pass executed since the log was last cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLog {
    /// Passes in execution order.
    pub passes: Vec<PassRecord>,
    /// Number of `present` calls.
    pub presents: u32,
}

impl FrameLog {
    /// Kinds of the recorded passes, in order.
    pub fn kinds(&self) -> Vec<PassKind> {
        self.passes.iter().map(|p| p.kind).collect()
    }

    /// Passes of one kind.
    pub fn passes_of(&self, kind: PassKind) -> impl Iterator<Item = &PassRecord> {
        self.passes.iter().filter(move |p| p.kind == kind)
    }

    /// Index of the first pass of a kind.
    pub fn first_index(&self, kind: PassKind) -> Option<usize> {
        self.passes.iter().position(|p| p.kind == kind)
    }
}
