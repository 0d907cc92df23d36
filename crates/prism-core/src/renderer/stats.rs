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

//! Frame-level statistics counters.

use super::api::PassKind;
use std::fmt;
use std::time::Duration;

/// Statistics tag of a draw command. Never used for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandMode {
    /// Opaque geometry.
    Solid,
    /// Blended or refracting geometry.
    Transparent,
    /// Sky dome or sky box.
    SkySphere,
    /// Water surfaces.
    Water,
}

impl CommandMode {
    /// Every mode, in display order.
    pub const ALL: [CommandMode; 4] = [
        CommandMode::Solid,
        CommandMode::Transparent,
        CommandMode::SkySphere,
        CommandMode::Water,
    ];

    fn label(self) -> &'static str {
        match self {
            CommandMode::Solid => "SOLID",
            CommandMode::Transparent => "TRANS",
            CommandMode::SkySphere => "SKY",
            CommandMode::Water => "WATER",
        }
    }
}

/// Command counts of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassStats {
    /// The pass identity.
    pub kind: PassKind,
    /// Commands per [`CommandMode`], indexed like [`CommandMode::ALL`].
    pub counts: [u32; 4],
}

impl PassStats {
    /// Empty counters for a pass.
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            counts: [0; 4],
        }
    }

    /// Records one command.
    pub fn record(&mut self, mode: CommandMode) {
        self.counts[mode as usize] += 1;
    }

    /// Commands recorded for a mode.
    pub fn count(&self, mode: CommandMode) -> u32 {
        self.counts[mode as usize]
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{SOLID: {:3} TRANS: {:3}",
            self.kind,
            self.count(CommandMode::Solid),
            self.count(CommandMode::Transparent)
        )?;
        for mode in [CommandMode::SkySphere, CommandMode::Water] {
            if self.count(mode) > 0 {
                write!(f, " {}: {:3}", mode.label(), self.count(mode))?;
            }
        }
        write!(f, "}} ")
    }
}

/// Counters of the last top-level frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    /// Frame number, incremented by every top-level render.
    pub frame: u64,
    /// Per-pass command counts, in execution order.
    pub passes: Vec<PassStats>,
    /// Draw calls submitted.
    pub draw_calls: u32,
    /// Triangles submitted.
    pub triangles: u64,
    /// Reflection probes refreshed.
    pub reflection_refreshes: u32,
    /// Cube faces rendered for reflection probes.
    pub reflection_faces: u32,
    /// Video memory in use after the frame.
    pub vram_bytes: u64,
    /// CPU time spent in the frame.
    pub frame_time: Duration,
}

impl RenderStats {
    /// Clears the per-frame counters and starts frame `frame`.
    pub fn begin_frame(&mut self, frame: u64) {
        *self = Self {
            frame,
            ..Self::default()
        };
    }

    /// Commands of a mode summed over every pass of a kind.
    pub fn commands(&self, kind: PassKind, mode: CommandMode) -> u32 {
        self.passes
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.count(mode))
            .sum()
    }
}

impl fmt::Display for RenderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FRAME {} ", self.frame)?;
        for pass in &self.passes {
            write!(f, "{pass}")?;
        }
        write!(
            f,
            "DRAWS: {} TRIS: {} REFL: {} VRAM: {} KB",
            self.draw_calls,
            self.triangles,
            self.reflection_refreshes,
            self.vram_bytes / 1024
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_stats_display() {
        let mut pass = PassStats::new(PassKind::Lighting);
        pass.record(CommandMode::Solid);
        pass.record(CommandMode::Solid);
        pass.record(CommandMode::Transparent);
        assert_eq!(pass.to_string(), "LIGHTING{SOLID:   2 TRANS:   1} ");

        pass.record(CommandMode::Water);
        assert_eq!(pass.to_string(), "LIGHTING{SOLID:   2 TRANS:   1 WATER:   1} ");
    }

    #[test]
    fn test_commands_sum_over_passes() {
        let mut stats = RenderStats::default();
        for _ in 0..2 {
            let mut pass = PassStats::new(PassKind::Reflection);
            pass.record(CommandMode::Solid);
            stats.passes.push(pass);
        }
        assert_eq!(stats.commands(PassKind::Reflection, CommandMode::Solid), 2);
        assert_eq!(stats.commands(PassKind::Lighting, CommandMode::Solid), 0);
    }
}
