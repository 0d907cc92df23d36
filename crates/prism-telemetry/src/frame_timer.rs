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

//! Frame timing with a rolling average.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Summary of recent frame times, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameTimings {
    /// Frames recorded since creation.
    pub frames: u64,
    /// Duration of the last frame.
    pub last_ms: f64,
    /// Mean over the rolling window.
    pub average_ms: f64,
    /// Longest frame in the rolling window.
    pub worst_ms: f64,
}

/// Measures frame durations.
#[derive(Debug)]
pub struct FrameTimer {
    window: usize,
    samples: VecDeque<Duration>,
    started: Option<Instant>,
    frames: u64,
}

impl FrameTimer {
    /// Creates a timer averaging over `window` frames.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window.max(1)),
            started: None,
            frames: 0,
        }
    }

    /// Starts measuring a frame.
    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Ends the current frame and returns its duration.
    ///
    /// Returns `Duration::ZERO` if no frame was started.
    pub fn end(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            log::warn!("[FrameTimer] end() without begin()");
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.record(elapsed);
        elapsed
    }

    /// Records an externally measured frame duration.
    pub fn record(&mut self, elapsed: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
        self.frames += 1;
    }

    /// Current summary.
    pub fn timings(&self) -> FrameTimings {
        let ms = |d: &Duration| d.as_secs_f64() * 1000.0;
        let count = self.samples.len().max(1) as f64;
        FrameTimings {
            frames: self.frames,
            last_ms: self.samples.back().map(ms).unwrap_or(0.0),
            average_ms: self.samples.iter().map(ms).sum::<f64>() / count,
            worst_ms: self.samples.iter().map(ms).fold(0.0, f64::max),
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rolling_window_drops_old_samples() {
        let mut timer = FrameTimer::new(2);
        timer.record(Duration::from_millis(30));
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        let t = timer.timings();
        assert_eq!(t.frames, 3);
        assert_relative_eq!(t.last_ms, 20.0);
        assert_relative_eq!(t.average_ms, 15.0);
        assert_relative_eq!(t.worst_ms, 20.0);
    }

    #[test]
    fn test_end_without_begin_is_zero() {
        let mut timer = FrameTimer::default();
        assert_eq!(timer.end(), Duration::ZERO);
        assert_eq!(timer.timings().frames, 0);
    }
}
