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

use std::fmt;

/// The state of the graphics device, polled once per frame by the host.
///
/// ```text
///  OK ──(platform loss)──> LOST ──(render targets released)──> NOT_RESET
///  ^                                                              │
///  └─────────────────(swap chain + resources recreated)───────────┘
///  any ──(driver failure)──> ERROR (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// The device is usable.
    Ok,
    /// The platform reported a loss; render-target-bound objects are still alive.
    Lost,
    /// Every render-target-bound object is released; the device waits for a reset.
    NotReset,
    /// The driver failed. Terminal for the session.
    Error,
}

impl DeviceState {
    /// Returns `true` when rendering may proceed.
    pub fn is_ok(self) -> bool {
        self == DeviceState::Ok
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Ok => write!(f, "OK"),
            DeviceState::Lost => write!(f, "LOST"),
            DeviceState::NotReset => write!(f, "NOT_RESET"),
            DeviceState::Error => write!(f, "ERROR"),
        }
    }
}
