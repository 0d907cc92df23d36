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

use crate::math::{LinearRgba, Rect};
use crate::renderer::api::PictureBankHandle;

/// One element of a 2D overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum HudItem {
    /// A picture of an uploaded bank.
    Picture {
        /// The bank holding the picture.
        bank: PictureBankHandle,
        /// Index of the picture in the bank.
        frame: usize,
        /// Destination in view pixels.
        rect: Rect,
        /// Modulation color.
        color: LinearRgba,
    },
    /// A flat rectangle.
    Fill {
        /// Destination in view pixels.
        rect: Rect,
        /// Fill color.
        color: LinearRgba,
    },
}

/// A 2D overlay drawn over a view after the 3D passes, in item order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hud {
    /// Items, back to front.
    pub items: Vec<HudItem>,
}
