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

//! Backend-agnostic data types exchanged with a [`GraphicsDevice`](super::GraphicsDevice).

pub mod caps;
pub mod device_state;
pub mod handles;
pub mod mesh;
pub mod pass;
pub mod resource;

pub use self::caps::*;
pub use self::device_state::*;
pub use self::handles::*;
pub use self::mesh::*;
pub use self::pass::*;
pub use self::resource::*;
