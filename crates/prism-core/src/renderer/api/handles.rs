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

//! Opaque, renderer-level handles.
//!
//! Unlike the raw device IDs in [`resource`](super::resource), these handles
//! stay valid across a device lost/reset cycle: the renderer re-binds the
//! GPU object behind them when the device comes back.

macro_rules! renderer_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Returns the raw slot index behind this handle.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

renderer_handle!(
    /// A GPU-resident static mesh returned by `upload_mesh`.
    MeshHandle
);
renderer_handle!(
    /// A GPU-resident skinned mesh returned by `upload_skin_mesh`.
    SkinMeshHandle
);
renderer_handle!(
    /// A GPU-resident texture returned by `upload_texture`.
    TextureHandle
);
renderer_handle!(
    /// A GPU-resident picture bank returned by `upload_picture_bank`.
    PictureBankHandle
);
renderer_handle!(
    /// A render target registered in the resource cache.
    RenderTargetHandle
);
renderer_handle!(
    /// A reflection cube probe owned by the renderer.
    ProbeHandle
);
renderer_handle!(
    /// A render view (a set of color, depth and auxiliary targets).
    ViewHandle
);
