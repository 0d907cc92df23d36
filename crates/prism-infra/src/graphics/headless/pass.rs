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

use prism_core::math::{LinearRgba, Rect, Vec3, Vec4};
use prism_core::renderer::api::{
    BlendMode, BlitOp, DrawCall, FullscreenEffect, RenderPassDescriptor, StateDescriptor,
    TargetView, Vertex, VertexSpace,
};
use prism_core::renderer::settings::PolygonMode;
use prism_core::renderer::traits::RenderPass;
use prism_core::renderer::ResourceError;

use super::device::{lock, HeadlessDeviceInternal};
use super::frame_log::PassRecord;
use super::raster::{box_blur, fill_triangle, DepthBuffer, DepthMode, RasterVertex, Surface};

/// An immediate-mode pass over one layer of a render-target texture.
pub(crate) struct HeadlessPass<'a> {
    device: &'a HeadlessDeviceInternal,
    target: TargetView,
    layer: usize,
    /// Nominal size of the target.
    full: (u32, u32),
    /// Size of the CPU surface backing the target.
    storage: (u32, u32),
    viewport: Rect,
    depth: Option<DepthBuffer>,
    record: PassRecord,
}

impl<'a> HeadlessPass<'a> {
    pub(crate) fn begin(
        device: &'a HeadlessDeviceInternal,
        descriptor: &RenderPassDescriptor,
    ) -> Result<Self, ResourceError> {
        let mut textures = lock(&device.textures, "textures")?;
        let texture = textures
            .get_mut(&descriptor.color.texture)
            .ok_or(ResourceError::NotFound)?;
        if !texture.descriptor.render_target {
            return Err(ResourceError::InvalidHandle);
        }
        let layer = texture.layer_index(&descriptor.color)?;
        let full = (texture.descriptor.width, texture.descriptor.height);
        let storage = device.storage_size(full.0, full.1);
        let surface = texture.layers[layer].get_or_insert_with(|| Surface::new(storage.0, storage.1));
        if let Some(clear) = descriptor.clear_color {
            surface.fill(clear);
        }
        let viewport = descriptor
            .viewport
            .unwrap_or(Rect::new(0.0, 0.0, full.0 as f32, full.1 as f32));

        log::trace!(
            "HeadlessDevice: Begin pass {} on {:?}",
            descriptor.kind,
            descriptor.color
        );
        Ok(Self {
            device,
            target: descriptor.color,
            layer,
            full,
            storage,
            viewport,
            depth: descriptor
                .clear_depth
                .then(|| DepthBuffer::new(storage.0, storage.1)),
            record: PassRecord::new(descriptor.kind, descriptor.color, descriptor.clear_color),
        })
    }

    /// Copies the top surface of a texture out of the table.
    fn source_surface(&self, view: TargetView) -> Result<Surface, ResourceError> {
        let textures = lock(&self.device.textures, "textures")?;
        let texture = textures.get(&view.texture).ok_or(ResourceError::NotFound)?;
        let layer = if texture.descriptor.cube {
            view.face.map(|f| f.layer()).unwrap_or(0)
        } else {
            0
        };
        Ok(texture.layers[layer].clone().unwrap_or_else(|| {
            let (w, h) = self
                .device
                .storage_size(texture.descriptor.width, texture.descriptor.height);
            Surface::new(w, h)
        }))
    }

    /// Runs `f` on the target surface.
    fn with_target<R>(&mut self, f: impl FnOnce(&mut Surface, &mut Option<DepthBuffer>) -> R) -> Result<R, ResourceError> {
        let mut textures = lock(&self.device.textures, "textures")?;
        let texture = textures
            .get_mut(&self.target.texture)
            .ok_or(ResourceError::NotFound)?;
        let (w, h) = self.storage;
        let surface = texture.layers[self.layer].get_or_insert_with(|| Surface::new(w, h));
        Ok(f(surface, &mut self.depth))
    }

    fn depth_mode(&self, call: &DrawCall) -> Result<DepthMode, ResourceError> {
        let states = lock(&self.device.states, "states")?;
        for id in &call.states {
            match states.get(id) {
                Some(StateDescriptor::DepthStencil {
                    depth_test,
                    depth_write,
                }) => {
                    return Ok(DepthMode {
                        test: *depth_test,
                        write: *depth_write,
                    })
                }
                Some(_) => {}
                None => return Err(ResourceError::InvalidHandle),
            }
        }
        let clip = call.space == VertexSpace::Clip;
        Ok(DepthMode {
            test: clip,
            write: clip,
        })
    }

    /// Maps a point in nominal target pixels to storage texels.
    #[inline]
    fn to_storage(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.storage.0 as f32 / self.full.0 as f32,
            y * self.storage.1 as f32 / self.full.1 as f32,
        )
    }

    fn project(&self, call: &DrawCall, vertex: &Vertex) -> Option<RasterVertex> {
        let vp = self.viewport;
        let (sx, sy, z) = match call.space {
            VertexSpace::Texel => (
                vp.x + vertex.uv.x * vp.width,
                vp.y + vertex.uv.y * vp.height,
                0.0,
            ),
            VertexSpace::Clip => {
                let clip = call.view_proj * (call.model * Vec4::from_vec3(vertex.position, 1.0));
                if clip.w <= 1e-6 {
                    return None;
                }
                let ndc = clip.truncate() / clip.w;
                (
                    vp.x + (ndc.x * 0.5 + 0.5) * vp.width,
                    vp.y + (0.5 - ndc.y * 0.5) * vp.height,
                    ndc.z,
                )
            }
        };
        let (x, y) = self.to_storage(sx, sy);
        Some(RasterVertex {
            x,
            y,
            z,
            u: vertex.uv.x,
            v: vertex.uv.y,
        })
    }
}

fn decode_vertices(bytes: &[u8]) -> Vec<Vertex> {
    bytes
        .chunks_exact(std::mem::size_of::<Vertex>())
        .map(bytemuck::pod_read_unaligned::<Vertex>)
        .collect()
}

fn decode_indices(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<u32>)
        .collect()
}

fn draw_line(surface: &mut Surface, a: &RasterVertex, b: &RasterVertex, color: LinearRgba, blend: BlendMode) {
    let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = a.x + (b.x - a.x) * t;
        let y = a.y + (b.y - a.y) * t;
        if x >= 0.0 && y >= 0.0 && (x as u32) < surface.width && (y as u32) < surface.height {
            surface.put(x as u32, y as u32, color, blend);
        }
    }
}

impl RenderPass for HeadlessPass<'_> {
    fn draw(&mut self, call: &DrawCall) -> Result<(), ResourceError> {
        let (vertices, indices) = {
            let buffers = lock(&self.device.buffers, "buffers")?;
            let vb = buffers
                .get(&call.vertex_buffer)
                .ok_or(ResourceError::NotFound)?;
            let ib = buffers
                .get(&call.index_buffer)
                .ok_or(ResourceError::NotFound)?;
            (decode_vertices(&vb.bytes), decode_indices(&ib.bytes))
        };
        let count = call.index_count as usize;
        if count > indices.len() || indices[..count].iter().any(|&i| i as usize >= vertices.len()) {
            return Err(ResourceError::BackendError(format!(
                "Draw {} reads past its buffers",
                call.tag
            )));
        }
        let depth_mode = self.depth_mode(call)?;
        let texture = match call.textures.first() {
            Some(&id) if id != self.target.texture => Some(self.source_surface(TargetView::whole(id))?),
            _ => None,
        };

        let mut triangles = Vec::with_capacity(count / 3);
        for tri in indices[..count].chunks_exact(3) {
            let corners = [
                &vertices[tri[0] as usize],
                &vertices[tri[1] as usize],
                &vertices[tri[2] as usize],
            ];
            let projected = [
                self.project(call, corners[0]),
                self.project(call, corners[1]),
                self.project(call, corners[2]),
            ];
            if let [Some(a), Some(b), Some(c)] = projected {
                let normal = (corners[0].normal + corners[1].normal + corners[2].normal) / 3.0;
                triangles.push(([a, b, c], normal));
            }
        }

        let shade = call.shade;
        let model = call.model;
        let base = call.color;
        let (blend, polygon) = (call.blend, call.polygon);
        if depth_mode.test && self.depth.is_none() {
            self.depth = Some(DepthBuffer::new(self.storage.0, self.storage.1));
        }
        self.with_target(|surface, depth| {
            for (tri, normal) in &triangles {
                let lit = match shade {
                    Some(params) => {
                        let n = model.transform_vector(*normal).normalize();
                        let lambert = n.dot(-params.light_dir).max(0.0);
                        let light = params.ambient + params.diffuse.scale_rgb(lambert) + params.point_lights;
                        LinearRgba::new(base.r * light.r, base.g * light.g, base.b * light.b, base.a)
                    }
                    None => base,
                };
                match polygon {
                    PolygonMode::Solid => {
                        fill_triangle(surface, depth.as_mut(), depth_mode, tri, blend, |u, v| {
                            match &texture {
                                Some(tex) => lit * tex.sample(u, v),
                                None => lit,
                            }
                        });
                    }
                    PolygonMode::Wireframe => {
                        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                            draw_line(surface, &tri[a], &tri[b], lit, blend);
                        }
                    }
                }
            }
        })?;

        self.record.draws.push(call.tag);
        self.record.triangles += (count / 3) as u64;
        Ok(())
    }

    fn blit(&mut self, op: &BlitOp) -> Result<(), ResourceError> {
        let source = self.source_surface(op.source)?;
        let dest = op
            .dest
            .unwrap_or(Rect::new(0.0, 0.0, self.full.0 as f32, self.full.1 as f32));
        let src = op.source_rect.unwrap_or(Rect::new(0.0, 0.0, 1.0, 1.0));
        let full = self.full;
        self.with_target(|surface, _| {
            let (x0, y0, x1, y1) = surface.texel_rect(dest, full.0, full.1);
            let (w, h) = ((x1 - x0).max(1) as f32, (y1 - y0).max(1) as f32);
            for y in y0..y1 {
                for x in x0..x1 {
                    let u = src.x + src.width * ((x - x0) as f32 + 0.5) / w;
                    let v = src.y + src.height * ((y - y0) as f32 + 0.5) / h;
                    surface.put(x, y, source.sample(u, v) * op.tint, op.blend);
                }
            }
        })?;
        self.record.blits += 1;
        Ok(())
    }

    fn apply(&mut self, effect: &FullscreenEffect) -> Result<(), ResourceError> {
        let effect = *effect;
        self.with_target(|surface, _| {
            let map = |surface: &mut Surface, f: &dyn Fn(LinearRgba) -> LinearRgba| {
                for y in 0..surface.height {
                    for x in 0..surface.width {
                        let c = surface.get(x, y);
                        surface.put(x, y, f(c), BlendMode::Opaque);
                    }
                }
            };
            match effect {
                FullscreenEffect::Fade { color, amount } => {
                    map(surface, &|c| c.lerp(color.with_alpha(c.a), amount))
                }
                FullscreenEffect::Saturation(s) => map(surface, &|c| {
                    let lum = 0.299 * c.r + 0.587 * c.g + 0.114 * c.b;
                    LinearRgba::new(
                        lum + (c.r - lum) * s,
                        lum + (c.g - lum) * s,
                        lum + (c.b - lum) * s,
                        c.a,
                    )
                }),
                FullscreenEffect::Brightness(b) => map(surface, &|c| c.scale_rgb(b)),
                FullscreenEffect::Blur { passes } => {
                    for _ in 0..passes {
                        box_blur(surface);
                    }
                }
                FullscreenEffect::RadialBlur { strength } => {
                    let mut blurred = surface.clone();
                    box_blur(&mut blurred);
                    let (cx, cy) = (surface.width as f32 * 0.5, surface.height as f32 * 0.5);
                    let radius = Vec3::new(cx, cy, 0.0).length().max(1.0);
                    for y in 0..surface.height {
                        for x in 0..surface.width {
                            let d = Vec3::new(x as f32 + 0.5 - cx, y as f32 + 0.5 - cy, 0.0).length();
                            let t = (strength * d / radius).clamp(0.0, 1.0);
                            let c = surface.get(x, y).lerp(blurred.get(x, y), t);
                            surface.put(x, y, c, BlendMode::Opaque);
                        }
                    }
                }
            }
        })?;
        self.record.effects.push(effect);
        Ok(())
    }
}

impl Drop for HeadlessPass<'_> {
    fn drop(&mut self) {
        log::trace!(
            "HeadlessDevice: End pass {} ({} draws, {} blits)",
            self.record.kind,
            self.record.draws.len(),
            self.record.blits
        );
        let placeholder = PassRecord::new(self.record.kind, self.target, None);
        let record = std::mem::replace(&mut self.record, placeholder);
        match self.device.frame_log.lock() {
            Ok(mut log) => log.passes.push(record),
            Err(e) => log::error!("HeadlessDevice: frame log poisoned: {e}"),
        }
    }
}
