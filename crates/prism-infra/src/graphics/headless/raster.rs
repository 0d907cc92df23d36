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

//! CPU surfaces and a scanline-free triangle rasteriser.
//!
//! Coverage is tested at texel centers with edge functions, which is exact
//! enough for pass bookkeeping and texel-space bakes.

use prism_core::math::{LinearRgba, Rect};
use prism_core::renderer::api::BlendMode;

/// CPU storage of one texture layer, RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Surface {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<[u8; 4]>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            texels: vec![[0; 4]; (width * height) as usize],
        }
    }

    pub fn fill(&mut self, color: LinearRgba) {
        let px = color.to_rgba8();
        self.texels.iter_mut().for_each(|t| *t = px);
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> LinearRgba {
        LinearRgba::from_rgba8(self.texels[(y * self.width + x) as usize])
    }

    #[inline]
    pub fn put(&mut self, x: u32, y: u32, src: LinearRgba, blend: BlendMode) {
        let idx = (y * self.width + x) as usize;
        let dst = LinearRgba::from_rgba8(self.texels[idx]);
        self.texels[idx] = blend_colors(src, dst, blend).to_rgba8();
    }

    /// Nearest sample at normalized coordinates, clamped to the edges.
    pub fn sample(&self, u: f32, v: f32) -> LinearRgba {
        let x = ((u * self.width as f32) as i64).clamp(0, i64::from(self.width) - 1);
        let y = ((v * self.height as f32) as i64).clamp(0, i64::from(self.height) - 1);
        self.get(x as u32, y as u32)
    }

    /// Nearest-resampled copy, used when a stored surface is smaller than its texture.
    pub fn resampled(&self, width: u32, height: u32) -> Surface {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = Surface::new(width, height);
        for y in 0..out.height {
            for x in 0..out.width {
                let u = (x as f32 + 0.5) / out.width as f32;
                let v = (y as f32 + 0.5) / out.height as f32;
                out.put(x, y, self.sample(u, v), BlendMode::Opaque);
            }
        }
        out
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels.iter().flatten().copied().collect()
    }

    /// Maps a rectangle expressed in `(full_width, full_height)` pixels onto
    /// this surface, returning the covered texel range.
    pub fn texel_rect(&self, rect: Rect, full_width: u32, full_height: u32) -> (u32, u32, u32, u32) {
        let sx = self.width as f32 / full_width.max(1) as f32;
        let sy = self.height as f32 / full_height.max(1) as f32;
        let x0 = (rect.x * sx).round().clamp(0.0, self.width as f32) as u32;
        let y0 = (rect.y * sy).round().clamp(0.0, self.height as f32) as u32;
        let x1 = ((rect.x + rect.width) * sx).round().clamp(0.0, self.width as f32) as u32;
        let y1 = ((rect.y + rect.height) * sy).round().clamp(0.0, self.height as f32) as u32;
        (x0, y0, x1, y1)
    }
}

pub(crate) fn blend_colors(src: LinearRgba, dst: LinearRgba, blend: BlendMode) -> LinearRgba {
    match blend {
        BlendMode::Opaque => src,
        BlendMode::Alpha => LinearRgba::new(
            src.r * src.a + dst.r * (1.0 - src.a),
            src.g * src.a + dst.g * (1.0 - src.a),
            src.b * src.a + dst.b * (1.0 - src.a),
            src.a + dst.a * (1.0 - src.a),
        ),
        BlendMode::Additive => LinearRgba::new(
            src.r + dst.r,
            src.g + dst.g,
            src.b + dst.b,
            dst.a.max(src.a),
        ),
        BlendMode::Multiply => dst * src,
    }
}

/// A per-pass depth buffer, cleared to the far plane.
#[derive(Debug)]
pub(crate) struct DepthBuffer {
    width: u32,
    depths: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            depths: vec![1.0; (width * height) as usize],
        }
    }

    #[inline]
    fn test(&mut self, x: u32, y: u32, z: f32, write: bool) -> bool {
        let idx = (y * self.width + x) as usize;
        if z > self.depths[idx] {
            return false;
        }
        if write {
            self.depths[idx] = z;
        }
        true
    }
}

/// A vertex after projection to surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RasterVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
}

/// Depth handling of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DepthMode {
    pub test: bool,
    pub write: bool,
}

#[inline]
fn edge(a: &RasterVertex, b: &RasterVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Fills a triangle, both windings accepted.
///
/// `shade` receives the interpolated texture coordinates. Returns the number
/// of texels written.
pub(crate) fn fill_triangle(
    surface: &mut Surface,
    mut depth: Option<&mut DepthBuffer>,
    depth_mode: DepthMode,
    tri: &[RasterVertex; 3],
    blend: BlendMode,
    shade: impl Fn(f32, f32) -> LinearRgba,
) -> u32 {
    let [a, b, c] = tri;
    let area = edge(a, b, c.x, c.y);
    if area.abs() < 1e-8 {
        return 0;
    }
    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
    let max_x = (a.x.max(b.x).max(c.x).ceil().max(0.0) as u32).min(surface.width);
    let max_y = (a.y.max(b.y).max(c.y).ceil().max(0.0) as u32).min(surface.height);

    let mut written = 0;
    for y in min_y..max_y {
        let py = y as f32 + 0.5;
        for x in min_x..max_x {
            let px = x as f32 + 0.5;
            let w0 = edge(b, c, px, py) / area;
            let w1 = edge(c, a, px, py) / area;
            let w2 = edge(a, b, px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let z = w0 * a.z + w1 * b.z + w2 * c.z;
            if depth_mode.test {
                if let Some(depth) = depth.as_deref_mut() {
                    if !depth.test(x, y, z, depth_mode.write) {
                        continue;
                    }
                }
            }
            let u = w0 * a.u + w1 * b.u + w2 * c.u;
            let v = w0 * a.v + w1 * b.v + w2 * c.v;
            surface.put(x, y, shade(u, v), blend);
            written += 1;
        }
    }
    written
}

/// Separable 3x3 box blur.
pub(crate) fn box_blur(surface: &mut Surface) {
    let src = surface.clone();
    let (w, h) = (surface.width as i64, surface.height as i64);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            let mut n = 0.0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx < 0 || sy < 0 || sx >= w || sy >= h {
                        continue;
                    }
                    let c = src.get(sx as u32, sy as u32);
                    acc[0] += c.r;
                    acc[1] += c.g;
                    acc[2] += c.b;
                    acc[3] += c.a;
                    n += 1.0;
                }
            }
            let c = LinearRgba::new(acc[0] / n, acc[1] / n, acc[2] / n, acc[3] / n);
            surface.put(x as u32, y as u32, c, BlendMode::Opaque);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> RasterVertex {
        RasterVertex {
            x,
            y,
            z: 0.5,
            u: 0.0,
            v: 0.0,
        }
    }

    const NO_DEPTH: DepthMode = DepthMode {
        test: false,
        write: false,
    };

    #[test]
    fn test_full_quad_covers_every_texel_once() {
        let mut s = Surface::new(8, 8);
        let t0 = [v(0.0, 0.0), v(8.0, 0.0), v(8.0, 8.0)];
        let t1 = [v(0.0, 0.0), v(8.0, 8.0), v(0.0, 8.0)];
        let n0 = fill_triangle(&mut s, None, NO_DEPTH, &t0, BlendMode::Opaque, |_, _| {
            LinearRgba::WHITE
        });
        let n1 = fill_triangle(&mut s, None, NO_DEPTH, &t1, BlendMode::Opaque, |_, _| {
            LinearRgba::WHITE
        });
        assert!(n0 + n1 >= 64);
        assert!(s.texels.iter().all(|t| *t == [255, 255, 255, 255]));
    }

    #[test]
    fn test_depth_rejects_farther_fragments() {
        let mut s = Surface::new(4, 4);
        let mut depth = DepthBuffer::new(4, 4);
        let mode = DepthMode {
            test: true,
            write: true,
        };
        let mut near = [v(0.0, 0.0), v(8.0, 0.0), v(0.0, 8.0)];
        near.iter_mut().for_each(|p| p.z = 0.2);
        let far = [v(0.0, 0.0), v(8.0, 0.0), v(0.0, 8.0)];
        fill_triangle(&mut s, Some(&mut depth), mode, &near, BlendMode::Opaque, |_, _| {
            LinearRgba::RED
        });
        let written = fill_triangle(&mut s, Some(&mut depth), mode, &far, BlendMode::Opaque, |_, _| {
            LinearRgba::BLUE
        });
        assert_eq!(written, 0);
        assert_eq!(s.get(0, 0), LinearRgba::RED);
    }

    #[test]
    fn test_alpha_blend_over_black() {
        let mut s = Surface::new(1, 1);
        s.fill(LinearRgba::BLACK);
        s.put(0, 0, LinearRgba::WHITE.with_alpha(0.5), BlendMode::Alpha);
        let c = s.get(0, 0);
        assert!((c.r - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_resampled_keeps_nearest_values() {
        let mut s = Surface::new(2, 1);
        s.put(0, 0, LinearRgba::RED, BlendMode::Opaque);
        s.put(1, 0, LinearRgba::BLUE, BlendMode::Opaque);
        let big = s.resampled(4, 2);
        assert_eq!(big.get(0, 1), LinearRgba::RED);
        assert_eq!(big.get(3, 0), LinearRgba::BLUE);
    }
}
