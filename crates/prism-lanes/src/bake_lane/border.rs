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

//! CPU post-processing of baked maps: dilation and downsampling.

use image::{Rgba, RgbaImage};

/// Alpha above which a texel counts as rasterized.
const COVERED_ALPHA: u8 = 100;

/// Largest edge a supersampled bake target may reach.
pub const MAX_BAKE_TARGET: u32 = 2048;

const ORTHOGONAL: [(i64, i64); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const DIAGONAL: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

fn neighbour(image: &RgbaImage, x: u32, y: u32, (dx, dy): (i64, i64)) -> Rgba<u8> {
    let nx = (x as i64 + dx).clamp(0, image.width() as i64 - 1) as u32;
    let ny = (y as i64 + dy).clamp(0, image.height() as i64 - 1) as u32;
    *image.get_pixel(nx, ny)
}

/// One dilation pass.
///
/// A texel with alpha <= 100 takes the first orthogonal neighbour (up, down,
/// left, right) with alpha > 100, else the first diagonal neighbour with a
/// non-zero alpha, else keeps its value. Neighbours are read from the state
/// before the pass and clamped at the edges.
pub fn border_extend(image: &mut RgbaImage) {
    let source = image.clone();
    for (x, y, texel) in image.enumerate_pixels_mut() {
        if texel[3] > COVERED_ALPHA {
            continue;
        }
        let found = ORTHOGONAL
            .iter()
            .map(|&d| neighbour(&source, x, y, d))
            .find(|n| n[3] > COVERED_ALPHA)
            .or_else(|| {
                DIAGONAL
                    .iter()
                    .map(|&d| neighbour(&source, x, y, d))
                    .find(|n| n[3] > 0)
            });
        if let Some(n) = found {
            *texel = n;
        }
    }
}

/// Runs `passes` dilation passes.
pub fn border_extend_passes(image: &mut RgbaImage, passes: u32) {
    for _ in 0..passes {
        border_extend(image);
    }
}

/// Halves both dimensions, averaging each 2x2 block weighted by alpha.
///
/// Blocks with no coverage come out transparent black.
pub fn downsample_half(image: &RgbaImage) -> RgbaImage {
    let (w, h) = ((image.width() / 2).max(1), (image.height() / 2).max(1));
    RgbaImage::from_fn(w, h, |x, y| {
        let mut rgb = [0u32; 3];
        let mut alpha = 0u32;
        let mut samples = 0u32;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let (sx, sy) = (2 * x + dx, 2 * y + dy);
            if sx >= image.width() || sy >= image.height() {
                continue;
            }
            let p = image.get_pixel(sx, sy);
            let a = p[3] as u32;
            for c in 0..3 {
                rgb[c] += p[c] as u32 * a;
            }
            alpha += a;
            samples += 1;
        }
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |c: usize| ((rgb[c] + alpha / 2) / alpha) as u8;
        Rgba([
            channel(0),
            channel(1),
            channel(2),
            (alpha / samples.max(1)) as u8,
        ])
    })
}

/// Supersampling multiplier of an occlusion bake.
///
/// The largest power of two not above `min(2048 / w, 2048 / h)`, or 1 when the
/// map keeps an internal texture border.
pub fn supersample_factor(width: u32, height: u32, texture_border: bool) -> u32 {
    if texture_border || width == 0 || height == 0 {
        return 1;
    }
    let limit = (MAX_BAKE_TARGET / width).min(MAX_BAKE_TARGET / height).max(1);
    1 << (31 - limit.leading_zeros())
}

/// Returns `true` if some texel is fully transparent.
pub fn has_uncovered_texels(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p[3] == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthogonal_neighbours_win_over_diagonals() {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(0, 0, Rgba([9, 9, 9, 50]));
        img.put_pixel(2, 1, Rgba([200, 0, 0, 255]));
        border_extend(&mut img);
        // The center sees the right neighbour before the top-left diagonal.
        assert_eq!(*img.get_pixel(1, 1), Rgba([200, 0, 0, 255]));
        // (1, 0) has no covered orthogonal neighbour but a diagonal one.
        assert_eq!(*img.get_pixel(1, 0), Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn test_diagonal_fallback_accepts_low_alpha() {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(0, 0, Rgba([9, 9, 9, 50]));
        border_extend(&mut img);
        assert_eq!(*img.get_pixel(1, 1), Rgba([9, 9, 9, 50]));
        assert_eq!(*img.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_repeated_passes_fill_the_image() {
        let mut img = RgbaImage::new(16, 16);
        img.put_pixel(3, 3, Rgba([10, 20, 30, 255]));
        border_extend_passes(&mut img, 40);
        assert!(!has_uncovered_texels(&img));
        assert_eq!(*img.get_pixel(15, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_downsample_weights_by_alpha() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 0]));
        let half = downsample_half(&img);
        assert_eq!(half.dimensions(), (1, 1));
        // Transparent texels do not bleed their color.
        assert_eq!(*half.get_pixel(0, 0), Rgba([255, 0, 0, 63]));
    }

    #[test]
    fn test_supersample_factor() {
        assert_eq!(supersample_factor(256, 256, false), 8);
        assert_eq!(supersample_factor(300, 100, false), 4);
        assert_eq!(supersample_factor(4096, 64, false), 1);
        assert_eq!(supersample_factor(64, 64, true), 1);
    }
}
