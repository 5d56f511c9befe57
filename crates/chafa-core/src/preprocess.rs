//! Scales/composites/normalizes/dithers the caller's pixel buffer onto
//! the canvas's working pixel grid.
//!
//! Image scaling itself is out of scope for the core: the
//! caller supplies pixels already at, or scaled via, the
//! [`Scaler`] trait object it chooses to install. A simple nearest/box
//! fallback is provided for `work_factor < 0.3`, matching the upstream
//! cheap in-loop path.

use crate::color::{rgb_to_din99d, Color8, ColorSpace};
use crate::dither::{floyd_steinberg, DitherMode, Grain, NoiseDither, OrderedDither};
use crate::palette::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Rgba8,
    Bgra8,
    Argb8,
    Abgr8,
    Rgba8Premultiplied,
    Bgra8Premultiplied,
    Rgb8,
    Bgr8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tuck {
    Stretch,
    Fit,
    ShrinkToFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
}

/// Caller-supplied source pixel description, borrowed only for the
/// duration of the preprocessing call.
pub struct PixelSource<'a> {
    pub pixel_type: PixelType,
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
}

impl PixelSource<'_> {
    fn pixel_at(&self, x: u32, y: u32) -> Color8 {
        let bpp = if matches!(self.pixel_type, PixelType::Rgb8 | PixelType::Bgr8) { 3 } else { 4 };
        let offset = (y * self.row_stride + x * bpp) as usize;
        let px = &self.data[offset..offset + bpp as usize];
        match self.pixel_type {
            PixelType::Rgba8 | PixelType::Rgba8Premultiplied => Color8::new(px[0], px[1], px[2], px[3]),
            PixelType::Bgra8 | PixelType::Bgra8Premultiplied => Color8::new(px[2], px[1], px[0], px[3]),
            PixelType::Argb8 => Color8::new(px[1], px[2], px[3], px[0]),
            PixelType::Abgr8 => Color8::new(px[3], px[2], px[1], px[0]),
            PixelType::Rgb8 => Color8::opaque(px[0], px[1], px[2]),
            PixelType::Bgr8 => Color8::opaque(px[2], px[1], px[0]),
        }
    }
}

/// A destination sub-rectangle, in destination pixels, produced by the
/// tuck/align step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Computes where the source image lands within a `canvas_w x canvas_h`
/// destination, given the tuck and alignment policy. Edges snap outward
/// to cell boundaries so no partial-cell rows/cols are left over.
pub fn place(src_w: u32, src_h: u32, canvas_w: u32, canvas_h: u32, cell_w: u32, cell_h: u32, tuck: Tuck, h_align: Align, v_align: Align) -> PlacedRect {
    let (w, h) = match tuck {
        Tuck::Stretch => (canvas_w, canvas_h),
        Tuck::Fit | Tuck::ShrinkToFit => {
            let scale = (canvas_w as f64 / src_w as f64).min(canvas_h as f64 / src_h as f64);
            let scale = if tuck == Tuck::ShrinkToFit { scale.min(1.0) } else { scale };
            let w = (src_w as f64 * scale).round() as u32;
            let h = (src_h as f64 * scale).round() as u32;
            (snap_up(w, cell_w).min(canvas_w), snap_up(h, cell_h).min(canvas_h))
        }
    };

    let x = match h_align {
        Align::Start => 0,
        Align::Center => (canvas_w.saturating_sub(w)) / 2,
        Align::End => canvas_w.saturating_sub(w),
    };
    let y = match v_align {
        Align::Start => 0,
        Align::Center => (canvas_h.saturating_sub(h)) / 2,
        Align::End => canvas_h.saturating_sub(h),
    };

    PlacedRect { x: snap_down(x, cell_w), y: snap_down(y, cell_h), w, h }
}

fn snap_up(v: u32, unit: u32) -> u32 {
    if unit <= 1 {
        v
    } else {
        v.div_ceil(unit) * unit
    }
}

fn snap_down(v: u32, unit: u32) -> u32 {
    if unit <= 1 {
        v
    } else {
        (v / unit) * unit
    }
}

/// Caller-provided scaler for the resample step; `work_factor < 0.3`
/// bypasses this in favor of cheap nearest-neighbor.
pub trait Scaler {
    fn scale(&self, src: &PixelSource, dst_w: u32, dst_h: u32) -> Vec<Color8>;
}

/// Simple nearest-neighbor scaler used as the crate's built-in fallback.
pub struct NearestNeighborScaler;

impl Scaler for NearestNeighborScaler {
    fn scale(&self, src: &PixelSource, dst_w: u32, dst_h: u32) -> Vec<Color8> {
        let mut out = Vec::with_capacity((dst_w * dst_h) as usize);
        for y in 0..dst_h {
            let sy = (y as u64 * src.height as u64 / dst_h.max(1) as u64).min(src.height.saturating_sub(1) as u64) as u32;
            for x in 0..dst_w {
                let sx = (x as u64 * src.width as u64 / dst_w.max(1) as u64).min(src.width.saturating_sub(1) as u64) as u32;
                out.push(src.pixel_at(sx, sy));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreprocessConfig {
    pub canvas_pixel_w: u32,
    pub canvas_pixel_h: u32,
    pub cell_w: u32,
    pub cell_h: u32,
    pub tuck: Tuck,
    pub h_align: Align,
    pub v_align: Align,
    pub bg_color: Color8,
    pub work_factor: f32,
    pub color_space: ColorSpace,
    pub dither_mode: DitherMode,
    pub dither_grain: Grain,
    pub dither_intensity: f32,
    pub small_palette: bool,
}

/// Output of the preprocessing pipeline: a dense `canvas_pixel_w x
/// canvas_pixel_h` buffer in the requested working color space, ready
/// for cell analysis or palette quantization.
pub struct PreprocessedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color8>,
    pub had_alpha: bool,
}

/// Runs the full preprocessing pipeline. Scaling
/// is delegated to `scaler`; everything else (histogram clamp, optional
/// composite, dither, color space conversion) happens in-crate.
pub fn preprocess(src: &PixelSource, cfg: &PreprocessConfig, scaler: &dyn Scaler, palette: Option<&Palette>) -> PreprocessedImage {
    let rect = place(src.width, src.height, cfg.canvas_pixel_w, cfg.canvas_pixel_h, cfg.cell_w, cfg.cell_h, cfg.tuck, cfg.h_align, cfg.v_align);

    let scaled = if cfg.work_factor < 0.3 {
        NearestNeighborScaler.scale(src, rect.w, rect.h)
    } else {
        scaler.scale(src, rect.w, rect.h)
    };

    let mut canvas = vec![cfg.bg_color; (cfg.canvas_pixel_w * cfg.canvas_pixel_h) as usize];
    for y in 0..rect.h {
        for x in 0..rect.w {
            let dy = rect.y + y;
            let dx = rect.x + x;
            if dy < cfg.canvas_pixel_h && dx < cfg.canvas_pixel_w {
                canvas[(dy * cfg.canvas_pixel_w + dx) as usize] = scaled[(y * rect.w + x) as usize];
            }
        }
    }

    let had_alpha = canvas.iter().any(|c| c.a != 0xff);

    // First pass: 2048-bin intensity histogram, I = 3R + 4G + B (range
    // 0..=2040 for 8-bit channels, comfortably inside the 2048-bin table).
    let mut histogram = [0u32; 2048];
    for c in &canvas {
        let i = 3 * c.r as u32 + 4 * c.g as u32 + c.b as u32;
        histogram[i.min(2047) as usize] += 1;
    }

    if cfg.small_palette {
        let (lo, hi) = histogram_clamp_bounds(&histogram, canvas.len() as u32, tail_fraction(palette));
        normalize_in_place(&mut canvas, lo, hi);
    }

    if had_alpha {
        for c in canvas.iter_mut() {
            *c = composite_over(*c, cfg.bg_color);
        }
    }

    apply_dither(&mut canvas, cfg.canvas_pixel_w, cfg.canvas_pixel_h, cfg, palette);

    if cfg.color_space == ColorSpace::Din99d {
        for c in canvas.iter_mut() {
            *c = rgb_to_din99d(*c);
        }
    }

    PreprocessedImage { width: cfg.canvas_pixel_w, height: cfg.canvas_pixel_h, pixels: canvas, had_alpha }
}

/// Tail fraction to discard from each end of the intensity histogram
/// before computing the linear rescale factor: 20% for very small
/// palettes, 10% for medium, 5% otherwise.
fn tail_fraction(palette: Option<&Palette>) -> f64 {
    match palette.map(|p| p.colors.len()) {
        Some(n) if n <= 8 => 0.20,
        Some(n) if n <= 16 => 0.10,
        _ => 0.05,
    }
}

fn histogram_clamp_bounds(histogram: &[u32; 2048], total: u32, tail: f64) -> (u32, u32) {
    let discard = (total as f64 * tail) as u32;

    let mut lo = 0u32;
    let mut acc = 0u32;
    for (i, &count) in histogram.iter().enumerate() {
        acc += count;
        if acc > discard {
            lo = i as u32;
            break;
        }
    }

    let mut hi = 2047u32;
    let mut acc = 0u32;
    for (i, &count) in histogram.iter().enumerate().rev() {
        acc += count;
        if acc > discard {
            hi = i as u32;
            break;
        }
    }

    if lo >= hi {
        (0, 2047)
    } else {
        (lo, hi)
    }
}

fn normalize_in_place(pixels: &mut [Color8], lo: u32, hi: u32) {
    let lo = lo as f32 / 8.0; // I = 3R+4G+B maxes at 8*255; approximate per-channel bound
    let hi = (hi as f32 / 8.0).max(lo + 1.0);
    let scale = 255.0 / (hi - lo);
    for c in pixels.iter_mut() {
        let adjust = |v: u8| (((v as f32 - lo) * scale).clamp(0.0, 255.0)) as u8;
        *c = Color8::new(adjust(c.r), adjust(c.g), adjust(c.b), c.a);
    }
}

fn composite_over(fg: Color8, bg: Color8) -> Color8 {
    let a = fg.a as f32 / 255.0;
    let blend = |f: u8, b: u8| ((f as f32 * a) + (b as f32 * (1.0 - a))).round() as u8;
    Color8::opaque(blend(fg.r, bg.r), blend(fg.g, bg.g), blend(fg.b, bg.b))
}

fn apply_dither(pixels: &mut [Color8], w: u32, h: u32, cfg: &PreprocessConfig, palette: Option<&Palette>) {
    match cfg.dither_mode {
        DitherMode::None => {}
        DitherMode::Ordered => {
            let d = OrderedDither::new(8, cfg.dither_intensity);
            for y in 0..h {
                for x in 0..w {
                    let idx = (y * w + x) as usize;
                    pixels[idx] = d.apply_pixel(x, y, cfg.dither_grain, pixels[idx]);
                }
            }
        }
        DitherMode::Noise => {
            let d = NoiseDither::new(cfg.dither_intensity);
            for y in 0..h {
                for x in 0..w {
                    let idx = (y * w + x) as usize;
                    pixels[idx] = d.apply_pixel(x, y, pixels[idx]);
                }
            }
        }
        DitherMode::FloydSteinberg => {
            if let Some(palette) = palette {
                floyd_steinberg(pixels, w, h, cfg.dither_grain, cfg.dither_intensity, palette);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretch_fills_entire_canvas() {
        let r = place(10, 5, 80, 40, 1, 1, Tuck::Stretch, Align::Start, Align::Start);
        assert_eq!(r, PlacedRect { x: 0, y: 0, w: 80, h: 40 });
    }

    #[test]
    fn fit_preserves_aspect_and_centers() {
        let r = place(100, 50, 80, 80, 1, 1, Tuck::Fit, Align::Center, Align::Center);
        assert_eq!(r.w, 80);
        assert_eq!(r.h, 40);
        assert_eq!(r.y, 20);
    }

    #[test]
    fn shrink_to_fit_never_enlarges() {
        let r = place(10, 10, 80, 80, 1, 1, Tuck::ShrinkToFit, Align::Start, Align::Start);
        assert_eq!(r.w, 10);
        assert_eq!(r.h, 10);
    }

    #[test]
    fn empty_source_short_circuits_to_empty_canvas_of_bg_color() {
        let cfg = PreprocessConfig {
            canvas_pixel_w: 8,
            canvas_pixel_h: 8,
            cell_w: 8,
            cell_h: 8,
            tuck: Tuck::Stretch,
            h_align: Align::Start,
            v_align: Align::Start,
            bg_color: Color8::opaque(1, 2, 3),
            work_factor: 1.0,
            color_space: ColorSpace::Rgb,
            dither_mode: DitherMode::None,
            dither_grain: Grain::new(1, 1),
            dither_intensity: 0.0,
            small_palette: false,
        };
        let src = PixelSource { pixel_type: PixelType::Rgba8, data: &[], width: 0, height: 0, row_stride: 0 };
        let out = preprocess(&src, &cfg, &NearestNeighborScaler, None);
        assert!(out.pixels.iter().all(|&c| c == cfg.bg_color));
    }

    #[test]
    fn solid_red_stretch_is_uniform_red() {
        let data = [255u8, 0, 0, 255].repeat(4);
        let cfg = PreprocessConfig {
            canvas_pixel_w: 8,
            canvas_pixel_h: 8,
            cell_w: 8,
            cell_h: 8,
            tuck: Tuck::Stretch,
            h_align: Align::Start,
            v_align: Align::Start,
            bg_color: Color8::opaque(0, 0, 0),
            work_factor: 1.0,
            color_space: ColorSpace::Rgb,
            dither_mode: DitherMode::None,
            dither_grain: Grain::new(1, 1),
            dither_intensity: 0.0,
            small_palette: false,
        };
        let src = PixelSource { pixel_type: PixelType::Rgba8, data: &data, width: 2, height: 2, row_stride: 8 };
        let out = preprocess(&src, &cfg, &NearestNeighborScaler, None);
        assert!(out.pixels.iter().all(|&c| c == Color8::opaque(255, 0, 0)));
    }
}
