//! `CanvasConfig` and `Canvas`: the top-level object that ties the
//! preprocessor, cell analyzer, palette engine, and protocol encoders
//! together into one `draw_all_pixels` / `build_ansi` call pair.

use std::sync::Arc;

use bitflags::bitflags;

use crate::cell::{analyze_cell, CellResult, CellWindow, ColorExtractor};
use crate::color::{Color8, ColorSpace};
use crate::dither::{DitherMode, Grain};
use crate::palette::{fixed, pnn, Palette, PaletteKind};
use crate::preprocess::{preprocess, NearestNeighborScaler, PixelSource, PreprocessConfig, Scaler};
use crate::protocols::sixel::IndexedImage;
use crate::symbols::map::PreparedSymbolMap;
use crate::symbols::SymbolMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasMode {
    TrueColor,
    Indexed256,
    Indexed240,
    Indexed16,
    Indexed8,
    FgBgInvert,
    FgBg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    Symbols,
    Sixels,
    Kitty,
    Iterm2,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Optimizations: u32 {
        const REUSE_ATTRIBUTES = 1 << 0;
        const REPEAT_CELLS     = 1 << 1;
        const SKIP_CELLS       = 1 << 2;
    }
}

/// Immutable-after-handoff configuration for a [`Canvas`]. Ref-counted in
/// the upstream C library; here a plain owned `Clone` value, cheap enough
/// (a few dozen scalar fields plus two `Arc`-shared symbol maps) that
/// cloning on handoff is the idiomatic equivalent.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub width_cells: u32,
    pub height_cells: u32,
    pub cell_w: u32,
    pub cell_h: u32,
    pub canvas_mode: CanvasMode,
    pub color_space: ColorSpace,
    pub color_extractor: ColorExtractor,
    pub pixel_mode: PixelMode,
    pub dither_mode: DitherMode,
    pub dither_grain: Grain,
    pub dither_intensity: f32,
    pub fg_color: Color8,
    pub bg_color: Color8,
    pub alpha_threshold: u8,
    pub work_factor: f32,
    pub optimizations: Optimizations,
    pub fg_only: bool,
    pub symbol_map: SymbolMap,
    pub fill_symbol_map: Option<SymbolMap>,
}

impl CanvasConfig {
    pub fn new(width_cells: u32, height_cells: u32) -> Self {
        Self {
            width_cells,
            height_cells,
            cell_w: 8,
            cell_h: 8,
            canvas_mode: CanvasMode::TrueColor,
            color_space: ColorSpace::Rgb,
            color_extractor: ColorExtractor::Average,
            pixel_mode: PixelMode::Symbols,
            dither_mode: DitherMode::None,
            dither_grain: Grain::new(1, 1),
            dither_intensity: 1.0,
            fg_color: Color8::opaque(0xff, 0xff, 0xff),
            bg_color: Color8::opaque(0, 0, 0),
            alpha_threshold: 128,
            work_factor: 0.5,
            optimizations: Optimizations::empty(),
            fg_only: false,
            symbol_map: SymbolMap::default(),
            fill_symbol_map: None,
        }
    }

    pub fn pixel_width(&self) -> u32 {
        self.width_cells * self.cell_w
    }

    pub fn pixel_height(&self) -> u32 {
        self.height_cells * self.cell_h
    }

    fn build_palette(&self, pixels: &[Color8]) -> Option<Palette> {
        let n_colors = match self.canvas_mode {
            CanvasMode::TrueColor => return None,
            CanvasMode::Indexed256 => return Some(fixed::fixed_256(self.alpha_threshold)),
            CanvasMode::Indexed240 => return Some(fixed::fixed_240(self.alpha_threshold)),
            CanvasMode::Indexed16 => return Some(fixed::fixed_16(self.alpha_threshold)),
            CanvasMode::Indexed8 => return Some(fixed::fixed_8(self.alpha_threshold)),
            CanvasMode::FgBg | CanvasMode::FgBgInvert => {
                return Some(Palette::new(PaletteKind::FgBg, vec![self.bg_color, self.fg_color], self.alpha_threshold))
            }
        };
        #[allow(unreachable_code)]
        {
            let mut p = pnn::build_dynamic_palette(pixels, n_colors, self.alpha_threshold, pnn::Quality(self.work_factor));
            p.build_color_table();
            Some(p)
        }
    }
}

/// A rendered cell: a glyph plus the FG/BG chosen for it. Wide glyphs
/// occupy two adjacent cells; the right cell of such a pair carries
/// `WideSymbolState::Continuation` rather than duplicating the glyph, so
/// the tagged-sum variant carries the "no glyph here" case instead of a
/// sentinel code point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasCell {
    Single(CellResult),
    WideLeft(CellResult),
    WideContinuation,
}

/// The rendering engine: owns a cloned, logically-immutable copy of the
/// [`CanvasConfig`] it was constructed with, plus whatever it derives
/// from the caller's pixels during [`Canvas::draw_all_pixels`].
pub struct Canvas {
    config: CanvasConfig,
    prepared_symbols: Arc<PreparedSymbolMap>,
    prepared_fill_symbols: Option<Arc<PreparedSymbolMap>>,
    cells: Vec<CanvasCell>,
    indexed_image: Option<IndexedImage>,
    raw_rgba: Option<(u32, u32, Vec<Color8>)>,
}

impl Canvas {
    pub fn new(config: &CanvasConfig) -> Self {
        let mut config = config.clone();
        let prepared_symbols = config.symbol_map.prepare();
        let prepared_fill_symbols = config.fill_symbol_map.as_mut().map(|m| m.prepare());
        let n_cells = (config.width_cells * config.height_cells) as usize;
        Self {
            config,
            prepared_symbols,
            prepared_fill_symbols,
            cells: vec![CanvasCell::WideContinuation; n_cells],
            indexed_image: None,
            raw_rgba: None,
        }
    }

    /// Draws `src` onto the canvas. Pixel data is borrowed only for the
    /// duration of this call; Sixel/Kitty/iTerm2 modes copy out what they
    /// need.
    pub fn draw_all_pixels(&mut self, src: &PixelSource, scaler: &dyn Scaler) {
        let pre_cfg = PreprocessConfig {
            canvas_pixel_w: self.config.pixel_width(),
            canvas_pixel_h: self.config.pixel_height(),
            cell_w: self.config.cell_w,
            cell_h: self.config.cell_h,
            tuck: crate::preprocess::Tuck::Fit,
            h_align: crate::preprocess::Align::Center,
            v_align: crate::preprocess::Align::Center,
            bg_color: self.config.bg_color,
            work_factor: self.config.work_factor,
            color_space: self.config.color_space,
            dither_mode: self.config.dither_mode,
            dither_grain: self.config.dither_grain,
            dither_intensity: self.config.dither_intensity,
            small_palette: matches!(self.config.canvas_mode, CanvasMode::Indexed16 | CanvasMode::Indexed8 | CanvasMode::FgBg | CanvasMode::FgBgInvert),
        };

        if src.width == 0 || src.height == 0 {
            return; // EmptyInput: succeed with no output.
        }

        let palette_preview = self.config.build_palette(&[]);
        let pre = preprocess(src, &pre_cfg, scaler, palette_preview.as_ref());

        match self.config.pixel_mode {
            PixelMode::Symbols => self.analyze_symbols(&pre.pixels),
            PixelMode::Sixels | PixelMode::Kitty | PixelMode::Iterm2 => {
                let palette = self.config.build_palette(&pre.pixels);
                match self.config.pixel_mode {
                    PixelMode::Sixels => {
                        let palette = palette.unwrap_or_else(|| fixed::fixed_256(self.config.alpha_threshold));
                        self.indexed_image = Some(IndexedImage::quantize(&pre.pixels, pre.width, pre.height, &palette));
                    }
                    _ => {
                        self.raw_rgba = Some((pre.width, pre.height, pre.pixels.clone()));
                    }
                }
            }
        }
    }

    fn analyze_symbols(&mut self, pixels: &[Color8]) {
        let cw = self.config.cell_w;
        let ch = self.config.cell_h;
        let w = self.config.width_cells;
        let h = self.config.height_cells;
        let canvas_w = self.config.pixel_width();

        let palette = self.config.build_palette(pixels);

        for cy in 0..h {
            for cx in 0..w {
                let mut window = vec![Color8::default(); 64];
                for y in 0..ch.min(8) {
                    for x in 0..cw.min(8) {
                        let sx = cx * cw + x;
                        let sy = cy * ch + y;
                        window[(y * 8 + x) as usize] = pixels[(sy * canvas_w + sx) as usize];
                    }
                }
                let result = analyze_cell(CellWindow { pixels: &window }, self.prepared_symbols.as_ref(), self.config.color_extractor, palette.as_ref(), 8);
                self.cells[(cy * w + cx) as usize] = CanvasCell::Single(result);
            }
        }
        let _ = &self.prepared_fill_symbols; // reserved for the fill-symbol pass
    }

    pub fn cells(&self) -> &[CanvasCell] {
        &self.cells
    }

    pub fn indexed_image(&self) -> Option<&IndexedImage> {
        self.indexed_image.as_ref()
    }

    pub fn raw_rgba(&self) -> Option<&(u32, u32, Vec<Color8>)> {
        self.raw_rgba.as_ref()
    }

    /// Converts the analyzed canvas to a byte sequence via the given
    /// `TermInfo`. Never retains the output buffer. For
    /// `Sixels`/`Kitty`/`Iterm2` pixel modes, `term_info` is unused by the
    /// graphics payload itself (those protocols are framed literally by
    /// their own encoders) but still governs cursor movement between rows.
    pub fn build_ansi(&self, term_info: &crate::term::info::TermInfo, out: &mut Vec<u8>) {
        match self.config.pixel_mode {
            PixelMode::Symbols => self.build_ansi_symbols(term_info, out),
            PixelMode::Sixels => {
                if let Some(image) = &self.indexed_image {
                    let canvas = crate::protocols::sixel::SixelCanvas::new(image.clone(), self.config.color_space);
                    out.extend_from_slice(&crate::protocols::sixel::encode_sixels(&canvas));
                }
            }
            PixelMode::Kitty => {
                if let Some((w, h, pixels)) = &self.raw_rgba {
                    let encoder = crate::protocols::kitty::KittyEncoder::default();
                    out.extend_from_slice(&encoder.encode(pixels, *w, *h, crate::protocols::kitty::KittyMode::Immediate));
                }
            }
            PixelMode::Iterm2 => {
                if let Some((w, h, pixels)) = &self.raw_rgba {
                    out.extend_from_slice(&crate::protocols::iterm2::encode(pixels, *w, *h, self.config.width_cells, self.config.height_cells));
                }
            }
        }
    }

    fn build_ansi_symbols(&self, term_info: &crate::term::info::TermInfo, out: &mut Vec<u8>) {
        for cy in 0..self.config.height_cells {
            for cx in 0..self.config.width_cells {
                let cell = self.cells[(cy * self.config.width_cells + cx) as usize];
                match cell {
                    CanvasCell::WideContinuation => continue,
                    CanvasCell::Single(r) | CanvasCell::WideLeft(r) => {
                        emit_cell_colors(term_info, out, &self.config, &r);
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(r.code_point.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }
            if cy + 1 < self.config.height_cells {
                out.push(b'\r');
                out.push(b'\n');
            }
        }
    }
}

fn emit_cell_colors(term_info: &crate::term::info::TermInfo, out: &mut Vec<u8>, config: &CanvasConfig, r: &CellResult) {
    use crate::term::info::{Arg, TermSeq};

    match config.canvas_mode {
        CanvasMode::TrueColor => {
            let _ = term_info.try_emit(TermSeq::SetColorFgDirect, &[Arg::Guint8(r.fg.r), Arg::Guint8(r.fg.g), Arg::Guint8(r.fg.b)], out);
            let _ = term_info.try_emit(TermSeq::SetColorBgDirect, &[Arg::Guint8(r.bg.r), Arg::Guint8(r.bg.g), Arg::Guint8(r.bg.b)], out);
        }
        CanvasMode::Indexed256 | CanvasMode::Indexed240 => {
            if let Some(fg) = r.fg_pen {
                let _ = term_info.try_emit(TermSeq::SetColorFg256, &[Arg::Guint(fg as u32)], out);
            }
            if let Some(bg) = r.bg_pen {
                let _ = term_info.try_emit(TermSeq::SetColorBg256, &[Arg::Guint(bg as u32)], out);
            }
        }
        CanvasMode::Indexed16 => {
            if let Some(fg) = r.fg_pen {
                let _ = term_info.try_emit(TermSeq::SetColorFg16, &[Arg::Guint(fg as u32)], out);
            }
            if let Some(bg) = r.bg_pen {
                let _ = term_info.try_emit(TermSeq::SetColorBg16, &[Arg::Guint(bg as u32)], out);
            }
        }
        CanvasMode::Indexed8 => {
            if let Some(fg) = r.fg_pen {
                let _ = term_info.try_emit(TermSeq::SetColorFg8, &[Arg::Guint(fg as u32)], out);
            }
            if let Some(bg) = r.bg_pen {
                let _ = term_info.try_emit(TermSeq::SetColorBg8, &[Arg::Guint(bg as u32)], out);
            }
        }
        CanvasMode::FgBg | CanvasMode::FgBgInvert => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::db::TermDb;

    #[test]
    fn solid_red_2x2_canvas_picks_full_block_true_color() {
        let config = CanvasConfig::new(1, 1);
        let mut canvas = Canvas::new(&config);
        let data = [255u8, 0, 0, 255].repeat(4);
        let src = PixelSource { pixel_type: crate::preprocess::PixelType::Rgba8, data: &data, width: 2, height: 2, row_stride: 8 };
        canvas.draw_all_pixels(&src, &NearestNeighborScaler);

        let CanvasCell::Single(cell) = canvas.cells()[0] else { panic!("expected single cell") };
        assert_eq!(cell.code_point, '\u{2588}');
        assert_eq!(cell.fg, Color8::opaque(255, 0, 0));

        let term_info = TermDb::new().get_fallback_info();
        let mut out = Vec::new();
        canvas.build_ansi(&term_info, &mut out);
        assert!(!out.is_empty());
        assert!(out.windows(1).any(|w| w == "\u{2588}".as_bytes()));
    }

    #[test]
    fn empty_input_produces_no_cells_drawn_but_succeeds() {
        let config = CanvasConfig::new(2, 2);
        let mut canvas = Canvas::new(&config);
        let src = PixelSource { pixel_type: crate::preprocess::PixelType::Rgba8, data: &[], width: 0, height: 0, row_stride: 0 };
        canvas.draw_all_pixels(&src, &NearestNeighborScaler);
        assert!(matches!(canvas.cells()[0], CanvasCell::WideContinuation));
    }
}
