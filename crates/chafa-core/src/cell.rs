//! Per-cell symbol selection: picks the glyph + FG/BG pair that minimizes
//! squared pixel error against the cell's own 8x8 window.

use crate::color::Color8;
use crate::palette::Palette;
use crate::symbols::map::{Candidate, PreparedSymbolMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorExtractor {
    Average,
    Median,
}

/// One cell's 8x8 window of already-preprocessed pixels, row-major.
pub struct CellWindow<'a> {
    pub pixels: &'a [Color8],
}

/// The result of analyzing one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellResult {
    pub code_point: char,
    pub fg: Color8,
    pub bg: Color8,
    pub fg_pen: Option<usize>,
    pub bg_pen: Option<usize>,
    pub error: u64,
}

/// Finds the channel with the largest max-min range across the window,
/// used to pick a threshold channel for the coverage bitmap.
fn dominant_channel(pixels: &[Color8]) -> usize {
    let mut min = [255i32; 3];
    let mut max = [0i32; 3];
    for p in pixels {
        let c = [p.r as i32, p.g as i32, p.b as i32];
        for ch in 0..3 {
            min[ch] = min[ch].min(c[ch]);
            max[ch] = max[ch].max(c[ch]);
        }
    }
    let range: Vec<i32> = (0..3).map(|ch| max[ch] - min[ch]).collect();
    range.iter().enumerate().max_by_key(|(_, &r)| r).map(|(i, _)| i).unwrap_or(0)
}

fn channel_value(c: Color8, channel: usize) -> u8 {
    match channel {
        0 => c.r,
        1 => c.g,
        _ => c.b,
    }
}

/// Coverage bitmap via the dominant-channel median threshold: sort by the channel with the widest
/// spread and threshold at the median value.
fn coverage_bitmap_median(pixels: &[Color8]) -> u64 {
    let channel = dominant_channel(pixels);
    let mut values: Vec<u8> = pixels.iter().map(|p| channel_value(*p, channel)).collect();
    values.sort_unstable();
    let threshold = values[values.len() / 2];

    let mut bitmap = 0u64;
    for (i, p) in pixels.iter().enumerate() {
        if channel_value(*p, channel) > threshold {
            bitmap |= 1u64 << (63 - i);
        }
    }
    bitmap
}

/// Coverage bitmap via the simpler mean-of-channels threshold.
fn coverage_bitmap_mean(pixels: &[Color8]) -> u64 {
    let mean: u32 = pixels.iter().map(|p| p.r as u32 + p.g as u32 + p.b as u32).sum::<u32>() / (pixels.len() as u32 * 3).max(1);
    let mut bitmap = 0u64;
    for (i, p) in pixels.iter().enumerate() {
        let lum = (p.r as u32 + p.g as u32 + p.b as u32) / 3;
        if lum > mean {
            bitmap |= 1u64 << (63 - i);
        }
    }
    bitmap
}

fn extract_fg_bg(pixels: &[Color8], bitmap: u64) -> (Option<Color8>, Option<Color8>) {
    let mut fg_acc = crate::color::ColorAccum::default();
    let mut bg_acc = crate::color::ColorAccum::default();
    for (i, p) in pixels.iter().enumerate() {
        if bitmap & (1u64 << (63 - i)) != 0 {
            fg_acc.add(*p);
        } else {
            bg_acc.add(*p);
        }
    }
    (fg_acc.mean(), bg_acc.mean())
}

fn score(pixels: &[Color8], bitmap: u64, fg: Color8, bg: Color8) -> u64 {
    let mut total = 0u64;
    for (i, p) in pixels.iter().enumerate() {
        let target = if bitmap & (1u64 << (63 - i)) != 0 { fg } else { bg };
        total += p.diff_fast(target) as u64;
    }
    total
}

/// Analyzes one cell and returns the best `{code_point, FG, BG}` choice.
/// `k` bounds the candidate search width.
pub fn analyze_cell(window: CellWindow, symbol_map: &PreparedSymbolMap, extractor: ColorExtractor, palette: Option<&Palette>, k: usize) -> CellResult {
    let pixels = window.pixels;
    debug_assert_eq!(pixels.len(), 64);

    let target = match extractor {
        ColorExtractor::Average => coverage_bitmap_mean(pixels),
        ColorExtractor::Median => coverage_bitmap_median(pixels),
    };

    let candidates = symbol_map.find_candidates(target, k.max(1));
    let mut best: Option<(Candidate, Color8, Color8, u64)> = None;

    for cand in candidates {
        let bitmap = if cand.inverted { !symbol_map.bitmaps[cand.index] } else { symbol_map.bitmaps[cand.index] };
        let (fg, bg) = extract_fg_bg(pixels, bitmap);

        let (fg, bg) = match (fg, bg) {
            (Some(fg), Some(bg)) => (fg, bg),
            (Some(solid), None) | (None, Some(solid)) => (solid, solid),
            (None, None) => continue,
        };

        let (fg, bg, fg_q, bg_q) = if let Some(palette) = palette {
            let fg_pen = palette.nearest_pen(fg);
            let bg_pen = palette.nearest_pen(bg);
            (palette.colors[fg_pen], palette.colors[bg_pen], Some(fg_pen), Some(bg_pen))
        } else {
            (fg, bg, None, None)
        };

        let err = score(pixels, bitmap, fg, bg);

        if best.as_ref().map(|(_, _, _, e)| err < *e).unwrap_or(true) {
            best = Some((cand, fg, bg, err));
            if let (Some(fgp), Some(bgp)) = (fg_q, bg_q) {
                let _ = (fgp, bgp); // quantized pens recorded below via re-derivation
            }
        }
    }

    let (cand, fg, bg, err) = best.expect("candidate search must yield at least one symbol for a non-empty prepared map");
    let code_point = symbol_map.symbols[cand.index].code_point;

    let (fg_pen, bg_pen) = match palette {
        Some(p) => (Some(p.nearest_pen(fg)), Some(p.nearest_pen(bg))),
        None => (None, None),
    };

    CellResult { code_point, fg, bg, fg_pen, bg_pen, error: err }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolMap;

    fn solid_window(c: Color8) -> Vec<Color8> {
        vec![c; 64]
    }

    #[test]
    fn solid_red_cell_picks_full_block() {
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        let pixels = solid_window(Color8::opaque(255, 0, 0));
        let result = analyze_cell(CellWindow { pixels: &pixels }, &prepared, ColorExtractor::Average, None, 4);
        assert_eq!(result.code_point, '\u{2588}');
        assert_eq!(result.fg, Color8::opaque(255, 0, 0));
    }

    #[test]
    fn half_black_half_white_picks_a_block_glyph() {
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        let mut pixels = vec![Color8::opaque(255, 255, 255); 64];
        for row in 4..8 {
            for col in 0..8 {
                pixels[row * 8 + col] = Color8::opaque(0, 0, 0);
            }
        }
        let result = analyze_cell(CellWindow { pixels: &pixels }, &prepared, ColorExtractor::Median, None, 4);
        assert!(matches!(result.code_point, '\u{2580}' | '\u{2584}'));
        assert_eq!(result.error, 0);
    }

    #[test]
    fn quantized_mode_snaps_fg_bg_to_palette_pens() {
        use crate::palette::{Palette, PaletteKind};
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        let palette = Palette::new(PaletteKind::Indexed16, vec![Color8::opaque(0, 0, 0), Color8::opaque(255, 0, 0)], 128);
        let pixels = solid_window(Color8::opaque(250, 10, 10));
        let result = analyze_cell(CellWindow { pixels: &pixels }, &prepared, ColorExtractor::Average, Some(&palette), 4);
        assert_eq!(result.fg_pen, Some(1));
    }
}
