//! Fixed and dynamic color palettes, plus the fast nearest-pen lookup
//! structure ([`color_table::ColorTable`]) used by both.

pub mod color_table;
pub mod fixed;
pub mod pnn;

use crate::color::{rgb_to_din99d, Color8};
use color_table::ColorTable;

/// Number of reserved sentinel pens appended after the real color entries:
/// transparent, default-FG, default-BG.
pub const N_SENTINELS: usize = 3;
pub const MAX_PALETTE_ENTRIES: usize = 256 + N_SENTINELS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKind {
    TrueColor,
    Indexed256,
    Indexed240,
    Indexed16,
    Indexed8,
    FgBg,
}

/// A pen table plus precomputed DIN99d mirror and (for dynamic palettes)
/// a [`ColorTable`] lookup accelerator.
#[derive(Debug, Clone)]
pub struct Palette {
    pub kind: PaletteKind,
    pub colors: Vec<Color8>,
    pub din99d: Vec<Color8>,
    pub alpha_threshold: u8,
    pub transparent_index: usize,
    pub color_table: Option<ColorTable>,
}

impl Palette {
    pub fn new(kind: PaletteKind, colors: Vec<Color8>, alpha_threshold: u8) -> Self {
        let din99d = colors.iter().map(|&c| rgb_to_din99d(c)).collect();
        let transparent_index = colors.len();
        Self {
            kind,
            colors,
            din99d,
            alpha_threshold,
            transparent_index,
            color_table: None,
        }
    }

    pub fn build_color_table(&mut self) {
        self.color_table = Some(ColorTable::build(&self.colors));
    }

    pub fn is_transparent(&self, a: u8) -> bool {
        a < self.alpha_threshold
    }

    /// Nearest-pen lookup. Uses the [`ColorTable`] accelerator when
    /// present; otherwise falls back to a linear scan (always correct,
    /// used for small fixed palettes where the accelerator isn't worth
    /// building).
    pub fn nearest_pen(&self, c: Color8) -> usize {
        if let Some(table) = &self.color_table {
            return table.nearest(c, &self.colors);
        }
        self.colors
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.diff_fast(c))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_pen_linear_scan_picks_closest() {
        let colors = vec![Color8::opaque(0, 0, 0), Color8::opaque(255, 255, 255)];
        let pal = Palette::new(PaletteKind::Indexed16, colors, 128);
        assert_eq!(pal.nearest_pen(Color8::opaque(10, 10, 10)), 0);
        assert_eq!(pal.nearest_pen(Color8::opaque(240, 240, 240)), 1);
    }

    #[test]
    fn is_transparent_respects_threshold() {
        let pal = Palette::new(PaletteKind::Indexed16, vec![Color8::opaque(0, 0, 0)], 128);
        assert!(pal.is_transparent(64));
        assert!(!pal.is_transparent(200));
    }
}
