//! Built-in fixed palettes (2/8/16/240/256 color) derived from the
//! classic VT+xterm color cube, 24-step grayscale ramp, and the 16 named
//! ANSI colors.

use once_cell::sync::OnceCell;

use crate::color::Color8;

use super::{Palette, PaletteKind};

/// The six cube levels xterm's 6x6x6 color cube uses per channel.
pub const CUBE_LEVELS: [u8; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];

const ANSI_16: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0xcd, 0x00, 0x00),
    (0x00, 0xcd, 0x00),
    (0xcd, 0xcd, 0x00),
    (0x00, 0x00, 0xee),
    (0xcd, 0x00, 0xcd),
    (0x00, 0xcd, 0xcd),
    (0xe5, 0xe5, 0xe5),
    (0x7f, 0x7f, 0x7f),
    (0xff, 0x00, 0x00),
    (0x00, 0xff, 0x00),
    (0xff, 0xff, 0x00),
    (0x5c, 0x5c, 0xff),
    (0xff, 0x00, 0xff),
    (0x00, 0xff, 0xff),
    (0xff, 0xff, 0xff),
];

/// Builds the 256-entry xterm-compatible table: 16 ANSI colors, the 6x6x6
/// cube, then 24 grays.
fn build_256_table() -> Vec<Color8> {
    let mut v = Vec::with_capacity(256);
    for (r, g, b) in ANSI_16 {
        v.push(Color8::opaque(r, g, b));
    }
    for r in CUBE_LEVELS {
        for g in CUBE_LEVELS {
            for b in CUBE_LEVELS {
                v.push(Color8::opaque(r, g, b));
            }
        }
    }
    for i in 0..24u8 {
        let level = 8 + i * 10;
        v.push(Color8::opaque(level, level, level));
    }
    v
}

/// A 256-element LUT mapping each 8-bit channel value to the index (0..6)
/// of the nearest cube level, used to locate a query color's cube cell in
/// O(1) before falling back to a linear scan of the grays and the 16-entry
/// ramp.
fn build_channel_index() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = CUBE_LEVELS
            .iter()
            .enumerate()
            .min_by_key(|(_, &level)| (level as i32 - v as i32).abs())
            .map(|(i, _)| i as u8)
            .unwrap();
    }
    lut
}

static CHANNEL_INDEX: OnceCell<[u8; 256]> = OnceCell::new();
static TABLE_256: OnceCell<Vec<Color8>> = OnceCell::new();

pub fn channel_index() -> &'static [u8; 256] {
    CHANNEL_INDEX.get_or_init(build_channel_index)
}

pub fn table_256() -> &'static [Color8] {
    TABLE_256.get_or_init(build_256_table)
}

/// O(1) nearest-256-color lookup using the cube LUT directly, without
/// going through [`super::color_table::ColorTable`] (which is reserved
/// for the dynamic palette). Falls back to scanning grays/ramp when the
/// query is closer to one of those than to its cube cell.
pub fn nearest_256(c: Color8) -> usize {
    let idx = channel_index();
    let ri = idx[c.r as usize] as usize;
    let gi = idx[c.g as usize] as usize;
    let bi = idx[c.b as usize] as usize;
    let cube_index = 16 + ri * 36 + gi * 6 + bi;

    let table = table_256();
    let mut best = cube_index;
    let mut best_dist = table[cube_index].diff_fast(c);

    for i in 16 + 216..256 {
        let d = table[i].diff_fast(c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    for i in 0..16 {
        let d = table[i].diff_fast(c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

fn with_sentinels(mut colors: Vec<Color8>, alpha_threshold: u8) -> Palette {
    // Transparent / default-FG / default-BG sentinels never compare equal
    // to a "real" color; they're placeholders resolved by the caller.
    colors.push(Color8::new(0, 0, 0, 0));
    let transparent_index = colors.len() - 1;
    let mut p = Palette::new(PaletteKind::Indexed256, colors, alpha_threshold);
    p.transparent_index = transparent_index;
    p
}

pub fn fixed_256(alpha_threshold: u8) -> Palette {
    with_sentinels(table_256().to_vec(), alpha_threshold)
}

pub fn fixed_16(alpha_threshold: u8) -> Palette {
    let colors = ANSI_16.iter().map(|&(r, g, b)| Color8::opaque(r, g, b)).collect();
    let mut p = with_sentinels(colors, alpha_threshold);
    p.kind = PaletteKind::Indexed16;
    p
}

pub fn fixed_8(alpha_threshold: u8) -> Palette {
    let colors = ANSI_16[0..8].iter().map(|&(r, g, b)| Color8::opaque(r, g, b)).collect();
    let mut p = with_sentinels(colors, alpha_threshold);
    p.kind = PaletteKind::Indexed8;
    p
}

pub fn fixed_240(alpha_threshold: u8) -> Palette {
    // The "240" palette is the 256-color table minus the 16 ANSI colors
    // (which overlap with basic FG/BG SGR codes some terminals render
    // inconsistently).
    let colors = table_256()[16..256].to_vec();
    let mut p = with_sentinels(colors, alpha_threshold);
    p.kind = PaletteKind::Indexed240;
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_index_maps_extremes_correctly() {
        let idx = channel_index();
        assert_eq!(idx[0], 0);
        assert_eq!(idx[255], 5);
    }

    #[test]
    fn nearest_256_exact_cube_color_is_idempotent() {
        let table = table_256();
        for i in 16..232 {
            assert_eq!(nearest_256(table[i]), i, "failed on entry {i}: {:?}", table[i]);
        }
    }

    #[test]
    fn fixed_palettes_have_expected_sizes() {
        assert_eq!(fixed_8(128).colors.len(), 8);
        assert_eq!(fixed_16(128).colors.len(), 16);
        assert_eq!(fixed_240(128).colors.len(), 240);
        assert_eq!(fixed_256(128).colors.len(), 256);
    }
}
