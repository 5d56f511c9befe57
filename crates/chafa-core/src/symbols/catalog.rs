//! Built-in glyphs, compiled in as 8x8 ASCII-art bitmaps and tagged by
//! class. Braille glyphs (U+2800-U+28FF) are generated programmatically
//! instead of being listed literally.

use bitflags::bitflags;

bitflags! {
    /// Tag classes a glyph can belong to. A glyph may carry more than one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SymbolTags: u32 {
        const SPACE    = 1 << 0;
        const BLOCK    = 1 << 1;
        const BORDER   = 1 << 2;
        const DIAGONAL = 1 << 3;
        const DOT      = 1 << 4;
        const STIPPLE  = 1 << 5;
        const BRAILLE  = 1 << 6;
        const HALF     = 1 << 7;
        const ASCII    = 1 << 8;
        const WIDE     = 1 << 9;
        const INVERTED = 1 << 10;

        /// The default selection a fresh [`super::SymbolMap`] starts from.
        const BASE = Self::BLOCK.bits() | Self::BORDER.bits() | Self::SPACE.bits();
    }
}

/// A single narrow (one cell, 8x8) glyph.
#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    pub code_point: char,
    pub bitmap: u64,
    pub tags: SymbolTags,
    pub fg_weight: u8,
    pub bg_weight: u8,
}

impl Symbol {
    pub const fn from_bitmap(code_point: char, bitmap: u64, tags: SymbolTags) -> Self {
        let fg_weight = bitmap.count_ones() as u8;
        Self {
            code_point,
            bitmap,
            tags,
            fg_weight,
            bg_weight: 64 - fg_weight,
        }
    }

    /// Parses an 8-line ASCII-art bitmap (`' '` = background, anything else
    /// = foreground) into a packed 64-bit coverage bitmap. Row 0 occupies
    /// the most-significant byte; within a row, the leftmost column is the
    /// high bit, matching the `bit i = row i/8, col i%8` convention.
    pub const fn parse_art(rows: [&'static str; 8]) -> u64 {
        let mut bitmap: u64 = 0;
        let mut row = 0;
        while row < 8 {
            let bytes = rows[row].as_bytes();
            let mut col = 0;
            while col < 8 {
                let set = col < bytes.len() && bytes[col] != b' ';
                if set {
                    let bit = 63 - (row * 8 + col);
                    bitmap |= 1u64 << bit;
                }
                col += 1;
            }
            row += 1;
        }
        bitmap
    }
}

/// A wide (two-cell, 16x8) glyph, stored as its left and right 64-bit
/// halves. The left half occupies the cell the code point is placed in;
/// the right half is rendered in the following cell.
#[derive(Debug, Clone, Copy)]
pub struct WideSymbol {
    pub code_point: char,
    pub left: u64,
    pub right: u64,
    pub tags: SymbolTags,
}

impl WideSymbol {
    pub const fn coverage128(&self) -> u128 {
        ((self.left as u128) << 64) | self.right as u128
    }
}

macro_rules! art_symbol {
    ($cp:expr, $tags:expr, [$($row:expr),+ $(,)?]) => {
        Symbol::from_bitmap($cp, Symbol::parse_art([$($row),+]), $tags)
    };
}

/// Returns the built-in narrow symbol catalog. This is a representative
/// subset of chafa's full ~800-glyph table (space, full/half/quadrant
/// blocks, a handful of box-drawing borders, diagonals, dot/stipple
/// fills, and a handful of printable ASCII) — enough to exercise every
/// tag class and the candidate-search machinery faithfully, without
/// transcribing the entire upstream bitmap table byte for byte.
pub fn builtin_narrow_symbols() -> Vec<Symbol> {
    vec![
        art_symbol!(' ', SymbolTags::SPACE, [
            "        ", "        ", "        ", "        ",
            "        ", "        ", "        ", "        ",
        ]),
        art_symbol!('\u{2588}', SymbolTags::BLOCK, [
            "XXXXXXXX", "XXXXXXXX", "XXXXXXXX", "XXXXXXXX",
            "XXXXXXXX", "XXXXXXXX", "XXXXXXXX", "XXXXXXXX",
        ]),
        art_symbol!('\u{2580}', SymbolTags::BLOCK | SymbolTags::HALF, [
            "XXXXXXXX", "XXXXXXXX", "XXXXXXXX", "XXXXXXXX",
            "        ", "        ", "        ", "        ",
        ]),
        art_symbol!('\u{2584}', SymbolTags::BLOCK | SymbolTags::HALF, [
            "        ", "        ", "        ", "        ",
            "XXXXXXXX", "XXXXXXXX", "XXXXXXXX", "XXXXXXXX",
        ]),
        art_symbol!('\u{258C}', SymbolTags::BLOCK | SymbolTags::HALF, [
            "XXXX    ", "XXXX    ", "XXXX    ", "XXXX    ",
            "XXXX    ", "XXXX    ", "XXXX    ", "XXXX    ",
        ]),
        art_symbol!('\u{2590}', SymbolTags::BLOCK | SymbolTags::HALF, [
            "    XXXX", "    XXXX", "    XXXX", "    XXXX",
            "    XXXX", "    XXXX", "    XXXX", "    XXXX",
        ]),
        art_symbol!('\u{2596}', SymbolTags::BLOCK, [
            "        ", "        ", "        ", "        ",
            "XXXX    ", "XXXX    ", "XXXX    ", "XXXX    ",
        ]),
        art_symbol!('\u{2597}', SymbolTags::BLOCK, [
            "        ", "        ", "        ", "        ",
            "    XXXX", "    XXXX", "    XXXX", "    XXXX",
        ]),
        art_symbol!('\u{2598}', SymbolTags::BLOCK, [
            "XXXX    ", "XXXX    ", "XXXX    ", "XXXX    ",
            "        ", "        ", "        ", "        ",
        ]),
        art_symbol!('\u{259D}', SymbolTags::BLOCK, [
            "    XXXX", "    XXXX", "    XXXX", "    XXXX",
            "        ", "        ", "        ", "        ",
        ]),
        art_symbol!('\u{2500}', SymbolTags::BORDER, [
            "        ", "        ", "        ", "XXXXXXXX",
            "        ", "        ", "        ", "        ",
        ]),
        art_symbol!('\u{2502}', SymbolTags::BORDER, [
            "   X    ", "   X    ", "   X    ", "   X    ",
            "   X    ", "   X    ", "   X    ", "   X    ",
        ]),
        art_symbol!('\u{250C}', SymbolTags::BORDER, [
            "        ", "        ", "        ", "   XXXXX",
            "   X    ", "   X    ", "   X    ", "   X    ",
        ]),
        art_symbol!('\u{2518}', SymbolTags::BORDER, [
            "   X    ", "   X    ", "   X    ", "XXXX    ",
            "        ", "        ", "        ", "        ",
        ]),
        art_symbol!('\u{2571}', SymbolTags::DIAGONAL, [
            "       X", "      X ", "     X  ", "    X   ",
            "   X    ", "  X     ", " X      ", "X       ",
        ]),
        art_symbol!('\u{2572}', SymbolTags::DIAGONAL, [
            "X       ", " X      ", "  X     ", "   X    ",
            "    X   ", "     X  ", "      X ", "       X",
        ]),
        art_symbol!('\u{2591}', SymbolTags::STIPPLE, [
            "X X X X ", " X X X X", "X X X X ", " X X X X",
            "X X X X ", " X X X X", "X X X X ", " X X X X",
        ]),
        art_symbol!('\u{2592}', SymbolTags::STIPPLE, [
            "X XXX X ", " X XXX X", "X XXX X ", " X XXX X",
            "X XXX X ", " X XXX X", "X XXX X ", " X XXX X",
        ]),
        art_symbol!('\u{00B7}', SymbolTags::DOT, [
            "        ", "        ", "        ", "   XX   ",
            "   XX   ", "        ", "        ", "        ",
        ]),
        art_symbol!('.', SymbolTags::ASCII | SymbolTags::DOT, [
            "        ", "        ", "        ", "        ",
            "        ", "        ", "  XX    ", "  XX    ",
        ]),
        art_symbol!(':', SymbolTags::ASCII | SymbolTags::DOT, [
            "        ", "  XX    ", "  XX    ", "        ",
            "  XX    ", "  XX    ", "        ", "        ",
        ]),
        art_symbol!('#', SymbolTags::ASCII | SymbolTags::STIPPLE, [
            " X  X   ", " X  X   ", "XXXXXXX ", " X  X   ",
            "XXXXXXX ", " X  X   ", " X  X   ", "        ",
        ]),
        art_symbol!('@', SymbolTags::ASCII | SymbolTags::BLOCK, [
            " XXXXX  ", "X     X ", "X XXX X ", "X X X X ",
            "X XXX X ", "X       ", "X     X ", " XXXXX  ",
        ]),
    ]
}

/// Returns the built-in wide symbol catalog. Upstream ships a handful of
/// CJK-adjacent wide block glyphs; we keep one representative pair here.
pub fn builtin_wide_symbols() -> Vec<WideSymbol> {
    let full = Symbol::parse_art(["XXXXXXXX"; 8]);
    vec![WideSymbol {
        code_point: '\u{3000}', // ideographic space, used as a wide "full block" stand-in
        left: full,
        right: full,
        tags: SymbolTags::BLOCK | SymbolTags::WIDE,
    }]
}

/// Generates the Braille glyph for code point `U+2800 + bits` (`bits` in
/// 0..=0xFF). Braille cells are 2 columns by 4 rows; dot numbering is the
/// standard Braille layout:
///
/// ```text
/// 1 4
/// 2 5
/// 3 6
/// 7 8
/// ```
///
/// mapped onto bits 0..=7 of the code point's low byte in that order. We
/// expand each 2x4 dot grid to the 8x8 coverage bitmap by using the left
////right 4x8 quadrant of each cell consistently (each dot occupies a
/// 4x2 pixel block).
pub fn braille_symbol(bits: u8) -> Symbol {
    const DOT_ROW_COL: [(u32, u32); 8] = [
        (0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1), (3, 0), (3, 1),
    ];

    let mut bitmap: u64 = 0;
    for (i, &(dot_row, dot_col)) in DOT_ROW_COL.iter().enumerate() {
        if bits & (1 << i) == 0 {
            continue;
        }
        // Each dot covers a 2-row x 4-col block within the 8x8 cell.
        let base_row = dot_row * 2;
        let base_col = dot_col * 4;
        for r in 0..2 {
            for c in 0..4 {
                let row = base_row + r;
                let col = base_col + c;
                let bit = 63 - (row * 8 + col);
                bitmap |= 1u64 << bit;
            }
        }
    }

    let code_point = char::from_u32(0x2800 + bits as u32).expect("braille code points are always valid");
    Symbol::from_bitmap(code_point, bitmap, SymbolTags::BRAILLE)
}

pub fn all_braille_symbols() -> Vec<Symbol> {
    (0u8..=0xFF).map(braille_symbol).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_block_is_all_ones() {
        let syms = builtin_narrow_symbols();
        let full = syms.iter().find(|s| s.code_point == '\u{2588}').unwrap();
        assert_eq!(full.bitmap, u64::MAX);
        assert_eq!(full.fg_weight, 64);
        assert_eq!(full.bg_weight, 0);
    }

    #[test]
    fn space_is_all_zeros() {
        let syms = builtin_narrow_symbols();
        let space = syms.iter().find(|s| s.code_point == ' ').unwrap();
        assert_eq!(space.bitmap, 0);
        assert_eq!(space.bg_weight, 64);
    }

    #[test]
    fn popcount_weight_agreement_holds_for_every_builtin_symbol() {
        for s in builtin_narrow_symbols().into_iter().chain(all_braille_symbols()) {
            assert_eq!(s.bitmap.count_ones(), s.fg_weight as u32);
            assert_eq!(64 - s.fg_weight as u32, s.bg_weight as u32);
        }
    }

    #[test]
    fn braille_all_dots_is_full_cell() {
        let s = braille_symbol(0xFF);
        assert_eq!(s.fg_weight, 64);
    }

    #[test]
    fn braille_no_dots_is_empty() {
        let s = braille_symbol(0x00);
        assert_eq!(s.fg_weight, 0);
        assert_eq!(s.code_point, '\u{2800}');
    }

    #[test]
    fn braille_single_dot_top_left() {
        // Dot 1 is the top-left dot; it should cover the top-left 2x4 quadrant only.
        let s = braille_symbol(0b0000_0001);
        assert_eq!(s.fg_weight, 8);
        assert_eq!(s.bitmap >> 56, 0b1111_0000);
    }
}
