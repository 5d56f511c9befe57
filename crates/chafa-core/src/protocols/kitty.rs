//! Kitty graphics protocol encoder: base64 RGBA framed in
//! APC escape sequences, either transmitted immediately or rendered as a
//! grid of Unicode placeholder glyphs ("virtual placement").

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::color::Color8;

/// Max bytes of base64 payload per `Gm=1;...` chunk when talking directly
/// to a terminal. Screen's 256-byte packet cap (see
/// [`crate::protocols::passthrough`]) forces a much smaller chunk when
/// multiplexed, chosen by the caller via [`KittyEncoder::with_chunk_size`].
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// The 297-entry table mapping a row or column index to the Kitty Unicode
/// placeholder diacritic that encodes it, transcribed from Kitty's
/// `encoding_diacritics` table: scattered combining marks across several
/// Unicode blocks, not a contiguous run.
const ENCODING_DIACRITICS: [u32; 297] = [
    0x0305, 0x030d, 0x030e, 0x0310, 0x0312, 0x033d, 0x033e, 0x033f,
    0x0346, 0x034a, 0x034b, 0x034c, 0x0350, 0x0351, 0x0352, 0x0357,
    0x035b, 0x0363, 0x0364, 0x0365, 0x0366, 0x0367, 0x0368, 0x0369,
    0x036a, 0x036b, 0x036c, 0x036d, 0x036e, 0x036f, 0x0483, 0x0484,
    0x0485, 0x0486, 0x0487, 0x0592, 0x0593, 0x0594, 0x0595, 0x0597,
    0x0598, 0x0599, 0x059c, 0x059d, 0x059e, 0x059f, 0x05a0, 0x05a1,
    0x05a8, 0x05a9, 0x05ab, 0x05ac, 0x05af, 0x05c4, 0x0610, 0x0611,
    0x0612, 0x0613, 0x0614, 0x0615, 0x0616, 0x0617, 0x0657, 0x0658,
    0x0659, 0x065a, 0x065b, 0x065d, 0x065e, 0x06d6, 0x06d7, 0x06d8,
    0x06d9, 0x06da, 0x06db, 0x06dc, 0x06df, 0x06e0, 0x06e1, 0x06e2,
    0x06e4, 0x06e7, 0x06e8, 0x06eb, 0x06ec, 0x0730, 0x0732, 0x0733,
    0x0735, 0x0736, 0x073a, 0x073d, 0x073f, 0x0740, 0x0741, 0x0743,
    0x0745, 0x0747, 0x0749, 0x074a, 0x07eb, 0x07ec, 0x07ed, 0x07ee,
    0x07ef, 0x07f0, 0x07f1, 0x07f3, 0x0816, 0x0817, 0x0818, 0x0819,
    0x081b, 0x081c, 0x081d, 0x081e, 0x081f, 0x0820, 0x0821, 0x0822,
    0x0823, 0x0825, 0x0826, 0x0827, 0x0829, 0x082a, 0x082b, 0x082c,
    0x082d, 0x0951, 0x0953, 0x0954, 0x0f82, 0x0f83, 0x0f86, 0x0f87,
    0x135d, 0x135e, 0x135f, 0x17dd, 0x193a, 0x1a17, 0x1a75, 0x1a76,
    0x1a77, 0x1a78, 0x1a79, 0x1a7a, 0x1a7b, 0x1a7c, 0x1b6b, 0x1b6d,
    0x1b6e, 0x1b6f, 0x1b70, 0x1b71, 0x1b72, 0x1b73, 0x1cd0, 0x1cd1,
    0x1cd2, 0x1cda, 0x1cdb, 0x1ce0, 0x1dc0, 0x1dc1, 0x1dc3, 0x1dc4,
    0x1dc5, 0x1dc6, 0x1dc7, 0x1dc8, 0x1dc9, 0x1dcb, 0x1dcc, 0x1dd1,
    0x1dd2, 0x1dd3, 0x1dd4, 0x1dd5, 0x1dd6, 0x1dd7, 0x1dd8, 0x1dd9,
    0x1dda, 0x1ddb, 0x1ddc, 0x1ddd, 0x1dde, 0x1ddf, 0x1de0, 0x1de1,
    0x1de2, 0x1de3, 0x1de4, 0x1de5, 0x1de6, 0x1dfe, 0x20d0, 0x20d1,
    0x20d4, 0x20d5, 0x20d6, 0x20d7, 0x20db, 0x20dc, 0x20e1, 0x20e7,
    0x20e9, 0x20f0, 0x2cef, 0x2cf0, 0x2cf1, 0x2de0, 0x2de1, 0x2de2,
    0x2de3, 0x2de4, 0x2de5, 0x2de6, 0x2de7, 0x2de8, 0x2de9, 0x2dea,
    0x2deb, 0x2dec, 0x2ded, 0x2dee, 0x2def, 0x2df0, 0x2df1, 0x2df2,
    0x2df3, 0x2df4, 0x2df5, 0x2df6, 0x2df7, 0x2df8, 0x2df9, 0x2dfa,
    0x2dfb, 0x2dfc, 0x2dfd, 0x2dfe, 0x2dff, 0xa66f, 0xa67c, 0xa67d,
    0xa6f0, 0xa6f1, 0xa8e0, 0xa8e1, 0xa8e2, 0xa8e3, 0xa8e4, 0xa8e5,
    0xa8e6, 0xa8e7, 0xa8e8, 0xa8e9, 0xa8ea, 0xa8eb, 0xa8ec, 0xa8ed,
    0xa8ee, 0xa8ef, 0xa8f0, 0xa8f1, 0xaab0, 0xaab2, 0xaab3, 0xaab7,
    0xaab8, 0xaabe, 0xaabf, 0xaac1, 0xfe20, 0xfe21, 0xfe22, 0xfe23,
    0xfe24, 0xfe25, 0xfe26, 0x10a0f, 0x10a38, 0x1d185, 0x1d186, 0x1d187,
    0x1d188, 0x1d189, 0x1d1aa, 0x1d1ab, 0x1d1ac, 0x1d1ad, 0x1d242, 0x1d243,
    0x1d244,
];

fn diacritic_for_row(row: u32) -> char {
    ENCODING_DIACRITICS
        .get(row as usize)
        .and_then(|&cp| char::from_u32(cp))
        .unwrap_or(' ')
}

/// Image placement ID space is 1..=255 with wraparound, avoiding 0.
#[derive(Debug)]
pub struct ImageIdAllocator {
    next: u32,
}

impl Default for ImageIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl ImageIdAllocator {
    pub fn alloc(&mut self) -> u32 {
        let id = self.next;
        self.next = if self.next >= 255 { 1 } else { self.next + 1 };
        id
    }
}

pub enum KittyMode {
    Immediate,
    UnicodeVirtualPlacement { id: u32, cols: u32, rows: u32 },
}

pub struct KittyEncoder {
    chunk_size: usize,
}

impl Default for KittyEncoder {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

impl KittyEncoder {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size: chunk_size.max(1) }
    }

    /// Encodes `pixels` (RGBA, row-major, `width x height`) as a complete
    /// Kitty APC sequence, chunked to `self.chunk_size` bytes of base64
    /// payload per packet.
    pub fn encode(&self, pixels: &[Color8], width: u32, height: u32, mode: KittyMode) -> Vec<u8> {
        let mut raw = Vec::with_capacity(pixels.len() * 4);
        for p in pixels {
            raw.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        let b64 = STANDARD.encode(&raw);

        let mut out = Vec::new();
        match mode {
            KittyMode::Immediate => {
                out.extend_from_slice(format!("\x1b_Ga=T,f=32,s={width},v={height},m=1\x1b\\").as_bytes());
                self.write_chunks(&b64, &mut out);
                out.extend_from_slice(b"\x1b_Gm=0\x1b\\");
            }
            KittyMode::UnicodeVirtualPlacement { id, cols, rows } => {
                out.extend_from_slice(
                    format!("\x1b_Ga=T,U=1,q=2,f=32,s={width},v={height},c={cols},r={rows},i={id},m=1\x1b\\").as_bytes(),
                );
                self.write_chunks(&b64, &mut out);
                out.extend_from_slice(b"\x1b_Gm=0\x1b\\");
                out.extend_from_slice(&render_placeholder_grid(id, cols, rows));
            }
        }
        out
    }

    fn write_chunks(&self, b64: &str, out: &mut Vec<u8>) {
        let bytes = b64.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            let end = (pos + self.chunk_size).min(bytes.len());
            out.extend_from_slice(b"\x1b_Gm=1;");
            out.extend_from_slice(&bytes[pos..end]);
            out.extend_from_slice(b"\x1b\\");
            pos = end;
        }
    }
}

/// Prints the `U+10EEEE`-based placeholder grid: each cell gets the base
/// placeholder code point followed by a row diacritic and a column
/// diacritic, colored via `ESC[38;5;<id>m` to carry the image ID in the
/// foreground pen. Rows are separated by cursor-left +
/// cursor-down-scroll.
fn render_placeholder_grid(id: u32, cols: u32, rows: u32) -> Vec<u8> {
    const PLACEHOLDER: char = '\u{10EEEE}';
    let mut out = Vec::new();
    out.extend_from_slice(format!("\x1b[38;5;{id}m").as_bytes());
    for row in 0..rows {
        for col in 0..cols {
            let mut buf = [0u8; 4];
            out.extend_from_slice(PLACEHOLDER.encode_utf8(&mut buf).as_bytes());
            out.extend_from_slice(diacritic_for_row(row).encode_utf8(&mut buf).as_bytes());
            out.extend_from_slice(diacritic_for_row(col).encode_utf8(&mut buf).as_bytes());
        }
        if row + 1 < rows {
            // Cursor-left by `cols` then Index (`ESC D`) to scroll down one
            // line, landing back under the first placeholder of this row.
            out.extend_from_slice(format!("\x1b[{cols}D\x1bD").as_bytes());
        }
    }
    out.extend_from_slice(b"\x1b[39m");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn diacritic_table_matches_upstream_entries() {
        assert_eq!(diacritic_for_row(0), '\u{0305}');
        assert_eq!(diacritic_for_row(1), '\u{030d}');
        assert_eq!(diacritic_for_row(2), '\u{030e}');
        assert_eq!(diacritic_for_row(296), '\u{1d244}');
    }

    #[test]
    fn image_id_allocator_wraps_around_avoiding_zero() {
        let mut alloc = ImageIdAllocator::default();
        assert_eq!(alloc.alloc(), 1);
        for _ in 0..253 {
            alloc.alloc();
        }
        assert_eq!(alloc.alloc(), 255);
        assert_eq!(alloc.alloc(), 1);
    }

    #[test]
    fn immediate_payload_round_trips_through_base64() {
        let pixels = vec![Color8::opaque(1, 2, 3); 4];
        let encoded = KittyEncoder::default().encode(&pixels, 2, 2, KittyMode::Immediate);
        let s = String::from_utf8(encoded).unwrap();
        assert!(s.starts_with("\x1b_Ga=T,f=32,s=2,v=2,m=1\x1b\\"));

        let payload: String = s
            .split("\x1b_Gm=1;")
            .skip(1)
            .map(|chunk| chunk.split("\x1b\\").next().unwrap())
            .collect();
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 255, 1, 2, 3, 255, 1, 2, 3, 255, 1, 2, 3, 255]);
    }

    #[test]
    fn chunking_respects_configured_chunk_size() {
        let pixels = vec![Color8::opaque(0, 0, 0); 256];
        let encoder = KittyEncoder::with_chunk_size(16);
        let encoded = encoder.encode(&pixels, 16, 16, KittyMode::Immediate);
        let s = String::from_utf8(encoded).unwrap();
        let n_chunks = s.matches("\x1b_Gm=1;").count();
        assert!(n_chunks > 1);
    }

    #[test]
    fn virtual_placement_emits_placeholder_glyphs() {
        let pixels = vec![Color8::opaque(9, 9, 9); 4];
        let encoded = KittyEncoder::default().encode(&pixels, 2, 2, KittyMode::UnicodeVirtualPlacement { id: 7, cols: 2, rows: 1 });
        let s = String::from_utf8(encoded).unwrap();
        assert!(s.contains("U=1"));
        assert!(s.contains('\u{10EEEE}'));
        assert!(s.contains("\x1b[38;5;7m"));
    }
}
