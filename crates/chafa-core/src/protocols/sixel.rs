//! DEC Sixel encoder.
//!
//! Sixels pack 6 vertical pixels into one printable character in
//! `'?'..'~'`. The encoder works from an [`IndexedImage`] (palette indices,
//! not RGB), rounding its height up to a multiple of 6 via [`SixelCanvas`]
//! so every sixel row strip is complete.

use crate::batch;
use crate::color::{Color8, ColorSpace};
use crate::palette::Palette;

/// A palette-indexed image: one pen per pixel, plus the palette it was
/// quantized against. Pens are `u16` rather than `u8` because a
/// fully-populated 256-color palette places its transparent sentinel at
/// index 256 (past the last real color); narrowing that to `u8` would wrap
/// it onto real pen 0, violating the "transparent index never points at a
/// real color" invariant.
#[derive(Debug, Clone)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub palette: Palette,
    pub indices: Vec<u16>,
}

impl IndexedImage {
    /// Quantizes `pixels` (row-major, `width x height`) against `palette`,
    /// mapping alpha below the palette's threshold to the transparent pen.
    pub fn quantize(pixels: &[Color8], width: u32, height: u32, palette: &Palette) -> Self {
        let transparent = palette.transparent_index as u16;
        let indices = pixels
            .iter()
            .map(|&p| {
                if palette.is_transparent(p.a) {
                    transparent
                } else {
                    palette.nearest_pen(p) as u16
                }
            })
            .collect();
        Self { width, height, palette: palette.clone(), indices }
    }

    pub fn pixel_at(&self, x: u32, y: u32) -> u16 {
        self.indices[(y * self.width + x) as usize]
    }
}

/// Wraps an [`IndexedImage`] with its height rounded up to a multiple of 6
/// (a sixel "row" covers 6 image rows) and tags the color space the
/// background fill color should be read in.
pub struct SixelCanvas {
    pub image: IndexedImage,
    pub bg_color_space: ColorSpace,
}

impl SixelCanvas {
    pub fn new(image: IndexedImage, bg_color_space: ColorSpace) -> Self {
        let rounded_height = image.height.div_ceil(6) * 6;
        let mut image = image;
        if rounded_height != image.height {
            image.indices.resize((rounded_height * image.width) as usize, image.palette.transparent_index as u16);
            image.height = rounded_height;
        }
        Self { image, bg_color_space }
    }

    pub fn n_strips(&self) -> u32 {
        self.image.height / 6
    }
}

const SIXEL_CHAR_BASE: u8 = b'?';

/// Maps 6 stacked pixel rows at column `x` to a 6-bit sixel value: bit *i*
/// (0 = top) set iff `strip`'s pen at row `i`, column `x` equals `pen`.
fn sixel_column_bits(strip: &[&[u16]], x: usize, pen: u16) -> u8 {
    let mut bits = 0u8;
    for (i, row) in strip.iter().enumerate() {
        if row[x] == pen {
            bits |= 1 << i;
        }
    }
    bits
}

/// Per-pen, per-64-column presence bitfield: lets the run-length encoder
/// skip whole bands that don't contain the pen at all.
fn pen_presence_bands(strip: &[&[u16]], width: u32, pen: u16) -> Vec<bool> {
    let n_bands = width.div_ceil(64) as usize;
    let mut present = vec![false; n_bands];
    for (band, slot) in present.iter_mut().enumerate() {
        let lo = band * 64;
        let hi = ((band + 1) * 64).min(width as usize);
        *slot = strip.iter().any(|row| row[lo..hi].iter().any(|&p| p == pen));
    }
    present
}

/// Run-length-encodes one pen's sixel characters across a row strip into
/// `out`, homing with `$` first and selecting the pen with `#<pen>`.
/// Repeats longer than 3 collapse to `!<count><char>`; counts above 255
/// split into multiple `!255<char>` groups.
fn emit_pen_run(out: &mut Vec<u8>, strip: &[&[u16]], width: u32, pen: u16, presence: &[bool]) {
    out.push(b'$');
    out.push(b'#');
    out.extend_from_slice(pen.to_string().as_bytes());

    let mut run_char: Option<u8> = None;
    let mut run_len: u32 = 0;

    let flush = |out: &mut Vec<u8>, run_char: &mut Option<u8>, run_len: &mut u32| {
        let Some(ch) = *run_char else { return };
        let mut remaining = *run_len;
        while remaining > 255 {
            out.push(b'!');
            out.extend_from_slice(b"255");
            out.push(ch);
            remaining -= 255;
        }
        if remaining > 3 {
            out.push(b'!');
            out.extend_from_slice(remaining.to_string().as_bytes());
            out.push(ch);
        } else {
            for _ in 0..remaining {
                out.push(ch);
            }
        }
        *run_char = None;
        *run_len = 0;
    };

    for band in 0..width.div_ceil(64) as usize {
        if !presence[band] {
            let lo = (band * 64) as u32;
            let hi = ((band + 1) * 64).min(width);
            let ch = SIXEL_CHAR_BASE; // all-zero sixel for an empty band
            if run_char == Some(ch) {
                run_len += hi - lo;
            } else {
                flush(out, &mut run_char, &mut run_len);
                run_char = Some(ch);
                run_len = hi - lo;
            }
            continue;
        }
        let lo = band * 64;
        let hi = ((band + 1) * 64).min(width as usize);
        for x in lo..hi {
            let bits = sixel_column_bits(strip, x, pen);
            let ch = SIXEL_CHAR_BASE + bits;
            if run_char == Some(ch) {
                run_len += 1;
            } else {
                flush(out, &mut run_char, &mut run_len);
                run_char = Some(ch);
                run_len = 1;
            }
        }
    }
    flush(out, &mut run_char, &mut run_len);
}

fn encode_strip(image: &IndexedImage, strip_row: u32) -> Vec<u8> {
    let width = image.width as usize;
    let rows: Vec<&[u16]> = (0..6)
        .map(|i| {
            let y = strip_row * 6 + i;
            &image.indices[(y * image.width) as usize..(y * image.width) as usize + width]
        })
        .collect();

    let n_pens = image.palette.colors.len();
    let transparent = image.palette.transparent_index;
    let mut out = Vec::new();
    for pen in 0..n_pens {
        if pen == transparent {
            continue;
        }
        let presence = pen_presence_bands(&rows, image.width, pen as u16);
        if presence.iter().any(|&p| p) {
            emit_pen_run(&mut out, &rows, image.width, pen as u16, &presence);
        }
    }
    out
}

fn emit_palette_definitions(out: &mut Vec<u8>, palette: &Palette) {
    for (pen, color) in palette.colors.iter().enumerate() {
        out.push(b'#');
        out.extend_from_slice(pen.to_string().as_bytes());
        out.push(b';');
        out.extend_from_slice(b"2;");
        let scale = |v: u8| (v as u32 * 100 + 127) / 255;
        out.extend_from_slice(scale(color.r).to_string().as_bytes());
        out.push(b';');
        out.extend_from_slice(scale(color.g).to_string().as_bytes());
        out.push(b';');
        out.extend_from_slice(scale(color.b).to_string().as_bytes());
    }
}

/// Encodes `canvas` as a complete DEC Sixel sequence: DCS header with
/// raster attributes, palette definitions, per-strip bodies separated by
/// `-` (DECGNL), then the DCS terminator. Strips are
/// encoded in parallel via the batch scheduler and concatenated in row
/// order, matching the single-threaded result byte-for-byte.
pub fn encode_sixels(canvas: &SixelCanvas) -> Vec<u8> {
    let image = &canvas.image;
    let mut out = Vec::new();
    out.extend_from_slice(b"\x1bP0;1;0q");
    out.extend_from_slice(format!("\"1;1;{};{}", image.width, image.height).as_bytes());
    emit_palette_definitions(&mut out, &image.palette);

    let n_strips = canvas.n_strips();
    let mut strip_bodies = vec![Vec::new(); n_strips as usize];
    batch::process_batches(
        n_strips,
        batch::n_actual_threads(),
        1,
        |b| {
            (b.first_row..b.first_row + b.n_rows)
                .map(|strip| encode_strip(image, strip))
                .collect::<Vec<_>>()
        },
        |b, results| {
            for (i, body) in results.into_iter().enumerate() {
                strip_bodies[(b.first_row as usize) + i] = body;
            }
        },
    );

    for (i, body) in strip_bodies.into_iter().enumerate() {
        out.extend_from_slice(&body);
        if (i as u32) + 1 < n_strips {
            out.push(b'-');
        }
    }
    out.extend_from_slice(b"\x1b\\");
    out
}

/// Decodes an encoded sixel stream produced by [`encode_sixels`] back into
/// a flat palette-index buffer, used by the RLE round-trip test below.
/// Only understands the subset this encoder emits: `#<pen>`, `$`, `-`,
/// `!<count><char>`, bare sixel chars, and the DCS/raster-attribute
/// header.
pub fn decode_sixels(data: &[u8], palette: &Palette) -> Option<IndexedImage> {
    let s = std::str::from_utf8(data).ok()?;
    let body_start = s.find('q')? + 1;
    let rest = &s[body_start..];
    let (w, h, body) = if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find(|c: char| !c.is_ascii_digit() && c != ';')?;
        let params: Vec<&str> = stripped[..end].split(';').collect();
        let w: u32 = params.get(2)?.parse().ok()?;
        let h: u32 = params.get(3)?.parse().ok()?;
        (w, h, &stripped[end..])
    } else {
        return None;
    };

    let mut indices = vec![palette.transparent_index as u16; (w * h) as usize];
    let mut pen = 0u16;
    let mut strip_row = 0u32;
    let mut x = 0u32;

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '#' => {
                let mut digits = String::new();
                while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                    digits.push(chars.next().unwrap());
                }
                pen = digits.parse().ok()?;
            }
            '$' => x = 0,
            '-' => {
                strip_row += 1;
                x = 0;
            }
            '!' => {
                let mut digits = String::new();
                while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                    digits.push(chars.next().unwrap());
                }
                let count: u32 = digits.parse().ok()?;
                let ch = chars.next()?;
                for _ in 0..count {
                    set_sixel_column(&mut indices, w, strip_row, x, ch as u8, pen);
                    x += 1;
                }
            }
            '\x1b' => break,
            ch => {
                set_sixel_column(&mut indices, w, strip_row, x, ch as u8, pen);
                x += 1;
            }
        }
    }

    Some(IndexedImage { width: w, height: h, palette: palette.clone(), indices })
}

fn set_sixel_column(indices: &mut [u16], width: u32, strip_row: u32, x: u32, sixel_char: u8, pen: u16) {
    if x >= width {
        return;
    }
    let bits = sixel_char.wrapping_sub(SIXEL_CHAR_BASE);
    for i in 0..6u32 {
        if bits & (1 << i) != 0 {
            let y = strip_row * 6 + i;
            indices[(y * width + x) as usize] = pen;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteKind;

    fn two_pen_palette() -> Palette {
        Palette::new(PaletteKind::Indexed16, vec![Color8::opaque(0xff, 0, 0), Color8::opaque(0, 0xff, 0)], 128)
    }

    #[test]
    fn encodes_framing_and_palette_definitions() {
        let palette = two_pen_palette();
        let image = IndexedImage { width: 1, height: 6, palette, indices: vec![0, 0, 0, 1, 1, 1] };
        let canvas = SixelCanvas::new(image, ColorSpace::Rgb);
        let out = encode_sixels(&canvas);
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with("\x1bP0;1;0q\"1;1;1;6"));
        assert!(s.contains("#1"));
        assert!(s.contains("#0"));
        assert!(s.ends_with("\x1b\\"));
    }

    #[test]
    fn round_trips_through_decode() {
        let palette = two_pen_palette();
        let indices = vec![1u16; 1 * 6];
        let image = IndexedImage { width: 1, height: 6, palette: palette.clone(), indices: indices.clone() };
        let canvas = SixelCanvas::new(image, ColorSpace::Rgb);
        let encoded = encode_sixels(&canvas);
        let decoded = decode_sixels(&encoded, &palette).unwrap();
        assert_eq!(decoded.width, 1);
        assert_eq!(decoded.height, 6);
        assert_eq!(decoded.indices, indices);
    }

    #[test]
    fn height_is_rounded_up_to_multiple_of_six() {
        let palette = two_pen_palette();
        let image = IndexedImage { width: 2, height: 4, palette, indices: vec![0; 8] };
        let canvas = SixelCanvas::new(image, ColorSpace::Rgb);
        assert_eq!(canvas.image.height, 6);
        assert_eq!(canvas.n_strips(), 1);
    }
}
