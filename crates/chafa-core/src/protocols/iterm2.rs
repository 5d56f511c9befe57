//! iTerm2 inline-image encoder: wraps an uncompressed TIFF
//! of the RGBA buffer in a base64 `OSC 1337` escape.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::color::Color8;

const TIFF_HEADER_LEN: usize = 8;
const IFD_ENTRY_COUNT: u16 = 11;
const IFD_ENTRY_LEN: usize = 12;

/// Builds an uncompressed little-endian TIFF in memory: header, raw RGBA
/// scanlines, then an 11-entry IFD with the tag order and contents
/// iTerm2's inline-image decoder expects ("TIFF layout").
pub fn build_tiff(pixels: &[Color8], width: u32, height: u32) -> Vec<u8> {
    let pixel_bytes = (width as usize) * (height as usize) * 4;
    let ifd_offset = (TIFF_HEADER_LEN + pixel_bytes) as u32;

    let mut out = Vec::with_capacity(TIFF_HEADER_LEN + pixel_bytes + 2 + IFD_ENTRY_COUNT as usize * IFD_ENTRY_LEN + 4 + 8);

    // Header: "II" (little-endian), magic 42, offset to IFD.
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&ifd_offset.to_le_bytes());

    // Raw RGBA scanlines.
    for p in pixels {
        out.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }

    // BitsPerSample external array: four u16 = 8, stored after the IFD's
    // next-IFD-offset field; its own offset is computed up front.
    let bits_per_sample_offset = ifd_offset as usize + 2 + IFD_ENTRY_COUNT as usize * IFD_ENTRY_LEN + 4;

    out.extend_from_slice(&IFD_ENTRY_COUNT.to_le_bytes());

    let entry = |out: &mut Vec<u8>, tag: u16, ty: u16, count: u32, value: u32| {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&ty.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    };

    const TYPE_SHORT: u16 = 3;
    const TYPE_LONG: u16 = 4;

    entry(&mut out, 256, TYPE_LONG, 1, width); // ImageWidth
    entry(&mut out, 257, TYPE_LONG, 1, height); // ImageLength
    entry(&mut out, 258, TYPE_SHORT, 4, bits_per_sample_offset as u32); // BitsPerSample (external)
    entry(&mut out, 262, TYPE_SHORT, 1, 2); // PhotometricInterpretation = RGB
    entry(&mut out, 273, TYPE_LONG, 1, TIFF_HEADER_LEN as u32); // StripOffsets
    entry(&mut out, 274, TYPE_SHORT, 1, 1); // Orientation = TopLeft
    entry(&mut out, 277, TYPE_SHORT, 1, 4); // SamplesPerPixel
    entry(&mut out, 278, TYPE_LONG, 1, height); // RowsPerStrip
    entry(&mut out, 279, TYPE_LONG, 1, pixel_bytes as u32); // StripByteCounts
    entry(&mut out, 284, TYPE_SHORT, 1, 1); // PlanarConfiguration = Contiguous
    entry(&mut out, 338, TYPE_SHORT, 1, 2); // ExtraSamples = UnassociatedAlpha

    out.extend_from_slice(&0u32.to_le_bytes()); // next IFD offset = 0

    for _ in 0..4u16 {
        out.extend_from_slice(&8u16.to_le_bytes());
    }

    out
}

/// Wraps `build_tiff`'s output in the base64 `OSC 1337 File=` escape, sized
/// for `width_cells x height_cells` character cells.
pub fn encode(pixels: &[Color8], width: u32, height: u32, width_cells: u32, height_cells: u32) -> Vec<u8> {
    let tiff = build_tiff(pixels, width, height);
    let b64 = STANDARD.encode(&tiff);
    let mut out = Vec::new();
    out.extend_from_slice(format!("\x1b]1337;File=inline=1;width={width_cells};height={height_cells};preserveAspectRatio=0:").as_bytes());
    out.extend_from_slice(b64.as_bytes());
    out.push(0x07);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiff_header_is_bit_exact() {
        let pixels = vec![Color8::opaque(1, 2, 3); 4];
        let tiff = build_tiff(&pixels, 2, 2);
        assert_eq!(&tiff[0..4], &[0x49, 0x49, 0x2A, 0x00]);
        let ifd_offset = u32::from_le_bytes(tiff[4..8].try_into().unwrap());
        assert_eq!(ifd_offset as usize, TIFF_HEADER_LEN + 2 * 2 * 4);
    }

    #[test]
    fn tiff_ifd_has_eleven_entries_in_spec_order() {
        let pixels = vec![Color8::opaque(0, 0, 0); 1];
        let tiff = build_tiff(&pixels, 1, 1);
        let ifd_offset = u32::from_le_bytes(tiff[4..8].try_into().unwrap()) as usize;
        let count = u16::from_le_bytes(tiff[ifd_offset..ifd_offset + 2].try_into().unwrap());
        assert_eq!(count, 11);
        let first_tag = u16::from_le_bytes(tiff[ifd_offset + 2..ifd_offset + 4].try_into().unwrap());
        assert_eq!(first_tag, 256);
        let last_entry_off = ifd_offset + 2 + 10 * IFD_ENTRY_LEN;
        let last_tag = u16::from_le_bytes(tiff[last_entry_off..last_entry_off + 2].try_into().unwrap());
        assert_eq!(last_tag, 338);
    }

    #[test]
    fn osc_1337_framing_round_trips_base64() {
        let pixels = vec![Color8::opaque(5, 6, 7); 1];
        let out = encode(&pixels, 1, 1, 1, 1);
        assert!(out.starts_with(b"\x1b]1337;File=inline=1;width=1;height=1;preserveAspectRatio=0:"));
        assert_eq!(*out.last().unwrap(), 0x07);
        let header_len = b"\x1b]1337;File=inline=1;width=1;height=1;preserveAspectRatio=0:".len();
        let payload = &out[header_len..out.len() - 1];
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(&decoded[0..4], &[0x49, 0x49, 0x2A, 0x00]);
    }
}
