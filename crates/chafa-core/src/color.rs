//! 8-bit RGBA color representation, packing, and the RGB/DIN99d color
//! spaces used throughout the renderer for perceptual color-difference
//! scoring.

/// Color space a buffer of [`Color8`] is expressed in. The container is the
/// same either way; the caller is responsible for knowing which space it
/// holds (dispatch is implicit, matching the upstream design).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Rgb,
    Din99d,
}

/// An 8-bit-per-channel RGBA color, packed as `A<<24 | R<<16 | G<<8 | B`
/// when serialized to a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    pub const fn pack(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | (self.b as u32)
    }

    pub const fn unpack(packed: u32) -> Self {
        Self {
            a: (packed >> 24) as u8,
            r: (packed >> 16) as u8,
            g: (packed >> 8) as u8,
            b: packed as u8,
        }
    }

    /// Sum of squared channel differences over R, G, B only. Used as the
    /// "fast" metric in both RGB and DIN99d space.
    pub fn diff_fast(self, other: Color8) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Weighted RGB difference that also accounts for alpha, used where
    /// transparency should influence the score (e.g. comparing against a
    /// composited background).
    pub fn diff_slow(self, other: Color8) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;

        let base = 2 * dr * dr + 4 * dg * dg + 3 * db * db;
        let chroma = ((self.r as i32 + other.r as i32) / 2) * (dr * dr - db * db).abs() / 256;

        let max_a = self.a.max(other.a) as i32;
        let da = self.a as i32 - other.a as i32;
        let alpha_penalty = (base + chroma) * max_a / 256 + 8 * da * da;

        alpha_penalty.max(0) as u32
    }
}

/// 4x`i16` accumulator form used when summing up to 64 pixels (a cell's
/// worth) into one mean color. `i16` is sufficient because `255 * 64`
/// fits comfortably.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorAccum {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
    pub n: i32,
}

impl ColorAccum {
    pub fn add(&mut self, c: Color8) {
        self.r += c.r as i32;
        self.g += c.g as i32;
        self.b += c.b as i32;
        self.a += c.a as i32;
        self.n += 1;
    }

    pub fn mean(&self) -> Option<Color8> {
        if self.n == 0 {
            return None;
        }
        let n = self.n;
        Some(Color8::new(
            (self.r / n) as u8,
            (self.g / n) as u8,
            (self.b / n) as u8,
            (self.a / n) as u8,
        ))
    }
}

const D65_WHITE: (f64, f64, f64) = (95.047, 100.0, 108.883);

fn srgb_to_linear(v: f64) -> f64 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.044_f64).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    const EPS: f64 = 216.0 / 24389.0;
    const KAPPA: f64 = 24389.0 / 27.0;
    if t > EPS {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

/// Converts an 8-bit RGB color to DIN99d space, storing the result in the
/// same 8-bit container. Alpha passes through unchanged.
pub fn rgb_to_din99d(c: Color8) -> Color8 {
    let r = srgb_to_linear(c.r as f64 / 255.0);
    let g = srgb_to_linear(c.g as f64 / 255.0);
    let b = srgb_to_linear(c.b as f64 / 255.0);

    // sRGB D65 -> XYZ
    let x = r * 0.4124564 + g * 0.3575761 + b * 0.1804375;
    let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
    let z = r * 0.0193339 + g * 0.1191920 + b * 0.9503041;

    let x = x * 100.0;
    let y = y * 100.0;
    let z = z * 100.0;

    // DIN99d tristimulus correction.
    let x99 = 1.12 * x - 0.12 * z;

    let fx = lab_f(x99 / D65_WHITE.0);
    let fy = lab_f(y / D65_WHITE.1);
    let fz = lab_f(z / D65_WHITE.2);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b_lab = 200.0 * (fy - fz);

    let l99 = 325.22 * (1.0 + 0.0036 * l).ln() * 2.5;

    let e = 0.6427876 * a + 0.7660444 * b_lab;
    let f = 1.14 * (0.6427876 * b_lab - 0.7660444 * a);
    let g_mag = (e * e + f * f).sqrt();
    let chroma = 22.5 * (1.0 + 0.06 * g_mag).ln();
    let h = f.atan2(e) + 50.0_f64.to_radians();

    let a99 = chroma * h.cos() * 2.5 + 128.0;
    let b99 = chroma * h.sin() * 2.5 + 128.0;

    Color8::new(
        l99.round().clamp(0.0, 255.0) as u8,
        a99.round().clamp(0.0, 255.0) as u8,
        b99.round().clamp(0.0, 255.0) as u8,
        c.a,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        for (r, g, b, a) in [(0u8, 0u8, 0u8, 0u8), (255, 128, 64, 255), (1, 2, 3, 4)] {
            let c = Color8::new(r, g, b, a);
            assert_eq!(Color8::unpack(c.pack()), c);
        }
    }

    #[test]
    fn diff_fast_zero_for_identical() {
        let c = Color8::opaque(10, 20, 30);
        assert_eq!(c.diff_fast(c), 0);
    }

    #[test]
    fn din99d_black_and_white_are_distinct_and_order_preserving() {
        let black = rgb_to_din99d(Color8::opaque(0, 0, 0));
        let gray = rgb_to_din99d(Color8::opaque(128, 128, 128));
        let white = rgb_to_din99d(Color8::opaque(255, 255, 255));
        assert!(black.r < gray.r);
        assert!(gray.r < white.r);
    }

    #[test]
    fn color_accum_mean() {
        let mut acc = ColorAccum::default();
        acc.add(Color8::opaque(0, 0, 0));
        acc.add(Color8::opaque(255, 255, 255));
        let mean = acc.mean().unwrap();
        assert_eq!(mean.r, 127);
    }
}
