//! Dynamic 256-color palette construction via pairwise-nearest-neighbor
//! (PNN) clustering of a 3D RGB histogram.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::color::Color8;

use super::{Palette, PaletteKind};

/// Quality knob, 0.0 (fastest/coarsest) .. 1.0 (slowest/most accurate).
/// Chooses the sample-count target and the histogram bit depth per
/// channel.
#[derive(Debug, Clone, Copy)]
pub struct Quality(pub f32);

impl Quality {
    fn target_samples(self) -> usize {
        let q = self.0.clamp(0.0, 1.0) as f64;
        let log2 = 14.0 + q * (26.0 - 14.0);
        2f64.powf(log2) as usize
    }

    fn bits_per_channel(self) -> u32 {
        let q = self.0.clamp(0.0, 1.0);
        3 + (q * 2.0).round() as u32
    }
}

#[derive(Clone, Debug)]
struct Bin {
    sum_r: f64,
    sum_g: f64,
    sum_b: f64,
    count: f64,
    // Doubly linked "still alive" list, by bin-vector index. usize::MAX = none.
    prev: usize,
    next: usize,
    alive: bool,
    // Nearest-neighbor cache, invalidated (tm < mtm) after any merge that
    // touches this bin.
    nn: usize,
    nn_cost: f64,
    tm: u32,
}

impl Bin {
    fn mean(&self) -> (f64, f64, f64) {
        (self.sum_r / self.count, self.sum_g / self.count, self.sum_b / self.count)
    }
}

#[derive(Clone, Copy, PartialEq)]
struct HeapEntry {
    cost: f64,
    index: usize,
    stamp: u32,
}

impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the smallest cost first.
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

const CHANNEL_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

fn merge_cost(a: &Bin, b: &Bin, channel_weights: [f64; 3]) -> f64 {
    let (ar, ag, ab) = a.mean();
    let (br, bg, bb) = b.mean();
    let dr = ar - br;
    let dg = ag - bg;
    let db = ab - bb;
    let weighted = channel_weights[0] * dr * dr + channel_weights[1] * dg * dg + channel_weights[2] * db * db;
    // Opponent-space term: luma-orthogonal chroma difference, a cheap
    // stand-in for the full opponent-color transform.
    let opponent = ((dr - db) * (dr - db)) * 0.5;
    (a.count * b.count / (a.count + b.count)) * (weighted + opponent)
}

/// Samples `pixels` (RGBA8, row-major) down to the quality table's target
/// sample count, skipping pixels below `alpha_threshold`. Falls back to a
/// 1-pixel step (i.e. every pixel) if the first pass yields under 256
/// samples; returns an empty vec if that still yields nothing.
fn sample_pixels(pixels: &[Color8], alpha_threshold: u8, quality: Quality) -> Vec<Color8> {
    let target = quality.target_samples().max(1);
    let step = (pixels.len() / target).max(1);

    let sample = |step: usize| -> Vec<Color8> {
        pixels
            .iter()
            .step_by(step)
            .copied()
            .filter(|c| c.a >= alpha_threshold)
            .collect()
    };

    let samples = sample(step);
    if samples.len() >= 256 || step == 1 {
        return samples;
    }
    sample(1)
}

fn bin_samples(samples: &[Color8], bits_per_ch: u32) -> Vec<Bin> {
    let shift = 8 - bits_per_ch;
    let dim = 1usize << bits_per_ch;
    let mut table: std::collections::HashMap<usize, Bin> = std::collections::HashMap::new();

    for c in samples {
        let r = (c.r >> shift) as usize;
        let g = (c.g >> shift) as usize;
        let b = (c.b >> shift) as usize;
        let key = (r * dim + g) * dim + b;
        let entry = table.entry(key).or_insert(Bin {
            sum_r: 0.0,
            sum_g: 0.0,
            sum_b: 0.0,
            count: 0.0,
            prev: usize::MAX,
            next: usize::MAX,
            alive: true,
            nn: usize::MAX,
            nn_cost: f64::INFINITY,
            tm: 0,
        });
        entry.sum_r += c.r as f64;
        entry.sum_g += c.g as f64;
        entry.sum_b += c.b as f64;
        entry.count += 1.0;
    }

    table.into_values().collect()
}

/// Builds a dynamic palette of at most `n_colors` entries (plus the
/// transparent/default-fg/default-bg sentinels) from `pixels` by
/// pairwise-nearest-neighbor clustering.
pub fn build_dynamic_palette(
    pixels: &[Color8],
    n_colors: usize,
    alpha_threshold: u8,
    quality: Quality,
) -> Palette {
    let samples = sample_pixels(pixels, alpha_threshold, quality);
    if samples.is_empty() {
        return Palette::new(PaletteKind::Indexed256, Vec::new(), alpha_threshold);
    }

    let bits_per_ch = quality.bits_per_channel();
    let mut bins = bin_samples(&samples, bits_per_ch);

    let n_bins = bins.len() as f64;
    let w = (n_colors as f64 / n_bins).min(0.9);
    let channel_weights = if w < 0.03 { [1.0, 1.0, 1.0] } else { CHANNEL_WEIGHTS };

    // Wire up the doubly linked "alive" list in index order.
    for i in 0..bins.len() {
        bins[i].prev = if i == 0 { usize::MAX } else { i - 1 };
        bins[i].next = if i + 1 == bins.len() { usize::MAX } else { i + 1 };
    }

    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let recompute_nn = |bins: &[Bin], i: usize| -> (usize, f64) {
        let mut best = usize::MAX;
        let mut best_cost = f64::INFINITY;
        let mut j = bins[i].next;
        while j != usize::MAX {
            if bins[j].alive {
                let c = merge_cost(&bins[i], &bins[j], channel_weights);
                if c < best_cost {
                    best_cost = c;
                    best = j;
                }
            }
            j = bins[j].next;
        }
        let mut j = bins[i].prev;
        while j != usize::MAX {
            if bins[j].alive {
                let c = merge_cost(&bins[i], &bins[j], channel_weights);
                if c < best_cost {
                    best_cost = c;
                    best = j;
                }
            }
            j = bins[j].prev;
        }
        (best, best_cost)
    };

    for i in 0..bins.len() {
        let (nn, cost) = recompute_nn(&bins, i);
        bins[i].nn = nn;
        bins[i].nn_cost = cost;
        if nn != usize::MAX {
            heap.push(HeapEntry { cost, index: i, stamp: bins[i].tm });
        }
    }

    let mut n_alive = bins.len();
    let target = n_colors.max(1);

    while n_alive > target {
        let Some(top) = heap.pop() else { break };
        if !bins[top.index].alive || top.stamp != bins[top.index].tm {
            continue; // stale lazily-invalidated entry
        }
        let i = top.index;
        let j = bins[i].nn;
        if j == usize::MAX || !bins[j].alive {
            // Nearest neighbor went stale between push and pop; recompute
            // and requeue rather than merging incorrectly.
            let (nn, cost) = recompute_nn(&bins, i);
            bins[i].nn = nn;
            bins[i].nn_cost = cost;
            bins[i].tm += 1;
            if nn != usize::MAX {
                heap.push(HeapEntry { cost, index: i, stamp: bins[i].tm });
            }
            continue;
        }

        // Merge j into i.
        bins[i].sum_r += bins[j].sum_r;
        bins[i].sum_g += bins[j].sum_g;
        bins[i].sum_b += bins[j].sum_b;
        bins[i].count += bins[j].count;
        bins[j].alive = false;
        n_alive -= 1;

        // Unlink j from the list.
        let (pj, nj) = (bins[j].prev, bins[j].next);
        if pj != usize::MAX {
            bins[pj].next = nj;
        }
        if nj != usize::MAX {
            bins[nj].prev = pj;
        }

        bins[i].tm += 1;
        let (nn, cost) = recompute_nn(&bins, i);
        bins[i].nn = nn;
        bins[i].nn_cost = cost;
        if nn != usize::MAX {
            heap.push(HeapEntry { cost, index: i, stamp: bins[i].tm });
        }

        // Any survivor whose cached nn pointed at i or j is now stale;
        // bumping their tm and letting the lazy pop-time check above
        // filter out obsolete entries is cheaper than a full rescan.
        if pj != usize::MAX {
            bins[pj].tm += 1;
        }
        if nj != usize::MAX {
            bins[nj].tm += 1;
        }
    }

    let mut colors: Vec<Color8> = bins
        .iter()
        .filter(|b| b.alive)
        .map(|b| {
            let (r, g, b) = b.mean();
            Color8::opaque(r.round() as u8, g.round() as u8, b.round() as u8)
        })
        .collect();

    // Clean-up pass: drop near-duplicates (distance < ~2 in sixel-quantized
    // units, i.e. roughly one 0..100-scale step squared).
    colors.dedup_by(|a, b| a.diff_fast(*b) < 4);

    Palette::new(PaletteKind::Indexed256, colors, alpha_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color: Color8, n: usize) -> Vec<Color8> {
        vec![color; n]
    }

    #[test]
    fn single_color_image_yields_one_cluster() {
        let pixels = solid(Color8::opaque(200, 50, 10), 4096);
        let pal = build_dynamic_palette(&pixels, 16, 128, Quality(0.5));
        assert_eq!(pal.colors.len(), 1);
        assert!(pal.colors[0].diff_fast(Color8::opaque(200, 50, 10)) < 16);
    }

    #[test]
    fn two_far_apart_colors_stay_separate() {
        let mut pixels = solid(Color8::opaque(0, 0, 0), 2048);
        pixels.extend(solid(Color8::opaque(255, 255, 255), 2048));
        let pal = build_dynamic_palette(&pixels, 16, 128, Quality(0.5));
        assert_eq!(pal.colors.len(), 2);
    }

    #[test]
    fn empty_input_yields_empty_palette() {
        let pal = build_dynamic_palette(&[], 16, 128, Quality(0.5));
        assert!(pal.colors.is_empty());
    }

    #[test]
    fn never_exceeds_requested_color_count() {
        let mut pixels = Vec::new();
        for r in 0..16u8 {
            for g in 0..16u8 {
                pixels.push(Color8::opaque(r * 16, g * 16, 128));
            }
        }
        let pal = build_dynamic_palette(&pixels, 8, 0, Quality(0.3));
        assert!(pal.colors.len() <= 8);
    }

    #[test]
    fn below_alpha_threshold_pixels_are_skipped() {
        let mut pixels = solid(Color8::new(255, 0, 0, 255), 512);
        pixels.extend(vec![Color8::new(0, 255, 0, 0); 4096]);
        let pal = build_dynamic_palette(&pixels, 16, 128, Quality(0.5));
        assert!(pal.colors.iter().all(|c| c.diff_fast(Color8::opaque(255, 0, 0)) < 400));
    }
}
