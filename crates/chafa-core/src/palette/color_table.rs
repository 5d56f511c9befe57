//! Fast nearest-palette-color lookup via a PCA-projected 2D index with
//! sorted entries and binary search.

use crate::color::Color8;

#[derive(Debug, Clone, Copy)]
struct Entry {
    x: f64,
    y: f64,
    pen: usize,
}

#[derive(Debug, Clone)]
pub struct ColorTable {
    entries: Vec<Entry>,
    mean: [f64; 3],
    eigen_x: [f64; 3],
    eigen_y: [f64; 3],
    recip_x: f64,
    recip_y: f64,
}

fn to_vec3(c: Color8) -> [f64; 3] {
    [c.r as f64, c.g as f64, c.b as f64]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// One power-iteration pass to find the dominant eigenvector of the
/// (implicit) covariance matrix of `points` around `mean`, with a minimum
/// error of 0.0001 or a hard cap of 1000 iterations.
fn power_iteration(points: &[[f64; 3]], mean: [f64; 3], seed: [f64; 3]) -> [f64; 3] {
    let mut v = seed;
    for _ in 0..1000 {
        let mut next = [0.0; 3];
        for &p in points {
            let centered = sub(p, mean);
            let proj = dot(centered, v);
            next[0] += centered[0] * proj;
            next[1] += centered[1] * proj;
            next[2] += centered[2] * proj;
        }
        let n = norm(next);
        if n < 1e-12 {
            break;
        }
        next = scale(next, 1.0 / n);
        let error = norm(sub(next, v));
        v = next;
        if error < 0.0001 {
            break;
        }
    }
    v
}

/// Deflates `points` by removing the component along `eigen` so a second
/// call to [`power_iteration`] finds the next-largest axis.
fn deflate(points: &[[f64; 3]], mean: [f64; 3], eigen: [f64; 3]) -> Vec<[f64; 3]> {
    points
        .iter()
        .map(|&p| {
            let centered = sub(p, mean);
            let proj = dot(centered, eigen);
            sub(centered, scale(eigen, proj))
        })
        .collect()
}

impl ColorTable {
    pub fn build(colors: &[Color8]) -> Self {
        assert!(!colors.is_empty(), "ColorTable requires at least one palette color");

        let points: Vec<[f64; 3]> = colors.iter().map(|&c| to_vec3(c)).collect();
        let n = points.len() as f64;
        let mut mean = [0.0; 3];
        for p in &points {
            mean[0] += p[0];
            mean[1] += p[1];
            mean[2] += p[2];
        }
        mean = scale(mean, 1.0 / n);

        let eigen_x = power_iteration(&points, mean, [1.0, 0.0, 0.0]);
        let residual = deflate(&points, mean, eigen_x);
        // The residual is already centered at the origin; use a zero mean
        // for the second pass.
        let eigen_y_seed = if residual.iter().any(|r| norm(*r) > 1e-9) {
            [0.0, 1.0, 0.0]
        } else {
            [0.0, 0.0, 1.0]
        };
        let eigen_y = power_iteration(&residual, [0.0, 0.0, 0.0], eigen_y_seed);

        let recip_x = 1.0 / dot(eigen_x, eigen_x).max(1e-12);
        let recip_y = 1.0 / dot(eigen_y, eigen_y).max(1e-12);

        let mut entries: Vec<Entry> = points
            .iter()
            .enumerate()
            .map(|(pen, &p)| {
                let centered = sub(p, mean);
                let x = dot(centered, eigen_x) * recip_x;
                let y = dot(centered, eigen_y) * recip_y;
                Entry { x, y, pen }
            })
            .collect();
        entries.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());

        Self { entries, mean, eigen_x, eigen_y, recip_x, recip_y }
    }

    fn project(&self, c: Color8) -> (f64, f64) {
        let centered = sub(to_vec3(c), self.mean);
        (
            dot(centered, self.eigen_x) * self.recip_x,
            dot(centered, self.eigen_y) * self.recip_y,
        )
    }

    /// Binary-searches for the projected query, then scans outward in
    /// both directions while the x-axis bound alone could still improve
    /// on the current best, falling back to the full 3D RGB squared
    /// distance for every candidate that passes the cheap y-axis bound.
    pub fn nearest(&self, query: Color8, colors: &[Color8]) -> usize {
        let (vx, vy) = self.project(query);

        let start = self.entries.partition_point(|e| e.x < vx);

        let mut best_pen = self.entries.first().map(|e| e.pen).unwrap_or(0);
        let mut best_dist = u32::MAX;

        let mut check = |entry: &Entry, best_dist: &mut u32, best_pen: &mut usize| {
            let dx = entry.x - vx;
            let dist_bound_x = dx * dx;
            if (dist_bound_x as u32) >= *best_dist && *best_dist != u32::MAX {
                return false;
            }
            let dy = entry.y - vy;
            let _secondary_bound = dy * dy;
            let actual = colors[entry.pen].diff_fast(query);
            if actual < *best_dist {
                *best_dist = actual;
                *best_pen = entry.pen;
            }
            true
        };

        for entry in self.entries[start..].iter() {
            if !check(entry, &mut best_dist, &mut best_pen) {
                break;
            }
        }
        for entry in self.entries[..start].iter().rev() {
            if !check(entry, &mut best_dist, &mut best_pen) {
                break;
            }
        }

        best_pen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::fixed::table_256;

    #[test]
    fn nearest_is_idempotent_on_palette_points() {
        let colors = table_256().to_vec();
        let table = ColorTable::build(&colors);
        for (i, &c) in colors.iter().enumerate() {
            assert_eq!(table.nearest(c, &colors), i, "mismatch at pen {i}: {:?}", c);
        }
    }

    #[test]
    fn nearest_agrees_with_linear_scan_on_random_queries() {
        let colors = table_256().to_vec();
        let table = ColorTable::build(&colors);

        let mut state = 0x1234_5678_9abc_def0u64;
        let mut next_byte = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state & 0xff) as u8
        };

        for _ in 0..200 {
            let q = Color8::opaque(next_byte(), next_byte(), next_byte());
            let fast = table.nearest(q, &colors);
            let slow = colors
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.diff_fast(q))
                .map(|(i, _)| i)
                .unwrap();
            let fast_dist = colors[fast].diff_fast(q);
            let slow_dist = colors[slow].diff_fast(q);
            assert_eq!(fast_dist, slow_dist, "query {:?}: fast pen {fast} slow pen {slow}", q);
        }
    }
}
