//! Selector grammar and the prepared, searchable form of a [`SymbolMap`].

use std::sync::Arc;

use super::catalog::{self, Symbol, SymbolTags, WideSymbol};

/// One include/exclude rule over a tag-set and/or a code point range.
#[derive(Debug, Clone, Copy)]
pub struct SymbolRange {
    pub include: bool,
    pub tags: SymbolTags,
    pub first_cp: char,
    pub last_cp: char,
}

impl SymbolRange {
    pub const fn tags(include: bool, tags: SymbolTags) -> Self {
        Self { include, tags, first_cp: '\u{0}', last_cp: char::MAX }
    }

    pub const fn range(include: bool, first_cp: char, last_cp: char) -> Self {
        Self { include, tags: SymbolTags::empty(), first_cp, last_cp }
    }

    fn matches(&self, s: &Symbol) -> bool {
        let tag_match = self.tags.is_empty() || self.tags.intersects(s.tags);
        let range_match = s.code_point >= self.first_cp && s.code_point <= self.last_cp;
        if self.tags.is_empty() {
            range_match
        } else if self.first_cp == '\u{0}' && self.last_cp == char::MAX {
            tag_match
        } else {
            tag_match && range_match
        }
    }
}

/// A single step in the additive selection grammar.
#[derive(Debug, Clone, Copy)]
pub enum SelectorOp {
    Add(SymbolRange),
    Remove(SymbolRange),
}

/// Candidate returned by [`PreparedSymbolMap::find_candidates`]: the
/// symbol's index into the prepared dense array, whether it matched via
/// the complemented bitmap ("invert"), and the Hamming distance found.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub index: usize,
    pub inverted: bool,
    pub distance: u32,
}

/// The materialized, search-ready form of a [`SymbolMap`]. Built by
/// [`SymbolMap::prepare`]; index `i` into `symbols` and `bitmaps` refer to
/// the same glyph (parallel arrays) — callers must keep both in lockstep.
#[derive(Debug, Clone)]
pub struct PreparedSymbolMap {
    pub symbols: Vec<Symbol>,
    pub bitmaps: Vec<u64>,
    pub wide_symbols: Vec<WideSymbol>,
    pub allow_inverse: bool,
}

impl PreparedSymbolMap {
    /// Finds the `k` narrow symbols whose bitmap is closest (by Hamming
    /// distance) to `target`, optionally also testing the complemented
    /// target when the map allows inversion. Returns candidates sorted by
    /// ascending distance.
    pub fn find_candidates(&self, target: u64, k: usize) -> Vec<Candidate> {
        let mut best: Vec<Candidate> = Vec::with_capacity(k + 1);

        let mut consider = |index: usize, bitmap: u64, inverted: bool, cmp: u64| {
            let distance = (bitmap ^ cmp).count_ones();
            let pos = best.partition_point(|c| c.distance <= distance);
            if best.len() < k || pos < k {
                best.insert(pos, Candidate { index, inverted, distance });
                if best.len() > k {
                    best.truncate(k);
                }
            }
        };

        for (index, &bitmap) in self.bitmaps.iter().enumerate() {
            consider(index, bitmap, false, target);
        }
        if self.allow_inverse {
            let inv_target = !target;
            for (index, &bitmap) in self.bitmaps.iter().enumerate() {
                consider(index, bitmap, true, inv_target);
            }
        }
        best
    }

    /// Finds the narrow symbol whose popcount best matches `target_popcount`,
    /// ignoring shape entirely. Used by the fill symbol map.
    pub fn find_by_popcount(&self, target_popcount: u32) -> Option<usize> {
        self.symbols
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| (s.fg_weight as i32 - target_popcount as i32).abs())
            .map(|(i, _)| i)
    }

    pub fn find_wide_candidates(&self, target: u128, k: usize) -> Vec<Candidate> {
        let mut best: Vec<Candidate> = Vec::with_capacity(k + 1);
        for (index, w) in self.wide_symbols.iter().enumerate() {
            let distance = (w.coverage128() ^ target).count_ones();
            let pos = best.partition_point(|c| c.distance <= distance);
            if best.len() < k || pos < k {
                best.insert(pos, Candidate { index, inverted: false, distance });
                if best.len() > k {
                    best.truncate(k);
                }
            }
        }
        best
    }
}

/// A reference-counted bag of selector rules plus an optional user-glyph
/// override table. Mutation after preparation marks the map dirty; the
/// next [`SymbolMap::prepare`] call clones-on-write rather than tracking
/// incremental diffs.
#[derive(Debug, Clone)]
pub struct SymbolMap {
    ops: Vec<SelectorOp>,
    user_narrow: Vec<Symbol>,
    user_wide: Vec<WideSymbol>,
    allow_inverse: bool,
    prepared: Option<Arc<PreparedSymbolMap>>,
}

impl Default for SymbolMap {
    fn default() -> Self {
        Self {
            ops: vec![SelectorOp::Add(SymbolRange::tags(true, SymbolTags::BASE))],
            user_narrow: Vec::new(),
            user_wide: Vec::new(),
            allow_inverse: false,
            prepared: None,
        }
    }
}

impl SymbolMap {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            user_narrow: Vec::new(),
            user_wide: Vec::new(),
            allow_inverse: false,
            prepared: None,
        }
    }

    pub fn add_by_tags(&mut self, tags: SymbolTags) {
        self.ops.push(SelectorOp::Add(SymbolRange::tags(true, tags)));
        self.prepared = None;
    }

    pub fn remove_by_tags(&mut self, tags: SymbolTags) {
        self.ops.push(SelectorOp::Remove(SymbolRange::tags(false, tags)));
        self.prepared = None;
    }

    pub fn add_range(&mut self, first_cp: char, last_cp: char) {
        self.ops.push(SelectorOp::Add(SymbolRange::range(true, first_cp, last_cp)));
        self.prepared = None;
    }

    pub fn set_allow_inverse(&mut self, allow: bool) {
        self.allow_inverse = allow;
        self.prepared = None;
    }

    pub fn add_user_glyph(&mut self, symbol: Symbol) {
        self.user_narrow.push(symbol);
        self.prepared = None;
    }

    pub fn needs_rebuild(&self) -> bool {
        self.prepared.is_none()
    }

    /// Materializes the selection into a dense, search-ready
    /// [`PreparedSymbolMap`], cloning the builtin catalog only on first use
    /// after a mutation (copy-on-write).
    pub fn prepare(&mut self) -> Arc<PreparedSymbolMap> {
        if let Some(p) = &self.prepared {
            return p.clone();
        }

        let all_narrow = all_selectable_narrow_symbols();
        let mut selected: Vec<Symbol> = Vec::new();

        for op in &self.ops {
            match op {
                SelectorOp::Add(range) => {
                    for s in &all_narrow {
                        if range.matches(s) && !selected.iter().any(|x| x.code_point == s.code_point) {
                            selected.push(*s);
                        }
                    }
                }
                SelectorOp::Remove(range) => {
                    selected.retain(|s| !range.matches(s));
                }
            }
        }

        for s in &self.user_narrow {
            if !selected.iter().any(|x| x.code_point == s.code_point) {
                selected.push(*s);
            }
        }

        selected.sort_by_key(|s| s.code_point);
        let bitmaps = selected.iter().map(|s| s.bitmap).collect();

        let mut wide = catalog::builtin_wide_symbols();
        wide.extend(self.user_wide.iter().copied());

        let prepared = Arc::new(PreparedSymbolMap {
            symbols: selected,
            bitmaps,
            wide_symbols: wide,
            allow_inverse: self.allow_inverse,
        });
        self.prepared = Some(prepared.clone());
        prepared
    }
}

fn all_selectable_narrow_symbols() -> Vec<Symbol> {
    let mut v = catalog::builtin_narrow_symbols();
    v.extend(catalog::all_braille_symbols());
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_selects_block_border_and_space_only() {
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        assert!(!prepared.symbols.is_empty());
        assert!(prepared.symbols.iter().all(|s| s.tags.intersects(SymbolTags::BASE)));
        assert!(prepared.symbols.iter().any(|s| s.code_point == '\u{2588}'));
        assert!(prepared.symbols.iter().all(|s| s.code_point != '\u{2800}'));
    }

    #[test]
    fn adding_braille_tag_pulls_in_generated_glyphs() {
        let mut map = SymbolMap::default();
        map.add_by_tags(SymbolTags::BRAILLE);
        let prepared = map.prepare();
        assert!(prepared.symbols.iter().any(|s| s.tags.contains(SymbolTags::BRAILLE)));
        assert_eq!(
            prepared.symbols.iter().filter(|s| s.tags.contains(SymbolTags::BRAILLE)).count(),
            256
        );
    }

    #[test]
    fn bitmaps_are_parallel_to_symbols() {
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        assert_eq!(prepared.symbols.len(), prepared.bitmaps.len());
        for (s, &b) in prepared.symbols.iter().zip(prepared.bitmaps.iter()) {
            assert_eq!(s.bitmap, b);
        }
    }

    #[test]
    fn find_candidates_returns_exact_match_first() {
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        let full_block = 0xFFFF_FFFF_FFFF_FFFFu64;
        let candidates = prepared.find_candidates(full_block, 4);
        assert_eq!(candidates[0].distance, 0);
        assert_eq!(prepared.symbols[candidates[0].index].code_point, '\u{2588}');
    }

    #[test]
    fn needs_rebuild_after_mutation() {
        let mut map = SymbolMap::default();
        map.prepare();
        assert!(!map.needs_rebuild());
        map.add_by_tags(SymbolTags::DOT);
        assert!(map.needs_rebuild());
    }

    #[test]
    fn fill_search_matches_by_popcount_only() {
        let mut map = SymbolMap::default();
        let prepared = map.prepare();
        let idx = prepared.find_by_popcount(32).unwrap();
        // Half blocks (weight 32) should be preferred over full/empty.
        assert!((prepared.symbols[idx].fg_weight as i32 - 32).abs() <= 32);
    }
}
