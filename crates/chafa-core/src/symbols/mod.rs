//! The built-in glyph catalog and the selectable, prepared [`SymbolMap`].

pub mod catalog;
pub mod map;

pub use catalog::{Symbol, SymbolTags, WideSymbol};
pub use map::{SelectorOp, SymbolMap, SymbolRange};

/// Popcount of a 64-bit coverage bitmap, used both to build a [`Symbol`]'s
/// cached weights and to score candidates against a cell's own coverage.
pub const fn popcount64(bits: u64) -> u32 {
    bits.count_ones()
}
