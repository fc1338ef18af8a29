//! The color-distance vector kernel (spec.md §4.6), grounded on
//! `original_source`'s `distance_t` arrays and `DISTANCE_INFINITY` sentinel.

/// A per-vertex flat array of `n_colors` signed distances, one slot per
/// color, plus the two saturating sentinels `+∞`/`−∞` encoded as ordinary
/// `i32` values clamped far enough from overflow that `±1` never wraps.
pub type Distance = i32;

/// `i32::MAX - 1`: one below overflow, so `DISTANCE_INFINITY + 1` still
/// compares greater than any finite distance without wrapping.
pub const DISTANCE_INFINITY: Distance = Distance::MAX - 1;
pub const DISTANCE_MINUS_INFINITY: Distance = -DISTANCE_INFINITY;

const _: () = assert!(DISTANCE_INFINITY > 0);
const _: () = assert!(DISTANCE_INFINITY + 1 > 0);
const _: () = assert!(DISTANCE_MINUS_INFINITY < 0);
const _: () = assert!(DISTANCE_MINUS_INFINITY - 1 < 0);

/// `1 - 2*((parity + color) & 1)`: `+1` if the edge's reduced color favors
/// the player currently being solved for under `parity`, `-1` otherwise.
pub fn color_distance_delta(parity_is_odd: bool, color: u32) -> Distance {
    let parity_bit = parity_is_odd as u32;
    1 - (((parity_bit + color) & 1) as Distance) * 2
}

/// Compares two color-distance vectors of `n_colors` slots starting at
/// `a_base`/`b_base`, lexicographically from the most significant
/// (lowest-indexed) color. Returns the common-prefix length (colors where
/// they agreed) and, if they differ, which side is greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOrdering {
    Equal,
    Less,
    Greater,
}

pub fn compare_vectors(a: &[Distance], b: &[Distance]) -> VectorOrdering {
    debug_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        if x < y {
            return VectorOrdering::Less;
        }
        if x > y {
            return VectorOrdering::Greater;
        }
    }
    VectorOrdering::Equal
}
