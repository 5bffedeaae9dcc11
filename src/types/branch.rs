// SPDX-License-Identifier: Apache-2.0
//! Branch-map accumulator
//!
//! Records one taken/not-taken bit per conditional branch retired since the
//! last flush, up to [`Map::MAX_BRANCHES`] of them.

/// The taken/not-taken record of conditional branches pending a flush
///
/// The lowest valued bit corresponds to the oldest branch. Following the
/// protocol's fixed inversion convention, a set bit means "not taken" and an
/// unset bit means "taken".
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct Map {
    cnt: u8,
    bits: u32,
}

impl Map {
    /// Maximum number of branches a branch map can hold before it saturates
    pub const MAX_BRANCHES: u8 = 31;

    /// Create a branch map directly from a bit count and raw bit pattern
    ///
    /// Used by the packet decoder, which reads both fields off the wire
    /// directly. Bits above `cnt` in `bits` are masked off.
    pub fn from_parts(cnt: u8, bits: u32) -> Self {
        let cnt = cnt.min(Self::MAX_BRANCHES);
        let mask = 1u32.checked_shl(cnt.into()).unwrap_or(0).wrapping_sub(1);
        Self {
            cnt,
            bits: bits & mask,
        }
    }

    /// Record a new branch outcome
    ///
    /// Has no effect once the map is [`full`][Self::full].
    pub fn push(&mut self, taken: bool) {
        if self.full() {
            return;
        }
        if !taken {
            self.bits |= 1 << self.cnt;
        }
        self.cnt += 1;
    }

    /// Remove and return the oldest recorded outcome
    ///
    /// Returns `true` if the branch was taken.
    pub fn pop(&mut self) -> Option<bool> {
        let cnt = self.cnt.checked_sub(1)?;
        let taken = self.bits & 1 == 0;
        self.bits >>= 1;
        self.cnt = cnt;
        Some(taken)
    }

    /// Number of outstanding branch outcomes
    pub fn cnt(&self) -> u8 {
        self.cnt
    }

    /// Whether the map has saturated at [`MAX_BRANCHES`][Self::MAX_BRANCHES]
    pub fn full(&self) -> bool {
        self.cnt == Self::MAX_BRANCHES
    }

    /// Raw bit pattern, one bit per recorded branch, oldest in the LSB
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Reset the accumulator to the empty state
    ///
    /// Matches the idempotence invariant required of a branch-map flush.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Payload-bit width of a branch map with `cnt` recorded branches on flush
///
/// Widths are quantized to `{1, 9, 17, 25, 31}` so that a partially filled map
/// still serializes to a predictable set of sizes; `cnt == 0` and `cnt == 31`
/// both use the full 31-bit width (an empty map is only ever flushed together
/// with other content, and a full map needs all 31 bits to be unambiguous).
pub fn branch_map_len(cnt: u8) -> u8 {
    match cnt {
        0 | 31 => 31,
        n if n <= 1 => 1,
        n if n <= 9 => 9,
        n if n <= 17 => 17,
        n if n <= 25 => 25,
        _ => 31,
    }
}
