// SPDX-License-Identifier: Apache-2.0
//! Runtime configuration

#[cfg(feature = "serde")]
mod serde_utils;

use crate::types::Width;

/// Runtime codec configuration
///
/// All options are runtime switches with no hidden defaults; see
/// [`Config::default`] for the values implied by the current protocol
/// profile.
///
/// # Serde
///
/// If the `serde` feature is enabled, this type supports (de)serialization.
/// The `bool` flags are (de)serialized to/from the numerical values `0` and
/// `1`, to be in line with the C reference implementation's configuration
/// struct.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Address width; `Rv64` selects 64-bit addresses
    pub width: Width,
    /// Always emit absolute addresses; disables `BRANCH_DIFF`
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub full_address: bool,
    /// Quantize address compression to byte boundaries (PULP `sext`)
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub use_pulp_sext: bool,
    /// Treat `ret`/`c.ret` as predictable via the return-address stack
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub implicit_ret: bool,
    /// Emit an extra `SYNC/START` after an `EXCEPTION` to bridge the
    /// vector-table jump
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub pulp_vector_table_packet: bool,
    /// Drop sign-extendable high bits from the full branch-map encoding
    ///
    /// Reserved: the packet layer currently always serializes the full
    /// branch map at [`branch_map_len`][crate::types::branch::branch_map_len]
    /// width; a `true` value has no observable effect yet.
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub compress_full_branch_map: bool,
    /// Force a resync packet at least every `N` instructions
    ///
    /// Reserved: resync packets are not currently implemented; a non-`None`
    /// value has no observable effect yet.
    pub resync_max: Option<core::num::NonZeroU32>,
}

impl Default for Config {
    fn default() -> Self {
        CONFIG
    }
}

/// Default [`Config`]
///
/// Matches the protocol profile used throughout the testable scenarios this
/// crate implements: 32-bit addresses, differential addressing enabled, no
/// implicit returns, no PULP quantization.
pub const CONFIG: Config = Config {
    width: Width::Rv32,
    full_address: false,
    use_pulp_sext: false,
    implicit_ret: false,
    pulp_vector_table_packet: false,
    compress_full_branch_map: false,
    resync_max: None,
};

impl Config {
    /// Address width in bits (32 or 64)
    pub const fn address_bits(&self) -> u8 {
        self.width.bits()
    }
}
