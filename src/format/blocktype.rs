//! Vertex blocktype: which attribute streams a mesh part carries.
//!
//! Bit layout of the stored `u32`:
//!
//! | Bits  | Meaning                         |
//! |-------|---------------------------------|
//! | 0     | normals                         |
//! | 1     | tangents                        |
//! | 2-3   | UV channel count (0-3)          |
//! | 4-5   | colour channel count (0-3)      |
//! | 8-11  | weight slots (0, 1, 2, 4 or 8)  |
//!
//! Every other bit must be zero.

use std::fmt;

use crate::util::{Error, Result};

const NORMALS_BIT: u32 = 1 << 0;
const TANGENTS_BIT: u32 = 1 << 1;
const UV_SHIFT: u32 = 2;
const COLOR_SHIFT: u32 = 4;
const WEIGHT_SHIFT: u32 = 8;
const KNOWN_BITS: u32 = NORMALS_BIT | TANGENTS_BIT | (0x3 << UV_SHIFT) | (0x3 << COLOR_SHIFT) | (0xF << WEIGHT_SHIFT);

/// Maximum UV channels a vertex can carry.
pub const MAX_UV_CHANNELS: usize = 3;

/// Maximum colour channels a vertex can carry.
pub const MAX_COLOR_CHANNELS: usize = 3;

/// Weight slot capacities the format defines, ascending.
pub const WEIGHT_CAPACITIES: [u8; 5] = [0, 1, 2, 4, 8];

/// Largest weight slot capacity.
pub const MAX_WEIGHT_SLOTS: usize = 8;

/// Decoded blocktype.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Blocktype {
    pub normals: bool,
    pub tangents: bool,
    pub uv_channels: u8,
    pub color_channels: u8,
    pub weight_slots: u8,
}

impl Blocktype {
    /// Decode a stored blocktype, rejecting unknown bits and capacities.
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits & !KNOWN_BITS != 0 {
            return Err(Error::UnknownBlocktype(bits));
        }
        let weight_slots = ((bits >> WEIGHT_SHIFT) & 0xF) as u8;
        if !WEIGHT_CAPACITIES.contains(&weight_slots) {
            return Err(Error::UnknownBlocktype(bits));
        }
        Ok(Self {
            normals: bits & NORMALS_BIT != 0,
            tangents: bits & TANGENTS_BIT != 0,
            uv_channels: ((bits >> UV_SHIFT) & 0x3) as u8,
            color_channels: ((bits >> COLOR_SHIFT) & 0x3) as u8,
            weight_slots,
        })
    }

    /// Encode to the stored representation.
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.normals {
            bits |= NORMALS_BIT;
        }
        if self.tangents {
            bits |= TANGENTS_BIT;
        }
        bits |= (self.uv_channels as u32 & 0x3) << UV_SHIFT;
        bits |= (self.color_channels as u32 & 0x3) << COLOR_SHIFT;
        bits |= (self.weight_slots as u32 & 0xF) << WEIGHT_SHIFT;
        bits
    }

    /// Check the fields are within what the bit layout can express.
    pub fn is_representable(&self) -> bool {
        self.uv_channels as usize <= MAX_UV_CHANNELS
            && self.color_channels as usize <= MAX_COLOR_CHANNELS
            && WEIGHT_CAPACITIES.contains(&self.weight_slots)
    }

    /// Smallest capacity that holds `slots` weights, if any.
    pub fn capacity_for(slots: usize) -> Option<u8> {
        WEIGHT_CAPACITIES.iter().copied().find(|&c| c as usize >= slots)
    }

    /// Bytes used by the weight stream, padded to 4.
    #[inline]
    pub fn weight_stream_size(&self) -> usize {
        (self.weight_slots as usize * 3).div_ceil(4) * 4
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> usize {
        let normals = if self.normals { 4 } else { 0 };
        let tangents = if self.tangents { 4 } else { 0 };
        12 + normals
            + tangents
            + 4 * self.uv_channels as usize
            + 4 * self.color_channels as usize
            + self.weight_stream_size()
    }

    #[inline]
    pub fn is_skinned(&self) -> bool {
        self.weight_slots > 0
    }
}

impl fmt::Display for Blocktype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08x} (normals: {}, tangents: {}, uv: {}, colour: {}, weights: {})",
            self.bits(),
            self.normals,
            self.tangents,
            self.uv_channels,
            self.color_channels,
            self.weight_slots
        )
    }
}
