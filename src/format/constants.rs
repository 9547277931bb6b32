//! MOD3 format constants.

/// Magic bytes at the start of a MOD3 file.
pub const MOD3_MAGIC: &[u8; 4] = b"MOD\0";

/// Format version written by this codec and accepted by the decoder.
pub const MOD3_VERSION: u16 = 237;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 0xA0;

/// Offset of the first region offset (bone offset) in the header.
pub const REGION_OFFSETS_POS: u64 = 0x20;

/// Number of u64 region offsets stored in the header.
pub const REGION_OFFSET_COUNT: usize = 7;

/// Region starts are padded to this alignment.
pub const REGION_ALIGNMENT: u64 = 16;

/// Size of one bone record.
pub const BONE_RECORD_SIZE: usize = 24;

/// Size of one 4x4 f32 matrix.
pub const MATRIX_SIZE: usize = 64;

/// Size of the function-id to bone-index remap table.
pub const REMAP_TABLE_SIZE: usize = 512;

/// Size of one group record.
pub const GROUP_RECORD_SIZE: usize = 48;

/// Width of one NUL-padded material name.
pub const MATERIAL_NAME_SIZE: usize = 128;

/// Size of one mesh-part record.
pub const MESH_RECORD_SIZE: usize = 48;

/// Size of one bounding-box record.
pub const BOUNDING_BOX_RECORD_SIZE: usize = 64;

/// Parent byte of a root bone.
pub const NO_PARENT: u8 = 0xFF;

/// Pair byte of a bone without a symmetric counterpart.
pub const NO_PAIR: u8 = 0xFF;

/// Remap table entry for an unused function id.
pub const UNUSED_REMAP: u8 = 0xFF;

/// Bone field of a bounding box not bound to any bone.
pub const NO_BONE: u32 = u32::MAX;

/// Bone indices are stored in one byte and 0xFF marks "none".
pub const MAX_BONES: usize = 255;

/// Indices are u16 and relative to the part's first vertex.
pub const MAX_PART_VERTICES: usize = u16::MAX as usize;

/// LOD value of the highest-detail level.
pub const HIGHEST_LOD: u32 = 0;

/// Round `pos` up to the next multiple of `alignment`.
#[inline]
pub const fn align_up(pos: u64, alignment: u64) -> u64 {
    pos.div_ceil(alignment) * alignment
}
