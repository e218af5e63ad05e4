//! Baked animation header and bone space flags

use std::io::{Read, Write};

use bitflags::bitflags;

use crate::error::{FormatError, Result};
use crate::formats::binary::{ReadBinaryExt, WriteBinaryExt};
use crate::formats::{BBANIM_MAGIC, BinarySerializable, Version, read_magic};

bitflags! {
    /// Reference spaces stored for every frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BoneSpaces: u8 {
        /// Node transform relative to its parent.
        const PARENT = 1;
        /// Node transform relative to the model root.
        const WORLD = 2;
        /// World transform combined with the bone offset.
        const BONE = 4;
    }
}

impl BoneSpaces {
    /// Spaces emitted for an optimization level.
    ///
    /// 0 stores parent space only, 1 stores world space, 2 stores world and
    /// bone space. Levels above 2 are treated as 2.
    pub fn from_optimization_level(level: u8) -> Self {
        match level {
            0 => BoneSpaces::PARENT,
            1 => BoneSpaces::WORLD,
            _ => BoneSpaces::WORLD | BoneSpaces::BONE,
        }
    }
}

/// Header of a baked `.bbanim` file.
///
/// # Layout
/// ```text
/// 0x00: magic "BBANIM\0"
/// 0x07: major u8
/// 0x08: minor u8
/// 0x09: spaces u8 (BoneSpaces bits)
/// 0x0A: duration f64 (frames)
/// 0x12: tics_per_second f64
/// 0x1A: node_count u32
/// 0x1E: bone_count u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationHeader {
    pub version: Version,
    pub spaces: BoneSpaces,
    /// Number of stored frames.
    pub duration: f64,
    pub tics_per_second: f64,
    /// Node count of the model the animation was baked against.
    pub node_count: u32,
    /// Bone count of the model the animation was baked against.
    pub bone_count: u32,
}

impl AnimationHeader {
    /// Number of frames in the body.
    pub fn frame_count(&self) -> usize {
        if self.duration.is_finite() && self.duration > 0.0 {
            self.duration as usize
        } else {
            0
        }
    }

    /// Floats stored per frame for the enabled spaces.
    pub fn floats_per_frame(&self) -> usize {
        let nodes = self.node_count as usize * 8;
        let bones = self.bone_count as usize * 8;
        let mut floats = 0;
        if self.spaces.contains(BoneSpaces::PARENT) {
            floats += nodes;
        }
        if self.spaces.contains(BoneSpaces::WORLD) {
            floats += nodes;
        }
        if self.spaces.contains(BoneSpaces::BONE) {
            floats += bones;
        }
        floats
    }

    /// Read everything after the magic.
    pub(crate) fn read_after_magic<R: Read>(r: &mut R) -> Result<Self> {
        let major = r.read_byte()?;
        let version = Version::new(major, r.read_byte()?);
        if !version.is_supported() {
            return Err(FormatError::VersionMismatch {
                major: version.major,
                minor: version.minor,
            });
        }
        Ok(Self {
            version,
            spaces: BoneSpaces::from_bits_truncate(r.read_byte()?),
            duration: r.read_f64_le()?,
            tics_per_second: r.read_f64_le()?,
            node_count: r.read_u32_le()?,
            bone_count: r.read_u32_le()?,
        })
    }
}

impl BinarySerializable for AnimationHeader {
    const SIZE: usize = 34;

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BBANIM_MAGIC)?;
        w.write_byte(self.version.major)?;
        w.write_byte(self.version.minor)?;
        w.write_byte(self.spaces.bits())?;
        w.write_f64_le(self.duration)?;
        w.write_f64_le(self.tics_per_second)?;
        w.write_u32_le(self.node_count)?;
        w.write_u32_le(self.bone_count)
    }

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let magic = read_magic(r, BBANIM_MAGIC.len())?;
        if magic != BBANIM_MAGIC {
            return Err(FormatError::InvalidMagic(magic));
        }
        Self::read_after_magic(r)
    }
}
