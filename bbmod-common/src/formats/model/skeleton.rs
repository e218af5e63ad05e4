//! Skeleton (bone offset table)
//!
//! # Layout (per bone)
//! ```text
//! index   f32
//! offset  8 × f32 dual quaternion (inverse bind pose)
//! ```
//!
//! Bone names are not stored. They are recovered from the bone-flagged node
//! with the same index when a model is loaded.

use std::io::{Read, Write};

use crate::error::Result;
use crate::formats::binary::{ReadBinaryExt, WriteBinaryExt};
use crate::math::DualQuat;

/// One skinning bone.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Dense index, shared with the node of the same name.
    pub index: u32,
    /// Inverse bind pose: model space to bone space.
    pub offset: DualQuat,
}

impl Bone {
    pub fn new(name: impl Into<String>, index: u32, offset: DualQuat) -> Self {
        Self {
            name: name.into(),
            index,
            offset,
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_f32_le(self.index as f32)?;
        w.write_dual_quat(&self.offset)
    }

    /// Read a bone; the name is left empty.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            name: String::new(),
            index: r.read_index("bone")?,
            offset: r.read_dual_quat()?,
        })
    }
}
