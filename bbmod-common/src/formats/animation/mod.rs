//! BBANIM animation file (.bbanim)
//!
//! A baked animation stores, for each frame, the transforms of every node of
//! the model it was baked against in one or more [`BoneSpaces`].
//!
//! # Layout (current revision)
//! ```text
//! header       AnimationHeader (34 bytes)
//! frames       duration × frame
//!   parent     node_count × 8 f32   - if spaces & PARENT
//!   world      node_count × 8 f32   - if spaces & WORLD
//!   bone       bone_count × 8 f32   - if spaces & BONE
//! event_count  u32 (always 0)
//! ```
//!
//! Files starting with the legacy magic `"bbanim\0"` hold raw keyframe
//! tracks instead and are decoded by [`legacy`].

mod compose;
mod header;
pub mod legacy;


pub use compose::*;
pub use header::*;
pub use legacy::LegacyAnimation;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{FormatError, Result};
use crate::formats::binary::{ReadBinaryExt, WriteBinaryExt};
use crate::formats::{BBANIM_LEGACY_MAGIC, BBANIM_MAGIC, BinarySerializable, Model, Version, read_magic};
use crate::math::DualQuat;

/// Resampled transforms of one animated node.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationNode {
    /// Node index in the model.
    pub index: u32,
    /// Parent-space transform per frame, `duration + 1` entries.
    pub frames: Vec<DualQuat>,
}

/// An animation clip resampled onto a fixed frame grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub version: Version,
    pub name: String,
    /// Length in whole frames.
    pub duration: u32,
    /// Frames per second of the grid.
    pub tics_per_second: f64,
    pub nodes: Vec<AnimationNode>,
    /// Node count of the model at bake time.
    pub model_node_count: u32,
}

impl Animation {
    /// Number of samples per track (both ends of the clip included).
    pub fn sample_count(&self) -> usize {
        self.duration as usize + 1
    }

    pub fn find_node(&self, index: u32) -> Option<&AnimationNode> {
        self.nodes.iter().find(|node| node.index == index)
    }

    pub fn header(&self, model: &Model, spaces: BoneSpaces) -> AnimationHeader {
        AnimationHeader {
            version: Version::CURRENT,
            spaces,
            duration: f64::from(self.duration),
            tics_per_second: self.tics_per_second,
            node_count: model.node_count(),
            bone_count: model.bone_count(),
        }
    }

    /// Compose every frame against `model` and encode the enabled spaces.
    pub fn write<W: Write>(&self, w: &mut W, model: &Model, spaces: BoneSpaces) -> Result<()> {
        if self.model_node_count != model.node_count() {
            return Err(FormatError::CountMismatch {
                what: "model node",
                stored: self.model_node_count,
                actual: model.nodes.len(),
            });
        }

        let header = self.header(model, spaces);
        header.write_to(w)?;

        let mut composer = PoseComposer::new(model, &self.nodes)?;
        let mut pose = Pose::new(model.nodes.len(), model.skeleton.len());

        for frame in 0..self.duration as usize {
            composer.compose(frame, &mut pose)?;
            if spaces.contains(BoneSpaces::PARENT) {
                write_transforms(w, &pose.parent)?;
            }
            if spaces.contains(BoneSpaces::WORLD) {
                write_transforms(w, &pose.world)?;
            }
            if spaces.contains(BoneSpaces::BONE) {
                write_transforms(w, &pose.bone)?;
            }
        }

        // Event count
        w.write_u32_le(0)
    }

    pub fn save(&self, path: impl AsRef<Path>, model: &Model, spaces: BoneSpaces) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer, model, spaces)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self, model: &Model, spaces: BoneSpaces) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes, model, spaces)?;
        Ok(bytes)
    }
}

fn write_transforms<W: Write>(w: &mut W, transforms: &[DualQuat]) -> Result<()> {
    for transform in transforms {
        w.write_dual_quat(transform)?;
    }
    Ok(())
}

fn read_transforms<R: Read>(r: &mut R, count: u32) -> Result<Vec<DualQuat>> {
    let mut transforms = Vec::new();
    for _ in 0..count {
        transforms.push(r.read_dual_quat()?);
    }
    Ok(transforms)
}

/// A decoded baked animation file.
///
/// Each frame is a [`Pose`] whose vectors are empty for spaces the file does
/// not store.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedAnimation {
    pub header: AnimationHeader,
    pub frames: Vec<Pose>,
    pub event_count: u32,
}

impl BakedAnimation {
    fn read_body<R: Read>(r: &mut R, header: AnimationHeader) -> Result<Self> {
        let mut frames = Vec::new();
        // A file without any stored transforms has no frame data at all
        if header.floats_per_frame() > 0 {
            for _ in 0..header.frame_count() {
                let mut pose = Pose::new(0, 0);
                if header.spaces.contains(BoneSpaces::PARENT) {
                    pose.parent = read_transforms(r, header.node_count)?;
                }
                if header.spaces.contains(BoneSpaces::WORLD) {
                    pose.world = read_transforms(r, header.node_count)?;
                }
                if header.spaces.contains(BoneSpaces::BONE) {
                    pose.bone = read_transforms(r, header.bone_count)?;
                }
                frames.push(pose);
            }
        }
        let event_count = r.read_u32_le()?;
        Ok(Self {
            header,
            frames,
            event_count,
        })
    }
}

/// Any animation file this crate can decode.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationFile {
    Baked(BakedAnimation),
    Legacy(LegacyAnimation),
}

impl AnimationFile {
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let magic = read_magic(r, BBANIM_MAGIC.len())?;
        if magic == BBANIM_MAGIC {
            let header = AnimationHeader::read_after_magic(r)?;
            Ok(AnimationFile::Baked(BakedAnimation::read_body(r, header)?))
        } else if magic == BBANIM_LEGACY_MAGIC {
            Ok(AnimationFile::Legacy(LegacyAnimation::read_after_magic(r)?))
        } else {
            Err(FormatError::InvalidMagic(magic))
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        Self::read(&mut bytes)
    }

    pub fn version(&self) -> Version {
        match self {
            AnimationFile::Baked(baked) => baked.header.version,
            AnimationFile::Legacy(legacy) => legacy.version,
        }
    }
}
