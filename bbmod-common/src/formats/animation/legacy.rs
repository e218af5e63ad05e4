//! Legacy keyframe-track animations (decode only)
//!
//! # Layout
//! ```text
//! magic            "bbanim\0"
//! major            u8
//! duration         f64
//! tics_per_second  f64
//! model_node_count u32
//! track_count      u32
//! tracks           track_count × (index f32, key_count u32, keys)
//!   key            time f64, transform 8 × f32
//! ```

use std::io::Read;

use crate::error::{FormatError, Result};
use crate::formats::Version;
use crate::formats::binary::ReadBinaryExt;
use crate::math::DualQuat;

use super::{Animation, AnimationNode};

/// One stored key of a legacy track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuatKey {
    pub time: f64,
    pub transform: DualQuat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyTrack {
    pub index: u32,
    pub keys: Vec<DualQuatKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyAnimation {
    pub version: Version,
    pub duration: f64,
    pub tics_per_second: f64,
    pub model_node_count: u32,
    pub tracks: Vec<LegacyTrack>,
}

impl LegacyAnimation {
    pub(crate) fn read_after_magic<R: Read>(r: &mut R) -> Result<Self> {
        let version = Version::new(r.read_byte()?, 0);
        if !version.is_supported() {
            return Err(FormatError::VersionMismatch {
                major: version.major,
                minor: version.minor,
            });
        }

        let duration = r.read_f64_le()?;
        let tics_per_second = r.read_f64_le()?;
        let model_node_count = r.read_u32_le()?;
        let track_count = r.read_u32_le()?;

        let mut tracks = Vec::new();
        for _ in 0..track_count {
            let index = r.read_index("animation node")?;
            if index >= model_node_count {
                return Err(FormatError::IndexOutOfRange {
                    what: "animation node",
                    index,
                    count: model_node_count,
                });
            }
            let key_count = r.read_u32_le()?;
            let mut keys = Vec::new();
            for _ in 0..key_count {
                keys.push(DualQuatKey {
                    time: r.read_f64_le()?,
                    transform: r.read_dual_quat()?,
                });
            }
            tracks.push(LegacyTrack { index, keys });
        }

        Ok(Self {
            version,
            duration,
            tics_per_second,
            model_node_count,
            tracks,
        })
    }

    /// Reinterpret the tracks as one sample per key.
    pub fn into_animation(self, name: impl Into<String>) -> Animation {
        let duration = if self.duration.is_finite() && self.duration >= 1.0 {
            self.duration as u32
        } else {
            1
        };
        Animation {
            version: self.version,
            name: name.into(),
            duration,
            tics_per_second: self.tics_per_second,
            nodes: self
                .tracks
                .into_iter()
                .map(|track| AnimationNode {
                    index: track.index,
                    frames: track.keys.into_iter().map(|key| key.transform).collect(),
                })
                .collect(),
            model_node_count: self.model_node_count,
        }
    }
}
