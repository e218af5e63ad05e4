//! Vertex format descriptor
//!
//! One flag per vertex attribute. The flags decide which fields of
//! [`Vertex`](super::Vertex) are physically present in the vertex stream.
//!
//! # Layout
//! ```text
//! position u8 (bool)
//! normal   u8 (bool)
//! uv0      u8 (bool)
//! uv1      u8 (bool)   - only present since minor version 3
//! color    u8 (bool)
//! tangent  u8 (bool)   - tangent + bitangent sign
//! bones    u8 (bool)   - 4 bone indices + 4 weights
//! ids      u8 (bool)
//! ```

use std::fmt;
use std::io::{Read, Write};

use super::Version;
use super::binary::{ReadBinaryExt, WriteBinaryExt};
use crate::error::Result;

/// Minor version that introduced the second UV channel flag.
pub const MINOR_VERSION_UV1: u8 = 3;

/// Which vertex attributes are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    /// Always true for formats produced by the exporter.
    pub position: bool,
    pub normal: bool,
    pub uv0: bool,
    pub uv1: bool,
    pub color: bool,
    /// Tangent vector and bitangent sign.
    pub tangent: bool,
    /// Four bone indices and four weights.
    pub bones: bool,
    pub ids: bool,
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self::POSITION_ONLY
    }
}

impl VertexFormat {
    pub const POSITION_ONLY: Self = Self {
        position: true,
        normal: false,
        uv0: false,
        uv1: false,
        color: false,
        tangent: false,
        bones: false,
        ids: false,
    };

    /// Serialized size in bytes for the current revision.
    pub const SIZE: usize = 8;

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> usize {
        let mut stride = 0;
        if self.position {
            stride += 12;
        }
        if self.normal {
            stride += 12;
        }
        if self.uv0 {
            stride += 8;
        }
        if self.uv1 {
            stride += 8;
        }
        if self.color {
            stride += 4;
        }
        if self.tangent {
            stride += 16;
        }
        if self.bones {
            stride += 32;
        }
        if self.ids {
            stride += 4;
        }
        stride
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_bool(self.position)?;
        w.write_bool(self.normal)?;
        w.write_bool(self.uv0)?;
        w.write_bool(self.uv1)?;
        w.write_bool(self.color)?;
        w.write_bool(self.tangent)?;
        w.write_bool(self.bones)?;
        w.write_bool(self.ids)
    }

    /// Read a vertex format written by `version`.
    ///
    /// Files older than [`MINOR_VERSION_UV1`] do not store the `uv1` flag.
    pub fn read<R: Read>(r: &mut R, version: Version) -> Result<Self> {
        let position = r.read_bool()?;
        let normal = r.read_bool()?;
        let uv0 = r.read_bool()?;
        let uv1 = if version.minor >= MINOR_VERSION_UV1 {
            r.read_bool()?
        } else {
            false
        };
        Ok(Self {
            position,
            normal,
            uv0,
            uv1,
            color: r.read_bool()?,
            tangent: r.read_bool()?,
            bones: r.read_bool()?,
            ids: r.read_bool()?,
        })
    }
}

/// Short attribute list, e.g. `V,N,UV,B`.
impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.position, "V"),
            (self.normal, "N"),
            (self.uv0, "UV"),
            (self.uv1, "UV2"),
            (self.color, "C"),
            (self.tangent, "T"),
            (self.bones, "B"),
            (self.ids, "I"),
        ];
        let names: Vec<&str> = flags
            .iter()
            .filter(|(present, _)| *present)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(","))
    }
}
