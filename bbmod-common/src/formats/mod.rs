//! BBMOD model and BBANIM animation binary formats
//!
//! All values are little-endian with no padding. Strings are NUL-terminated
//! UTF-8. Rigid transforms are dual quaternions (8 × f32).
//!
//! Writers always emit [`Version::CURRENT`]. Readers also accept older
//! revisions of the same major version and the legacy lower-case magics,
//! upgrading them to the in-memory representation on load.

pub mod animation;
pub mod binary;
pub mod mesh;
pub mod model;
mod serialization;
pub mod vertex_format;

pub use animation::*;
pub use mesh::*;
pub use model::*;
pub use serialization::BinarySerializable;
pub use vertex_format::*;

use std::fmt;

/// Model file extension (without the dot).
pub const BBMOD_EXT: &str = "bbmod";
/// Animation file extension (without the dot).
pub const BBANIM_EXT: &str = "bbanim";

/// Current model magic, followed by major and minor version bytes.
pub const BBMOD_MAGIC: &[u8] = b"BBMOD\0";
/// Legacy model magic, followed by a major version byte only.
pub const BBMOD_LEGACY_MAGIC: &[u8] = b"bbmod\0";
/// Current animation magic, followed by major and minor version bytes.
pub const BBANIM_MAGIC: &[u8] = b"BBANIM\0";
/// Legacy keyframe-track animation magic (decode only).
pub const BBANIM_LEGACY_MAGIC: &[u8] = b"bbanim\0";

/// Format revision stored after the magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    /// Revision emitted by every writer in this crate.
    pub const CURRENT: Self = Self { major: 3, minor: 3 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Whether files of this revision can be decoded.
    pub fn is_supported(&self) -> bool {
        self.major == Self::CURRENT.major && self.minor <= Self::CURRENT.minor
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Read `len` raw magic bytes for the caller to match.
pub(crate) fn read_magic<R: std::io::Read>(
    r: &mut R,
    len: usize,
) -> crate::error::Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    Ok(bytes)
}
