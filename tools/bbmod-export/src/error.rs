//! Conversion errors and the status codes reported to callers

use std::fmt;

use bbmod_common::FormatError;
use thiserror::Error;

/// Fatal conversion errors.
///
/// Each of these means the output would be wrong or incomplete, so the file
/// being converted is abandoned and nothing is written for it.
#[derive(Error, Debug)]
pub enum ExportError {
    /// A face does not have the corner count of the mesh's primitive type.
    #[error("mesh \"{mesh}\" has a face with {corners} corners, but only {expected}-corner faces are supported")]
    UnsupportedFace {
        mesh: String,
        corners: usize,
        expected: usize,
    },

    /// An animation channel targets a node that is not in the model.
    #[error("animation \"{animation}\" targets node \"{node}\" which does not exist in the model")]
    UnknownAnimationNode { animation: String, node: String },

    /// A mesh references a bone that was not collected into the skeleton.
    #[error("mesh \"{mesh}\" references unknown bone \"{bone}\"")]
    UnknownBone { mesh: String, bone: String },

    /// A bone has no node with its name, so its index would be unused.
    #[error("bone \"{bone}\" has no node in the scene hierarchy")]
    BoneWithoutNode { bone: String },

    /// More than one node is named after the same bone.
    #[error("bone \"{bone}\" is claimed by more than one node")]
    DuplicateBoneNode { bone: String },

    /// A face references a vertex the mesh does not have.
    #[error("mesh \"{mesh}\" references vertex {vertex}, but it only has {count}")]
    VertexOutOfRange {
        mesh: String,
        vertex: u32,
        count: usize,
    },

    /// The scene has no meshes and no nodes to convert.
    #[error("scene contains nothing to convert")]
    EmptyScene,

    /// The source file could not be imported.
    #[error("import failed: {0}")]
    Import(String),

    /// Encoding the converted data failed.
    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Outcome of converting one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ConversionStatus {
    Success = 0,
    /// The input could not be opened or imported.
    LoadFailed = 1,
    /// The scene could not be turned into a model or animation.
    ConversionFailed = 2,
    /// An output file could not be written.
    SaveFailed = 3,
}

impl ConversionStatus {
    pub fn is_success(self) -> bool {
        self == ConversionStatus::Success
    }

    /// Numeric code, also used as the process exit code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConversionStatus::Success => "success",
            ConversionStatus::LoadFailed => "load failed",
            ConversionStatus::ConversionFailed => "conversion failed",
            ConversionStatus::SaveFailed => "save failed",
        };
        f.write_str(text)
    }
}
