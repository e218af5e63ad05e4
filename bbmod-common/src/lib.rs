//! BBMOD model and BBANIM animation formats
//!
//! This crate provides the on-disk formats shared between:
//! - `bbmod-export` (asset pipeline)
//! - tools that inspect or repack converted assets
//!
//! # Modules
//!
//! - [`math`] - Dual quaternions and interpolation helpers
//! - [`formats`] - Model, mesh, vertex format and animation codecs
//! - [`error`] - Decode/encode error taxonomy

pub mod error;
pub mod formats;
pub mod math;

pub use error::{FormatError, Result};

// Re-export commonly used format items
pub use formats::{
    // Constants
    BBANIM_EXT,
    BBANIM_LEGACY_MAGIC,
    BBANIM_MAGIC,
    BBMOD_EXT,
    BBMOD_LEGACY_MAGIC,
    BBMOD_MAGIC,
    // Animation types
    Animation,
    AnimationFile,
    AnimationHeader,
    AnimationNode,
    BakedAnimation,
    BinarySerializable,
    // Model types
    Bone,
    BoneSpaces,
    BoundingBox,
    LegacyAnimation,
    MAX_BONE_INFLUENCES,
    Mesh,
    Model,
    Node,
    NodeId,
    NodeTree,
    Pose,
    PoseComposer,
    PrimitiveType,
    Version,
    Vertex,
    VertexFormat,
    pack_color,
    unpack_color,
};
pub use math::DualQuat;
