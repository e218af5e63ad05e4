//! bbmod-export library
//!
//! Converts imported 3D scenes into BBMOD models and BBANIM animations.
//! The binary wraps [`convert_file`] and [`batch_convert`]; the individual
//! stages are public for tools that already hold a [`Scene`].

pub mod animation;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod mesh;
pub mod model;
pub mod scene;
pub mod skeleton;

pub use animation::{animation_file_name, bake_animation, sample_track};
pub use config::{Config, NormalGeneration};
pub use error::{ConversionStatus, ExportError, Result};
pub use export::{
    BatchReport, ConvertedAnimation, ConvertedScene, batch_convert, convert_file, convert_scene,
    default_output_path,
};
pub use import::{import_scene, load_scene};
pub use mesh::{build_mesh, mesh_vertex_format};
pub use model::build_model;
pub use scene::Scene;
pub use skeleton::{Skeleton, build_node_tree};
