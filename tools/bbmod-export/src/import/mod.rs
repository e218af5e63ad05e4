//! Scene import: source files to [`Scene`], then post-processing

mod gltf_scene;
pub mod postprocess;

pub use gltf_scene::{DEFAULT_MATERIAL_NAME, ROOT_NODE_NAME, assemble_faces, import_gltf, node_name};

use std::path::Path;

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::scene::Scene;

/// Extensions (lower case, without the dot) accepted as input.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["gltf", "glb"];

/// Whether `path` has an importable extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Import a scene without post-processing.
pub fn import_scene(path: &Path) -> Result<Scene> {
    if !is_supported(path) {
        return Err(ExportError::Import(format!(
            "{}: unsupported file type (expected .gltf or .glb)",
            path.display()
        )));
    }
    import_gltf(path)
}

/// Import a scene and run the post-processing steps enabled in `config`.
pub fn load_scene(path: &Path, config: &Config) -> Result<Scene> {
    let mut scene = import_scene(path)?;
    postprocess::apply(&mut scene, config);
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("model.glb")));
        assert!(is_supported(Path::new("dir/Model.GLTF")));
        assert!(!is_supported(Path::new("model.fbx")));
        assert!(!is_supported(Path::new("model")));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = import_scene(Path::new("model.obj"));
        assert!(matches!(result, Err(ExportError::Import(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_scene(&dir.path().join("missing.glb"));
        assert!(matches!(result, Err(ExportError::Import(_))));
    }
}
