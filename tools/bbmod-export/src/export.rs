//! Conversion pipeline: scene in, `.bbmod` and `.bbanim` files out
//!
//! Everything is built in memory first; files are only written once the
//! model and every animation converted successfully. Each file goes to a
//! temporary file in the destination directory and is renamed into place.

use std::io::Write;
use std::path::{Path, PathBuf};

use bbmod_common::{Animation, BBANIM_EXT, BBMOD_EXT, BoneSpaces, FormatError, Model};
use hashbrown::HashSet;
use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::animation::{animation_file_name, bake_animation};
use crate::config::Config;
use crate::error::{ConversionStatus, Result};
use crate::import::{is_supported, load_scene};
use crate::model::build_model;
use crate::scene::Scene;

/// A baked clip and the file name it will be saved under.
#[derive(Debug, Clone)]
pub struct ConvertedAnimation {
    pub file_name: String,
    pub animation: Animation,
}

/// Model and animations built from one scene.
#[derive(Debug, Clone)]
pub struct ConvertedScene {
    pub model: Model,
    pub animations: Vec<ConvertedAnimation>,
    /// Spaces stored in every animation file.
    pub spaces: BoneSpaces,
}

/// Build the model, then bake every clip against it.
///
/// `model_stem` prefixes animation file names when `config.prefix` is set.
pub fn convert_scene(scene: &Scene, config: &Config, model_stem: &str) -> Result<ConvertedScene> {
    let model = build_model(scene, config)?;

    let mut animations = Vec::with_capacity(scene.animations.len());
    let mut taken: HashSet<String> = HashSet::new();
    for (index, clip) in scene.animations.iter().enumerate() {
        let animation = bake_animation(clip, &model, config)?;
        let mut file_name = animation_file_name(model_stem, &clip.name, index, config.prefix);
        if taken.contains(&file_name) {
            let stem = file_name.trim_end_matches(&format!(".{BBANIM_EXT}")).to_string();
            let mut suffix = index;
            while taken.contains(&file_name) {
                file_name = format!("{stem}_{suffix}.{BBANIM_EXT}");
                suffix += 1;
            }
            warn!(
                "Clip \"{}\" shares its file name with an earlier clip, saving as {}",
                clip.name, file_name
            );
        }
        taken.insert(file_name.clone());
        animations.push(ConvertedAnimation {
            file_name,
            animation,
        });
    }

    Ok(ConvertedScene {
        model,
        animations,
        spaces: BoneSpaces::from_optimization_level(config.animation_optimization),
    })
}

/// Write `bytes` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

impl ConvertedScene {
    /// Encode every file before writing any of them.
    ///
    /// Returns the written paths, model first.
    pub fn save(&self, model_path: &Path) -> Result<Vec<PathBuf>> {
        let dir = model_path.parent().unwrap_or(Path::new(""));
        let mut files = vec![(model_path.to_path_buf(), self.model.to_bytes()?)];
        for converted in &self.animations {
            let bytes = converted
                .animation
                .to_bytes(&self.model, self.spaces)?;
            files.push((dir.join(&converted.file_name), bytes));
        }

        let mut written = Vec::with_capacity(files.len());
        for (path, bytes) in files {
            write_atomic(&path, &bytes).map_err(FormatError::from)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// `<input stem>.bbmod` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(BBMOD_EXT)
}

/// Convert one source file.
///
/// Failures are logged and reported through the returned status; nothing
/// is written unless the whole conversion succeeded.
pub fn convert_file(input: &Path, output: &Path, config: &Config) -> ConversionStatus {
    let scene = match load_scene(input, config) {
        Ok(scene) => scene,
        Err(err) => {
            error!("Failed to load {:?}: {}", input, err);
            return ConversionStatus::LoadFailed;
        }
    };

    let stem = output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("model");
    let converted = match convert_scene(&scene, config, stem) {
        Ok(converted) => converted,
        Err(err) => {
            error!("Failed to convert {:?}: {}", input, err);
            return ConversionStatus::ConversionFailed;
        }
    };

    match converted.save(output) {
        Ok(written) => {
            info!(
                "Converted {:?} -> {:?} ({} meshes, {} nodes, {} bones, {} animations)",
                input,
                output,
                converted.model.meshes.len(),
                converted.model.node_count(),
                converted.model.bone_count(),
                written.len() - 1
            );
            ConversionStatus::Success
        }
        Err(err) => {
            error!("Failed to save {:?}: {}", output, err);
            ConversionStatus::SaveFailed
        }
    }
}

/// Importable files under `dir`, sorted by path.
pub fn find_sources(dir: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    sources.sort();
    sources
}

/// Per-file outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<(PathBuf, ConversionStatus)>,
}

impl BatchReport {
    pub fn failed(&self) -> impl Iterator<Item = &(PathBuf, ConversionStatus)> {
        self.results.iter().filter(|(_, status)| !status.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Convert every importable file under `dir` in parallel, each to a
/// `.bbmod` next to its source.
pub fn batch_convert(dir: &Path, config: &Config) -> BatchReport {
    let sources = find_sources(dir);
    info!("Converting {} file(s) under {:?}", sources.len(), dir);

    let results = sources
        .par_iter()
        .map(|input| {
            let status = convert_file(input, &default_output_path(input), config);
            (input.clone(), status)
        })
        .collect();

    BatchReport { results }
}
