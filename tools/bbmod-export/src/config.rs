//! Conversion settings (optionally loaded from a `.toml` file)
//!
//! Every build call takes a `&Config`; there is no global configuration.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Normal generation for meshes that have no normals of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NormalGeneration {
    /// Leave meshes without normals as they are.
    None,
    /// One face normal per triangle (vertices are unshared).
    Flat,
    /// Area-weighted average of adjacent face normals.
    #[default]
    Smooth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Convert from the right-handed source space to a left-handed one.
    pub left_handed: bool,
    pub invert_winding: bool,

    pub disable_normals: bool,
    pub disable_uv: bool,
    pub disable_uv2: bool,
    pub disable_vertex_colors: bool,
    pub disable_tangents: bool,
    pub disable_bones: bool,

    pub flip_uv_horizontally: bool,
    pub flip_uv_vertically: bool,
    pub flip_normals: bool,
    pub gen_normals: NormalGeneration,

    pub optimize_materials: bool,
    pub optimize_nodes: bool,
    pub optimize_meshes: bool,

    /// Bake node transforms into vertices and drop the hierarchy.
    pub pre_transform: bool,
    pub apply_scale: bool,
    pub scale_factor: f32,

    /// Animation frames per second.
    pub sampling_rate: f64,
    /// 0 = parent space, 1 = world space, 2 = world and bone space.
    pub animation_optimization: u8,
    /// Prefix animation file names with the model file name.
    pub prefix: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            left_handed: true,
            invert_winding: false,
            disable_normals: false,
            disable_uv: false,
            disable_uv2: true,
            disable_vertex_colors: true,
            disable_tangents: false,
            disable_bones: false,
            flip_uv_horizontally: false,
            flip_uv_vertically: true,
            flip_normals: false,
            gen_normals: NormalGeneration::Smooth,
            optimize_materials: true,
            optimize_nodes: true,
            optimize_meshes: true,
            pre_transform: false,
            apply_scale: false,
            scale_factor: 1.0,
            sampling_rate: 60.0,
            animation_optimization: 0,
            prefix: true,
        }
    }
}

impl Config {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config.normalized())
    }

    /// Settings with dependent options resolved and ranges clamped.
    pub fn normalized(mut self) -> Self {
        self.sampling_rate = if self.sampling_rate.is_finite() {
            self.sampling_rate.floor().max(1.0)
        } else {
            1.0
        };
        self.animation_optimization = self.animation_optimization.min(2);
        if self.disable_normals {
            self.disable_tangents = true;
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            self.scale_factor = 1.0;
        }
        self
    }
}
