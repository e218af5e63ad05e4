//! bbmod-export - converts glTF scenes to BBMOD models and BBANIM animations

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bbmod_common::{AnimationFile, BBANIM_EXT, BBMOD_EXT, Model};
use clap::{Args, Parser, Subcommand};

use bbmod_export::{
    Config, ConversionStatus, NormalGeneration, batch_convert, convert_file, default_output_path,
};

#[derive(Parser)]
#[command(name = "bbmod-export")]
#[command(about = "Converts glTF scenes to BBMOD models and BBANIM animations")]
#[command(version)]
struct Cli {
    /// Log debug output (node trees, generated attributes)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single file
    Convert {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .bbmod file (animations are written next to it)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ConfigArgs,
    },

    /// Convert every glTF/GLB file under a directory
    Batch {
        /// Directory to search recursively
        dir: PathBuf,

        #[command(flatten)]
        options: ConfigArgs,
    },

    /// Print a summary of a .bbmod or .bbanim file
    Info {
        /// File to inspect
        file: PathBuf,
    },
}

/// Settings file plus per-option overrides.
#[derive(Args)]
struct ConfigArgs {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the source's right-handed coordinates
    #[arg(long)]
    right_handed: bool,

    /// Reverse the corner order of every face
    #[arg(long)]
    invert_winding: bool,

    /// Normal generation for meshes without normals
    #[arg(long, value_enum)]
    gen_normals: Option<NormalGeneration>,

    /// Do not export bones
    #[arg(long)]
    disable_bones: bool,

    /// Bake node transforms into vertices
    #[arg(long)]
    pre_transform: bool,

    /// Scale the whole scene
    #[arg(long)]
    scale: Option<f32>,

    /// Animation frames per second
    #[arg(long)]
    sampling_rate: Option<f64>,

    /// 0 = parent space, 1 = world space, 2 = world and bone space
    #[arg(long)]
    optimize_animations: Option<u8>,

    /// Do not prefix animation files with the model name
    #[arg(long)]
    no_prefix: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if self.right_handed {
            config.left_handed = false;
        }
        if self.invert_winding {
            config.invert_winding = true;
        }
        if let Some(mode) = self.gen_normals {
            config.gen_normals = mode;
        }
        if self.disable_bones {
            config.disable_bones = true;
        }
        if self.pre_transform {
            config.pre_transform = true;
        }
        if let Some(scale) = self.scale {
            config.apply_scale = true;
            config.scale_factor = scale;
        }
        if let Some(rate) = self.sampling_rate {
            config.sampling_rate = rate;
        }
        if let Some(level) = self.optimize_animations {
            config.animation_optimization = level;
        }
        if self.no_prefix {
            config.prefix = false;
        }
        Ok(config.normalized())
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            options,
        } => {
            let config = options.resolve()?;
            let output = output.unwrap_or_else(|| default_output_path(&input));
            let status = convert_file(&input, &output, &config);
            if !status.is_success() {
                tracing::error!("{:?}: {}", input, status);
            }
            Ok(exit_code(status))
        }

        Commands::Batch { dir, options } => {
            let config = options.resolve()?;
            let report = batch_convert(&dir, &config);
            for (path, status) in report.failed() {
                tracing::error!("{:?}: {}", path, status);
            }
            tracing::info!(
                "{} of {} file(s) converted",
                report.results.len() - report.failed().count(),
                report.results.len()
            );
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Info { file } => {
            print_info(&file)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(status: ConversionStatus) -> ExitCode {
    ExitCode::from(status.code() as u8)
}

fn print_info(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if ext == BBMOD_EXT {
        let model = Model::load(path).with_context(|| format!("Failed to load {:?}", path))?;
        tracing::info!("{:?}: model version {}", path, model.version);
        for (i, mesh) in model.meshes.iter().enumerate() {
            tracing::info!(
                "  mesh {}: {} vertices, format {}, material {}",
                i,
                mesh.vertices.len(),
                mesh.vertex_format,
                mesh.material_index
            );
        }
        tracing::info!("  nodes: {}", model.node_count());
        for (_, node, depth) in model.nodes.preorder().with_depth() {
            let marker = if node.is_bone { " [bone]" } else { "" };
            tracing::info!(
                "    {:indent$}{} {}{}",
                "",
                node.index,
                node.name,
                marker,
                indent = depth * 2
            );
        }
        tracing::info!("  bones: {}", model.bone_count());
        tracing::info!("  materials: {}", model.material_names.join(", "));
    } else if ext == BBANIM_EXT {
        let animation =
            AnimationFile::load(path).with_context(|| format!("Failed to load {:?}", path))?;
        match animation {
            AnimationFile::Baked(baked) => {
                let header = baked.header;
                tracing::info!("{:?}: animation version {}", path, header.version);
                tracing::info!(
                    "  {} frames at {} fps, spaces {:?}",
                    header.duration,
                    header.tics_per_second,
                    header.spaces
                );
                tracing::info!(
                    "  model: {} nodes, {} bones",
                    header.node_count,
                    header.bone_count
                );
            }
            AnimationFile::Legacy(legacy) => {
                tracing::info!("{:?}: legacy animation version {}", path, legacy.version);
                tracing::info!(
                    "  {} ticks at {} tps, {} tracks",
                    legacy.duration,
                    legacy.tics_per_second,
                    legacy.tracks.len()
                );
            }
        }
    } else {
        anyhow::bail!(
            "Unsupported file: {:?} (use .{} or .{})",
            path,
            BBMOD_EXT,
            BBANIM_EXT
        );
    }
    Ok(())
}
