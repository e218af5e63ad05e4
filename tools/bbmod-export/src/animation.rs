//! Animation baker
//!
//! Resamples a clip's keyframe tracks onto a uniform frame grid at the
//! configured sampling rate. Each animated node gets one parent-space
//! transform per sample; composition into world and bone space happens when
//! the animation is written against its model.

use bbmod_common::math::{lerp_vec3, slerp};
use bbmod_common::{Animation, AnimationNode, BBANIM_EXT, DualQuat, Model, Version};
use glam::{Quat, Vec3};
use tracing::debug;

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::scene::{Key, SceneAnimation};

/// Tick rate assumed for clips that do not declare one.
pub const DEFAULT_TICKS_PER_SECOND: f64 = 25.0;

/// Blending between two keyframe values.
pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, factor: f32) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(a: Self, b: Self, factor: f32) -> Self {
        lerp_vec3(a, b, factor)
    }
}

impl Interpolate for Quat {
    fn interpolate(a: Self, b: Self, factor: f32) -> Self {
        slerp(a, b, factor)
    }
}

/// Value of a track at `time`.
///
/// Before the first key (or with a single key) the first key is held; past
/// the last key the last key is held. A time exactly on a key returns that
/// key's value unchanged. Returns `None` for an empty track.
pub fn sample_track<T: Interpolate>(keys: &[Key<T>], time: f64) -> Option<T> {
    let first = keys.first()?;
    if keys.len() == 1 || time <= first.time {
        return Some(first.value);
    }

    for pair in keys.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if time < next.time {
            let span = next.time - prev.time;
            let factor = if span > 0.0 {
                (time - prev.time) / span
            } else {
                0.0
            };
            if factor <= 0.0 {
                return Some(prev.value);
            }
            return Some(T::interpolate(prev.value, next.value, factor as f32));
        }
    }

    keys.last().map(|key| key.value)
}

/// Number of frames a clip occupies at `sampling_rate`, at least 1.
pub fn baked_duration(duration: f64, ticks_per_second: f64, sampling_rate: f64) -> u32 {
    let ticks_per_second = if ticks_per_second > 0.0 {
        ticks_per_second
    } else {
        DEFAULT_TICKS_PER_SECOND
    };
    let scale = ticks_per_second / sampling_rate.max(1.0);
    let frames = (duration / scale).ceil();
    if frames.is_finite() && frames >= 1.0 {
        frames.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Resample one clip against `model`.
///
/// Fails if a channel targets a node the model does not have.
pub fn bake_animation(clip: &SceneAnimation, model: &Model, config: &Config) -> Result<Animation> {
    // Frames are whole ticks of the output rate
    let sampling_rate = config.sampling_rate.floor().max(1.0);
    let duration = baked_duration(clip.duration, clip.ticks_per_second, sampling_rate);

    let mut nodes = Vec::with_capacity(clip.channels.len());
    for channel in &clip.channels {
        let Some(node) = model.find_node_by_name(&channel.node_name) else {
            return Err(ExportError::UnknownAnimationNode {
                animation: clip.name.clone(),
                node: channel.node_name.clone(),
            });
        };

        let rest_translation = node.transform.translation();
        let rest_rotation = node.transform.rotation();

        let frames = (0..=duration)
            .map(|frame| {
                let time = f64::from(frame) / f64::from(duration) * clip.duration;
                let translation =
                    sample_track(&channel.positions, time).unwrap_or(rest_translation);
                let rotation = sample_track(&channel.rotations, time).unwrap_or(rest_rotation);
                DualQuat::from_translation_rotation(translation, rotation)
            })
            .collect();

        nodes.push(AnimationNode {
            index: node.index,
            frames,
        });
    }

    debug!(
        "Baked \"{}\": {} frames at {} fps, {} channels",
        clip.name,
        duration,
        sampling_rate,
        nodes.len()
    );

    Ok(Animation {
        version: Version::CURRENT,
        name: clip.name.clone(),
        duration,
        tics_per_second: sampling_rate,
        nodes,
        model_node_count: model.node_count(),
    })
}

/// Clip name prefixes added by common exporters.
const STRIPPED_PREFIXES: [&str; 2] = ["Armature|", "mixamo.com|"];

/// Characters not allowed in file names on common platforms.
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Clip name usable as part of a file name.
///
/// Known exporter prefixes are stripped, an empty name becomes
/// `anim<index>` and illegal characters are replaced with `_`.
pub fn sanitize_clip_name(name: &str, index: usize) -> String {
    let mut name = name;
    for prefix in STRIPPED_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
        }
    }
    if name.is_empty() {
        return format!("anim{index}");
    }
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// File name of a baked clip: `<model stem>_<clip>.bbanim`, or
/// `<clip>.bbanim` without the prefix.
pub fn animation_file_name(model_stem: &str, clip_name: &str, index: usize, prefix: bool) -> String {
    let clip = sanitize_clip_name(clip_name, index);
    if prefix {
        format!("{model_stem}_{clip}.{BBANIM_EXT}")
    } else {
        format!("{clip}.{BBANIM_EXT}")
    }
}
