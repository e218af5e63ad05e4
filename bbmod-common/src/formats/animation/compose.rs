//! Per-frame hierarchical composition
//!
//! Walks the node tree with an explicit stack, parents before children, and
//! fills one transform per node (parent and world space) and per bone (bone
//! space).

use crate::error::{FormatError, Result};
use crate::formats::{Model, NodeId};
use crate::math::DualQuat;

use super::AnimationNode;

/// Transforms of every node and bone for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Indexed by node index.
    pub parent: Vec<DualQuat>,
    /// Indexed by node index.
    pub world: Vec<DualQuat>,
    /// Indexed by bone index.
    pub bone: Vec<DualQuat>,
}

impl Pose {
    pub fn new(node_count: usize, bone_count: usize) -> Self {
        Self {
            parent: vec![DualQuat::IDENTITY; node_count],
            world: vec![DualQuat::IDENTITY; node_count],
            bone: vec![DualQuat::IDENTITY; bone_count],
        }
    }
}

/// Reusable composition state for one model.
pub struct PoseComposer<'a> {
    model: &'a Model,
    /// Track of each node index, if animated.
    tracks: Vec<Option<&'a AnimationNode>>,
    /// Offset of each bone index.
    offsets: Vec<DualQuat>,
    stack: Vec<(NodeId, DualQuat)>,
}

impl<'a> PoseComposer<'a> {
    /// Index `tracks` by node index.
    ///
    /// Fails if a track names a node index outside the model.
    pub fn new(model: &'a Model, tracks: &'a [AnimationNode]) -> Result<Self> {
        let node_count = model.node_count();
        let mut by_index = vec![None; node_count as usize];
        for track in tracks {
            let slot = by_index.get_mut(track.index as usize).ok_or(
                FormatError::IndexOutOfRange {
                    what: "animation node",
                    index: track.index,
                    count: node_count,
                },
            )?;
            *slot = Some(track);
        }

        let mut offsets = vec![DualQuat::IDENTITY; model.skeleton.len()];
        for bone in &model.skeleton {
            if let Some(slot) = offsets.get_mut(bone.index as usize) {
                *slot = bone.offset;
            }
        }

        Ok(Self {
            model,
            tracks: by_index,
            offsets,
            stack: Vec::new(),
        })
    }

    /// Compose frame `frame` into `pose`.
    ///
    /// Animated nodes use their sampled transform (the last one if the track
    /// is shorter than `frame`); every other node holds its bind transform.
    pub fn compose(&mut self, frame: usize, pose: &mut Pose) -> Result<()> {
        let model = self.model;
        self.stack.clear();
        if model.nodes.is_empty() {
            return Ok(());
        }
        self.stack.push((NodeId::ROOT, DualQuat::IDENTITY));

        while let Some((id, parent_world)) = self.stack.pop() {
            let Some(node) = model.nodes.get(id) else {
                continue;
            };
            let index = node.index as usize;

            let local = self
                .tracks
                .get(index)
                .copied()
                .flatten()
                .and_then(|track| track.frames.get(frame).or(track.frames.last()))
                .copied()
                .unwrap_or(node.transform);
            let world = parent_world * local;

            if index >= pose.parent.len() || index >= pose.world.len() {
                return Err(FormatError::IndexOutOfRange {
                    what: "node",
                    index: node.index,
                    count: pose.parent.len().min(pose.world.len()) as u32,
                });
            }
            pose.parent[index] = local;
            pose.world[index] = world;

            if node.is_bone {
                let bone_count = pose.bone.len() as u32;
                let (Some(offset), Some(slot)) = (self.offsets.get(index), pose.bone.get_mut(index))
                else {
                    return Err(FormatError::IndexOutOfRange {
                        what: "bone",
                        index: node.index,
                        count: bone_count,
                    });
                };
                *slot = world * *offset;
            }

            for &child in &node.children {
                self.stack.push((child, world));
            }
        }
        Ok(())
    }
}
