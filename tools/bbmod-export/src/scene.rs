//! Importer-facing scene representation
//!
//! Everything the converter needs from a source asset: meshes with
//! per-vertex attributes and faces, the node tree, per-mesh bone
//! influences, animation clips and the material table. Importers fill this
//! in; the converter only reads it.

use bbmod_common::PrimitiveType;
use glam::{Mat4, Quat, Vec2, Vec3};

/// One source mesh.
///
/// Attribute arrays are indexed by vertex; faces index into them.
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub material_index: u32,
    pub primitive_type: PrimitiveType,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uv0: Option<Vec<Vec2>>,
    pub uv1: Option<Vec<Vec2>>,
    /// Linear RGBA.
    pub colors: Option<Vec<[f32; 4]>>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    /// Vertex indices per face.
    pub faces: Vec<Vec<u32>>,
    pub bones: Vec<SceneBone>,
}

impl SceneMesh {
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_tangents(&self) -> bool {
        self.tangents.is_some() && self.bitangents.is_some()
    }

    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }
}

/// A bone influencing a mesh.
#[derive(Debug, Clone)]
pub struct SceneBone {
    /// Name of the node driving this bone.
    pub name: String,
    /// Inverse bind matrix: mesh space to bone space.
    pub offset: Mat4,
    pub weights: Vec<VertexWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

/// A node of the source hierarchy.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent.
    pub transform: Mat4,
    /// Indices into [`Scene::meshes`].
    pub meshes: Vec<usize>,
    /// Indices into [`Scene::nodes`].
    pub children: Vec<usize>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// A keyframe value at a point in time (in ticks).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key<T> {
    pub time: f64,
    pub value: T,
}

impl<T> Key<T> {
    pub fn new(time: f64, value: T) -> Self {
        Self { time, value }
    }
}

/// Position and rotation tracks of one node.
#[derive(Debug, Clone, Default)]
pub struct NodeChannel {
    pub node_name: String,
    pub positions: Vec<Key<Vec3>>,
    pub rotations: Vec<Key<Quat>>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneAnimation {
    pub name: String,
    /// Length in ticks.
    pub duration: f64,
    pub ticks_per_second: f64,
    pub channels: Vec<NodeChannel>,
}

#[derive(Debug, Clone)]
pub struct SceneMaterial {
    pub name: String,
    /// Linear RGB.
    pub diffuse: [f32; 3],
    pub opacity: f32,
}

impl SceneMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: [1.0, 1.0, 1.0],
            opacity: 1.0,
        }
    }
}

/// A whole imported asset. `nodes[0]` is the root when present.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub nodes: Vec<SceneNode>,
    pub animations: Vec<SceneAnimation>,
}

impl Scene {
    pub const ROOT: usize = 0;

    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.first()
    }

    /// Append a node and link it under `parent`.
    pub fn add_node(&mut self, parent: Option<usize>, node: SceneNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(index);
        }
        index
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == name)
    }

    /// Parent of every node.
    pub fn parents(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if let Some(slot) = parents.get_mut(child) {
                    *slot = Some(index);
                }
            }
        }
        parents
    }

    /// Nodes reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            order.push(index);
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// Model-space transform of every node.
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        let parents = self.parents();
        for index in self.preorder() {
            let local = self.nodes[index].transform;
            world[index] = match parents[index] {
                Some(parent) => world[parent] * local,
                None => local,
            };
        }
        world
    }
}
