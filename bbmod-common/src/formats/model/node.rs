//! Node hierarchy stored in an arena
//!
//! # Layout (per node, preorder)
//! ```text
//! name        NUL-terminated string
//! index       f32
//! is_bone     u8 (bool)
//! transform   8 × f32 dual quaternion (parent space)
//! mesh_count  u32
//! meshes      mesh_count × u32
//! child_count u32
//! children    child_count × Node
//! ```

use std::io::{Read, Write};

use crate::error::Result;
use crate::formats::binary::{ReadBinaryExt, WriteBinaryExt};
use crate::math::DualQuat;

/// Handle of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// One node of the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    /// Dense index; equals the bone index for bone nodes.
    pub index: u32,
    pub is_bone: bool,
    /// Transform relative to the parent node.
    pub transform: DualQuat,
    /// Indices into the model's mesh list.
    pub meshes: Vec<u32>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
            is_bone: false,
            transform: DualQuat::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn write_header<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_cstring(&self.name)?;
        w.write_f32_le(self.index as f32)?;
        w.write_bool(self.is_bone)?;
        w.write_dual_quat(&self.transform)?;
        w.write_count(self.meshes.len(), "node mesh")?;
        for &mesh in &self.meshes {
            w.write_u32_le(mesh)?;
        }
        w.write_count(self.children.len(), "child")
    }

    /// Read everything except the children; returns the child count.
    fn read_header<R: Read>(r: &mut R) -> Result<(Self, u32)> {
        let name = r.read_cstring()?;
        let index = r.read_index("node")?;
        let is_bone = r.read_bool()?;
        let transform = r.read_dual_quat()?;
        let mesh_count = r.read_u32_le()?;
        let mut meshes = Vec::new();
        for _ in 0..mesh_count {
            meshes.push(r.read_u32_le()?);
        }
        let child_count = r.read_u32_le()?;
        let node = Self {
            name,
            index,
            is_bone,
            transform,
            meshes,
            children: Vec::new(),
        };
        Ok((node, child_count))
    }
}

/// Arena of nodes; the root is always [`NodeId::ROOT`] when present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    /// Tree holding only `root`.
    pub fn with_root(root: Node) -> Self {
        Self { nodes: vec![root] }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// Returns `None` if `parent` does not exist.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        let id = NodeId(self.nodes.len());
        self.nodes.get_mut(parent.0)?.children.push(id);
        self.nodes.push(node);
        Some(id)
    }

    /// Nodes in arena order (not necessarily preorder).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Depth-first preorder walk from the root.
    pub fn preorder(&self) -> Preorder<'_> {
        let stack = if self.nodes.is_empty() {
            Vec::new()
        } else {
            vec![(NodeId::ROOT, 0)]
        };
        Preorder { tree: self, stack }
    }

    /// Parent of every node, indexed by `NodeId`.
    pub fn parents(&self) -> Vec<Option<NodeId>> {
        let mut parents = vec![None; self.nodes.len()];
        for (id, node) in self.iter() {
            for child in &node.children {
                if let Some(slot) = parents.get_mut(child.0) {
                    *slot = Some(id);
                }
            }
        }
        parents
    }

    pub fn find_by_name(&self, name: &str) -> Option<(NodeId, &Node)> {
        self.preorder().find(|(_, node)| node.name == name)
    }

    /// Write the tree in preorder, starting at the root.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        for (_, node) in self.preorder() {
            node.write_header(w)?;
        }
        Ok(())
    }

    /// Read a full tree without recursing on the call stack.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let (root, root_children) = Node::read_header(r)?;
        let mut tree = Self::with_root(root);
        // (parent, children still to read)
        let mut pending = vec![(NodeId::ROOT, root_children)];

        while let Some(top) = pending.last_mut() {
            if top.1 == 0 {
                pending.pop();
                continue;
            }
            top.1 -= 1;
            let parent = top.0;

            let (node, child_count) = Node::read_header(r)?;
            let id = NodeId(tree.nodes.len());
            tree.nodes.push(node);
            tree.nodes[parent.0].children.push(id);
            pending.push((id, child_count));
        }

        Ok(tree)
    }
}

/// Preorder iterator over a [`NodeTree`].
pub struct Preorder<'a> {
    tree: &'a NodeTree,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Preorder<'a> {
    /// Yield the depth of each node alongside it (root is depth 0).
    pub fn with_depth(self) -> PreorderWithDepth<'a> {
        PreorderWithDepth(self)
    }

    fn next_entry(&mut self) -> Option<(NodeId, &'a Node, usize)> {
        let (id, depth) = self.stack.pop()?;
        let node = self.tree.get(id)?;
        for &child in node.children.iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some((id, node, depth))
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().map(|(id, node, _)| (id, node))
    }
}

pub struct PreorderWithDepth<'a>(Preorder<'a>);

impl<'a> Iterator for PreorderWithDepth<'a> {
    type Item = (NodeId, &'a Node, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_entry()
    }
}
