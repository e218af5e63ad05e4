//! BBMOD model file (.bbmod)
//!
//! # Layout (current revision)
//! ```text
//! magic          "BBMOD\0"
//! major          u8
//! minor          u8
//! [vertex_format VertexFormat]     - minor < 2 only
//! mesh_count     u32
//! meshes         mesh_count × Mesh
//! node_count     u32
//! root           Node (recursive, preorder)
//! bone_count     u32
//! bones          bone_count × Bone
//! material_count u32
//! materials      material_count × NUL-terminated name
//! ```
//!
//! The legacy magic `"bbmod\0"` is followed by the major byte only and is
//! decoded as minor 0.

mod node;
mod skeleton;

#[cfg(test)]
mod tests;

pub use node::*;
pub use skeleton::*;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::binary::{ReadBinaryExt, WriteBinaryExt};
use super::{
    BBMOD_LEGACY_MAGIC, BBMOD_MAGIC, MINOR_VERSION_MESH_FORMAT, Mesh, Version, VertexFormat,
    read_magic,
};
use crate::error::{FormatError, Result};

/// A complete model: meshes, node hierarchy, skeleton and material names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    /// Revision the model was decoded from; writers always emit the current one.
    pub version: Version,
    /// Model-wide vertex format of files older than minor 2.
    pub vertex_format: Option<VertexFormat>,
    pub meshes: Vec<Mesh>,
    pub nodes: NodeTree,
    /// Ordered by bone index.
    pub skeleton: Vec<Bone>,
    pub material_names: Vec<String>,
}

impl Model {
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn bone_count(&self) -> u32 {
        self.skeleton.len() as u32
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.root()
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.find_by_name(name).map(|(_, node)| node)
    }

    pub fn find_bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.skeleton.iter().find(|bone| bone.name == name)
    }

    pub fn bone(&self, index: u32) -> Option<&Bone> {
        self.skeleton.iter().find(|bone| bone.index == index)
    }

    /// Encode the model in the current revision.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BBMOD_MAGIC)?;
        w.write_byte(Version::CURRENT.major)?;
        w.write_byte(Version::CURRENT.minor)?;

        w.write_count(self.meshes.len(), "mesh")?;
        for mesh in &self.meshes {
            mesh.write(w)?;
        }

        if self.nodes.is_empty() {
            // Every file carries a root node
            w.write_u32_le(1)?;
            NodeTree::with_root(Node::new("", 0)).write(w)?;
        } else {
            w.write_count(self.nodes.len(), "node")?;
            self.nodes.write(w)?;
        }

        w.write_count(self.skeleton.len(), "bone")?;
        for bone in &self.skeleton {
            bone.write(w)?;
        }

        w.write_count(self.material_names.len(), "material")?;
        for name in &self.material_names {
            w.write_cstring(name)?;
        }
        Ok(())
    }

    /// Decode a model, upgrading older revisions to the in-memory layout.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let magic = read_magic(r, BBMOD_MAGIC.len())?;
        let version = if magic == BBMOD_MAGIC {
            let major = r.read_byte()?;
            Version::new(major, r.read_byte()?)
        } else if magic == BBMOD_LEGACY_MAGIC {
            Version::new(r.read_byte()?, 0)
        } else {
            return Err(FormatError::InvalidMagic(magic));
        };
        if !version.is_supported() {
            return Err(FormatError::VersionMismatch {
                major: version.major,
                minor: version.minor,
            });
        }

        let vertex_format = if version.minor < MINOR_VERSION_MESH_FORMAT {
            Some(VertexFormat::read(r, version)?)
        } else {
            None
        };

        let mesh_count = r.read_u32_le()?;
        let mut meshes = Vec::new();
        for _ in 0..mesh_count {
            meshes.push(Mesh::read(r, version, vertex_format)?);
        }

        let node_count = r.read_u32_le()?;
        let nodes = NodeTree::read(r)?;
        if nodes.len() != node_count as usize {
            return Err(FormatError::CountMismatch {
                what: "node",
                stored: node_count,
                actual: nodes.len(),
            });
        }

        let bone_count = r.read_u32_le()?;
        let mut skeleton = Vec::new();
        for _ in 0..bone_count {
            skeleton.push(Bone::read(r)?);
        }

        let material_count = r.read_u32_le()?;
        let mut material_names = Vec::new();
        for _ in 0..material_count {
            material_names.push(r.read_cstring()?);
        }

        let mut model = Self {
            version,
            vertex_format,
            meshes,
            nodes,
            skeleton,
            material_names,
        };
        model.validate()?;
        model.resolve_bone_names();
        Ok(model)
    }

    /// Check every stored index against the table it refers to.
    pub fn validate(&self) -> Result<()> {
        let node_count = self.node_count();
        let bone_count = self.bone_count();
        let mesh_count = self.meshes.len() as u32;
        let material_count = self.material_names.len() as u32;

        let check = |what: &'static str, index: u32, count: u32| {
            if index < count {
                Ok(())
            } else {
                Err(FormatError::IndexOutOfRange { what, index, count })
            }
        };

        // Indices are dense, so each one appears exactly once
        let mut seen_nodes = vec![false; node_count as usize];
        for (_, node) in self.nodes.iter() {
            check("node", node.index, node_count)?;
            let seen = &mut seen_nodes[node.index as usize];
            if std::mem::replace(seen, true) {
                return Err(FormatError::DuplicateIndex {
                    what: "node",
                    index: node.index,
                });
            }
            if node.is_bone {
                check("bone", node.index, bone_count)?;
            }
            for &mesh in &node.meshes {
                check("mesh", mesh, mesh_count)?;
            }
        }

        let mut seen_bones = vec![false; bone_count as usize];
        for bone in &self.skeleton {
            check("bone", bone.index, bone_count)?;
            if std::mem::replace(&mut seen_bones[bone.index as usize], true) {
                return Err(FormatError::DuplicateIndex {
                    what: "bone",
                    index: bone.index,
                });
            }
        }

        for mesh in &self.meshes {
            check("material", mesh.material_index, material_count)?;
            if mesh.vertex_format.bones {
                for vertex in &mesh.vertices {
                    for (index, weight) in vertex.bone_indices.iter().zip(vertex.bone_weights) {
                        if weight != 0.0 {
                            check("bone", *index, bone_count)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Copy names from bone-flagged nodes onto the bones sharing their index.
    fn resolve_bone_names(&mut self) {
        for (_, node) in self.nodes.iter() {
            if !node.is_bone {
                continue;
            }
            if let Some(bone) = self.skeleton.iter_mut().find(|b| b.index == node.index) {
                bone.name.clone_from(&node.name);
            }
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        Self::read(&mut bytes)
    }
}
