//! glTF/GLB adapter
//!
//! Reads a glTF document into a [`Scene`]. A synthetic `RootNode` is placed
//! above the scene's root nodes, every primitive becomes its own mesh, and
//! skins are turned into per-mesh bone lists. Animation keys are in seconds
//! (`ticks_per_second = 1`).

use std::path::Path;

use bbmod_common::PrimitiveType;
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;
use gltf::mesh::Mode;
use glam::{Mat4, Quat, Vec2, Vec3};
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::error::{ExportError, Result};
use crate::scene::{
    Key, NodeChannel, Scene, SceneAnimation, SceneBone, SceneMaterial, SceneMesh, SceneNode,
    VertexWeight,
};

/// Name of the node placed above the glTF scene roots.
pub const ROOT_NODE_NAME: &str = "RootNode";
/// Material assigned to primitives without one.
pub const DEFAULT_MATERIAL_NAME: &str = "DefaultMaterial";

/// Load a `.gltf` or `.glb` file.
pub fn import_gltf(path: &Path) -> Result<Scene> {
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|err| ExportError::Import(format!("{}: {err}", path.display())))?;

    if document.nodes().len() == 0 {
        return Err(ExportError::EmptyScene);
    }

    let scene = SceneBuilder::new(&document, &buffers).build()?;
    debug!(
        "Imported {:?}: {} nodes, {} meshes, {} materials, {} animations",
        path,
        scene.nodes.len(),
        scene.meshes.len(),
        scene.materials.len(),
        scene.animations.len()
    );
    Ok(scene)
}

/// Name of a glTF node; unnamed nodes get `node_<index>`.
pub fn node_name(node: &gltf::Node) -> String {
    match node.name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("node_{}", node.index()),
    }
}

struct SceneBuilder<'a> {
    document: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    scene: Scene,
    /// Meshes already created for a (glTF mesh, skin) pair.
    mesh_cache: HashMap<(usize, Option<usize>), Vec<usize>>,
    default_material: Option<u32>,
}

impl<'a> SceneBuilder<'a> {
    fn new(document: &'a gltf::Document, buffers: &'a [gltf::buffer::Data]) -> Self {
        Self {
            document,
            buffers,
            scene: Scene::default(),
            mesh_cache: HashMap::new(),
            default_material: None,
        }
    }

    fn buffer(&self, buffer: gltf::Buffer) -> Option<&'a [u8]> {
        self.buffers.get(buffer.index()).map(|data| &data.0[..])
    }

    fn build(mut self) -> Result<Scene> {
        self.scene.materials = self
            .document
            .materials()
            .enumerate()
            .map(|(i, material)| {
                let name = match material.name() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => format!("material_{i}"),
                };
                let [r, g, b, a] = material.pbr_metallic_roughness().base_color_factor();
                SceneMaterial {
                    name,
                    diffuse: [r, g, b],
                    opacity: a,
                }
            })
            .collect();

        let roots: Vec<gltf::Node<'a>> = match self
            .document
            .default_scene()
            .or_else(|| self.document.scenes().next())
        {
            Some(scene) => scene.nodes().collect(),
            None => parentless_nodes(self.document),
        };

        let root = self.scene.add_node(None, SceneNode::new(ROOT_NODE_NAME));
        let mut stack: Vec<(gltf::Node<'a>, usize)> =
            roots.into_iter().rev().map(|node| (node, root)).collect();

        while let Some((node, parent)) = stack.pop() {
            let mut scene_node = SceneNode::new(node_name(&node));
            scene_node.transform = Mat4::from_cols_array_2d(&node.transform().matrix());
            if let Some(mesh) = node.mesh() {
                scene_node.meshes = self.import_mesh(&mesh, node.skin())?;
            }
            let index = self.scene.add_node(Some(parent), scene_node);
            let children: Vec<gltf::Node<'a>> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, index)));
        }

        for animation in self.document.animations() {
            let clip = self.import_animation(&animation);
            self.scene.animations.push(clip);
        }

        Ok(self.scene)
    }

    fn import_mesh(&mut self, mesh: &gltf::Mesh, skin: Option<gltf::Skin>) -> Result<Vec<usize>> {
        let key = (mesh.index(), skin.as_ref().map(|skin| skin.index()));
        if let Some(indices) = self.mesh_cache.get(&key) {
            return Ok(indices.clone());
        }

        let mesh_name = match mesh.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("mesh_{}", mesh.index()),
        };

        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            let name = if mesh.primitives().len() > 1 {
                format!("{mesh_name}_{}", primitive.index())
            } else {
                mesh_name.clone()
            };
            let scene_mesh = self.import_primitive(name, &primitive, skin.as_ref())?;
            indices.push(self.scene.meshes.len());
            self.scene.meshes.push(scene_mesh);
        }

        self.mesh_cache.insert(key, indices.clone());
        Ok(indices)
    }

    fn material_index(&mut self, material: gltf::Material) -> u32 {
        if let Some(index) = material.index() {
            return index as u32;
        }
        if let Some(index) = self.default_material {
            return index;
        }
        let index = self.scene.materials.len() as u32;
        self.scene.materials.push(SceneMaterial::new(DEFAULT_MATERIAL_NAME));
        self.default_material = Some(index);
        index
    }

    fn import_primitive(
        &mut self,
        name: String,
        primitive: &gltf::Primitive,
        skin: Option<&gltf::Skin>,
    ) -> Result<SceneMesh> {
        let buffers = self.buffers;
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| ExportError::Import(format!("mesh \"{name}\" has no positions")))?
            .map(Vec3::from)
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let (primitive_type, faces) = assemble_faces(primitive.mode(), &indices);

        let normals: Option<Vec<Vec3>> = reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from).collect());
        let uv0 = reader
            .read_tex_coords(0)
            .map(|uv| uv.into_f32().map(Vec2::from).collect());
        let uv1 = reader
            .read_tex_coords(1)
            .map(|uv| uv.into_f32().map(Vec2::from).collect());
        let colors = reader
            .read_colors(0)
            .map(|colors| colors.into_rgba_f32().collect());

        // Tangents need normals to derive the bitangent
        let (tangents, bitangents) = match (&normals, reader.read_tangents()) {
            (Some(normals), Some(tangents)) => {
                let (tangents, bitangents): (Vec<Vec3>, Vec<Vec3>) = tangents
                    .zip(normals.iter())
                    .map(|([x, y, z, w], normal)| {
                        let tangent = Vec3::new(x, y, z);
                        (tangent, normal.cross(tangent) * w)
                    })
                    .unzip();
                (Some(tangents), Some(bitangents))
            }
            _ => (None, None),
        };

        let mut bones = Vec::new();
        if let Some(skin) = skin {
            let skin_reader =
                skin.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let inverse_binds: Vec<Mat4> = skin_reader
                .read_inverse_bind_matrices()
                .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
                .unwrap_or_default();

            bones = skin
                .joints()
                .enumerate()
                .map(|(i, joint)| SceneBone {
                    name: node_name(&joint),
                    offset: inverse_binds.get(i).copied().unwrap_or(Mat4::IDENTITY),
                    weights: Vec::new(),
                })
                .collect();

            if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
                for (vertex, (joint_set, weight_set)) in
                    joints.into_u16().zip(weights.into_f32()).enumerate()
                {
                    for (joint, weight) in joint_set.into_iter().zip(weight_set) {
                        if weight == 0.0 {
                            continue;
                        }
                        if let Some(bone) = bones.get_mut(joint as usize) {
                            bone.weights.push(VertexWeight {
                                vertex: vertex as u32,
                                weight,
                            });
                        }
                    }
                }
            } else {
                warn!("Mesh \"{}\" is skinned but has no joints or weights", name);
            }
            bones.retain(|bone| !bone.weights.is_empty());
        }

        let material_index = self.material_index(primitive.material());

        Ok(SceneMesh {
            name,
            material_index,
            primitive_type,
            positions,
            normals,
            uv0,
            uv1,
            colors,
            tangents,
            bitangents,
            faces,
            bones,
        })
    }

    fn import_animation(&self, animation: &gltf::Animation) -> SceneAnimation {
        let mut channels: Vec<NodeChannel> = Vec::new();
        let mut by_node: HashMap<usize, usize> = HashMap::new();
        let mut duration = 0.0f64;

        for channel in animation.channels() {
            let target = channel.target();
            let reader = channel.reader(|buffer| self.buffer(buffer));
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f64> = inputs.map(f64::from).collect();
            if let Some(&last) = times.last() {
                duration = duration.max(last);
            }
            let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;

            let node = target.node();
            let slot = *by_node.entry(node.index()).or_insert_with(|| {
                channels.push(NodeChannel {
                    node_name: node_name(&node),
                    ..NodeChannel::default()
                });
                channels.len() - 1
            });

            match reader.read_outputs() {
                Some(ReadOutputs::Translations(values)) => {
                    channels[slot].positions = keyframes(&times, values.map(Vec3::from), cubic);
                }
                Some(ReadOutputs::Rotations(values)) => {
                    channels[slot].rotations =
                        keyframes(&times, values.into_f32().map(Quat::from_array), cubic);
                }
                // Scale and morph weights are not stored
                _ => {}
            }
        }

        SceneAnimation {
            name: animation.name().unwrap_or_default().to_string(),
            duration,
            ticks_per_second: 1.0,
            channels,
        }
    }
}

/// Nodes that are nobody's child, for documents without scenes.
fn parentless_nodes(document: &gltf::Document) -> Vec<gltf::Node<'_>> {
    let mut is_child = vec![false; document.nodes().len()];
    for node in document.nodes() {
        for child in node.children() {
            if let Some(flag) = is_child.get_mut(child.index()) {
                *flag = true;
            }
        }
    }
    document
        .nodes()
        .filter(|node| !is_child.get(node.index()).copied().unwrap_or(false))
        .collect()
}

/// Pair key times with values; cubic spline outputs carry in/out tangents
/// around each value.
fn keyframes<T>(times: &[f64], values: impl Iterator<Item = T>, cubic: bool) -> Vec<Key<T>> {
    let values: Vec<T> = if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    };
    times
        .iter()
        .zip(values)
        .map(|(&time, value)| Key::new(time, value))
        .collect()
}

/// Split an index list into faces, turning strips, loops and fans into
/// plain lists.
pub fn assemble_faces(mode: Mode, indices: &[u32]) -> (PrimitiveType, Vec<Vec<u32>>) {
    match mode {
        Mode::Points => (
            PrimitiveType::PointList,
            indices.iter().map(|&i| vec![i]).collect(),
        ),
        Mode::Lines => (
            PrimitiveType::LineList,
            indices.chunks(2).map(<[u32]>::to_vec).collect(),
        ),
        Mode::LineStrip | Mode::LineLoop => {
            let mut faces: Vec<Vec<u32>> = indices.windows(2).map(<[u32]>::to_vec).collect();
            if mode == Mode::LineLoop && indices.len() > 2 {
                if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                    faces.push(vec![last, first]);
                }
            }
            (PrimitiveType::LineList, faces)
        }
        Mode::Triangles => (
            PrimitiveType::TriangleList,
            indices.chunks(3).map(<[u32]>::to_vec).collect(),
        ),
        Mode::TriangleStrip => {
            let faces = indices
                .windows(3)
                .enumerate()
                .map(|(i, w)| {
                    if i % 2 == 0 {
                        vec![w[0], w[1], w[2]]
                    } else {
                        vec![w[1], w[0], w[2]]
                    }
                })
                .collect();
            (PrimitiveType::TriangleList, faces)
        }
        Mode::TriangleFan => {
            let faces = match indices.split_first() {
                Some((&center, rest)) => rest
                    .windows(2)
                    .map(|w| vec![center, w[0], w[1]])
                    .collect(),
                None => Vec::new(),
            };
            (PrimitiveType::TriangleList, faces)
        }
    }
}
