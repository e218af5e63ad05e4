//! Mesh builder: expands source faces into flat vertex lists
//!
//! Every face corner becomes its own vertex; there is no index buffer.
//! Only the attributes enabled in the mesh's [`VertexFormat`] are filled in,
//! the rest keep their defaults so that a decoded mesh compares equal.

use bbmod_common::{
    BoundingBox, MAX_BONE_INFLUENCES, Mesh, Vertex, VertexFormat, pack_color,
};
use glam::{Vec2, Vec3};

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::scene::SceneMesh;
use crate::skeleton::Skeleton;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Attributes a source mesh provides, minus the ones disabled in `config`.
pub fn mesh_vertex_format(mesh: &SceneMesh, config: &Config) -> VertexFormat {
    VertexFormat {
        position: true,
        normal: mesh.has_normals() && !config.disable_normals,
        uv0: mesh.uv0.is_some() && !config.disable_uv,
        uv1: mesh.uv1.is_some() && !config.disable_uv2,
        color: mesh.colors.is_some() && !config.disable_vertex_colors,
        tangent: mesh.has_tangents() && !(config.disable_normals || config.disable_tangents),
        bones: mesh.has_bones() && !config.disable_bones,
        ids: false,
    }
}

/// Per-vertex bone influences, first four in encounter order.
type Influences = Vec<[(u32, f32); MAX_BONE_INFLUENCES]>;

fn collect_influences(mesh: &SceneMesh, skeleton: &Skeleton) -> Result<Influences> {
    let vertex_count = mesh.positions.len();
    let mut influences = vec![[(0u32, 0.0f32); MAX_BONE_INFLUENCES]; vertex_count];
    let mut used = vec![0usize; vertex_count];

    for bone in &mesh.bones {
        let Some(bone_index) = skeleton.index_of(&bone.name) else {
            return Err(ExportError::UnknownBone {
                mesh: mesh.name.clone(),
                bone: bone.name.clone(),
            });
        };
        for weight in &bone.weights {
            let vertex = weight.vertex as usize;
            let (Some(slots), Some(count)) = (influences.get_mut(vertex), used.get_mut(vertex))
            else {
                return Err(ExportError::VertexOutOfRange {
                    mesh: mesh.name.clone(),
                    vertex: weight.vertex,
                    count: vertex_count,
                });
            };
            if *count < MAX_BONE_INFLUENCES {
                slots[*count] = (bone_index, weight.weight);
                *count += 1;
            }
        }
    }
    Ok(influences)
}

fn flip_uv(uv: Vec2, config: &Config) -> Vec2 {
    Vec2::new(
        if config.flip_uv_horizontally { 1.0 - uv.x } else { uv.x },
        if config.flip_uv_vertically { 1.0 - uv.y } else { uv.y },
    )
}

/// Build one output mesh from a source mesh.
///
/// Fails if a face does not match the mesh's primitive type or references
/// a vertex or bone the mesh does not have.
pub fn build_mesh(
    source: &SceneMesh,
    format: VertexFormat,
    skeleton: &Skeleton,
    config: &Config,
) -> Result<Mesh> {
    let expected = source.primitive_type.corners();
    let vertex_count = source.positions.len();
    let influences = if format.bones {
        Some(collect_influences(source, skeleton)?)
    } else {
        None
    };

    let mut vertices = Vec::with_capacity(source.faces.len() * expected);
    for face in &source.faces {
        if face.len() != expected {
            return Err(ExportError::UnsupportedFace {
                mesh: source.name.clone(),
                corners: face.len(),
                expected,
            });
        }

        for k in 0..expected {
            let corner = if config.invert_winding {
                face[expected - 1 - k]
            } else {
                face[k]
            };
            let index = corner as usize;
            let Some(&position) = source.positions.get(index) else {
                return Err(ExportError::VertexOutOfRange {
                    mesh: source.name.clone(),
                    vertex: corner,
                    count: vertex_count,
                });
            };

            let mut vertex = Vertex {
                position,
                ..Vertex::default()
            };

            let mut normal = source
                .normals
                .as_ref()
                .and_then(|n| n.get(index).copied())
                .unwrap_or(Vec3::ZERO);
            if config.flip_normals {
                normal = -normal;
            }
            if format.normal {
                vertex.normal = normal;
            }

            if format.uv0 {
                let uv = source.uv0.as_ref().and_then(|uv| uv.get(index).copied());
                vertex.uv0 = flip_uv(uv.unwrap_or(Vec2::ZERO), config);
            }
            if format.uv1 {
                let uv = source.uv1.as_ref().and_then(|uv| uv.get(index).copied());
                vertex.uv1 = flip_uv(uv.unwrap_or(Vec2::ZERO), config);
            }

            if format.color {
                let color = source.colors.as_ref().and_then(|c| c.get(index).copied());
                vertex.color = pack_color(color.unwrap_or(WHITE));
            }

            if format.tangent {
                let tangent = source
                    .tangents
                    .as_ref()
                    .and_then(|t| t.get(index).copied())
                    .unwrap_or(Vec3::ZERO);
                let bitangent = source
                    .bitangents
                    .as_ref()
                    .and_then(|b| b.get(index).copied())
                    .unwrap_or(Vec3::ZERO);
                vertex.tangent = tangent;
                vertex.bitangent_sign = if normal.cross(tangent).dot(bitangent) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
            }

            if let Some(slots) = influences.as_ref().and_then(|i| i.get(index)) {
                for (slot, &(bone, weight)) in slots.iter().enumerate() {
                    vertex.bone_indices[slot] = bone;
                    vertex.bone_weights[slot] = weight;
                }
            }

            vertices.push(vertex);
        }
    }

    Ok(Mesh {
        material_index: source.material_index,
        primitive_type: source.primitive_type,
        bounding_box: BoundingBox::from_points(vertices.iter().map(|v| v.position)),
        vertex_format: format,
        vertices,
    })
}
