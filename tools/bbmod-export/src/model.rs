//! Model assembly: skeleton, node tree, meshes and material names

use bbmod_common::{Model, Version};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::mesh::{build_mesh, mesh_vertex_format};
use crate::scene::Scene;
use crate::skeleton::{Skeleton, build_node_tree};

/// Bone count the default renderer shaders can skin with.
pub const MAX_SHADER_BONES: usize = 128;

/// Build a model from an imported scene.
///
/// Bones are collected before the node walk so that bone nodes resolve to
/// bone indices.
pub fn build_model(scene: &Scene, config: &Config) -> Result<Model> {
    if scene.nodes.is_empty() && scene.meshes.is_empty() {
        return Err(ExportError::EmptyScene);
    }

    let skeleton = Skeleton::collect(scene, config);
    let nodes = build_node_tree(scene, &skeleton)?;

    let mut meshes = Vec::with_capacity(scene.meshes.len());
    for source in &scene.meshes {
        let format = mesh_vertex_format(source, config);
        meshes.push(build_mesh(source, format, &skeleton, config)?);
    }

    let model = Model {
        version: Version::CURRENT,
        vertex_format: None,
        meshes,
        nodes,
        skeleton: skeleton.into_bones(),
        material_names: scene.materials.iter().map(|m| m.name.clone()).collect(),
    };

    if model.skeleton.len() > MAX_SHADER_BONES {
        warn!(
            "Model has {} bones, default shaders support at most {}",
            model.skeleton.len(),
            MAX_SHADER_BONES
        );
    }
    log_node_tree(&model);

    Ok(model)
}

/// Log the hierarchy with mesh formats at debug level.
pub fn log_node_tree(model: &Model) {
    for (_, node, depth) in model.nodes.preorder().with_depth() {
        let marker = if node.is_bone { " [bone]" } else { "" };
        debug!(
            "{:indent$}{} {}{}",
            "",
            node.index,
            node.name,
            marker,
            indent = depth * 2
        );
        for &mesh in &node.meshes {
            if let Some(mesh) = model.meshes.get(mesh as usize) {
                debug!(
                    "{:indent$}mesh: {} ({} vertices)",
                    "",
                    mesh.vertex_format,
                    mesh.vertices.len(),
                    indent = depth * 2 + 2
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneBone, SceneMaterial, SceneMesh, SceneNode, VertexWeight};
    use glam::{Mat4, Vec3};

    fn scene_with_bones(bone_count: usize) -> Scene {
        let bones = (0..bone_count)
            .map(|i| SceneBone {
                name: format!("b{i}"),
                offset: Mat4::IDENTITY,
                weights: vec![VertexWeight {
                    vertex: 0,
                    weight: 1.0,
                }],
            })
            .collect();
        let mut scene = Scene {
            meshes: vec![SceneMesh {
                name: "Mesh".to_string(),
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                faces: vec![vec![0, 1, 2]],
                bones,
                ..SceneMesh::default()
            }],
            materials: vec![SceneMaterial::new("Skin"), SceneMaterial::new("Cloth")],
            ..Scene::default()
        };
        let mut root = SceneNode::new("RootNode");
        root.meshes.push(0);
        let root = scene.add_node(None, root);
        for i in 0..bone_count {
            scene.add_node(Some(root), SceneNode::new(format!("b{i}")));
        }
        scene
    }

    #[test]
    fn test_empty_scene() {
        let result = build_model(&Scene::default(), &Config::default());
        assert!(matches!(result, Err(ExportError::EmptyScene)));
    }

    #[test]
    fn test_model_counts_and_materials() {
        let model = build_model(&scene_with_bones(3), &Config::default()).unwrap();
        assert_eq!(model.bone_count(), 3);
        assert_eq!(model.node_count(), 4);
        assert_eq!(model.root().unwrap().index, 3);
        assert_eq!(model.material_names, vec!["Skin", "Cloth"]);
        assert!(model.meshes[0].vertex_format.bones);
        model.validate().unwrap();
    }

    #[test]
    fn test_bone_nodes_must_match_skeleton() {
        let mut scene = scene_with_bones(1);
        scene.nodes.truncate(1);
        scene.nodes[0].children.clear();
        let result = build_model(&scene, &Config::default());
        assert!(matches!(result, Err(ExportError::BoneWithoutNode { .. })));

        let mut scene = scene_with_bones(1);
        scene.add_node(Some(Scene::ROOT), SceneNode::new("b0"));
        let result = build_model(&scene, &Config::default());
        assert!(matches!(result, Err(ExportError::DuplicateBoneNode { .. })));
    }

    #[test]
    fn test_many_bones_still_builds() {
        let model = build_model(&scene_with_bones(MAX_SHADER_BONES + 1), &Config::default()).unwrap();
        assert_eq!(model.bone_count() as usize, MAX_SHADER_BONES + 1);
        // Only the first four influences of vertex 0 survive
        assert_eq!(model.meshes[0].vertices[0].bone_indices, [0, 1, 2, 3]);
    }
}
