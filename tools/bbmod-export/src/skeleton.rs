//! Bone collection and node hierarchy construction
//!
//! Bones are indexed first, in the order they are first seen across the
//! scene's meshes. Nodes are then numbered in a preorder walk: a node named
//! after a bone takes that bone's index, every other node takes the next
//! free index after the bones. Both index spaces end up dense.

use bbmod_common::{Bone, DualQuat, Node, NodeId, NodeTree};
use hashbrown::HashMap;

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::scene::Scene;

/// Bones collected from every mesh of a scene.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    by_name: HashMap<String, u32>,
}

impl Skeleton {
    /// Collect bones from all meshes, unless bones are disabled.
    pub fn collect(scene: &Scene, config: &Config) -> Self {
        let mut skeleton = Self::default();
        if config.disable_bones {
            return skeleton;
        }
        for mesh in &scene.meshes {
            for bone in &mesh.bones {
                if skeleton.by_name.contains_key(&bone.name) {
                    continue;
                }
                let index = skeleton.bones.len() as u32;
                skeleton.by_name.insert(bone.name.clone(), index);
                skeleton
                    .bones
                    .push(Bone::new(&bone.name, index, DualQuat::from_mat4(&bone.offset)));
            }
        }
        skeleton
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn into_bones(self) -> Vec<Bone> {
        self.bones
    }
}

/// Number every scene node and build the model's node tree.
///
/// Scale is dropped from node transforms. Every bone must be named by
/// exactly one node, otherwise the bone and node index spaces would have
/// holes.
pub fn build_node_tree(scene: &Scene, skeleton: &Skeleton) -> Result<NodeTree> {
    let mut tree = NodeTree::default();
    let mut claimed = vec![false; skeleton.len()];
    let mut next_index = skeleton.len() as u32;
    // (scene node, parent in the model tree)
    let mut stack: Vec<(usize, Option<NodeId>)> = Vec::new();
    if !scene.nodes.is_empty() {
        stack.push((Scene::ROOT, None));
    }

    while let Some((scene_index, parent)) = stack.pop() {
        let Some(source) = scene.nodes.get(scene_index) else {
            continue;
        };

        let mut node = match skeleton.index_of(&source.name) {
            Some(bone_index) => {
                let slot = &mut claimed[bone_index as usize];
                if *slot {
                    return Err(ExportError::DuplicateBoneNode {
                        bone: source.name.clone(),
                    });
                }
                *slot = true;
                let mut node = Node::new(&source.name, bone_index);
                node.is_bone = true;
                node
            }
            None => {
                let node = Node::new(&source.name, next_index);
                next_index += 1;
                node
            }
        };
        node.transform = DualQuat::from_mat4(&source.transform);
        node.meshes = source.meshes.iter().map(|&m| m as u32).collect();

        let id = match parent {
            Some(parent) => tree.add_child(parent, node),
            None => {
                tree = NodeTree::with_root(node);
                Some(NodeId::ROOT)
            }
        };
        let Some(id) = id else {
            continue;
        };

        for &child in source.children.iter().rev() {
            stack.push((child, Some(id)));
        }
    }

    if let Some(missing) = claimed.iter().position(|&done| !done) {
        return Err(ExportError::BoneWithoutNode {
            bone: skeleton.bones[missing].name.clone(),
        });
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneBone, SceneMesh, SceneNode, VertexWeight};
    use glam::{Mat4, Quat, Vec3};

    fn bone(name: &str) -> SceneBone {
        SceneBone {
            name: name.to_string(),
            offset: Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
            weights: vec![VertexWeight {
                vertex: 0,
                weight: 1.0,
            }],
        }
    }

    /// RootNode -> [Armature -> [Hip -> [Knee]], Mesh]
    fn rigged_scene() -> Scene {
        let mut scene = Scene {
            meshes: vec![
                SceneMesh {
                    name: "Body".to_string(),
                    bones: vec![bone("Hip"), bone("Knee")],
                    ..SceneMesh::default()
                },
                SceneMesh {
                    name: "Pants".to_string(),
                    bones: vec![bone("Knee"), bone("Hip")],
                    ..SceneMesh::default()
                },
            ],
            ..Scene::default()
        };
        let root = scene.add_node(None, SceneNode::new("RootNode"));
        let armature = scene.add_node(Some(root), SceneNode::new("Armature"));
        let hip = scene.add_node(Some(armature), SceneNode::new("Hip"));
        let mut knee = SceneNode::new("Knee");
        knee.transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_z(0.5),
            Vec3::new(0.0, -1.0, 0.0),
        );
        scene.add_node(Some(hip), knee);
        let mut mesh_node = SceneNode::new("Mesh");
        mesh_node.meshes = vec![0, 1];
        scene.add_node(Some(root), mesh_node);
        scene
    }

    #[test]
    fn test_bones_in_first_seen_order() {
        let skeleton = Skeleton::collect(&rigged_scene(), &Config::default());
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.index_of("Hip"), Some(0));
        assert_eq!(skeleton.index_of("Knee"), Some(1));
        let offset = skeleton.bones()[0].offset.translation();
        assert!((offset - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_disabled_bones() {
        let config = Config {
            disable_bones: true,
            ..Config::default()
        };
        assert!(Skeleton::collect(&rigged_scene(), &config).is_empty());
    }

    #[test]
    fn test_node_indices_dense_and_aliased() {
        let scene = rigged_scene();
        let skeleton = Skeleton::collect(&scene, &Config::default());
        let tree = build_node_tree(&scene, &skeleton).unwrap();

        let mut indices: Vec<u32> = tree.iter().map(|(_, n)| n.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        // Plain nodes continue after the bones, in preorder
        let names: Vec<(&str, u32, bool)> = tree
            .preorder()
            .map(|(_, n)| (n.name.as_str(), n.index, n.is_bone))
            .collect();
        assert_eq!(
            names,
            vec![
                ("RootNode", 2, false),
                ("Armature", 3, false),
                ("Hip", 0, true),
                ("Knee", 1, true),
                ("Mesh", 4, false),
            ]
        );
    }

    #[test]
    fn test_node_transform_drops_scale() {
        let scene = rigged_scene();
        let skeleton = Skeleton::collect(&scene, &Config::default());
        let tree = build_node_tree(&scene, &skeleton).unwrap();
        let (_, knee) = tree.find_by_name("Knee").unwrap();
        assert!((knee.transform.real.length() - 1.0).abs() < 1e-6);
        assert!((knee.transform.translation() - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-5);
        let (_, mesh) = tree.find_by_name("Mesh").unwrap();
        assert_eq!(mesh.meshes, vec![0, 1]);
    }

    #[test]
    fn test_no_bones_starts_at_zero() {
        let scene = rigged_scene();
        let config = Config {
            disable_bones: true,
            ..Config::default()
        };
        let skeleton = Skeleton::collect(&scene, &config);
        let tree = build_node_tree(&scene, &skeleton).unwrap();
        assert_eq!(tree.root().unwrap().index, 0);
        assert!(tree.iter().all(|(_, n)| !n.is_bone));
    }

    #[test]
    fn test_bone_without_node_is_fatal() {
        let mut scene = rigged_scene();
        scene.meshes[0].bones.push(bone("Ghost"));
        let skeleton = Skeleton::collect(&scene, &Config::default());
        let result = build_node_tree(&scene, &skeleton);
        assert!(matches!(
            result,
            Err(ExportError::BoneWithoutNode { ref bone }) if bone == "Ghost"
        ));
    }

    #[test]
    fn test_two_nodes_for_one_bone_is_fatal() {
        let mut scene = rigged_scene();
        let armature = scene.find_node_by_name("Armature").unwrap();
        scene.add_node(Some(armature), SceneNode::new("Knee"));
        let skeleton = Skeleton::collect(&scene, &Config::default());
        let result = build_node_tree(&scene, &skeleton);
        assert!(matches!(
            result,
            Err(ExportError::DuplicateBoneNode { ref bone }) if bone == "Knee"
        ));
    }
}
