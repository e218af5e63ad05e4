//! Tests for the model format

use super::*;
use crate::formats::binary::WriteBinaryExt;
use crate::formats::{BoundingBox, PrimitiveType, Vertex};
use crate::math::{DualQuat, Quat, Vec3};

/// Root with one bone child "Bone" (index 0) carrying a skinned triangle.
fn sample_model() -> Model {
    let format = VertexFormat {
        normal: true,
        bones: true,
        ..VertexFormat::POSITION_ONLY
    };
    let vertex = |p: Vec3| Vertex {
        position: p,
        normal: Vec3::Y,
        bone_indices: [0, 0, 0, 0],
        bone_weights: [1.0, 0.0, 0.0, 0.0],
        ..Vertex::default()
    };
    let vertices = vec![vertex(Vec3::ZERO), vertex(Vec3::X), vertex(Vec3::Z)];
    let mesh = Mesh {
        material_index: 0,
        primitive_type: PrimitiveType::TriangleList,
        bounding_box: BoundingBox::from_points(vertices.iter().map(|v| v.position)),
        vertex_format: format,
        vertices,
    };

    let mut root = Node::new("RootNode", 1);
    root.meshes.push(0);
    let mut nodes = NodeTree::with_root(root);
    let mut bone_node = Node::new("Bone", 0);
    bone_node.is_bone = true;
    bone_node.transform =
        DualQuat::from_translation_rotation(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_x(0.5));
    nodes.add_child(NodeId::ROOT, bone_node).unwrap();

    Model {
        version: Version::CURRENT,
        vertex_format: None,
        meshes: vec![mesh],
        nodes,
        skeleton: vec![Bone::new(
            "Bone",
            0,
            DualQuat::from_translation_rotation(Vec3::new(0.0, -1.0, 0.0), Quat::IDENTITY),
        )],
        material_names: vec!["Material".to_string()],
    }
}

// ========================================================================
// Round Trip Tests
// ========================================================================

#[test]
fn test_model_roundtrip() {
    let model = sample_model();
    let bytes = model.to_bytes().unwrap();
    assert_eq!(&bytes[0..6], BBMOD_MAGIC);
    assert_eq!(bytes[6], 3);
    assert_eq!(bytes[7], 3);

    let parsed = Model::from_bytes(&bytes).unwrap();
    assert_eq!(parsed, model);
    assert_eq!(parsed.find_bone_by_name("Bone").unwrap().index, 0);
}

#[test]
fn test_model_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bbmod");
    let model = sample_model();
    model.save(&path).unwrap();
    let parsed = Model::load(&path).unwrap();
    assert_eq!(parsed.node_count(), 2);
    assert_eq!(parsed.bone_count(), 1);
    assert_eq!(parsed.material_names, vec!["Material".to_string()]);
}

#[test]
fn test_bone_names_recovered_from_nodes() {
    let mut model = sample_model();
    model.skeleton[0].name.clear();
    let parsed = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(parsed.skeleton[0].name, "Bone");
}

#[test]
fn test_deep_hierarchy_roundtrip() {
    let mut nodes = NodeTree::with_root(Node::new("n0", 0));
    let mut parent = NodeId::ROOT;
    for i in 1..5000u32 {
        parent = nodes.add_child(parent, Node::new(format!("n{i}"), i)).unwrap();
    }
    let model = Model {
        nodes,
        ..Model::default()
    };
    let parsed = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(parsed.node_count(), 5000);
    let depths: Vec<usize> = parsed.nodes.preorder().with_depth().map(|(_, _, d)| d).collect();
    assert_eq!(depths[4999], 4999);
}

#[test]
fn test_empty_model_writes_root() {
    let parsed = Model::from_bytes(&Model::default().to_bytes().unwrap()).unwrap();
    assert_eq!(parsed.node_count(), 1);
    assert!(parsed.meshes.is_empty());
}

// ========================================================================
// Hierarchy Tests
// ========================================================================

#[test]
fn test_preorder_order() {
    let mut nodes = NodeTree::with_root(Node::new("root", 0));
    let a = nodes.add_child(NodeId::ROOT, Node::new("a", 1)).unwrap();
    nodes.add_child(NodeId::ROOT, Node::new("b", 3)).unwrap();
    nodes.add_child(a, Node::new("a1", 2)).unwrap();

    let names: Vec<&str> = nodes.preorder().map(|(_, n)| n.name.as_str()).collect();
    assert_eq!(names, vec!["root", "a", "a1", "b"]);

    let parents = nodes.parents();
    assert_eq!(parents[0], None);
    assert_eq!(parents[3], Some(a));
    assert!(nodes.find_by_name("b").is_some());
    assert!(nodes.find_by_name("missing").is_none());
}

// ========================================================================
// Decode Error Tests
// ========================================================================

#[test]
fn test_invalid_magic() {
    let result = Model::from_bytes(b"GLTF\0\0\x03\x03");
    assert!(matches!(result, Err(FormatError::InvalidMagic(_))));
}

#[test]
fn test_version_mismatch_is_reported() {
    let mut bytes = sample_model().to_bytes().unwrap();
    bytes[7] = 9;
    let result = Model::from_bytes(&bytes);
    assert!(matches!(
        result,
        Err(FormatError::VersionMismatch { major: 3, minor: 9 })
    ));

    bytes[6] = 2;
    bytes[7] = 0;
    assert!(matches!(
        Model::from_bytes(&bytes),
        Err(FormatError::VersionMismatch { major: 2, .. })
    ));
}

#[test]
fn test_truncated_model() {
    let bytes = sample_model().to_bytes().unwrap();
    for len in [3, 7, 20, bytes.len() - 1] {
        let result = Model::from_bytes(&bytes[..len]);
        assert!(
            matches!(result, Err(FormatError::Truncated)),
            "len {len}: {result:?}"
        );
    }
}

#[test]
fn test_out_of_range_mesh_index() {
    let mut model = sample_model();
    model.nodes.get_mut(NodeId::ROOT).unwrap().meshes.push(7);
    let result = Model::from_bytes(&model.to_bytes().unwrap());
    assert!(matches!(
        result,
        Err(FormatError::IndexOutOfRange { what: "mesh", index: 7, .. })
    ));
}

#[test]
fn test_out_of_range_vertex_bone() {
    let mut model = sample_model();
    model.meshes[0].vertices[1].bone_indices[0] = 4;
    let result = Model::from_bytes(&model.to_bytes().unwrap());
    assert!(matches!(
        result,
        Err(FormatError::IndexOutOfRange { what: "bone", index: 4, .. })
    ));
}

#[test]
fn test_duplicate_node_index() {
    let mut model = sample_model();
    // Root takes the bone node's index, leaving index 1 unused
    model.nodes.get_mut(NodeId::ROOT).unwrap().index = 0;
    let result = Model::from_bytes(&model.to_bytes().unwrap());
    assert!(matches!(
        result,
        Err(FormatError::DuplicateIndex { what: "node", index: 0 })
    ));
}

#[test]
fn test_duplicate_bone_index() {
    let mut model = sample_model();
    let mut twin = model.skeleton[0].clone();
    twin.name = "Twin".to_string();
    model.skeleton.push(twin);
    assert!(matches!(
        model.validate(),
        Err(FormatError::DuplicateIndex { what: "bone", index: 0 })
    ));
}

// ========================================================================
// Legacy Revision Tests
// ========================================================================

#[test]
fn test_legacy_magic_minor_zero() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(BBMOD_LEGACY_MAGIC);
    bytes.push(3);
    // Model-wide vertex format, minor 0 layout (no uv1 flag)
    bytes.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0]);
    // One mesh: material, vertex count, no bounding box
    bytes.write_u32_le(1).unwrap();
    bytes.write_u32_le(0).unwrap();
    bytes.write_u32_le(3).unwrap();
    for p in [Vec3::ZERO, Vec3::X, Vec3::Y] {
        bytes.write_vec3(p).unwrap();
    }
    // Node tree: just the root
    bytes.write_u32_le(1).unwrap();
    bytes.write_cstring("Root").unwrap();
    bytes.write_f32_le(0.0).unwrap();
    bytes.write_bool(false).unwrap();
    bytes.write_dual_quat(&DualQuat::IDENTITY).unwrap();
    bytes.write_u32_le(1).unwrap();
    bytes.write_u32_le(0).unwrap();
    bytes.write_u32_le(0).unwrap();
    // No bones, one material
    bytes.write_u32_le(0).unwrap();
    bytes.write_u32_le(1).unwrap();
    bytes.write_cstring("Mat").unwrap();

    let model = Model::from_bytes(&bytes).unwrap();
    assert_eq!(model.version, Version::new(3, 0));
    assert_eq!(model.vertex_format, Some(VertexFormat::POSITION_ONLY));
    assert_eq!(model.meshes[0].vertex_format, VertexFormat::POSITION_ONLY);
    assert_eq!(model.meshes[0].bounding_box, None);
    assert_eq!(model.root().unwrap().meshes, vec![0]);

    // Re-encoding upgrades to the current revision
    let upgraded = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(upgraded.version, Version::CURRENT);
    assert_eq!(upgraded.vertex_format, None);
    assert!(upgraded.meshes[0].bounding_box.is_some());
}
