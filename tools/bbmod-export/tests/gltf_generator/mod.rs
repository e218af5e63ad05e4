//! Programmatic glTF test assets.
//!
//! Builds small GLB files in memory so the importer is exercised without
//! binary fixtures in the repository.
//!
//! # Skinned asset
//! ```text
//! Root (bone 0)          rotates 0 -> 90 deg about +Z over 1 s
//! └── Arm (bone 1)       at (0, 1, 0), moves to (0, 2, 0) over 1 s
//! Body                   mesh "Body", skin [Root, Arm]
//! ```
//! Both triangles of the mesh are fully weighted: the lower one to Root, the
//! upper one to Arm.

#![allow(dead_code)]

mod buffer;
mod glb_assembly;

use std::collections::BTreeMap;

use buffer::BufferBuilder;
use glb_assembly::assemble_glb;
use gltf_json as json;
use json::validation::Checked::Valid;

pub const BONE_COUNT: usize = 2;
pub const SKINNED_VERTEX_COUNT: usize = 6;
pub const ARM_REST_Y: f32 = 1.0;
pub const CLIP_NAME: &str = "Armature|Wave";
pub const MATERIAL_NAME: &str = "Skin";

fn node(name: Option<&str>, translation: Option<[f32; 3]>) -> json::Node {
    json::Node {
        camera: None,
        children: None,
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name: name.map(str::to_string),
        rotation: None,
        scale: None,
        translation,
        skin: None,
        weights: None,
    }
}

fn primitive(
    attributes: BTreeMap<json::validation::Checked<json::mesh::Semantic>, json::Index<json::Accessor>>,
    indices: json::Index<json::Accessor>,
    material: Option<u32>,
) -> json::mesh::Primitive {
    json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(indices),
        material: material.map(json::Index::new),
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    }
}

fn sampler(
    input: json::Index<json::Accessor>,
    output: json::Index<json::Accessor>,
) -> json::animation::Sampler {
    json::animation::Sampler {
        input,
        interpolation: Valid(json::animation::Interpolation::Linear),
        output,
        extensions: Default::default(),
        extras: Default::default(),
    }
}

fn channel(sampler: u32, node: u32, path: json::animation::Property) -> json::animation::Channel {
    json::animation::Channel {
        sampler: json::Index::new(sampler),
        target: json::animation::Target {
            node: json::Index::new(node),
            path: Valid(path),
            extensions: Default::default(),
            extras: Default::default(),
        },
        extensions: Default::default(),
        extras: Default::default(),
    }
}

fn root(
    buffer: &BufferBuilder,
    nodes: Vec<json::Node>,
    scene_nodes: Vec<u32>,
    meshes: Vec<json::Mesh>,
    materials: Vec<json::Material>,
    skins: Vec<json::Skin>,
    animations: Vec<json::Animation>,
) -> json::Root {
    json::Root {
        accessors: buffer.accessors.clone(),
        animations,
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some("bbmod-export-test".to_string()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers: vec![json::Buffer {
            byte_length: 0u64.into(),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: None,
        }],
        buffer_views: buffer.views.clone(),
        cameras: Vec::new(),
        extensions: Default::default(),
        extras: Default::default(),
        extensions_required: Vec::new(),
        extensions_used: Vec::new(),
        images: Vec::new(),
        materials,
        meshes,
        nodes,
        samplers: Vec::new(),
        scene: Some(json::Index::new(0)),
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some("TestScene".to_string()),
            nodes: scene_nodes.into_iter().map(json::Index::new).collect(),
        }],
        skins,
        textures: Vec::new(),
    }
}

/// Two-bone skinned asset with one animation clip.
pub fn generate_skinned_glb() -> Vec<u8> {
    const ROOT_NODE: u32 = 0;
    const ARM_NODE: u32 = 1;
    const BODY_NODE: u32 = 2;

    let mut buffer = BufferBuilder::default();

    let positions = [
        [-0.5, 0.0, 0.0],
        [0.5, 0.0, 0.0],
        [0.0, 0.5, 0.0],
        [-0.5, 1.0, 0.0],
        [0.5, 1.0, 0.0],
        [0.0, 1.5, 0.0],
    ];
    let normals = [[0.0, 0.0, 1.0]; SKINNED_VERTEX_COUNT];
    let uvs = [
        [0.0, 1.0],
        [1.0, 1.0],
        [0.5, 0.5],
        [0.0, 0.5],
        [1.0, 0.5],
        [0.5, 0.0],
    ];
    let joints = [[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]];
    let weights = [[1.0, 0.0, 0.0, 0.0]; SKINNED_VERTEX_COUNT];

    let mut attributes = BTreeMap::new();
    attributes.insert(Valid(json::mesh::Semantic::Positions), buffer.positions(&positions));
    attributes.insert(Valid(json::mesh::Semantic::Normals), buffer.vec3(&normals));
    attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), buffer.vec2(&uvs));
    attributes.insert(Valid(json::mesh::Semantic::Joints(0)), buffer.joints(&joints));
    attributes.insert(
        Valid(json::mesh::Semantic::Weights(0)),
        buffer.vec4(&weights, Some(json::buffer::Target::ArrayBuffer)),
    );
    let indices = buffer.indices(&[0, 1, 2, 3, 4, 5]);

    // Root sits at the origin; Arm's bind pose is one unit up
    let mut arm_inverse_bind = glam::Mat4::IDENTITY.to_cols_array();
    arm_inverse_bind[13] = -ARM_REST_Y;
    let inverse_binds = buffer.matrices(&[glam::Mat4::IDENTITY.to_cols_array(), arm_inverse_bind]);

    let times = buffer.times(&[0.0, 1.0]);
    let half_turn = std::f32::consts::FRAC_PI_4;
    let root_rotations = buffer.vec4(
        &[[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, half_turn.sin(), half_turn.cos()]],
        None,
    );
    let arm_translations = buffer.animation_vec3(&[[0.0, ARM_REST_Y, 0.0], [0.0, 2.0, 0.0]]);
    let arm_scales = buffer.animation_vec3(&[[1.0; 3], [2.0; 3]]);

    let mut root_node = node(Some("Root"), Some([0.0, 0.0, 0.0]));
    root_node.children = Some(vec![json::Index::new(ARM_NODE)]);
    let arm_node = node(Some("Arm"), Some([0.0, ARM_REST_Y, 0.0]));
    let mut body_node = node(Some("Body"), None);
    body_node.mesh = Some(json::Index::new(0));
    body_node.skin = Some(json::Index::new(0));

    let meshes = vec![json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some("Body".to_string()),
        primitives: vec![primitive(attributes, indices, Some(0))],
        weights: None,
    }];

    let materials = vec![json::Material {
        name: Some(MATERIAL_NAME.to_string()),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor([0.8, 0.6, 0.5, 1.0]),
            ..Default::default()
        },
        ..Default::default()
    }];

    let skins = vec![json::Skin {
        extensions: Default::default(),
        extras: Default::default(),
        inverse_bind_matrices: Some(inverse_binds),
        joints: vec![json::Index::new(ROOT_NODE), json::Index::new(ARM_NODE)],
        name: Some("Armature".to_string()),
        skeleton: Some(json::Index::new(ROOT_NODE)),
    }];

    let animations = vec![json::Animation {
        channels: vec![
            channel(0, ROOT_NODE, json::animation::Property::Rotation),
            channel(1, ARM_NODE, json::animation::Property::Translation),
            channel(2, ARM_NODE, json::animation::Property::Scale),
        ],
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(CLIP_NAME.to_string()),
        samplers: vec![
            sampler(times, root_rotations),
            sampler(times, arm_translations),
            sampler(times, arm_scales),
        ],
    }];

    let root = root(
        &buffer,
        vec![root_node, arm_node, body_node],
        vec![ROOT_NODE, BODY_NODE],
        meshes,
        materials,
        skins,
        animations,
    );
    assemble_glb(&root, &buffer.data)
}

/// Unnamed node with a quad that has no normals and no material.
pub fn generate_static_glb() -> Vec<u8> {
    let mut buffer = BufferBuilder::default();

    let positions = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
    ];
    let mut attributes = BTreeMap::new();
    attributes.insert(Valid(json::mesh::Semantic::Positions), buffer.positions(&positions));
    let indices = buffer.indices(&[0, 1, 2, 2, 1, 3]);

    let mut quad = node(None, Some([0.0, 0.0, 3.0]));
    quad.mesh = Some(json::Index::new(0));

    let meshes = vec![json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        primitives: vec![primitive(attributes, indices, None)],
        weights: None,
    }];

    let root = root(&buffer, vec![quad], vec![0], meshes, Vec::new(), Vec::new(), Vec::new());
    assemble_glb(&root, &buffer.data)
}

/// Write `glb` to `<dir>/<name>` and return the path.
pub fn write_glb(dir: &std::path::Path, name: &str, glb: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, glb).expect("Failed to write GLB");
    path
}
