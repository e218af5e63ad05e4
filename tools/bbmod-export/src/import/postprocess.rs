//! Scene post-processing driven by [`Config`]
//!
//! These steps run on the imported scene before any model is built:
//! handedness conversion, pre-transform, scaling, normal and tangent
//! generation, and the material/mesh/node optimizations.

use glam::{Mat3, Mat4, Quat, Vec3};
use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::config::{Config, NormalGeneration};
use crate::scene::{Scene, SceneMesh, SceneNode, VertexWeight};
use bbmod_common::PrimitiveType;

/// Run every enabled step in order.
pub fn apply(scene: &mut Scene, config: &Config) {
    if config.left_handed {
        make_left_handed(scene);
    }
    if config.pre_transform {
        pre_transform(scene);
    }
    if config.apply_scale && config.scale_factor != 1.0 {
        apply_scale(scene, config.scale_factor);
    }
    if !config.disable_normals && config.gen_normals != NormalGeneration::None {
        gen_normals(scene, config.gen_normals);
    }
    if !config.disable_tangents {
        gen_tangents(scene);
    }
    if config.optimize_materials {
        optimize_materials(scene);
    }
    if config.optimize_meshes {
        optimize_meshes(scene);
    }
    if config.optimize_nodes {
        optimize_nodes(scene);
    }
}

// ============================================================================
// Transforms
// ============================================================================

fn mirror_z(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

fn map_all(values: &mut Option<Vec<Vec3>>, f: impl Fn(Vec3) -> Vec3) {
    if let Some(values) = values {
        values.iter_mut().for_each(|v| *v = f(*v));
    }
}

/// Mirror the scene along Z and flip face winding.
pub fn make_left_handed(scene: &mut Scene) {
    let mirror = Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0));

    for mesh in &mut scene.meshes {
        mesh.positions.iter_mut().for_each(|p| *p = mirror_z(*p));
        map_all(&mut mesh.normals, mirror_z);
        map_all(&mut mesh.tangents, mirror_z);
        map_all(&mut mesh.bitangents, mirror_z);
        mesh.faces.iter_mut().for_each(|face| face.reverse());
        for bone in &mut mesh.bones {
            bone.offset = mirror * bone.offset * mirror;
        }
    }

    for node in &mut scene.nodes {
        node.transform = mirror * node.transform * mirror;
    }

    for animation in &mut scene.animations {
        for channel in &mut animation.channels {
            for key in &mut channel.positions {
                key.value = mirror_z(key.value);
            }
            for key in &mut channel.rotations {
                let q = key.value;
                key.value = Quat::from_xyzw(-q.x, -q.y, q.z, q.w);
            }
        }
    }
}

/// Scale positions and translations uniformly by `factor`.
pub fn apply_scale(scene: &mut Scene, factor: f32) {
    let scale = Mat4::from_scale(Vec3::splat(factor));
    let inverse = Mat4::from_scale(Vec3::splat(1.0 / factor));

    for mesh in &mut scene.meshes {
        mesh.positions.iter_mut().for_each(|p| *p *= factor);
        for bone in &mut mesh.bones {
            bone.offset = scale * bone.offset * inverse;
        }
    }
    for node in &mut scene.nodes {
        node.transform = scale * node.transform * inverse;
    }
    for animation in &mut scene.animations {
        for channel in &mut animation.channels {
            for key in &mut channel.positions {
                key.value *= factor;
            }
        }
    }
}

/// Bake world transforms into vertices and flatten the hierarchy.
///
/// Meshes attached to several nodes are duplicated. Bones and animations
/// cannot survive flattening and are dropped.
pub fn pre_transform(scene: &mut Scene) {
    let world = scene.world_transforms();
    let mut meshes = Vec::new();

    for index in scene.preorder() {
        let matrix = world[index];
        let linear = Mat3::from_mat4(matrix);
        let normal_matrix = linear.inverse().transpose();
        let mirrored = linear.determinant() < 0.0;

        for &mesh_index in &scene.nodes[index].meshes {
            let Some(source) = scene.meshes.get(mesh_index) else {
                continue;
            };
            let mut mesh = source.clone();
            mesh.positions
                .iter_mut()
                .for_each(|p| *p = matrix.transform_point3(*p));
            map_all(&mut mesh.normals, |n| (normal_matrix * n).normalize_or_zero());
            map_all(&mut mesh.tangents, |t| (linear * t).normalize_or_zero());
            map_all(&mut mesh.bitangents, |b| (linear * b).normalize_or_zero());
            if mirrored {
                mesh.faces.iter_mut().for_each(|face| face.reverse());
            }
            mesh.bones.clear();
            meshes.push(mesh);
        }
    }

    if !scene.animations.is_empty() {
        warn!(
            "Pre-transform drops {} animation(s)",
            scene.animations.len()
        );
        scene.animations.clear();
    }

    let name = scene
        .root()
        .map(|root| root.name.clone())
        .unwrap_or_else(|| "RootNode".to_string());
    let mut root = SceneNode::new(name);
    root.meshes = (0..meshes.len()).collect();
    scene.nodes = vec![root];
    scene.meshes = meshes;
}

// ============================================================================
// Normals and tangents
// ============================================================================

fn triangle(mesh: &SceneMesh, face: &[u32]) -> Option<[usize; 3]> {
    let &[a, b, c] = face else {
        return None;
    };
    let [a, b, c] = [a as usize, b as usize, c as usize];
    let count = mesh.positions.len();
    (a < count && b < count && c < count).then_some([a, b, c])
}

/// Unnormalized face normal; its length is twice the triangle area.
fn face_normal(mesh: &SceneMesh, [a, b, c]: [usize; 3]) -> Vec3 {
    let p = &mesh.positions;
    (p[b] - p[a]).cross(p[c] - p[a])
}

/// Generate normals for triangle meshes that have none.
pub fn gen_normals(scene: &mut Scene, mode: NormalGeneration) {
    for mesh in &mut scene.meshes {
        if mesh.normals.is_some() || mesh.primitive_type != PrimitiveType::TriangleList {
            continue;
        }
        match mode {
            NormalGeneration::None => return,
            NormalGeneration::Flat => gen_flat_normals(mesh),
            NormalGeneration::Smooth => gen_smooth_normals(mesh),
        }
        if mesh.normals.is_some() {
            debug!("Generated {:?} normals for \"{}\"", mode, mesh.name);
        }
    }
}

fn gen_smooth_normals(mesh: &mut SceneMesh) {
    // Weld by exact position so split seams still share a normal
    let key = |p: Vec3| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
    let mut accumulated: HashMap<[u32; 3], Vec3> = HashMap::new();
    for face in &mesh.faces {
        let Some(corners) = triangle(mesh, face) else {
            continue;
        };
        let normal = face_normal(mesh, corners);
        for corner in corners {
            *accumulated
                .entry(key(mesh.positions[corner]))
                .or_insert(Vec3::ZERO) += normal;
        }
    }
    let normals = mesh
        .positions
        .iter()
        .map(|&p| {
            accumulated
                .get(&key(p))
                .map_or(Vec3::ZERO, |n| n.normalize_or_zero())
        })
        .collect();
    mesh.normals = Some(normals);
}

fn gen_flat_normals(mesh: &mut SceneMesh) {
    // Unsharing rebuilds the face list, so every face must be a triangle
    if mesh.faces.iter().any(|face| triangle(mesh, face).is_none()) {
        warn!(
            "Mesh \"{}\" has faces that are not valid triangles, skipping flat normals",
            mesh.name
        );
        return;
    }

    // New vertex -> source vertex
    let mut sources: Vec<usize> = Vec::with_capacity(mesh.faces.len() * 3);
    let mut normals = Vec::with_capacity(mesh.faces.len() * 3);
    let mut faces = Vec::with_capacity(mesh.faces.len());

    for face in &mesh.faces {
        let Some(corners) = triangle(mesh, face) else {
            continue;
        };
        let normal = face_normal(mesh, corners).normalize_or_zero();
        let mut new_face = Vec::with_capacity(3);
        for corner in corners {
            new_face.push(sources.len() as u32);
            sources.push(corner);
            normals.push(normal);
        }
        faces.push(new_face);
    }

    fn unshare<T: Copy>(values: &[T], sources: &[usize]) -> Vec<T> {
        sources.iter().map(|&s| values[s]).collect()
    }
    let unshare_opt = |values: &Option<Vec<Vec3>>| values.as_ref().map(|v| unshare(v, &sources));

    mesh.tangents = unshare_opt(&mesh.tangents);
    mesh.bitangents = unshare_opt(&mesh.bitangents);
    mesh.uv0 = mesh.uv0.as_ref().map(|v| unshare(v, &sources));
    mesh.uv1 = mesh.uv1.as_ref().map(|v| unshare(v, &sources));
    mesh.colors = mesh.colors.as_ref().map(|v| unshare(v, &sources));
    mesh.positions = unshare(&mesh.positions, &sources);

    // Source vertex -> its copies
    let mut copies: HashMap<u32, Vec<u32>> = HashMap::new();
    for (new, &source) in sources.iter().enumerate() {
        copies.entry(source as u32).or_default().push(new as u32);
    }
    for bone in &mut mesh.bones {
        bone.weights = bone
            .weights
            .iter()
            .flat_map(|w| {
                copies
                    .get(&w.vertex)
                    .into_iter()
                    .flatten()
                    .map(move |&vertex| VertexWeight {
                        vertex,
                        weight: w.weight,
                    })
            })
            .collect();
    }

    mesh.normals = Some(normals);
    mesh.faces = faces;
}

/// Generate tangents and bitangents for triangle meshes with normals and UVs.
pub fn gen_tangents(scene: &mut Scene) {
    for mesh in &mut scene.meshes {
        if mesh.has_tangents() || mesh.primitive_type != PrimitiveType::TriangleList {
            continue;
        }
        let (Some(normals), Some(uvs)) = (&mesh.normals, &mesh.uv0) else {
            continue;
        };

        let count = mesh.positions.len();
        let mut tangents = vec![Vec3::ZERO; count];
        let mut bitangents = vec![Vec3::ZERO; count];

        for face in &mesh.faces {
            let Some([a, b, c]) = triangle(mesh, face) else {
                continue;
            };
            let (Some(&uv_a), Some(&uv_b), Some(&uv_c)) = (uvs.get(a), uvs.get(b), uvs.get(c))
            else {
                continue;
            };
            let e1 = mesh.positions[b] - mesh.positions[a];
            let e2 = mesh.positions[c] - mesh.positions[a];
            let d1 = uv_b - uv_a;
            let d2 = uv_c - uv_a;
            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (e1 * d2.y - e2 * d1.y) * r;
            let bitangent = (e2 * d1.x - e1 * d2.x) * r;
            for corner in [a, b, c] {
                tangents[corner] += tangent;
                bitangents[corner] += bitangent;
            }
        }

        for (i, (tangent, bitangent)) in tangents.iter_mut().zip(&mut bitangents).enumerate() {
            let normal = normals.get(i).copied().unwrap_or(Vec3::ZERO);
            // Gram-Schmidt against the normal
            let mut t = (*tangent - normal * normal.dot(*tangent)).normalize_or_zero();
            if t == Vec3::ZERO {
                t = normal.any_orthogonal_vector().normalize_or_zero();
            }
            let mut b = bitangent.normalize_or_zero();
            if b == Vec3::ZERO {
                b = normal.cross(t);
            }
            *tangent = t;
            *bitangent = b;
        }

        mesh.tangents = Some(tangents);
        mesh.bitangents = Some(bitangents);
        debug!("Generated tangents for \"{}\"", mesh.name);
    }
}

// ============================================================================
// Optimizations
// ============================================================================

/// Drop unused materials, merge materials sharing a name and remap meshes.
pub fn optimize_materials(scene: &mut Scene) {
    let mut used = vec![false; scene.materials.len()];
    for mesh in &scene.meshes {
        if let Some(flag) = used.get_mut(mesh.material_index as usize) {
            *flag = true;
        }
    }

    let mut materials = Vec::new();
    let mut by_name: HashMap<String, u32> = HashMap::new();
    let mut remap = vec![0u32; scene.materials.len()];
    for (i, material) in scene.materials.iter().enumerate() {
        if !used[i] {
            continue;
        }
        remap[i] = *by_name.entry(material.name.clone()).or_insert_with(|| {
            materials.push(material.clone());
            (materials.len() - 1) as u32
        });
    }

    for mesh in &mut scene.meshes {
        mesh.material_index = remap.get(mesh.material_index as usize).copied().unwrap_or(0);
    }
    if materials.len() != scene.materials.len() {
        debug!(
            "Materials: {} -> {}",
            scene.materials.len(),
            materials.len()
        );
    }
    scene.materials = materials;
}

/// Meshes may only merge if they agree on everything but their data.
#[derive(PartialEq)]
struct MergeKey {
    material_index: u32,
    primitive_type: PrimitiveType,
    attributes: [bool; 6],
}

impl MergeKey {
    fn of(mesh: &SceneMesh) -> Self {
        Self {
            material_index: mesh.material_index,
            primitive_type: mesh.primitive_type,
            attributes: [
                mesh.normals.is_some(),
                mesh.uv0.is_some(),
                mesh.uv1.is_some(),
                mesh.colors.is_some(),
                mesh.has_tangents(),
                mesh.has_bones(),
            ],
        }
    }
}

fn extend_attribute<T>(target: &mut Option<Vec<T>>, source: Option<Vec<T>>) {
    if let (Some(target), Some(source)) = (target, source) {
        target.extend(source);
    }
}

fn append_mesh(target: &mut SceneMesh, source: SceneMesh) {
    let offset = target.positions.len() as u32;
    target.positions.extend(source.positions);
    extend_attribute(&mut target.normals, source.normals);
    extend_attribute(&mut target.uv0, source.uv0);
    extend_attribute(&mut target.uv1, source.uv1);
    extend_attribute(&mut target.colors, source.colors);
    extend_attribute(&mut target.tangents, source.tangents);
    extend_attribute(&mut target.bitangents, source.bitangents);
    target.faces.extend(
        source
            .faces
            .into_iter()
            .map(|face| face.into_iter().map(|i| i + offset).collect()),
    );

    for mut bone in source.bones {
        for weight in &mut bone.weights {
            weight.vertex += offset;
        }
        match target.bones.iter_mut().find(|b| b.name == bone.name) {
            Some(existing) => existing.weights.extend(bone.weights),
            None => target.bones.push(bone),
        }
    }
}

/// Merge compatible meshes attached to the same node.
///
/// Meshes referenced by more than one node are never merged.
pub fn optimize_meshes(scene: &mut Scene) {
    let mut references = vec![0usize; scene.meshes.len()];
    for node in &scene.nodes {
        for &mesh in &node.meshes {
            if let Some(count) = references.get_mut(mesh) {
                *count += 1;
            }
        }
    }

    let before = scene.meshes.len();
    let mut pending: Vec<Option<SceneMesh>> =
        std::mem::take(&mut scene.meshes).into_iter().map(Some).collect();
    let mut meshes: Vec<SceneMesh> = Vec::with_capacity(before);
    let mut remap: Vec<Option<usize>> = vec![None; before];

    for node in &mut scene.nodes {
        let mut groups: Vec<(MergeKey, usize)> = Vec::new();
        let mut attached = Vec::with_capacity(node.meshes.len());

        for &index in &node.meshes {
            if let Some(placed) = remap.get(index).copied().flatten() {
                if !attached.contains(&placed) {
                    attached.push(placed);
                }
                continue;
            }
            let Some(mesh) = pending.get_mut(index).and_then(Option::take) else {
                continue;
            };
            let key = MergeKey::of(&mesh);
            let mergeable = references[index] == 1;

            if mergeable {
                if let Some(&(_, target)) = groups.iter().find(|(k, _)| *k == key) {
                    append_mesh(&mut meshes[target], mesh);
                    remap[index] = Some(target);
                    continue;
                }
            }

            let target = meshes.len();
            meshes.push(mesh);
            remap[index] = Some(target);
            attached.push(target);
            if mergeable {
                groups.push((key, target));
            }
        }
        node.meshes = attached;
    }

    // Meshes no node refers to are kept as they are
    meshes.extend(pending.into_iter().flatten());

    if meshes.len() != before {
        debug!("Meshes: {} -> {}", before, meshes.len());
    }
    scene.meshes = meshes;
}

/// Remove leaf nodes without meshes that are neither bones nor animated.
pub fn optimize_nodes(scene: &mut Scene) {
    let keep = nodes_to_keep(scene);
    let before = scene.nodes.len();
    retain_nodes(scene, &keep);
    if scene.nodes.len() != before {
        debug!("Nodes: {} -> {}", before, scene.nodes.len());
    }
}

fn nodes_to_keep(scene: &Scene) -> Vec<bool> {
    let mut protected: HashSet<&str> = HashSet::new();
    for mesh in &scene.meshes {
        protected.extend(mesh.bones.iter().map(|bone| bone.name.as_str()));
    }
    for animation in &scene.animations {
        protected.extend(animation.channels.iter().map(|c| c.node_name.as_str()));
    }

    let mut keep = vec![false; scene.nodes.len()];
    for index in scene.preorder().into_iter().rev() {
        let node = &scene.nodes[index];
        let has_kept_child = node
            .children
            .iter()
            .any(|&child| keep.get(child).copied().unwrap_or(false));
        keep[index] = index == Scene::ROOT
            || has_kept_child
            || !node.meshes.is_empty()
            || protected.contains(node.name.as_str());
    }
    keep
}

/// Keep nodes flagged in `keep`, compacting indices and child lists.
fn retain_nodes(scene: &mut Scene, keep: &[bool]) {
    let mut remap = vec![None; scene.nodes.len()];
    let mut next = 0;
    for (index, slot) in remap.iter_mut().enumerate() {
        if keep.get(index).copied().unwrap_or(false) {
            *slot = Some(next);
            next += 1;
        }
    }

    let nodes = std::mem::take(&mut scene.nodes);
    scene.nodes = nodes
        .into_iter()
        .enumerate()
        .filter(|(index, _)| remap[*index].is_some())
        .map(|(_, mut node)| {
            node.children = node
                .children
                .iter()
                .filter_map(|&child| remap.get(child).copied().flatten())
                .collect();
            node
        })
        .collect();
}
