use std::sync::Arc;

use cgmath::{InnerSpace, Quaternion, Vector3};

use crate::data_structures::{
    instance::Transform,
    model::{self, Color, Geometry, StandardMaterial, TextureImage},
    scene_graph::{Mesh, Node},
};

/// Builds the node hierarchy of one glTF scene. Buffers and images must be
/// loaded already, indexed like the document's.
pub fn scene_to_node(
    scene: gltf::Scene,
    buffers: &[Vec<u8>],
    images: &[Arc<TextureImage>],
) -> Node {
    let mut root = Node::group(scene.name().unwrap_or("gltf_scene"));
    for node in scene.nodes() {
        root.add_child(to_node(node, buffers, images));
    }
    root
}

fn to_node(node: gltf::Node, buffers: &[Vec<u8>], images: &[Arc<TextureImage>]) -> Node {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        position: translation.into(),
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut meshes: Vec<Node> = match node.mesh() {
        Some(mesh) => mesh
            .primitives()
            .enumerate()
            .filter_map(|(idx, primitive)| {
                let label = format!("{}_{}", mesh.name().unwrap_or("mesh"), idx);
                let loaded = load_primitive(&primitive, &label, buffers, images);
                if loaded.is_none() {
                    log::warn!("Skipping primitive {} of node {}", idx, name);
                }
                loaded.map(|mesh| Node::mesh(label, mesh))
            })
            .collect(),
        None => Vec::new(),
    };

    // A single primitive becomes the node itself, several become children
    let mut out = if meshes.len() == 1 {
        let single = meshes.remove(0);
        Node {
            name,
            transform,
            kind: single.kind,
            children: Vec::new(),
        }
    } else {
        let mut group = Node::group(name).with_transform(transform);
        group.children = meshes;
        group
    };
    for child in node.children() {
        out.add_child(to_node(child, buffers, images));
    }
    out
}

fn load_primitive(
    primitive: &gltf::Primitive,
    label: &str,
    buffers: &[Vec<u8>],
    images: &[Arc<TextureImage>],
) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("{}: only triangle lists are supported, got {:?}", label, primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<model::ModelVertex> = reader
        .read_positions()?
        .map(|position| model::ModelVertex {
            position,
            ..Default::default()
        })
        .collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if indices.iter().any(|&i| i as usize >= vertices.len()) {
        log::warn!("{}: index out of range", label);
        return None;
    }

    match reader.read_normals() {
        Some(normals) => {
            for (vertex, normal) in vertices.iter_mut().zip(normals) {
                vertex.normal = normal;
            }
        }
        None => compute_normals(&mut vertices, &indices),
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords) {
            vertex.tex_coords = tex_coord;
        }
    }

    let material = to_material(&primitive.material(), images);
    Some(Mesh::new(Geometry::new(label, vertices, indices), material))
}

/// glTF factors are linear already; the colour map is looked up by image.
fn to_material(material: &gltf::Material, images: &[Arc<TextureImage>]) -> StandardMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    StandardMaterial {
        color: Color::new(r, g, b),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        map: pbr
            .base_color_texture()
            .and_then(|info| images.get(info.texture().source().index()).cloned()),
    }
}

/// Area-weighted smooth normals for primitives that ship without them.
pub fn compute_normals(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut sums = vec![Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for c in indices.chunks_exact(3) {
        let p0: Vector3<f32> = vertices[c[0] as usize].position.into();
        let p1: Vector3<f32> = vertices[c[1] as usize].position.into();
        let p2: Vector3<f32> = vertices[c[2] as usize].position.into();
        let face = (p1 - p0).cross(p2 - p0);
        for &i in c {
            sums[i as usize] += face;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = if sum.magnitude2() > 0.0 {
            sum.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}
