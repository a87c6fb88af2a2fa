use std::{path::Path, sync::Arc};

use scene_viewer::{
    data_structures::{
        instance::Transform,
        model::{Geometry, StandardMaterial},
        scene_graph::{Mesh, Node},
    },
    resources::{
        AssetLoader, LoadError,
        pmrem::{EnvironmentMap, EquirectImage, PmremGenerator, PrefilterOptions},
    },
};

/// Cheap prefilter settings so tests don't spend time convolving.
pub fn small_prefilter() -> PrefilterOptions {
    PrefilterOptions {
        face_size: 8,
        mip_count: 3,
        sample_count: 8,
    }
}

/// Uncompressed Radiance file where every pixel holds the same RGBE value.
pub fn radiance_hdr(width: u32, height: u32, rgbe: [u8; 4]) -> Vec<u8> {
    let mut bytes = format!(
        "#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {} +X {}\n",
        height, width
    )
    .into_bytes();
    for _ in 0..width * height {
        bytes.extend_from_slice(&rgbe);
    }
    bytes
}

/// 16x8 panorama with radiance 1.0 in every channel.
pub fn white_hdr() -> Vec<u8> {
    radiance_hdr(16, 8, [128, 128, 128, 129])
}

const TRIANGLE_JSON: &str = r#"{
    "asset": { "version": "2.0" },
    "scene": 0,
    "scenes": [{ "name": "fixture", "nodes": [0] }],
    "nodes": [{ "name": "triangle", "mesh": 0, "translation": [0.0, 0.0, -1.0] }],
    "meshes": [{ "name": "tri", "primitives": [{ "attributes": { "POSITION": 0 } }] }],
    "accessors": [{
        "bufferView": 0,
        "componentType": 5126,
        "count": 3,
        "type": "VEC3",
        "min": [0.0, 0.0, 0.0],
        "max": [1.0, 1.0, 0.0]
    }],
    "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
    "buffers": [{ "byteLength": 36 URI }]
}"#;

fn triangle_positions() -> Vec<u8> {
    [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .iter()
        .flatten()
        .flat_map(|c| c.to_le_bytes())
        .collect()
}

/// Binary glTF holding one unindexed triangle without normals.
pub fn triangle_glb() -> Vec<u8> {
    let mut json = TRIANGLE_JSON.replace(" URI", "").into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin = triangle_positions();

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    glb.extend_from_slice(&bin);
    glb
}

/// The same triangle as a `.gltf` document with its buffer inlined as a
/// base64 data URI.
pub fn triangle_gltf_embedded() -> Vec<u8> {
    use base64::Engine as _;

    let payload = base64::engine::general_purpose::STANDARD.encode(triangle_positions());
    TRIANGLE_JSON
        .replace(
            " URI",
            &format!(r#", "uri": "data:application/octet-stream;base64,{}""#, payload),
        )
        .into_bytes()
}

pub fn write_asset(root: &Path, url: &str, bytes: &[u8]) {
    let path = root.join(url.trim_start_matches('/'));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create asset dir");
    }
    std::fs::write(path, bytes).expect("failed to write asset");
}

pub fn uniform_environment(options: PrefilterOptions) -> EnvironmentMap {
    let panorama = EquirectImage::new(8, 4, vec![[1.0, 1.0, 1.0]; 32]).expect("panorama");
    let mut generator = PmremGenerator::new(options);
    let env = generator.from_equirectangular(&panorama);
    generator.dispose();
    env
}

/// In-memory loader that can be told to fail either asset.
pub struct FixtureLoader {
    pub fail_model: bool,
    pub fail_environment: bool,
}

impl FixtureLoader {
    pub fn healthy() -> Self {
        Self {
            fail_model: false,
            fail_environment: false,
        }
    }
}

pub const MODEL_ROOT: &str = "fixture_model";

impl AssetLoader for FixtureLoader {
    async fn load_model(&self, url: &str) -> Result<Node, LoadError> {
        if self.fail_model {
            return Err(LoadError::UnsupportedUri(url.to_string()));
        }
        let mut root =
            Node::group(MODEL_ROOT).with_transform(Transform::from_position(3.0, 0.0, 0.0));
        let mut body = Node::mesh(
            "body",
            Mesh::new(Geometry::cuboid(1.0, 2.0, 1.0), StandardMaterial::default()),
        );
        body.add_child(Node::mesh(
            "head",
            Mesh::new(Geometry::cuboid(0.5, 0.5, 0.5), StandardMaterial::default()),
        ));
        root.add_child(body);
        Ok(root)
    }

    async fn load_environment_map(&self, url: &str) -> Result<Arc<EnvironmentMap>, LoadError> {
        if self.fail_environment {
            return Err(LoadError::UnsupportedUri(url.to_string()));
        }
        Ok(Arc::new(uniform_environment(small_prefilter())))
    }
}
