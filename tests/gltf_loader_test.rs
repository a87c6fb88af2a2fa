use common::fixtures;
use scene_viewer::{
    data_structures::{
        model::ModelVertex,
        scene_graph::{Node, NodeKind},
    },
    resources::{self, AssetLoader, Assets, LoadError, mesh::compute_normals, texture::AssetRoot},
};

mod common;

fn meshes(root: &Node) -> Vec<&Node> {
    let mut found = Vec::new();
    root.traverse(&mut |node| {
        if matches!(node.kind, NodeKind::Mesh(_)) {
            found.push(node);
        }
    });
    found
}

fn assert_single_triangle(root: &Node) {
    assert_eq!(root.name, "fixture");
    let meshes = meshes(root);
    assert_eq!(meshes.len(), 1);

    let node = meshes[0];
    assert_eq!(node.name, "triangle");
    assert_eq!(node.transform.position, cgmath::Vector3::new(0.0, 0.0, -1.0));

    let mesh = node.as_mesh().unwrap();
    assert_eq!(mesh.geometry.vertices.len(), 3);
    assert_eq!(mesh.geometry.indices, vec![0, 1, 2]);
    for vertex in &mesh.geometry.vertices {
        assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
    }
}

#[tokio::test]
async fn should_load_single_triangle_glb() {
    let root = AssetRoot::default();
    let node = resources::model_from_slice(&root, "/models/test.glb", &fixtures::triangle_glb())
        .await
        .unwrap();
    assert_single_triangle(&node);
}

#[tokio::test]
async fn should_decode_embedded_data_uri_buffers() {
    let root = AssetRoot::default();
    let node = resources::model_from_slice(
        &root,
        "/models/test.gltf",
        &fixtures::triangle_gltf_embedded(),
    )
    .await
    .unwrap();
    assert_single_triangle(&node);
}

#[tokio::test]
async fn should_load_model_through_asset_loader() {
    let dir = tempfile::tempdir().expect("tempdir");
    fixtures::write_asset(dir.path(), "/models/test.glb", &fixtures::triangle_glb());
    let assets = Assets::new(AssetRoot::new(dir.path().display().to_string()));

    let node = assets.load_model("/models/test.glb").await.unwrap();
    assert_single_triangle(&node);
}

#[tokio::test]
async fn should_reject_malformed_model() {
    let root = AssetRoot::default();
    let err = resources::model_from_slice(&root, "/models/broken.glb", b"not a model")
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Gltf(_)));
}

#[tokio::test]
async fn should_report_missing_model_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let assets = Assets::new(AssetRoot::new(dir.path().display().to_string()));
    let err = assets.load_model("/models/test.glb").await.unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn should_resolve_uris_relative_to_document() {
    use resources::texture::resolve_relative;

    assert_eq!(resolve_relative("/models/test.gltf", "test.bin"), "/models/test.bin");
    assert_eq!(resolve_relative("/models/test.gltf", "/other.bin"), "/other.bin");
    assert_eq!(
        resolve_relative("/models/test.gltf", "data:application/octet-stream;base64,AA=="),
        "data:application/octet-stream;base64,AA=="
    );
}

#[test]
fn should_compute_face_normals_for_quads() {
    let mut vertices = vec![
        ModelVertex { position: [0.0, 0.0, 0.0], ..Default::default() },
        ModelVertex { position: [1.0, 0.0, 0.0], ..Default::default() },
        ModelVertex { position: [1.0, 0.0, -1.0], ..Default::default() },
        ModelVertex { position: [0.0, 0.0, -1.0], ..Default::default() },
    ];
    compute_normals(&mut vertices, &[0, 1, 2, 0, 2, 3]);
    for vertex in &vertices {
        assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
    }
}
