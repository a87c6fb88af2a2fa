use std::sync::Arc;

use common::fixtures::{self, FixtureLoader, MODEL_ROOT};
use scene_viewer::{
    ViewerConfig,
    bootstrap::{self, AssetOutcome, FALLBACK_BACKGROUND, FALLBACK_CUBE, GROUND},
    data_structures::{model::Color, scene_graph::Background},
    resources::{Assets, texture::AssetRoot},
};

mod common;

#[tokio::test]
async fn should_add_fallback_cube_when_model_fails() {
    let loader = FixtureLoader {
        fail_model: true,
        fail_environment: false,
    };
    let (scene, report) = bootstrap::build_scene(&loader, &ViewerConfig::default()).await;

    assert!(matches!(report.model, AssetOutcome::Fallback(_)));
    assert!(report.environment.is_loaded());

    let cubes = scene.find(FALLBACK_CUBE);
    assert_eq!(cubes.len(), 1);
    let cube = cubes[0];
    assert_eq!(cube.transform.position, cgmath::Vector3::new(0.0, 0.5, 0.0));
    let mesh = cube.as_mesh().expect("fallback cube is a mesh");
    assert_eq!(mesh.material.metalness, 0.1);
    assert_eq!(mesh.material.roughness, 0.6);
    assert!(scene.find(MODEL_ROOT).is_empty());
}

#[tokio::test]
async fn should_use_flat_background_when_environment_fails() {
    let loader = FixtureLoader {
        fail_model: false,
        fail_environment: true,
    };
    let (scene, report) = bootstrap::build_scene(&loader, &ViewerConfig::default()).await;

    assert!(matches!(report.environment, AssetOutcome::Fallback(_)));
    assert!(report.model.is_loaded());
    assert!(scene.environment.is_none());
    match scene.background {
        Background::Color(color) => assert_eq!(color, Color::from_hex(FALLBACK_BACKGROUND)),
        Background::Environment(_) => panic!("expected a flat background"),
    }
}

#[tokio::test]
async fn should_share_environment_between_background_and_lighting() {
    let (scene, report) =
        bootstrap::build_scene(&FixtureLoader::healthy(), &ViewerConfig::default()).await;

    assert!(report.environment.is_loaded());
    assert!(report.model.is_loaded());

    let environment = scene.environment.as_ref().expect("environment is set");
    match &scene.background {
        Background::Environment(background) => assert!(Arc::ptr_eq(background, environment)),
        Background::Color(_) => panic!("expected the environment as background"),
    }
}

#[tokio::test]
async fn should_place_model_at_origin_with_shadows() {
    let (scene, _) =
        bootstrap::build_scene(&FixtureLoader::healthy(), &ViewerConfig::default()).await;

    let roots = scene.find(MODEL_ROOT);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].transform.position, cgmath::Vector3::new(0.0, 0.0, 0.0));

    let mut meshes = 0;
    roots[0].traverse(&mut |node| {
        if let Some(mesh) = node.as_mesh() {
            meshes += 1;
            assert!(mesh.cast_shadow, "{} should cast shadows", node.name);
            assert!(mesh.receive_shadow, "{} should receive shadows", node.name);
        }
    });
    assert_eq!(meshes, 2);
    assert!(scene.find(FALLBACK_CUBE).is_empty());
}

#[tokio::test]
async fn should_set_up_lights_and_ground() {
    let (scene, _) =
        bootstrap::build_scene(&FixtureLoader::healthy(), &ViewerConfig::default()).await;

    assert_eq!(scene.ambient.color, Color::WHITE);
    assert_eq!(scene.ambient.intensity, 0.4);
    let light = scene.directional.expect("directional light");
    assert_eq!(light.intensity, 0.6);
    assert_eq!(light.position, cgmath::Point3::new(5.0, 10.0, 7.0));
    assert!(light.cast_shadow);
    assert_eq!(light.shadow_map_size, 1024);

    let ground = scene.find(GROUND);
    assert_eq!(ground.len(), 1);
    let mesh = ground[0].as_mesh().expect("ground is a mesh");
    assert!(mesh.receive_shadow);
    assert_eq!(mesh.material.color, Color::from_hex(0x808080));
}

#[tokio::test]
async fn should_fall_back_for_missing_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let assets = Assets::new(AssetRoot::new(dir.path().display().to_string()));
    let (scene, report) = bootstrap::build_scene(&assets, &ViewerConfig::default()).await;

    assert!(matches!(report.model, AssetOutcome::Fallback(_)));
    assert!(matches!(report.environment, AssetOutcome::Fallback(_)));
    assert_eq!(scene.find(FALLBACK_CUBE).len(), 1);
    assert!(scene.environment.is_none());
}

#[tokio::test]
async fn should_load_both_assets_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    fixtures::write_asset(dir.path(), bootstrap::ENVIRONMENT_URL, &fixtures::white_hdr());
    fixtures::write_asset(dir.path(), bootstrap::MODEL_URL, &fixtures::triangle_glb());

    let mut assets = Assets::new(AssetRoot::new(dir.path().display().to_string()));
    assets.prefilter = fixtures::small_prefilter();
    let (scene, report) = bootstrap::build_scene(&assets, &ViewerConfig::default()).await;

    assert_eq!(report.model, AssetOutcome::Loaded);
    assert_eq!(report.environment, AssetOutcome::Loaded);
    assert_eq!(scene.find("fixture").len(), 1);
    assert!(scene.find(FALLBACK_CUBE).is_empty());
    assert!(scene.environment.is_some());
}
