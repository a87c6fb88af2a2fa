use scene_viewer::{
    bootstrap::{self, CameraConfig},
    context::Viewport,
};

#[test]
fn should_aim_camera_at_target_on_setup() {
    let config = CameraConfig::default();
    let (camera, controls) = bootstrap::create_camera(&config, 16.0 / 9.0);

    let drift = camera.position - cgmath::Point3::new(0.0, 2.0, 6.0);
    assert!(cgmath::InnerSpace::magnitude(drift) < 1e-4, "{:?}", camera.position);
    assert_eq!(camera.target(), cgmath::Point3::new(0.0, 1.0, 0.0));
    assert_eq!(controls.target, cgmath::Point3::new(0.0, 1.0, 0.0));
    assert_eq!(camera.znear, 0.1);
    assert_eq!(camera.zfar, 1000.0);
}

#[test]
fn should_be_idempotent_when_resized_twice() {
    let (mut camera, mut controls) = bootstrap::create_camera(&CameraConfig::default(), 1.0);

    bootstrap::resize_view(&mut camera, &mut controls, 1280.0, 720.0);
    let once = camera.clone();
    let once_proj = camera.projection_matrix();
    bootstrap::resize_view(&mut camera, &mut controls, 1280.0, 720.0);

    assert_eq!(camera, once);
    assert_eq!(camera.projection_matrix(), once_proj);
    assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
}

#[test]
fn should_ignore_collapsed_sizes() {
    let (mut camera, mut controls) = bootstrap::create_camera(&CameraConfig::default(), 2.0);
    let before = camera.clone();

    bootstrap::resize_view(&mut camera, &mut controls, 0.0, 600.0);
    bootstrap::resize_view(&mut camera, &mut controls, 800.0, 0.0);

    assert_eq!(camera, before);
}

#[test]
fn should_cap_pixel_ratio() {
    let viewport = Viewport::new(800.0, 600.0, 3.0, 2.0);
    assert_eq!(viewport.pixel_ratio(), 2.0);
    assert_eq!(viewport.drawing_buffer_size(), [1600, 1200]);

    let viewport = Viewport::new(800.0, 600.0, 1.5, 2.0);
    assert_eq!(viewport.drawing_buffer_size(), [1200, 900]);
}

#[test]
fn should_report_unchanged_viewport_size() {
    let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    assert!(!viewport.set_size(800.0, 600.0));
    assert!(viewport.set_size(1024.0, 768.0));
    assert!(!viewport.set_size(1024.0, 768.0));
    assert_eq!(viewport.drawing_buffer_size(), [1024, 768]);
}

#[test]
fn should_keep_drawing_buffer_non_empty() {
    let viewport = Viewport::new(0.0, 0.0, 1.0, 2.0);
    assert_eq!(viewport.drawing_buffer_size(), [1, 1]);
    assert_eq!(viewport.aspect(), 1.0);
}
