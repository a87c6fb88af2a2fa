//! Scene bootstrap: renderer, camera, lights, ground and the two optional
//! assets.
//!
//! Asset failures never abort startup. A missing environment falls back to a
//! flat background colour, a missing model to a small cube, and both cases
//! are logged and recorded in the [`BootstrapReport`].

use std::{f32::consts::FRAC_PI_2, sync::Arc};

use cgmath::Point3;
use winit::{event::WindowEvent, window::Window};

use crate::{
    camera::{OrbitControls, PerspectiveCamera},
    context::{Context, RendererSettings},
    data_structures::{
        instance::Transform,
        model::{Color, Geometry, StandardMaterial},
        scene_graph::{AmbientLight, Background, DirectionalLight, Mesh, Node, NodeKind, Scene},
    },
    flow::{FrameHandle, FrameScheduler},
    render::Renderer,
    resources::{AssetLoader, texture::AssetRoot},
};

pub const MODEL_URL: &str = "/models/test.glb";
pub const ENVIRONMENT_URL: &str = "/hdri_small.hdr";
pub const FALLBACK_CUBE: &str = "fallback_cube";
pub const GROUND: &str = "ground";
/// Background colour used when the environment map is unavailable.
pub const FALLBACK_BACKGROUND: u32 = 0x88bbee;

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            position: Point3::new(0.0, 2.0, 6.0),
            target: Point3::new(0.0, 1.0, 0.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub asset_root: AssetRoot,
    pub model_url: String,
    pub environment_url: String,
    pub renderer: RendererSettings,
    pub camera: CameraConfig,
    pub window_title: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: AssetRoot::default(),
            model_url: MODEL_URL.to_string(),
            environment_url: ENVIRONMENT_URL.to_string(),
            renderer: RendererSettings::default(),
            camera: CameraConfig::default(),
            window_title: "scene-viewer".to_string(),
        }
    }
}

/// Whether an optional asset made it into the scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetOutcome {
    Loaded,
    /// Fallback content was used; holds the load error.
    Fallback(String),
}

impl AssetOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, AssetOutcome::Loaded)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapReport {
    pub environment: AssetOutcome,
    pub model: AssetOutcome,
}

/// Camera placed per `config` with orbit controls around its target,
/// updated once so the camera already looks at the target.
pub fn create_camera(config: &CameraConfig, aspect: f32) -> (PerspectiveCamera, OrbitControls) {
    let mut camera = PerspectiveCamera::new(config.fov_y_degrees, aspect, config.near, config.far);
    camera.position = config.position;
    let mut controls = OrbitControls::new(config.target);
    controls.update(&mut camera);
    (camera, controls)
}

/// Lights and ground shared by every scene.
pub fn base_scene() -> Scene {
    let mut scene = Scene::new();
    scene.ambient = AmbientLight {
        color: Color::WHITE,
        intensity: 0.4,
    };
    scene.directional = Some(DirectionalLight {
        color: Color::WHITE,
        intensity: 0.6,
        position: Point3::new(5.0, 10.0, 7.0),
        target: Point3::new(0.0, 0.0, 0.0),
        cast_shadow: true,
        shadow_map_size: 1024,
    });

    let mut ground = Mesh::new(
        Geometry::plane(40.0, 40.0),
        StandardMaterial {
            color: Color::from_hex(0x808080),
            ..Default::default()
        },
    );
    ground.receive_shadow = true;
    scene.add(
        Node::mesh(GROUND, ground)
            .with_transform(Transform::new().with_rotation_x(cgmath::Rad(-FRAC_PI_2))),
    );
    scene
}

/// Build the full scene: base lights and ground, then the environment and
/// the model, fetched concurrently. Each branch falls back independently.
pub async fn build_scene(
    assets: &impl AssetLoader,
    config: &ViewerConfig,
) -> (Scene, BootstrapReport) {
    let mut scene = base_scene();

    let (environment, model) = futures::join!(
        assets.load_environment_map(&config.environment_url),
        assets.load_model(&config.model_url),
    );

    let environment = match environment {
        Ok(map) => {
            scene.environment = Some(map.clone());
            scene.background = Background::Environment(map);
            AssetOutcome::Loaded
        }
        Err(err) => {
            log::warn!("HDR environment load failed, using a flat background: {}", err);
            scene.environment = None;
            scene.background = Background::Color(Color::from_hex(FALLBACK_BACKGROUND));
            AssetOutcome::Fallback(err.to_string())
        }
    };

    let model = match model {
        Ok(mut root) => {
            root.traverse_mut(&mut |node| {
                if let NodeKind::Mesh(mesh) = &mut node.kind {
                    mesh.cast_shadow = true;
                    mesh.receive_shadow = true;
                }
            });
            root.transform.position = cgmath::Vector3::new(0.0, 0.0, 0.0);
            scene.add(root);
            AssetOutcome::Loaded
        }
        Err(err) => {
            log::warn!("Model load failed, adding a fallback cube: {}", err);
            scene.add(fallback_cube());
            AssetOutcome::Fallback(err.to_string())
        }
    };

    (scene, BootstrapReport { environment, model })
}

pub fn fallback_cube() -> Node {
    let mesh = Mesh::new(
        Geometry::cuboid(1.0, 1.0, 1.0),
        StandardMaterial {
            metalness: 0.1,
            roughness: 0.6,
            ..Default::default()
        },
    );
    Node::mesh(FALLBACK_CUBE, mesh).with_transform(Transform::from_position(0.0, 0.5, 0.0))
}

/// Apply a new logical output size to the camera and controls.
pub fn resize_view(
    camera: &mut PerspectiveCamera,
    controls: &mut OrbitControls,
    width: f64,
    height: f64,
) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    camera.aspect = (width / height) as f32;
    camera.update_projection_matrix();
    controls.element_height = height as f32;
}

/// Everything one rendering session owns.
pub struct Viewer {
    pub renderer: Renderer,
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub report: BootstrapReport,
}

impl Viewer {
    /// Bring up the renderer on `window` and build the scene from `assets`.
    pub async fn create(
        window: Arc<Window>,
        assets: &impl AssetLoader,
        config: &ViewerConfig,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.renderer).await?;
        let viewport = ctx.viewport;
        let (mut camera, mut controls) = create_camera(&config.camera, viewport.aspect());
        resize_view(&mut camera, &mut controls, viewport.width, viewport.height);
        let renderer = Renderer::new(ctx, &camera);

        let (scene, report) = build_scene(assets, config).await;
        log::info!(
            "Scene ready: environment {:?}, model {:?}",
            report.environment,
            report.model
        );

        Ok(Self {
            renderer,
            scene,
            camera,
            controls,
            report,
        })
    }

    /// New logical size of the canvas or window. Calling it again with the
    /// same size changes nothing.
    pub fn resize(&mut self, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.renderer.set_size(width, height);
        resize_view(&mut self.camera, &mut self.controls, width, height);
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.controls.handle_window_events(event)
    }

    /// Update the controls and draw one frame.
    pub fn frame(&mut self) {
        self.controls.update(&mut self.camera);
        match self.renderer.render(&self.scene, &self.camera) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.ctx.reconfigure();
            }
            Err(e) => log::error!("Unable to render {}", e),
        }
    }
}

/// Register the per-frame render callback. It runs until the handle is
/// cancelled or the window closes.
pub fn register_render_loop(scheduler: &mut FrameScheduler<Viewer>) -> FrameHandle {
    scheduler.register(|viewer, _now| viewer.frame())
}
