//! scene-viewer
//!
//! A minimal 3D scene viewer that runs natively and in the browser. It loads
//! a glTF model and an HDR environment map, lights the scene with a shadowed
//! directional light plus image-based lighting, and shows an FPS overlay.
//! Both assets are optional: the viewer falls back to a flat background and
//! a placeholder cube when they are missing.
//!
//! High-level modules
//! - `bootstrap`: scene setup, asset fallbacks and the `Viewer` session
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `context`: surface, device and queue plus output settings
//! - `data_structures`: scene graph, meshes, materials, GPU textures
//! - `flow`: frame scheduling and the winit event loop
//! - `hud`: FPS counter and its native and DOM displays
//! - `pipelines`: shadow, skybox, PBR and composite render pipelines
//! - `render`: per-frame GPU upload and pass recording
//! - `resources`: glTF and HDR loaders, environment prefiltering
//! - `server`: static file server for the web build (native only)
//!

pub mod bootstrap;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod hud;
pub mod pipelines;
pub mod render;
pub mod resources;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
#[cfg(target_arch = "wasm32")]
mod web;

pub use bootstrap::{Viewer, ViewerConfig};
pub use flow::run;
