//! Viewer data structures: geometry, materials, textures, scene graphs, and instances.
//!
//! - `model` contains CPU-side geometry, colours and materials
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds node transforms and their per-draw GPU form
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
