//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] owns a forest of [`Node`]s plus the scene-wide state the
//! renderer needs: background, environment lighting and lights. Nodes carry a
//! local [`Transform`] and are either plain groups or meshes.

use std::sync::Arc;

use cgmath::SquareMatrix;

use crate::{
    data_structures::{
        instance::Transform,
        model::{Color, Geometry, StandardMaterial},
    },
    resources::pmrem::EnvironmentMap,
};

/// A renderable mesh: shared geometry, its material and shadow flags.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: StandardMaterial,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: StandardMaterial) -> Self {
        Self {
            geometry: Arc::new(geometry),
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            kind: NodeKind::Mesh(mesh),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }

    /// Depth-first, parents before children.
    pub fn traverse<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    pub fn traverse_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }
}

/// What fills the pixels no geometry covers.
#[derive(Clone, Debug)]
pub enum Background {
    Color(Color),
    Environment(Arc<EnvironmentMap>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    /// The light shines from here towards `target`.
    pub position: cgmath::Point3<f32>,
    pub target: cgmath::Point3<f32>,
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub children: Vec<Node>,
    pub background: Background,
    pub environment: Option<Arc<EnvironmentMap>>,
    pub ambient: AmbientLight,
    pub directional: Option<DirectionalLight>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            background: Background::Color(Color::new(0.0, 0.0, 0.0)),
            environment: None,
            ambient: AmbientLight {
                color: Color::WHITE,
                intensity: 0.0,
            },
            directional: None,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn traverse<'a>(&'a self, mut f: impl FnMut(&'a Node)) {
        for node in &self.children {
            node.traverse(&mut f);
        }
    }

    /// Visits every mesh with its world transform.
    pub fn visit_meshes<'a>(&'a self, mut f: impl FnMut(&'a Mesh, cgmath::Matrix4<f32>)) {
        fn walk<'a>(
            node: &'a Node,
            parent: cgmath::Matrix4<f32>,
            f: &mut impl FnMut(&'a Mesh, cgmath::Matrix4<f32>),
        ) {
            let world = parent * node.transform.to_matrix();
            if let NodeKind::Mesh(mesh) = &node.kind {
                f(mesh, world);
            }
            for child in &node.children {
                walk(child, world, f);
            }
        }
        for node in &self.children {
            walk(node, cgmath::Matrix4::identity(), &mut f);
        }
    }

    pub fn find(&self, name: &str) -> Vec<&Node> {
        let mut found = Vec::new();
        self.traverse(|node| {
            if node.name == name {
                found.push(node);
            }
        });
        found
    }
}
