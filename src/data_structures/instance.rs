//! Node transforms and their per-draw GPU representation.
//!
//! Every scene node carries a local [`Transform`]. While flattening the scene
//! graph the renderer composes them into world transforms and packs one
//! [`InstanceRaw`] per mesh into a per-frame instance buffer.

use cgmath::{InnerSpace, Matrix, One, SquareMatrix};

use crate::data_structures::model;

/// Local transform of a scene node: position, rotation (as quaternion), and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: cgmath::Vector3::new(x, y, z),
            ..Self::new()
        }
    }

    /// Rotates about the X axis, keeping position and scale.
    pub fn with_rotation_x(mut self, angle: cgmath::Rad<f32>) -> Self {
        use cgmath::Rotation3;
        self.rotation = cgmath::Quaternion::from_angle_x(angle) * self.rotation;
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation.normalize())
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// World matrix and material scalars of one draw, as stored in the instance
/// buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    color: [f32; 4],
    /// metalness, roughness, receives shadow (0 or 1), unused
    material: [f32; 4],
}

impl InstanceRaw {
    pub fn new(
        world: cgmath::Matrix4<f32>,
        material: &model::StandardMaterial,
        receive_shadow: bool,
    ) -> Self {
        let [r, g, b] = material.color.to_array();
        Self {
            color: [r, g, b, 1.0],
            material: [
                material.metalness.clamp(0.0, 1.0),
                material.roughness.clamp(0.0, 1.0),
                if receive_shadow { 1.0 } else { 0.0 },
                0.0,
            ],
            ..Self::from_matrix(world)
        }
    }

    pub fn from_matrix(world: cgmath::Matrix4<f32>) -> Self {
        // inverse-transpose keeps normals perpendicular under non-uniform scale
        let normal = world
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(world);
        let normal = cgmath::Matrix3::from_cols(
            normal.x.truncate(),
            normal.y.truncate(),
            normal.z.truncate(),
        );
        Self {
            model: world.into(),
            normal: normal.into(),
            color: [1.0; 4],
            material: [0.0, 1.0, 0.0, 0.0],
        }
    }

    pub fn model(&self) -> cgmath::Matrix4<f32> {
        self.model.into()
    }
}

/**
 * The model matrix takes four vec4 slots, the normal matrix three vec3 slots
 * and the material two more vec4s. Locations 0..=2 belong to `ModelVertex`.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 29]>() as wgpu::BufferAddress,
                    shader_location: 13,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}
