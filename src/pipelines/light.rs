use cgmath::{InnerSpace, Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    data_structures::{
        scene_graph::Scene,
        texture::{self, Texture},
    },
};

/// Half extent of the orthographic box the directional light renders its
/// shadow map with.
pub const SHADOW_EXTENT: f32 = 5.0;
pub const SHADOW_NEAR: f32 = 0.5;
pub const SHADOW_FAR: f32 = 500.0;

/// Scene-wide lighting as the standard shader reads it. Colours are
/// premultiplied with their intensity.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub light_view_proj: [[f32; 4]; 4],
    /// Unit vector towards the light; w is 1 when it casts shadows.
    pub direction: [f32; 4],
    /// w is 1 when the scene has a directional light at all.
    pub color: [f32; 4],
    pub ambient: [f32; 4],
    /// x: has environment, y: highest mip level, z: shadow texel size
    pub environment: [f32; 4],
}

impl LightUniform {
    pub fn from_scene(scene: &Scene) -> Self {
        let ambient = scene.ambient.color.scaled(scene.ambient.intensity);
        let mut uniform = Self {
            light_view_proj: Matrix4::identity().into(),
            direction: [0.0, 1.0, 0.0, 0.0],
            color: [0.0; 4],
            ambient: [ambient[0], ambient[1], ambient[2], 0.0],
            environment: [0.0; 4],
        };
        if let Some(light) = &scene.directional {
            let to_light = (light.position - light.target).normalize();
            let [r, g, b] = light.color.scaled(light.intensity);
            uniform.light_view_proj = light_view_proj(light.position, light.target).into();
            uniform.direction = [
                to_light.x,
                to_light.y,
                to_light.z,
                if light.cast_shadow { 1.0 } else { 0.0 },
            ];
            uniform.color = [r, g, b, 1.0];
            uniform.environment[2] = 1.0 / light.shadow_map_size.max(1) as f32;
        }
        if let Some(env) = &scene.environment {
            uniform.environment[0] = 1.0;
            uniform.environment[1] = (env.mip_count() - 1) as f32;
        }
        uniform
    }
}

/// Orthographic projection from the light's position towards its target.
pub fn light_view_proj(
    position: cgmath::Point3<f32>,
    target: cgmath::Point3<f32>,
) -> Matrix4<f32> {
    let forward = (target - position).normalize();
    // avoid a degenerate basis when the light points straight down
    let up = if forward.y.abs() > 0.999 {
        cgmath::Vector3::unit_z()
    } else {
        cgmath::Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(position, target, up);
    let projection = cgmath::ortho(
        -SHADOW_EXTENT,
        SHADOW_EXTENT,
        -SHADOW_EXTENT,
        SHADOW_EXTENT,
        SHADOW_NEAR,
        SHADOW_FAR,
    );
    OPENGL_TO_WGPU_MATRIX * projection * view
}

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,
    environment_sampler: wgpu::Sampler,
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        uniform: LightUniform,
        shadow_map: &Texture,
        environment: &Texture,
    ) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let shadow_sampler = texture::create_shadow_sampler(device);
        let environment_sampler = texture::create_environment_sampler(device);
        let bind_group = mk_bind_group(
            device,
            &bind_group_layout,
            &buffer,
            (&shadow_map.view, &shadow_sampler),
            (&environment.view, &environment_sampler),
        );
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            shadow_sampler,
            environment_sampler,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, uniform: LightUniform) {
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }

    /// Rebuild the bind group after one of the bound textures was replaced.
    pub fn rebind(&mut self, device: &wgpu::Device, shadow_map: &Texture, environment: &Texture) {
        self.bind_group = mk_bind_group(
            device,
            &self.bind_group_layout,
            &self.buffer,
            (&shadow_map.view, &self.shadow_sampler),
            (&environment.view, &self.environment_sampler),
        );
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Uniform Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    (shadow_view, shadow_sampler): (&wgpu::TextureView, &wgpu::Sampler),
    (environment_view, environment_sampler): (&wgpu::TextureView, &wgpu::Sampler),
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(shadow_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(environment_view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(environment_sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}
