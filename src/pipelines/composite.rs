use wgpu::util::DeviceExt;

use crate::{
    context::{ColorSpace, RendererSettings, ToneMapping},
    data_structures::texture::{self, Texture},
    pipelines::mk_fullscreen_pipeline,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniform {
    pub exposure: f32,
    pub tone_mapping: u32,
    pub encode_srgb: u32,
    _padding: u32,
}

impl CompositeUniform {
    /// sRGB surfaces encode on write; others get the transfer function in
    /// the shader.
    pub fn new(settings: &RendererSettings, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            exposure: settings.exposure,
            tone_mapping: match settings.tone_mapping {
                ToneMapping::None => 0,
                ToneMapping::AcesFilmic => 1,
            },
            encode_srgb: u32::from(
                settings.output_color_space == ColorSpace::Srgb && !surface_format.is_srgb(),
            ),
            _padding: 0,
        }
    }
}

impl CompositeUniform {
    /// What the composite shader writes for one HDR texel, before any
    /// hardware sRGB encoding of the surface.
    pub fn resolve(&self, texel: [f32; 4]) -> [f32; 3] {
        let mut color = [texel[0], texel[1], texel[2]];
        if texel[3] > 0.0 {
            color = color.map(|c| c * self.exposure);
            if self.tone_mapping == 1 {
                color = aces_filmic(color);
            }
        }
        color.map(|c| {
            let c = c.max(0.0);
            if self.encode_srgb == 1 { linear_to_srgb(c) } else { c }
        })
    }
}

const ACES_IN: [[f32; 3]; 3] = [
    [0.59719, 0.35458, 0.04823],
    [0.07600, 0.90834, 0.01566],
    [0.02840, 0.13383, 0.83777],
];

const ACES_OUT: [[f32; 3]; 3] = [
    [1.60475, -0.53108, -0.07367],
    [-0.10208, 1.10813, -0.00605],
    [-0.00327, -0.07276, 1.07602],
];

fn mul_rows(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    m.map(|row| row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

fn aces_filmic(color: [f32; 3]) -> [f32; 3] {
    let c = mul_rows(&ACES_IN, color.map(|c| c / 0.6)).map(|v| {
        let a = v * (v + 0.0245786) - 0.000090537;
        let b = v * (0.983729 * v + 0.4329510) + 0.238081;
        a / b
    });
    mul_rows(&ACES_OUT, c).map(|c| c.clamp(0.0, 1.0))
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Final pass from the HDR target to the surface.
pub struct CompositeResources {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
    bind_group_layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

impl CompositeResources {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        settings: &RendererSettings,
        hdr_target: &Texture,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("composite_bind_group_layout"),
        });
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Uniform Buffer"),
            contents: bytemuck::cast_slice(&[CompositeUniform::new(settings, surface_format)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = texture::create_screen_sampler(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, hdr_target, &sampler, &buffer);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = mk_fullscreen_pipeline(
            device,
            &layout,
            surface_format,
            None,
            wgpu::ShaderModuleDescriptor {
                label: Some("Composite Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("composite.wgsl").into()),
            },
        );

        Self {
            pipeline,
            bind_group,
            bind_group_layout,
            buffer,
            sampler,
        }
    }

    /// Point the pass at a new HDR target after a resize.
    pub fn rebind(&mut self, device: &wgpu::Device, hdr_target: &Texture) {
        self.bind_group = mk_bind_group(
            device,
            &self.bind_group_layout,
            hdr_target,
            &self.sampler,
            &self.buffer,
        );
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    hdr_target: &Texture,
    sampler: &wgpu::Sampler,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&hdr_target.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some("composite_bind_group"),
    })
}
