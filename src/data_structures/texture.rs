//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! with constructors for every kind of texture the viewer binds: depth and
//! shadow maps, the HDR colour target, base colour maps and the prefiltered
//! environment cube.

use crate::{data_structures::model::TextureImage, resources::pmrem::EnvironmentMap};

/// A GPU texture with its default view. Samplers are owned by the bind
/// groups that read the texture.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of the offscreen scene target before tone mapping.
    pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Square depth map rendered from a light. Sample it through
    /// [`create_shadow_sampler`].
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        Self::create_depth_texture(device, [size, size], "shadow_map")
    }

    /// Offscreen linear HDR colour target, later tone mapped onto the surface.
    pub fn create_hdr_target(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hdr_target"),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1x1 white sRGB texture bound when a material has no colour map.
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = TextureImage {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        };
        Self::from_texture_image(device, queue, &image, Some("default white"))
    }

    /// Upload a decoded RGBA8 image as an sRGB colour texture.
    pub fn from_texture_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &TextureImage,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: img.width,
            height: img.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &img.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * img.width),
                rows_per_image: Some(img.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Upload every mip level of a prefiltered environment as a cube texture.
    pub fn from_environment(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        env: &EnvironmentMap,
    ) -> Self {
        let texture = create_cube(device, env.face_size(), env.mip_count(), "environment_cube");
        for (level, mip) in env.mips().iter().enumerate() {
            for (face, texels) in mip.faces.iter().enumerate() {
                write_cube_face(queue, &texture, level as u32, face as u32, mip.size, texels);
            }
        }
        Self::cube(texture, env.mip_count())
    }

    /// Black single-level cube bound while the scene has no environment.
    pub fn create_empty_cube(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = create_cube(device, 1, 1, "empty_environment_cube");
        for face in 0..6 {
            write_cube_face(queue, &texture, 0, face, 1, &[[0.0, 0.0, 0.0, 1.0]]);
        }
        Self::cube(texture, 1)
    }

    fn cube(texture: wgpu::Texture, mip_count: u32) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("environment_cube_view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            mip_level_count: Some(mip_count),
            array_layer_count: Some(6),
            ..Default::default()
        });
        Self { texture, view }
    }

    /// Release the GPU memory now instead of when the last handle drops.
    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

fn create_cube(device: &wgpu::Device, face_size: u32, mip_count: u32, label: &str) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: face_size,
            height: face_size,
            depth_or_array_layers: 6,
        },
        mip_level_count: mip_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: Texture::HDR_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_cube_face(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level: u32,
    face: u32,
    size: u32,
    texels: &[[f32; 4]],
) {
    let packed: Vec<half::f16> = texels
        .iter()
        .flat_map(|texel| texel.iter().map(|&c| half::f16::from_f32(c)))
        .collect();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level,
            origin: wgpu::Origin3d { x: 0, y: 0, z: face },
        },
        bytemuck::cast_slice(&packed),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(8 * size),
            rows_per_image: Some(size),
        },
        wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
    );
}

/// Repeating trilinear sampler for material colour maps.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("material_sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Depth comparison sampler for shadow maps.
pub fn create_shadow_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("shadow_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}

/// Trilinear sampler for the environment cube; roughness picks the mip.
pub fn create_environment_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("environment_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Clamped bilinear sampler for fullscreen passes.
pub fn create_screen_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("screen_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
