//! Scene rendering.
//!
//! [`Renderer`] owns the GPU context and every pipeline. Each frame it
//! synchronizes the GPU copies of the scene (geometry, colour maps and
//! environment cubes, uploaded on first use and released once the scene no
//! longer references them), then records three passes:
//!
//! 1. shadow: depth from the directional light, shadow casters only
//! 2. scene: background and opaque meshes into the HDR target
//! 3. composite: tone mapping and output encoding onto the surface
//!
//! A flat background colour is cleared with alpha 0. The composite pass
//! leaves such texels out of exposure and tone mapping, so the colour shows
//! exactly as given. Everything drawn writes alpha 1.
//!
//! The HDR and depth targets are sized by the [`Viewport`], i.e. the logical
//! size times the capped pixel ratio, independent of the surface extent.

use std::{collections::HashMap, iter, sync::Arc};

use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraResources, PerspectiveCamera},
    context::{Context, Viewport},
    data_structures::{
        instance::InstanceRaw,
        model::{Geometry, TextureImage},
        scene_graph::{Background, Scene},
        texture::{self, Texture},
    },
    pipelines::{
        background::BackgroundResources,
        composite::CompositeResources,
        light::{LightResources, LightUniform},
        shadow::ShadowResources,
        standard,
    },
    resources::pmrem::EnvironmentMap,
};

/// Shadow map resolution used until a light asks for another one.
const DEFAULT_SHADOW_MAP_SIZE: u32 = 1024;

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

struct GpuTexture {
    // keeps the address used as cache key alive
    _image: Arc<TextureImage>,
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

struct GpuEnvironment {
    map: Arc<EnvironmentMap>,
    texture: Texture,
    background: wgpu::BindGroup,
}

struct Draw {
    geometry: u64,
    texture: Option<usize>,
    cast_shadow: bool,
}

pub struct Renderer {
    pub ctx: Context,
    camera: CameraResources,
    light: LightResources,
    shadow: ShadowResources,
    background: BackgroundResources,
    composite: CompositeResources,
    standard_pipeline: wgpu::RenderPipeline,
    material_layout: wgpu::BindGroupLayout,
    material_sampler: wgpu::Sampler,
    hdr_target: Texture,
    depth_texture: Texture,
    target_size: [u32; 2],
    empty_environment: Texture,
    _white: Texture,
    white_bind_group: wgpu::BindGroup,
    geometries: HashMap<u64, GpuGeometry>,
    textures: HashMap<usize, GpuTexture>,
    environments: Vec<GpuEnvironment>,
    bound_environment: Option<usize>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl Renderer {
    pub fn new(ctx: Context, camera: &PerspectiveCamera) -> Self {
        let device = &ctx.device;
        let camera_resources = CameraResources::new(device, camera);
        let empty_environment = Texture::create_empty_cube(device, &ctx.queue);
        let shadow_map = Texture::create_shadow_map(device, DEFAULT_SHADOW_MAP_SIZE);
        let light = LightResources::new(
            device,
            LightUniform::from_scene(&Scene::default()),
            &shadow_map,
            &empty_environment,
        );
        // the shadow pass reads the light view-projection from the same buffer
        let shadow = ShadowResources::new(device, shadow_map, DEFAULT_SHADOW_MAP_SIZE, &light.buffer);

        let material_layout = standard::material_layout(device);
        let material_sampler = texture::create_default_sampler(device);
        let white = Texture::create_white(device, &ctx.queue);
        let white_bind_group =
            standard::mk_material_bind_group(device, &material_layout, &white, &material_sampler);

        let standard_pipeline = standard::mk_standard_pipeline(
            device,
            &camera_resources.bind_group_layout,
            &light.bind_group_layout,
            &material_layout,
        );
        let background = BackgroundResources::new(device, &camera_resources.bind_group_layout);

        let target_size = ctx.viewport.drawing_buffer_size();
        let hdr_target = Texture::create_hdr_target(device, target_size);
        let depth_texture = Texture::create_depth_texture(device, target_size, "depth_texture");
        let composite = CompositeResources::new(device, ctx.config.format, &ctx.settings, &hdr_target);

        let instance_capacity = 16;
        let instance_buffer = mk_instance_buffer(device, instance_capacity);

        log::info!(
            "Renderer ready: {}x{} target, surface {:?}",
            target_size[0],
            target_size[1],
            ctx.config.format
        );

        Self {
            camera: camera_resources,
            light,
            shadow,
            background,
            composite,
            standard_pipeline,
            material_layout,
            material_sampler,
            hdr_target,
            depth_texture,
            target_size,
            empty_environment,
            _white: white,
            white_bind_group,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            environments: Vec::new(),
            bound_environment: None,
            instance_buffer,
            instance_capacity,
            ctx,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.ctx.viewport
    }

    /// Size of the offscreen targets in pixels.
    pub fn target_size(&self) -> [u32; 2] {
        self.target_size
    }

    /// Set the logical output size. Targets are only recreated when the
    /// pixel size actually changes.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.ctx.viewport.set_size(width, height);
        self.ctx.resize_surface();
        self.sync_targets();
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.ctx.viewport.scale_factor = scale_factor;
        self.sync_targets();
    }

    fn sync_targets(&mut self) {
        let size = self.ctx.viewport.drawing_buffer_size();
        if size == self.target_size {
            return;
        }
        self.hdr_target.destroy();
        self.depth_texture.destroy();
        self.hdr_target = Texture::create_hdr_target(&self.ctx.device, size);
        self.depth_texture = Texture::create_depth_texture(&self.ctx.device, size, "depth_texture");
        self.composite.rebind(&self.ctx.device, &self.hdr_target);
        self.target_size = size;
        log::debug!("Render targets resized to {}x{}", size[0], size[1]);
    }

    /// Draw one frame of `scene` as seen through `camera`.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ctx.resize_surface();
        self.sync_environments(scene);
        self.sync_light(scene);
        self.camera.write(&self.ctx.queue, camera);
        let draws = self.sync_meshes(scene);

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let casts_shadow = scene
            .directional
            .as_ref()
            .is_some_and(|light| light.cast_shadow);
        if casts_shadow {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow.map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&self.shadow.pipeline);
            pass.set_bind_group(0, &self.shadow.bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (idx, draw) in draws.iter().enumerate() {
                if !draw.cast_shadow {
                    continue;
                }
                if let Some(gpu) = self.geometries.get(&draw.geometry) {
                    pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                    pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..gpu.num_elements, 0, idx as u32..idx as u32 + 1);
                }
            }
        }

        {
            let clear = clear_color(&scene.background);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Background::Environment(map) = &scene.background {
                if let Some(env) = self.environments.iter().find(|e| Arc::ptr_eq(&e.map, map)) {
                    pass.set_pipeline(&self.background.pipeline);
                    pass.set_bind_group(0, &self.camera.bind_group, &[]);
                    pass.set_bind_group(1, &env.background, &[]);
                    pass.draw(0..3, 0..1);
                }
            }

            pass.set_pipeline(&self.standard_pipeline);
            pass.set_bind_group(0, &self.camera.bind_group, &[]);
            pass.set_bind_group(1, &self.light.bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (idx, draw) in draws.iter().enumerate() {
                let Some(gpu) = self.geometries.get(&draw.geometry) else {
                    continue;
                };
                let material = draw
                    .texture
                    .and_then(|key| self.textures.get(&key))
                    .map_or(&self.white_bind_group, |gpu| &gpu.bind_group);
                pass.set_bind_group(2, material, &[]);
                pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..gpu.num_elements, 0, idx as u32..idx as u32 + 1);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_pipeline(&self.composite.pipeline);
            pass.set_bind_group(0, &self.composite.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Upload environments the scene references, destroy the ones it
    /// dropped and keep the lighting bind group pointing at the current one.
    fn sync_environments(&mut self, scene: &Scene) {
        let mut wanted: Vec<&Arc<EnvironmentMap>> = scene.environment.iter().collect();
        if let Background::Environment(map) = &scene.background {
            wanted.push(map);
        }

        self.environments.retain(|gpu| {
            let keep = wanted.iter().any(|map| Arc::ptr_eq(map, &gpu.map));
            if !keep {
                log::debug!("Releasing environment cube");
                gpu.texture.destroy();
            }
            keep
        });
        for map in wanted {
            if self.environments.iter().any(|gpu| Arc::ptr_eq(&gpu.map, map)) {
                continue;
            }
            let texture = Texture::from_environment(&self.ctx.device, &self.ctx.queue, map);
            let background = self.background.bind(&self.ctx.device, &texture);
            log::debug!(
                "Uploaded environment cube: {} mips of {}px",
                map.mip_count(),
                map.face_size()
            );
            self.environments.push(GpuEnvironment {
                map: map.clone(),
                texture,
                background,
            });
        }

        let key = scene.environment.as_ref().map(|map| Arc::as_ptr(map) as usize);
        if key != self.bound_environment {
            self.rebind_light(scene);
            self.bound_environment = key;
        }
    }

    fn rebind_light(&mut self, scene: &Scene) {
        let environment = scene
            .environment
            .as_ref()
            .and_then(|map| self.environments.iter().find(|gpu| Arc::ptr_eq(&gpu.map, map)))
            .map(|gpu| &gpu.texture)
            .unwrap_or(&self.empty_environment);
        self.light.rebind(&self.ctx.device, &self.shadow.map, environment);
    }

    fn sync_light(&mut self, scene: &Scene) {
        let size = scene
            .directional
            .as_ref()
            .map_or(DEFAULT_SHADOW_MAP_SIZE, |light| light.shadow_map_size);
        if self.shadow.resize(&self.ctx.device, size) {
            self.rebind_light(scene);
        }
        self.light.write(&self.ctx.queue, LightUniform::from_scene(scene));
    }

    /// Flatten the scene into one draw per mesh, uploading what is missing
    /// and releasing what is no longer referenced.
    fn sync_meshes(&mut self, scene: &Scene) -> Vec<Draw> {
        let mut draws = Vec::new();
        let mut instances = Vec::new();
        let mut meshes = Vec::new();
        scene.visit_meshes(|mesh, world| meshes.push((mesh, world)));

        for (mesh, world) in meshes {
            let geometry = &mesh.geometry;
            if !self.geometries.contains_key(&geometry.id()) {
                let gpu = upload_geometry(&self.ctx.device, geometry);
                self.geometries.insert(geometry.id(), gpu);
            }
            let texture = mesh.material.map.as_ref().map(|image| {
                let key = Arc::as_ptr(image) as usize;
                if !self.textures.contains_key(&key) {
                    let texture = Texture::from_texture_image(
                        &self.ctx.device,
                        &self.ctx.queue,
                        image,
                        Some("color_map"),
                    );
                    let bind_group = standard::mk_material_bind_group(
                        &self.ctx.device,
                        &self.material_layout,
                        &texture,
                        &self.material_sampler,
                    );
                    self.textures.insert(
                        key,
                        GpuTexture {
                            _image: image.clone(),
                            texture,
                            bind_group,
                        },
                    );
                }
                key
            });
            instances.push(InstanceRaw::new(world, &mesh.material, mesh.receive_shadow));
            draws.push(Draw {
                geometry: geometry.id(),
                texture,
                cast_shadow: mesh.cast_shadow,
            });
        }

        self.geometries.retain(|id, gpu| {
            let keep = draws.iter().any(|draw| draw.geometry == *id);
            if !keep {
                gpu.vertex_buffer.destroy();
                gpu.index_buffer.destroy();
            }
            keep
        });
        self.textures.retain(|key, gpu| {
            let keep = draws.iter().any(|draw| draw.texture == Some(*key));
            if !keep {
                gpu.texture.destroy();
            }
            keep
        });

        if instances.len() > self.instance_capacity {
            self.instance_buffer.destroy();
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = mk_instance_buffer(&self.ctx.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        draws
    }
}

fn upload_geometry(device: &wgpu::Device, geometry: &Arc<Geometry>) -> GpuGeometry {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Vertex Buffer", geometry.name)),
        contents: bytemuck::cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Index Buffer", geometry.name)),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuGeometry {
        vertex_buffer,
        index_buffer,
        num_elements: geometry.indices.len() as u32,
    }
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Clear value of the HDR target. Alpha 0 marks untouched background texels.
pub fn clear_color(background: &Background) -> wgpu::Color {
    match background {
        Background::Color(color) => wgpu::Color {
            r: color.r as f64,
            g: color.g as f64,
            b: color.b as f64,
            a: 0.0,
        },
        Background::Environment(_) => wgpu::Color::BLACK,
    }
}
