//! GPU context: surface, device and queue plus the output settings they were
//! configured with.

use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

/// Tone mapping applied when the HDR scene is composited onto the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    #[default]
    AcesFilmic,
}

/// Encoding of the values written to the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    Linear,
    #[default]
    Srgb,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererSettings {
    /// Upper bound for the device pixel ratio used to size the render target.
    pub max_pixel_ratio: f64,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub output_color_space: ColorSpace,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
            output_color_space: ColorSpace::Srgb,
        }
    }
}

/// Logical output size and device pixel ratio. The scene is drawn at
/// `logical * min(scale_factor, max_pixel_ratio)` pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scale_factor: f64,
    pub max_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, scale_factor: f64, max_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            scale_factor,
            max_pixel_ratio,
        }
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.scale_factor.min(self.max_pixel_ratio)
    }

    pub fn drawing_buffer_size(&self) -> [u32; 2] {
        let ratio = self.pixel_ratio();
        [
            ((self.width * ratio).round() as u32).max(1),
            ((self.height * ratio).round() as u32).max(1),
        ]
    }

    /// Width over height; 1 while the viewport is collapsed.
    pub fn aspect(&self) -> f32 {
        if self.width > 0.0 && self.height > 0.0 {
            (self.width / self.height) as f32
        } else {
            1.0
        }
    }

    /// Returns false when nothing changed.
    pub fn set_size(&mut self, width: f64, height: f64) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub viewport: Viewport,
    pub settings: RendererSettings,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: RendererSettings) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let scale_factor = window.scale_factor();

        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("failed to create device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let logical = size.to_logical::<f64>(scale_factor);
        let viewport = Viewport::new(
            logical.width,
            logical.height,
            scale_factor,
            settings.max_pixel_ratio,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            viewport,
            settings,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Reconfigure the surface to the window's current physical size. Returns
    /// false when it already matches or the window is minimized.
    pub fn resize_surface(&mut self) -> bool {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return false;
        }
        if size.width == self.config.width && size.height == self.config.height {
            return false;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        true
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
