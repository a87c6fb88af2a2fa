//! Perspective camera and orbit controls.
//!
//! The camera follows the usual right-handed, +Y up convention. Orbit controls
//! keep it on a sphere around a target: left drag rotates, right drag pans and
//! the wheel dollies. Input is accumulated from window events and applied in
//! [`OrbitControls::update`], once per frame.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector2, Vector3};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

/// cgmath produces OpenGL clip space (z in -1..1); wgpu expects 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view.
    pub fov_y: cgmath::Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub position: Point3<f32>,
    pub up: Vector3<f32>,
    target: Point3<f32>,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    pub fn new(fov_y_degrees: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            fov_y: cgmath::Deg(fov_y_degrees),
            aspect,
            znear,
            zfar,
            position: Point3::origin(),
            up: Vector3::unit_y(),
            target: Point3::new(0.0, 0.0, -1.0),
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Must be called after changing `fov_y`, `aspect`, `znear` or `zfar`.
    pub fn update_projection_matrix(&mut self) {
        self.projection = cgmath::perspective(self.fov_y, self.aspect, self.znear, self.zfar);
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view_matrix()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    Rotate,
    Pan,
}

/// Mouse driven orbiting around [`OrbitControls::target`].
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enabled: bool,
    /// Height of the canvas in pixels; drag distances are relative to it.
    pub element_height: f32,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
    rotate_delta: Vector2<f32>,
    pan_delta: Vector2<f32>,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Point3::origin(),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            enabled: true,
            element_height: 1.0,
            drag: None,
            cursor: None,
            rotate_delta: Vector2::new(0.0, 0.0),
            pan_delta: Vector2::new(0.0, 0.0),
            scale: 1.0,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    /// Accumulates input. Returns true when the event was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        if !self.enabled {
            return false;
        }
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let mode = match button {
                    MouseButton::Left => Drag::Rotate,
                    MouseButton::Right | MouseButton::Middle => Drag::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(mode),
                    ElementState::Released if self.drag == Some(mode) => self.drag = None,
                    ElementState::Released => {}
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let (Some(drag), Some(previous)) = (self.drag, previous) else {
                    return false;
                };
                let delta = Vector2::new(
                    (position.x - previous.x) as f32,
                    (position.y - previous.y) as f32,
                );
                match drag {
                    Drag::Rotate => self.rotate_delta += delta,
                    Drag::Pan => self.pan_delta += delta,
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                let step = 0.95f32.powf(self.zoom_speed);
                if scroll > 0.0 {
                    self.scale *= step;
                } else if scroll < 0.0 {
                    self.scale /= step;
                }
                true
            }
            _ => false,
        }
    }

    /// Applies the accumulated input and points the camera at the target.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let height = self.element_height.max(1.0);
        let mut offset = camera.position - self.target;

        // screen-space panning along the camera's right and up axes
        if self.pan_delta != Vector2::new(0.0, 0.0) {
            let distance = offset.magnitude() * (cgmath::Rad::from(camera.fov_y).0 / 2.0).tan();
            let forward = (-offset).normalize();
            let right = forward.cross(camera.up).normalize();
            let up = right.cross(forward);
            let pan = right * (-2.0 * self.pan_delta.x * distance / height)
                + up * (2.0 * self.pan_delta.y * distance / height);
            self.target += pan * self.pan_speed;
        }

        let radius = (offset.magnitude() * self.scale).clamp(self.min_distance, self.max_distance);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / offset.magnitude().max(f32::EPSILON)).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };
        theta -= 2.0 * PI * self.rotate_delta.x / height * self.rotate_speed;
        phi -= 2.0 * PI * self.rotate_delta.y / height * self.rotate_speed;
        let phi_limit = 1e-6;
        phi = phi.clamp(phi_limit, PI - phi_limit);

        offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = self.target + offset;
        camera.look_at(self.target);

        self.rotate_delta = Vector2::new(0.0, 0.0);
        self.pan_delta = Vector2::new(0.0, 0.0);
        self.scale = 1.0;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Inverse of the view-projection, used to reconstruct view rays.
    pub inv_view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
            inv_view_proj: Matrix4::identity().into(),
            position: [0.0; 4],
        }
    }

    pub fn update_view_proj(&mut self, camera: &PerspectiveCamera) {
        let view_proj = camera.view_proj();
        self.view_proj = view_proj.into();
        self.inv_view_proj = view_proj.invert().unwrap_or(Matrix4::identity()).into();
        self.position = camera.position.to_homogeneous().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform buffer and bind group holding the current [`CameraUniform`].
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: &PerspectiveCamera) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(camera);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &PerspectiveCamera) {
        self.uniform.update_view_proj(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
