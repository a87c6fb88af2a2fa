//! Prefiltered, mipmapped radiance environment maps (PMREM).
//!
//! An equirectangular HDR panorama is resampled into a cube map whose mip
//! levels are convolved with the GGX distribution at increasing roughness.
//! Level 0 is a plain resample (roughness 0), the last level is fully rough
//! and doubles as the diffuse irradiance lookup. The shader picks a level per
//! fragment from the material roughness.
//!
//! Filtering runs on the CPU so the result is plain data: it can be built,
//! inspected and tested without a GPU, and is uploaded once by the renderer.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

/// Linear RGB panorama covering the full sphere of directions.
#[derive(Clone, Debug)]
pub struct EquirectImage {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<[f32; 3]>,
}

impl EquirectImage {
    /// `None` unless the panorama has at least one texel and `texels` holds
    /// exactly `width * height` of them.
    pub fn new(width: u32, height: u32, texels: Vec<[f32; 3]>) -> Option<Self> {
        if width == 0 || height == 0 || texels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            texels,
        })
    }

    /// Bilinear lookup along a (normalized) world direction. +Y is up and the
    /// horizontal seam sits on -X.
    pub fn sample(&self, dir: Vector3<f32>) -> [f32; 3] {
        let u = dir.z.atan2(dir.x) / (2.0 * PI) + 0.5;
        let v = dir.y.clamp(-1.0, 1.0).asin() / PI + 0.5;
        let x = u * self.width as f32 - 0.5;
        let y = (1.0 - v) * self.height as f32 - 0.5;

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let texel = |tx: f32, ty: f32| {
            // wrap horizontally, clamp at the poles
            let tx = (tx as i64).rem_euclid(self.width as i64) as u32;
            let ty = (ty as i64).clamp(0, self.height as i64 - 1) as u32;
            self.texels[(ty * self.width + tx) as usize]
        };
        let a = texel(x0, y0);
        let b = texel(x0 + 1.0, y0);
        let c = texel(x0, y0 + 1.0);
        let d = texel(x0 + 1.0, y0 + 1.0);
        let mut out = [0.0; 3];
        for i in 0..3 {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            out[i] = top + (bottom - top) * fy;
        }
        out
    }

    /// 2x2 box downsample, never below 1x1.
    fn half(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let mut sum = [0.0; 3];
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (x * 2 + dx).min(self.width - 1);
                    let sy = (y * 2 + dy).min(self.height - 1);
                    let t = self.texels[(sy * self.width + sx) as usize];
                    for i in 0..3 {
                        sum[i] += t[i] / 4.0;
                    }
                }
                texels.push(sum);
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    /// Release the pixel storage.
    pub fn dispose(self) {}
}

/// One mip level of the cube: six faces of `size * size` RGBA texels in
/// +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Clone, Debug)]
pub struct CubeMip {
    pub size: u32,
    pub roughness: f32,
    pub faces: [Vec<[f32; 4]>; 6],
}

/// Prefiltered environment ready for upload.
#[derive(Debug)]
pub struct EnvironmentMap {
    mips: Vec<CubeMip>,
}

impl EnvironmentMap {
    pub fn face_size(&self) -> u32 {
        self.mips[0].size
    }

    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32
    }

    pub fn mips(&self) -> &[CubeMip] {
        &self.mips
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrefilterOptions {
    /// Edge length of the level-0 cube faces; rounded up to a power of two.
    pub face_size: u32,
    /// Number of roughness levels, capped by the number of halvings
    /// `face_size` allows.
    pub mip_count: u32,
    /// GGX samples per texel for the rough levels.
    pub sample_count: u32,
}

impl Default for PrefilterOptions {
    fn default() -> Self {
        Self {
            face_size: 128,
            mip_count: 6,
            sample_count: 64,
        }
    }
}

/// Converts equirectangular panoramas into [`EnvironmentMap`]s.
///
/// Holds a scratch pyramid of progressively downsampled copies of the
/// current source; call [`dispose`](Self::dispose) once done.
pub struct PmremGenerator {
    options: PrefilterOptions,
    pyramid: Vec<EquirectImage>,
}

impl PmremGenerator {
    pub fn new(options: PrefilterOptions) -> Self {
        Self {
            options,
            pyramid: Vec::new(),
        }
    }

    pub fn from_equirectangular(&mut self, source: &EquirectImage) -> EnvironmentMap {
        let face_size = self.options.face_size.max(1).next_power_of_two();
        let mip_count = self
            .options
            .mip_count
            .clamp(1, face_size.trailing_zeros() + 1);

        self.pyramid.clear();
        self.pyramid.push(source.clone());
        while let Some(last) = self.pyramid.last() {
            if last.width <= 1 && last.height <= 1 {
                break;
            }
            let next = last.half();
            self.pyramid.push(next);
        }

        let mips = (0..mip_count)
            .map(|level| {
                let roughness = if mip_count > 1 {
                    level as f32 / (mip_count - 1) as f32
                } else {
                    0.0
                };
                self.filter_level(face_size >> level, roughness)
            })
            .collect();
        log::debug!(
            "prefiltered {}x{} panorama into {} cube mips of {}px",
            source.width,
            source.height,
            mip_count,
            face_size
        );
        EnvironmentMap { mips }
    }

    fn filter_level(&self, size: u32, roughness: f32) -> CubeMip {
        let faces = std::array::from_fn(|face| {
            let mut texels = Vec::with_capacity((size * size) as usize);
            for y in 0..size {
                for x in 0..size {
                    let n = cube_direction(face, x, y, size);
                    let rgb = if roughness == 0.0 {
                        self.pyramid[0].sample(n)
                    } else {
                        self.convolve(n, roughness)
                    };
                    texels.push([rgb[0], rgb[1], rgb[2], 1.0]);
                }
            }
            texels
        });
        CubeMip {
            size,
            roughness,
            faces,
        }
    }

    /// GGX-weighted average around `n`, assuming n = v = r. Each sample reads
    /// a pyramid level whose texel footprint matches the sample's solid angle.
    fn convolve(&self, n: Vector3<f32>, roughness: f32) -> [f32; 3] {
        let alpha = roughness * roughness;
        let count = self.options.sample_count.max(1);
        let source = &self.pyramid[0];
        let texel_solid_angle = 4.0 * PI / (source.width * source.height) as f32;
        let (tangent, bitangent) = basis(n);

        let mut sum = [0.0f32; 3];
        let mut weight = 0.0f32;
        for i in 0..count {
            let (xi1, xi2) = hammersley(i, count);
            let phi = 2.0 * PI * xi1;
            let cos_theta = ((1.0 - xi2) / (1.0 + (alpha * alpha - 1.0) * xi2)).sqrt();
            let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
            let h = (tangent * (sin_theta * phi.cos())
                + bitangent * (sin_theta * phi.sin())
                + n * cos_theta)
                .normalize();
            let l = h * (2.0 * n.dot(h)) - n;
            let n_dot_l = n.dot(l);
            if n_dot_l <= 0.0 {
                continue;
            }
            let n_dot_h = n.dot(h).max(0.0);
            let pdf = ggx(n_dot_h, alpha) / 4.0;
            let sample_solid_angle = 1.0 / (count as f32 * pdf + 1e-4);
            let lod = (0.5 * (sample_solid_angle / texel_solid_angle).log2() + 1.0)
                .clamp(0.0, (self.pyramid.len() - 1) as f32);
            let rgb = self.pyramid[lod.round() as usize].sample(l);
            for c in 0..3 {
                sum[c] += rgb[c] * n_dot_l;
            }
            weight += n_dot_l;
        }
        if weight > 0.0 {
            sum.map(|c| c / weight)
        } else {
            self.pyramid[0].sample(n)
        }
    }

    /// Drop the scratch pyramid.
    pub fn dispose(mut self) {
        self.pyramid.clear();
    }
}

/// Direction through the centre of texel (x, y) of a cube face, using the
/// +X, -X, +Y, -Y, +Z, -Z face order and orientation GPUs sample with.
pub fn cube_direction(face: usize, x: u32, y: u32, size: u32) -> Vector3<f32> {
    let s = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let t = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    let dir = match face {
        0 => Vector3::new(1.0, -t, -s),
        1 => Vector3::new(-1.0, -t, s),
        2 => Vector3::new(s, 1.0, t),
        3 => Vector3::new(s, -1.0, -t),
        4 => Vector3::new(s, -t, 1.0),
        _ => Vector3::new(-s, -t, -1.0),
    };
    dir.normalize()
}

fn ggx(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * d * d)
}

fn hammersley(i: u32, count: u32) -> (f32, f32) {
    (i as f32 / count as f32, i.reverse_bits() as f32 * 2.328_306_4e-10)
}

fn basis(n: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let up = if n.z.abs() < 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_x()
    };
    let tangent = up.cross(n).normalize();
    (tangent, n.cross(tangent))
}
