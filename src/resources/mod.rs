//! Asset loading: glTF models and HDR environment maps.
//!
//! Everything here produces plain CPU data (scene nodes, prefiltered cube
//! mips). The renderer uploads it when a frame first needs it, so loading
//! never touches the GPU and can be exercised without one.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    data_structures::{model::TextureImage, scene_graph::Node},
    resources::{
        pmrem::{EnvironmentMap, EquirectImage, PmremGenerator, PrefilterOptions},
        texture::{AssetRoot, decode_texture_image, load_binary, resolve_relative},
    },
};

pub mod mesh;
pub mod pmrem;
pub mod texture;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[cfg(target_arch = "wasm32")]
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("failed to decode image {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{0} references a binary chunk it does not contain")]
    MissingBlob(String),
    #[error("{0} has no pixels")]
    EmptyImage(String),
    #[error("{0} contains no scene")]
    MissingScene(String),
    #[error("unsupported URI {0}")]
    UnsupportedUri(String),
    #[error("malformed data URI: {0}")]
    DataUri(#[from] base64::DecodeError),
}

/// Source of the two assets the viewer bootstraps with.
///
/// [`Assets`] is the real implementation; tests substitute their own.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    /// Resolves to the root node of the model's default scene.
    async fn load_model(&self, url: &str) -> Result<Node, LoadError>;

    /// Resolves to a prefiltered environment usable both as background and
    /// as image-based lighting.
    async fn load_environment_map(&self, url: &str) -> Result<Arc<EnvironmentMap>, LoadError>;
}

/// Loads assets from an [`AssetRoot`]: a directory natively, the page origin
/// in the browser.
#[derive(Clone, Debug, Default)]
pub struct Assets {
    pub root: AssetRoot,
    pub prefilter: PrefilterOptions,
}

impl Assets {
    pub fn new(root: AssetRoot) -> Self {
        Self {
            root,
            prefilter: PrefilterOptions::default(),
        }
    }
}

impl AssetLoader for Assets {
    async fn load_model(&self, url: &str) -> Result<Node, LoadError> {
        load_model(&self.root, url).await
    }

    async fn load_environment_map(&self, url: &str) -> Result<Arc<EnvironmentMap>, LoadError> {
        load_environment_map(&self.root, &self.prefilter, url)
            .await
            .map(Arc::new)
    }
}

/// Fetch and parse a glTF 2.0 asset (`.glb` or `.gltf`), including the
/// buffers and images it references.
pub async fn load_model(root: &AssetRoot, url: &str) -> Result<Node, LoadError> {
    let bytes = load_binary(root, url).await?;
    model_from_slice(root, url, &bytes).await
}

/// Parse already fetched glTF bytes. External URIs are resolved relative to
/// `url`.
pub async fn model_from_slice(
    root: &AssetRoot,
    url: &str,
    bytes: &[u8],
) -> Result<Node, LoadError> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .ok_or_else(|| LoadError::MissingBlob(url.to_string()))?,
            gltf::buffer::Source::Uri(uri) => load_binary(root, &resolve_relative(url, uri)).await?,
        };
        buffers.push(data);
    }

    let mut images: Vec<Arc<TextureImage>> = Vec::new();
    for image in gltf.images() {
        let label = image
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#image{}", url, image.index()));
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let buffer = buffers
                    .get(view.buffer().index())
                    .ok_or_else(|| LoadError::MissingBlob(url.to_string()))?;
                let end = view.offset() + view.length();
                let bytes = buffer
                    .get(view.offset()..end)
                    .ok_or_else(|| LoadError::MissingBlob(url.to_string()))?;
                decode_texture_image(bytes, &label, Some(mime_type))?
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let bytes = load_binary(root, &resolve_relative(url, uri)).await?;
                decode_texture_image(&bytes, &label, mime_type)?
            }
        };
        images.push(Arc::new(decoded));
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| LoadError::MissingScene(url.to_string()))?;
    let node = mesh::scene_to_node(scene, &buffers, &images);
    log::info!(
        "Loaded {} ({} buffers, {} images)",
        url,
        buffers.len(),
        images.len()
    );
    Ok(node)
}

/// Fetch a Radiance `.hdr` panorama and prefilter it for image-based
/// lighting. The decoded panorama and the generator's scratch data are
/// released before returning.
pub async fn load_environment_map(
    root: &AssetRoot,
    options: &PrefilterOptions,
    url: &str,
) -> Result<EnvironmentMap, LoadError> {
    let bytes = load_binary(root, url).await?;
    let raw = decode_hdr(&bytes, url)?;
    let mut generator = PmremGenerator::new(*options);
    let env = generator.from_equirectangular(&raw);
    raw.dispose();
    generator.dispose();
    log::info!(
        "Loaded environment {} ({} mips, {}px faces)",
        url,
        env.mip_count(),
        env.face_size()
    );
    Ok(env)
}

pub fn decode_hdr(bytes: &[u8], label: &str) -> Result<EquirectImage, LoadError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr).map_err(
        |source| LoadError::Image {
            name: label.to_string(),
            source,
        },
    )?;
    let rgb = img.to_rgb32f();
    let (width, height) = rgb.dimensions();
    let texels = rgb.pixels().map(|p| p.0).collect();
    EquirectImage::new(width, height, texels)
        .ok_or_else(|| LoadError::EmptyImage(label.to_string()))
}
