use base64::Engine as _;

use crate::{data_structures::model::TextureImage, resources::LoadError};

/// Where asset URLs such as `/models/test.glb` are resolved.
///
/// Natively the base is a directory on disk; in the browser it is a URL
/// prefix, with an empty base meaning the page origin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetRoot {
    base: String,
}

impl AssetRoot {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(root: &AssetRoot, file_name: &str) -> Result<reqwest::Url, LoadError> {
    let origin = if root.base.is_empty() {
        web_sys::window()
            .and_then(|window| window.location().origin().ok())
            .ok_or_else(|| LoadError::UnsupportedUri(file_name.to_string()))?
    } else {
        root.base.clone()
    };
    let base = reqwest::Url::parse(&format!("{}/", origin.trim_end_matches('/')))
        .map_err(|_| LoadError::UnsupportedUri(origin.clone()))?;
    base.join(file_name.trim_start_matches('/'))
        .map_err(|_| LoadError::UnsupportedUri(file_name.to_string()))
}

/// Fetch the raw bytes behind an asset URL. No retries.
pub async fn load_binary(root: &AssetRoot, file_name: &str) -> Result<Vec<u8>, LoadError> {
    if file_name.starts_with("data:") {
        return decode_data_uri(file_name);
    }

    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(root, file_name)?;
        let http = |source| LoadError::Http {
            url: url.to_string(),
            source,
        };
        let response = reqwest::get(url.clone())
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http)?;
        response.bytes().await.map_err(http)?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(&root.base).join(file_name.trim_start_matches('/'));
        tokio::fs::read(&path).await.map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?
    };

    Ok(data)
}

/// Resolve `uri` against the directory of `referrer`, the way browsers
/// resolve relative links inside a document.
pub fn resolve_relative(referrer: &str, uri: &str) -> String {
    if uri.starts_with("data:") || uri.starts_with('/') || uri.contains("://") {
        return uri.to_string();
    }
    match referrer.rfind('/') {
        Some(idx) => format!("{}{}", &referrer[..=idx], uri),
        None => uri.to_string(),
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| LoadError::UnsupportedUri(truncate(uri)))?;
    if !header.ends_with(";base64") {
        return Err(LoadError::UnsupportedUri(truncate(uri)));
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

fn truncate(uri: &str) -> String {
    uri.chars().take(48).collect()
}

/// Decode PNG/JPEG bytes into RGBA8. `mime_type` is a hint; without one the
/// format is guessed from the content.
pub fn decode_texture_image(
    bytes: &[u8],
    label: &str,
    mime_type: Option<&str>,
) -> Result<TextureImage, LoadError> {
    let format = mime_type
        .and_then(|mt| mt.split('/').next_back())
        .and_then(image::ImageFormat::from_extension);
    let img = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
    .map_err(|source| LoadError::Image {
        name: label.to_string(),
        source,
    })?;
    let rgba = img.to_rgba8();
    Ok(TextureImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
