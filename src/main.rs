#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

/// Open the scene viewer in a native window.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "scene-viewer", about = "Minimal glTF scene viewer")]
struct Args {
    /// Directory that asset URLs are resolved against.
    #[arg(long, default_value = "public")]
    assets: String,
    /// Model to load, relative to the asset directory.
    #[arg(long, default_value = scene_viewer::bootstrap::MODEL_URL)]
    model: String,
    /// Equirectangular HDR environment, relative to the asset directory.
    #[arg(long, default_value = scene_viewer::bootstrap::ENVIRONMENT_URL)]
    environment: String,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use scene_viewer::{ViewerConfig, resources::texture::AssetRoot};

    let args = Args::parse();
    let config = ViewerConfig {
        asset_root: AssetRoot::new(args.assets),
        model_url: args.model,
        environment_url: args.environment,
        ..Default::default()
    };
    if let Err(e) = scene_viewer::run(config) {
        log::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
