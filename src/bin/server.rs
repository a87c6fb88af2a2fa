#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;
    use scene_viewer::server::{ServerConfig, serve};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    serve(ServerConfig::parse()).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
