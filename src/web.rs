//! Browser entry point.

use wasm_bindgen::prelude::*;

use crate::{bootstrap::ViewerConfig, flow};

const MOUNT_ID: &str = "app";
const CANVAS_ID: &str = "canvas";

/// Append a full-size `canvas#canvas` to `#app`.
fn mount_canvas() -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or("no document")?;
    let app = document
        .get_element_by_id(MOUNT_ID)
        .ok_or_else(|| format!("no #{} element to mount into", MOUNT_ID))?;
    let canvas = document
        .create_element("canvas")
        .map_err(|e| format!("{:?}", e))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| "created element is not a canvas".to_string())?;
    canvas.set_id(CANVAS_ID);
    let style = canvas.style();
    style
        .set_property("width", "100%")
        .and_then(|_| style.set_property("height", "100%"))
        .map_err(|e| format!("{:?}", e))?;
    app.append_child(&canvas).map_err(|e| format!("{:?}", e))?;
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() {
    flow::init_logging();
    if let Err(e) = mount_canvas() {
        log::error!("Cannot start the viewer: {}", e);
        return;
    }
    if let Err(e) = flow::run(ViewerConfig::default()) {
        log::error!("{:#}", e);
    }
}
