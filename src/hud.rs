//! Status overlay with a static label and a once-per-second FPS readout.

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::window::Window;

use crate::flow::{FrameHandle, FrameScheduler};

pub const HUD_LABEL: &str = "Demo: WASD / Orbit (dev)";
pub const FPS_PLACEHOLDER: &str = "FPS: -";
const SAMPLE_WINDOW: Duration = Duration::from_millis(1000);

/// Counts frames and reports the count once at least a second has passed
/// since the last report.
#[derive(Clone, Copy, Debug)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
        }
    }

    /// Count one frame. Returns the frame count when the sampling window is
    /// complete and starts a new window at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now < self.window_start + SAMPLE_WINDOW {
            return None;
        }
        let frames = self.frames;
        self.frames = 0;
        self.window_start = now;
        Some(frames)
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}

pub fn format_fps(fps: u32) -> String {
    format!("FPS: {}", fps)
}

/// Somewhere to show the HUD text.
pub trait HudDisplay {
    fn set_fps(&mut self, fps: u32);
}

/// Native HUD: the label and FPS go into the window title.
pub struct TitleHud {
    window: Arc<Window>,
    prefix: String,
}

impl TitleHud {
    pub fn new(window: Arc<Window>, title: &str) -> Self {
        let prefix = format!("{} | {}", title, HUD_LABEL);
        window.set_title(&format!("{} | {}", prefix, FPS_PLACEHOLDER));
        Self { window, prefix }
    }
}

impl HudDisplay for TitleHud {
    fn set_fps(&mut self, fps: u32) {
        self.window
            .set_title(&format!("{} | {}", self.prefix, format_fps(fps)));
    }
}

/// Browser HUD: `div#hud` appended to the body, holding the label and a
/// `div#fps` child.
#[cfg(target_arch = "wasm32")]
pub struct DomHud {
    fps: web_sys::Element,
}

#[cfg(target_arch = "wasm32")]
impl DomHud {
    pub fn mount() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        let body = document.body()?;

        let hud = document.create_element("div").ok()?;
        hud.set_id("hud");
        let label = document.create_element("div").ok()?;
        label.set_text_content(Some(HUD_LABEL));
        let fps = document.create_element("div").ok()?;
        fps.set_id("fps");
        fps.set_text_content(Some(FPS_PLACEHOLDER));

        hud.append_child(&label).ok()?;
        hud.append_child(&fps).ok()?;
        body.append_child(&hud).ok()?;
        Some(Self { fps })
    }
}

#[cfg(target_arch = "wasm32")]
impl HudDisplay for DomHud {
    fn set_fps(&mut self, fps: u32) {
        self.fps.set_text_content(Some(&format_fps(fps)));
    }
}

/// The platform's HUD for `window`.
#[allow(unused_variables)]
pub fn default_display(window: &Arc<Window>, title: &str) -> Option<Box<dyn HudDisplay>> {
    #[cfg(target_arch = "wasm32")]
    {
        DomHud::mount().map(|hud| Box::new(hud) as Box<dyn HudDisplay>)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Some(Box::new(TitleHud::new(window.clone(), title)))
    }
}

/// Register the FPS tracker. It ignores the frame target, so it works on any
/// scheduler.
pub fn register_fps_hud<T>(
    scheduler: &mut FrameScheduler<T>,
    mut display: Box<dyn HudDisplay>,
) -> FrameHandle {
    let mut counter: Option<FpsCounter> = None;
    scheduler.register(move |_, now| {
        let counter = counter.get_or_insert_with(|| FpsCounter::new(now));
        if let Some(fps) = counter.tick(now) {
            display.set_fps(fps);
        }
    })
}
