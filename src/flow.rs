//! Frame scheduling and the application event loop.
//!
//! The event loop owns a single [`Viewer`]. Once it is initialized every
//! redraw dispatches the callbacks registered on the [`FrameScheduler`] (the
//! render loop and the FPS HUD) and immediately requests the next redraw, so
//! frames are paced by the platform's presentation rate.
//!
//! Natively the viewer is created synchronously on a tokio runtime. In the
//! browser creation is spawned onto the page's executor and the finished
//! viewer is delivered back to the loop as [`ViewerEvent::Initialized`].

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    bootstrap::{self, Viewer, ViewerConfig},
    hud,
    resources::Assets,
};

/// Cancels a callback registered on a [`FrameScheduler`]. Clones share the
/// same flag.
#[derive(Clone, Debug, Default)]
pub struct FrameHandle {
    cancelled: Arc<AtomicBool>,
}

impl FrameHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

type FrameCallback<T> = Box<dyn FnMut(&mut T, Instant)>;

/// Callbacks run once per displayed frame, in registration order.
pub struct FrameScheduler<T> {
    callbacks: Vec<(FrameHandle, FrameCallback<T>)>,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<T> Debug for FrameScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: impl FnMut(&mut T, Instant) + 'static) -> FrameHandle {
        let handle = FrameHandle::default();
        self.callbacks.push((handle.clone(), Box::new(callback)));
        handle
    }

    /// Run every live callback for the frame at `now`. Callbacks cancelled
    /// before or during the dispatch are dropped.
    pub fn dispatch(&mut self, target: &mut T, now: Instant) {
        self.callbacks.retain(|(handle, _)| !handle.is_cancelled());
        for (handle, callback) in self.callbacks.iter_mut() {
            if !handle.is_cancelled() {
                callback(target, now);
            }
        }
        self.callbacks.retain(|(handle, _)| !handle.is_cancelled());
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Cancel everything, e.g. when the window goes away.
    pub fn cancel_all(&mut self) {
        for (handle, _) in self.callbacks.drain(..) {
            handle.cancel();
        }
    }
}

pub(crate) enum ViewerEvent {
    #[allow(dead_code)]
    Initialized(Box<anyhow::Result<Viewer>>),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().as_ref().map(|_| "Viewer"))
                .finish(),
        }
    }
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    assets: Assets,
    viewer: Option<Viewer>,
    scheduler: FrameScheduler<Viewer>,
    started: bool,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        let assets = Assets::new(config.asset_root.clone());
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            assets,
            viewer: None,
            scheduler: FrameScheduler::new(),
            started: false,
        })
    }

    /// Hook up the frame callbacks and kick off the first frame.
    fn start(&mut self, mut viewer: Viewer) {
        let window = viewer.renderer.ctx.window().clone();
        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale_factor);
        viewer.renderer.set_scale_factor(scale_factor);
        viewer.resize(logical.width, logical.height);

        bootstrap::register_render_loop(&mut self.scheduler);
        match hud::default_display(&window, &self.config.window_title) {
            Some(display) => {
                hud::register_fps_hud(&mut self.scheduler, display);
            }
            None => log::warn!("No HUD available, FPS will not be shown"),
        }

        self.viewer = Some(viewer);
        window.request_redraw();
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window_title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes =
                        window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::error!("No #{} element, letting winit create a canvas", CANVAS_ID),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let assets = self.assets.clone();
        let config = self.config.clone();
        let init_future = async move { Viewer::create(window, &assets, &config).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(viewer) => self.start(viewer),
                Err(e) => {
                    log::error!("Viewer initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = init_future.await;
                if proxy
                    .send_event(ViewerEvent::Initialized(Box::new(result)))
                    .is_err()
                {
                    log::error!("Event loop closed before the viewer was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            ViewerEvent::Initialized(result) => match *result {
                Ok(viewer) => self.start(viewer),
                Err(e) => {
                    log::error!("Viewer initialization failed: {:#}", e);
                    event_loop.exit();
                }
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let viewer = match &mut self.viewer {
            Some(viewer) => viewer,
            None => return,
        };

        viewer.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.scheduler.cancel_all();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale_factor = viewer.renderer.ctx.window().scale_factor();
                let logical = size.to_logical::<f64>(scale_factor);
                viewer.resize(logical.width, logical.height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                viewer.renderer.set_scale_factor(scale_factor);
            }
            WindowEvent::RedrawRequested => {
                self.scheduler.dispatch(viewer, Instant::now());
                if !self.scheduler.is_empty() {
                    viewer.renderer.ctx.window().request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Install the platform logger. Later calls keep the first logger.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            log::debug!("Logger already initialized: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::debug!("Logger already initialized: {}", e);
        }
    }
}

/// Open the viewer and run the event loop until its window closes.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    init_logging();

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
