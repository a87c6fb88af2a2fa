use std::{cell::RefCell, rc::Rc};

use instant::{Duration, Instant};
use scene_viewer::{
    flow::FrameScheduler,
    hud::{self, FpsCounter, HudDisplay},
};

struct Recorder(Rc<RefCell<Vec<u32>>>);

impl HudDisplay for Recorder {
    fn set_fps(&mut self, fps: u32) {
        self.0.borrow_mut().push(fps);
    }
}

#[test]
fn should_not_report_before_a_full_second() {
    let start = Instant::now();
    let mut counter = FpsCounter::new(start);
    for ms in [0, 16, 500, 999] {
        assert_eq!(counter.tick(start + Duration::from_millis(ms)), None);
    }
    assert_eq!(counter.frames(), 4);
}

#[test]
fn should_report_once_and_reset_at_one_second() {
    let start = Instant::now();
    let mut counter = FpsCounter::new(start);
    for i in 0..59u64 {
        assert_eq!(counter.tick(start + Duration::from_millis(i * 16)), None);
    }
    let end = start + Duration::from_millis(1000);
    assert_eq!(counter.tick(end), Some(60));
    assert_eq!(counter.frames(), 0);
    assert_eq!(counter.window_start(), end);

    assert_eq!(counter.tick(end + Duration::from_millis(10)), None);
    assert_eq!(counter.frames(), 1);
}

#[test]
fn should_format_fps_label() {
    assert_eq!(hud::format_fps(42), "FPS: 42");
    assert_eq!(hud::FPS_PLACEHOLDER, "FPS: -");
    assert_eq!(hud::HUD_LABEL, "Demo: WASD / Orbit (dev)");
}

#[test]
fn should_push_fps_to_display_from_frame_callback() {
    let shown = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler: FrameScheduler<()> = FrameScheduler::new();
    let handle = hud::register_fps_hud(&mut scheduler, Box::new(Recorder(shown.clone())));

    let start = Instant::now();
    for ms in [0, 400, 800] {
        scheduler.dispatch(&mut (), start + Duration::from_millis(ms));
    }
    assert!(shown.borrow().is_empty());
    scheduler.dispatch(&mut (), start + Duration::from_millis(1000));
    assert_eq!(*shown.borrow(), vec![4]);

    handle.cancel();
    scheduler.dispatch(&mut (), start + Duration::from_millis(2500));
    assert_eq!(*shown.borrow(), vec![4]);
    assert!(scheduler.is_empty());
}
