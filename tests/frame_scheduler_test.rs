use instant::Instant;
use scene_viewer::flow::FrameScheduler;

#[derive(Default)]
struct Counters {
    render: u32,
    hud: u32,
}

#[test]
fn should_run_every_callback_each_frame() {
    let mut scheduler: FrameScheduler<Counters> = FrameScheduler::new();
    scheduler.register(|c: &mut Counters, _| c.render += 1);
    scheduler.register(|c: &mut Counters, _| c.hud += 1);

    let mut counters = Counters::default();
    for _ in 0..3 {
        scheduler.dispatch(&mut counters, Instant::now());
    }
    assert_eq!(counters.render, 3);
    assert_eq!(counters.hud, 3);
    assert_eq!(scheduler.len(), 2);
}

#[test]
fn should_stop_cancelled_callbacks() {
    let mut scheduler: FrameScheduler<Counters> = FrameScheduler::new();
    let render = scheduler.register(|c: &mut Counters, _| c.render += 1);
    scheduler.register(|c: &mut Counters, _| c.hud += 1);

    let mut counters = Counters::default();
    scheduler.dispatch(&mut counters, Instant::now());
    render.clone().cancel();
    assert!(render.is_cancelled());
    scheduler.dispatch(&mut counters, Instant::now());
    scheduler.dispatch(&mut counters, Instant::now());

    assert_eq!(counters.render, 1);
    assert_eq!(counters.hud, 3);
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn should_cancel_everything_on_shutdown() {
    let mut scheduler: FrameScheduler<Counters> = FrameScheduler::new();
    let first = scheduler.register(|c: &mut Counters, _| c.render += 1);
    let second = scheduler.register(|c: &mut Counters, _| c.hud += 1);

    scheduler.cancel_all();
    let mut counters = Counters::default();
    scheduler.dispatch(&mut counters, Instant::now());

    assert!(first.is_cancelled() && second.is_cancelled());
    assert!(scheduler.is_empty());
    assert_eq!(counters.render + counters.hud, 0);
}
