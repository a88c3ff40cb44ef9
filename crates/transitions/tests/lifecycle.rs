use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use presetconfig::{CustomParams, TransitionConfig, TransitionKind};
use renderer::Renderer;
use scheduler::{FrameScheduler, ManualScheduler};
use transitions::{
    CallbackObserver, ChannelObserver, TransitionEngine, TransitionEvent, TransitionPhase,
};

fn engine_with_step(step: Duration) -> TransitionEngine<ManualScheduler> {
    let scheduler = ManualScheduler::fixed(step).expect("non-zero step");
    TransitionEngine::new(Renderer::disabled(320, 180), scheduler).with_seed(11)
}

fn fade_config(duration_ms: u64) -> TransitionConfig {
    TransitionConfig::from_json(&format!(
        r#"{{ "type": "fade", "fadeType": "black", "duration": {duration_ms}, "easing": "easeInOut" }}"#
    ))
    .expect("valid fade config")
}

#[test]
fn progress_is_monotonic_while_running() {
    let scheduler = ManualScheduler::jittered(
        Duration::from_millis(12),
        Duration::from_millis(9),
        42,
    )
    .unwrap();
    let mut engine = TransitionEngine::new(Renderer::disabled(64, 64), scheduler);
    engine.prepare(fade_config(700)).unwrap();
    engine.start();

    let mut samples = Vec::new();
    while engine.state().is_active {
        assert!(engine.pump(None));
        let state = engine.state();
        assert!((0.0..=1.0).contains(&state.progress));
        samples.push(state.progress);
    }
    assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]), "{samples:?}");
    assert_eq!(samples.last().copied(), Some(1.0));
}

#[test]
fn completion_fires_once_at_the_configured_duration() {
    let mut engine = engine_with_step(Duration::from_millis(16));
    let completions = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&completions);
    engine.add_observer(CallbackObserver::new().on_complete(move || *sink.borrow_mut() += 1));

    engine.prepare(fade_config(200)).unwrap();
    engine.start();
    while engine.state().is_active {
        engine.pump(None);
        if engine.scheduler().now() < Duration::from_millis(200) {
            assert_eq!(*completions.borrow(), 0);
        }
    }

    assert_eq!(*completions.borrow(), 1);
    assert_eq!(engine.scheduler().now(), Duration::from_millis(208));
    assert_eq!(engine.state().progress, 1.0);
    assert_eq!(engine.state().phase, TransitionPhase::Complete);
    assert_eq!(engine.state().remaining, Duration::ZERO);
}

#[test]
fn callbacks_keep_their_order() {
    let mut engine = engine_with_step(Duration::from_millis(50));
    let (observer, events) = ChannelObserver::new();
    engine.add_observer(observer);
    engine.prepare(fade_config(100)).unwrap();
    engine.start();
    engine.run_to_end(None);

    let events: Vec<_> = events.try_iter().collect();
    assert_eq!(
        events,
        vec![
            TransitionEvent::Started,
            TransitionEvent::Progress(0.5),
            TransitionEvent::Progress(1.0),
            TransitionEvent::Completed,
        ]
    );
}

#[test]
fn cancel_suppresses_completion() {
    let mut engine = engine_with_step(Duration::from_millis(20));
    let (observer, events) = ChannelObserver::new();
    engine.add_observer(observer);
    engine.prepare(fade_config(200)).unwrap();
    engine.start();
    for _ in 0..4 {
        engine.pump(None);
    }
    let progress = engine.state().progress;
    assert!(progress > 0.0 && progress < 1.0);

    assert!(engine.cancel());
    assert_eq!(engine.state().phase, TransitionPhase::Idle);
    assert_eq!(engine.state().progress, 0.0);
    assert!(!engine.state().is_active);
    assert!(!engine.pump(None));
    assert!(engine.metrics().is_none());

    let events: Vec<_> = events.try_iter().collect();
    assert!(events.contains(&TransitionEvent::Cancelled));
    assert!(!events.contains(&TransitionEvent::Completed));
}

#[test]
fn metrics_appear_only_after_completion() {
    let mut engine = engine_with_step(Duration::from_millis(16));
    engine.prepare(fade_config(500)).unwrap();
    assert!(engine.metrics().is_none());
    engine.start();
    engine.pump(None);
    assert!(engine.metrics().is_none());

    let metrics = engine.run_to_end(None).cloned().expect("completed run");
    let overshoot = metrics.total_time - Duration::from_millis(500);
    assert!(overshoot < Duration::from_millis(16), "{overshoot:?}");
    assert!((metrics.average_fps - 62.5).abs() < 0.1);
    assert_eq!(metrics.frame_drops, 0);
    assert_eq!(metrics.peak_memory_usage, 0);

    engine.prepare(fade_config(500)).unwrap();
    assert!(engine.metrics().is_none());
}

#[test]
fn slow_frames_count_as_drops() {
    let scheduler = ManualScheduler::scripted([
        Duration::from_millis(16),
        Duration::from_millis(80),
        Duration::from_millis(16),
        Duration::from_millis(50),
        Duration::from_millis(16),
    ])
    .unwrap();
    let mut engine = TransitionEngine::new(Renderer::disabled(64, 64), scheduler);
    engine.prepare(fade_config(300)).unwrap();
    engine.start();
    let metrics = engine.run_to_end(None).cloned().unwrap();
    assert_eq!(metrics.frame_drops, 2);
    assert!(metrics.min_fps < 30.0);
}

#[test]
fn failed_custom_program_still_completes() {
    // A disabled renderer compiles nothing, so neither the custom program nor
    // the cross-fade program is available.
    let mut engine = engine_with_step(Duration::from_millis(10));
    let completed = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&completed);
    engine.add_observer(CallbackObserver::new().on_complete(move || *flag.borrow_mut() = true));

    let config = TransitionConfig::new(
        TransitionKind::Custom(CustomParams {
            shader: "swirl".into(),
            source: Some("vec4 transition(vec2 uv) { return mix(getFromColor(uv), getToColor(uv), progress); }".into()),
            ..CustomParams::default()
        }),
        Duration::from_millis(120),
    );
    engine.prepare(config).unwrap();
    assert!(!engine.draws_pixels());
    engine.start();
    engine.run_to_end(None);

    assert!(*completed.borrow());
    assert!(engine.scheduler().now() >= Duration::from_millis(120));
    assert!(engine.scheduler().now() < Duration::from_millis(130));
}

#[test]
fn restart_after_cancel_runs_from_zero() {
    let mut engine = engine_with_step(Duration::from_millis(25));
    engine.prepare(fade_config(100)).unwrap();
    engine.start();
    engine.pump(None);
    engine.cancel();

    assert!(engine.start());
    engine.pump(None);
    assert_eq!(engine.state().current_frame, 1);
    assert!((engine.state().progress - 0.25).abs() < 1e-6);
}
