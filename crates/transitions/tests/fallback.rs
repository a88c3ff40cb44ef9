//! Runs against a real adapter when one exists; machines without any usable
//! adapter (including a software one) skip these checks.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use presetconfig::{CustomParams, TransitionConfig, TransitionKind};
use renderer::{FrameSource, RenderTarget, Renderer, RendererOptions};
use scheduler::{FrameScheduler, ManualScheduler};
use transitions::{CallbackObserver, FrameInput, TransitionEngine, TransitionPhase};

const SIZE: u32 = 16;

fn headless_engine() -> Option<TransitionEngine<ManualScheduler>> {
    let renderer = Renderer::initialize(
        RenderTarget::headless(SIZE, SIZE),
        RendererOptions::default(),
    );
    if !renderer.is_gpu_enabled() {
        eprintln!("no GPU adapter available; skipping");
        return None;
    }
    let scheduler = ManualScheduler::fixed(Duration::from_millis(20)).expect("non-zero step");
    Some(TransitionEngine::new(renderer, scheduler).with_seed(3))
}

fn solid(rgba: [u8; 4]) -> Vec<u8> {
    rgba.repeat((SIZE * SIZE) as usize)
}

#[test]
fn uncompilable_custom_shader_runs_as_crossfade() {
    let Some(mut engine) = headless_engine() else {
        return;
    };
    let completed = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&completed);
    engine.add_observer(CallbackObserver::new().on_complete(move || *sink.borrow_mut() += 1));

    // Wraps cleanly, but the helper it calls does not exist.
    let config = TransitionConfig::new(
        TransitionKind::Custom(CustomParams {
            shader: "melt".into(),
            source: Some(
                "vec4 transition(vec2 uv) { return meltTogether(getFromColor(uv), getToColor(uv), progress); }"
                    .into(),
            ),
            ..CustomParams::default()
        }),
        Duration::from_millis(200),
    );
    engine.prepare(config).unwrap();
    assert!(engine.uses_fallback_program());
    assert!(engine.draws_pixels());

    let red = solid([255, 0, 0, 255]);
    let blue = solid([0, 0, 255, 255]);
    let input = FrameInput::new(
        FrameSource::new(SIZE, SIZE, &red),
        FrameSource::new(SIZE, SIZE, &blue),
    );
    assert!(engine.start());
    engine.run_to_end(Some(&input));

    assert_eq!(*completed.borrow(), 1);
    assert_eq!(engine.state().phase, TransitionPhase::Complete);
    assert_eq!(engine.scheduler().now(), Duration::from_millis(200));

    let frame = engine.renderer().read_output().expect("headless output reads back");
    let pixel = frame.get_pixel(SIZE / 2, SIZE / 2).0;
    assert!(pixel[2] > 240 && pixel[0] < 16, "final frame was {pixel:?}");
}
