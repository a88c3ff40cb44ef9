use std::collections::HashMap;
use std::time::{Duration, Instant};

use presetconfig::{ConfigError, TransitionConfig, TransitionFamily, TransitionKind};
use rand::prelude::*;
use renderer::Renderer;
use scheduler::FrameScheduler;
use shaderlib::{wrap_custom_fragment, ShaderLibrary};

use crate::compose::{Composition, FrameInput, ProgramPlan};
use crate::metrics::{FrameWindow, TransitionMetrics};
use crate::observer::TransitionObserver;
use crate::presets::{PresetCatalog, PresetError, TransitionPreset};
use crate::state::{TransitionPhase, TransitionState};

/// Drives one transition at a time from `prepare` to completion.
///
/// The engine owns the renderer, the frame scheduler, the preset catalog and
/// the custom shader registry. Time only moves when the scheduler delivers a
/// frame, so a [`scheduler::ManualScheduler`] makes runs fully reproducible.
pub struct TransitionEngine<S: FrameScheduler> {
    renderer: Renderer,
    scheduler: S,
    library: ShaderLibrary,
    catalog: PresetCatalog,
    custom_shaders: HashMap<String, String>,
    compiled_custom: HashMap<String, String>,
    observers: Vec<Box<dyn TransitionObserver>>,
    config: Option<TransitionConfig>,
    composition: Option<Composition>,
    state: TransitionState,
    started_at: Option<Duration>,
    last_frame_at: Option<Duration>,
    window: FrameWindow,
    peak_memory: u64,
    metrics: Option<TransitionMetrics>,
    rng: StdRng,
}

impl<S: FrameScheduler> TransitionEngine<S> {
    /// Engine with the built-in shader library and preset catalog.
    pub fn new(renderer: Renderer, scheduler: S) -> Self {
        Self::with_registries(
            renderer,
            scheduler,
            ShaderLibrary::builtin(),
            PresetCatalog::builtin(),
        )
    }

    pub fn with_registries(
        renderer: Renderer,
        scheduler: S,
        library: ShaderLibrary,
        catalog: PresetCatalog,
    ) -> Self {
        Self {
            renderer,
            scheduler,
            library,
            catalog,
            custom_shaders: HashMap::new(),
            compiled_custom: HashMap::new(),
            observers: Vec::new(),
            config: None,
            composition: None,
            state: TransitionState::default(),
            started_at: None,
            last_frame_at: None,
            window: FrameWindow::default(),
            peak_memory: 0,
            metrics: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeds the generator behind glitch and dissolve randomness.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    /// Metrics of the last completed run. `None` until a run completes and
    /// again after each `prepare`.
    pub fn metrics(&self) -> Option<&TransitionMetrics> {
        self.metrics.as_ref()
    }

    pub fn config(&self) -> Option<&TransitionConfig> {
        self.config.as_ref()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    /// Whether the prepared run draws pixels. `false` in degraded mode, with
    /// `GpuMode::Disabled`, or before `prepare`.
    pub fn draws_pixels(&self) -> bool {
        self.composition
            .as_ref()
            .is_some_and(Composition::draws_pixels)
    }

    /// Whether the prepared run fell back to the cross-fade program.
    pub fn uses_fallback_program(&self) -> bool {
        self.composition
            .as_ref()
            .is_some_and(Composition::is_fallback)
    }

    pub fn add_observer(&mut self, observer: impl TransitionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    fn notify(&mut self, event: impl Fn(&mut dyn TransitionObserver)) {
        for observer in &mut self.observers {
            event(observer.as_mut());
        }
    }

    fn set_phase(&mut self, phase: TransitionPhase) {
        if self.state.phase != phase {
            tracing::debug!(from = %self.state.phase, to = %phase, "transition phase");
            self.state.phase = phase;
        }
    }

    /// Stores `config` and resets the run to `idle` with zero progress.
    ///
    /// Invalid configurations are rejected before anything changes. A run
    /// that is still active is cancelled first.
    pub fn prepare(&mut self, config: TransitionConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let registered = match &config.kind {
            TransitionKind::Custom(params) if params.source.is_none() => {
                self.custom_shaders.get(&params.shader).map(String::as_str)
            }
            _ => None,
        };
        let plan = ProgramPlan::resolve(&config, &self.library, registered)?;

        if self.state.is_active {
            self.cancel();
        }

        self.set_phase(TransitionPhase::Preparing);
        let seed = self.rng.gen_range(0.0f32..1000.0);
        let composition =
            Composition::build(&mut self.renderer, &self.library, &config, &plan, seed);
        if let TransitionKind::Custom(params) = &config.kind {
            self.compiled_custom
                .insert(params.shader.clone(), plan.key.clone());
        }
        tracing::debug!(
            family = %config.family(),
            duration_ms = config.duration.as_millis() as u64,
            program = %plan.key,
            draws_pixels = composition.draws_pixels(),
            "prepared transition"
        );

        self.state = TransitionState {
            phase: TransitionPhase::Preparing,
            ..TransitionState::idle(config.duration)
        };
        self.composition = Some(composition);
        self.config = Some(config);
        self.started_at = None;
        self.last_frame_at = None;
        self.window.clear();
        self.peak_memory = 0;
        self.metrics = None;
        self.set_phase(TransitionPhase::Idle);
        Ok(())
    }

    /// Starts the prepared run. Does nothing without a prepared configuration,
    /// while a run is active, or after completion.
    pub fn start(&mut self) -> bool {
        let Some(duration) = self.config.as_ref().map(|config| config.duration) else {
            tracing::debug!("start ignored: nothing prepared");
            return false;
        };
        if self.state.is_active || self.state.phase != TransitionPhase::Idle {
            tracing::debug!(phase = %self.state.phase, "start ignored");
            return false;
        }

        let now = self.scheduler.now();
        self.started_at = Some(now);
        self.last_frame_at = Some(now);
        self.state = TransitionState {
            is_active: true,
            remaining: duration,
            gpu_memory_usage: self.renderer.estimate_gpu_memory_usage(),
            ..TransitionState::default()
        };
        self.set_phase(TransitionPhase::Running);
        self.notify(|observer| observer.on_start());
        self.scheduler.request_frame();
        true
    }

    /// Stops an active run immediately. Observers get `on_cancel`, never
    /// `on_complete`.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_active {
            return false;
        }
        self.scheduler.cancel_frame();
        let duration = self
            .config
            .as_ref()
            .map(|config| config.duration)
            .unwrap_or_default();
        let frames = self.state.current_frame;
        self.state = TransitionState::idle(duration);
        self.started_at = None;
        self.last_frame_at = None;
        self.set_phase(TransitionPhase::Idle);
        tracing::debug!(frames, "transition cancelled");
        self.notify(|observer| observer.on_cancel());
        true
    }

    /// Clears the prepared configuration and returns to a fresh `idle` state.
    /// Metrics of the last completed run are kept.
    pub fn reset(&mut self) {
        self.cancel();
        self.config = None;
        self.composition = None;
        self.state = TransitionState::default();
        self.window.clear();
    }

    /// Waits for the scheduled frame and processes it. Returns `false` when no
    /// run is active.
    pub fn pump(&mut self, frame: Option<&FrameInput<'_>>) -> bool {
        if !self.state.is_active {
            return false;
        }
        match self.scheduler.wait_for_frame() {
            Some(now) => {
                self.tick(now, frame);
                true
            }
            None => {
                // An active run always has a request outstanding; re-arm it.
                self.scheduler.request_frame();
                false
            }
        }
    }

    /// Pumps frames until the run completes or is cancelled, drawing the same
    /// surfaces every frame. Returns the metrics if it completed.
    pub fn run_to_end(&mut self, frame: Option<&FrameInput<'_>>) -> Option<&TransitionMetrics> {
        while self.state.is_active {
            if !self.pump(frame) && !self.scheduler.has_pending_frame() {
                break;
            }
        }
        self.metrics.as_ref()
    }

    /// Draws the current progress without advancing time.
    pub fn render_frame(&mut self, frame: Option<&FrameInput<'_>>) -> bool {
        let (Some(config), Some(composition)) = (self.config.as_ref(), self.composition.as_ref())
        else {
            return false;
        };
        let eased = config.easing.sample(self.state.progress);
        composition.render(&mut self.renderer, config, eased, frame)
    }

    fn tick(&mut self, now: Duration, frame: Option<&FrameInput<'_>>) {
        let (Some(duration), Some(started_at)) =
            (self.config.as_ref().map(|config| config.duration), self.started_at)
        else {
            return;
        };

        let elapsed = now.saturating_sub(started_at);
        let finished = elapsed >= duration;
        let progress = if finished {
            1.0
        } else {
            let ratio = (elapsed.as_secs_f64() / duration.as_secs_f64()) as f32;
            ratio.clamp(0.0, 1.0).max(self.state.progress)
        };

        if let Some(last) = self.last_frame_at {
            self.window.record_interval(now.saturating_sub(last));
        }
        self.last_frame_at = Some(now);

        self.state.elapsed = elapsed.min(duration);
        self.state.remaining = duration.saturating_sub(elapsed);
        self.state.progress = progress;
        self.state.fps = self.window.fps();
        self.state.current_frame += 1;

        let cpu_start = Instant::now();
        self.render_frame(frame);
        self.window.record_cpu(cpu_start.elapsed());

        self.state.gpu_memory_usage = self.renderer.estimate_gpu_memory_usage();
        self.peak_memory = self.peak_memory.max(self.state.gpu_memory_usage);

        self.notify(|observer| observer.on_progress(progress));

        if finished {
            self.complete(elapsed);
        } else {
            self.scheduler.request_frame();
        }
    }

    fn complete(&mut self, total_time: Duration) {
        self.set_phase(TransitionPhase::Completing);
        self.scheduler.cancel_frame();
        self.state.is_active = false;

        let metrics = self.window.summarize(
            total_time,
            self.state.current_frame,
            self.peak_memory,
            self.draws_pixels(),
        );
        let family = self
            .config
            .as_ref()
            .map_or("none", |config| config.family().as_str());
        tracing::info!(
            family,
            total_ms = metrics.total_time.as_millis() as u64,
            frames = metrics.frames,
            avg_fps = f64::from(metrics.average_fps),
            min_fps = f64::from(metrics.min_fps),
            max_fps = f64::from(metrics.max_fps),
            frame_drops = metrics.frame_drops,
            peak_memory = metrics.peak_memory_usage,
            "transition complete"
        );
        self.metrics = Some(metrics);
        self.set_phase(TransitionPhase::Complete);
        self.notify(|observer| observer.on_complete());
    }

    /// Registers fragment source for custom configs that name `id`. The source
    /// must define `vec4 transition(vec2 uv)`. Replacing a registered shader
    /// evicts its compiled program.
    pub fn register_custom_shader(
        &mut self,
        id: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let id = id.into();
        let source = source.into();
        if id.trim().is_empty() {
            return Err(ConfigError::Invalid("custom shader id must not be empty".into()));
        }
        wrap_custom_fragment(&source, &[])?;
        self.evict_custom(&id);
        tracing::debug!(shader = %id, "registered custom shader");
        self.custom_shaders.insert(id, source);
        Ok(())
    }

    pub fn unregister_custom_shader(&mut self, id: &str) -> bool {
        self.evict_custom(id);
        self.custom_shaders.remove(id).is_some()
    }

    pub fn has_custom_shader(&self, id: &str) -> bool {
        self.custom_shaders.contains_key(id)
    }

    fn evict_custom(&mut self, id: &str) {
        if let Some(key) = self.compiled_custom.remove(id) {
            self.renderer.evict_program(&key);
        }
    }

    pub fn preset(&self, id: &str) -> Option<&TransitionPreset> {
        self.catalog.get(id)
    }

    pub fn presets(&self) -> Vec<&TransitionPreset> {
        self.catalog.all()
    }

    pub fn presets_by_category(&self, category: TransitionFamily) -> Vec<&TransitionPreset> {
        self.catalog.by_category(category)
    }

    pub fn add_custom_preset(
        &mut self,
        preset: TransitionPreset,
    ) -> Result<Option<TransitionPreset>, PresetError> {
        self.catalog.add_custom(preset)
    }

    pub fn remove_preset(&mut self, id: &str) -> Option<TransitionPreset> {
        self.catalog.remove(id)
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut PresetCatalog {
        &mut self.catalog
    }

    /// Prepares the default configuration of a preset.
    pub fn prepare_preset(&mut self, id: &str) -> Result<(), ConfigError> {
        let config = self
            .catalog
            .get(id)
            .map(|preset| preset.config.clone())
            .ok_or_else(|| ConfigError::Invalid(format!("unknown preset '{id}'")))?;
        self.prepare(config)
    }
}
