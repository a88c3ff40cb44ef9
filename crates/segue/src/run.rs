use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use image::imageops::FilterType;
use image::RgbaImage;
use presetconfig::{PresetFile, TransitionConfig};
use renderer::{FrameSource, RenderTarget, Renderer, RendererOptions};
use scheduler::{FrameScheduler, IntervalScheduler, ManualScheduler};
use serde_json::json;
use shaderlib::ShaderLibrary;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transitions::{FrameInput, PresetCatalog, TransitionEngine, TransitionMetrics};

use crate::cli::{Cli, Command, PresetsArgs, RenderArgs, SimulateArgs};
use crate::paths::AppPaths;

/// Surface size reported by timing-only runs.
const SIMULATED_SIZE: (u32, u32) = (1920, 1080);

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    let catalog = load_catalog(&paths, cli.presets.as_deref())?;

    match cli.command {
        Command::Presets(args) => list_presets(&catalog, args),
        Command::Simulate(args) => simulate(catalog, args),
        Command::Render(args) => render(catalog, args),
        Command::Where => {
            println!("config dir:  {}", paths.config_dir().display());
            println!("preset file: {}", paths.preset_file().display());
            Ok(())
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output (JSON included); logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Built-in presets, then the user preset file, then `--presets`.
fn load_catalog(paths: &AppPaths, extra: Option<&Path>) -> Result<PresetCatalog> {
    let mut catalog = PresetCatalog::builtin();

    let user_file = paths.preset_file();
    if user_file.is_file() {
        merge_preset_file(&mut catalog, &user_file)?;
    }
    if let Some(path) = extra {
        if !path.is_file() {
            bail!("preset file {} does not exist", path.display());
        }
        merge_preset_file(&mut catalog, path)?;
    }
    Ok(catalog)
}

fn merge_preset_file(catalog: &mut PresetCatalog, path: &Path) -> Result<()> {
    let file = PresetFile::load(path)
        .with_context(|| format!("failed to read presets from {}", path.display()))?;
    let count = catalog
        .load_file(file)
        .with_context(|| format!("invalid preset in {}", path.display()))?;
    info!(path = %path.display(), count, "loaded user presets");
    Ok(())
}

fn list_presets(catalog: &PresetCatalog, args: PresetsArgs) -> Result<()> {
    let presets = match args.category {
        Some(category) => catalog.by_category(category),
        None => catalog.all(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    for preset in presets {
        let origin = if catalog.is_builtin(&preset.id) {
            "builtin"
        } else {
            "user"
        };
        println!(
            "{:<18} {:<9} {:>6}ms  {}/5  {:<7}  {}",
            preset.id,
            preset.category.as_str(),
            preset.config.duration.as_millis(),
            preset.performance_rating,
            origin,
            preset.name
        );
    }
    Ok(())
}

fn simulate(catalog: PresetCatalog, args: SimulateArgs) -> Result<()> {
    let config = resolve_config(&catalog, args.preset.as_deref(), args.config.as_deref())?;
    let renderer = Renderer::disabled(SIMULATED_SIZE.0, SIMULATED_SIZE.1);

    if args.realtime {
        let scheduler = IntervalScheduler::new(args.fps)?;
        let engine = TransitionEngine::with_registries(
            renderer,
            scheduler,
            ShaderLibrary::builtin(),
            catalog,
        );
        drive_simulation(engine, config, args.json)
    } else {
        let scheduler = ManualScheduler::from_fps(args.fps)?;
        let engine = TransitionEngine::with_registries(
            renderer,
            scheduler,
            ShaderLibrary::builtin(),
            catalog,
        );
        drive_simulation(engine, config, args.json)
    }
}

fn resolve_config(
    catalog: &PresetCatalog,
    preset: Option<&str>,
    config: Option<&Path>,
) -> Result<TransitionConfig> {
    if let Some(path) = config {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return TransitionConfig::from_json(&json)
            .with_context(|| format!("invalid transition config in {}", path.display()));
    }
    let id = preset.ok_or_else(|| anyhow!("either a preset id or --config is required"))?;
    catalog
        .get(id)
        .map(|preset| preset.config.clone())
        .ok_or_else(|| anyhow!("unknown preset '{id}'; run `segue presets` to list them"))
}

fn drive_simulation<S: FrameScheduler>(
    mut engine: TransitionEngine<S>,
    config: TransitionConfig,
    json: bool,
) -> Result<()> {
    engine.prepare(config)?;
    if !engine.start() {
        bail!("transition refused to start");
    }

    while engine.state().is_active {
        engine.pump(None);
        if !json {
            let state = engine.state();
            println!(
                "frame {:>4}  t={:>6}ms  progress={:.3}  fps={:.1}",
                state.current_frame,
                state.elapsed.as_millis(),
                state.progress,
                state.fps
            );
        }
    }

    let metrics = engine
        .metrics()
        .ok_or_else(|| anyhow!("transition finished without metrics"))?;
    if json {
        let report = json!({ "state": engine.state(), "metrics": metrics });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_metrics(metrics);
    }
    Ok(())
}

fn print_metrics(metrics: &TransitionMetrics) {
    println!("total time:   {}ms", metrics.total_time.as_millis());
    println!("frames:       {}", metrics.frames);
    println!(
        "fps:          avg {:.1}  min {:.1}  max {:.1}",
        metrics.average_fps, metrics.min_fps, metrics.max_fps
    );
    println!("frame drops:  {}", metrics.frame_drops);
    println!("cpu / frame:  {:.3}ms", millis(metrics.average_cpu_time));
    println!("gpu / frame:  {:.3}ms (estimated)", millis(metrics.estimated_gpu_time));
    println!("peak memory:  {} bytes", metrics.peak_memory_usage);
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn render(catalog: PresetCatalog, args: RenderArgs) -> Result<()> {
    let config = resolve_config(&catalog, Some(&args.preset), None)?;

    let from = load_image(&args.from)?;
    let (width, height) = args.size.unwrap_or_else(|| from.dimensions());
    let from = fit_image(from, width, height);
    let to = fit_image(load_image(&args.to)?, width, height);

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let options = RendererOptions {
        color_space: args.color_space,
        allow_software: !args.no_software,
        vsync: false,
        ..RendererOptions::default()
    };
    let renderer = Renderer::initialize(RenderTarget::headless(width, height), options);
    if !renderer.is_gpu_enabled() {
        warn!("no GPU adapter available; running the transition without output frames");
    }

    let scheduler = ManualScheduler::from_fps(args.fps)?;
    let mut engine =
        TransitionEngine::with_registries(renderer, scheduler, ShaderLibrary::builtin(), catalog);
    engine.prepare(config)?;
    if !engine.start() {
        bail!("transition refused to start");
    }

    let input = FrameInput::new(
        FrameSource::new(width, height, from.as_raw()),
        FrameSource::new(width, height, to.as_raw()),
    );

    let mut written = 0usize;
    engine.render_frame(Some(&input));
    written += save_frame(&engine, &args.out, 0)?;
    while engine.state().is_active {
        engine.pump(Some(&input));
        written += save_frame(&engine, &args.out, engine.state().current_frame)?;
    }

    if let Some(metrics) = engine.metrics() {
        print_metrics(metrics);
    }
    info!(frames = written, out = %args.out.display(), "render finished");
    Ok(())
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn fit_image(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        image::imageops::resize(&image, width, height, FilterType::Triangle)
    }
}

/// Writes the renderer's current output; returns how many files were written.
fn save_frame<S: FrameScheduler>(
    engine: &TransitionEngine<S>,
    dir: &Path,
    index: u64,
) -> Result<usize> {
    let Some(frame) = engine.renderer().read_output() else {
        return Ok(0);
    };
    let path = dir.join(format!("frame_{index:04}.png"));
    frame
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(1)
}
