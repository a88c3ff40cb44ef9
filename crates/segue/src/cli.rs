use std::path::PathBuf;

use clap::{Parser, Subcommand};
use presetconfig::TransitionFamily;
use renderer::ColorSpaceMode;

#[derive(Parser, Debug)]
#[command(
    name = "segue",
    author,
    version,
    about = "GPU transition engine: browse presets, simulate runs, export frames"
)]
pub struct Cli {
    /// Extra preset file (TOML) loaded on top of the user preset file.
    #[arg(long, global = true, value_name = "PATH")]
    pub presets: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List built-in and user presets.
    Presets(PresetsArgs),
    /// Drive a transition without drawing and report its timing.
    Simulate(SimulateArgs),
    /// Render every frame of a transition between two images to PNG files.
    Render(RenderArgs),
    /// Print the resolved configuration directory and preset file.
    Where,
}

#[derive(Parser, Debug)]
pub struct PresetsArgs {
    /// Only list presets of this family (fade, slide, zoom, ...).
    #[arg(long, value_name = "FAMILY", value_parser = parse_family)]
    pub category: Option<TransitionFamily>,

    /// Print the presets as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Preset id to run.
    #[arg(value_name = "PRESET", required_unless_present = "config")]
    pub preset: Option<String>,

    /// Transition configuration (JSON) used instead of a preset.
    #[arg(long, value_name = "FILE", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Simulated frame rate.
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub fps: f32,

    /// Pace frames against the wall clock instead of a virtual one.
    #[arg(long)]
    pub realtime: bool,

    /// Print the final state and metrics as JSON only.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Preset id to render.
    #[arg(value_name = "PRESET")]
    pub preset: String,

    /// Outgoing image.
    #[arg(long, value_name = "IMAGE")]
    pub from: PathBuf,

    /// Incoming image.
    #[arg(long, value_name = "IMAGE")]
    pub to: PathBuf,

    /// Directory receiving `frame_NNNN.png` files.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Frames per second of the exported sequence.
    #[arg(long, value_name = "FPS", default_value_t = 30.0)]
    pub fps: f32,

    /// Output size (e.g. `1280x720`); defaults to the size of `--from`.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Output color space handling: `gamma` or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "gamma"
    )]
    pub color_space: ColorSpaceMode,

    /// Refuse software rasterizers when picking a GPU adapter.
    #[arg(long)]
    pub no_software: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_family(value: &str) -> Result<TransitionFamily, String> {
    value.parse().map_err(|err: presetconfig::ConfigError| {
        format!("{err}; expected one of fade, slide, zoom, wipe, glitch, blur, dissolve, custom")
    })
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let (width, height) = spec
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;
    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected gamma or linear"
        )),
    }
}
