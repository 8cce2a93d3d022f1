use std::path::PathBuf;

use automaton::KernelPolicy;
use clap::{Args, Parser, Subcommand};
use renderer::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "chromalife",
    author,
    version,
    about = "Three-channel continuous cellular automaton",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options for the interactive window.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    /// Simulation grid size in cells (e.g. `512x512`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "512x512")]
    pub size: (u32, u32),

    /// Window pixels per grid cell.
    #[arg(long, value_name = "N", value_parser = parse_scale, default_value_t = 2)]
    pub scale: u32,

    /// Optional FPS cap; renders on every vsync when omitted.
    #[arg(long, value_name = "FPS", value_parser = parse_fps)]
    pub fps: Option<f32>,

    /// Adapter preference: `low` or `high`.
    #[arg(
        long,
        value_name = "POWER",
        value_parser = parse_gpu_power,
        default_value = "high"
    )]
    pub gpu_power: GpuPowerPreference,
}

/// Preset selection and per-run parameter overrides shared by every mode.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Preset name; defaults to the presets file's `default`.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Presets TOML file layered over the built-in presets.
    #[arg(long, value_name = "FILE")]
    pub presets: Option<PathBuf>,

    /// `track` rebuilds the kernel when its parameters change; `frozen` keeps
    /// the start-up kernel.
    #[arg(
        long,
        value_name = "POLICY",
        value_parser = parse_kernel_policy,
        default_value = "track"
    )]
    pub kernel_policy: KernelPolicy,

    /// Override the integration step.
    #[arg(long, value_name = "DT")]
    pub dt: Option<f32>,

    /// Override the kernel outer radius in cells.
    #[arg(long, value_name = "CELLS")]
    pub radius: Option<f32>,

    /// Override the core-to-outer radius ratio.
    #[arg(long, value_name = "RATIO")]
    pub ratio: Option<f32>,

    /// Override the brush radius in cells.
    #[arg(long, value_name = "CELLS")]
    pub brush_radius: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the CPU pipeline without a window and optionally export a PNG.
    Headless(HeadlessArgs),
    /// Inspect the available presets.
    Presets(PresetsCommand),
}

#[derive(Args, Debug)]
pub struct HeadlessArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    /// Number of frames to simulate.
    #[arg(long, value_name = "N", default_value_t = 60)]
    pub frames: u64,

    /// Grid size in cells.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "128x128")]
    pub size: (u32, u32),

    /// Write the final grid to this PNG file.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Hold the pointer down at grid cell `X,Y` for every frame.
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    pub paint: Option<[f32; 2]>,

    /// Hold the reseed trigger for the first N frames.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub reseed_frames: u64,
}

#[derive(Args, Debug)]
pub struct PresetsCommand {
    /// Presets TOML file layered over the built-in presets.
    #[arg(long, value_name = "FILE", global = true)]
    pub presets: Option<PathBuf>,

    #[command(subcommand)]
    pub action: PresetsAction,
}

#[derive(Subcommand, Debug)]
pub enum PresetsAction {
    /// List preset names, marking the default.
    List,
    /// Print one preset as TOML, or JSON with `--json`.
    Show {
        #[arg(value_name = "NAME")]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print where the user presets file is looked up.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero in both dimensions".to_string());
    }
    Ok((width, height))
}

pub fn parse_scale(value: &str) -> Result<u32, String> {
    let scale: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid scale '{value}'"))?;
    if scale == 0 {
        return Err("scale must be at least 1".to_string());
    }
    Ok(scale)
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid FPS '{value}'"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err("FPS must be a positive number".to_string());
    }
    Ok(fps)
}

pub fn parse_point(value: &str) -> Result<[f32; 2], String> {
    let trimmed = value.trim();
    let (x, y) = trimmed
        .split_once(',')
        .ok_or_else(|| format!("invalid point '{trimmed}'; expected X,Y"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate '{}' in '{trimmed}'", part.trim()))
    };
    Ok([parse(x)?, parse(y)?])
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" => Ok(GpuPowerPreference::High),
        _ => Err("unknown GPU power preference (expected low or high)".to_string()),
    }
}

pub fn parse_kernel_policy(value: &str) -> Result<KernelPolicy, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "track" => Ok(KernelPolicy::Track),
        "frozen" | "freeze" => Ok(KernelPolicy::Frozen),
        _ => Err("unknown kernel policy (expected track or frozen)".to_string()),
    }
}
