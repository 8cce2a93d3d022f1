use std::path::Path;

use anyhow::{bail, Context, Result};
use automaton::{Extent, Grid, Parameters, Pipeline, PointerState, CHANNELS};
use presets::{validate_parameters, PresetFile};
use renderer::{NamedPreset, Renderer, RendererConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{HeadlessArgs, ParamArgs, RunArgs};
use crate::export::write_png;
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Built-in presets layered with `explicit`, or with the user presets file
/// when no explicit file is given.
pub fn load_presets(explicit: Option<&Path>) -> Result<PresetFile> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("presets file {} does not exist", path.display());
        }
        let user = PresetFile::load(path)
            .with_context(|| format!("failed to load presets from {}", path.display()))?;
        return PresetFile::builtin()?
            .merged_with(user)
            .with_context(|| format!("invalid presets in {}", path.display()));
    }

    match AppPaths::discover() {
        Ok(paths) => {
            let file = paths.presets_file();
            PresetFile::builtin_with_user(Some(&file))
                .with_context(|| format!("failed to load presets from {}", file.display()))
        }
        Err(err) => {
            tracing::warn!(error = %err, "no user config directory; using built-in presets");
            Ok(PresetFile::builtin()?)
        }
    }
}

/// Applies command-line overrides on top of a preset.
pub fn apply_overrides(mut params: Parameters, args: &ParamArgs) -> Parameters {
    if let Some(dt) = args.dt {
        params.dt = dt;
    }
    if let Some(radius) = args.radius {
        params.outer_radius = radius;
    }
    if let Some(ratio) = args.ratio {
        params.ratio_of_radii = ratio;
    }
    if let Some(radius) = args.brush_radius {
        params.brush_radius = radius;
    }
    params
}

/// Resolves the selected preset with overrides applied and validated.
pub fn resolve_parameters(file: &PresetFile, args: &ParamArgs) -> Result<(String, Parameters)> {
    let (name, params) = file.resolve(args.preset.as_deref())?;
    let params = apply_overrides(params, args);
    validate_parameters(&name, &params)?;
    Ok((name, params))
}

pub fn run(args: RunArgs) -> Result<()> {
    let file = load_presets(args.params.presets.as_deref())?;
    let (selected, params) = resolve_parameters(&file, &args.params)?;

    let mut presets: Vec<NamedPreset> = file
        .presets
        .iter()
        .map(|(name, params)| NamedPreset::new(name.as_str(), *params))
        .collect();
    let initial_preset = match presets.iter().position(|preset| preset.name == selected) {
        Some(index) => {
            presets[index].params = params;
            index
        }
        None => {
            presets.push(NamedPreset::new(selected.as_str(), params));
            presets.len() - 1
        }
    };

    tracing::info!(
        preset = %selected,
        width = args.size.0,
        height = args.size.1,
        scale = args.scale,
        "opening simulation window"
    );
    let config = RendererConfig {
        grid_size: args.size,
        scale: args.scale,
        target_fps: args.fps,
        gpu_power: args.gpu_power,
        kernel_policy: args.params.kernel_policy,
        presets,
        initial_preset,
        ..RendererConfig::default()
    };
    Renderer::new(config).run()
}

/// Summary printed as JSON after a headless run.
#[derive(Debug, Serialize)]
pub struct HeadlessReport {
    pub preset: String,
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    pub mean: [f32; CHANNELS],
    pub max: [f32; CHANNELS],
}

impl HeadlessReport {
    fn from_grid(preset: String, frames: u64, grid: &Grid) -> Self {
        let mut sum = [0.0f64; CHANNELS];
        let mut max = [0.0f32; CHANNELS];
        for cell in grid.cells() {
            for c in 0..CHANNELS {
                sum[c] += f64::from(cell[c]);
                max[c] = max[c].max(cell[c]);
            }
        }
        let count = grid.cells().len().max(1) as f64;
        Self {
            preset,
            width: grid.width(),
            height: grid.height(),
            frames,
            mean: sum.map(|s| (s / count) as f32),
            max,
        }
    }
}

/// Advances the CPU pipeline with a scripted pointer and reseed trigger.
pub fn simulate(params: Parameters, args: &HeadlessArgs) -> Result<Pipeline> {
    let (width, height) = args.size;
    let mut pipeline = Pipeline::with_policy(width, height, &params, args.params.kernel_policy)?;
    let extent = Extent::new(width, height);
    let pointer = match args.paint {
        Some([x, y]) => PointerState::new(x, y, true),
        None => PointerState::centered(extent),
    };

    for frame in 0..args.frames {
        let mut snapshot = params;
        snapshot.random_seed = frame < args.reseed_frames;
        pipeline.tick(snapshot, pointer)?;
    }
    Ok(pipeline)
}

pub fn run_headless(args: HeadlessArgs) -> Result<()> {
    let file = load_presets(args.params.presets.as_deref())?;
    let (name, params) = resolve_parameters(&file, &args.params)?;
    tracing::info!(
        preset = %name,
        frames = args.frames,
        width = args.size.0,
        height = args.size.1,
        "running headless simulation"
    );

    let pipeline = simulate(params, &args)?;
    let grid = pipeline
        .current()
        .context("pipeline has no presented grid")?;

    if let Some(path) = &args.export {
        write_png(grid, path)?;
    }

    let report = HeadlessReport::from_grid(name, pipeline.frame(), grid);
    println!("{}", serde_json::to_string_pretty(&report)?);
    pipeline.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton::KernelPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn headless(frames: u64, paint: Option<[f32; 2]>) -> HeadlessArgs {
        HeadlessArgs {
            params: ParamArgs::default(),
            frames,
            size: (24, 16),
            export: None,
            paint,
            reseed_frames: 0,
        }
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let args = ParamArgs {
            dt: Some(0.05),
            radius: Some(6.0),
            ..ParamArgs::default()
        };
        let params = apply_overrides(Parameters::default(), &args);
        assert_eq!(params.dt, 0.05);
        assert_eq!(params.outer_radius, 6.0);
        assert_eq!(params.ratio_of_radii, Parameters::default().ratio_of_radii);
        assert_eq!(params.brush_radius, Parameters::default().brush_radius);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let file = PresetFile::builtin().unwrap();
        let args = ParamArgs {
            dt: Some(-1.0),
            ..ParamArgs::default()
        };
        assert!(resolve_parameters(&file, &args).is_err());
    }

    #[test]
    fn explicit_presets_file_is_layered_on_builtins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mine.toml");
        fs::write(
            &path,
            "version = 1\ndefault = \"slow\"\n\n[presets.slow]\ndt = 0.01\n",
        )
        .unwrap();

        let file = load_presets(Some(&path)).unwrap();
        assert!(file.preset("smoothlife").is_some());
        let (name, params) = resolve_parameters(&file, &ParamArgs::default()).unwrap();
        assert_eq!(name, "slow");
        assert_eq!(params.dt, 0.01);
    }

    #[test]
    fn explicit_file_default_may_name_a_builtin() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mine.toml");
        fs::write(
            &path,
            "version = 1\ndefault = \"orbium\"\n\n[presets.slow]\ndt = 0.01\n",
        )
        .unwrap();

        let file = load_presets(Some(&path)).unwrap();
        let (name, _) = resolve_parameters(&file, &ParamArgs::default()).unwrap();
        assert_eq!(name, "orbium");

        fs::write(
            &path,
            "version = 1\ndefault = \"nowhere\"\n\n[presets.slow]\ndt = 0.01\n",
        )
        .unwrap();
        assert!(load_presets(Some(&path)).is_err());
    }

    #[test]
    fn missing_explicit_presets_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_presets(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn simulate_counts_frames_and_paints() {
        let params = Parameters {
            dt: 0.0,
            ..Parameters::default()
        };
        let pipeline = simulate(params, &headless(3, Some([4.0, 4.0]))).unwrap();
        assert_eq!(pipeline.frame(), 3);
        assert_eq!(pipeline.policy(), KernelPolicy::Track);
        let grid = pipeline.current().unwrap();
        assert_eq!(grid.get(4, 4), params.brush_color);
        assert_eq!(grid.get(23, 15), [0.0; CHANNELS]);
    }

    #[test]
    fn report_summarises_channels() {
        let mut grid = Grid::new(Extent::new(2, 1)).unwrap();
        grid.set(0, 0, [1.0, 0.5, 0.0]);
        let report = HeadlessReport::from_grid("x".into(), 7, &grid);
        assert_eq!(report.frames, 7);
        assert_eq!(report.mean, [0.5, 0.25, 0.0]);
        assert_eq!(report.max, [1.0, 0.5, 0.0]);
    }
}
