mod cli;
mod export;
mod paths;
mod run;

use anyhow::{Context, Result};
use cli::{Command, PresetsAction, PresetsCommand};
use paths::AppPaths;
use presets::{to_toml_string, PresetFile};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Headless(args)) => run::run_headless(args),
        Some(Command::Presets(presets_cmd)) => handle_presets_command(presets_cmd),
        None => run::run(cli.run),
    }
}

fn handle_presets_command(command: PresetsCommand) -> Result<()> {
    match command.action {
        PresetsAction::Where => run_presets_where(),
        PresetsAction::List => {
            let file = run::load_presets(command.presets.as_deref())?;
            run_presets_list(&file);
            Ok(())
        }
        PresetsAction::Show { name, json } => {
            let file = run::load_presets(command.presets.as_deref())?;
            run_presets_show(&file, name.as_deref(), json)
        }
    }
}

fn run_presets_list(file: &PresetFile) {
    let default = file.default_name();
    println!("Presets:");
    for (name, params) in &file.presets {
        let marker = if Some(name.as_str()) == default { "*" } else { " " };
        println!(
            "{marker} {name:<16} profile={:<9} R={:<5} dt={}",
            params.kernel_profile.as_str(),
            params.outer_radius,
            params.dt
        );
    }
}

fn run_presets_show(file: &PresetFile, name: Option<&str>, json: bool) -> Result<()> {
    let (name, params) = file.resolve(name)?;
    if json {
        let rendered = serde_json::to_string_pretty(&params)
            .context("failed to serialise preset as JSON")?;
        println!("{rendered}");
    } else {
        print!("{}", to_toml_string(&name, &params)?);
    }
    Ok(())
}

fn run_presets_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = paths.presets_file();
    println!("Configuration directory: {}", paths.config_dir().display());
    println!(
        "User presets file:       {} ({})",
        file.display(),
        if file.exists() { "present" } else { "missing" }
    );
    println!("Override with ${}", paths::ENV_CONFIG_DIR);
    Ok(())
}
