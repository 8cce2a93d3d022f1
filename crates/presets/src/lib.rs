//! Named parameter sets stored as TOML.
//!
//! ```toml
//! version = 1
//! default = "smoothlife"
//!
//! [presets.smoothlife]
//! dt = 0.3
//! outer_radius = 13.0
//! ```
//!
//! Keys inside a preset are [`Parameters`] fields; missing keys take the
//! built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use automaton::Parameters;
use serde::{Deserialize, Serialize};

/// Presets compiled into the binary; always available.
pub const BUILTIN_PRESETS: &str = include_str!("../presets.toml");

pub const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse presets: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize preset: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to read presets file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid presets: {0}")]
    Invalid(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresetFile {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub presets: BTreeMap<String, Parameters>,
}

impl PresetFile {
    /// Parses and checks every preset. `default` may name a preset from
    /// another file, so it is only checked by [`PresetFile::validate`] once
    /// files are merged.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PresetFile = toml::from_str(input)?;
        raw.validate_entries()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), presets = file.presets.len(), "loaded presets");
        Ok(file)
    }

    /// The embedded preset set.
    pub fn builtin() -> Result<Self, ConfigError> {
        let file = Self::from_toml_str(BUILTIN_PRESETS)?;
        file.validate()?;
        Ok(file)
    }

    /// Built-in presets, overlaid with `path` when it exists.
    pub fn builtin_with_user(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builtin = Self::builtin()?;
        match path {
            Some(path) if path.exists() => builtin.merged_with(Self::load(path)?),
            Some(path) => {
                tracing::debug!(path = %path.display(), "no user presets file");
                Ok(builtin)
            }
            None => Ok(builtin),
        }
    }

    /// Overlays `user` on `self`: same-named presets and a set default win.
    /// The merged default must name a preset from either file.
    pub fn merged_with(mut self, user: PresetFile) -> Result<Self, ConfigError> {
        for (name, params) in user.presets {
            if self.presets.insert(name.clone(), params).is_some() {
                tracing::debug!(preset = %name, "user preset overrides built-in");
            }
        }
        if user.default.is_some() {
            self.default = user.default;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn preset(&self, name: &str) -> Option<&Parameters> {
        self.presets.get(name)
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Looks up `name`, or the file default, or falls back to
    /// [`Parameters::default`] when neither is set.
    pub fn resolve(&self, name: Option<&str>) -> Result<(String, Parameters), ConfigError> {
        match name.or(self.default_name()) {
            Some(name) => self
                .preset(name)
                .map(|params| (name.to_string(), *params))
                .ok_or_else(|| ConfigError::UnknownPreset(name.to_string())),
            None => Ok(("default".to_string(), Parameters::default())),
        }
    }

    /// Full check of a complete preset set, including the default reference.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_entries()?;
        if let Some(default) = &self.default {
            if !self.presets.contains_key(default) {
                return Err(ConfigError::Invalid(format!(
                    "default references unknown preset '{default}'"
                )));
            }
        }
        Ok(())
    }

    fn validate_entries(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported presets version {}; expected {SUPPORTED_VERSION}",
                self.version
            )));
        }

        if self.presets.is_empty() {
            return Err(ConfigError::Invalid(
                "presets file must define at least one preset".into(),
            ));
        }

        for (name, params) in &self.presets {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("preset name may not be empty".into()));
            }
            validate_parameters(name, params)?;
        }

        Ok(())
    }
}

/// Rejects values the pipeline would otherwise have to clamp silently.
pub fn validate_parameters(name: &str, params: &Parameters) -> Result<(), ConfigError> {
    for (field, value) in params.scalars() {
        if !value.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "preset '{name}' {field} must be finite"
            )));
        }
    }

    if params.dt < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "preset '{name}' dt must be >= 0"
        )));
    }

    if params.brush_radius < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "preset '{name}' brush_radius must be >= 0"
        )));
    }

    for (field, value) in [("fullness1", params.fullness1), ("fullness2", params.fullness2)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Invalid(format!(
                "preset '{name}' {field} must be within [0, 1]"
            )));
        }
    }

    if params.brush_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return Err(ConfigError::Invalid(format!(
            "preset '{name}' brush_color components must be within [0, 1]"
        )));
    }

    Ok(())
}

/// Renders one preset as a standalone `[presets.<name>]` table.
pub fn to_toml_string(name: &str, params: &Parameters) -> Result<String, ConfigError> {
    let mut presets = BTreeMap::new();
    presets.insert(name.to_string(), *params);
    let file = PresetFile {
        version: SUPPORTED_VERSION,
        default: None,
        presets,
    };
    Ok(toml::to_string_pretty(&file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton::KernelProfile;

    #[test]
    fn builtin_presets_parse() {
        let file = PresetFile::builtin().expect("parse built-in presets");
        assert_eq!(file.default_name(), Some("smoothlife"));
        let (name, params) = file.resolve(None).unwrap();
        assert_eq!(name, "smoothlife");
        assert_eq!(params, Parameters::default());
        assert_eq!(
            file.preset("orbium").unwrap().kernel_profile,
            KernelProfile::Unimodal
        );
    }

    #[test]
    fn missing_keys_take_defaults() {
        let file = PresetFile::from_toml_str(
            r#"
version = 1

[presets.tiny]
outer_radius = 4.0
"#,
        )
        .unwrap();
        let params = file.preset("tiny").unwrap();
        assert_eq!(params.outer_radius, 4.0);
        assert_eq!(params.dt, Parameters::default().dt);
    }

    #[test]
    fn rejects_unknown_version_and_default() {
        let err = PresetFile::from_toml_str("version = 2\n[presets.a]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let user = PresetFile::from_toml_str(
            r#"
version = 1
default = "missing"

[presets.a]
dt = 0.1
"#,
        )
        .unwrap();
        let err = user.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("missing")));

        let err = PresetFile::builtin().unwrap().merged_with(user).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("missing")));
    }

    #[test]
    fn user_default_may_name_a_builtin_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.toml");
        fs::write(
            &path,
            r#"
version = 1
default = "orbium"

[presets.mine]
dt = 0.05
"#,
        )
        .unwrap();

        let merged = PresetFile::builtin_with_user(Some(&path)).unwrap();
        assert_eq!(merged.default_name(), Some("orbium"));
        assert!(merged.preset("mine").is_some());
        let (name, params) = merged.resolve(None).unwrap();
        assert_eq!(name, "orbium");
        assert_eq!(params.kernel_profile, KernelProfile::Unimodal);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for body in [
            "dt = -0.1",
            "brush_radius = -1.0",
            "fullness2 = 1.5",
            "brush_color = [0.0, 2.0, 0.0]",
            "birth1 = nan",
            "outer_radius = inf",
        ] {
            let input = format!("version = 1\n[presets.bad]\n{body}\n");
            let err = PresetFile::from_toml_str(&input).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{body}: {err}");
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PresetFile::from_toml_str("version = 1\n[presets.a]\nspeed = 2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_preset_table() {
        let err = PresetFile::from_toml_str("version = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn user_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.toml");
        fs::write(
            &path,
            r#"
version = 1
default = "mine"

[presets.mine]
dt = 0.05

[presets.smoothlife]
dt = 0.2
"#,
        )
        .unwrap();

        let merged = PresetFile::builtin_with_user(Some(&path)).unwrap();
        assert_eq!(merged.default_name(), Some("mine"));
        assert_eq!(merged.preset("smoothlife").unwrap().dt, 0.2);
        assert!(merged.preset("orbium").is_some());

        let missing = dir.path().join("absent.toml");
        let fallback = PresetFile::builtin_with_user(Some(&missing)).unwrap();
        assert_eq!(fallback, PresetFile::builtin().unwrap());
    }

    #[test]
    fn resolve_reports_unknown_name() {
        let file = PresetFile::builtin().unwrap();
        let err = file.resolve(Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset(name) if name == "nope"));
    }

    #[test]
    fn serialized_preset_round_trips() {
        let params = Parameters {
            dt: 0.125,
            ..Parameters::default()
        };
        let text = to_toml_string("custom", &params).unwrap();
        let file = PresetFile::from_toml_str(&text).unwrap();
        assert_eq!(file.preset("custom"), Some(&params));
    }
}
