use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use worldforge_core::{lenient, TerrainSettings};

use crate::presets::PresetTable;

/// Configuration file picked up from the working directory when present.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "worldforge.toml";

/// Settings loaded from `worldforge.toml`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Template for every generated world's terrain.
    pub terrain: TerrainConfig,
    /// Lighting presets keyed by time of day.
    pub lighting: BTreeMap<String, Value>,
    /// Physics presets keyed by biome or preset name.
    pub physics: BTreeMap<String, Value>,
}

/// Terrain sizing shared by every generated world.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TerrainConfig {
    /// Samples along each side of the height field.
    pub resolution: u32,
    /// Side length in world units.
    pub terrain_size: f32,
    /// Divisor applied to grid coordinates before sampling noise.
    pub noise_scale: f32,
    /// Multiplier turning normalized elevation into world-space `y`.
    pub vertical_scale: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        let defaults = TerrainSettings::default();
        Self {
            resolution: defaults.resolution,
            terrain_size: defaults.terrain_size,
            noise_scale: defaults.noise_scale,
            vertical_scale: defaults.vertical_scale,
        }
    }
}

impl TerrainConfig {
    /// Terrain settings template; seed and features are set per world.
    #[must_use]
    pub(crate) fn settings(&self) -> TerrainSettings {
        TerrainSettings {
            resolution: self.resolution,
            terrain_size: self.terrain_size,
            noise_scale: self.noise_scale,
            vertical_scale: self.vertical_scale,
            ..TerrainSettings::default()
        }
    }
}

impl Config {
    /// Loads the configuration at `path`, or `worldforge.toml` from the
    /// working directory when no path is given and that file exists.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to load config at {}", path.display()))
    }

    /// Parses and validates configuration text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse worldforge toml contents")?;
        config.terrain.settings().validate()?;
        let terrain = &config.terrain;
        for (name, value) in [
            ("terrain_size", terrain.terrain_size),
            ("noise_scale", terrain.noise_scale),
            ("vertical_scale", terrain.vertical_scale),
        ] {
            if value.is_nan() || value <= 0.0 {
                bail!("terrain {name} must be positive, got {value}");
            }
        }
        Ok(config)
    }

    /// Preset tables combining the built-in presets with configured ones.
    ///
    /// Configured entries replace built-in entries of the same name.
    #[must_use]
    pub(crate) fn presets(&self) -> PresetTable {
        let mut lighting = builtin_lighting();
        let mut physics = builtin_physics();
        for (name, value) in &self.lighting {
            let _ = lighting.insert(lenient::key(name), value.clone());
        }
        for (name, value) in &self.physics {
            let _ = physics.insert(lenient::key(name), value.clone());
        }
        PresetTable::new(lighting, physics)
    }
}

fn builtin_lighting() -> BTreeMap<String, Value> {
    BTreeMap::from([
        (
            "dawn".to_owned(),
            json!({
                "ambient_intensity": 0.35,
                "sun_intensity": 0.5,
                "sun_elevation": 10.0,
                "sun_color": "#ffb37a",
                "fog_density": 0.004
            }),
        ),
        (
            "day".to_owned(),
            json!({
                "ambient_intensity": 0.6,
                "sun_intensity": 1.0,
                "sun_elevation": 60.0,
                "sun_color": "#fff5e0",
                "fog_density": 0.002
            }),
        ),
        (
            "dusk".to_owned(),
            json!({
                "ambient_intensity": 0.3,
                "sun_intensity": 0.4,
                "sun_elevation": 5.0,
                "sun_color": "#ff8c5a",
                "fog_density": 0.005
            }),
        ),
        (
            "night".to_owned(),
            json!({
                "ambient_intensity": 0.1,
                "sun_intensity": 0.05,
                "sun_elevation": -30.0,
                "sun_color": "#324a7a",
                "fog_density": 0.008
            }),
        ),
    ])
}

fn builtin_physics() -> BTreeMap<String, Value> {
    BTreeMap::from([
        (
            "default".to_owned(),
            json!({"gravity": -9.81, "friction": 0.8, "move_speed": 6.0, "jump_force": 5.0}),
        ),
        (
            "arctic".to_owned(),
            json!({"gravity": -9.81, "friction": 0.2, "move_speed": 5.0, "jump_force": 4.5}),
        ),
        (
            "desert".to_owned(),
            json!({"gravity": -9.81, "friction": 0.6, "move_speed": 4.5, "jump_force": 4.5}),
        ),
        (
            "moon".to_owned(),
            json!({"gravity": -1.62, "friction": 0.7, "move_speed": 5.0, "jump_force": 8.0}),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use worldforge_core::Presets;

    use super::*;

    #[test]
    fn empty_file_uses_builtin_defaults() {
        let config = Config::parse("").expect("empty config parses");
        assert_eq!(config, Config::default());
        assert_eq!(config.terrain.settings(), TerrainSettings::default());
    }

    #[test]
    fn configured_presets_override_builtins() {
        let config = Config::parse(
            r#"
            [terrain]
            resolution = 64

            [lighting.Day]
            ambient_intensity = 0.9

            [physics.swamp]
            gravity = -9.81
            friction = 0.95
            "#,
        )
        .expect("config parses");

        assert_eq!(config.terrain.settings().resolution, 64);
        let presets = config.presets();
        let day = presets.lighting("day");
        assert_eq!(day, Some(json!({"ambient_intensity": 0.9})));
        assert!(presets.lighting("night").is_some());
        assert_eq!(presets.physics("swamp").unwrap()["friction"], json!(0.95));
    }

    #[test]
    fn unknown_keys_and_bad_sizes_are_rejected() {
        assert!(Config::parse("[terrain]\nheight = 3").is_err());
        assert!(Config::parse("[render]\nscale = 2").is_err());
        assert!(Config::parse("[terrain]\nresolution = 1").is_err());
        assert!(Config::parse("[terrain]\nterrain_size = -5.0").is_err());
    }
}
