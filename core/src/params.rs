//! World generation parameters supplied by the prompt or scan analyzers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{lenient, CreativeObject};

/// Colours requested for generated scenery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    /// Foliage colour stamped onto generated trees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_color: Option<String>,
    /// Trunk colour stamped onto generated trees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk_color: Option<String>,
    /// Facade colours applied round-robin to generated buildings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub building_colors: Vec<String>,
    /// Sky colour stored on the world.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sky_color: Option<String>,
}

impl ColorPalette {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let building_colors = fields
            .get("building_colors")
            .or_else(|| fields.get("building_colours"))
            .and_then(Value::as_array)
            .map(|colors| colors.iter().filter_map(lenient::text).collect())
            .unwrap_or_default();
        Self {
            leaf_color: read_text(fields, &["leaf_color", "leaf_colour", "foliage"]),
            trunk_color: read_text(fields, &["trunk_color", "trunk_colour"]),
            building_colors,
            sky_color: read_text(fields, &["sky_color", "sky_colour", "sky"]),
        }
    }
}

fn read_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(lenient::text))
}

/// Structured description of the world to generate.
///
/// Missing or out-of-range values are resolved by the generator using
/// per-biome defaults, so every field here is optional in practice.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    /// Free-form biome name.
    pub biome: String,
    /// Time of day.
    pub time: String,
    /// Number of enemies to place.
    pub enemy_count: Option<u32>,
    /// Weapon handed to the player.
    pub weapon: Option<String>,
    /// Requested counts keyed by normalised feature or category keyword.
    pub structure_counts: BTreeMap<String, u32>,
    /// Colour overrides.
    pub color_palette: ColorPalette,
    /// Free-form objects passed through verbatim.
    pub creative_objects: Vec<CreativeObject>,
    /// Seed making generation reproducible.
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            biome: "default".to_owned(),
            time: "day".to_owned(),
            enemy_count: None,
            weapon: None,
            structure_counts: BTreeMap::new(),
            color_palette: ColorPalette::default(),
            creative_objects: Vec::new(),
            seed: None,
        }
    }
}

impl GenerationParams {
    /// Normalises loosely typed JSON into generation parameters.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut params = Self::default();
        let Some(fields) = value.as_object() else {
            warn!("generation parameters are not a JSON object; using defaults");
            return params;
        };

        if let Some(biome) = fields.get("biome").and_then(lenient::text) {
            params.biome = biome;
        }
        if let Some(time) = fields.get("time").and_then(lenient::text) {
            params.time = time;
        }
        params.enemy_count = fields
            .get("enemy_count")
            .and_then(lenient::count)
            .map(saturate);
        params.weapon = fields.get("weapon").and_then(lenient::text);
        params.seed = fields.get("seed").and_then(lenient::count);

        if let Some(counts) = fields.get("structure_counts").and_then(Value::as_object) {
            for (key, count) in counts {
                match lenient::count(count) {
                    Some(count) => {
                        let _ = params
                            .structure_counts
                            .insert(lenient::key(key), saturate(count));
                    }
                    None => warn!(key = %key, "skipping malformed structure count"),
                }
            }
        }
        if let Some(palette) = fields
            .get("color_palette")
            .or_else(|| fields.get("colour_palette"))
            .and_then(Value::as_object)
        {
            params.color_palette = ColorPalette::from_fields(palette);
        }
        if let Some(objects) = fields.get("creative_objects").and_then(Value::as_array) {
            params.creative_objects = objects
                .iter()
                .filter_map(|object| serde_json::from_value(object.clone()).ok())
                .collect();
        }

        params
    }

    /// Requested count for the first of `keys` present in the structure counts.
    #[must_use]
    pub fn count_for(&self, keys: &[&str]) -> Option<u32> {
        keys.iter()
            .find_map(|key| self.structure_counts.get(*key).copied())
    }
}

fn saturate(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
