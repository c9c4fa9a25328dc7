//! Structured world mutations and their lenient normalisation.
//!
//! A [`Diff`] is produced by an external language model as loosely typed
//! JSON. [`Diff::from_value`] validates its shape: every field that cannot be
//! interpreted is dropped with a warning while the remaining fields survive,
//! so a single malformed entry never blocks the rest of the request.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    lenient, Building, BuildingSubtype, Category, CreativeObject, EnemyDraft, Peak, Position, Rock,
    Selector, StreetLamp, TerrainSettings, Tree,
};

/// How many instances an operation affects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Amount {
    /// An exact number of instances.
    Count(u32),
    /// Every instance the operation targets.
    All,
}

impl Amount {
    /// Counts at or above this value are interpreted as [`Amount::All`].
    pub const ALL_THRESHOLD: u64 = 999;

    /// Normalises a JSON count; `"all"`, `"*"` and counts of 999 or more mean
    /// every instance.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(text) = value.as_str() {
            if matches!(
                lenient::key(text).as_str(),
                "all" | "*" | "every" | "everything"
            ) {
                return Some(Self::All);
            }
        }
        let count = lenient::count(value)?;
        if count >= Self::ALL_THRESHOLD {
            Some(Self::All)
        } else {
            Some(Self::Count(count as u32))
        }
    }

    /// Number of instances left after removing this amount from `current`.
    #[must_use]
    pub fn remaining_after_removal(self, current: usize) -> usize {
        match self {
            Self::All => 0,
            Self::Count(count) => current.saturating_sub(count as usize),
        }
    }

    /// Upper bound this amount imposes on a list of `current` instances.
    #[must_use]
    pub fn limit(self, current: usize) -> usize {
        match self {
            Self::All => current,
            Self::Count(count) => current.min(count as usize),
        }
    }
}

/// Fully specified instances of a single category.
#[derive(Clone, Debug, PartialEq)]
pub enum Batch {
    /// Trees.
    Trees(Vec<Tree>),
    /// Rocks.
    Rocks(Vec<Rock>),
    /// Mountain peaks.
    Peaks(Vec<Peak>),
    /// Buildings.
    Buildings(Vec<Building>),
    /// Street lamps.
    StreetLamps(Vec<StreetLamp>),
    /// Creative objects.
    CreativeObjects(Vec<CreativeObject>),
    /// Enemy drafts awaiting identifiers and stats.
    Enemies(Vec<EnemyDraft>),
}

impl Batch {
    /// Parses raw items for `category`, skipping the ones that do not fit.
    #[must_use]
    pub fn parse(category: Category, items: &[Value]) -> Self {
        match category {
            Category::Tree => Self::Trees(parse_items(category, items)),
            Category::Rock => Self::Rocks(parse_items(category, items)),
            Category::Peak => Self::Peaks(parse_items(category, items)),
            Category::Building => Self::Buildings(parse_items(category, items)),
            Category::StreetLamp => Self::StreetLamps(parse_items(category, items)),
            Category::CreativeObject => Self::CreativeObjects(parse_items(category, items)),
            Category::Enemy => Self::Enemies(parse_items(category, items)),
        }
    }

    /// Parses raw items addressed by `selector`.
    ///
    /// Subtype selectors keep only buildings belonging to that subtype.
    #[must_use]
    pub fn parse_for(selector: Selector, items: &[Value]) -> Self {
        let batch = Self::parse(selector.category(), items);
        match (selector, batch) {
            (Selector::Subtype(subtype), Self::Buildings(buildings)) => {
                Self::Buildings(restrict_to_subtype(subtype, buildings))
            }
            (_, batch) => batch,
        }
    }

    /// Category the batch belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Trees(_) => Category::Tree,
            Self::Rocks(_) => Category::Rock,
            Self::Peaks(_) => Category::Peak,
            Self::Buildings(_) => Category::Building,
            Self::StreetLamps(_) => Category::StreetLamp,
            Self::CreativeObjects(_) => Category::CreativeObject,
            Self::Enemies(_) => Category::Enemy,
        }
    }

    /// Number of instances in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Trees(items) => items.len(),
            Self::Rocks(items) => items.len(),
            Self::Peaks(items) => items.len(),
            Self::Buildings(items) => items.len(),
            Self::StreetLamps(items) => items.len(),
            Self::CreativeObjects(items) => items.len(),
            Self::Enemies(items) => items.len(),
        }
    }

    /// Reports whether the batch holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_items<T: DeserializeOwned>(category: Category, items: &[Value]) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                warn!(
                    category = category.key(),
                    index,
                    %error,
                    "skipping malformed instance"
                );
                None
            }
        })
        .collect()
}

fn restrict_to_subtype(subtype: BuildingSubtype, buildings: Vec<Building>) -> Vec<Building> {
    let total = buildings.len();
    let kept: Vec<Building> = buildings
        .into_iter()
        .filter(|building| subtype.contains(building))
        .collect();
    if kept.len() != total {
        warn!(
            subtype = subtype.key(),
            dropped = total - kept.len(),
            "dropping buildings that do not match the addressed subtype"
        );
    }
    kept
}

/// Growth requested for a category.
#[derive(Clone, Debug, PartialEq)]
pub enum AddRequest {
    /// Run the category's generator to place this many new instances.
    Generate(u32),
    /// Append these fully specified instances.
    Items(Batch),
}

/// Replacement or cap requested for a category.
#[derive(Clone, Debug, PartialEq)]
pub enum SetRequest {
    /// Shrink the category to at most this many instances; never grows it.
    Limit(Amount),
    /// Replace the category's list verbatim.
    Replace(Batch),
}

/// Preset collaborator input: either a preset name or an inline blob.
#[derive(Clone, Debug, PartialEq)]
pub enum PresetRequest {
    /// Look the value up in the preset tables by name.
    Named(String),
    /// Store the provided blob verbatim.
    Inline(Value),
}

impl PresetRequest {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => lenient::text(value).map(Self::Named),
            Value::Object(_) => Some(Self::Inline(value.clone())),
            _ => None,
        }
    }
}

/// Requested change of the time of day.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeChange {
    /// Jump straight to the named time of day.
    To(String),
    /// Blend lighting between two times of day.
    Blend {
        /// Time of day the transition starts from.
        from: String,
        /// Time of day the transition heads to.
        to: String,
        /// Progress through the transition in `[0, 1]`.
        progress: f32,
    },
}

impl TimeChange {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => lenient::text(value).map(Self::To),
            Value::Object(fields) => Self::from_fields(fields),
            _ => None,
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Option<Self> {
        let to = fields
            .get("to_time")
            .or_else(|| fields.get("to"))
            .and_then(lenient::text);
        let from = fields
            .get("from_time")
            .or_else(|| fields.get("from"))
            .and_then(lenient::text);
        let progress = fields.get("progress").and_then(lenient::number);
        match (from, to, progress) {
            (Some(from), Some(to), Some(progress)) => Some(Self::Blend {
                from,
                to,
                progress: progress.clamp(0.0, 1.0),
            }),
            (_, Some(to), _) => Some(Self::To(to)),
            _ => fields
                .get("time")
                .and_then(lenient::text)
                .map(Self::To),
        }
    }
}

/// Overrides for the persisted terrain settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainPatch {
    /// New terrain seed.
    pub seed: Option<u64>,
    /// New height-field resolution.
    pub resolution: Option<u32>,
    /// New terrain side length.
    pub terrain_size: Option<f32>,
    /// New noise scale.
    pub noise_scale: Option<f32>,
    /// New vertical scale.
    pub vertical_scale: Option<f32>,
    /// Replacement feature bump requests.
    pub features: Option<BTreeMap<String, u32>>,
}

impl TerrainPatch {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let features = fields.get("features").and_then(Value::as_object);
        let features = features.map(|map| {
            map.iter()
                .filter_map(|(name, count)| {
                    let count = lenient::count(count)?;
                    Some((lenient::key(name), count.min(u64::from(u32::MAX)) as u32))
                })
                .collect()
        });
        Self {
            seed: fields.get("seed").and_then(lenient::count),
            resolution: fields
                .get("resolution")
                .and_then(lenient::count)
                .and_then(|resolution| u32::try_from(resolution).ok())
                .filter(|resolution| TerrainSettings::RESOLUTIONS.contains(resolution)),
            terrain_size: positive(fields.get("terrain_size")),
            noise_scale: positive(fields.get("noise_scale")),
            vertical_scale: positive(fields.get("vertical_scale")),
            features,
        }
    }

    /// Reports whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the overrides, returning whether any setting changed.
    pub fn apply(&self, settings: &mut TerrainSettings) -> bool {
        let before = settings.clone();
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(terrain_size) = self.terrain_size {
            settings.terrain_size = terrain_size;
        }
        if let Some(noise_scale) = self.noise_scale {
            settings.noise_scale = noise_scale;
        }
        if let Some(vertical_scale) = self.vertical_scale {
            settings.vertical_scale = vertical_scale;
        }
        if let Some(features) = &self.features {
            settings.features = features.clone();
        }
        *settings != before
    }
}

fn positive(value: Option<&Value>) -> Option<f32> {
    value
        .and_then(lenient::number)
        .filter(|number| *number > 0.0)
}

/// Direct overwrites of world-level properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldPatch {
    /// New biome name.
    pub biome: Option<String>,
    /// New time of day.
    pub time: Option<String>,
    /// New sky colour.
    pub sky: Option<String>,
    /// New lighting configuration blob.
    pub lighting: Option<Value>,
    /// Terrain setting overrides.
    pub terrain: Option<TerrainPatch>,
}

impl WorldPatch {
    fn absorb(&mut self, fields: &Map<String, Value>) {
        if let Some(biome) = fields.get("biome").and_then(lenient::text) {
            self.biome = Some(biome);
        }
        if let Some(time) = fields.get("time").and_then(lenient::text) {
            self.time = Some(time);
        }
        for key in ["sky", "sky_colour", "sky_color"] {
            if let Some(sky) = fields.get(key).and_then(lenient::text) {
                self.sky = Some(sky);
            }
        }
        if let Some(lighting) = fields.get("lighting_config") {
            if lighting.is_object() {
                self.lighting = Some(lighting.clone());
            } else {
                warn!(
                    field = "lighting_config",
                    "skipping non-object lighting config"
                );
            }
        }
        if let Some(terrain) = fields.get("terrain") {
            match terrain.as_object() {
                Some(terrain) => {
                    let patch = TerrainPatch::from_fields(terrain);
                    if !patch.is_empty() {
                        self.terrain = Some(patch);
                    }
                }
                None => warn!(field = "terrain", "skipping non-object terrain patch"),
            }
        }
    }

    /// Reports whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Structured mutation request applied to a world by the merge engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diff {
    /// Direct world property overwrites.
    pub world: WorldPatch,
    /// Instances to remove, applied first.
    pub remove: Vec<(Selector, Amount)>,
    /// Replacements and caps, applied after removals.
    pub set: Vec<(Selector, SetRequest)>,
    /// Additions, applied last.
    pub add: Vec<(Selector, AddRequest)>,
    /// Physics preset request.
    pub physics: Option<PresetRequest>,
    /// Lighting preset request.
    pub lighting: Option<PresetRequest>,
    /// Combat settings merged into the world's combat state.
    pub combat: Option<Map<String, Value>>,
    /// New player spawn point.
    pub spawn_point: Option<Position>,
    /// Requested time-of-day transition.
    pub time_change: Option<TimeChange>,
}

impl Diff {
    /// Normalises loosely typed JSON into a diff.
    ///
    /// Anything that cannot be interpreted is logged and treated as absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut diff = Self::default();
        let Some(fields) = value.as_object() else {
            warn!("diff is not a JSON object; treating it as empty");
            return diff;
        };

        diff.world.absorb(fields);
        if let Some(world) = fields.get("world") {
            match world.as_object() {
                Some(world) => diff.world.absorb(world),
                None => warn!(field = "world", "skipping non-object world patch"),
            }
        }

        diff.remove = parse_section(fields, "remove", |selector, value| {
            Amount::from_value(value).map(|amount| (selector, amount))
        });
        diff.set = parse_section(fields, "set", |selector, value| match value {
            Value::Array(items) => Some((
                selector,
                SetRequest::Replace(Batch::parse_for(selector, items)),
            )),
            _ => Amount::from_value(value).map(|amount| (selector, SetRequest::Limit(amount))),
        });
        diff.add = parse_section(fields, "add", |selector, value| match value {
            Value::Array(items) => Some((
                selector,
                AddRequest::Items(Batch::parse_for(selector, items)),
            )),
            Value::Object(_) => Some((
                selector,
                AddRequest::Items(Batch::parse_for(selector, std::slice::from_ref(value))),
            )),
            _ => {
                let count = lenient::count(value)?;
                (count > 0).then(|| {
                    (
                        selector,
                        AddRequest::Generate(count.min(u64::from(u32::MAX)) as u32),
                    )
                })
            }
        });

        diff.physics = parse_optional(fields, "physics", PresetRequest::from_value);
        diff.lighting = parse_optional(fields, "lighting", PresetRequest::from_value);
        diff.combat = parse_optional(fields, "combat", |value| {
            let mut settings = value.as_object()?.clone();
            let _ = settings.remove("enemies");
            let _ = settings.remove("enemy_count");
            Some(settings)
        });
        diff.spawn_point = parse_optional(fields, "spawn_point", |value| {
            serde_json::from_value(value.clone()).ok()
        });
        diff.time_change = parse_optional(fields, "time_change", TimeChange::from_value);
        if diff.time_change.is_none() && fields.contains_key("to_time") {
            diff.time_change = TimeChange::from_fields(fields);
        }

        diff
    }

    /// Parses a JSON document into a diff.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Reports whether the diff requests no change at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_section<T>(
    fields: &Map<String, Value>,
    section: &str,
    mut parse: impl FnMut(Selector, &Value) -> Option<T>,
) -> Vec<T> {
    let Some(value) = fields.get(section) else {
        return Vec::new();
    };
    let Some(entries) = value.as_object() else {
        warn!(field = section, "skipping non-object diff section");
        return Vec::new();
    };

    let mut parsed = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let Some(selector) = Selector::from_key(key) else {
            warn!(field = section, key = %key, "skipping unknown category");
            continue;
        };
        match parse(selector, value) {
            Some(entry) => parsed.push(entry),
            None => warn!(field = section, key = %key, "skipping malformed entry"),
        }
    }
    parsed
}

fn parse_optional<T>(
    fields: &Map<String, Value>,
    key: &str,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = fields.get(key)?;
    if value.is_null() {
        return None;
    }
    let parsed = parse(value);
    if parsed.is_none() {
        warn!(field = key, "skipping malformed diff field");
    }
    parsed
}
