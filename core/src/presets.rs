//! Lookup tables supplied by the embedding application.

use serde_json::Value;

/// Lighting and physics preset tables.
///
/// The engine stores whatever the tables return without interpreting it.
/// Returning `None` leaves the corresponding world field unchanged.
pub trait Presets {
    /// Lighting configuration for a named time of day.
    fn lighting(&self, time: &str) -> Option<Value>;

    /// Lighting configuration part-way between two times of day.
    fn blend_lighting(&self, from: &str, to: &str, progress: f32) -> Option<Value>;

    /// Physics configuration for a named biome or preset.
    fn physics(&self, name: &str) -> Option<Value>;
}

/// Preset tables that know nothing; every lookup returns `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPresets;

impl Presets for NoPresets {
    fn lighting(&self, _time: &str) -> Option<Value> {
        None
    }

    fn blend_lighting(&self, _from: &str, _to: &str, _progress: f32) -> Option<Value> {
        None
    }

    fn physics(&self, _name: &str) -> Option<Value> {
        None
    }
}
