use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};
use worldforge_core::{lenient, Presets};

/// Lighting and physics presets looked up by normalised name.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PresetTable {
    lighting: BTreeMap<String, Value>,
    physics: BTreeMap<String, Value>,
}

impl PresetTable {
    /// Creates a table from already normalised names.
    #[must_use]
    pub(crate) fn new(lighting: BTreeMap<String, Value>, physics: BTreeMap<String, Value>) -> Self {
        Self { lighting, physics }
    }
}

impl Presets for PresetTable {
    fn lighting(&self, time: &str) -> Option<Value> {
        self.lighting.get(&lenient::key(time)).cloned()
    }

    fn blend_lighting(&self, from: &str, to: &str, progress: f32) -> Option<Value> {
        let start = self.lighting(from)?;
        let end = self.lighting(to)?;
        Some(blend(&start, &end, f64::from(progress.clamp(0.0, 1.0))))
    }

    fn physics(&self, name: &str) -> Option<Value> {
        self.physics.get(&lenient::key(name)).cloned()
    }
}

/// Interpolates two lighting blobs.
///
/// Numbers and `#rrggbb` colours are interpolated linearly, objects and
/// equally long arrays element-wise. Anything else switches from `start` to
/// `end` halfway through.
fn blend(start: &Value, end: &Value, t: f64) -> Value {
    match (start, end) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Number::from_f64(a + (b - a) * t)
                .map_or_else(|| step(start, end, t), Value::Number),
            _ => step(start, end, t),
        },
        (Value::String(a), Value::String(b)) => match (parse_hex(a), parse_hex(b)) {
            (Some(a), Some(b)) => Value::String(format_hex(lerp_rgb(a, b, t))),
            _ => step(start, end, t),
        },
        (Value::Object(a), Value::Object(b)) => {
            let mut blended = Map::new();
            for (key, value) in a {
                let mixed = match b.get(key) {
                    Some(other) => blend(value, other, t),
                    None => value.clone(),
                };
                let _ = blended.insert(key.clone(), mixed);
            }
            for (key, value) in b {
                if !blended.contains_key(key) {
                    let _ = blended.insert(key.clone(), value.clone());
                }
            }
            Value::Object(blended)
        }
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => Value::Array(
            a.iter()
                .zip(b)
                .map(|(first, second)| blend(first, second, t))
                .collect(),
        ),
        _ => step(start, end, t),
    }
}

fn step(start: &Value, end: &Value, t: f64) -> Value {
    if t < 0.5 {
        start.clone()
    } else {
        end.clone()
    }
}

fn parse_hex(raw: &str) -> Option<[u8; 3]> {
    let digits = raw.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn lerp_rgb(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let mut mixed = [0_u8; 3];
    for (channel, (from, to)) in mixed.iter_mut().zip(a.into_iter().zip(b)) {
        let value = f64::from(from) + (f64::from(to) - f64::from(from)) * t;
        *channel = value.round().clamp(0.0, 255.0) as u8;
    }
    mixed
}

fn format_hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}
