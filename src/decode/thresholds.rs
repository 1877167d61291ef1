use serde_json::{Map, Value};

use crate::decode::as_f64;
use crate::ui::UiRange;

pub const MIN_COLOUR_KEY: &str = "minColourState";
pub const MID_COLOUR_KEY: &str = "midColourState";
pub const MAX_COLOUR_KEY: &str = "maxColourState";
pub const MIN_LEVEL_KEY: &str = "minLevel";
pub const LOW_LEVEL_KEY: &str = "lowLevel";
pub const HIGH_LEVEL_KEY: &str = "highLevel";
pub const MAX_LEVEL_KEY: &str = "maxLevel";

/// Operator-set band boundaries and colours, read from the `ui_cmds`
/// aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    pub min_colour: String,
    pub mid_colour: String,
    pub max_colour: String,
    pub min_level: f64,
    pub low_level: f64,
    pub high_level: f64,
    pub max_level: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            min_colour: "red".to_string(),
            mid_colour: "yellow".to_string(),
            max_colour: "green".to_string(),
            min_level: 0.0,
            low_level: 30.0,
            high_level: 70.0,
            max_level: 100.0,
        }
    }
}

/// Look `key` up in `cmds`, falling back to `default` when the map or key is
/// absent or the value does not parse.
fn lookup_or<T>(
    cmds: Option<&Map<String, Value>>,
    key: &str,
    default: T,
    parse: impl Fn(&Value) -> Option<T>,
) -> T {
    cmds.and_then(|cmds| cmds.get(key))
        .and_then(parse)
        .unwrap_or(default)
}

fn colour(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ThresholdConfig {
    /// Values are read from the aggregate's `cmds` object, or from the
    /// aggregate itself when there is no `cmds` key. Each value falls back
    /// to its own default.
    pub fn from_aggregate(aggregate: &Value) -> Self {
        let cmds = aggregate
            .get("cmds")
            .and_then(Value::as_object)
            .or_else(|| aggregate.as_object());
        let defaults = ThresholdConfig::default();

        ThresholdConfig {
            min_colour: lookup_or(cmds, MIN_COLOUR_KEY, defaults.min_colour, colour),
            mid_colour: lookup_or(cmds, MID_COLOUR_KEY, defaults.mid_colour, colour),
            max_colour: lookup_or(cmds, MAX_COLOUR_KEY, defaults.max_colour, colour),
            min_level: lookup_or(cmds, MIN_LEVEL_KEY, defaults.min_level, as_f64),
            low_level: lookup_or(cmds, LOW_LEVEL_KEY, defaults.low_level, as_f64),
            high_level: lookup_or(cmds, HIGH_LEVEL_KEY, defaults.high_level, as_f64),
            max_level: lookup_or(cmds, MAX_LEVEL_KEY, defaults.max_level, as_f64),
        }
    }

    /// Low, mid and high bands in ascending order.
    pub fn ranges(&self) -> Vec<UiRange> {
        let band = |min: f64, max: f64, colour: &str, label: &str| UiRange {
            min,
            max,
            colour: colour.to_string(),
            label: Some(label.to_string()),
            show_on_graph: true,
        };
        vec![
            band(self.min_level, self.low_level, &self.min_colour, "Low"),
            band(self.low_level, self.high_level, &self.mid_colour, "Mid"),
            band(self.high_level, self.max_level, &self.max_colour, "High"),
        ]
    }
}
