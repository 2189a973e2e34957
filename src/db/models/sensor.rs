//! Pressure-channel data model.
//!
//! The seat and the backrest each carry four force-sensitive pads read through a
//! 10-bit ADC, so every raw reading lies in 0..=1023. Two wirings are understood:
//!
//! - quadrant pads: `<group>_top_left`, `_top_right`, `_bottom_left`, `_bottom_right`
//! - directional pads: `<group>_front`, `_back`, `_left`, `_right`
//!
//! A directional pad feeds exactly one row or column: `front` is the bottom row,
//! `back` the top row, `left` and `right` the columns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Highest raw value the ADC can report.
pub const RAW_MAX: f64 = 1023.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadGroup {
    Seat,
    Back,
}

impl PadGroup {
    fn prefix(&self) -> &'static str {
        match self {
            PadGroup::Seat => "seat",
            PadGroup::Back => "back",
        }
    }
}

/// Every numeric channel of one `sensors` object, keyed by channel name.
///
/// Non-numeric values are dropped at parse time; unknown names are kept so they
/// still count towards interval averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorChannels {
    values: BTreeMap<String, f64>,
}

/// Normalized row and column sums of one pad group. Missing pads read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PadGrid {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    /// Mass over every pad of the group
    pub total: f64,
}

fn sanitize(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.clamp(0.0, RAW_MAX))
}

impl SensorChannels {
    /// Builds channels from a JSON `sensors` object, clamping numbers to the ADC range.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        map.iter()
            .filter_map(|(key, value)| value.as_f64().map(|raw| (key.clone(), raw)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every reading present in the packet, whatever the channel name.
    pub fn readings(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.values().copied()
    }

    pub fn seat(&self, ceiling: f64) -> PadGrid {
        self.grid(PadGroup::Seat, ceiling)
    }

    pub fn back(&self, ceiling: f64) -> PadGrid {
        self.grid(PadGroup::Back, ceiling)
    }

    /// Each pad is divided by `ceiling` and clamped to `[0, 1]` before summing.
    pub fn grid(&self, group: PadGroup, ceiling: f64) -> PadGrid {
        let prefix = group.prefix();
        let pad = |suffix: &str| {
            let raw = self.get(&format!("{prefix}_{suffix}")).unwrap_or(0.0);
            if ceiling > 0.0 {
                (raw / ceiling).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        let (top_left, top_right) = (pad("top_left"), pad("top_right"));
        let (bottom_left, bottom_right) = (pad("bottom_left"), pad("bottom_right"));
        let (front, rear) = (pad("front"), pad("back"));
        let (left, right) = (pad("left"), pad("right"));

        PadGrid {
            top: top_left + top_right + rear,
            bottom: bottom_left + bottom_right + front,
            left: top_left + bottom_left + left,
            right: top_right + bottom_right + right,
            total: top_left + top_right + bottom_left + bottom_right + front + rear + left + right,
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SensorChannels {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .filter_map(|(key, raw)| sanitize(raw).map(|value| (key.into(), value)))
                .collect(),
        }
    }
}

/// A sensor-bearing packet as it sits in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub received_at: DateTime<Utc>,
    pub channels: SensorChannels,
}
