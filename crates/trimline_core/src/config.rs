use serde::{Deserialize, Serialize};

use crate::overlay_sync::OverlaySyncPolicy;
use crate::time::{Time, DEFAULT_TIMESCALE};
use crate::trim::TrimConfig;

/// Editor tunables, loadable from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Shortest clip a trim may produce.
    pub min_duration_secs: f64,
    /// Timeline zoom in points per second.
    pub width_per_second: f64,
    /// How close an overlay end must be to the primary end to count as docked.
    pub dock_tolerance_secs: f64,
    pub default_timescale: i32,
    /// Floor for the duration of newly added stickers and text.
    pub min_overlay_duration_secs: f64,
    /// Slack for head/end detection, one frame at 30 fps.
    pub edge_tolerance_secs: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 1.0,
            width_per_second: 60.0,
            dock_tolerance_secs: 0.1,
            default_timescale: DEFAULT_TIMESCALE,
            min_overlay_duration_secs: 3.0,
            edge_tolerance_secs: 1.0 / 30.0,
        }
    }
}

impl EditorConfig {
    /// Zoomed-in preset for frame-accurate work.
    pub fn fine_grained() -> Self {
        Self {
            min_duration_secs: 0.5,
            width_per_second: 240.0,
            ..Self::default()
        }
    }

    fn time(&self, seconds: f64) -> Time {
        Time::from_seconds(seconds, self.default_timescale).unwrap_or(Time::INVALID)
    }

    pub fn min_overlay_duration(&self) -> Time {
        self.time(self.min_overlay_duration_secs)
    }

    pub fn trim_config(&self) -> TrimConfig {
        TrimConfig {
            min_duration: self.time(self.min_duration_secs),
            width_per_second: self.width_per_second,
            timescale: self.default_timescale,
            edge_tolerance: self.time(self.edge_tolerance_secs),
        }
    }

    pub fn sync_policy(&self) -> OverlaySyncPolicy {
        OverlaySyncPolicy::new(self.time(self.dock_tolerance_secs))
    }
}
