use serde::{Deserialize, Serialize};
use trimline_core::time::DEFAULT_TIMESCALE;
use trimline_core::{ClipKind, Size, Time, TimelineTrack};
use uuid::Uuid;

use crate::cache::{CacheKey, PixelSize};

/// Thumbnail strip settings. Missing JSON fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Width of one tile in points; also the sampling interval on screen.
    pub thumb_width: f64,
    pub thumb_height: f64,
    /// Upper bound on decodes running at once.
    pub max_concurrent: usize,
    /// Extra tiles requested beyond each visible edge.
    pub preload_count: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            thumb_width: 40.0,
            thumb_height: 54.0,
            max_concurrent: 4,
            preload_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRequest {
    /// Cancellation key: the clip the tile is drawn on.
    pub track_id: Uuid,
    pub source_id: Uuid,
    /// Source time of the frame.
    pub time: Time,
    /// Tile index relative to the visible crop start; negative for preloads.
    pub slot: i64,
    pub size: PixelSize,
    /// Square the decoder should fit frames into before cropping to `size`.
    pub decode_bounds: Size,
}

impl ThumbnailRequest {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            source_id: self.source_id,
            time: self.time,
            size: self.size,
        }
    }
}

/// Lay out one tile per `thumb_width` points across the visible crop of
/// `track`, plus `preload_count` tiles on either side that still fall inside
/// the source. Stills get a single tile. Clips without pictures get none.
pub fn plan_requests(
    track: &TimelineTrack,
    width_per_second: f64,
    config: &ThumbnailConfig,
) -> Vec<ThumbnailRequest> {
    if !matches!(track.kind(), ClipKind::Video | ClipKind::Image) {
        return Vec::new();
    }
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(width_per_second) || !usable(config.thumb_width) {
        return Vec::new();
    }

    let info = track.track_info();
    let size = PixelSize::from_points(config.thumb_width, config.thumb_height);
    let decode_bounds = info.thumbnail_bounds(Size::new(config.thumb_width, config.thumb_height));
    let request = |slot: i64, time: Time| ThumbnailRequest {
        track_id: track.id(),
        source_id: info.source_id,
        time,
        slot,
        size,
        decode_bounds,
    };

    if !info.original_duration.is_numeric() {
        return vec![request(0, Time::ZERO)];
    }

    let visible_points = track.cropped_duration().as_seconds() * width_per_second;
    let slots = ((visible_points / config.thumb_width).ceil() as i64).max(1);
    let Ok(step) = Time::from_seconds(config.thumb_width / width_per_second, DEFAULT_TIMESCALE)
    else {
        return Vec::new();
    };
    let preload = config.preload_count as i64;

    (-preload..slots + preload)
        .filter_map(|slot| {
            let time = track.crop_start() + step * slot;
            (time >= Time::ZERO && time < info.original_duration).then(|| request(slot, time))
        })
        .collect()
}
