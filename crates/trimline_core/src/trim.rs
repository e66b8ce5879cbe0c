use serde::Serialize;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::model::TimelineDataModel;
use crate::overlay_sync::{OverlaySyncPolicy, SyncReport};
use crate::time::{Time, DEFAULT_TIMESCALE};
use crate::track::{ClipKind, CropRange, ExpansionMode, TimelineTrack};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which boundary of a clip is being dragged.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    /// Shortest crop a drag may produce.
    pub min_duration: Time,
    /// Pixels (points) per second of timeline at the current zoom.
    pub width_per_second: f64,
    /// Timescale drag deltas are rounded to.
    pub timescale: i32,
    /// Slack used when reporting that a boundary reached the head or end.
    pub edge_tolerance: Time,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            min_duration: Time::secs(1),
            width_per_second: 60.0,
            timescale: DEFAULT_TIMESCALE,
            edge_tolerance: Time::new(20, DEFAULT_TIMESCALE).unwrap_or(Time::ZERO),
        }
    }
}

/// Limits a bounded drag must respect, in source (crop) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionBounds {
    pub source_duration: Time,
    /// Extra cap on the crop end, e.g. the primary timeline end for overlays.
    pub ceiling: Option<Time>,
}

impl ExpansionBounds {
    pub fn unlimited() -> Self {
        Self {
            source_duration: Time::INDEFINITE,
            ceiling: None,
        }
    }

    /// Bounds for `track`, with `timeline_ceiling` given in timeline time.
    pub fn for_track(track: &TimelineTrack, timeline_ceiling: Option<Time>) -> Self {
        Self {
            source_duration: track.track_info().original_duration,
            ceiling: timeline_ceiling
                .map(|c| track.crop_start() + (c - track.position_in_timeline())),
        }
    }

    pub fn max_end(&self) -> Time {
        match self.ceiling {
            Some(ceiling) => self.source_duration.min(ceiling),
            None => self.source_duration,
        }
    }
}

// ---------------------------------------------------------------------------
// TrimEngine
// ---------------------------------------------------------------------------

/// Turns boundary drags into crop ranges.
#[derive(Debug, Clone, Default)]
pub struct TrimEngine {
    config: TrimConfig,
}

impl TrimEngine {
    pub fn new(config: TrimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrimConfig {
        &self.config
    }

    /// Convert a horizontal drag distance into time at the current zoom.
    /// A non-positive zoom yields an invalid delta, which leaves ranges alone.
    pub fn points_to_time(&self, points: f64) -> Time {
        let width = self.config.width_per_second;
        if !(width.is_finite() && width > 0.0) {
            return Time::INVALID;
        }
        Time::from_seconds(points / width, self.config.timescale).unwrap_or(Time::INVALID)
    }

    /// Compute the crop that results from dragging one side of `range`
    /// outward by `delta_points` (negative values shrink the clip).
    ///
    /// Bounded clips stay inside `[0, bounds.max_end()]` and keep at least
    /// `min_duration`. Unbounded clips only keep the minimum duration; the
    /// start may go negative and is rebased when the gesture ends. If the
    /// limits cannot be met the input range is returned unchanged, so a clip
    /// already shorter than `min_duration` with no room to reach it stays put.
    pub fn compute_expansion(
        &self,
        range: CropRange,
        delta_points: f64,
        side: Side,
        mode: ExpansionMode,
        bounds: ExpansionBounds,
    ) -> CropRange {
        let delta = self.points_to_time(delta_points);
        let min = self.config.min_duration;
        let CropRange { start, end } = range;

        let next = match (mode, side) {
            (ExpansionMode::BoundedBySource, Side::Left) => {
                clamp_within(start - delta, Time::ZERO, end - min).map(|s| CropRange::new(s, end))
            }
            (ExpansionMode::BoundedBySource, Side::Right) => {
                clamp_within(end + delta, start + min, bounds.max_end())
                    .map(|e| CropRange::new(start, e))
            }
            (ExpansionMode::UnboundedGrowable, Side::Left) => {
                Some(CropRange::new((start - delta).min(end - min), end))
            }
            (ExpansionMode::UnboundedGrowable, Side::Right) => {
                Some(CropRange::new(start, (end + delta).max(start + min)))
            }
        };

        match next {
            Some(next) if next.is_valid() => next,
            _ => range,
        }
    }

    /// Start dragging `side` of the track `id`. Returns `None` when the track
    /// does not exist.
    pub fn begin(&self, model: &TimelineDataModel, id: Uuid, side: Side) -> Option<TrimGesture> {
        let track = model.track(id)?;
        let ceiling = overlay_ceiling(model, track.kind());
        let bounds = ExpansionBounds::for_track(track, ceiling);
        debug!(track = %id, ?side, mode = ?track.mode(), "trim gesture began");
        Some(TrimGesture {
            engine: self.clone(),
            track_id: id,
            side,
            kind: track.kind(),
            mode: track.mode(),
            origin: track.crop_range(),
            current: track.crop_range(),
            bounds,
            timeline_ceiling: ceiling,
            cumulative_points: 0.0,
        })
    }
}

/// `value` limited to `[lo, hi]`, or `None` when the limits cross.
fn clamp_within(value: Time, lo: Time, hi: Time) -> Option<Time> {
    (lo <= hi).then(|| value.clamp(lo, hi))
}

/// Overlays may not run past the end of the primary row. With no primary
/// clips there is nothing to follow and no ceiling applies.
fn overlay_ceiling(model: &TimelineDataModel, kind: ClipKind) -> Option<Time> {
    if !kind.is_overlay() {
        return None;
    }
    let primary = model.primary_duration();
    (primary > Time::ZERO).then_some(primary)
}

// ---------------------------------------------------------------------------
// TrimGesture
// ---------------------------------------------------------------------------

/// One in-progress drag of a clip boundary.
///
/// Every update recomputes from the crop captured at [`TrimEngine::begin`] and
/// the cumulative drag distance, so replaying the same total is a no-op.
/// [`TrimGesture::finish`] consumes the gesture, which is the only place an
/// unbounded clip is rebased.
#[derive(Debug)]
pub struct TrimGesture {
    engine: TrimEngine,
    track_id: Uuid,
    side: Side,
    kind: ClipKind,
    mode: ExpansionMode,
    origin: CropRange,
    current: CropRange,
    bounds: ExpansionBounds,
    timeline_ceiling: Option<Time>,
    cumulative_points: f64,
}

/// Outcome of a finished gesture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimReport {
    pub track_id: Uuid,
    pub side: Side,
    pub before: CropRange,
    pub after: CropRange,
    /// Amount subtracted from both crop ends when an unbounded clip was
    /// rebased to start at zero.
    pub rebased_by: Option<Time>,
    pub reached_head: bool,
    pub reached_end: bool,
    pub sync: Option<SyncReport>,
}

impl TrimReport {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

impl TrimGesture {
    pub fn track_id(&self) -> Uuid {
        self.track_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn origin(&self) -> CropRange {
        self.origin
    }

    pub fn current(&self) -> CropRange {
        self.current
    }

    pub fn cumulative_points(&self) -> f64 {
        self.cumulative_points
    }

    /// Set the total drag distance since the gesture began.
    pub fn drag_to(&mut self, model: &mut TimelineDataModel, cumulative_points: f64) -> CropRange {
        self.cumulative_points = cumulative_points;
        self.current = self.engine.compute_expansion(
            self.origin,
            cumulative_points,
            self.side,
            self.mode,
            self.bounds,
        );
        trace!(track = %self.track_id, points = cumulative_points, "trim drag");
        model.apply_crop(self.track_id, self.current, "trim");
        self.current
    }

    /// Add `delta_points` to the drag distance.
    pub fn drag_by(&mut self, model: &mut TimelineDataModel, delta_points: f64) -> CropRange {
        let total = self.cumulative_points + delta_points;
        self.drag_to(model, total)
    }

    /// End the gesture: rebase unbounded clips and, for primary clips, let
    /// `policy` bring overlays in line with the new primary duration.
    ///
    /// The rebase shifts both crop ends and never the clip's position in the
    /// timeline.
    pub fn finish(self, model: &mut TimelineDataModel, policy: &OverlaySyncPolicy) -> TrimReport {
        let mut after = self.current;
        let mut rebased_by = None;

        if self.mode == ExpansionMode::UnboundedGrowable && !after.start.is_zero() {
            let offset = after.start;
            after = CropRange::new(Time::ZERO, after.end - offset);
            rebased_by = Some(offset);
            model.apply_crop(self.track_id, after, "rebase");
        }

        let tolerance = self.engine.config.edge_tolerance;
        let (reached_head, reached_end) = match model.track(self.track_id) {
            Some(track) => (
                track.reaches_head(tolerance),
                track.reaches_end(self.timeline_ceiling, tolerance),
            ),
            None => (false, false),
        };

        let sync = self.kind.is_primary().then(|| policy.apply(model));

        debug!(
            track = %self.track_id,
            side = ?self.side,
            before = %self.origin.duration(),
            after = %after.duration(),
            rebased = rebased_by.is_some(),
            "trim gesture finished"
        );

        TrimReport {
            track_id: self.track_id,
            side: self.side,
            before: self.origin,
            after,
            rebased_by,
            reached_head,
            reached_end,
            sync,
        }
    }

    /// Abandon the gesture and put the original crop back.
    pub fn cancel(self, model: &mut TimelineDataModel) -> bool {
        debug!(track = %self.track_id, "trim gesture cancelled");
        model.apply_crop(self.track_id, self.origin, "trim-cancel")
    }
}
