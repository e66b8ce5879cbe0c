use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::Rejection;
use crate::media::{MediaKind, MediaTrackInfo};
use crate::time::Time;

/// Length given to still images and other sources with no natural end when
/// they are placed without an explicit crop.
pub const DEFAULT_STILL_DURATION: Time = Time::secs(3);

// ---------------------------------------------------------------------------
// ClipKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClipKind {
    Video,
    Audio,
    Image,
    Sticker,
    Text,
}

impl ClipKind {
    pub fn from_media(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => ClipKind::Video,
            MediaKind::Audio => ClipKind::Audio,
            MediaKind::Image => ClipKind::Image,
        }
    }

    /// Stickers and text live on their own layer and follow the primary row.
    pub fn is_overlay(self) -> bool {
        matches!(self, ClipKind::Sticker | ClipKind::Text)
    }

    pub fn is_primary(self) -> bool {
        !self.is_overlay()
    }

    pub fn default_mode(self) -> ExpansionMode {
        match self {
            ClipKind::Image => ExpansionMode::UnboundedGrowable,
            _ => ExpansionMode::BoundedBySource,
        }
    }
}

/// How far a clip's boundaries may be dragged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ExpansionMode {
    /// Crop stays within `[0, original_duration]` and any external ceiling.
    #[default]
    BoundedBySource,
    /// The source can be extended indefinitely in both directions; the crop is
    /// re-based to start at zero when a gesture ends.
    UnboundedGrowable,
}

// ---------------------------------------------------------------------------
// CropRange
// ---------------------------------------------------------------------------

/// The `[start, end)` sub-interval of a source that a clip uses.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CropRange {
    pub start: Time,
    pub end: Time,
}

impl CropRange {
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Time {
        self.end - self.start
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_numeric() && self.end.is_numeric() && self.end > self.start
    }
}

// ---------------------------------------------------------------------------
// TimelineTrack
// ---------------------------------------------------------------------------

/// A single clip placed on the timeline.
///
/// A track may exist in an invalid state (for example a zero-length crop
/// passed to [`TimelineTrack::with_crop`]); [`TimelineTrack::is_valid`] and the
/// timeline validator report it. The mutators refuse edits that would break
/// the invariants and leave the track untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineTrack {
    id: Uuid,
    kind: ClipKind,
    mode: ExpansionMode,
    track_info: Arc<MediaTrackInfo>,
    crop_start: Time,
    crop_end: Time,
    position: Time,
}

impl TimelineTrack {
    /// Place the full source range at `position`.
    pub fn new(track_info: Arc<MediaTrackInfo>, position: Time) -> Self {
        let end = if track_info.original_duration.is_numeric() {
            track_info.original_duration
        } else {
            DEFAULT_STILL_DURATION
        };
        Self::with_crop(track_info, Time::ZERO, end, position)
    }

    /// Place an explicit crop. Always constructs; check `is_valid` afterwards.
    pub fn with_crop(
        track_info: Arc<MediaTrackInfo>,
        crop_start: Time,
        crop_end: Time,
        position: Time,
    ) -> Self {
        let kind = ClipKind::from_media(track_info.media_kind);
        Self {
            id: Uuid::new_v4(),
            kind,
            mode: kind.default_mode(),
            track_info,
            crop_start,
            crop_end,
            position,
        }
    }

    /// A sticker or text clip backed by a synthetic asset. Primary kinds have
    /// no synthetic form and become a sticker.
    pub fn overlay(kind: ClipKind, duration: Time, position: Time) -> Self {
        let kind = if kind.is_overlay() {
            kind
        } else {
            warn!(?kind, "overlay requested with a primary kind, using Sticker");
            ClipKind::Sticker
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            mode: ExpansionMode::BoundedBySource,
            track_info: Arc::new(MediaTrackInfo::synthetic()),
            crop_start: Time::ZERO,
            crop_end: duration,
            position,
        }
    }

    pub fn with_mode(mut self, mode: ExpansionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Copy of this clip under a fresh id, sharing the source descriptor.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ClipKind {
        self.kind
    }

    pub fn mode(&self) -> ExpansionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ExpansionMode) {
        self.mode = mode;
    }

    pub fn track_info(&self) -> &Arc<MediaTrackInfo> {
        &self.track_info
    }

    pub fn crop_start(&self) -> Time {
        self.crop_start
    }

    pub fn crop_end(&self) -> Time {
        self.crop_end
    }

    pub fn crop_range(&self) -> CropRange {
        CropRange::new(self.crop_start, self.crop_end)
    }

    pub fn position_in_timeline(&self) -> Time {
        self.position
    }

    pub fn cropped_duration(&self) -> Time {
        self.crop_end - self.crop_start
    }

    pub fn end_time_in_timeline(&self) -> Time {
        self.position + self.cropped_duration()
    }

    pub fn is_valid(&self) -> bool {
        self.position.is_numeric() && self.crop_range().is_valid()
    }

    /// Half-open containment: `[position, end)`.
    pub fn contains_time(&self, time: Time) -> bool {
        time >= self.position && time < self.end_time_in_timeline()
    }

    /// Highest crop end allowed by the source and an optional ceiling given in
    /// timeline time.
    pub fn crop_limit(&self, ceiling: Option<Time>) -> Time {
        let source_limit = self.track_info.original_duration;
        match ceiling {
            Some(ceiling) => source_limit.min(self.crop_start + (ceiling - self.position)),
            None => source_limit,
        }
    }

    /// Whether the left boundary sits at the start of the source.
    pub fn reaches_head(&self, tolerance: Time) -> bool {
        match self.mode {
            ExpansionMode::UnboundedGrowable => false,
            ExpansionMode::BoundedBySource => self.crop_start <= tolerance,
        }
    }

    /// Whether the right boundary sits at the source end or at `ceiling`.
    pub fn reaches_end(&self, ceiling: Option<Time>, tolerance: Time) -> bool {
        match self.mode {
            ExpansionMode::UnboundedGrowable => false,
            ExpansionMode::BoundedBySource => {
                self.crop_end >= self.crop_limit(ceiling) - tolerance
            }
        }
    }

    pub fn update_crop_range(&mut self, start: Time, end: Time) -> Result<(), Rejection> {
        if !start.is_numeric() || !end.is_numeric() {
            return Err(Rejection::NonFiniteTime);
        }
        if end <= start {
            return Err(Rejection::EmptyRange);
        }
        if start.is_negative() {
            return Err(Rejection::NegativeStart);
        }
        if end > self.track_info.original_duration {
            return Err(Rejection::ExceedsSource);
        }
        self.crop_start = start;
        self.crop_end = end;
        Ok(())
    }

    pub fn move_to_position(&mut self, position: Time) -> Result<(), Rejection> {
        if !position.is_numeric() {
            return Err(Rejection::NonFiniteTime);
        }
        if position.is_negative() {
            return Err(Rejection::NegativePosition);
        }
        self.position = position;
        Ok(())
    }

    /// Raw write used by the trim engine, which enforces its own bounds (and
    /// lets unbounded clips go negative mid-gesture).
    pub(crate) fn set_crop(&mut self, range: CropRange) {
        self.crop_start = range.start;
        self.crop_end = range.end;
    }
}
