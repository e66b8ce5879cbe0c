use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Rejection;
use crate::media::{MediaKind, MediaSource};
use crate::overlay_sync::OverlaySyncPolicy;
use crate::time::Time;
use crate::track::{ClipKind, CropRange, ExpansionMode, TimelineTrack};

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Receives a "timeline changed" signal after every successful mutation.
///
/// The payload is the model itself, not a diff: re-read whatever you need.
/// Handlers get a shared reference, so they cannot mutate the model from
/// inside a notification.
pub trait TimelineObserver {
    fn timeline_changed(&mut self, model: &TimelineDataModel);
}

impl<F> TimelineObserver for F
where
    F: FnMut(&TimelineDataModel),
{
    fn timeline_changed(&mut self, model: &TimelineDataModel) {
        self(model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

// ---------------------------------------------------------------------------
// TimelineIssue
// ---------------------------------------------------------------------------

/// A problem reported by [`TimelineDataModel::validate_timeline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TimelineIssue {
    InvalidTrack { index: usize, id: Uuid },
    NegativePosition { index: usize, id: Uuid },
    NegativeCropStart { index: usize, id: Uuid },
    CropEndExceedsSource { index: usize, id: Uuid },
    OverlayPastPrimaryEnd { index: usize, id: Uuid },
}

impl fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineIssue::InvalidTrack { index, .. } => {
                write!(f, "Track {index} has invalid time configuration")
            }
            TimelineIssue::NegativePosition { index, .. } => {
                write!(f, "Track {index} has negative position")
            }
            TimelineIssue::NegativeCropStart { index, .. } => {
                write!(f, "Track {index} has negative crop start time")
            }
            TimelineIssue::CropEndExceedsSource { index, .. } => {
                write!(f, "Track {index} crop end time exceeds original duration")
            }
            TimelineIssue::OverlayPastPrimaryEnd { index, .. } => {
                write!(f, "Track {index} overlay extends past the primary end")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read model handed to presentation code. Times are in seconds.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineSnapshot {
    pub total_duration: f64,
    pub primary_duration: f64,
    pub tracks: Vec<TrackSnapshot>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackSnapshot {
    pub id: Uuid,
    pub kind: ClipKind,
    pub mode: ExpansionMode,
    pub source_id: Uuid,
    pub position: f64,
    pub crop_start: f64,
    pub crop_end: f64,
    pub duration: f64,
    pub end: f64,
    pub valid: bool,
}

impl From<&TimelineTrack> for TrackSnapshot {
    fn from(track: &TimelineTrack) -> Self {
        Self {
            id: track.id(),
            kind: track.kind(),
            mode: track.mode(),
            source_id: track.track_info().source_id,
            position: track.position_in_timeline().as_seconds(),
            crop_start: track.crop_start().as_seconds(),
            crop_end: track.crop_end().as_seconds(),
            duration: track.cropped_duration().as_seconds(),
            end: track.end_time_in_timeline().as_seconds(),
            valid: track.is_valid(),
        }
    }
}

// ---------------------------------------------------------------------------
// TimelineDataModel
// ---------------------------------------------------------------------------

/// Ordered collection of clips for one editing session.
///
/// Sequence order is the visual order; placement in time comes from each
/// track's position. Tracks may overlap freely. Not thread-safe: drive it from
/// one logical thread.
///
/// Any mutator that adds, removes, moves or crops a primary clip re-runs the
/// overlay sync before observers hear about the change.
#[derive(Default)]
pub struct TimelineDataModel {
    tracks: Vec<TimelineTrack>,
    /// Primary duration last published to overlays.
    overlay_ceiling: Time,
    sync_policy: OverlaySyncPolicy,
    observers: Vec<(ObserverId, Box<dyn TimelineObserver>)>,
    next_observer: u64,
}

impl TimelineDataModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sync_policy(sync_policy: OverlaySyncPolicy) -> Self {
        Self {
            sync_policy,
            ..Self::default()
        }
    }

    pub fn sync_policy(&self) -> &OverlaySyncPolicy {
        &self.sync_policy
    }

    // -- observers ----------------------------------------------------------

    pub fn subscribe(&mut self, observer: impl TimelineObserver + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub(crate) fn notify(&mut self, change: &'static str) {
        debug!(change, tracks = self.tracks.len(), "timeline changed");
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in observers.iter_mut() {
            observer.timeline_changed(self);
        }
        self.observers = observers;
    }

    // -- queries ------------------------------------------------------------

    pub fn tracks(&self) -> &[TimelineTrack] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: Uuid) -> Option<&TimelineTrack> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn track_at(&self, index: usize) -> Option<&TimelineTrack> {
        self.tracks.get(index)
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.tracks.iter().position(|t| t.id() == id)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.iter().filter(|t| t.kind().is_overlay())
    }

    pub fn primaries(&self) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.iter().filter(|t| t.kind().is_primary())
    }

    /// Latest end time over all tracks, or zero when empty. Recomputed on
    /// every call.
    pub fn total_duration(&self) -> Time {
        max_end(self.tracks.iter())
    }

    /// Latest end time over primary (non-overlay) tracks only.
    pub fn primary_duration(&self) -> Time {
        max_end(self.primaries())
    }

    /// The primary end overlays were last synchronised against. Equal to
    /// [`primary_duration`](Self::primary_duration) except while a trim
    /// gesture on a primary clip is in progress.
    pub fn overlay_ceiling(&self) -> Time {
        self.overlay_ceiling
    }

    pub(crate) fn set_overlay_ceiling(&mut self, ceiling: Time) {
        self.overlay_ceiling = ceiling;
    }

    /// All tracks whose `[position, end)` interval contains `time`.
    pub fn tracks_at_time(&self, time: Time) -> Vec<&TimelineTrack> {
        self.tracks.iter().filter(|t| t.contains_time(time)).collect()
    }

    /// Advisory report of tracks breaking the timeline invariants. Invalid
    /// states are allowed to exist; this only describes them.
    pub fn validate_timeline(&self) -> Vec<TimelineIssue> {
        let ceiling = self.primary_duration();
        let has_primary = self.primaries().next().is_some();
        let mut issues = Vec::new();
        for (index, track) in self.tracks.iter().enumerate() {
            let id = track.id();
            if !track.is_valid() {
                issues.push(TimelineIssue::InvalidTrack { index, id });
            }
            if track.position_in_timeline().is_negative() {
                issues.push(TimelineIssue::NegativePosition { index, id });
            }
            if track.crop_start().is_negative() {
                issues.push(TimelineIssue::NegativeCropStart { index, id });
            }
            if track.crop_end() > track.track_info().original_duration {
                issues.push(TimelineIssue::CropEndExceedsSource { index, id });
            }
            if has_primary && track.kind().is_overlay() && track.end_time_in_timeline() > ceiling {
                issues.push(TimelineIssue::OverlayPastPrimaryEnd { index, id });
            }
        }
        issues
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            total_duration: self.total_duration().as_seconds(),
            primary_duration: self.primary_duration().as_seconds(),
            tracks: self.tracks.iter().map(TrackSnapshot::from).collect(),
        }
    }

    // -- mutations ----------------------------------------------------------

    /// Append a track. Ids must be unique within the timeline.
    pub fn add_track(&mut self, track: TimelineTrack) -> Result<Uuid, Rejection> {
        let id = track.id();
        if self.track(id).is_some() {
            warn!(track = %id, "duplicate track id rejected");
            return Err(Rejection::DuplicateTrack(id));
        }
        let primary = track.kind().is_primary();
        self.tracks.push(track);
        self.commit("add", primary);
        Ok(id)
    }

    /// Build a full-range clip from the first video stream of `source`.
    ///
    /// Sources without a video stream (audio-only, stills) are not accepted
    /// here and yield `None`; construct those tracks explicitly.
    pub fn add_track_from_source(
        &mut self,
        source: &dyn MediaSource,
        position: Time,
    ) -> Option<Uuid> {
        let Some(info) = source.first_track(MediaKind::Video) else {
            debug!(source = %source.source_id(), "source has no video stream");
            return None;
        };
        self.add_track(TimelineTrack::new(Arc::new(info), position)).ok()
    }

    /// Add a sticker or text clip spanning the current primary duration, but
    /// never shorter than `min_duration`. The stored ceiling is left alone.
    pub fn add_overlay(&mut self, kind: ClipKind, position: Time, min_duration: Time) -> Option<Uuid> {
        if !kind.is_overlay() {
            warn!(?kind, "add_overlay called with a primary clip kind");
            return None;
        }
        let duration = self.primary_duration().max(min_duration);
        self.add_track(TimelineTrack::overlay(kind, duration, position)).ok()
    }

    pub fn remove_track(&mut self, id: Uuid) -> Option<TimelineTrack> {
        let index = self.index_of(id)?;
        self.remove_track_at(index)
    }

    pub fn remove_track_at(&mut self, index: usize) -> Option<TimelineTrack> {
        if index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        self.commit("remove", removed.kind().is_primary());
        Some(removed)
    }

    pub fn move_track(&mut self, id: Uuid, position: Time) -> Result<(), Rejection> {
        let track = self.track_mut(id)?;
        let primary = track.kind().is_primary();
        if let Err(reason) = track.move_to_position(position) {
            warn!(track = %id, %reason, "move rejected");
            return Err(reason);
        }
        self.commit("move", primary);
        Ok(())
    }

    pub fn update_track_crop_range(
        &mut self,
        id: Uuid,
        start: Time,
        end: Time,
    ) -> Result<(), Rejection> {
        let track = self.track_mut(id)?;
        let primary = track.kind().is_primary();
        if let Err(reason) = track.update_crop_range(start, end) {
            warn!(track = %id, %reason, "crop update rejected");
            return Err(reason);
        }
        self.commit("crop", primary);
        Ok(())
    }

    /// Move a track to a different index in the visual order.
    pub fn reorder_track(&mut self, id: Uuid, new_index: usize) -> Result<(), Rejection> {
        let len = self.tracks.len();
        let index = self.index_of(id).ok_or(Rejection::TrackNotFound(id))?;
        if new_index >= len {
            return Err(Rejection::IndexOutOfBounds {
                index: new_index,
                len,
            });
        }
        let track = self.tracks.remove(index);
        let primary = track.kind().is_primary();
        self.tracks.insert(new_index, track);
        self.commit("reorder", primary);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.overlay_ceiling = Time::ZERO;
        self.notify("clear");
    }

    /// Sync overlays if a primary clip was touched, then notify once.
    fn commit(&mut self, change: &'static str, primary_touched: bool) {
        if primary_touched {
            let policy = self.sync_policy;
            policy.sync(self);
        }
        self.notify(change);
    }

    /// Write a crop computed by the trim engine, bypassing the source bounds
    /// check so unbounded clips can run negative mid-gesture. Notifies only
    /// when the crop changed. Overlays are not synced here.
    pub(crate) fn apply_crop(&mut self, id: Uuid, range: CropRange, change: &'static str) -> bool {
        let changed = self.write_crop(id, range);
        if changed {
            self.notify(change);
        }
        changed
    }

    /// `apply_crop` without the notification.
    pub(crate) fn write_crop(&mut self, id: Uuid, range: CropRange) -> bool {
        let Ok(track) = self.track_mut(id) else {
            return false;
        };
        if track.crop_range() == range {
            return false;
        }
        track.set_crop(range);
        true
    }

    fn track_mut(&mut self, id: Uuid) -> Result<&mut TimelineTrack, Rejection> {
        self.tracks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(Rejection::TrackNotFound(id))
    }
}

fn max_end<'a>(tracks: impl Iterator<Item = &'a TimelineTrack>) -> Time {
    tracks
        .map(|t| t.end_time_in_timeline())
        .fold(Time::ZERO, Time::max)
}

impl fmt::Debug for TimelineDataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineDataModel")
            .field("tracks", &self.tracks)
            .field("overlay_ceiling", &self.overlay_ceiling)
            .field("sync_policy", &self.sync_policy)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl fmt::Display for TimelineDataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TimelineDataModel:")?;
        writeln!(f, "Total Duration: {}", self.total_duration())?;
        writeln!(f, "Track Count: {}", self.track_count())?;
        write!(f, "Tracks:")?;
        for (index, track) in self.tracks.iter().enumerate() {
            write!(
                f,
                "\nTrack {index} ({:?}): pos={}, crop={}-{}, duration={}",
                track.kind(),
                track.position_in_timeline(),
                track.crop_start(),
                track.crop_end(),
                track.cropped_duration(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaTrackInfo, ProbedSource, Size};
    use std::cell::Cell;
    use std::rc::Rc;

    fn video_track(duration_secs: i64, position_secs: i64) -> TimelineTrack {
        let info = MediaTrackInfo::new(
            Uuid::new_v4(),
            1,
            MediaKind::Video,
            Time::secs(duration_secs),
            Size::new(1280.0, 720.0),
            30.0,
        );
        TimelineTrack::new(Arc::new(info), Time::secs(position_secs))
    }

    fn counting_model() -> (TimelineDataModel, Rc<Cell<usize>>) {
        let mut model = TimelineDataModel::new();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        model.subscribe(move |_: &TimelineDataModel| seen.set(seen.get() + 1));
        (model, count)
    }

    fn three_track_model() -> (TimelineDataModel, [Uuid; 3]) {
        let mut model = TimelineDataModel::new();
        let a = model.add_track(video_track(5, 0)).unwrap();
        let b = model.add_track(video_track(7, 5)).unwrap();
        let c = model.add_track(video_track(3, 12)).unwrap();
        (model, [a, b, c])
    }

    // -----------------------------------------------------------------------
    // duration and queries
    // -----------------------------------------------------------------------

    #[test]
    fn empty_model_has_zero_duration() {
        let model = TimelineDataModel::new();
        assert!(model.is_empty());
        assert_eq!(model.total_duration(), Time::ZERO);
        assert_eq!(model.primary_duration(), Time::ZERO);
    }

    #[test]
    fn three_track_scenario() {
        let (model, [_, b, c]) = three_track_model();
        assert_eq!(model.total_duration(), Time::secs(15));

        let at_six = model.tracks_at_time(Time::secs(6));
        assert_eq!(at_six.len(), 1);
        assert_eq!(at_six[0].id(), b);

        let at_fourteen = model.tracks_at_time(Time::secs(14));
        assert_eq!(at_fourteen.len(), 1);
        assert_eq!(at_fourteen[0].id(), c);
    }

    #[test]
    fn overlapping_tracks_are_all_returned() {
        let mut model = TimelineDataModel::new();
        model.add_track(video_track(10, 0)).unwrap();
        model.add_track(video_track(4, 2)).unwrap();
        assert_eq!(model.tracks_at_time(Time::secs(3)).len(), 2);
        assert_eq!(model.tracks_at_time(Time::secs(8)).len(), 1);
        assert!(model.tracks_at_time(Time::secs(10)).is_empty());
    }

    #[test]
    fn total_duration_matches_max_end_after_edits() {
        let (mut model, [a, _, c]) = three_track_model();
        model.move_track(c, Time::secs(1)).unwrap();
        assert_eq!(model.total_duration(), Time::secs(12));
        model.update_track_crop_range(a, Time::ZERO, Time::secs(2)).unwrap();
        let expected = model
            .tracks()
            .iter()
            .map(|t| t.end_time_in_timeline())
            .fold(Time::ZERO, Time::max);
        assert_eq!(model.total_duration(), expected);
    }

    #[test]
    fn primary_duration_ignores_overlays() {
        let mut model = TimelineDataModel::new();
        model.add_track(video_track(6, 0)).unwrap();
        model
            .add_track(TimelineTrack::overlay(ClipKind::Text, Time::secs(9), Time::ZERO))
            .unwrap();
        assert_eq!(model.primary_duration(), Time::secs(6));
        assert_eq!(model.total_duration(), Time::secs(9));
        assert_eq!(model.overlays().count(), 1);
        assert_eq!(model.primaries().count(), 1);
    }

    #[test]
    fn lookups_return_none_when_absent() {
        let (mut model, [a, _, _]) = three_track_model();
        assert!(model.track(a).is_some());
        assert!(model.track_at(2).is_some());
        assert!(model.track_at(3).is_none());
        model.remove_track(a);
        assert!(model.track(a).is_none());
    }

    // -----------------------------------------------------------------------
    // mutations
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut model = TimelineDataModel::new();
        let track = video_track(5, 0);
        let copy = track.clone();
        let id = model.add_track(track).unwrap();
        assert_eq!(model.add_track(copy), Err(Rejection::DuplicateTrack(id)));
        assert_eq!(model.track_count(), 1);
    }

    #[test]
    fn add_from_source_requires_video() {
        let mut model = TimelineDataModel::new();
        let audio_only = ProbedSource::new("a.m4a").with_audio(Time::secs(3));
        assert!(model.add_track_from_source(&audio_only, Time::ZERO).is_none());

        let movie = ProbedSource::new("m.mp4")
            .with_audio(Time::secs(8))
            .with_video(Time::secs(8), Size::new(1920.0, 1080.0), 24.0);
        let id = model.add_track_from_source(&movie, Time::secs(2)).unwrap();
        let track = model.track(id).unwrap();
        assert_eq!(track.kind(), ClipKind::Video);
        assert_eq!(track.crop_range(), CropRange::new(Time::ZERO, Time::secs(8)));
        assert_eq!(track.end_time_in_timeline(), Time::secs(10));
    }

    #[test]
    fn remove_by_index_out_of_bounds_is_noop() {
        let (mut model, count) = counting_model();
        model.add_track(video_track(5, 0)).unwrap();
        assert!(model.remove_track_at(4).is_none());
        assert_eq!(model.track_count(), 1);
        assert_eq!(count.get(), 1);
        assert!(model.remove_track_at(0).is_some());
        assert!(model.is_empty());
    }

    #[test]
    fn unknown_id_is_reported_and_not_notified() {
        let (mut model, count) = counting_model();
        let ghost = Uuid::new_v4();
        assert_eq!(
            model.move_track(ghost, Time::secs(1)),
            Err(Rejection::TrackNotFound(ghost))
        );
        assert_eq!(
            model.update_track_crop_range(ghost, Time::ZERO, Time::secs(1)),
            Err(Rejection::TrackNotFound(ghost))
        );
        assert!(model.remove_track(ghost).is_none());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn rejected_crop_leaves_track_and_skips_notification() {
        let (mut model, count) = counting_model();
        let id = model.add_track(video_track(10, 0)).unwrap();
        let before = model.track(id).unwrap().clone();
        assert_eq!(
            model.update_track_crop_range(id, Time::secs(4), Time::secs(4)),
            Err(Rejection::EmptyRange)
        );
        assert_eq!(model.track(id).unwrap(), &before);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn reorder_moves_visual_position() {
        let (mut model, [a, b, c]) = three_track_model();
        model.reorder_track(c, 0).unwrap();
        let order: Vec<Uuid> = model.tracks().iter().map(|t| t.id()).collect();
        assert_eq!(order, vec![c, a, b]);
        assert_eq!(
            model.reorder_track(a, 3),
            Err(Rejection::IndexOutOfBounds { index: 3, len: 3 })
        );
        // Visual order does not affect timing.
        assert_eq!(model.total_duration(), Time::secs(15));
    }

    #[test]
    fn add_overlay_spans_primary_duration_with_floor() {
        let mut model = TimelineDataModel::new();
        let short = model
            .add_overlay(ClipKind::Sticker, Time::ZERO, Time::secs(3))
            .unwrap();
        assert_eq!(model.track(short).unwrap().cropped_duration(), Time::secs(3));

        model.add_track(video_track(12, 0)).unwrap();
        let long = model.add_overlay(ClipKind::Text, Time::ZERO, Time::secs(3)).unwrap();
        assert_eq!(model.track(long).unwrap().cropped_duration(), Time::secs(12));
        assert_eq!(model.overlay_ceiling(), Time::secs(12));

        assert!(model
            .add_overlay(ClipKind::Video, Time::ZERO, Time::secs(3))
            .is_none());
    }

    // -----------------------------------------------------------------------
    // overlays following primary edits
    // -----------------------------------------------------------------------

    fn docked_sticker(model: &mut TimelineDataModel) -> Uuid {
        model
            .add_overlay(ClipKind::Sticker, Time::ZERO, Time::secs(1))
            .unwrap()
    }

    fn free_sticker(model: &mut TimelineDataModel, secs: i64) -> Uuid {
        let id = docked_sticker(model);
        model
            .update_track_crop_range(id, Time::ZERO, Time::secs(secs))
            .unwrap();
        id
    }

    fn end_of(model: &TimelineDataModel, id: Uuid) -> Time {
        model.track(id).unwrap().end_time_in_timeline()
    }

    #[test]
    fn primary_crop_pulls_docked_overlay_in() {
        let (mut model, count) = counting_model();
        let video = model.add_track(video_track(10, 0)).unwrap();
        let sticker = docked_sticker(&mut model);
        let seen = count.get();

        model
            .update_track_crop_range(video, Time::ZERO, Time::secs(6))
            .unwrap();
        assert_eq!(end_of(&model, sticker), Time::secs(6));
        assert_eq!(model.overlay_ceiling(), Time::secs(6));
        assert_eq!(count.get(), seen + 1);
    }

    #[test]
    fn adding_primary_moves_docked_overlay_only() {
        let mut model = TimelineDataModel::new();
        model.add_track(video_track(10, 0)).unwrap();
        let docked = docked_sticker(&mut model);
        let free = free_sticker(&mut model, 5);
        assert_eq!(model.overlay_ceiling(), Time::secs(10));

        model.add_track(video_track(5, 10)).unwrap();
        assert_eq!(model.overlay_ceiling(), Time::secs(15));
        assert_eq!(end_of(&model, docked), Time::secs(15));
        assert_eq!(end_of(&model, free), Time::secs(5));
    }

    #[test]
    fn moving_primary_later_extends_docked_overlay() {
        let mut model = TimelineDataModel::new();
        let video = model.add_track(video_track(10, 0)).unwrap();
        let docked = docked_sticker(&mut model);
        let free = free_sticker(&mut model, 4);

        model.move_track(video, Time::secs(3)).unwrap();
        assert_eq!(end_of(&model, docked), Time::secs(13));
        assert_eq!(end_of(&model, free), Time::secs(4));
    }

    #[test]
    fn removing_longest_primary_trims_overlays() {
        let mut model = TimelineDataModel::new();
        let long = model.add_track(video_track(10, 0)).unwrap();
        model.add_track(video_track(5, 0)).unwrap();
        let docked = docked_sticker(&mut model);
        let free = free_sticker(&mut model, 8);

        model.remove_track(long).unwrap();
        assert_eq!(model.primary_duration(), Time::secs(5));
        assert_eq!(end_of(&model, docked), Time::secs(5));
        assert_eq!(end_of(&model, free), Time::secs(5));
        assert!(model.validate_timeline().is_empty());
    }

    #[test]
    fn removing_by_index_syncs_too() {
        let mut model = TimelineDataModel::new();
        model.add_track(video_track(5, 0)).unwrap();
        model.add_track(video_track(10, 0)).unwrap();
        let docked = docked_sticker(&mut model);

        model.remove_track_at(1).unwrap();
        assert_eq!(end_of(&model, docked), Time::secs(5));
        assert_eq!(model.overlay_ceiling(), Time::secs(5));
    }

    #[test]
    fn reordering_primary_leaves_overlays_in_place() {
        let (mut model, count) = counting_model();
        let video = model.add_track(video_track(10, 0)).unwrap();
        let docked = docked_sticker(&mut model);
        let seen = count.get();

        model.reorder_track(video, 1).unwrap();
        assert_eq!(end_of(&model, docked), Time::secs(10));
        assert_eq!(count.get(), seen + 1);
    }

    #[test]
    fn overlay_edits_do_not_sync() {
        let mut model = TimelineDataModel::new();
        model.add_track(video_track(10, 0)).unwrap();
        let sticker = docked_sticker(&mut model);

        model.move_track(sticker, Time::secs(8)).unwrap();
        assert_eq!(end_of(&model, sticker), Time::secs(18));
        assert_eq!(model.overlay_ceiling(), Time::secs(10));

        let issues = model.validate_timeline();
        assert_eq!(
            issues,
            vec![TimelineIssue::OverlayPastPrimaryEnd { index: 1, id: sticker }]
        );
        assert_eq!(
            issues[0].to_string(),
            "Track 1 overlay extends past the primary end"
        );
    }

    #[test]
    fn model_uses_its_own_sync_policy() {
        let strict = OverlaySyncPolicy::new(Time::ZERO);
        let mut model = TimelineDataModel::with_sync_policy(strict);
        assert_eq!(model.sync_policy(), &strict);
        let video = model.add_track(video_track(20, 0)).unwrap();
        model
            .update_track_crop_range(video, Time::ZERO, Time::secs(10))
            .unwrap();
        let near = model
            .add_track(TimelineTrack::overlay(ClipKind::Text, Time::from_millis(9_950), Time::ZERO))
            .unwrap();

        model
            .update_track_crop_range(video, Time::ZERO, Time::secs(12))
            .unwrap();
        assert_eq!(end_of(&model, near), Time::from_millis(9_950));
    }

    #[test]
    fn add_overlay_keeps_existing_docking() {
        let mut model = TimelineDataModel::new();
        let video = model.add_track(video_track(10, 0)).unwrap();
        let first = docked_sticker(&mut model);
        // A write that bypasses the mutators, as a drag does.
        model.apply_crop(video, CropRange::new(Time::ZERO, Time::secs(8)), "drag");

        let second = docked_sticker(&mut model);
        assert_eq!(end_of(&model, second), Time::secs(8));
        assert_eq!(model.overlay_ceiling(), Time::secs(10));

        let report = OverlaySyncPolicy::default().apply(&mut model);
        assert_eq!(end_of(&model, first), Time::secs(8));
        assert_eq!(report.previous_ceiling, Time::secs(10));
    }

    // -----------------------------------------------------------------------
    // notifications
    // -----------------------------------------------------------------------

    #[test]
    fn every_successful_mutation_notifies_once() {
        let (mut model, count) = counting_model();
        let id = model.add_track(video_track(10, 0)).unwrap();
        assert_eq!(count.get(), 1);
        model.move_track(id, Time::secs(2)).unwrap();
        assert_eq!(count.get(), 2);
        model.update_track_crop_range(id, Time::secs(1), Time::secs(9)).unwrap();
        assert_eq!(count.get(), 3);
        model.remove_track(id).unwrap();
        assert_eq!(count.get(), 4);
        model.clear();
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn observers_see_post_mutation_state() {
        let mut model = TimelineDataModel::new();
        let seen = Rc::new(Cell::new(Time::ZERO));
        let sink = Rc::clone(&seen);
        model.subscribe(move |m: &TimelineDataModel| sink.set(m.total_duration()));
        model.add_track(video_track(7, 3)).unwrap();
        assert_eq!(seen.get(), Time::secs(10));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut model, count) = counting_model();
        let extra = Rc::new(Cell::new(0));
        let sink = Rc::clone(&extra);
        let id = model.subscribe(move |_: &TimelineDataModel| sink.set(sink.get() + 1));
        model.add_track(video_track(1, 0)).unwrap();
        assert!(model.unsubscribe(id));
        assert!(!model.unsubscribe(id));
        model.clear();
        assert_eq!(extra.get(), 1);
        assert_eq!(count.get(), 2);
    }

    // -----------------------------------------------------------------------
    // validation
    // -----------------------------------------------------------------------

    #[test]
    fn valid_timeline_has_no_issues() {
        let (model, _) = three_track_model();
        assert!(model.validate_timeline().is_empty());
    }

    #[test]
    fn negative_crop_start_is_reported() {
        let mut model = TimelineDataModel::new();
        let info = video_track(10, 0).track_info().clone();
        let track = TimelineTrack::with_crop(info, -Time::secs(1), Time::secs(5), Time::ZERO);
        let id = model.add_track(track).unwrap();

        let issues = model.validate_timeline();
        assert!(!issues.is_empty());
        assert!(issues.contains(&TimelineIssue::NegativeCropStart { index: 0, id }));
        assert!(issues
            .iter()
            .any(|i| i.to_string() == "Track 0 has negative crop start time"));
    }

    #[test]
    fn every_issue_kind_is_reported() {
        let mut model = TimelineDataModel::new();
        let info = video_track(10, 0).track_info().clone();
        let empty = TimelineTrack::with_crop(info.clone(), Time::secs(2), Time::secs(2), Time::ZERO);
        let early = TimelineTrack::with_crop(info.clone(), Time::ZERO, Time::secs(2), -Time::secs(3));
        let long = TimelineTrack::with_crop(info, Time::ZERO, Time::secs(12), Time::ZERO);
        model.add_track(empty).unwrap();
        model.add_track(early).unwrap();
        model.add_track(long).unwrap();

        let issues = model.validate_timeline();
        assert!(matches!(issues[0], TimelineIssue::InvalidTrack { index: 0, .. }));
        assert!(matches!(issues[1], TimelineIssue::NegativePosition { index: 1, .. }));
        assert!(matches!(issues[2], TimelineIssue::CropEndExceedsSource { index: 2, .. }));
        assert_eq!(issues.len(), 3);
    }

    // -----------------------------------------------------------------------
    // presentation
    // -----------------------------------------------------------------------

    #[test]
    fn snapshot_serializes_seconds() {
        let (model, [a, _, _]) = three_track_model();
        let json = serde_json::to_value(model.snapshot()).unwrap();
        assert_eq!(json["total_duration"], 15.0);
        assert_eq!(json["tracks"].as_array().unwrap().len(), 3);
        assert_eq!(json["tracks"][0]["id"], a.to_string());
        assert_eq!(json["tracks"][1]["end"], 12.0);
        assert_eq!(json["tracks"][2]["kind"], "Video");
    }

    #[test]
    fn display_summarises_tracks() {
        let (model, _) = three_track_model();
        let text = model.to_string();
        assert!(text.contains("Total Duration: 00:00:15.000"));
        assert!(text.contains("Track Count: 3"));
        assert!(text.contains("Track 1 (Video): pos=00:00:05.000"));
    }
}
