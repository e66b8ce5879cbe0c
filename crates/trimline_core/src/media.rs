use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::Time;

// ---------------------------------------------------------------------------
// MediaKind / Size
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

// ---------------------------------------------------------------------------
// MediaTrackInfo
// ---------------------------------------------------------------------------

/// Descriptor of one stream inside a media source. Built once when a clip is
/// added and shared (via `Arc`) by every track cut from the same stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaTrackInfo {
    /// Opaque handle of the source this stream belongs to. Thumbnail
    /// requests are addressed by it.
    pub source_id: Uuid,
    pub track_id: u32,
    pub natural_size: Size,
    pub original_duration: Time,
    pub frame_rate: f32,
    pub media_kind: MediaKind,
}

impl MediaTrackInfo {
    pub fn new(
        source_id: Uuid,
        track_id: u32,
        media_kind: MediaKind,
        original_duration: Time,
        natural_size: Size,
        frame_rate: f32,
    ) -> Self {
        Self {
            source_id,
            track_id,
            natural_size,
            original_duration,
            frame_rate,
            media_kind,
        }
    }

    /// Predefined asset with no natural end, used for stickers and text.
    pub fn synthetic() -> Self {
        Self {
            source_id: Uuid::new_v4(),
            track_id: 0,
            natural_size: Size::ZERO,
            original_duration: Time::INDEFINITE,
            frame_rate: 0.0,
            media_kind: MediaKind::Image,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.original_duration.is_indefinite()
    }

    /// Square bounds a decoder should scale frames into so that the short
    /// edge of the frame fills `target.width`.
    pub fn thumbnail_bounds(&self, target: Size) -> Size {
        let natural = self.natural_size;
        if target.is_empty() || natural.is_empty() {
            return target;
        }
        let side = if natural.width > natural.height {
            target.width / natural.height * natural.width
        } else {
            target.width / natural.width * natural.height
        };
        Size::new(side, side)
    }
}

// ---------------------------------------------------------------------------
// MediaSource
// ---------------------------------------------------------------------------

/// Provider of stream descriptors for an opaque media handle. Queried once per
/// added clip.
pub trait MediaSource {
    fn source_id(&self) -> Uuid;

    fn tracks(&self) -> Vec<MediaTrackInfo>;

    fn first_track(&self, kind: MediaKind) -> Option<MediaTrackInfo> {
        self.tracks().into_iter().find(|t| t.media_kind == kind)
    }
}

/// A source whose streams were already probed.
#[derive(Debug, Clone)]
pub struct ProbedSource {
    id: Uuid,
    name: String,
    tracks: Vec<MediaTrackInfo>,
}

impl ProbedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_video(mut self, duration: Time, natural_size: Size, frame_rate: f32) -> Self {
        let track_id = self.next_track_id();
        self.tracks.push(MediaTrackInfo::new(
            self.id,
            track_id,
            MediaKind::Video,
            duration,
            natural_size,
            frame_rate,
        ));
        self
    }

    pub fn with_audio(mut self, duration: Time) -> Self {
        let track_id = self.next_track_id();
        self.tracks.push(MediaTrackInfo::new(
            self.id,
            track_id,
            MediaKind::Audio,
            duration,
            Size::ZERO,
            0.0,
        ));
        self
    }

    pub fn with_image(mut self, natural_size: Size) -> Self {
        let track_id = self.next_track_id();
        self.tracks.push(MediaTrackInfo::new(
            self.id,
            track_id,
            MediaKind::Image,
            Time::INDEFINITE,
            natural_size,
            0.0,
        ));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn next_track_id(&self) -> u32 {
        self.tracks.len() as u32 + 1
    }
}

impl MediaSource for ProbedSource {
    fn source_id(&self) -> Uuid {
        self.id
    }

    fn tracks(&self) -> Vec<MediaTrackInfo> {
        self.tracks.clone()
    }
}
