pub mod config;
pub mod error;
pub mod media;
pub mod model;
pub mod overlay_sync;
pub mod time;
pub mod track;
pub mod trim;

pub use config::EditorConfig;
pub use error::{CoreError, Rejection};
pub use media::{MediaKind, MediaSource, MediaTrackInfo, ProbedSource, Size};
pub use model::{ObserverId, TimelineDataModel, TimelineIssue, TimelineObserver, TimelineSnapshot};
pub use overlay_sync::{OverlayAction, OverlaySyncPolicy, SyncReport};
pub use time::Time;
pub use track::{ClipKind, CropRange, ExpansionMode, TimelineTrack};
pub use trim::{Side, TrimConfig, TrimEngine, TrimGesture, TrimReport};
