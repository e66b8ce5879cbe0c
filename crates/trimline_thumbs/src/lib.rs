pub mod cache;
pub mod error;
pub mod plan;
pub mod scheduler;

pub use cache::{ImageCache, PixelSize, Thumbnail};
pub use error::{Result, ThumbError};
pub use plan::{plan_requests, ThumbnailConfig, ThumbnailRequest};
pub use scheduler::{ThumbnailEvent, ThumbnailGenerator, ThumbnailScheduler};
