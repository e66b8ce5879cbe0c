use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use trimline_core::Time;
use uuid::Uuid;

/// Integer pixel dimensions of a rendered thumbnail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round a size in points to whole pixels, never below 1x1.
    pub fn from_points(width: f64, height: f64) -> Self {
        let px = |v: f64| if v.is_finite() { v.round().max(1.0) as u32 } else { 1 };
        Self::new(px(width), px(height))
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// RGBA8 image. Cloning shares the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub size: PixelSize,
    pub rgba: Arc<[u8]>,
}

impl Thumbnail {
    pub fn solid(size: PixelSize, color: [u8; 4]) -> Self {
        let rgba: Vec<u8> = color
            .iter()
            .copied()
            .cycle()
            .take(size.pixel_count() * 4)
            .collect();
        Self {
            size,
            rgba: rgba.into(),
        }
    }

    pub fn shares_pixels(&self, other: &Thumbnail) -> bool {
        Arc::ptr_eq(&self.rgba, &other.rgba)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_id: Uuid,
    pub time: Time,
    pub size: PixelSize,
}

const PLACEHOLDER_COLOR: [u8; 4] = [0x3a, 0x3a, 0x3c, 0xff];

/// Decoded frames and placeholder tiles, shared between the scheduler's
/// workers and whoever draws the timeline. Construct one per session and
/// pass it around in an `Arc`.
#[derive(Debug, Default)]
pub struct ImageCache {
    frames: Mutex<HashMap<CacheKey, Thumbnail>>,
    placeholders: Mutex<HashMap<PixelSize, Thumbnail>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Thumbnail> {
        lock(&self.frames).get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, thumbnail: Thumbnail) {
        lock(&self.frames).insert(key, thumbnail);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        lock(&self.frames).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every frame decoded from `source_id`. Returns how many went.
    pub fn evict_source(&self, source_id: Uuid) -> usize {
        let mut frames = lock(&self.frames);
        let before = frames.len();
        frames.retain(|key, _| key.source_id != source_id);
        before - frames.len()
    }

    pub fn clear(&self) {
        lock(&self.frames).clear();
        lock(&self.placeholders).clear();
    }

    /// Neutral tile shown while a frame is being decoded. One buffer per size.
    pub fn placeholder(&self, size: PixelSize) -> Thumbnail {
        lock(&self.placeholders)
            .entry(size)
            .or_insert_with(|| Thumbnail::solid(size, PLACEHOLDER_COLOR))
            .clone()
    }
}

// Every critical section is a single map call, so a poisoned map is intact.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(source_id: Uuid, secs: i64) -> CacheKey {
        CacheKey {
            source_id,
            time: Time::secs(secs),
            size: PixelSize::new(40, 54),
        }
    }

    #[test]
    fn insert_and_get() {
        let cache = ImageCache::new();
        let source = Uuid::new_v4();
        assert!(cache.get(&key(source, 1)).is_none());

        let thumb = Thumbnail::solid(PixelSize::new(2, 2), [1, 2, 3, 4]);
        cache.insert(key(source, 1), thumb.clone());
        assert_eq!(cache.get(&key(source, 1)), Some(thumb));
        assert!(!cache.contains(&key(source, 2)));
    }

    #[test]
    fn keys_compare_time_by_value() {
        let cache = ImageCache::new();
        let source = Uuid::new_v4();
        cache.insert(key(source, 2), Thumbnail::solid(PixelSize::new(1, 1), [0; 4]));
        let same_instant = CacheKey {
            time: Time::new(1200, 600).unwrap(),
            ..key(source, 0)
        };
        assert!(cache.contains(&same_instant));
    }

    #[test]
    fn placeholder_is_memoized_per_size() {
        let cache = ImageCache::new();
        let a = cache.placeholder(PixelSize::new(40, 54));
        let b = cache.placeholder(PixelSize::new(40, 54));
        let c = cache.placeholder(PixelSize::new(20, 27));
        assert!(a.shares_pixels(&b));
        assert!(!a.shares_pixels(&c));
        assert_eq!(a.rgba.len(), 40 * 54 * 4);
        assert_eq!(&a.rgba[..4], &PLACEHOLDER_COLOR);
    }

    #[test]
    fn evict_source_only_drops_that_source() {
        let cache = ImageCache::new();
        let keep = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let tile = Thumbnail::solid(PixelSize::new(1, 1), [0; 4]);
        cache.insert(key(keep, 0), tile.clone());
        cache.insert(key(gone, 0), tile.clone());
        cache.insert(key(gone, 1), tile);
        assert_eq!(cache.evict_source(gone), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn pixel_size_from_points() {
        assert_eq!(PixelSize::from_points(39.6, 54.2), PixelSize::new(40, 54));
        assert_eq!(PixelSize::from_points(0.0, f64::NAN), PixelSize::new(1, 1));
    }
}
