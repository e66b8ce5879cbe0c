use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::cache::{ImageCache, Thumbnail};
use crate::error::{Result, ThumbError};
use crate::plan::{ThumbnailConfig, ThumbnailRequest};

/// Decoder that turns a request into pixels. Called on a blocking worker.
pub trait ThumbnailGenerator: Send + Sync + 'static {
    fn generate(&self, request: &ThumbnailRequest) -> Result<Thumbnail>;
}

#[derive(Debug)]
pub enum ThumbnailEvent {
    Ready {
        request: ThumbnailRequest,
        thumbnail: Thumbnail,
        /// True when served from the cache without decoding.
        cached: bool,
    },
    Failed {
        request: ThumbnailRequest,
        error: ThumbError,
    },
}

impl ThumbnailEvent {
    pub fn request(&self) -> &ThumbnailRequest {
        match self {
            ThumbnailEvent::Ready { request, .. } | ThumbnailEvent::Failed { request, .. } => {
                request
            }
        }
    }
}

/// Runs thumbnail decodes off the editing thread.
///
/// Work is spawned onto the tokio runtime and bounded by a semaphore. Results
/// come back through a channel which the owner drains on its own thread, so
/// nothing here ever touches the timeline model. Must be used from within a
/// tokio runtime.
pub struct ThumbnailScheduler {
    generator: Arc<dyn ThumbnailGenerator>,
    cache: Arc<ImageCache>,
    permits: Arc<Semaphore>,
    events_tx: mpsc::UnboundedSender<ThumbnailEvent>,
    events_rx: mpsc::UnboundedReceiver<ThumbnailEvent>,
    in_flight: HashMap<Uuid, Vec<AbortHandle>>,
}

impl ThumbnailScheduler {
    pub fn new(
        generator: Arc<dyn ThumbnailGenerator>,
        cache: Arc<ImageCache>,
        config: &ThumbnailConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            generator,
            cache,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            events_tx,
            events_rx,
            in_flight: HashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    /// Queue one request. A cache hit is posted straight to the event
    /// channel.
    pub fn request(&mut self, request: ThumbnailRequest) {
        if let Some(thumbnail) = self.cache.get(&request.cache_key()) {
            trace!(track = %request.track_id, time = %request.time, "thumbnail cache hit");
            let _ = self.events_tx.send(ThumbnailEvent::Ready {
                request,
                thumbnail,
                cached: true,
            });
            return;
        }

        let track_id = request.track_id;
        let generator = Arc::clone(&self.generator);
        let cache = Arc::clone(&self.cache);
        let permits = Arc::clone(&self.permits);
        let events = self.events_tx.clone();

        let task = tokio::spawn(async move {
            let event = match permits.acquire_owned().await {
                Ok(_permit) => decode(generator, cache, request).await,
                Err(_) => ThumbnailEvent::Failed {
                    request,
                    error: ThumbError::WorkerGone,
                },
            };
            let _ = events.send(event);
        });

        self.prune();
        self.in_flight
            .entry(track_id)
            .or_default()
            .push(task.abort_handle());
    }

    pub fn request_all(&mut self, requests: impl IntoIterator<Item = ThumbnailRequest>) {
        for request in requests {
            self.request(request);
        }
    }

    /// Abort every outstanding request for `track_id`, e.g. when the clip is
    /// removed or its visible range changes. A decode already running on a
    /// blocking worker finishes, but its result is never delivered.
    pub fn cancel_track(&mut self, track_id: Uuid) -> usize {
        let Some(handles) = self.in_flight.remove(&track_id) else {
            return 0;
        };
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        debug!(track = %track_id, aborted, "thumbnail requests cancelled");
        aborted
    }

    /// Requests for `track_id` that have not completed yet.
    pub fn pending(&mut self, track_id: Uuid) -> usize {
        self.prune();
        self.in_flight.get(&track_id).map_or(0, Vec::len)
    }

    /// Tracks with at least one request still running.
    pub fn busy_tracks(&mut self) -> usize {
        self.prune();
        self.in_flight.len()
    }

    /// Forget finished tasks, and tracks left with none.
    fn prune(&mut self) {
        self.in_flight.retain(|_, handles| {
            handles.retain(|h| !h.is_finished());
            !handles.is_empty()
        });
    }

    /// Non-blocking poll for the next finished request.
    pub fn try_next_event(&mut self) -> Option<ThumbnailEvent> {
        self.events_rx.try_recv().ok()
    }

    pub async fn next_event(&mut self) -> Option<ThumbnailEvent> {
        self.events_rx.recv().await
    }
}

async fn decode(
    generator: Arc<dyn ThumbnailGenerator>,
    cache: Arc<ImageCache>,
    request: ThumbnailRequest,
) -> ThumbnailEvent {
    let job = request.clone();
    let result = tokio::task::spawn_blocking(move || generator.generate(&job)).await;

    match result {
        Ok(Ok(thumbnail)) => {
            cache.insert(request.cache_key(), thumbnail.clone());
            ThumbnailEvent::Ready {
                request,
                thumbnail,
                cached: false,
            }
        }
        Ok(Err(error)) => {
            warn!(track = %request.track_id, time = %request.time, %error, "thumbnail failed");
            ThumbnailEvent::Failed { request, error }
        }
        Err(join) => {
            let error = if join.is_cancelled() {
                ThumbError::Cancelled
            } else {
                ThumbError::WorkerGone
            };
            ThumbnailEvent::Failed { request, error }
        }
    }
}
