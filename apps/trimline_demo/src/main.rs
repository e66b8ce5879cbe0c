use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use trimline_core::{
    ClipKind, EditorConfig, MediaKind, MediaSource, ProbedSource, Side, Size, Time,
    TimelineDataModel, TimelineTrack, TrimEngine,
};
use trimline_thumbs::{
    plan_requests, ImageCache, Thumbnail, ThumbnailConfig, ThumbnailEvent, ThumbnailGenerator,
    ThumbnailRequest, ThumbnailScheduler,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemoConfig {
    editor: EditorConfig,
    thumbnails: ThumbnailConfig,
}

fn load_config() -> Result<DemoConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(DemoConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
}

/// Stand-in decoder: paints each tile a shade derived from its source time.
struct ShadeGenerator;

impl ThumbnailGenerator for ShadeGenerator {
    fn generate(&self, request: &ThumbnailRequest) -> trimline_thumbs::Result<Thumbnail> {
        let shade = (request.time.as_seconds() * 20.0).rem_euclid(256.0) as u8;
        Ok(Thumbnail::solid(request.size, [shade, shade, shade, 255]))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    let editor = &config.editor;
    let engine = TrimEngine::new(editor.trim_config());
    let policy = editor.sync_policy();

    let mut model = TimelineDataModel::with_sync_policy(policy);
    model.subscribe(|m: &TimelineDataModel| {
        tracing::debug!(total = %m.total_duration(), tracks = m.track_count(), "model changed");
    });

    // Primary row: two clips back to back and a still.
    let intro = ProbedSource::new("intro.mov")
        .with_video(Time::secs(12), Size::new(1920.0, 1080.0), 30.0)
        .with_audio(Time::secs(12));
    let broll = ProbedSource::new("broll.mp4").with_video(
        Time::secs(8),
        Size::new(1280.0, 720.0),
        24.0,
    );
    let poster = ProbedSource::new("poster.png").with_image(Size::new(1080.0, 1350.0));

    let intro_id = model
        .add_track_from_source(&intro, Time::ZERO)
        .context("intro has no video stream")?;
    let broll_id = model
        .add_track_from_source(&broll, Time::secs(12))
        .context("b-roll has no video stream")?;
    let poster_info = poster
        .first_track(MediaKind::Image)
        .context("poster has no image stream")?;
    let poster_id = model.add_track(TimelineTrack::new(Arc::new(poster_info), Time::secs(20)))?;
    tracing::info!(source = poster.name(), "poster placed");

    // Overlays: a sticker docked to the end and a short caption.
    let min_overlay = editor.min_overlay_duration();
    let sticker = model
        .add_overlay(ClipKind::Sticker, Time::ZERO, min_overlay)
        .context("sticker rejected")?;
    let caption = model
        .add_overlay(ClipKind::Text, Time::secs(2), min_overlay)
        .context("caption rejected")?;
    model.update_track_crop_range(caption, Time::ZERO, Time::secs(4))?;
    tracing::info!(total = %model.total_duration(), "timeline assembled");

    // Pull the b-roll's out point in by three seconds.
    let mut gesture = engine
        .begin(&model, broll_id, Side::Right)
        .context("b-roll vanished")?;
    let second = editor.width_per_second;
    gesture.drag_by(&mut model, -second);
    gesture.drag_by(&mut model, -2.0 * second);
    let report = gesture.finish(&mut model, &policy);
    if let Some(sync) = &report.sync {
        for outcome in &sync.outcomes {
            tracing::info!(track = %outcome.track_id, action = ?outcome.action, "overlay synced");
        }
    }

    // Grow the still to the left; it is rebased when the drag ends.
    let mut gesture = engine
        .begin(&model, poster_id, Side::Left)
        .context("poster vanished")?;
    gesture.drag_to(&mut model, 1.5 * second);
    let report = gesture.finish(&mut model, &policy);
    tracing::info!(rebased = ?report.rebased_by.map(|t| t.to_string()), "poster extended");

    for issue in model.validate_timeline() {
        tracing::warn!(%issue, "timeline issue");
    }

    let thumbs = generate_thumbnails(&model, editor.width_per_second, &config.thumbnails).await;
    tracing::info!(
        tiles = thumbs,
        sticker_end = %model.track(sticker).map(|t| t.end_time_in_timeline()).unwrap_or(Time::INVALID),
        "thumbnails ready"
    );

    // Dropping the intro leaves the primary end where it was, so the
    // overlays stay put.
    model.remove_track(intro_id);
    tracing::info!(ceiling = %model.overlay_ceiling(), "intro removed");

    println!("{model}");
    println!("{}", serde_json::to_string_pretty(&model.snapshot())?);
    Ok(())
}

async fn generate_thumbnails(
    model: &TimelineDataModel,
    width_per_second: f64,
    config: &ThumbnailConfig,
) -> usize {
    let cache = Arc::new(ImageCache::new());
    let mut scheduler = ThumbnailScheduler::new(Arc::new(ShadeGenerator), cache, config);

    let mut expected = 0;
    for track in model.tracks() {
        let requests = plan_requests(track, width_per_second, config);
        expected += requests.len();
        scheduler.request_all(requests);
    }

    let mut ready = 0;
    for _ in 0..expected {
        match scheduler.next_event().await {
            Some(ThumbnailEvent::Ready { .. }) => ready += 1,
            Some(ThumbnailEvent::Failed { request, error }) => {
                tracing::warn!(track = %request.track_id, %error, "tile failed");
            }
            None => break,
        }
    }
    ready
}
