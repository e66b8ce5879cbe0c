use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::TimelineDataModel;
use crate::time::Time;
use crate::track::CropRange;

/// What happened to one overlay during a sync pass.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum OverlayAction {
    /// The overlay ran past the new ceiling and was cut back to it.
    Trimmed,
    /// The overlay ended at the previous ceiling and now ends at the new one.
    Redocked,
    Unchanged,
    /// The overlay starts at or after the ceiling; no crop fits, left as is.
    Stranded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayOutcome {
    pub track_id: Uuid,
    pub action: OverlayAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub previous_ceiling: Time,
    pub ceiling: Time,
    pub outcomes: Vec<OverlayOutcome>,
}

impl SyncReport {
    pub fn action_for(&self, id: Uuid) -> Option<OverlayAction> {
        self.outcomes
            .iter()
            .find(|o| o.track_id == id)
            .map(|o| o.action)
    }

    pub fn count(&self, action: OverlayAction) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }
}

/// Keeps sticker and text clips in step with the primary row.
///
/// An overlay whose end lies within `dock_tolerance` of the previous primary
/// end is treated as docked and follows the end wherever it moves. Anything
/// running past the new end is cut back regardless of docking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySyncPolicy {
    pub dock_tolerance: Time,
}

impl Default for OverlaySyncPolicy {
    fn default() -> Self {
        Self {
            dock_tolerance: Time::from_millis(100),
        }
    }
}

impl OverlaySyncPolicy {
    pub fn new(dock_tolerance: Time) -> Self {
        Self { dock_tolerance }
    }

    /// Record the current primary duration as the ceiling overlays dock to,
    /// without touching them.
    pub fn refresh_ceiling(&self, model: &mut TimelineDataModel) -> Time {
        let ceiling = model.primary_duration();
        model.set_overlay_ceiling(ceiling);
        ceiling
    }

    /// Re-evaluate every overlay against the current primary duration and
    /// notify observers once if any crop moved.
    ///
    /// The model already does this after its own mutators; call it after
    /// writes that bypass them, such as a finished trim gesture.
    pub fn apply(&self, model: &mut TimelineDataModel) -> SyncReport {
        let (report, changed) = self.sync(model);
        if changed {
            model.notify("overlay-sync");
        }
        report
    }

    /// Docking is judged against the ceiling stored in the model, which is
    /// then replaced by the current primary duration. Crops are written
    /// without notifying; the flag says whether any moved.
    pub(crate) fn sync(&self, model: &mut TimelineDataModel) -> (SyncReport, bool) {
        let previous = model.overlay_ceiling();
        let ceiling = model.primary_duration();
        // With no primary clips there is nothing to follow.
        let has_primary = model.primaries().next().is_some();

        let plans: Vec<(Uuid, OverlayAction, Option<CropRange>)> = model
            .overlays()
            .map(|track| {
                let position = track.position_in_timeline();
                let end = track.end_time_in_timeline();
                let docked_range = || {
                    let limit = track.crop_limit(Some(ceiling));
                    CropRange::new(track.crop_start(), limit)
                };

                if !has_primary {
                    (track.id(), OverlayAction::Unchanged, None)
                } else if end > ceiling {
                    if position >= ceiling {
                        (track.id(), OverlayAction::Stranded, None)
                    } else {
                        (track.id(), OverlayAction::Trimmed, Some(docked_range()))
                    }
                } else if end != ceiling && (end - previous).abs() <= self.dock_tolerance {
                    (track.id(), OverlayAction::Redocked, Some(docked_range()))
                } else {
                    (track.id(), OverlayAction::Unchanged, None)
                }
            })
            .collect();

        let mut changed = false;
        let mut outcomes = Vec::with_capacity(plans.len());
        for (track_id, action, range) in plans {
            match (action, range) {
                (OverlayAction::Stranded, _) => {
                    warn!(track = %track_id, %ceiling, "overlay starts past the primary end");
                }
                (_, Some(range)) => {
                    changed |= model.write_crop(track_id, range);
                }
                _ => {}
            }
            outcomes.push(OverlayOutcome { track_id, action });
        }

        model.set_overlay_ceiling(ceiling);
        debug!(
            %previous,
            %ceiling,
            overlays = outcomes.len(),
            changed,
            "overlays synced"
        );

        let report = SyncReport {
            previous_ceiling: previous,
            ceiling,
            outcomes,
        };
        (report, changed)
    }
}
