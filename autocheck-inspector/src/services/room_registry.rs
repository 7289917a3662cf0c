//! Room registry
//!
//! Ordered collection of room entries for one inspection session. Insertion
//! order is display order. Each add or retake schedules exactly one
//! assessment task tagged with the entry's generation; a completion is
//! applied only if the entry still exists and its generation still matches.
//! Superseded or removed work is never aborted, its result is just dropped.
//!
//! All mutations, including completion callbacks, go through one async
//! mutex, so the registry can be shared freely across a multi-threaded
//! runtime.

use autocheck_common::events::{AutoCheckEvent, EventBus};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CleaningAnalysis, GlobalSummary, ImageUpload, RegistrySnapshot, RoomEntry, RoomId, RoomStatus,
    RoomView,
};
use crate::services::aggregate::compute_global;
use crate::services::assessment_client::RoomAssessor;
use crate::services::preview_store::{Preview, PreviewStore};

/// Preview resource counters, for diagnostics and leak checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewStats {
    pub live: usize,
    pub created: u64,
    pub released: u64,
}

#[derive(Default)]
struct RegistryInner {
    entries: Vec<RoomEntry>,
    previews: PreviewStore,
}

impl RegistryInner {
    fn find_mut(&mut self, id: RoomId) -> Option<&mut RoomEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

struct Shared {
    assessor: Arc<dyn RoomAssessor>,
    event_bus: EventBus,
    tasks: TaskTracker,
    inner: Mutex<RegistryInner>,
}

/// Session-scoped room registry (cheap to clone, all clones share state)
#[derive(Clone)]
pub struct RoomRegistry {
    shared: Arc<Shared>,
}

impl RoomRegistry {
    pub fn new(assessor: Arc<dyn RoomAssessor>, event_bus: EventBus) -> Self {
        Self {
            shared: Arc::new(Shared {
                assessor,
                event_bus,
                tasks: TaskTracker::new(),
                inner: Mutex::new(RegistryInner::default()),
            }),
        }
    }

    /// Add one room and schedule its assessment. Returns without waiting for it.
    pub async fn add(&self, image: ImageUpload) -> RoomId {
        let id = Uuid::new_v4();
        let mut inner = self.shared.inner.lock().await;

        let preview = inner.previews.create(&image);
        let entry = RoomEntry::new(id, image.clone(), preview);
        let generation = entry.generation;
        inner.entries.push(entry);

        info!(
            room_id = %id,
            mime_type = %image.mime_type,
            image_bytes = image.len(),
            "Room added"
        );

        self.emit(AutoCheckEvent::RoomAdded {
            room_id: id,
            generation,
            timestamp: Utc::now(),
        });
        self.emit_global(&inner.entries);
        self.schedule(id, generation, image);

        id
    }

    /// Add several rooms at once; ids are returned in upload order
    pub async fn add_many(&self, images: Vec<ImageUpload>) -> Vec<RoomId> {
        let mut ids = Vec::with_capacity(images.len());
        for image in images {
            ids.push(self.add(image).await);
        }
        ids
    }

    /// Replace a room's image and reassess it
    ///
    /// Keeps the room's id and position. Returns `false` (and does nothing)
    /// when the room does not exist.
    pub async fn retake(&self, id: RoomId, image: ImageUpload) -> bool {
        let mut guard = self.shared.inner.lock().await;
        let inner = &mut *guard;

        let Some(entry) = inner.entries.iter_mut().find(|e| e.id == id) else {
            debug!(room_id = %id, "Retake ignored, room not found");
            return false;
        };

        inner.previews.release(entry.preview);
        let preview = inner.previews.create(&image);
        let generation = entry.replace_image(image.clone(), preview);

        info!(room_id = %id, generation, "Room retaken");

        self.emit(AutoCheckEvent::RoomRetaken {
            room_id: id,
            generation,
            timestamp: Utc::now(),
        });
        self.emit_global(&inner.entries);
        self.schedule(id, generation, image);

        true
    }

    /// Remove a room and release its preview. Returns `false` if absent.
    ///
    /// An assessment still in flight for the room is left to finish and then discarded.
    pub async fn remove(&self, id: RoomId) -> bool {
        let mut inner = self.shared.inner.lock().await;

        let Some(index) = inner.entries.iter().position(|e| e.id == id) else {
            debug!(room_id = %id, "Remove ignored, room not found");
            return false;
        };

        let entry = inner.entries.remove(index);
        inner.previews.release(entry.preview);

        info!(room_id = %id, status = ?entry.status(), "Room removed");

        self.emit(AutoCheckEvent::RoomRemoved {
            room_id: id,
            timestamp: Utc::now(),
        });
        self.emit_global(&inner.entries);

        true
    }

    /// Remove every room in a single transition. Returns how many were removed.
    pub async fn reset_all(&self) -> usize {
        let mut guard = self.shared.inner.lock().await;
        let inner = &mut *guard;

        let removed = std::mem::take(&mut inner.entries);
        for entry in &removed {
            inner.previews.release(entry.preview);
        }

        info!(removed = removed.len(), "All rooms reset");

        self.emit(AutoCheckEvent::RoomsReset {
            removed: removed.len(),
            timestamp: Utc::now(),
        });
        self.emit_global(&inner.entries);

        removed.len()
    }

    /// Apply a successful assessment
    ///
    /// Ignored (returns `false`) when the room is gone or `generation` is stale.
    pub async fn on_assessment_complete(
        &self,
        id: RoomId,
        generation: u64,
        analysis: CleaningAnalysis,
    ) -> bool {
        let mut inner = self.shared.inner.lock().await;

        let Some(entry) = current_entry(&mut inner, id, generation) else {
            return false;
        };

        let room_label = analysis.room_label.clone();
        let score = analysis.score;
        entry.complete(analysis);

        info!(room_id = %id, generation, score, room_label = %room_label, "Room assessment applied");

        self.emit(AutoCheckEvent::RoomAssessed {
            room_id: id,
            generation,
            room_label,
            score,
            timestamp: Utc::now(),
        });
        self.emit_global(&inner.entries);

        true
    }

    /// Apply a failed assessment
    ///
    /// Ignored (returns `false`) when the room is gone or `generation` is stale.
    pub async fn on_assessment_failed(&self, id: RoomId, generation: u64, message: String) -> bool {
        let mut inner = self.shared.inner.lock().await;

        let Some(entry) = current_entry(&mut inner, id, generation) else {
            return false;
        };

        entry.fail(message.clone());

        warn!(room_id = %id, generation, error = %message, "Room assessment failed");

        self.emit(AutoCheckEvent::RoomAssessmentFailed {
            room_id: id,
            generation,
            message,
            timestamp: Utc::now(),
        });
        self.emit_global(&inner.entries);

        true
    }

    /// Rooms in insertion order plus the derived global summary
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.shared.inner.lock().await;
        RegistrySnapshot {
            rooms: inner.entries.iter().map(RoomEntry::to_view).collect(),
            global: compute_global(&inner.entries),
        }
    }

    pub async fn global(&self) -> GlobalSummary {
        compute_global(&self.shared.inner.lock().await.entries)
    }

    pub async fn room(&self, id: RoomId) -> Option<RoomView> {
        let inner = self.shared.inner.lock().await;
        inner.entries.iter().find(|e| e.id == id).map(RoomEntry::to_view)
    }

    /// Preview bytes for a room's current image
    pub async fn preview(&self, id: RoomId) -> Option<Preview> {
        let inner = self.shared.inner.lock().await;
        let entry = inner.entries.iter().find(|e| e.id == id)?;
        inner.previews.get(entry.preview).cloned()
    }

    pub async fn len(&self) -> usize {
        self.shared.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn preview_stats(&self) -> PreviewStats {
        let inner = self.shared.inner.lock().await;
        PreviewStats {
            live: inner.previews.live_count(),
            created: inner.previews.created_count(),
            released: inner.previews.released_count(),
        }
    }

    /// Number of assessment tasks still running (including superseded ones)
    pub fn in_flight(&self) -> usize {
        self.shared.tasks.len()
    }

    /// Wait until every assessment task spawned so far has finished
    ///
    /// Tasks spawned while waiting are waited for too. Meant for a single
    /// caller at a time (tests, shutdown).
    pub async fn settle(&self) {
        self.shared.tasks.close();
        self.shared.tasks.wait().await;
        self.shared.tasks.reopen();
    }

    /// End the session: drop every room, then wait for in-flight work to drain
    pub async fn shutdown(&self) {
        let removed = self.reset_all().await;
        let pending = self.in_flight();
        info!(removed, pending, "Room registry shutting down");
        self.settle().await;
    }

    fn schedule(&self, id: RoomId, generation: u64, image: ImageUpload) {
        let registry = self.clone();
        self.shared.tasks.spawn(async move {
            let assessor = Arc::clone(&registry.shared.assessor);
            debug!(room_id = %id, generation, assessor = assessor.name(), "Assessment started");

            match assessor.assess(&image).await {
                Ok(analysis) => {
                    registry.on_assessment_complete(id, generation, analysis).await;
                }
                Err(e) => {
                    registry.on_assessment_failed(id, generation, e.to_string()).await;
                }
            }
        });
    }

    fn emit(&self, event: AutoCheckEvent) {
        self.shared.event_bus.emit_lossy(event);
    }

    fn emit_global(&self, entries: &[RoomEntry]) {
        let global = compute_global(entries);
        self.emit(AutoCheckEvent::GlobalSummaryUpdated {
            score: global.score,
            phase: global.phase.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// The entry for `id` if it exists, matches `generation`, and is still analyzing
fn current_entry(inner: &mut RegistryInner, id: RoomId, generation: u64) -> Option<&mut RoomEntry> {
    let Some(entry) = inner.find_mut(id) else {
        debug!(room_id = %id, generation, "Discarding assessment for removed room");
        return None;
    };

    if entry.generation != generation {
        debug!(
            room_id = %id,
            generation,
            current_generation = entry.generation,
            "Discarding stale assessment"
        );
        return None;
    }

    if entry.status() != RoomStatus::Analyzing {
        warn!(room_id = %id, generation, "Duplicate assessment result ignored");
        return None;
    }

    Some(entry)
}
