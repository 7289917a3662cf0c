//! Shared test helpers: a scripted assessor and event waiting utilities

#![allow(dead_code)]

use async_trait::async_trait;
use autocheck_common::events::AutoCheckEvent;
use autocheck_inspector::models::{CleaningAnalysis, ImageUpload};
use autocheck_inspector::services::{AssessmentError, RoomAssessor, RoomRegistry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

pub type Outcome = Result<CleaningAnalysis, AssessmentError>;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

pub fn analysis(label: &str, score: u8) -> CleaningAnalysis {
    CleaningAnalysis {
        room_label: label.to_string(),
        score,
        summary: format!("{} scored {}", label, score),
        issues: vec![format!("{} issue", label)],
        tips: vec![format!("{} tip", label)],
    }
}

/// Image whose default assessment scores `marker` (or fails when > 100)
pub fn image(marker: u8) -> ImageUpload {
    ImageUpload::new(vec![marker], "image/jpeg").with_file_name(format!("room-{}.jpg", marker))
}

/// Assessor whose outcomes are decided by the test
///
/// Images registered with [`ScriptedAssessor::hold`] block until the test
/// sends their outcome. Any other image resolves immediately: a first byte
/// of 0..=100 becomes that score, anything larger is a malformed response.
#[derive(Default)]
pub struct ScriptedAssessor {
    held: Mutex<HashMap<Vec<u8>, oneshot::Receiver<Outcome>>>,
    calls: AtomicUsize,
}

impl ScriptedAssessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the next assessment of `image` until the returned sender fires
    pub fn hold(&self, image: &ImageUpload) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.held.lock().unwrap().insert(image.bytes.to_vec(), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomAssessor for ScriptedAssessor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn assess(&self, image: &ImageUpload) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let held = self.held.lock().unwrap().remove(image.bytes.as_ref());
        if let Some(rx) = held {
            return rx
                .await
                .unwrap_or_else(|_| Err(AssessmentError::Transport("outcome dropped".to_string())));
        }

        match image.bytes.first().copied() {
            Some(score) if score <= 100 => Ok(analysis("Sala", score)),
            Some(score) => Err(AssessmentError::MalformedResponse(format!(
                "score {} outside 0-100",
                score
            ))),
            None => Err(AssessmentError::Transport("empty image".to_string())),
        }
    }
}

/// Wait for the first event matching `predicate`
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<AutoCheckEvent>,
    predicate: F,
) -> AutoCheckEvent
where
    F: Fn(&AutoCheckEvent) -> bool,
{
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event stream failed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Wait until exactly `count` assessment tasks remain in flight
pub async fn wait_for_in_flight(registry: &RoomRegistry, count: usize) {
    tokio::time::timeout(WAIT_LIMIT, async {
        while registry.in_flight() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for in-flight tasks");
}

/// `settle` with a deadline so a stuck task fails the test instead of hanging it
pub async fn settle(registry: &RoomRegistry) {
    tokio::time::timeout(WAIT_LIMIT, registry.settle())
        .await
        .expect("timed out settling registry");
}
