//! Room entry model
//!
//! A room entry is one submitted photograph plus its assessment lifecycle:
//! ANALYZING → COMPLETE | ERROR, and back to ANALYZING on retake.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::preview_store::PreviewHandle;

/// Room identifier, stable across retakes
pub type RoomId = Uuid;

/// Raw image as uploaded by the user
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    /// Always an `image/*` type once accepted by the HTTP layer
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Structured assessment of one room photograph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningAnalysis {
    /// Room type identified by the backend (e.g. "Cocina", "Baño")
    pub room_label: String,
    /// Cleanliness score, always within 0..=100
    pub score: u8,
    pub summary: String,
    pub issues: Vec<String>,
    pub tips: Vec<String>,
}

/// Room status as exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Analyzing,
    Complete,
    Error,
}

/// Lifecycle state; the result exists exactly when the assessment completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomState {
    Analyzing,
    Complete(CleaningAnalysis),
    Error(String),
}

/// One room in the registry
#[derive(Debug, Clone)]
pub struct RoomEntry {
    pub id: RoomId,
    pub image: ImageUpload,
    pub preview: PreviewHandle,
    pub state: RoomState,
    /// Incremented on every retake; completions carrying an older value are stale
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomEntry {
    /// New entry, already analyzing at generation 1
    pub fn new(id: RoomId, image: ImageUpload, preview: PreviewHandle) -> Self {
        let now = Utc::now();
        Self {
            id,
            image,
            preview,
            state: RoomState::Analyzing,
            generation: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> RoomStatus {
        match self.state {
            RoomState::Analyzing => RoomStatus::Analyzing,
            RoomState::Complete(_) => RoomStatus::Complete,
            RoomState::Error(_) => RoomStatus::Error,
        }
    }

    pub fn result(&self) -> Option<&CleaningAnalysis> {
        match &self.state {
            RoomState::Complete(analysis) => Some(analysis),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            RoomState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Supersede the image and restart the lifecycle. Returns the new generation.
    pub fn replace_image(&mut self, image: ImageUpload, preview: PreviewHandle) -> u64 {
        self.image = image;
        self.preview = preview;
        self.state = RoomState::Analyzing;
        self.generation += 1;
        self.updated_at = Utc::now();
        self.generation
    }

    pub fn complete(&mut self, analysis: CleaningAnalysis) {
        self.state = RoomState::Complete(analysis);
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, message: String) {
        self.state = RoomState::Error(message);
        self.updated_at = Utc::now();
    }

    pub fn to_view(&self) -> RoomView {
        RoomView {
            id: self.id,
            status: self.status(),
            generation: self.generation,
            result: self.result().cloned(),
            error_message: self.error_message().map(str::to_string),
            file_name: self.image.file_name.clone(),
            mime_type: self.image.mime_type.clone(),
            preview_url: format!("/rooms/{}/preview", self.id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Serializable read-only view of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomView {
    pub id: RoomId,
    pub status: RoomStatus,
    pub generation: u64,
    pub result: Option<CleaningAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
    pub mime_type: String,
    pub preview_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
