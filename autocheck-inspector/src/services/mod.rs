//! Room inspection services

pub mod aggregate;
pub mod assessment_client;
pub mod preview_store;
pub mod room_registry;

pub use aggregate::compute_global;
pub use assessment_client::{AssessmentError, GeminiClient, GeminiConfig, RoomAssessor};
pub use preview_store::{Preview, PreviewHandle, PreviewStore};
pub use room_registry::{PreviewStats, RoomRegistry};
