//! Data models for the room inspector

pub mod room;
pub mod summary;

pub use room::{CleaningAnalysis, ImageUpload, RoomEntry, RoomId, RoomState, RoomStatus, RoomView};
pub use summary::{GlobalSummary, Phase, RegistrySnapshot};
