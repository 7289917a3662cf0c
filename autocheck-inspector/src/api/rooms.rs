//! Room API handlers
//!
//! GET/POST/DELETE /rooms, GET/DELETE /rooms/{id}, PUT /rooms/{id}/image,
//! GET /rooms/{id}/preview

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{GlobalSummary, ImageUpload, RegistrySnapshot, RoomView},
    AppState,
};

/// POST /rooms response
#[derive(Debug, Serialize, Deserialize)]
pub struct AddRoomsResponse {
    /// New room ids, in upload order
    pub room_ids: Vec<Uuid>,
    pub global: GlobalSummary,
}

/// PUT /rooms/{id}/image response
#[derive(Debug, Serialize, Deserialize)]
pub struct RetakeResponse {
    pub room: RoomView,
    pub global: GlobalSummary,
}

/// GET /rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<RegistrySnapshot> {
    Json(state.registry.snapshot().await)
}

/// POST /rooms
///
/// Bulk add. Every file part of the multipart body becomes one room.
/// Returns 202 Accepted; assessments continue in the background.
pub async fn add_rooms(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let images = read_images(multipart).await?;
    if images.is_empty() {
        return Err(ApiError::BadRequest("No image files in request".to_string()));
    }

    let count = images.len();
    let room_ids = state.registry.add_many(images).await;
    tracing::info!(count, "Rooms submitted for assessment");

    let response = AddRoomsResponse {
        room_ids,
        global: state.registry.global().await,
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> ApiResult<Json<RoomView>> {
    state
        .registry
        .room(room_id)
        .await
        .map(Json)
        .ok_or_else(|| room_not_found(room_id))
}

/// PUT /rooms/{id}/image
///
/// Retake: replace the room's photo and reassess it. Exactly one image part.
pub async fn retake_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut images = read_images(multipart).await?;
    if images.len() != 1 {
        return Err(ApiError::BadRequest(format!(
            "Expected exactly one image, got {}",
            images.len()
        )));
    }
    let image = images.remove(0);

    if !state.registry.retake(room_id, image).await {
        return Err(room_not_found(room_id));
    }

    // Room may have been removed between the retake and this read
    let room = state
        .registry
        .room(room_id)
        .await
        .ok_or_else(|| room_not_found(room_id))?;

    let response = RetakeResponse {
        room,
        global: state.registry.global().await,
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// DELETE /rooms/{id}
pub async fn remove_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.registry.remove(room_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(room_not_found(room_id))
    }
}

/// DELETE /rooms
pub async fn reset_rooms(State(state): State<AppState>) -> StatusCode {
    state.registry.reset_all().await;
    StatusCode::NO_CONTENT
}

/// GET /rooms/{id}/preview
pub async fn get_preview(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let preview = state
        .registry
        .preview(room_id)
        .await
        .ok_or_else(|| room_not_found(room_id))?;

    Ok((
        [
            (header::CONTENT_TYPE, preview.mime_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        preview.bytes,
    ))
}

fn room_not_found(room_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Room not found: {}", room_id))
}

/// Collect every file part as an image upload
async fn read_images(mut multipart: Multipart) -> ApiResult<Vec<ImageUpload>> {
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            tracing::debug!(field = ?field.name(), "Skipping non-file multipart field");
            continue;
        };
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest(format!("File is empty: {}", file_name)));
        }

        let mime_type = resolve_image_mime(declared.as_deref(), &bytes).ok_or_else(|| {
            ApiError::BadRequest(format!("File is not an image: {}", file_name))
        })?;

        images.push(ImageUpload::new(bytes, mime_type).with_file_name(file_name));
    }

    Ok(images)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// MIME type for an uploaded image
///
/// A declared `image/*` type is trusted; otherwise the bytes are sniffed.
/// Returns `None` for anything that is not an image.
pub fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> Option<String> {
    if let Some(declared) = declared {
        if declared.starts_with("image/") {
            return Some(declared.to_string());
        }
    }

    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type().to_string())
}

/// Build room routes
pub fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(add_rooms).delete(reset_rooms))
        .route("/rooms/:id", get(get_room).delete(remove_room))
        .route("/rooms/:id/image", put(retake_room))
        .route("/rooms/:id/preview", get(get_preview))
}
