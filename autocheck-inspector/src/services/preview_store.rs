//! Preview resource store
//!
//! Each room owns exactly one live preview handle. Handles are created when
//! an image is assigned and released when the image is superseded or the
//! room is removed. Not thread-safe on its own; the room registry guards it
//! with the same lock as the entries.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::models::ImageUpload;

/// Opaque handle to a renderable preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(Uuid);

impl PreviewHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PreviewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview-{}", self.0)
    }
}

/// Preview bytes ready to serve
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Default)]
pub struct PreviewStore {
    live: HashMap<PreviewHandle, Preview>,
    created: u64,
    released: u64,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a preview for an image (create-on-assign)
    pub fn create(&mut self, image: &ImageUpload) -> PreviewHandle {
        let handle = PreviewHandle::new();
        self.live.insert(
            handle,
            Preview {
                bytes: image.bytes.clone(),
                mime_type: image.mime_type.clone(),
            },
        );
        self.created += 1;
        handle
    }

    /// Release a preview. Returns `false` if it was already released or never existed.
    pub fn release(&mut self, handle: PreviewHandle) -> bool {
        if self.live.remove(&handle).is_some() {
            self.released += 1;
            true
        } else {
            tracing::warn!(preview = %handle, "Release of unknown or already released preview");
            false
        }
    }

    /// Release every live preview, returning how many were released
    pub fn release_all(&mut self) -> usize {
        let count = self.live.len();
        self.live.clear();
        self.released += count as u64;
        count
    }

    pub fn get(&self, handle: PreviewHandle) -> Option<&Preview> {
        self.live.get(&handle)
    }

    pub fn is_live(&self, handle: PreviewHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total handles created over the store's lifetime
    pub fn created_count(&self) -> u64 {
        self.created
    }

    /// Total handles released over the store's lifetime
    pub fn released_count(&self) -> u64 {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageUpload {
        ImageUpload::new(vec![0xFFu8, 0xD8, 0xFF], "image/jpeg")
    }

    #[test]
    fn test_create_and_get() {
        let mut store = PreviewStore::new();
        let handle = store.create(&image());
        let preview = store.get(handle).unwrap();
        assert_eq!(preview.mime_type, "image/jpeg");
        assert_eq!(preview.bytes.as_ref(), &[0xFF, 0xD8, 0xFF]);
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_release_is_exactly_once() {
        let mut store = PreviewStore::new();
        let handle = store.create(&image());

        assert!(store.release(handle));
        assert!(!store.release(handle));
        assert_eq!(store.released_count(), 1);
        assert!(!store.is_live(handle));
        assert!(store.get(handle).is_none());
    }

    #[test]
    fn test_release_all_balances_counters() {
        let mut store = PreviewStore::new();
        for _ in 0..3 {
            store.create(&image());
        }
        let first = store.create(&image());
        store.release(first);

        assert_eq!(store.release_all(), 3);
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.created_count(), 4);
        assert_eq!(store.released_count(), 4);
        assert_eq!(store.release_all(), 0);
    }
}
