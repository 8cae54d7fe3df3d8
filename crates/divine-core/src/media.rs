//! Media vault: in-memory store for generated assets, addressed by handle.
//!
//! A [`MediaHandle`] is the local reference the UI links to (`/media/{id}`);
//! the bytes stay in process memory and vanish on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub id: Uuid,
    pub uri: String,
    pub mime_type: String,
    pub size: usize,
}

/// A user-supplied file, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len(),
            bytes,
        }
    }

    /// Name, mime type and size without the payload.
    pub fn metadata(&self) -> Self {
        Self {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
            bytes: Vec::new(),
        }
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Inline image returned by the AI service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data_base64: String,
}

impl ImagePayload {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

struct StoredMedia {
    mime_type: String,
    bytes: Vec<u8>,
}

/// Assets kept before the oldest is evicted.
pub const DEFAULT_VAULT_CAPACITY: usize = 16;

#[derive(Default)]
struct VaultItems {
    by_id: HashMap<Uuid, StoredMedia>,
    order: VecDeque<Uuid>,
}

/// Bounded store: once `capacity` assets are held, storing evicts the oldest.
pub struct MediaVault {
    capacity: usize,
    items: RwLock<VaultItems>,
}

impl Default for MediaVault {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_VAULT_CAPACITY)
    }
}

impl MediaVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: RwLock::new(VaultItems::default()),
        }
    }

    pub fn store(&self, bytes: Vec<u8>, mime_type: impl Into<String>) -> MediaHandle {
        let id = Uuid::new_v4();
        let mime_type = mime_type.into();
        let size = bytes.len();
        if let Ok(mut items) = self.items.write() {
            while items.order.len() >= self.capacity {
                let Some(oldest) = items.order.pop_front() else {
                    break;
                };
                items.by_id.remove(&oldest);
                tracing::debug!(target: "divine::media", id = %oldest, "evicted media asset");
            }
            items.by_id.insert(
                id,
                StoredMedia {
                    mime_type: mime_type.clone(),
                    bytes,
                },
            );
            items.order.push_back(id);
        }
        tracing::debug!(target: "divine::media", %id, size, "stored media asset");
        MediaHandle {
            id,
            uri: format!("/media/{id}"),
            mime_type,
            size,
        }
    }

    /// (mime type, bytes) for a handle id.
    pub fn get(&self, id: &Uuid) -> Option<(String, Vec<u8>)> {
        self.items
            .read()
            .ok()
            .and_then(|items| items.by_id.get(id).map(|m| (m.mime_type.clone(), m.bytes.clone())))
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_media_is_addressable() {
        let vault = MediaVault::new();
        let handle = vault.store(vec![1, 2, 3], "video/mp4");
        assert_eq!(handle.uri, format!("/media/{}", handle.id));
        assert_eq!(handle.size, 3);
        let (mime, bytes) = vault.get(&handle.id).unwrap();
        assert_eq!(mime, "video/mp4");
        assert_eq!(bytes, vec![1, 2, 3]);
        assert!(vault.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn full_vault_evicts_the_oldest_asset() {
        let vault = MediaVault::with_capacity(2);
        let first = vault.store(vec![1], "video/mp4");
        let second = vault.store(vec![2], "video/mp4");
        let third = vault.store(vec![3], "video/mp4");

        assert_eq!(vault.len(), 2);
        assert!(vault.get(&first.id).is_none());
        assert!(vault.get(&second.id).is_some());
        assert!(vault.get(&third.id).is_some());
    }

    #[test]
    fn metadata_drops_the_payload() {
        let file = MediaFile::new("rite.mp4", "video/mp4", vec![0; 1024]);
        let meta = file.metadata();
        assert_eq!(meta.name, "rite.mp4");
        assert_eq!(meta.size, 1024);
        assert!(meta.bytes.is_empty());
    }

    #[test]
    fn file_encodes_as_base64() {
        let file = MediaFile::new("a.png", "image/png", b"hi".to_vec());
        assert_eq!(file.to_base64(), "aGk=");
    }

    #[test]
    fn image_payload_data_uri() {
        let img = ImagePayload {
            mime_type: "image/png".into(),
            data_base64: "AAAA".into(),
        };
        assert_eq!(img.data_uri(), "data:image/png;base64,AAAA");
    }
}
