//! Domain types shared across the cache engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of purchasable content, as tagged by the backend.
///
/// The tag controls which file extension a cached object gets; it does
/// not participate in key derivation. Older backend records used a
/// generic `file` tag for PDF documents, which is accepted as an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Still image, cached as `.jpg`.
    Image,
    /// Video, cached as `.mp4`.
    Video,
    /// PDF document, cached as `.pdf`.
    #[serde(alias = "file")]
    Pdf,
    /// Unrecognized tag; cached with a neutral `.file` extension.
    #[serde(other)]
    Other,
}

impl ContentKind {
    /// File extension (with leading dot) used for cached objects of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            ContentKind::Image => ".jpg",
            ContentKind::Video => ".mp4",
            ContentKind::Pdf => ".pdf",
            ContentKind::Other => ".file",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Image => write!(f, "image"),
            ContentKind::Video => write!(f, "video"),
            ContentKind::Pdf => write!(f, "pdf"),
            ContentKind::Other => write!(f, "other"),
        }
    }
}

/// Reference to a remote object: its URL plus the content-kind tag.
///
/// Not owned by the cache; callers construct these from backend records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    /// Remote locator for the object.
    pub url: String,
    /// Content kind controlling the cached file extension.
    pub kind: ContentKind,
}

impl ContentRef {
    /// Create a new content reference.
    pub fn new(url: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// A purchased content item as returned by the backend listing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Backend identity of the purchase record.
    pub id: String,
    /// Creator who published the item.
    pub creator_id: String,
    /// Content kind.
    pub kind: ContentKind,
    /// Remote URL of the media object.
    pub url: String,
}

impl ContentItem {
    /// The cacheable reference for this item.
    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(self.url.clone(), self.kind)
    }
}

/// A chat message, as far as the reply-prefetch cache needs to know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identity.
    pub id: String,
    /// Parent message id when this message is a thread reply.
    pub parent_id: Option<String>,
    /// Author identity.
    pub author_id: String,
    /// Message body.
    pub body: String,
    /// Number of replies threaded under this message.
    pub reply_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
