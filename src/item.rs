use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable identity of a list item.
///
/// Every row slot carries its item's key, so index resolution never depends on
/// matching rendered text against the collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    /// Backend-assigned identifier.
    Id(String),
    /// Legacy append-only history rows that only have content and a timestamp.
    Composite { content: Arc<str>, timestamp: i64 },
}

impl ItemKey {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn composite(content: &str, timestamp: i64) -> Self {
        Self::Composite {
            content: Arc::from(content),
            timestamp,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Composite { timestamp, .. } => write!(f, "legacy@{timestamp}"),
        }
    }
}

/// Content classification as stored by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Text,
    Link,
    Image,
    File,
    RichText,
}

/// One entry of a serialized file list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Malformed per-item payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDataError {
    FileList { reason: String },
}

impl fmt::Display for ItemDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileList { reason } => write!(f, "unparseable file list: {reason}"),
        }
    }
}

impl std::error::Error for ItemDataError {}

/// A clipboard history entry or quick text.
///
/// Items are shared as `Arc<ClipItem>` and replaced wholesale on update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipItem {
    pub key: ItemKey,
    pub content_type: ContentType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    /// JSON array of `{name, path, type}` objects.
    #[serde(default)]
    pub file_list: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl ClipItem {
    /// Creates a text item with the given id.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: ItemKey::id(id),
            content_type: ContentType::Text,
            text: text.into(),
            title: None,
            image_id: None,
            file_list: None,
            html: None,
            group_id: None,
            timestamp: 0,
        }
    }

    /// Creates an image item referencing an asset id.
    pub fn image(id: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Image,
            image_id: Some(image_id.into()),
            ..Self::text(id, "")
        }
    }

    /// Creates a file item from a serialized file list.
    pub fn files(id: impl Into<String>, file_list: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::File,
            file_list: Some(file_list.into()),
            ..Self::text(id, "")
        }
    }

    /// Creates a rich-text item with a plain-text fallback and an HTML body.
    pub fn rich_text(id: impl Into<String>, text: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::RichText,
            html: Some(html.into()),
            ..Self::text(id, text)
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Parses the serialized file list, if any.
    pub fn parse_files(&self) -> Result<Vec<FileEntry>, ItemDataError> {
        let Some(raw) = self.file_list.as_deref() else {
            return Ok(Vec::new());
        };
        serde_json::from_str(raw).map_err(|err| ItemDataError::FileList {
            reason: err.to_string(),
        })
    }

    /// Returns a copy moved into another group.
    #[must_use]
    pub fn regrouped(&self, group_id: Option<String>) -> Self {
        Self {
            group_id,
            ..self.clone()
        }
    }
}

/// Which list a manager drives, and how its "all" view is ordered.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ListKind {
    /// Clipboard history: newest first, no groups.
    #[default]
    History,
    /// Quick texts: the "all groups" view is ordered by this group sequence.
    QuickTexts { group_order: Vec<String> },
}

impl ListKind {
    pub const fn is_grouped(&self) -> bool {
        matches!(self, Self::QuickTexts { .. })
    }

    pub fn group_order(&self) -> &[String] {
        match self {
            Self::History => &[],
            Self::QuickTexts { group_order } => group_order,
        }
    }
}
