//! Media items derived from the storage bucket.
//!
//! Nothing here is persisted. The bucket is laid out one folder per project
//! (`{slug}/{filename}`), and the admin media page is rebuilt from a listing
//! on every visit.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name the storage console drops into otherwise empty folders.
pub const FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// A single stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    /// Project folder (the project's slug).
    pub folder: String,
    pub name: String,
    pub public_url: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MediaItem {
    /// Object path inside the bucket.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.folder, self.name)
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }

    /// Human-readable size, e.g. `240 KB`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_label(&self) -> String {
        match self.size {
            None => String::new(),
            Some(bytes) if bytes < 1024 => format!("{bytes} B"),
            Some(bytes) if bytes < 1024 * 1024 => format!("{} KB", bytes / 1024),
            Some(bytes) => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
        }
    }
}

/// Files of one project folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFolder {
    pub name: String,
    pub items: Vec<MediaItem>,
}

/// Whether a listing entry is a placeholder rather than real media.
#[must_use]
pub fn is_placeholder(name: &str) -> bool {
    name == FOLDER_PLACEHOLDER || name.starts_with('.') || name.is_empty()
}

/// Group items by folder, folders and files sorted by name.
#[must_use]
pub fn group_by_folder(mut items: Vec<MediaItem>) -> Vec<MediaFolder> {
    items.sort_by(|a, b| a.folder.cmp(&b.folder).then_with(|| a.name.cmp(&b.name)));

    let mut folders: Vec<MediaFolder> = Vec::new();
    for item in items {
        match folders.last_mut() {
            Some(folder) if folder.name == item.folder => folder.items.push(item),
            _ => folders.push(MediaFolder {
                name: item.folder.clone(),
                items: vec![item],
            }),
        }
    }
    folders
}
