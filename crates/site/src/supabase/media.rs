//! Project media in the storage bucket.
//!
//! The bucket holds one folder per project (`{slug}/{filename}`). Media
//! items are never stored anywhere else; each listing walks the bucket
//! root, then every folder.

use futures::future::try_join_all;
use studio_core::{MediaItem, Project, Slug, is_placeholder};
use tracing::instrument;

use super::storage::is_object_path;
use super::{Caller, SupabaseClient, SupabaseError};

/// Longest stored file name, extension included.
const MAX_FILENAME: usize = 100;

/// Make an uploaded file name safe to use as an object key.
///
/// Keeps the last path component, maps anything outside
/// `[A-Za-z0-9._-]` to `-`, collapses runs, and strips leading dots so the
/// result is never hidden from listings.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_start_matches(['.', '-']).trim_end_matches('-');
    let mut name = if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    };

    if name.len() > MAX_FILENAME {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| ext.len() <= 10);
        let keep = MAX_FILENAME - ext.as_ref().map_or(0, |e| e.len() + 1);
        let mut stem: String = name.chars().take(keep).collect();
        if let Some(ext) = ext {
            stem.push('.');
            stem.push_str(&ext);
        }
        name = stem;
    }
    name
}

/// Uploads must be raster images.
#[must_use]
pub fn is_allowed_upload(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/gif" | "image/avif"
    )
}

impl SupabaseClient {
    /// List every media file, sorted by folder then file name.
    ///
    /// # Errors
    ///
    /// Returns error if any listing request fails.
    #[instrument(skip_all)]
    pub async fn list_media(&self, caller: Caller<'_>) -> Result<Vec<MediaItem>, SupabaseError> {
        let folders: Vec<String> = self
            .list_objects(caller, "")
            .await?
            .into_iter()
            .filter(|o| o.is_folder() && !is_placeholder(&o.name))
            .map(|o| o.name)
            .collect();

        let listings = try_join_all(folders.iter().map(|folder| async move {
            let objects = self.list_objects(caller, folder).await?;
            Ok::<_, SupabaseError>((folder, objects))
        }))
        .await?;

        let mut items: Vec<MediaItem> = listings
            .into_iter()
            .flat_map(|(folder, objects)| {
                objects
                    .into_iter()
                    .filter(|o| !o.is_folder() && !is_placeholder(&o.name))
                    .map(move |o| MediaItem {
                        folder: folder.clone(),
                        public_url: self.public_url(&format!("{folder}/{}", o.name)),
                        size: o.size(),
                        content_type: o.content_type(),
                        updated_at: o.updated_at,
                        name: o.name,
                    })
            })
            .collect();
        items.sort_by(|a, b| a.folder.cmp(&b.folder).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    /// Upload a file into a project's folder.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for a non-image content type, or any upload error.
    #[instrument(skip(self, caller, bytes))]
    pub async fn upload_media(
        &self,
        caller: Caller<'_>,
        folder: &Slug,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<MediaItem, SupabaseError> {
        if !is_allowed_upload(content_type) {
            return Err(SupabaseError::UnsupportedType(content_type.to_string()));
        }
        let name = sanitize_filename(filename);
        let path = format!("{folder}/{name}");
        let size = bytes.len() as u64;
        self.upload_object(caller, &path, bytes, content_type).await?;

        Ok(MediaItem {
            folder: folder.to_string(),
            public_url: self.public_url(&path),
            size: Some(size),
            content_type: Some(content_type.to_string()),
            updated_at: None,
            name,
        })
    }

    /// Remove one media file by its `folder/file` path.
    ///
    /// A project whose preview is this file is unlinked from it, so no page
    /// renders a removed image.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for malformed paths or files that don't exist.
    #[instrument(skip(self, caller))]
    pub async fn delete_media(&self, caller: Caller<'_>, path: &str) -> Result<(), SupabaseError> {
        if !is_object_path(path) {
            return Err(SupabaseError::NotFound);
        }
        let removed = self.remove_objects(caller, &[path.to_string()]).await?;
        if self.unlink_preview(caller, &self.public_url(path)).await? {
            tracing::info!("Cleared preview pointing at deleted file");
        }
        match removed {
            0 => Err(SupabaseError::NotFound),
            _ => Ok(()),
        }
    }

    /// Upload a preview image and point the project at it.
    ///
    /// A previous preview stored in the bucket under a different name is
    /// removed afterwards; failing that only logs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project doesn't exist, or any upload error.
    #[instrument(skip(self, caller, bytes))]
    pub async fn upload_preview(
        &self,
        caller: Caller<'_>,
        slug: &Slug,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Project, SupabaseError> {
        let project = self
            .get_project(caller, slug)
            .await?
            .ok_or(SupabaseError::NotFound)?;
        let previous = project
            .preview_url
            .as_deref()
            .and_then(|url| self.object_path_from_public_url(url));

        let item = self
            .upload_media(caller, slug, filename, bytes, content_type)
            .await?;
        let updated = self
            .set_project_preview(caller, slug, &item.public_url)
            .await?;

        if let Some(old) = previous.filter(|old| *old != item.path())
            && let Err(e) = self.remove_objects(caller, &[old]).await
        {
            tracing::warn!(error = %e, "Old preview left in storage");
        }
        Ok(updated)
    }

    /// Remove a project's preview file and clear `preview_url`.
    ///
    /// Previews hosted outside the bucket are only unlinked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project doesn't exist. If the file cannot
    /// be removed the column is left untouched.
    #[instrument(skip(self, caller))]
    pub async fn delete_preview(
        &self,
        caller: Caller<'_>,
        slug: &Slug,
    ) -> Result<Project, SupabaseError> {
        let project = self
            .get_project(caller, slug)
            .await?
            .ok_or(SupabaseError::NotFound)?;

        if let Some(path) = project
            .preview_url
            .as_deref()
            .and_then(|url| self.object_path_from_public_url(url))
        {
            self.remove_objects(caller, &[path]).await?;
        }
        self.clear_project_preview(caller, slug).await
    }
}
