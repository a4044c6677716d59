//! Object storage over `/storage/v1/object`.
//!
//! The media bucket is public: objects are read straight from their public
//! URL, while listing, uploading and removing go through the API with the
//! admin's token.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{Caller, SupabaseClient, SupabaseError, check, json};

/// Page size for bucket listings; folders hold a handful of images each.
const LIST_LIMIT: u32 = 1000;

/// One entry of a bucket listing.
///
/// Folders come back as entries without an `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageObject {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

impl StorageObject {
    #[must_use]
    pub const fn is_folder(&self) -> bool {
        self.id.is_none()
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.size)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.metadata.as_ref().and_then(|m| m.mimetype.clone())
    }
}

/// Percent-encode each segment of an object path, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SupabaseClient {
    fn object_url(&self, suffix: &str) -> String {
        self.url(&format!("/storage/v1/object/{suffix}"))
    }

    /// Public URL of an object in the media bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        self.object_url(&format!("public/{}/{}", self.bucket(), encode_path(path)))
    }

    /// Recover the object path from one of our public URLs.
    ///
    /// Returns `None` for URLs outside the media bucket, e.g. previews
    /// hotlinked from elsewhere.
    #[must_use]
    pub fn object_path_from_public_url(&self, url: &str) -> Option<String> {
        let prefix = self.object_url(&format!("public/{}/", self.bucket()));
        let encoded = url.strip_prefix(&prefix)?;
        let encoded = encoded.split(['?', '#']).next().unwrap_or_default();
        let path = urlencoding::decode(encoded).ok()?.into_owned();
        is_object_path(&path).then_some(path)
    }

    /// List the entries directly under `prefix` (`""` for the bucket root).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller), fields(bucket = %self.bucket()))]
    pub async fn list_objects(
        &self,
        caller: Caller<'_>,
        prefix: &str,
    ) -> Result<Vec<StorageObject>, SupabaseError> {
        let body = json!({
            "prefix": prefix,
            "limit": LIST_LIMIT,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });
        let response = self
            .request(
                Method::POST,
                &self.object_url(&format!("list/{}", self.bucket())),
                caller,
            )
            .json(&body)
            .send()
            .await?;
        json(check(response).await?).await
    }

    /// Upload an object, replacing any existing one at the same path.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller, bytes), fields(bucket = %self.bucket(), size = bytes.len()))]
    pub async fn upload_object(
        &self,
        caller: Caller<'_>,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), SupabaseError> {
        let url = self.object_url(&format!("{}/{}", self.bucket(), encode_path(path)));
        let response = self
            .request(Method::POST, &url, caller)
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .header("cache-control", "max-age=3600")
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Remove objects by path, returning how many existed.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller), fields(bucket = %self.bucket()))]
    pub async fn remove_objects(
        &self,
        caller: Caller<'_>,
        paths: &[String],
    ) -> Result<usize, SupabaseError> {
        if paths.is_empty() {
            return Ok(0);
        }
        let response = self
            .request(Method::DELETE, &self.object_url(self.bucket()), caller)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        let removed: Vec<serde_json::Value> = json(check(response).await?).await?;
        Ok(removed.len())
    }
}

/// A `folder/file` path with no traversal or empty segments.
#[must_use]
pub fn is_object_path(path: &str) -> bool {
    let mut segments = path.split('/');
    let (Some(folder), Some(file), None) = (segments.next(), segments.next(), segments.next())
    else {
        return false;
    };
    [folder, file]
        .iter()
        .all(|s| !s.is_empty() && *s != "." && *s != ".." && !s.contains('\\'))
}
