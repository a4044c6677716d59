//! Operations on the `projects_portfolio` table.
//!
//! A project's media lives under its slug in the storage bucket, so
//! deleting a project also sweeps that folder.

use serde_json::json;
use studio_core::{Project, ProjectInput, Slug, order_portfolio};
use tracing::instrument;

use super::{Caller, PROJECTS_TABLE, Query, SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// List projects in portfolio order (flagship first, then newest).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn list_projects(&self, caller: Caller<'_>) -> Result<Vec<Project>, SupabaseError> {
        let mut projects: Vec<Project> = self
            .select(
                caller,
                &Query::table(PROJECTS_TABLE)
                    .order("is_flagship.desc")
                    .order("created_at.desc"),
            )
            .await?;
        // Null flags sort first in PostgREST's desc order; settle it here.
        order_portfolio(&mut projects);
        Ok(projects)
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_project(
        &self,
        caller: Caller<'_>,
        slug: &Slug,
    ) -> Result<Option<Project>, SupabaseError> {
        self.select_one(caller, &Query::table(PROJECTS_TABLE).eq("id", slug))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn count_projects(&self, caller: Caller<'_>) -> Result<u64, SupabaseError> {
        self.count(caller, &Query::table(PROJECTS_TABLE)).await
    }

    /// # Errors
    ///
    /// Returns `Conflict` if the slug is taken.
    #[instrument(skip(self, caller, input), fields(slug = %input.id))]
    pub async fn create_project(
        &self,
        caller: Caller<'_>,
        input: &ProjectInput,
    ) -> Result<Project, SupabaseError> {
        self.insert(caller, PROJECTS_TABLE, input).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no project has this slug.
    #[instrument(skip(self, caller, input))]
    pub async fn update_project(
        &self,
        caller: Caller<'_>,
        slug: &Slug,
        input: &ProjectInput,
    ) -> Result<Project, SupabaseError> {
        self.update(caller, &Query::table(PROJECTS_TABLE).eq("id", slug), input)
            .await?
            .ok_or(SupabaseError::NotFound)
    }

    /// Delete a project, then its storage folder.
    ///
    /// The row goes first: a project must never point at media that is
    /// already gone. Leftover files are only logged; `studio-cli media
    /// audit` lists orphaned folders.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no project has this slug.
    #[instrument(skip(self, caller))]
    pub async fn delete_project(&self, caller: Caller<'_>, slug: &Slug) -> Result<(), SupabaseError> {
        let deleted = self
            .delete(caller, &Query::table(PROJECTS_TABLE).eq("id", slug))
            .await?;
        if deleted == 0 {
            return Err(SupabaseError::NotFound);
        }

        match self.remove_folder(caller, slug.as_str()).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Removed project media"),
            Err(e) => tracing::warn!(error = %e, "Project deleted but its media was not removed"),
        }
        Ok(())
    }

    /// Point a project at a new preview image.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no project has this slug.
    pub async fn set_project_preview(
        &self,
        caller: Caller<'_>,
        slug: &Slug,
        url: &str,
    ) -> Result<Project, SupabaseError> {
        self.update(
            caller,
            &Query::table(PROJECTS_TABLE).eq("id", slug),
            &json!({ "preview_url": url }),
        )
        .await?
        .ok_or(SupabaseError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no project has this slug.
    pub async fn clear_project_preview(
        &self,
        caller: Caller<'_>,
        slug: &Slug,
    ) -> Result<Project, SupabaseError> {
        self.update(
            caller,
            &Query::table(PROJECTS_TABLE).eq("id", slug),
            &json!({ "preview_url": null }),
        )
        .await?
        .ok_or(SupabaseError::NotFound)
    }

    /// Clear `preview_url` on projects pointing at `url`.
    ///
    /// Returns whether any project was pointing at it.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn unlink_preview(&self, caller: Caller<'_>, url: &str) -> Result<bool, SupabaseError> {
        let cleared: Option<Project> = self
            .update(
                caller,
                &Query::table(PROJECTS_TABLE).eq("preview_url", url),
                &json!({ "preview_url": null }),
            )
            .await?;
        Ok(cleared.is_some())
    }

    /// Remove every file directly under a folder.
    async fn remove_folder(&self, caller: Caller<'_>, folder: &str) -> Result<usize, SupabaseError> {
        let paths: Vec<String> = self
            .list_objects(caller, folder)
            .await?
            .into_iter()
            .filter(|o| !o.is_folder())
            .map(|o| format!("{folder}/{}", o.name))
            .collect();
        self.remove_objects(caller, &paths).await
    }
}
