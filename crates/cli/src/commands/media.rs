//! Media bucket audit.
//!
//! Deleting a project removes its row before its storage folder, so an
//! interrupted delete can leave files behind. `audit` lists those folders.

use secrecy::SecretString;
use studio_core::{MediaFolder, Project, group_by_folder};
use studio_site::supabase::{Caller, SupabaseClient, SupabaseError};
use tracing::{info, warn};

use super::{CommandError, SignedIn};

/// Folders whose name matches no project slug.
#[must_use]
pub fn orphan_folders<'a>(folders: &'a [MediaFolder], projects: &[Project]) -> Vec<&'a MediaFolder> {
    folders
        .iter()
        .filter(|folder| !projects.iter().any(|p| p.id.as_str() == folder.name))
        .collect()
}

/// Fetch the bucket and project list and return the orphaned folders.
///
/// # Errors
///
/// Returns error if either listing fails.
pub async fn find_orphans(
    client: &SupabaseClient,
    caller: Caller<'_>,
) -> Result<Vec<MediaFolder>, SupabaseError> {
    let (media, projects) = tokio::try_join!(client.list_media(caller), client.list_projects(caller))?;
    let folders = group_by_folder(media);
    Ok(orphan_folders(&folders, &projects).into_iter().cloned().collect())
}

/// Log every orphaned folder with its file count.
///
/// # Errors
///
/// Returns an error if sign-in or a listing fails.
pub async fn audit(email: &str, password: &SecretString) -> Result<(), CommandError> {
    let signed_in = SignedIn::from_env(email, password).await?;
    let result = find_orphans(&signed_in.client, Caller::Admin(signed_in.token())).await;
    signed_in.sign_out().await;
    let orphans = result?;

    if orphans.is_empty() {
        info!("Every media folder belongs to a project");
        return Ok(());
    }

    warn!(count = orphans.len(), "Media folders with no matching project:");
    for folder in &orphans {
        let bytes: u64 = folder.items.iter().filter_map(|item| item.size).sum();
        warn!("  - {}/ ({} files, {} bytes)", folder.name, folder.items.len(), bytes);
    }
    Ok(())
}
