//! Seed services and projects from a YAML content file.
//!
//! Entries are validated with the same rules as the admin forms before
//! anything is written. Services are matched to existing rows by title
//! (case-insensitive) and projects by slug, so re-running a file updates
//! rather than duplicates.
//!
//! ```yaml
//! services:
//!   - title: Product Design
//!     description: Research, flows and interface design.
//!     cta_label: Book a call
//!     cta_url: "#contact"
//!     position: 0
//! projects:
//!   - name: Harbor
//!     hook: Booking for marinas.
//!     technologies: [Rust, Svelte]
//!     type: production
//!     color: gradient
//!     is_flagship: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use studio_core::{ProjectDraft, ProjectInput, ServiceDraft, ServiceInput};
use studio_site::supabase::{Caller, SupabaseClient, SupabaseError, Visibility};
use tracing::{error, info};

use super::{CommandError, SignedIn};

/// Top level of a content file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentFile {
    #[serde(default)]
    pub services: Vec<SeedService>,
    #[serde(default)]
    pub projects: Vec<SeedProject>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedService {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub cta_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProject {
    /// Slug; derived from the name when omitted.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub benefit: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(rename = "type", default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_flagship: bool,
}

impl From<&SeedService> for ServiceDraft {
    fn from(seed: &SeedService) -> Self {
        Self {
            title: seed.title.clone(),
            description: seed.description.clone(),
            icon: seed.icon.clone(),
            cta_label: seed.cta_label.clone(),
            cta_url: seed.cta_url.clone(),
            position: Some(seed.position.to_string()),
            is_public: seed.is_public.then(|| "on".to_string()),
        }
    }
}

impl From<&SeedProject> for ProjectDraft {
    fn from(seed: &SeedProject) -> Self {
        Self {
            id: seed.id.clone(),
            name: seed.name.clone(),
            hook: seed.hook.clone(),
            story: seed.story.clone(),
            benefit: seed.benefit.clone(),
            technologies: seed.technologies.join(", "),
            project_type: seed.project_type.clone(),
            color: seed.color.clone(),
            is_flagship: seed.is_flagship.then(|| "on".to_string()),
        }
    }
}

/// Validated contents, ready to write.
#[derive(Debug)]
pub struct Content {
    pub services: Vec<ServiceInput>,
    pub projects: Vec<ProjectInput>,
}

/// Validate every entry, collecting one message per failing entry.
///
/// # Errors
///
/// Returns the messages if any entry is invalid or repeats another's
/// title or slug.
pub fn validate(file: &ContentFile) -> Result<Content, Vec<String>> {
    let mut problems = Vec::new();
    let mut services = Vec::new();
    let mut projects = Vec::new();

    let mut titles = HashSet::new();
    for (i, seed) in file.services.iter().enumerate() {
        match ServiceDraft::from(seed).validate() {
            Ok(input) => {
                if titles.insert(input.title.to_lowercase()) {
                    services.push(input);
                } else {
                    problems.push(format!("services[{i}]: duplicate title \"{}\"", input.title));
                }
            }
            Err(errors) => problems.push(format!("services[{i}] ({}): {errors}", seed.title)),
        }
    }

    let mut slugs = HashSet::new();
    for (i, seed) in file.projects.iter().enumerate() {
        match ProjectDraft::from(seed).validate() {
            Ok(input) => {
                if slugs.insert(input.id.to_string()) {
                    projects.push(input);
                } else {
                    problems.push(format!("projects[{i}]: duplicate slug \"{}\"", input.id));
                }
            }
            Err(errors) => problems.push(format!("projects[{i}] ({}): {errors}", seed.name)),
        }
    }

    if problems.is_empty() {
        Ok(Content { services, projects })
    } else {
        Err(problems)
    }
}

/// What a seeding run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub services_created: usize,
    pub services_updated: usize,
    pub projects_created: usize,
    pub projects_updated: usize,
}

/// Write validated content, updating rows that already exist.
///
/// # Errors
///
/// Stops at the first failed request.
pub async fn upsert(
    client: &SupabaseClient,
    caller: Caller<'_>,
    content: &Content,
) -> Result<SeedSummary, SupabaseError> {
    let mut summary = SeedSummary::default();

    let existing = client.list_services(caller, Visibility::All).await?;
    for input in &content.services {
        match existing
            .iter()
            .find(|s| s.title.trim().eq_ignore_ascii_case(&input.title))
        {
            Some(service) => {
                client.update_service(caller, service.id, input).await?;
                info!(title = %input.title, "Updated service");
                summary.services_updated += 1;
            }
            None => {
                client.create_service(caller, input).await?;
                info!(title = %input.title, "Created service");
                summary.services_created += 1;
            }
        }
    }

    for input in &content.projects {
        if client.get_project(caller, &input.id).await?.is_some() {
            client.update_project(caller, &input.id, input).await?;
            info!(slug = %input.id, "Updated project");
            summary.projects_updated += 1;
        } else {
            client.create_project(caller, input).await?;
            info!(slug = %input.id, "Created project");
            summary.projects_created += 1;
        }
    }

    Ok(summary)
}

/// Seed content from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, sign-in
/// fails, or a write is rejected.
pub async fn run(file: &Path, email: &str, password: &SecretString) -> Result<(), CommandError> {
    info!(path = %file.display(), "Loading content");
    let raw = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| CommandError::Read {
            path: file.display().to_string(),
            source,
        })?;
    let parsed: ContentFile = serde_yaml::from_str(&raw)?;

    // Validate before signing in so a bad file writes nothing
    let content = validate(&parsed).map_err(|problems| {
        error!("Content validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        CommandError::Invalid(problems.len())
    })?;
    info!(
        services = content.services.len(),
        projects = content.projects.len(),
        "Content validated"
    );

    let signed_in = SignedIn::from_env(email, password).await?;
    let result = upsert(
        &signed_in.client,
        Caller::Admin(signed_in.token()),
        &content,
    )
    .await;
    signed_in.sign_out().await;
    let summary = result?;

    info!("Seeding complete!");
    info!(
        "  Services: {} created, {} updated",
        summary.services_created, summary.services_updated
    );
    info!(
        "  Projects: {} created, {} updated",
        summary.projects_created, summary.projects_updated
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;
    use studio_site::config::SupabaseConfig;

    use super::*;

    const CONTENT: &str = r##"
services:
  - title: Product Design
    description: Research, flows and interface design.
    cta_label: Book a call
    cta_url: "#contact"
  - title: Engineering
    position: 1
    is_public: false
projects:
  - name: Harbor App
    hook: Booking for marinas.
    technologies: [Rust, Svelte]
    type: production
    color: gradient
    is_flagship: true
"##;

    fn parse(yaml: &str) -> ContentFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_validate_accepts_content() {
        let content = validate(&parse(CONTENT)).unwrap();
        assert_eq!(content.services.len(), 2);
        assert!(!content.services[1].is_public);
        assert_eq!(content.services[1].position, 1);
        assert_eq!(content.projects[0].id.as_str(), "harbor-app");
        assert_eq!(content.projects[0].technologies, vec!["Rust", "Svelte"]);
        assert!(content.projects[0].is_flagship);
    }

    #[test]
    fn test_validate_reports_each_bad_entry() {
        let file = parse(
            r"
services:
  - title: ''
  - title: Design
    cta_label: Go
projects:
  - name: Harbor
    color: neon
",
        );
        let problems = validate(&file).unwrap_err();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("services[0]"));
        assert!(problems[1].contains("cta_url"));
        assert!(problems[2].starts_with("projects[0] (Harbor)"));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let file = parse(
            r"
services:
  - title: Design
  - title: design
projects:
  - name: Harbor
  - name: Other
    id: harbor
",
        );
        let problems = validate(&file).unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("duplicate title"));
        assert!(problems[1].contains("duplicate slug \"harbor\""));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<ContentFile>("pages: []").is_err());
        assert!(serde_yaml::from_str::<ContentFile>("services:\n  - title: A\n    colour: red").is_err());
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_and_creates_new() {
        let server = MockServer::start_async().await;
        let config = SupabaseConfig {
            url: server.base_url(),
            anon_key: SecretString::from("header.payload.anon"),
            media_bucket: "project-previews".to_string(),
        };
        let client = SupabaseClient::new(&config).unwrap();

        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/services");
                then.status(200).json_body(json!([{
                    "id": "00000000-0000-0000-0000-000000000001",
                    "title": "product design",
                    "position": 0
                }]));
            })
            .await;
        let update_service = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/services")
                    .query_param("id", "eq.00000000-0000-0000-0000-000000000001");
                then.status(200).json_body(json!([{
                    "id": "00000000-0000-0000-0000-000000000001",
                    "title": "Product Design"
                }]));
            })
            .await;
        let create_service = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/services");
                then.status(201).json_body(json!([{
                    "id": "00000000-0000-0000-0000-000000000002",
                    "title": "Engineering"
                }]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/projects_portfolio")
                    .query_param("id", "eq.harbor-app");
                then.status(200).json_body(json!([]));
            })
            .await;
        let create_project = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/projects_portfolio");
                then.status(201).json_body(json!([{
                    "id": "harbor-app",
                    "name": "Harbor App",
                    "created_at": "2025-03-01T00:00:00Z"
                }]));
            })
            .await;

        let content = validate(&parse(CONTENT)).unwrap();
        let summary = upsert(&client, Caller::Admin("header.payload.admin"), &content)
            .await
            .unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                services_created: 1,
                services_updated: 1,
                projects_created: 1,
                projects_updated: 0,
            }
        );
        update_service.assert_async().await;
        create_service.assert_async().await;
        create_project.assert_async().await;
    }
}
