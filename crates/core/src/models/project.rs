//! Portfolio projects (`projects_portfolio` table).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{checkbox, null_default};
use crate::types::{ColorAccent, ProjectType, Slug};
use crate::validation::{ValidationErrors, optional_text, required_text};

/// A row of the `projects_portfolio` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Slug,
    pub name: String,
    /// One-line hook shown on the portfolio card.
    #[serde(default)]
    pub hook: Option<String>,
    /// The problem and what was built.
    #[serde(default)]
    pub story: Option<String>,
    /// Outcome for the client.
    #[serde(default)]
    pub benefit: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub technologies: Vec<String>,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub project_type: ProjectType,
    #[serde(default, deserialize_with = "null_default")]
    pub color: ColorAccent,
    #[serde(default, deserialize_with = "null_default")]
    pub is_flagship: bool,
    #[serde(default)]
    pub preview_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sort projects for display: flagship projects first, then newest first.
pub fn order_portfolio(projects: &mut [Project]) {
    projects.sort_by(|a, b| match b.is_flagship.cmp(&a.is_flagship) {
        Ordering::Equal => b.created_at.cmp(&a.created_at),
        other => other,
    });
}

/// Split a comma separated technology list.
///
/// Entries are trimmed, blanks dropped, and duplicates removed
/// case-insensitively keeping the first spelling.
#[must_use]
pub fn parse_technologies(raw: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let key = tag.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(tag.to_string());
        }
    }
    out
}

/// Raw project form fields as submitted by the admin panel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDraft {
    /// Slug; derived from the name when blank.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub benefit: Option<String>,
    /// Comma separated list.
    #[serde(default)]
    pub technologies: String,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_flagship: Option<String>,
}

impl From<&Project> for ProjectDraft {
    fn from(project: &Project) -> Self {
        Self {
            id: Some(project.id.to_string()),
            name: project.name.clone(),
            hook: project.hook.clone(),
            story: project.story.clone(),
            benefit: project.benefit.clone(),
            technologies: project.technologies.join(", "),
            project_type: Some(project.project_type.to_string()),
            color: Some(project.color.to_string()),
            is_flagship: project.is_flagship.then(|| "on".to_string()),
        }
    }
}

/// Validated payload for inserting or updating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInput {
    pub id: Slug,
    pub name: String,
    pub hook: Option<String>,
    pub story: Option<String>,
    pub benefit: Option<String>,
    pub technologies: Vec<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub color: ColorAccent,
    pub is_flagship: bool,
}

impl ProjectDraft {
    pub const NAME_MAX: usize = 120;
    pub const TEXT_MAX: usize = 4000;

    #[must_use]
    pub fn is_flagship(&self) -> bool {
        checkbox(self.is_flagship.as_deref())
    }

    /// Validate a draft for a new project.
    ///
    /// # Errors
    ///
    /// Returns every failing field, including an unusable slug.
    pub fn validate(&self) -> Result<ProjectInput, ValidationErrors> {
        self.validate_inner(None)
    }

    /// Validate a draft for an existing project.
    ///
    /// The slug names the project's storage folder, so it is kept as-is and
    /// whatever the form submitted for `id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate_update(&self, slug: &Slug) -> Result<ProjectInput, ValidationErrors> {
        self.validate_inner(Some(slug))
    }

    fn validate_inner(&self, existing: Option<&Slug>) -> Result<ProjectInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", &self.name, Self::NAME_MAX);

        let id = match existing {
            Some(slug) => Some(slug.clone()),
            None => {
                let explicit = self.id.as_deref().map(str::trim).filter(|s| !s.is_empty());
                let parsed = match explicit {
                    Some(raw) => Slug::parse(raw),
                    None => Slug::from_name(&name),
                };
                match parsed {
                    Ok(slug) => Some(slug),
                    Err(e) => {
                        // A blank name already reported; don't pile on.
                        if explicit.is_some() || !name.is_empty() {
                            errors.add("id", e.to_string());
                        }
                        None
                    }
                }
            }
        };

        let hook = optional_text(&mut errors, "hook", self.hook.as_deref(), 200);
        let story = optional_text(&mut errors, "story", self.story.as_deref(), Self::TEXT_MAX);
        let benefit = optional_text(&mut errors, "benefit", self.benefit.as_deref(), Self::TEXT_MAX);

        let technologies = parse_technologies(&self.technologies);
        if technologies.len() > 20 {
            errors.add("technologies", "List at most 20 technologies.");
        }

        let project_type = parse_choice(&mut errors, "project_type", self.project_type.as_deref());
        let color = parse_choice(&mut errors, "color", self.color.as_deref());

        match id {
            Some(id) if errors.is_empty() => Ok(ProjectInput {
                id,
                name,
                hook,
                story,
                benefit,
                technologies,
                project_type,
                color,
                is_flagship: self.is_flagship(),
            }),
            _ => Err(errors),
        }
    }
}

fn parse_choice<T>(errors: &mut ValidationErrors, field: &'static str, raw: Option<&str>) -> T
where
    T: Default + std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => T::default(),
        Some(value) => value.parse::<T>().unwrap_or_else(|e| {
            errors.add(field, e.to_string());
            T::default()
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn project(id: &str, flagship: bool, day: u32) -> Project {
        Project {
            id: Slug::parse(id).unwrap(),
            name: id.to_string(),
            hook: None,
            story: None,
            benefit: None,
            technologies: vec![],
            project_type: ProjectType::Production,
            color: ColorAccent::Primary,
            is_flagship: flagship,
            preview_url: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_order_portfolio() {
        let mut projects = vec![
            project("old", false, 1),
            project("flag-old", true, 2),
            project("new", false, 9),
            project("flag-new", true, 5),
        ];
        order_portfolio(&mut projects);
        let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["flag-new", "flag-old", "new", "old"]);
    }

    #[test]
    fn test_parse_technologies() {
        assert_eq!(
            parse_technologies(" Rust, axum ,, rust, Postgres,"),
            ["Rust", "axum", "Postgres"]
        );
        assert!(parse_technologies("  ").is_empty());
    }

    #[test]
    fn test_slug_derived_from_name() {
        let draft = ProjectDraft {
            name: "Acme Field Portal".to_string(),
            technologies: "Rust, HTMX".to_string(),
            project_type: Some("concept".to_string()),
            color: Some("gradient".to_string()),
            is_flagship: Some("on".to_string()),
            ..ProjectDraft::default()
        };
        let input = draft.validate().unwrap();
        assert_eq!(input.id.as_str(), "acme-field-portal");
        assert_eq!(input.project_type, ProjectType::Concept);
        assert_eq!(input.color, ColorAccent::Gradient);
        assert!(input.is_flagship);
        assert_eq!(input.technologies, ["Rust", "HTMX"]);
    }

    #[test]
    fn test_explicit_bad_slug() {
        let draft = ProjectDraft {
            id: Some("Bad Slug".to_string()),
            name: "Fine".to_string(),
            ..ProjectDraft::default()
        };
        let errors = draft.validate().unwrap_err();
        assert!(errors.has("id"));
        assert!(!errors.has("name"));
    }

    #[test]
    fn test_blank_name_reports_name_only() {
        let errors = ProjectDraft::default().validate().unwrap_err();
        assert!(errors.has("name"));
        assert!(!errors.has("id"));
    }

    #[test]
    fn test_unknown_choice() {
        let draft = ProjectDraft {
            name: "X".to_string(),
            project_type: Some("prototype".to_string()),
            ..ProjectDraft::default()
        };
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.first("project_type"), Some("invalid project type: prototype"));
    }

    #[test]
    fn test_update_keeps_slug() {
        let slug = Slug::parse("original").unwrap();
        let draft = ProjectDraft {
            id: Some("renamed".to_string()),
            name: "Renamed".to_string(),
            ..ProjectDraft::default()
        };
        let input = draft.validate_update(&slug).unwrap();
        assert_eq!(input.id, slug);
    }

    #[test]
    fn test_payload_uses_type_column() {
        let input = ProjectDraft {
            name: "Site".to_string(),
            ..ProjectDraft::default()
        }
        .validate()
        .unwrap();
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["type"], "production");
        assert_eq!(json["color"], "primary");
        assert!(json.get("project_type").is_none());
    }

    #[test]
    fn test_record_defaults_for_nulls() {
        let json = r#"{
            "id": "acme",
            "name": "Acme",
            "technologies": null,
            "type": null,
            "color": null,
            "is_flagship": null,
            "created_at": "2025-03-01T10:00:00+00:00"
        }"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert!(p.technologies.is_empty());
        assert_eq!(p.project_type, ProjectType::Production);
        assert_eq!(p.color, ColorAccent::Primary);
        assert!(!p.is_flagship);
        assert!(p.preview_url.is_none());
    }
}
