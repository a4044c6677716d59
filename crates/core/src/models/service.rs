//! Services offered by the studio (`services` table).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{checkbox, default_true, null_default, null_true};
use crate::validation::{ValidationErrors, optional_text, required_text};

/// A row of the `services` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    /// Icon reference (icon set name, e.g. `code`, `palette`).
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub cta_url: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub position: i32,
    #[serde(default = "default_true", deserialize_with = "null_true")]
    pub is_public: bool,
}

impl Service {
    /// Call-to-action pair, only when both label and url are present.
    #[must_use]
    pub fn cta(&self) -> Option<(&str, &str)> {
        match (self.cta_label.as_deref(), self.cta_url.as_deref()) {
            (Some(label), Some(url)) if !label.is_empty() && !url.is_empty() => Some((label, url)),
            _ => None,
        }
    }
}

/// Raw service form fields as submitted by the admin panel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDraft {
    #[serde(default)]
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
    pub position: Option<String>,
    #[serde(default)]
    pub is_public: Option<String>,
}

impl From<&Service> for ServiceDraft {
    fn from(service: &Service) -> Self {
        Self {
            title: service.title.clone(),
            description: service.description.clone(),
            icon: service.icon.clone(),
            cta_label: service.cta_label.clone(),
            cta_url: service.cta_url.clone(),
            position: Some(service.position.to_string()),
            is_public: service.is_public.then(|| "on".to_string()),
        }
    }
}

/// Validated payload for inserting or updating a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInput {
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
    pub position: i32,
    pub is_public: bool,
}

impl ServiceDraft {
    pub const TITLE_MAX: usize = 120;
    pub const DESCRIPTION_MAX: usize = 2000;

    /// Whether the visibility checkbox is ticked.
    #[must_use]
    pub fn is_public(&self) -> bool {
        checkbox(self.is_public.as_deref())
    }

    /// Validate the draft.
    ///
    /// # Errors
    ///
    /// Returns every failing field: missing or overlong title, overlong
    /// description, a CTA url that is neither absolute http(s), a site path
    /// nor an anchor, a CTA label without a url, or a negative position.
    pub fn validate(&self) -> Result<ServiceInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required_text(&mut errors, "title", &self.title, Self::TITLE_MAX);
        let description = self.description.trim().to_string();
        if description.chars().count() > Self::DESCRIPTION_MAX {
            errors.add(
                "description",
                format!("Must be at most {} characters.", Self::DESCRIPTION_MAX),
            );
        }

        let icon = optional_text(&mut errors, "icon", self.icon.as_deref(), 64);
        let cta_label = optional_text(&mut errors, "cta_label", self.cta_label.as_deref(), 60);
        let cta_url = optional_text(&mut errors, "cta_url", self.cta_url.as_deref(), 500);

        if let Some(url) = cta_url.as_deref()
            && !is_link_target(url)
        {
            errors.add(
                "cta_url",
                "Use a full http(s) URL, a path starting with '/', or an '#anchor'.",
            );
        }
        if cta_label.is_some() && cta_url.is_none() {
            errors.add("cta_url", "A call-to-action label needs a URL.");
        }

        let position = match self.position.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => match raw.parse::<i32>() {
                Ok(p) if p >= 0 => p,
                _ => {
                    errors.add("position", "Position must be a whole number of 0 or more.");
                    0
                }
            },
        };

        errors.into_result(ServiceInput {
            title,
            description,
            icon,
            cta_label,
            cta_url,
            position,
            is_public: self.is_public(),
        })
    }
}

fn is_link_target(url: &str) -> bool {
    if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        return !rest.is_empty() && !rest.starts_with('/');
    }
    (url.starts_with('/') && !url.starts_with("//")) || (url.starts_with('#') && url.len() > 1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft() -> ServiceDraft {
        ServiceDraft {
            title: " Web Apps ".to_string(),
            description: "Full-stack builds.".to_string(),
            icon: Some("code".to_string()),
            cta_label: Some("Start a project".to_string()),
            cta_url: Some("#contact".to_string()),
            position: Some("2".to_string()),
            is_public: Some("on".to_string()),
        }
    }

    #[test]
    fn test_valid_draft() {
        let input = draft().validate().unwrap();
        assert_eq!(input.title, "Web Apps");
        assert_eq!(input.position, 2);
        assert!(input.is_public);
        assert_eq!(input.cta_url.as_deref(), Some("#contact"));
    }

    #[test]
    fn test_unchecked_box_is_private() {
        let mut d = draft();
        d.is_public = None;
        assert!(!d.validate().unwrap().is_public);
    }

    #[test]
    fn test_blank_position_defaults_to_zero() {
        let mut d = draft();
        d.position = Some(String::new());
        assert_eq!(d.validate().unwrap().position, 0);
    }

    #[test]
    fn test_collects_all_errors() {
        let d = ServiceDraft {
            title: String::new(),
            cta_label: Some("Go".to_string()),
            position: Some("-1".to_string()),
            ..ServiceDraft::default()
        };
        let errors = d.validate().unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("cta_url"));
        assert!(errors.has("position"));
    }

    #[test]
    fn test_link_targets() {
        assert!(is_link_target("https://studio.dev"));
        assert!(is_link_target("/portfolio/acme"));
        assert!(is_link_target("#services"));
        assert!(!is_link_target("https://"));
        assert!(!is_link_target("//evil.example"));
        assert!(!is_link_target("javascript:alert(1)"));
        assert!(!is_link_target("#"));
    }

    #[test]
    fn test_record_defaults_for_nulls() {
        let json = r#"{
            "id": "6f1c1a52-6a8e-4f7f-9a59-0a6bb2a1c001",
            "title": "Branding",
            "description": null,
            "position": null,
            "is_public": null
        }"#;
        let service: Service = serde_json::from_str(json).unwrap();
        assert_eq!(service.description, "");
        assert_eq!(service.position, 0);
        assert!(service.is_public);
        assert!(service.cta().is_none());
    }

    #[test]
    fn test_draft_from_record() {
        let service = Service {
            id: Uuid::nil(),
            title: "Design".to_string(),
            description: String::new(),
            icon: None,
            cta_label: None,
            cta_url: None,
            position: 4,
            is_public: false,
        };
        let d = ServiceDraft::from(&service);
        assert_eq!(d.position.as_deref(), Some("4"));
        assert!(!d.is_public());
    }
}
