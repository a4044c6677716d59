//! Status and classification enums stored as text in the hosted tables.

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted enum value is unknown.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The value stored in the hosted table.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Lifecycle of a contact message in the admin inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Replied,
    Archived,
}

text_enum!(ContactStatus, "contact status", {
    New => "new",
    Read => "read",
    Replied => "replied",
    Archived => "archived",
});

impl ContactStatus {
    /// Messages that still need attention.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::New | Self::Read)
    }
}

/// Whether a portfolio project shipped or is an exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[default]
    Production,
    Concept,
}

text_enum!(ProjectType, "project type", {
    Production => "production",
    Concept => "concept",
});

/// Color treatment used by the portfolio card of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorAccent {
    #[default]
    Primary,
    Secondary,
    Gradient,
    Light,
}

text_enum!(ColorAccent, "color accent", {
    Primary => "primary",
    Secondary => "secondary",
    Gradient => "gradient",
    Light => "light",
});

impl ColorAccent {
    /// CSS class applied to the portfolio card.
    #[must_use]
    pub fn css_class(self) -> String {
        format!("accent-{}", self.as_str())
    }
}
