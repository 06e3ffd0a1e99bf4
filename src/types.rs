//! Shared leaf types used by the document model and the CLI output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Social platform a profile link points at.
///
/// The theme renders one icon per platform, so the set is closed: a link
/// naming a platform outside this list has nowhere to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Github,
    Instagram,
    Linkedin,
    Facebook,
    Youtube,
    Dribbble,
    Medium,
    Unsplash,
    Behance,
    Patreon,
    Stackoverflow,
    Mailto,
    Url,
}

impl Platform {
    pub const ALL: [Platform; 14] = [
        Platform::Twitter,
        Platform::Github,
        Platform::Instagram,
        Platform::Linkedin,
        Platform::Facebook,
        Platform::Youtube,
        Platform::Dribbble,
        Platform::Medium,
        Platform::Unsplash,
        Platform::Behance,
        Platform::Patreon,
        Platform::Stackoverflow,
        Platform::Mailto,
        Platform::Url,
    ];

    /// Identifier as written in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Github => "github",
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Youtube => "youtube",
            Platform::Dribbble => "dribbble",
            Platform::Medium => "medium",
            Platform::Unsplash => "unsplash",
            Platform::Behance => "behance",
            Platform::Patreon => "patreon",
            Platform::Stackoverflow => "stackoverflow",
            Platform::Mailto => "mailto",
            Platform::Url => "url",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Platform::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown platform '{s}', expected one of: {}", known.join(", "))
            })
    }
}
