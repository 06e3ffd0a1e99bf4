//! Content origins enabled by the theme plugin.
//!
//! The theme reads posts and authors from local directories, from a remote
//! CMS, or both. The two populate disjoint content sets, so enabling one never
//! changes what the other provides. Only local directories are checked here;
//! remote content is never fetched.

use crate::config::{ConfigError, SiteConfig, Violations};
use crate::plugins::ThemeOptions;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Posts and authors read from directories relative to the site root.
    Local { posts: PathBuf, authors: PathBuf },
    /// Posts and authors read from the Contentful CMS.
    Contentful,
}

impl ContentSource {
    pub fn label(&self) -> &'static str {
        match self {
            ContentSource::Local { .. } => "local",
            ContentSource::Contentful => "contentful",
        }
    }
}

/// Sources the theme options turn on, local first.
pub fn enabled_sources(theme: &ThemeOptions) -> Vec<ContentSource> {
    let mut sources = Vec::new();
    if theme.sources.local {
        sources.push(ContentSource::Local {
            posts: PathBuf::from(&theme.content_posts),
            authors: PathBuf::from(&theme.content_authors),
        });
    }
    if theme.sources.contentful {
        sources.push(ContentSource::Contentful);
    }
    sources
}

/// Check every enabled source against the site at `root`.
///
/// Local content directories must exist. All missing directories are
/// reported together; nothing is returned unless every source checks out.
pub fn check_sources(config: &SiteConfig, root: &Path) -> Result<Vec<ContentSource>, ConfigError> {
    let mut violations = Violations::new();
    let (Some(position), Some(theme)) = (config.theme_position(), config.theme()) else {
        violations.schema("plugins", "no content theme plugin configured");
        return Err(ConfigError::Invalid(violations));
    };

    let sources = enabled_sources(theme);
    if sources.is_empty() {
        violations.schema(
            format!("plugins[{position}].options.sources"),
            "at least one content source must be enabled",
        );
    }

    for source in &sources {
        match source {
            ContentSource::Local { posts, authors } => {
                for (key, dir) in [("contentPosts", posts), ("contentAuthors", authors)] {
                    let path = root.join(dir);
                    if !path.is_dir() {
                        violations.schema(
                            format!("plugins[{position}].options.{key}"),
                            format!("directory '{}' does not exist", path.display()),
                        );
                    } else {
                        tracing::debug!(path = %path.display(), "local content directory found");
                    }
                }
            }
            ContentSource::Contentful => {
                tracing::info!("contentful source enabled; remote content is not checked");
            }
        }
    }

    violations.into_result(sources)
}
