//! Site configuration module.
//!
//! Handles loading, validating, and merging site configuration documents. A
//! document describes site identity, hero content, social links, and the
//! ordered list of plugins the build pipeline instantiates.
//!
//! ## Layers
//!
//! Every file on disk is a [`PartialConfig`]: all fields optional, unknown keys
//! rejected. Environment-specific files are layered on top of a base document
//! with [`merge`], and the final result is checked once by [`validate`] into a
//! [`SiteConfig`]:
//!
//! ```text
//! site.toml               ← base document
//! site.production.toml    ← overlay (only the keys it changes)
//! ```
//!
//! ## Document Shape
//!
//! ```toml
//! plugins = [
//!   "gatsby-plugin-sitemap",
//!   { resolve = "@narative/gatsby-theme-novela", options = { basePath = "/" } },
//! ]
//!
//! [siteMetadata]
//! title = "Jane Doe – Writing"
//! name = "Jane Doe"
//! siteUrl = "https://example.com"
//! description = "Notes on data and programming"
//!
//! [siteMetadata.hero]
//! heading = "Perspectives on data."
//! subheading = "Optional"   # may be omitted
//! maxWidth = 652            # pixels, positive
//!
//! [[siteMetadata.social]]
//! name = "github"
//! url = "https://github.com/janedoe"
//! ```
//!
//! JSON documents with the same field names are accepted too (`.json`
//! extension).
//!
//! ## Merge Rules
//!
//! - Scalars in the overlay replace the base.
//! - `hero` is merged field by field.
//! - `social` and `plugins` are replaced wholesale. Plugin order is
//!   load-bearing, so lists are never spliced element by element.
//!
//! ## Validation
//!
//! Validation never stops at the first problem. Every violation is collected
//! with its field path, and [`ConfigError::Invalid`] carries the full list.

use crate::plugins::{self, Plugin, PluginDescriptor, PluginRegistry, ThemeOptions};
use crate::types::Platform;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation failed:\n{0}")]
    Invalid(Violations),
}

impl ConfigError {
    /// Schema violations carried by this error. Empty for IO and parse errors.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Invalid(v) => v.as_slice(),
            _ => &[],
        }
    }
}

/// What went wrong with a single field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// Missing or malformed field.
    #[error("{reason}")]
    Schema { reason: String },
    /// The same platform appears twice in `social`.
    #[error("duplicate social platform '{platform}'")]
    DuplicatePlatform { platform: Platform },
    /// The build pipeline has no plugin with this identifier.
    #[error("plugin '{resolve}' cannot be resolved by the build pipeline")]
    UnknownPlugin { resolve: String },
}

/// A violated field, e.g. `siteMetadata.hero.maxWidth`.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Accumulator for violations found during a validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, kind: ViolationKind) {
        self.0.push(Violation {
            field: field.into(),
            kind,
        });
    }

    pub fn schema(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.push(
            field,
            ViolationKind::Schema {
                reason: reason.into(),
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Field paths in the order they were reported.
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.field.as_str()).collect()
    }

    /// `Ok(value)` if nothing was reported, `Err(Invalid)` otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, ConfigError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ConfigError::Invalid(self))
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Validated document
// =============================================================================

/// A validated site configuration document.
///
/// Constructed once by [`load_config`] or [`validate`] and passed by reference
/// into whatever consumes it. Serializes back into the on-disk shape.
///
/// Deserializing checks every invariant except plugin resolution: the
/// pipeline's registry is not known at that point, so any identifier is
/// accepted. Use [`validate_with`] on a [`PartialConfig`] to check against one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PartialConfig", try_from = "PartialConfig")]
pub struct SiteConfig {
    pub site_metadata: SiteMetadata,
    /// Plugins in declaration order.
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteMetadata {
    pub title: String,
    pub name: String,
    /// Absolute `http`/`https` URL with a host.
    pub site_url: String,
    pub description: String,
    pub hero: HeroConfig,
    /// Profile links, at most one per platform.
    pub social: Vec<SocialLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeroConfig {
    pub heading: String,
    pub subheading: Option<String>,
    /// Maximum hero width in pixels. Always positive.
    pub max_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialLink {
    pub name: Platform,
    pub url: String,
}

impl SiteConfig {
    /// Re-check every invariant. Plugins are resolved against the built-in
    /// registry plus every untyped plugin this document already carries,
    /// since those were admitted when it was loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let registry = self
            .plugins
            .iter()
            .filter_map(|p| match p {
                Plugin::Other { resolve, .. } => Some(resolve.clone()),
                _ => None,
            })
            .fold(PluginRegistry::builtin(), |registry, id| registry.allow(id));
        self.validate_with(&registry)
    }

    pub fn validate_with(&self, registry: &PluginRegistry) -> Result<(), ConfigError> {
        validate_with(&PartialConfig::from(self.clone()), registry).map(|_| ())
    }

    /// Options of the content theme plugin.
    pub fn theme(&self) -> Option<&ThemeOptions> {
        self.plugins.iter().find_map(|p| match p {
            Plugin::Theme(options) => Some(options),
            _ => None,
        })
    }

    /// Index of the content theme plugin in `plugins`.
    pub fn theme_position(&self) -> Option<usize> {
        self.plugins.iter().position(|p| matches!(p, Plugin::Theme(_)))
    }

    /// Plugin identifiers in declaration order.
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.resolve()).collect()
    }
}

impl TryFrom<PartialConfig> for SiteConfig {
    type Error = ConfigError;

    fn try_from(partial: PartialConfig) -> Result<Self, Self::Error> {
        validate_with(&partial, &PluginRegistry::open())
    }
}

// =============================================================================
// Partial document (one layer on disk)
// =============================================================================

/// One configuration layer as read from disk. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_metadata: Option<PartialSiteMetadata>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "plugins::deserialize_descriptors"
    )]
    pub plugins: Option<Vec<PluginDescriptor>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct PartialSiteMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero: Option<PartialHero>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social: Option<Vec<PartialSocialLink>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct PartialHero {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subheading: Option<String>,
    /// Signed so that negative widths reach validation instead of failing
    /// the parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialSocialLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<SiteConfig> for PartialConfig {
    fn from(config: SiteConfig) -> Self {
        let meta = config.site_metadata;
        PartialConfig {
            site_metadata: Some(PartialSiteMetadata {
                title: Some(meta.title),
                name: Some(meta.name),
                site_url: Some(meta.site_url),
                description: Some(meta.description),
                hero: Some(PartialHero {
                    heading: Some(meta.hero.heading),
                    subheading: meta.hero.subheading,
                    max_width: Some(i64::from(meta.hero.max_width)),
                }),
                social: Some(
                    meta.social
                        .into_iter()
                        .map(|link| PartialSocialLink {
                            name: Some(link.name.as_str().to_string()),
                            url: Some(link.url),
                        })
                        .collect(),
                ),
            }),
            plugins: Some(config.plugins.into_iter().map(PluginDescriptor::from).collect()),
        }
    }
}

// =============================================================================
// Merging
// =============================================================================

/// Layer `overlay` on top of `base`.
///
/// - Scalar fields present in `overlay` replace those in `base`.
/// - `hero` is merged field by field.
/// - `social` and `plugins` are replaced wholesale when present in `overlay`.
/// - Fields absent from `overlay` are preserved.
pub fn merge(base: PartialConfig, overlay: PartialConfig) -> PartialConfig {
    PartialConfig {
        site_metadata: merge_nested(
            base.site_metadata,
            overlay.site_metadata,
            PartialSiteMetadata::merge,
        ),
        plugins: overlay.plugins.or(base.plugins),
    }
}

fn merge_nested<T>(base: Option<T>, overlay: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(merge(base, overlay)),
        (base, overlay) => overlay.or(base),
    }
}

impl PartialSiteMetadata {
    fn merge(base: Self, overlay: Self) -> Self {
        Self {
            title: overlay.title.or(base.title),
            name: overlay.name.or(base.name),
            site_url: overlay.site_url.or(base.site_url),
            description: overlay.description.or(base.description),
            hero: merge_nested(base.hero, overlay.hero, PartialHero::merge),
            social: overlay.social.or(base.social),
        }
    }
}

impl PartialHero {
    fn merge(base: Self, overlay: Self) -> Self {
        Self {
            heading: overlay.heading.or(base.heading),
            subheading: overlay.subheading.or(base.subheading),
            max_width: overlay.max_width.or(base.max_width),
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a (possibly merged) document against the built-in plugin registry.
pub fn validate(partial: &PartialConfig) -> Result<SiteConfig, ConfigError> {
    validate_with(partial, &PluginRegistry::builtin())
}

/// Validate a document, resolving plugins through `registry`.
///
/// Reports every violation, not just the first.
pub fn validate_with(
    partial: &PartialConfig,
    registry: &PluginRegistry,
) -> Result<SiteConfig, ConfigError> {
    let mut violations = Violations::new();

    let site_metadata = match &partial.site_metadata {
        Some(meta) => meta.validate(&mut violations),
        None => {
            violations.schema("siteMetadata", "missing required section");
            None
        }
    };

    let plugins = match &partial.plugins {
        Some(descriptors) => plugins::resolve_all(descriptors, registry, &mut violations),
        None => {
            violations.schema("plugins", "missing required list (use [] for none)");
            Vec::new()
        }
    };

    match site_metadata {
        Some(site_metadata) if violations.is_empty() => {
            tracing::debug!(plugins = plugins.len(), "config validated");
            Ok(SiteConfig {
                site_metadata,
                plugins,
            })
        }
        _ => {
            tracing::debug!(violations = violations.len(), "config rejected");
            Err(ConfigError::Invalid(violations))
        }
    }
}

/// Record a violation unless `value` is present and non-blank.
pub(crate) fn required_text(
    violations: &mut Violations,
    field: &str,
    value: Option<&str>,
) -> Option<String> {
    match value {
        None => {
            violations.schema(field, "missing required field");
            None
        }
        Some(s) if s.trim().is_empty() => {
            violations.schema(field, "must not be blank");
            None
        }
        Some(s) => Some(s.to_string()),
    }
}

/// Site and profile URLs must be absolute `http`/`https` with a host.
fn check_http_url(violations: &mut Violations, field: &str, raw: String) -> Option<String> {
    match Url::parse(&raw) {
        Ok(parsed) => {
            let mut ok = true;
            if !matches!(parsed.scheme(), "http" | "https") {
                violations.schema(
                    field,
                    format!("scheme '{}' not supported, must be http or https", parsed.scheme()),
                );
                ok = false;
            }
            if parsed.host_str().is_none_or(str::is_empty) {
                violations.schema(field, "URL must have a host");
                ok = false;
            }
            ok.then_some(raw)
        }
        Err(e) => {
            violations.schema(field, format!("invalid absolute URL '{raw}': {e}"));
            None
        }
    }
}

/// Profile links are rendered as hrefs: `mailto` links need the `mailto`
/// scheme, every other platform an `http`/`https` URL with a host.
fn check_social_url(
    violations: &mut Violations,
    field: &str,
    platform: Option<Platform>,
    raw: String,
) -> Option<String> {
    if platform != Some(Platform::Mailto) {
        return check_http_url(violations, field, raw);
    }
    match Url::parse(&raw) {
        Ok(parsed) if parsed.scheme() == "mailto" => Some(raw),
        Ok(parsed) => {
            violations.schema(
                field,
                format!("scheme '{}' not supported, must be mailto", parsed.scheme()),
            );
            None
        }
        Err(e) => {
            violations.schema(field, format!("invalid absolute URL '{raw}': {e}"));
            None
        }
    }
}

impl PartialSiteMetadata {
    fn validate(&self, v: &mut Violations) -> Option<SiteMetadata> {
        let title = required_text(v, "siteMetadata.title", self.title.as_deref());
        let name = required_text(v, "siteMetadata.name", self.name.as_deref());
        let site_url = required_text(v, "siteMetadata.siteUrl", self.site_url.as_deref())
            .and_then(|url| check_http_url(v, "siteMetadata.siteUrl", url));
        let description =
            required_text(v, "siteMetadata.description", self.description.as_deref());
        let hero = match &self.hero {
            Some(hero) => hero.validate(v),
            None => {
                v.schema("siteMetadata.hero", "missing required section");
                None
            }
        };
        let social = validate_social(v, self.social.as_deref().unwrap_or_default());

        Some(SiteMetadata {
            title: title?,
            name: name?,
            site_url: site_url?,
            description: description?,
            hero: hero?,
            social: social?,
        })
    }
}

impl PartialHero {
    fn validate(&self, v: &mut Violations) -> Option<HeroConfig> {
        const FIELD: &str = "siteMetadata.hero.maxWidth";
        let heading = required_text(v, "siteMetadata.hero.heading", self.heading.as_deref());
        let max_width = match self.max_width {
            None => {
                v.schema(FIELD, "missing required field");
                None
            }
            Some(n) if n <= 0 => {
                v.schema(FIELD, format!("must be a positive integer, got {n}"));
                None
            }
            Some(n) => match u32::try_from(n) {
                Ok(n) => Some(n),
                Err(_) => {
                    v.schema(FIELD, format!("{n} is too large"));
                    None
                }
            },
        };

        let subheading = match &self.subheading {
            Some(sub) => Some(required_text(
                v,
                "siteMetadata.hero.subheading",
                Some(sub.as_str()),
            )?),
            None => None,
        };

        Some(HeroConfig {
            heading: heading?,
            subheading,
            max_width: max_width?,
        })
    }
}

fn validate_social(v: &mut Violations, links: &[PartialSocialLink]) -> Option<Vec<SocialLink>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(links.len());
    let mut ok = true;

    for (i, link) in links.iter().enumerate() {
        let name_field = format!("siteMetadata.social[{i}].name");
        let url_field = format!("siteMetadata.social[{i}].url");

        let platform = required_text(v, &name_field, link.name.as_deref()).and_then(|name| {
            match name.parse::<Platform>() {
                Ok(platform) => Some(platform),
                Err(reason) => {
                    v.schema(&name_field, reason);
                    None
                }
            }
        });
        if let Some(platform) = platform {
            if !seen.insert(platform) {
                v.push(&name_field, ViolationKind::DuplicatePlatform { platform });
                ok = false;
            }
        }

        let url = required_text(v, &url_field, link.url.as_deref())
            .and_then(|url| check_social_url(v, &url_field, platform, url));

        match (platform, url) {
            (Some(name), Some(url)) => out.push(SocialLink { name, url }),
            _ => ok = false,
        }
    }

    ok.then_some(out)
}

// =============================================================================
// Loading
// =============================================================================

/// On-disk document format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// Parse one layer without validating it.
pub fn parse_partial(content: &str, format: Format) -> Result<PartialConfig, ConfigError> {
    let partial = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };
    Ok(partial)
}

/// Parse and validate a TOML document.
pub fn parse_toml(content: &str) -> Result<SiteConfig, ConfigError> {
    validate(&parse_partial(content, Format::Toml)?)
}

/// Parse and validate a JSON document.
pub fn parse_json(content: &str) -> Result<SiteConfig, ConfigError> {
    validate(&parse_partial(content, Format::Json)?)
}

/// Read one layer from disk without validating it.
pub fn load_partial(path: &Path) -> Result<PartialConfig, ConfigError> {
    tracing::debug!(path = %path.display(), "reading config layer");
    let content = fs::read_to_string(path)?;
    parse_partial(&content, Format::from_path(path))
}

/// Load and validate a single document.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_with(path, &PluginRegistry::builtin())
}

pub fn load_config_with(path: &Path, registry: &PluginRegistry) -> Result<SiteConfig, ConfigError> {
    validate_with(&load_partial(path)?, registry)
}

/// Load `base`, layer each overlay on top in order, then validate once.
pub fn load_layered(
    base: &Path,
    overlays: &[PathBuf],
    registry: &PluginRegistry,
) -> Result<SiteConfig, ConfigError> {
    let mut merged = load_partial(base)?;
    for overlay in overlays {
        tracing::debug!(overlay = %overlay.display(), "merging overlay");
        merged = merge(merged, load_partial(overlay)?);
    }
    validate_with(&merged, registry)
}

// =============================================================================
// Serialization
// =============================================================================

pub fn to_json(config: &SiteConfig) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(config)?)
}

pub fn to_toml(config: &SiteConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Returns a fully-commented starter document.
///
/// Used by the `gen-config` CLI command. The document is itself valid.
pub fn stock_config_toml() -> &'static str {
    r##"# Site Configuration
# ==================
# Read once by the build pipeline. Field names follow the theme's
# camelCase convention. Unknown keys cause an error.
#
# Environment-specific files can be layered on top of this one with
# `sitecfg check site.toml --overlay site.production.toml`. Overlays only
# need the keys they change; `social` and `plugins` are replaced wholesale.

# ---------------------------------------------------------------------------
# Plugins, applied in the order listed.
# ---------------------------------------------------------------------------
# Each entry is either a bare identifier or { resolve, options }.
# Exactly one entry must configure the content theme.
plugins = [
  "gatsby-plugin-sitemap",
  { resolve = "@narative/gatsby-theme-novela", options = { contentPosts = "content/posts", contentAuthors = "content/authors", basePath = "/", authorsPage = true, sources = { local = true, contentful = false } } },
  { resolve = "gatsby-plugin-manifest", options = { name = "Jane Doe", short_name = "Jane", start_url = "/", background_color = "#fff", theme_color = "#fff", display = "standalone", icon = "src/assets/favicon.png" } },
]

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
[siteMetadata]
title = "Jane Doe – Writing"
name = "Jane Doe"
# Absolute http(s) URL of the deployed site.
siteUrl = "https://example.com"
description = "Notes on data and programming"

# ---------------------------------------------------------------------------
# Hero block at the top of the home page
# ---------------------------------------------------------------------------
[siteMetadata.hero]
heading = "Notes on data and programming."
# subheading = "Optional second line"
# Maximum width of the hero text, in pixels.
maxWidth = 652

# ---------------------------------------------------------------------------
# Social profiles, one per platform.
# ---------------------------------------------------------------------------
# Platforms: twitter, github, instagram, linkedin, facebook, youtube,
# dribbble, medium, unsplash, behance, patreon, stackoverflow, mailto, url
[[siteMetadata.social]]
name = "github"
url = "https://github.com/janedoe"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_full_fixture() {
        let config = load_fixture("full.toml");
        let meta = &config.site_metadata;
        assert_eq!(meta.name, "Saïd Tezel");
        assert_eq!(meta.site_url, "https://saidtezel.com");
        assert_eq!(meta.hero.max_width, 652);
        assert_eq!(meta.hero.subheading.as_deref(), Some("Testing subheading"));
        assert_eq!(meta.social.len(), 4);
    }

    #[test]
    fn fixtures_preserve_plugin_order() {
        assert_eq!(
            load_fixture("full.toml").plugin_ids(),
            vec![
                "gatsby-plugin-sitemap",
                "gatsby-plugin-netlify",
                "gatsby-plugin-google-tagmanager",
                "@narative/gatsby-theme-novela",
                "gatsby-plugin-manifest",
            ]
        );
        assert_eq!(
            load_fixture("reduced.toml").plugin_ids(),
            load_fixture("full.toml").plugin_ids()
        );
        assert_eq!(
            load_fixture("minimal.toml").plugin_ids(),
            vec!["@narative/gatsby-theme-novela", "gatsby-plugin-manifest"]
        );
    }

    #[test]
    fn json_and_toml_fixtures_agree() {
        assert_eq!(load_fixture("full.json"), load_fixture("full.toml"));
    }

    #[test]
    fn load_config_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(&tmp.path().join("site.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_invalid_json_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.json");
        fs::write(&path, "{ \"siteMetadata\": ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/site.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a/site.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a/site.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("a/site")), Format::Toml);
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_top_level_key_rejected() {
        let result = parse_partial("[siteMetadat]\ntitle = \"x\"\n", Format::Toml);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_hero_key_rejected() {
        let result = parse_partial("[siteMetadata.hero]\nmax_width = 10\n", Format::Toml);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validation_is_idempotent() {
        for name in ["full.toml", "reduced.toml", "minimal.toml"] {
            let config = load_fixture(name);
            assert!(config.validate().is_ok(), "{name} failed re-validation");
            let again = validate(&PartialConfig::from(config.clone())).unwrap();
            assert_eq!(again, config, "{name} changed on re-validation");
        }
    }

    #[test]
    fn negative_max_width_cites_field() {
        let mut partial = valid_partial();
        hero_mut(&mut partial).max_width = Some(-5);
        let err = validate(&partial).unwrap_err();
        assert_schema_violation(&err, "siteMetadata.hero.maxWidth");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn zero_max_width_rejected() {
        let mut partial = valid_partial();
        hero_mut(&mut partial).max_width = Some(0);
        assert_schema_violation(&validate(&partial).unwrap_err(), "siteMetadata.hero.maxWidth");
    }

    #[test]
    fn oversized_max_width_rejected() {
        let mut partial = valid_partial();
        hero_mut(&mut partial).max_width = Some(i64::from(u32::MAX) + 1);
        assert_schema_violation(&validate(&partial).unwrap_err(), "siteMetadata.hero.maxWidth");
    }

    #[test]
    fn duplicate_platform_rejected() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).social = Some(vec![
            social("twitter", "https://twitter.com/a"),
            social("twitter", "https://twitter.com/b"),
        ]);
        let err = validate(&partial).unwrap_err();
        let dup = err
            .violations()
            .iter()
            .find(|v| matches!(v.kind, ViolationKind::DuplicatePlatform { .. }))
            .expect("duplicate platform violation");
        assert_eq!(dup.field, "siteMetadata.social[1].name");
        assert_eq!(
            dup.kind,
            ViolationKind::DuplicatePlatform {
                platform: Platform::Twitter
            }
        );
    }

    #[test]
    fn unknown_platform_rejected() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).social = Some(vec![social("myspace", "https://myspace.com/a")]);
        assert_schema_violation(
            &validate(&partial).unwrap_err(),
            "siteMetadata.social[0].name",
        );
    }

    #[test]
    fn social_url_must_be_absolute() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).social = Some(vec![social("github", "github.com/jane")]);
        assert_schema_violation(&validate(&partial).unwrap_err(), "siteMetadata.social[0].url");
    }

    #[test]
    fn mailto_social_link_accepted() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).social = Some(vec![social("mailto", "mailto:jane@example.com")]);
        let config = validate(&partial).unwrap();
        assert_eq!(config.site_metadata.social[0].name, Platform::Mailto);
    }

    #[test]
    fn script_and_data_social_urls_rejected() {
        for (platform, url) in [
            ("twitter", "javascript:alert(1)"),
            ("github", "data:text/html,hi"),
        ] {
            let mut partial = valid_partial();
            meta_mut(&mut partial).social = Some(vec![social(platform, url)]);
            let err = validate(&partial).unwrap_err();
            assert_schema_violation(&err, "siteMetadata.social[0].url");
            assert!(err.to_string().contains("must be http or https"), "{err}");
        }
    }

    #[test]
    fn mailto_platform_needs_mailto_scheme() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).social = Some(vec![social("mailto", "https://example.com/contact")]);
        let err = validate(&partial).unwrap_err();
        assert_schema_violation(&err, "siteMetadata.social[0].url");
        assert!(err.to_string().contains("must be mailto"));
    }

    #[test]
    fn missing_social_means_no_links() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).social = None;
        assert!(validate(&partial).unwrap().site_metadata.social.is_empty());
    }

    #[test]
    fn site_url_must_be_http() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).site_url = Some("ftp://example.com".into());
        let err = validate(&partial).unwrap_err();
        assert_schema_violation(&err, "siteMetadata.siteUrl");
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn relative_site_url_rejected() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).site_url = Some("/blog".into());
        assert_schema_violation(&validate(&partial).unwrap_err(), "siteMetadata.siteUrl");
    }

    #[test]
    fn blank_title_rejected() {
        let mut partial = valid_partial();
        meta_mut(&mut partial).title = Some("   ".into());
        let err = validate(&partial).unwrap_err();
        assert_schema_violation(&err, "siteMetadata.title");
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn blank_subheading_rejected() {
        let mut partial = valid_partial();
        hero_mut(&mut partial).subheading = Some("   ".into());
        assert_schema_violation(
            &validate(&partial).unwrap_err(),
            "siteMetadata.hero.subheading",
        );
    }

    #[test]
    fn empty_plugin_list_still_needs_theme() {
        let mut partial = valid_partial();
        partial.plugins = Some(vec![]);
        assert_schema_violation(&validate(&partial).unwrap_err(), "plugins");
    }

    #[test]
    fn missing_sections_reported() {
        let err = validate(&PartialConfig::default()).unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert_schema_violation(&err, "siteMetadata");
        assert_schema_violation(&err, "plugins");
    }

    #[test]
    fn every_violation_reported_in_one_pass() {
        let mut partial = valid_partial();
        {
            let meta = meta_mut(&mut partial);
            meta.title = None;
            meta.site_url = Some("not a url".into());
            meta.social = Some(vec![
                social("github", "https://github.com/a"),
                social("github", "https://github.com/b"),
            ]);
        }
        hero_mut(&mut partial).max_width = Some(-5);
        partial
            .plugins
            .get_or_insert_with(Vec::new)
            .push(PluginDescriptor::Name("gatsby-plugin-unheard-of".into()));

        let err = validate(&partial).unwrap_err();
        let ConfigError::Invalid(violations) = &err else {
            panic!("expected Invalid, got {err:?}");
        };
        let fields = violations.fields();
        assert!(fields.contains(&"siteMetadata.title"));
        assert!(fields.contains(&"siteMetadata.siteUrl"));
        assert!(fields.contains(&"siteMetadata.hero.maxWidth"));
        assert!(fields.contains(&"siteMetadata.social[1].name"));
        assert!(
            violations
                .iter()
                .any(|v| matches!(&v.kind, ViolationKind::UnknownPlugin { resolve } if resolve == "gatsby-plugin-unheard-of"))
        );
        assert_eq!(violations.len(), 5);
    }

    #[test]
    fn violations_display_one_per_line() {
        let mut v = Violations::new();
        v.schema("a", "first");
        v.schema("b", "second");
        assert_eq!(v.to_string(), "  - a: first\n  - b: second");
    }

    #[test]
    fn site_config_validate_catches_mutation() {
        let mut config = load_fixture("minimal.toml");
        config.site_metadata.hero.max_width = 0;
        let err = config.validate().unwrap_err();
        assert_schema_violation(&err, "siteMetadata.hero.maxWidth");
    }

    // =========================================================================
    // Merging
    // =========================================================================

    #[test]
    fn merge_scalar_override() {
        let base = valid_partial();
        let overlay: PartialConfig = toml::from_str(
            r#"
[siteMetadata]
siteUrl = "https://staging.example.com"
"#,
        )
        .unwrap();
        let merged = validate(&merge(base, overlay)).unwrap();
        assert_eq!(merged.site_metadata.site_url, "https://staging.example.com");
        // untouched fields preserved
        assert_eq!(merged.site_metadata.name, "Jane Doe");
    }

    #[test]
    fn merge_hero_field_by_field() {
        let base = valid_partial();
        let overlay: PartialConfig = toml::from_str(
            r#"
[siteMetadata.hero]
maxWidth = 800
"#,
        )
        .unwrap();
        let merged = validate(&merge(base, overlay)).unwrap();
        assert_eq!(merged.site_metadata.hero.max_width, 800);
        assert_eq!(merged.site_metadata.hero.heading, "Hello.");
    }

    #[test]
    fn merge_replaces_social_wholesale() {
        let mut base = valid_partial();
        meta_mut(&mut base).social = Some(vec![
            social("github", "https://github.com/a"),
            social("twitter", "https://twitter.com/a"),
        ]);
        let overlay: PartialConfig = toml::from_str(
            r#"
[[siteMetadata.social]]
name = "linkedin"
url = "https://linkedin.com/in/a"
"#,
        )
        .unwrap();
        let merged = validate(&merge(base, overlay)).unwrap();
        let names: Vec<Platform> = merged.site_metadata.social.iter().map(|s| s.name).collect();
        assert_eq!(names, vec![Platform::Linkedin]);
    }

    #[test]
    fn merge_replaces_plugins_wholesale() {
        let base = load_partial(&fixture_path("full.toml")).unwrap();
        let overlay = load_partial(&fixture_path("minimal.toml")).unwrap();
        let overlay = PartialConfig {
            site_metadata: None,
            plugins: overlay.plugins,
        };
        let merged = validate(&merge(base, overlay)).unwrap();
        assert_eq!(
            merged.plugin_ids(),
            vec!["@narative/gatsby-theme-novela", "gatsby-plugin-manifest"]
        );
        assert_eq!(merged.site_metadata.social.len(), 4);
    }

    #[test]
    fn merge_without_plugins_keeps_base_list() {
        let base = valid_partial();
        let expected = base.plugins.clone();
        let merged = merge(base, PartialConfig::default());
        assert_eq!(merged.plugins, expected);
    }

    #[test]
    fn merge_is_not_destructive_to_untouched_fields() {
        let a = PartialConfig::from(load_fixture("full.toml"));
        let b: PartialConfig = toml::from_str(
            r#"
[siteMetadata]
title = "Override"

[siteMetadata.hero]
maxWidth = 900
"#,
        )
        .unwrap();
        let restored = merge(merge(a.clone(), b), a.clone());
        assert_eq!(restored, a);
    }

    #[test]
    fn load_layered_applies_overlays_in_order() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first.toml");
        let second = tmp.path().join("second.json");
        fs::write(&first, "[siteMetadata]\ntitle = \"First\"\n").unwrap();
        fs::write(&second, r#"{ "siteMetadata": { "title": "Second" } }"#).unwrap();

        let config = load_layered(
            &fixture_path("minimal.toml"),
            &[first, second],
            &PluginRegistry::builtin(),
        )
        .unwrap();
        assert_eq!(config.site_metadata.title, "Second");
    }

    #[test]
    fn load_layered_validates_after_merge() {
        let tmp = TempDir::new().unwrap();
        let overlay = tmp.path().join("broken.toml");
        fs::write(&overlay, "[siteMetadata.hero]\nmaxWidth = -1\n").unwrap();
        let err = load_layered(
            &fixture_path("minimal.toml"),
            &[overlay],
            &PluginRegistry::builtin(),
        )
        .unwrap_err();
        assert_schema_violation(&err, "siteMetadata.hero.maxWidth");
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn json_round_trip() {
        for name in ["full.toml", "reduced.toml", "minimal.toml"] {
            let config = load_fixture(name);
            let json = to_json(&config).unwrap();
            assert_eq!(parse_json(&json).unwrap(), config, "{name}");
        }
    }

    #[test]
    fn toml_round_trip() {
        let config = load_fixture("full.toml");
        let toml = to_toml(&config).unwrap();
        assert_eq!(parse_toml(&toml).unwrap(), config);
    }

    #[test]
    fn site_config_deserializes_with_validation() {
        let result: Result<SiteConfig, _> =
            serde_json::from_str(r#"{ "siteMetadata": {}, "plugins": [] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn allowed_plugin_survives_revalidation_and_round_trip() {
        let mut partial = valid_partial();
        partial
            .plugins
            .get_or_insert_with(Vec::new)
            .push(PluginDescriptor::Name("gatsby-plugin-feed".into()));
        let registry = PluginRegistry::builtin().allow("gatsby-plugin-feed");
        let config = validate_with(&partial, &registry).unwrap();

        config.validate().unwrap();
        let json = to_json(&config).unwrap();
        let reparsed: SiteConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn registry_still_applies_when_loading() {
        let json = r#"{
  "siteMetadata": {
    "title": "T", "name": "N", "siteUrl": "https://example.com", "description": "D",
    "hero": { "heading": "H", "maxWidth": 600 }
  },
  "plugins": ["@narative/gatsby-theme-novela", "gatsby-plugin-feed"]
}"#;
        let err = parse_json(json).unwrap_err();
        assert!(matches!(
            &err.violations()[0].kind,
            ViolationKind::UnknownPlugin { resolve } if resolve == "gatsby-plugin-feed"
        ));
    }

    #[test]
    fn null_plugin_option_cites_path() {
        let json = r#"{
  "siteMetadata": {
    "title": "T", "name": "N", "siteUrl": "https://example.com", "description": "D",
    "hero": { "heading": "H", "maxWidth": 600 }
  },
  "plugins": [
    "@narative/gatsby-theme-novela",
    { "resolve": "gatsby-plugin-sharp", "options": { "x": null } }
  ]
}"#;
        let err = parse_json(json).unwrap_err();
        assert_schema_violation(&err, "plugins[1].options.x");
    }

    #[test]
    fn toml_datetime_option_serializes_as_string() {
        let toml = r#"
plugins = [
  "@narative/gatsby-theme-novela",
  { resolve = "gatsby-plugin-sharp", options = { when = 1979-05-27 } },
]

[siteMetadata]
title = "T"
name = "N"
siteUrl = "https://example.com"
description = "D"

[siteMetadata.hero]
heading = "H"
maxWidth = 600
"#;
        let config = parse_toml(toml).unwrap();
        let json = to_json(&config).unwrap();
        assert!(json.contains("\"when\": \"1979-05-27\""), "{json}");
        assert!(!json.contains("$__toml_private_datetime"));
        let reprinted = to_toml(&config).unwrap();
        assert!(reprinted.contains("1979-05-27"));
    }

    #[test]
    fn malformed_plugin_table_names_position_and_key() {
        let toml = r#"plugins = ["@narative/gatsby-theme-novela", { resolv = "x" }]"#;
        let err = parse_toml(toml).unwrap_err().to_string();
        assert!(err.contains("plugins[1]"), "{err}");
        assert!(err.contains("resolv"), "{err}");
    }

    #[test]
    fn non_string_plugin_entry_explains_shape() {
        let err = parse_toml("plugins = [42]").unwrap_err().to_string();
        assert!(err.contains("plugins[0]"), "{err}");
        assert!(err.contains("plugin identifier"), "{err}");
    }

    #[test]
    fn null_plugin_list_is_absent() {
        let partial = parse_partial(r#"{ "plugins": null }"#, Format::Json).unwrap();
        assert_eq!(partial.plugins, None);
    }

    #[test]
    fn serialized_json_uses_camel_case() {
        let json = to_json(&load_fixture("full.toml")).unwrap();
        assert!(json.contains("\"siteMetadata\""));
        assert!(json.contains("\"siteUrl\""));
        assert!(json.contains("\"maxWidth\": 652"));
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_is_valid() {
        let config = parse_toml(stock_config_toml()).unwrap();
        assert_eq!(config.site_metadata.hero.max_width, 652);
        assert!(config.theme().is_some());
    }

    #[test]
    fn stock_config_lists_every_platform() {
        let content = stock_config_toml();
        for platform in Platform::ALL {
            assert!(content.contains(platform.as_str()), "{platform} missing");
        }
    }
}
