//! Plugin descriptors and their typed option records.
//!
//! On disk a plugin is either a bare identifier or `{ resolve, options }`
//! ([`PluginDescriptor`]). After validation each descriptor becomes a
//! [`Plugin`]: plugins whose identifiers are known statically get a typed
//! options record, everything else keeps an open string-keyed map.
//!
//! | Identifier | Variant |
//! |------------|---------|
//! | `gatsby-plugin-sitemap` | [`Plugin::Sitemap`] |
//! | `gatsby-plugin-netlify` | [`Plugin::Netlify`] |
//! | `gatsby-plugin-google-tagmanager` | [`Plugin::TagManager`] |
//! | `@narative/gatsby-theme-novela` | [`Plugin::Theme`] |
//! | `gatsby-plugin-manifest` | [`Plugin::Manifest`] |
//! | anything in the registry | [`Plugin::Other`] |

use crate::config::{ViolationKind, Violations, required_text};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

pub const SITEMAP: &str = "gatsby-plugin-sitemap";
pub const NETLIFY: &str = "gatsby-plugin-netlify";
pub const TAG_MANAGER: &str = "gatsby-plugin-google-tagmanager";
pub const THEME: &str = "@narative/gatsby-theme-novela";
pub const MANIFEST: &str = "gatsby-plugin-manifest";

/// Open options record.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// A plugin entry as written in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginDescriptor {
    Name(String),
    Detailed(DetailedDescriptor),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedDescriptor {
    pub resolve: String,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
}

impl PluginDescriptor {
    pub fn detailed(resolve: impl Into<String>, options: Options) -> Self {
        PluginDescriptor::Detailed(DetailedDescriptor {
            resolve: resolve.into(),
            options,
        })
    }

    pub fn resolve(&self) -> &str {
        match self {
            PluginDescriptor::Name(name) => name,
            PluginDescriptor::Detailed(d) => &d.resolve,
        }
    }

    /// Options record; bare identifiers have none.
    pub fn options(&self) -> Option<&Options> {
        match self {
            PluginDescriptor::Name(_) => None,
            PluginDescriptor::Detailed(d) => Some(&d.options),
        }
    }
}

// Deserialized by hand rather than `untagged` so a malformed table reports
// the offending key instead of "did not match any variant".
impl<'de> Deserialize<'de> for PluginDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DescriptorVisitor;

        impl<'de> Visitor<'de> for DescriptorVisitor {
            type Value = PluginDescriptor;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a plugin identifier or a { resolve, options } table")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(PluginDescriptor::Name(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(PluginDescriptor::Name(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                DetailedDescriptor::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(PluginDescriptor::Detailed)
            }
        }

        deserializer.deserialize_any(DescriptorVisitor)
    }
}

/// Deserialize the `plugins` list, prefixing element errors with their
/// position (`plugins[3]: unknown field ...`).
pub(crate) fn deserialize_descriptors<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<PluginDescriptor>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<PluginDescriptor>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of plugins")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            loop {
                let i = out.len();
                match seq.next_element::<PluginDescriptor>() {
                    Ok(Some(descriptor)) => out.push(descriptor),
                    Ok(None) => return Ok(out),
                    Err(e) => return Err(de::Error::custom(format_args!("plugins[{i}]: {e}"))),
                }
            }
        }
    }

    struct OptionalListVisitor;

    impl<'de> Visitor<'de> for OptionalListVisitor {
        type Value = Option<Vec<PluginDescriptor>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of plugins")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_seq(ListVisitor).map(Some)
        }
    }

    deserializer.deserialize_option(OptionalListVisitor)
}

/// A validated plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum Plugin {
    Sitemap,
    Netlify,
    TagManager(TagManagerOptions),
    Theme(ThemeOptions),
    Manifest(ManifestOptions),
    /// A plugin without a typed options record. Also used for the sitemap
    /// and netlify plugins when they are given options.
    Other { resolve: String, options: Options },
}

impl Plugin {
    pub fn resolve(&self) -> &str {
        match self {
            Plugin::Sitemap => SITEMAP,
            Plugin::Netlify => NETLIFY,
            Plugin::TagManager(_) => TAG_MANAGER,
            Plugin::Theme(_) => THEME,
            Plugin::Manifest(_) => MANIFEST,
            Plugin::Other { resolve, .. } => resolve,
        }
    }

    /// The document form of this plugin.
    pub fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::from(self.clone())
    }

    /// Decode a descriptor's options into the typed record for its identifier.
    ///
    /// Only checks shape; value constraints are checked by [`Plugin::check`].
    pub fn from_descriptor(descriptor: &PluginDescriptor) -> Result<Plugin, serde_json::Error> {
        let options = descriptor.options().cloned().unwrap_or_default();
        let typed = |options: Options| serde_json::Value::Object(options);

        let plugin = match descriptor.resolve() {
            SITEMAP if options.is_empty() => Plugin::Sitemap,
            NETLIFY if options.is_empty() => Plugin::Netlify,
            TAG_MANAGER => Plugin::TagManager(serde_json::from_value(typed(options))?),
            THEME => Plugin::Theme(serde_json::from_value(typed(options))?),
            MANIFEST => Plugin::Manifest(serde_json::from_value(typed(options))?),
            resolve => Plugin::Other {
                resolve: resolve.to_string(),
                options,
            },
        };
        Ok(plugin)
    }

    /// Record violations of value constraints under `field` (e.g. `plugins[2]`).
    pub fn check(&self, field: &str, violations: &mut Violations) {
        match self {
            Plugin::TagManager(options) => options.check(field, violations),
            Plugin::Theme(options) => options.check(field, violations),
            Plugin::Manifest(options) => options.check(field, violations),
            Plugin::Sitemap | Plugin::Netlify | Plugin::Other { .. } => {}
        }
    }
}

impl From<Plugin> for PluginDescriptor {
    fn from(plugin: Plugin) -> Self {
        match plugin {
            Plugin::Sitemap => PluginDescriptor::Name(SITEMAP.to_string()),
            Plugin::Netlify => PluginDescriptor::Name(NETLIFY.to_string()),
            Plugin::TagManager(o) => PluginDescriptor::detailed(TAG_MANAGER, o.to_options()),
            Plugin::Theme(o) => PluginDescriptor::detailed(THEME, o.to_options()),
            Plugin::Manifest(o) => PluginDescriptor::detailed(MANIFEST, o.to_options()),
            Plugin::Other { resolve, options } if options.is_empty() => {
                PluginDescriptor::Name(resolve)
            }
            Plugin::Other { resolve, options } => PluginDescriptor::detailed(resolve, options),
        }
    }
}

/// Insert `value` under `key` when present.
fn insert_some(options: &mut Options, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        options.insert(key.to_string(), Value::from(value.as_str()));
    }
}

// =============================================================================
// Typed options
// =============================================================================

/// Options for `gatsby-plugin-google-tagmanager`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagManagerOptions {
    /// Container id, `GTM-XXXXXXX`.
    pub id: String,
    #[serde(default)]
    pub include_in_development: bool,
    /// Pushed to the data layer before the container loads.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub default_data_layer: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_layer_name: Option<String>,
    /// Options the plugin accepts that are passed through untouched.
    #[serde(flatten)]
    pub extra: Options,
}

impl TagManagerOptions {
    /// The record in document form, keys as the plugin reads them.
    pub fn to_options(&self) -> Options {
        let mut options = self.extra.clone();
        options.insert("id".into(), Value::from(self.id.as_str()));
        options.insert(
            "includeInDevelopment".into(),
            Value::Bool(self.include_in_development),
        );
        if !self.default_data_layer.is_empty() {
            options.insert(
                "defaultDataLayer".into(),
                Value::Object(self.default_data_layer.clone()),
            );
        }
        insert_some(&mut options, "dataLayerName", &self.data_layer_name);
        options
    }

    fn check(&self, field: &str, v: &mut Violations) {
        let id_field = format!("{field}.options.id");
        match self.id.strip_prefix("GTM-") {
            Some(rest) if !rest.is_empty() => {}
            _ => v.schema(
                id_field,
                format!("container id '{}' must look like GTM-XXXXXXX", self.id),
            ),
        }
        if let Some(name) = &self.data_layer_name {
            required_text(v, &format!("{field}.options.dataLayerName"), Some(name.as_str()));
        }
    }
}

/// Options for the content theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ThemeOptions {
    /// Directory holding post content, relative to the site root.
    pub content_posts: String,
    /// Directory holding author records, relative to the site root.
    pub content_authors: String,
    /// URL prefix the theme mounts under.
    pub base_path: String,
    /// Generate an index page listing all authors.
    pub authors_page: bool,
    pub sources: SourcesConfig,
}

impl Default for ThemeOptions {
    fn default() -> Self {
        Self {
            content_posts: "content/posts".to_string(),
            content_authors: "content/authors".to_string(),
            base_path: "/".to_string(),
            authors_page: false,
            sources: SourcesConfig::default(),
        }
    }
}

impl ThemeOptions {
    pub fn to_options(&self) -> Options {
        let mut sources = Options::new();
        sources.insert("local".into(), Value::Bool(self.sources.local));
        sources.insert("contentful".into(), Value::Bool(self.sources.contentful));

        let mut options = Options::new();
        options.insert("contentPosts".into(), Value::from(self.content_posts.as_str()));
        options.insert("contentAuthors".into(), Value::from(self.content_authors.as_str()));
        options.insert("basePath".into(), Value::from(self.base_path.as_str()));
        options.insert("authorsPage".into(), Value::Bool(self.authors_page));
        options.insert("sources".into(), Value::Object(sources));
        options
    }

    fn check(&self, field: &str, v: &mut Violations) {
        required_text(
            v,
            &format!("{field}.options.contentPosts"),
            Some(self.content_posts.as_str()),
        );
        required_text(
            v,
            &format!("{field}.options.contentAuthors"),
            Some(self.content_authors.as_str()),
        );
        if !self.base_path.starts_with('/') {
            v.schema(
                format!("{field}.options.basePath"),
                format!("'{}' must start with '/'", self.base_path),
            );
        }
        if !self.sources.local && !self.sources.contentful {
            v.schema(
                format!("{field}.options.sources"),
                "at least one content source must be enabled",
            );
        }
    }
}

/// Which content origins feed the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// Read posts and authors from local directories.
    pub local: bool,
    /// Read posts and authors from the Contentful CMS.
    pub contentful: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            local: true,
            contentful: false,
        }
    }
}

/// Options for `gatsby-plugin-manifest`. Keys are snake_case, as the plugin
/// expects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestOptions {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    pub start_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    pub display: DisplayMode,
    /// Source image the icon set is generated from.
    pub icon: String,
    #[serde(flatten)]
    pub extra: Options,
}

impl ManifestOptions {
    pub fn to_options(&self) -> Options {
        let mut options = self.extra.clone();
        options.insert("name".into(), Value::from(self.name.as_str()));
        insert_some(&mut options, "short_name", &self.short_name);
        options.insert("start_url".into(), Value::from(self.start_url.as_str()));
        insert_some(&mut options, "background_color", &self.background_color);
        insert_some(&mut options, "theme_color", &self.theme_color);
        options.insert("display".into(), Value::from(self.display.as_str()));
        options.insert("icon".into(), Value::from(self.icon.as_str()));
        options
    }

    fn check(&self, field: &str, v: &mut Violations) {
        required_text(v, &format!("{field}.options.name"), Some(self.name.as_str()));
        required_text(v, &format!("{field}.options.start_url"), Some(self.start_url.as_str()));
        required_text(v, &format!("{field}.options.icon"), Some(self.icon.as_str()));
        for (key, value) in [
            ("short_name", &self.short_name),
            ("background_color", &self.background_color),
            ("theme_color", &self.theme_color),
        ] {
            if let Some(value) = value {
                required_text(v, &format!("{field}.options.{key}"), Some(value.as_str()));
            }
        }
    }
}

/// Web app manifest `display` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    Fullscreen,
    Standalone,
    MinimalUi,
    Browser,
}

impl DisplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Fullscreen => "fullscreen",
            DisplayMode::Standalone => "standalone",
            DisplayMode::MinimalUi => "minimal-ui",
            DisplayMode::Browser => "browser",
        }
    }
}

// =============================================================================
// Registry and resolution
// =============================================================================

/// Plugin identifiers the build pipeline can resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRegistry {
    known: BTreeSet<String>,
    /// Accept every identifier.
    open: bool,
}

impl PluginRegistry {
    /// The typed plugins plus the image and head plugins the theme pulls in.
    pub fn builtin() -> Self {
        let known = [
            SITEMAP,
            NETLIFY,
            TAG_MANAGER,
            THEME,
            MANIFEST,
            "gatsby-plugin-react-helmet",
            "gatsby-plugin-image",
            "gatsby-plugin-sharp",
            "gatsby-transformer-sharp",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        Self { known, open: false }
    }

    /// A registry that resolves any identifier. Used where the document was
    /// already checked against the pipeline's registry, or where no pipeline
    /// is known (deserializing a [`SiteConfig`](crate::config::SiteConfig)).
    pub fn open() -> Self {
        Self {
            known: BTreeSet::new(),
            open: true,
        }
    }

    pub fn allow(mut self, resolve: impl Into<String>) -> Self {
        self.known.insert(resolve.into());
        self
    }

    pub fn contains(&self, resolve: &str) -> bool {
        self.open || self.known.contains(resolve)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Explicitly listed identifiers. An open registry lists none.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Marker key the TOML parser wraps date-time values in.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// Rewrite option values so they serialize to both JSON and TOML.
///
/// TOML date-times become their RFC 3339 string. `null` has no TOML form and
/// is reported at its path (`plugins[1].options.feeds[0].title`). Returns
/// `None` if anything was reported.
fn normalize_options(
    field: &str,
    options: &Options,
    violations: &mut Violations,
) -> Option<Options> {
    let before = violations.len();
    let out = options
        .iter()
        .map(|(key, value)| {
            let path = format!("{field}.{key}");
            (key.clone(), normalize_value(&path, value, violations))
        })
        .collect();
    (violations.len() == before).then_some(out)
}

fn normalize_value(path: &str, value: &Value, violations: &mut Violations) -> Value {
    match value {
        Value::Null => {
            violations.schema(path, "null is not allowed in plugin options, omit the key instead");
            Value::Null
        }
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(datetime)) = map.get(TOML_DATETIME_KEY) {
                    return Value::String(datetime.clone());
                }
            }
            Value::Object(
                map.iter()
                    .map(|(key, value)| {
                        let path = format!("{path}.{key}");
                        (key.clone(), normalize_value(&path, value, violations))
                    })
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| normalize_value(&format!("{path}[{i}]"), item, violations))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve every descriptor in order, recording violations as they are found.
///
/// Returns the plugins that resolved cleanly. Also enforces that exactly one
/// descriptor configures the content theme.
pub fn resolve_all(
    descriptors: &[PluginDescriptor],
    registry: &PluginRegistry,
    violations: &mut Violations,
) -> Vec<Plugin> {
    let mut plugins = Vec::with_capacity(descriptors.len());

    for (i, descriptor) in descriptors.iter().enumerate() {
        let field = format!("plugins[{i}]");
        let resolve = descriptor.resolve();

        if resolve.trim().is_empty() {
            violations.schema(field, "plugin identifier must not be blank");
            continue;
        }
        if !registry.contains(resolve) {
            violations.push(
                field,
                ViolationKind::UnknownPlugin {
                    resolve: resolve.to_string(),
                },
            );
            continue;
        }

        let descriptor = match descriptor {
            PluginDescriptor::Name(_) => descriptor.clone(),
            PluginDescriptor::Detailed(d) => {
                let options_field = format!("{field}.options");
                match normalize_options(&options_field, &d.options, violations) {
                    Some(options) => PluginDescriptor::detailed(resolve, options),
                    None => continue,
                }
            }
        };

        match Plugin::from_descriptor(&descriptor) {
            Ok(plugin) => {
                plugin.check(&field, violations);
                plugins.push(plugin);
            }
            Err(e) => violations.schema(format!("{field}.options"), e.to_string()),
        }
    }

    let themes = descriptors.iter().filter(|d| d.resolve() == THEME).count();
    if themes != 1 {
        violations.schema(
            "plugins",
            format!("expected exactly one content theme plugin ({THEME}), found {themes}"),
        );
    }

    tracing::debug!(
        resolved = plugins.len(),
        declared = descriptors.len(),
        "plugins resolved"
    );
    plugins
}
