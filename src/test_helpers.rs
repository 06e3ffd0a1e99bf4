//! Shared test utilities for the sitecfg test suite.
//!
//! Provides fixture loaders, a programmatic valid document to mutate, lookup
//! helpers that panic with a clear message on miss, and violation assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut partial = valid_partial();
//! hero_mut(&mut partial).max_width = Some(-5);
//! let err = validate(&partial).unwrap_err();
//! assert_schema_violation(&err, "siteMetadata.hero.maxWidth");
//! ```

use std::path::{Path, PathBuf};

use crate::config::{
    self, ConfigError, PartialConfig, PartialHero, PartialSiteMetadata, PartialSocialLink,
    SiteConfig, ViolationKind,
};
use crate::plugins::{Plugin, PluginDescriptor, THEME};

// =========================================================================
// Fixtures
// =========================================================================

/// Absolute path of a document under `fixtures/sites/`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/sites")
        .join(name)
}

/// Load and validate a fixture document. Panics on any error.
pub fn load_fixture(name: &str) -> SiteConfig {
    config::load_config(&fixture_path(name))
        .unwrap_or_else(|e| panic!("fixture '{name}' failed to load: {e}"))
}

/// A small valid document built in code, for tests that mutate one field.
pub fn valid_partial() -> PartialConfig {
    PartialConfig {
        site_metadata: Some(PartialSiteMetadata {
            title: Some("Jane Doe – Writing".into()),
            name: Some("Jane Doe".into()),
            site_url: Some("https://example.com".into()),
            description: Some("Notes".into()),
            hero: Some(PartialHero {
                heading: Some("Hello.".into()),
                subheading: None,
                max_width: Some(652),
            }),
            social: Some(vec![social("github", "https://github.com/janedoe")]),
        }),
        plugins: Some(vec![PluginDescriptor::Name(THEME.to_string())]),
    }
}

pub fn social(name: &str, url: &str) -> PartialSocialLink {
    PartialSocialLink {
        name: Some(name.into()),
        url: Some(url.into()),
    }
}

pub fn meta_mut(partial: &mut PartialConfig) -> &mut PartialSiteMetadata {
    partial.site_metadata.get_or_insert_with(Default::default)
}

pub fn hero_mut(partial: &mut PartialConfig) -> &mut PartialHero {
    meta_mut(partial).hero.get_or_insert_with(Default::default)
}

// =========================================================================
// Lookups — panic with a clear message on miss
// =========================================================================

/// Find a plugin by identifier. Panics if not found.
pub fn find_plugin<'a>(config: &'a SiteConfig, resolve: &str) -> &'a Plugin {
    config
        .plugins
        .iter()
        .find(|p| p.resolve() == resolve)
        .unwrap_or_else(|| {
            let ids = config.plugin_ids();
            panic!("plugin '{resolve}' not found. Available: {ids:?}")
        })
}

// =========================================================================
// Violation assertions
// =========================================================================

/// Assert that `err` carries a schema violation for `field`.
pub fn assert_schema_violation(err: &ConfigError, field: &str) {
    let found = err
        .violations()
        .iter()
        .any(|v| v.field == field && matches!(v.kind, ViolationKind::Schema { .. }));
    if !found {
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
        panic!("no schema violation for '{field}'. Reported: {fields:?} ({err})");
    }
}
