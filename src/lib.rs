//! # sitecfg
//!
//! Typed loading, merging, and validation for the configuration document of a
//! content-theme static site. The document is read once by an external build
//! pipeline; this crate only makes sure what it reads is well formed.
//!
//! # Pipeline
//!
//! ```text
//! 1. Parse     site.toml / site.json  →  PartialConfig   (every field optional)
//! 2. Merge     base + overlays        →  PartialConfig   (override layers)
//! 3. Validate  PartialConfig          →  SiteConfig      (all violations at once)
//! ```
//!
//! Parsing rejects unknown keys and wrong types. Validation checks values:
//! required fields, absolute URLs, positive widths, unique social platforms,
//! resolvable plugins, and exactly one content theme.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Document layers, loading, merging, validation, stock document |
//! | [`plugins`] | Plugin descriptors, typed option records, plugin registry |
//! | [`sources`] | Content origins enabled by the theme, local directory checks |
//! | [`types`] | Shared leaf types (`Platform`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Values, No Globals
//!
//! A [`config::SiteConfig`] is an ordinary value returned by
//! [`config::load_config`] and passed by reference to whatever consumes it.
//! Tests build arbitrary documents in code without touching shared state.
//!
//! ## Whole-List Overrides
//!
//! Plugin order is load-bearing: the tag manager must be injected before the
//! theme renders. Overlays therefore replace `plugins` (and `social`)
//! wholesale instead of splicing individual entries.
//!
//! ## Typed Plugin Options
//!
//! Plugins known statically get a typed options record
//! ([`plugins::ThemeOptions`], [`plugins::ManifestOptions`],
//! [`plugins::TagManagerOptions`]). Third-party plugins keep an open map and
//! must be admitted through [`plugins::PluginRegistry::allow`].

pub mod config;
pub mod output;
pub mod plugins;
pub mod sources;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
