//! CLI output formatting.
//!
//! Every entity is shown as a positional index plus its identity, with
//! details on indented context lines:
//!
//! ```text
//! Site
//!     Saïd Tezel – Data Analyst and Developer Based in London
//!     URL: https://saidtezel.com
//!     Hero: Perspectives on data, programming and digital mark... (652px)
//!
//! Social
//!     001 twitter → https://twitter.com/said_tezel
//!
//! Plugins
//!     001 gatsby-plugin-sitemap
//!     002 @narative/gatsby-theme-novela
//!         Posts: content/posts
//!         Authors: content/authors
//!
//! Sources
//!     local: content/posts, content/authors
//! ```
//!
//! `format_*` functions return lines and do no I/O; `print_*` wrappers write
//! them to stdout or stderr.

use crate::config::{ConfigError, SiteConfig};
use crate::plugins::Plugin;
use crate::sources::ContentSource;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// Context lines shown under a plugin entry.
fn plugin_details(plugin: &Plugin) -> Vec<String> {
    match plugin {
        Plugin::TagManager(tm) => {
            let mut lines = vec![format!("Container: {}", tm.id)];
            if tm.include_in_development {
                lines.push("Included in development".to_string());
            }
            lines
        }
        Plugin::Theme(theme) => {
            let mut lines = vec![
                format!("Posts: {}", theme.content_posts),
                format!("Authors: {}", theme.content_authors),
                format!("Base path: {}", theme.base_path),
            ];
            if theme.authors_page {
                lines.push("Authors page: on".to_string());
            }
            lines
        }
        Plugin::Manifest(manifest) => vec![
            format!("App name: {}", manifest.name),
            format!("Icon: {}", manifest.icon),
        ],
        Plugin::Other { options, .. } if !options.is_empty() => {
            let keys: Vec<&str> = options.keys().map(String::as_str).collect();
            vec![format!("Options: {}", keys.join(", "))]
        }
        Plugin::Sitemap | Plugin::Netlify | Plugin::Other { .. } => Vec::new(),
    }
}

/// Numbered plugin list with per-plugin details, in declaration order.
pub fn format_plugins(config: &SiteConfig) -> Vec<String> {
    let mut lines = vec!["Plugins".to_string()];
    if config.plugins.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, plugin) in config.plugins.iter().enumerate() {
        lines.push(format!(
            "{}{} {}",
            indent(1),
            format_index(i + 1),
            plugin.resolve()
        ));
        for detail in plugin_details(plugin) {
            lines.push(format!("{}{}", indent(2), detail));
        }
    }
    lines
}

/// Summary of a validated document and the sources that were checked.
pub fn format_check_output(config: &SiteConfig, sources: &[ContentSource]) -> Vec<String> {
    let meta = &config.site_metadata;
    let mut lines = vec![
        "Site".to_string(),
        format!("{}{}", indent(1), meta.title),
        format!("{}URL: {}", indent(1), meta.site_url),
        format!(
            "{}Hero: {} ({}px)",
            indent(1),
            truncate(&meta.hero.heading, 50),
            meta.hero.max_width
        ),
    ];
    if let Some(sub) = &meta.hero.subheading {
        lines.push(format!("{}{}", indent(2), truncate(sub, 50)));
    }

    if !meta.social.is_empty() {
        lines.push(String::new());
        lines.push("Social".to_string());
        for (i, link) in meta.social.iter().enumerate() {
            lines.push(format!(
                "{}{} {} → {}",
                indent(1),
                format_index(i + 1),
                link.name,
                link.url
            ));
        }
    }

    lines.push(String::new());
    lines.extend(format_plugins(config));

    lines.push(String::new());
    lines.push("Sources".to_string());
    for source in sources {
        match source {
            ContentSource::Local { posts, authors } => lines.push(format!(
                "{}local: {}, {}",
                indent(1),
                posts.display(),
                authors.display()
            )),
            ContentSource::Contentful => {
                lines.push(format!("{}contentful (remote, not checked)", indent(1)))
            }
        }
    }

    lines
}

/// Error report; validation failures list every violated field.
pub fn format_error(err: &ConfigError) -> Vec<String> {
    match err {
        ConfigError::Invalid(violations) => {
            let mut lines = vec![format!(
                "Invalid configuration ({} problem{})",
                violations.len(),
                if violations.len() == 1 { "" } else { "s" }
            )];
            for violation in violations {
                lines.push(format!("{}{}", indent(1), violation.field));
                lines.push(format!("{}{}", indent(2), violation.kind));
            }
            lines
        }
        other => vec![format!("Error: {other}")],
    }
}

pub fn print_plugins(config: &SiteConfig) {
    for line in format_plugins(config) {
        println!("{}", line);
    }
}

pub fn print_check_output(config: &SiteConfig, sources: &[ContentSource]) {
    for line in format_check_output(config, sources) {
        println!("{}", line);
    }
}

pub fn print_error(err: &ConfigError) {
    for line in format_error(err) {
        eprintln!("{}", line);
    }
}
