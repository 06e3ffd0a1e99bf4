use clap::{Parser, Subcommand, ValueEnum};
use sitecfg::config::{self, ConfigError, SiteConfig};
use sitecfg::plugins::PluginRegistry;
use sitecfg::{output, sources};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Document and overlays shared by every command that loads a config.
#[derive(clap::Args, Clone)]
struct LoadArgs {
    /// Site configuration document (.toml or .json)
    file: PathBuf,

    /// Overlay documents merged on top, in order
    #[arg(long = "overlay", value_name = "FILE")]
    overlays: Vec<PathBuf>,

    /// Additional plugin identifiers the build pipeline can resolve
    #[arg(long = "allow-plugin", value_name = "ID")]
    allow_plugins: Vec<String>,
}

impl LoadArgs {
    fn load(&self) -> Result<SiteConfig, ConfigError> {
        let registry = self
            .allow_plugins
            .iter()
            .fold(PluginRegistry::builtin(), |registry, id| registry.allow(id));
        config::load_layered(&self.file, &self.overlays, &registry)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PrintFormat {
    Json,
    Toml,
}

#[derive(Parser)]
#[command(name = "sitecfg")]
#[command(about = "Validate and merge site configuration documents")]
#[command(long_about = "\
Validate and merge site configuration documents

A document holds site metadata (title, URL, hero block, social links) and the
ordered list of plugins the build pipeline instantiates. Overlays replace
scalar fields, merge the hero block field by field, and replace the social
and plugin lists wholesale.

Every problem is reported in one pass, each with its field path.

Run 'sitecfg gen-config' to print a documented starter document.")]
#[command(version)]
struct Cli {
    /// Log loading and merging steps
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a document and check its local content directories
    Check {
        #[command(flatten)]
        load: LoadArgs,

        /// Site root that content directories are relative to
        /// (default: the directory containing FILE)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the merged, validated document
    Print {
        #[command(flatten)]
        load: LoadArgs,

        #[arg(long, value_enum, default_value = "json")]
        format: PrintFormat,
    },
    /// List plugins in the order the build pipeline applies them
    Plugins {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Print a starter document with every option documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), ConfigError> {
    match command {
        Command::Check { load, root } => {
            let config = load.load()?;
            let root = root.unwrap_or_else(|| site_root(&load.file));
            let sources = sources::check_sources(&config, &root)?;
            output::print_check_output(&config, &sources);
            println!("==> Configuration is valid");
        }
        Command::Print { load, format } => {
            let config = load.load()?;
            let rendered = match format {
                PrintFormat::Json => config::to_json(&config)?,
                PrintFormat::Toml => config::to_toml(&config)?,
            };
            println!("{}", rendered.trim_end());
        }
        Command::Plugins { load } => {
            let config = load.load()?;
            output::print_plugins(&config);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// Directory containing the document; content paths are relative to it.
fn site_root(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
