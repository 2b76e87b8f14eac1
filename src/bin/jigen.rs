//! jigen CLI
//!
//! Builds derivation graphs and character profiles from the configured
//! datasets and prints them as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jigen::{
    build_profile, load_dataset, ArtifactCache, Construction, FileStore, GraphEngine,
    JigenConfig, OutputFormat, RelationGraph, Selection,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jigen")]
#[command(about = "Character derivation graphs and descriptions")]
struct Cli {
    /// Config file (defaults to jigen.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Dataset directory, overriding the config
    #[arg(short, long)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph boundary (whole graph, or one character's neighbourhood)
    Graph {
        /// Focal character, `all`, or `none`
        #[arg(short = 'C', long, default_value = "all")]
        character: String,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip the artifact cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Show the descriptive profile of a character
    Profile {
        character: String,
        /// Emit the HTML fragment instead of JSON
        #[arg(long)]
        html: bool,
    },

    /// List base characters that have groups
    Index,

    /// Search base characters
    Search {
        query: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Remove every cached graph
    CacheClear,

    /// Print the effective configuration
    Config {
        /// Also write it to this file
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(text)
}

fn open_cache(config: &JigenConfig) -> Result<ArtifactCache<FileStore>> {
    let dir = config.cache_dir();
    let store = FileStore::open(&dir, Some(config.cache.quota_bytes))
        .with_context(|| format!("opening cache at {}", dir.display()))?;
    Ok(ArtifactCache::new(store))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = JigenConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data {
        config.data.dir = dir;
    }
    let format = config.output.format;

    match cli.command {
        Commands::Graph {
            character,
            output,
            no_cache,
        } => {
            let dataset = load_dataset(&config.load_config())?;
            let selection = Selection::parse(Some(&character));

            let mut engine = if no_cache || !config.cache.enabled {
                GraphEngine::uncached()
            } else {
                GraphEngine::new(open_cache(&config)?)
            };

            match engine.construct(&dataset, &selection) {
                Construction::Disabled => {
                    println!("Graph disabled (selection: {:?})", character);
                }
                Construction::NotFound { focal } => {
                    println!("No groups found for {}", focal);
                }
                Construction::Graph { boundary, cache } => {
                    let text = print_json(&boundary, format)?;
                    match output {
                        Some(path) => {
                            std::fs::write(&path, text)
                                .with_context(|| format!("writing {}", path.display()))?;
                            println!(
                                "Wrote {} nodes, {} edges to {} ({:?})",
                                boundary.node_count(),
                                boundary.edge_count(),
                                path.display(),
                                cache
                            );
                        }
                        None => println!("{}", text),
                    }
                }
            }
        }

        Commands::Profile { character, html } => {
            let dataset = load_dataset(&config.load_config())?;
            let profile = build_profile(&dataset, &character);
            if profile.is_empty() {
                println!("Nothing known about {}", character);
            } else if html {
                println!("{}", jigen::profile::render_profile_html(&profile));
            } else {
                println!("{}", print_json(&profile, format)?);
            }
        }

        Commands::Index => {
            let dataset = load_dataset(&config.load_config())?;
            let graph = RelationGraph::invert(&dataset.groups);
            for base in graph.base_characters() {
                println!("{}", base);
            }
        }

        Commands::Search { query, limit } => {
            let dataset = load_dataset(&config.load_config())?;
            let graph = RelationGraph::invert(&dataset.groups);
            let results = graph.search(&query, limit);
            if results.is_empty() {
                println!("No matches for {}", query);
            }
            for result in results {
                println!("{}\t{}", result.base, result.score);
            }
        }

        Commands::CacheClear => {
            let mut cache = open_cache(&config)?;
            let removed = cache.clear()?;
            println!("Removed {} cached graph(s) from {}", removed, cache.store().dir().display());
        }

        Commands::Config { write } => {
            let text = toml::to_string_pretty(&config)?;
            println!("{}", text);
            if let Some(path) = write {
                config
                    .save(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(())
}
