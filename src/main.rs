use catalog_hubs::classify::{self, classify_request};
use catalog_hubs::inventory::{self, InventoryItem};
use catalog_hubs::snapshot::{Snapshot, SnapshotHandle};
use catalog_hubs::{aggregate, config, output, render, sitemap};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "catalog-hubs")]
#[command(about = "Facet hubs, indexability decisions and sitemaps for a dealer catalog")]
#[command(long_about = "\
Facet hubs, indexability decisions and sitemaps for a dealer catalog

The inventory is a JSON array exported from the catalog. Every run reads it
once, aggregates facet clusters, builds the hub registry and answers from that
snapshot.

Hub paths:

  /hubs/category/dump-trucks/                     # single facet
  /hubs/category/dump-trucks/formula/6x4/         # facet pair
  /hubs/line/x3000/in-stock/                      # in-stock variant

Facet segments: category, line, formula, engine. Pairs exist in one order
only: category first, then line, then formula, then engine.

Indexing rules (first match wins):
  any parameter besides page   noindex, clean canonical
  thin or unlisted page        noindex, clean canonical (still 200)
  page > 1                     noindex, canonical keeps ?page=N
  otherwise                    index, clean canonical, structured data

Run 'catalog-hubs gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Inventory snapshot (JSON array of items)
    #[arg(long, default_value = "inventory.json", global = true)]
    inventory: PathBuf,

    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print facet clusters and skip counters as JSON
    Aggregate,
    /// List hub pages
    Hubs {
        /// Print the hub manifest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decide indexability for one request path, e.g. '/hubs/line/x3000/?page=2'
    Classify {
        /// Path with optional query string
        request: String,
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },
    /// List sitemap entries
    Sitemap {
        /// Print sitemap XML instead of a URL list
        #[arg(long)]
        xml: bool,
    },
    /// Facet counts, policy outcomes and duplicate groups
    Report {
        /// Clusters to show per facet type
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Smallest duplicate group to list
        #[arg(long, default_value_t = 2)]
        min_group: usize,
    },
    /// Validate config and inventory without printing pages
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Aggregate => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let items = inventory::load_json(&cli.inventory)?;
            let aggregation = aggregate::aggregate_with_stats(&items);
            println!("{}", serde_json::to_string_pretty(&aggregation)?);
        }
        Command::Hubs { json } => {
            let (_, _, snapshot) = load_snapshot(&cli.config_dir, &cli.inventory)?;
            if json {
                println!("{}", serde_json::to_string_pretty(snapshot.registry().hubs())?);
            } else {
                output::print_hubs(snapshot.registry());
            }
        }
        Command::Classify { request, json } => {
            let (config, _, snapshot) = load_snapshot(&cli.config_dir, &cli.inventory)?;
            let (path, query) = classify::split_request(&request);
            let decision = classify_request(&snapshot, path, query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            } else {
                output::print_decision(&request, query, &decision);
                let head = render::head_tags(&decision, &config.site_url()?, None)?;
                println!("{}", head.into_string());
            }
        }
        Command::Sitemap { xml } => {
            let (config, items, snapshot) = load_snapshot(&cli.config_dir, &cli.inventory)?;
            let entries = sitemap::build_sitemap(&snapshot, &items, &config.site_url()?)?;
            if xml {
                print!("{}", render::sitemap_xml(&entries));
            } else {
                output::print_sitemap(&entries);
            }
        }
        Command::Report { top, min_group } => {
            let (_, items, snapshot) = load_snapshot(&cli.config_dir, &cli.inventory)?;
            let duplicates = aggregate::duplicate_groups(&items, min_group);
            output::print_report(&snapshot, &duplicates, top);
        }
        Command::Check => {
            println!("==> Checking {}", cli.config_dir.join("config.toml").display());
            let config = config::load_config(&cli.config_dir)?;
            println!("==> Checking {}", cli.inventory.display());
            init_thread_pool(&config.processing);
            let items = inventory::load_json(&cli.inventory)?;
            let built_at = exported_at(&cli.inventory);
            let handle = SnapshotHandle::new(
                Snapshot::build(&items, &config, built_at),
                config.registry.refresh_interval(),
            );
            let (snapshot, stale) = handle.current_checked(Utc::now());
            output::print_check(&snapshot, stale.as_ref());
            println!("==> Inventory is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config and inventory and build a snapshot from them.
fn load_snapshot(
    config_dir: &Path,
    inventory_path: &Path,
) -> Result<(config::SiteConfig, Vec<InventoryItem>, Snapshot), Box<dyn std::error::Error>> {
    let config = config::load_config(config_dir)?;
    init_thread_pool(&config.processing);
    let items = inventory::load_json(inventory_path)?;
    let snapshot = Snapshot::build(&items, &config, Utc::now());
    Ok((config, items, snapshot))
}

/// When the inventory file was written; falls back to now.
fn exported_at(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = processing.worker_threads();
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
