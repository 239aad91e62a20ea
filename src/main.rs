use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use citation_cluster_analyzer::config::{ClusterConfig, ClusteringMethod, CrawlConfig};
use citation_cluster_analyzer::store::{RecordStore, SqliteStore};
use citation_cluster_analyzer::{assemble, cluster, crawl, data, resolve, storage};

#[derive(Parser, Debug)]
#[clap(
    name = "citation-cluster-analyzer",
    about = "Decade-bounded citation graph crawling, clustering and assembly"
)]
struct Cli {
    /// Path to the SQLite database
    #[clap(long, global = true, env = "CITATION_DB", default_value = "citations.db")]
    db: PathBuf,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, global = true, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bulk-load works from a Parquet or JSON Lines export
    Load {
        #[clap(long)]
        input: String,
    },

    /// Discover seed works in a source database and crawl their citation neighbourhood
    Crawl {
        /// Database holding the full corpus
        #[clap(long)]
        source: PathBuf,

        /// Title/abstract search term for seed discovery
        #[clap(long, default_value = "vector space")]
        search: String,

        #[clap(long, default_value = "2")]
        hops: u32,

        /// Minimum cited-by count for seeds and discovered works
        #[clap(long = "min_citations", default_value = "20")]
        min_citations: i64,

        /// Works must be published after this year
        #[clap(long = "min_year", default_value = "1920")]
        min_year: i32,
    },

    /// Compute and store same-decade references
    Resolve,

    /// Cluster each decade's citation subgraph
    Cluster {
        #[clap(long = "output_path")]
        output_path: PathBuf,

        #[clap(long = "clustering_method", default_value = "leiden")]
        clustering_method: ClusteringMethod,

        #[clap(long = "decade_start", default_value = "1950")]
        decade_start: i32,

        #[clap(long = "decade_end", default_value = "2020")]
        decade_end: i32,

        #[clap(long = "cluster_size_cutoff", default_value = "5")]
        cluster_size_cutoff: usize,

        #[clap(long = "top_n", default_value = "10")]
        top_n: usize,

        #[clap(long, default_value = "1.0")]
        resolution: f64,

        #[clap(long, default_value = "42")]
        seed: u64,
    },

    /// Build the decade citation graph from a cluster report
    Assemble {
        #[clap(long = "input_path")]
        input_path: PathBuf,

        /// Output file; `.bin` writes bincode, `.graphml` GraphML, anything else JSON
        #[clap(long = "output_path")]
        output_path: PathBuf,

        /// Also record the edges in the database
        #[clap(long)]
        persist: bool,
    },

    /// Run an ad-hoc SQL query and print rows tab-separated
    Query { sql: String },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };

    log::debug!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let db = &args.db;
    match args.command {
        Command::Load { input } => {
            let mut store = SqliteStore::open(db)
                .with_context(|| format!("opening {}", db.display()))?;
            let written = data::load_into(&mut store, &input)
                .with_context(|| format!("loading {}", input))?;
            log::info!("{} works in {}", store.count_works()?, db.display());
            log::debug!("{} works written", written);
        }

        Command::Crawl {
            source,
            search,
            hops,
            min_citations,
            min_year,
        } => {
            let config = CrawlConfig {
                search_term: search,
                max_hops: hops,
                min_citations,
                min_year_exclusive: min_year,
            };
            config.validate()?;
            let source_store = SqliteStore::open_existing(&source)
                .with_context(|| format!("opening source {}", source.display()))?;
            let mut target = SqliteStore::open(db)
                .with_context(|| format!("opening {}", db.display()))?;
            let result = crawl::run(&source_store, &mut target, &config)?;
            log::info!(
                "Crawl finished: {} works over {} hops",
                result.works.len(),
                result.layers.len()
            );
        }

        Command::Resolve => {
            let mut store = SqliteStore::open_existing(db)
                .with_context(|| format!("opening {}", db.display()))?;
            resolve::run(&mut store)?;
        }

        Command::Cluster {
            output_path,
            clustering_method,
            decade_start,
            decade_end,
            cluster_size_cutoff,
            top_n,
            resolution,
            seed,
        } => {
            let config = ClusterConfig {
                clustering_method,
                decade_start,
                decade_end,
                cluster_size_cutoff,
                top_n,
                resolution,
                seed,
                ..ClusterConfig::default()
            };
            config.validate()?;
            let store = SqliteStore::open_existing(db)
                .with_context(|| format!("opening {}", db.display()))?;
            let report = cluster::run(&store, &config)?;
            storage::save_report(&report, &output_path)
                .with_context(|| format!("writing {}", output_path.display()))?;
        }

        Command::Assemble {
            input_path,
            output_path,
            persist,
        } => {
            if persist {
                let mut store = SqliteStore::open_existing(db)
                    .with_context(|| format!("opening {}", db.display()))?;
                assemble::run(&input_path, &output_path, Some(&mut store))?;
            } else {
                assemble::run::<SqliteStore>(&input_path, &output_path, None)?;
            }
        }

        Command::Query { sql } => {
            let store = SqliteStore::open_existing(db)
                .with_context(|| format!("opening {}", db.display()))?;
            for row in store.execute_query(&sql)? {
                println!("{}", row.join("\t"));
            }
        }
    }

    Ok(())
}
