use clap::{Parser, Subcommand};
use log::info;
use reparto::config::{ClusterConfig, LoggingConfig};
use reparto::{Cluster, KeyValue};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reparto")]
#[command(about = "Deterministic shard, table, and replica routing for partitioned SQL clusters")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an example topology configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a configuration file and print the expanded topology
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Dry-run the routing math for one sharding key
    Route {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Integer sharding key value
        #[arg(short, long)]
        key: i64,
        /// Logical table name to resolve
        #[arg(short, long, default_value = "records")]
        table: String,
    },
    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { output } => generate_config(output)?,
        Commands::Validate { config } => validate_config(config)?,
        Commands::Route { config, key, table } => route(config, key, table)?,
        Commands::Version => show_version(),
    }

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Generating configuration file: {:?}", output);

    ClusterConfig::create_example_config(&output)
        .map_err(|e| format!("Failed to generate config: {}", e))?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your topology and run:");
    println!("  reparto validate --config {:?}", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration file: {:?}", config_path);

    let config = load(&config_path)?;
    let cluster = Cluster::from_config(&config)
        .map_err(|e| format!("Failed to expand topology: {}", e))?;

    println!("✓ Configuration file is valid");
    println!("  Databases: {}", cluster.db_count());
    println!("  Tables per database: {}", cluster.table_count());
    cluster.for_each_shard(|shard| {
        println!(
            "  shard {}: master {} ({} slaves)",
            shard.master().db_index(),
            shard.master().source().target(),
            shard.slaves().len()
        );
    });

    Ok(())
}

fn route(config_path: PathBuf, key: i64, table: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&config_path)?;
    let cluster = Cluster::from_config(&config)
        .map_err(|e| format!("Failed to expand topology: {}", e))?;

    info!("routing key {} over {} databases", key, cluster.db_count());

    let values = if cluster.db_count() > 1 || cluster.table_count() > 1 {
        vec![KeyValue::Int(key)]
    } else {
        Vec::new()
    };
    let bound = cluster
        .route(values)
        .map_err(|e| format!("Routing failed: {}", e))?;

    let master = bound.master();
    println!("key {}:", key);
    println!("  shard index: {}", master.db_index());
    println!("  master: {}", master.source().target());
    println!("  replicas: {}", bound.slaves().len());
    println!("  physical table: {}", bound.table_name(&table)?);

    Ok(())
}

fn load(config_path: &std::path::Path) -> Result<ClusterConfig, Box<dyn std::error::Error>> {
    let config = ClusterConfig::load_from_file(config_path)
        .map_err(|e| format!("Failed to load config from {:?}: {}", config_path, e))?;
    init_logging(&config.logging);
    Ok(config)
}

fn show_version() {
    println!("reparto v{}", env!("CARGO_PKG_VERSION"));
    println!("Deterministic shard, table, and replica routing for partitioned SQL clusters");
    println!();
    println!("Features:");
    println!("  • Modulo database selection with pluggable selector strategies");
    println!("  • Cluster-unique zero-padded table suffixes");
    println!("  • Master/slave read-write splitting with round-robin or random balancing");
    println!("  • Declarative TOML topology expansion");
}

fn init_logging(config: &LoggingConfig) {
    let log_level = match config.level.as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    let _ = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .try_init();
}
