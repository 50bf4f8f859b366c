//! Morph command-line driver.
//!
//! Runs one cycle over a JSON schema description: generate, compile, load,
//! instantiate, report, unload.
//!
//! ```bash
//! morph schema.json --data rows.json --connection memory://crm
//! morph schema.json --query Customer -v
//! ```

mod config;
mod data;
mod error;

use clap::Parser;
use config::CliConfig;
use error::CliError;
use morph::prelude::*;
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Runtime-regenerated typed accessor layers
#[derive(Debug, Parser)]
#[command(name = "morph", version, about = "Run one Morph cycle over a schema description")]
struct Args {
    /// Schema description (JSON)
    #[arg(value_name = "SCHEMA")]
    schema: PathBuf,

    /// Configuration file (defaults to ./morph.toml when present)
    #[arg(short = 'c', long, value_name = "FILE", env = "MORPH_CONFIG")]
    config: Option<PathBuf>,

    /// Seed rows for the in-memory store (JSON)
    #[arg(short = 'd', long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Root namespace of the generated code
    #[arg(long, env = "MORPH_NAMESPACE")]
    namespace: Option<String>,

    /// Accessor type name
    #[arg(long)]
    accessor: Option<String>,

    /// Connection string baked into the accessor
    #[arg(long, env = "MORPH_CONNECTION", hide_env_values = true)]
    connection: Option<String>,

    /// Generate deferred relationship proxies
    #[arg(long)]
    lazy: bool,

    /// Load into a resident context
    #[arg(long)]
    resident: bool,

    /// Abandon compilation after this many milliseconds
    #[arg(long, value_name = "MS")]
    compile_timeout_ms: Option<u64>,

    /// Print the rows of one entity
    #[arg(short = 'q', long, value_name = "ENTITY")]
    query: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("MORPH_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("morph=debug,morph_core=debug,morph_compile=debug,morph_cli=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::load(args.config.as_deref())?;

    let generation = &mut config.generation;
    if let Some(namespace) = &args.namespace {
        generation.root_namespace.clone_from(namespace);
    }
    if let Some(accessor) = &args.accessor {
        generation.accessor_name.clone_from(accessor);
    }
    if let Some(connection) = &args.connection {
        generation.connection.clone_from(connection);
    }
    if args.lazy {
        generation.lazy_materialization = true;
    }

    if args.resident {
        config.runtime.resident = true;
    }
    if args.compile_timeout_ms.is_some() {
        config.runtime.compile_timeout_ms = args.compile_timeout_ms;
    }

    Ok(config)
}

fn read_schema(path: &Path) -> Result<SchemaDescriptor, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = load_config(args)?;
    debug!(?config, "configuration");

    let schema = read_schema(&args.schema)?;

    let connector = MemoryConnector::new();
    if let Some(path) = &args.data {
        let store = data::load_store(path)?;
        connector.register(config.generation.connection.clone(), Arc::new(store));
    }

    let kind = if config.runtime.resident {
        ContextKind::Resident
    } else {
        ContextKind::Reclaimable
    };
    let mut manager = LifecycleManager::new(Host::new(Arc::new(connector)))
        .with_context_kind(kind)
        .with_cache_capacity(config.runtime.cache_capacity);
    if let Some(ms) = config.runtime.compile_timeout_ms {
        manager = manager.with_compile_timeout(Duration::from_millis(ms));
    }

    let cycle = manager.start_cycle(&schema, &config.generation)?;
    info!(cycle = cycle.number(), "cycle ready");

    report(&cycle, args.query.as_deref())?;

    if kind.is_reclaimable() {
        manager.end_cycle(&cycle)?;
    }

    Ok(())
}

fn report(cycle: &Cycle, query: Option<&str>) -> Result<(), CliError> {
    let facade = cycle.facade();

    for entity in facade.list_entity_types()? {
        let count = facade.count(entity.name())?;
        println!("{:<24} {count}", entity.name());
    }

    if let Some(name) = query {
        println!();
        for row in facade.query_by_name(name)? {
            let row = row?;
            let fields: Vec<String> = row
                .fields()
                .iter()
                .map(|(column, value)| format!("{column}={value}"))
                .collect();
            println!("{name} {{ {} }}", fields.join(", "));
        }
    }

    Ok(())
}
