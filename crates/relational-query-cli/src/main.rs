//! relq CLI - translate logical queries and render migration history scripts.

mod scripts;

use clap::{Parser, Subcommand, ValueEnum};
use relational_query::{
    Config, LogicalQuery, Model, ProviderCatalog, QueryError, TypeMappingInfo, TypeMappingSource,
    ValueType,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "relq")]
#[command(about = "Relational query translation and migration history scripts")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider dialect, overriding the configured one (postgres, mssql, ...)
    #[arg(short, long)]
    dialect: Option<String>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a logical query file into SQL
    Translate {
        /// JSON file with a `model` and a `query`
        #[arg(short, long)]
        query: PathBuf,
    },

    /// Print a migrations history script
    HistoryScript {
        #[arg(value_enum)]
        script: HistoryScriptKind,

        /// Migration identifier for insert and delete scripts
        #[arg(long)]
        migration_id: Option<String>,

        /// Product version recorded by insert scripts
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        product_version: String,
    },

    /// Resolve the store type for a logical type and facets
    TypeMap {
        /// Logical type (string, int32, decimal, date_time, ...)
        value_type: String,

        #[arg(long)]
        max_length: Option<u32>,

        #[arg(long)]
        precision: Option<u32>,

        #[arg(long)]
        scale: Option<u32>,

        #[arg(long)]
        unicode: Option<bool>,

        #[arg(long)]
        fixed_length: Option<bool>,

        /// Resolve as a key or index column
        #[arg(long)]
        key: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HistoryScriptKind {
    Create,
    CreateIfNotExists,
    Insert,
    Delete,
}

/// Contents of a `translate --query` file.
#[derive(Deserialize)]
struct QueryFile {
    model: Model,
    query: LogicalQuery,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), QueryError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    debug!("Configuration hash: {}", config.hash());

    let provider = resolve_provider(&config, cli.dialect.as_deref())?;
    let catalog = ProviderCatalog::with_builtins();

    match cli.command {
        Commands::Translate { query } => {
            let content = std::fs::read_to_string(&query)?;
            let file: QueryFile = serde_json::from_str(&content)?;
            let session = catalog.create_session(provider, Arc::new(file.model))?;
            let command = session.compile(&file.query)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&command)?);
            } else {
                println!("{}", command);
            }
        }

        Commands::HistoryScript {
            script,
            migration_id,
            product_version,
        } => {
            let text = scripts::render(
                &catalog,
                provider,
                &config,
                script,
                migration_id.as_deref(),
                &product_version,
            )?;
            print!("{}", text);
        }

        Commands::TypeMap {
            value_type,
            max_length,
            precision,
            scale,
            unicode,
            fixed_length,
            key,
        } => {
            let value_type = parse_value_type(&value_type)?;
            let info = TypeMappingInfo::for_type(value_type.clone())
                .with_size(max_length)
                .with_precision(precision, scale)
                .with_unicode(unicode)
                .with_fixed_length(fixed_length)
                .with_key_or_index(key);

            let mapping = catalog
                .type_mapping_source(provider)?
                .find_mapping(&info)
                .ok_or_else(|| {
                    QueryError::Unsupported(format!(
                        "No {} mapping for type '{}'",
                        provider, value_type
                    ))
                })?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(mapping.as_ref())?);
            } else {
                println!("{}", mapping.store_type);
            }
        }
    }

    Ok(())
}

/// Dialect from the command line, else from the configuration.
fn resolve_provider(config: &Config, dialect: Option<&str>) -> Result<&'static str, QueryError> {
    match dialect {
        Some(name) => relational_query::drivers::canonical_provider_name(name)
            .ok_or_else(|| QueryError::Config(format!("Unknown dialect: '{}'", name))),
        None => config.provider_name(),
    }
}

fn parse_value_type(name: &str) -> Result<ValueType, QueryError> {
    serde_json::from_value(serde_json::Value::String(name.to_lowercase()))
        .map_err(|_| QueryError::Config(format!("Unknown value type: '{}'", name)))
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
