use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    APP_NAME, ENV_BACKEND, ENV_CONFIG, ENV_DEBUG, ENV_DIALECT, ENV_FACETS_MAX_CONCURRENCY,
    ENV_FACETS_TIMEOUT_MS, ENV_STRICT,
};
use crate::facets::FailurePolicy;
use crate::filters::Backend;
use crate::sql::Dialect;

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version, about = "Filter query compiler and facet engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Target backend (mongodb or relational)
    #[arg(long, short = 'b', global = true, env = ENV_BACKEND, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// SQL dialect for relational output (postgres or sqlite)
    #[arg(long, global = true, env = ENV_DIALECT, value_parser = parse_dialect)]
    pub dialect: Option<Dialect>,

    /// Reject unknown operators, uncoercible range values, malformed keys and
    /// undeclared fields instead of dropping them
    #[arg(long, global = true, env = ENV_STRICT)]
    pub strict: bool,

    /// Maximum concurrent range stats calls
    #[arg(long, global = true, env = ENV_FACETS_MAX_CONCURRENCY)]
    pub facets_max_concurrency: Option<usize>,

    /// Per-call range stats timeout in milliseconds
    #[arg(long, global = true, env = ENV_FACETS_TIMEOUT_MS)]
    pub facets_timeout_ms: Option<u64>,
}

/// Parse backend from CLI/env string
fn parse_backend(s: &str) -> Result<Backend, String> {
    match s.to_lowercase().as_str() {
        "mongodb" | "mongo" => Ok(Backend::Mongodb),
        "relational" | "sql" | "postgres" => Ok(Backend::Relational),
        _ => Err(format!(
            "Invalid backend '{}'. Valid options: mongodb, relational",
            s
        )),
    }
}

/// Parse SQL dialect from CLI/env string
fn parse_dialect(s: &str) -> Result<Dialect, String> {
    match s.to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(Dialect::Postgres),
        "sqlite" => Ok(Dialect::Sqlite),
        _ => Err(format!(
            "Invalid dialect '{}'. Valid options: postgres, sqlite",
            s
        )),
    }
}

/// Parse facet failure policy from CLI string
fn parse_failure_policy(s: &str) -> Result<FailurePolicy, String> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "fail_fast" | "fail" => Ok(FailurePolicy::FailFast),
        "omit_unavailable" | "omit" => Ok(FailurePolicy::OmitUnavailable),
        _ => Err(format!(
            "Invalid failure policy '{}'. Valid options: fail-fast, omit-unavailable",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compile a filter request (JSON object) into a backend query
    Compile {
        /// Filter request file ("-" for stdin)
        #[arg(long, short = 'r')]
        request: PathBuf,
        /// Field descriptors used to restrict fields in strict mode
        #[arg(long, short = 'd')]
        descriptors: Option<PathBuf>,
    },
    /// Compute facet metadata over a JSON array of documents
    Facets {
        /// Field descriptors file (JSON array)
        #[arg(long, short = 'd')]
        descriptors: PathBuf,
        /// Documents file (JSON array) answering range stats
        #[arg(long)]
        data: PathBuf,
        /// Range stats failure policy (fail-fast or omit-unavailable)
        #[arg(long, value_parser = parse_failure_policy)]
        policy: Option<FailurePolicy>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub debug: bool,
    pub backend: Option<Backend>,
    pub dialect: Option<Dialect>,
    pub strict: bool,
    pub facets_max_concurrency: Option<usize>,
    pub facets_timeout_ms: Option<u64>,
    pub facets_policy: Option<FailurePolicy>,
}

pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let facets_policy = match &cli.command {
        Commands::Facets { policy, .. } => *policy,
        Commands::Compile { .. } => None,
    };
    let config = CliConfig {
        config: cli.config,
        debug: cli.debug,
        backend: cli.backend,
        dialect: cli.dialect,
        strict: cli.strict,
        facets_max_concurrency: cli.facets_max_concurrency,
        facets_timeout_ms: cli.facets_timeout_ms,
        facets_policy,
    };
    (config, cli.command)
}
