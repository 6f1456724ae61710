// =============================================================================
// Application Identity
// =============================================================================

/// Application name (for display, paths and identifiers)
pub const APP_NAME: &str = "facetq";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".facetq";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "facetq.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "FACETQ_CONFIG";

// =============================================================================
// Environment Variables - Debug & Logging
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "FACETQ_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "FACETQ_LOG";

/// Default log filter when neither FACETQ_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,facetq=info";

/// Log filter used in debug mode
pub const DEBUG_LOG_FILTER: &str = "info,facetq=debug";

// =============================================================================
// Environment Variables - Filters
// =============================================================================

/// Environment variable for the target backend (`mongodb` | `relational`)
pub const ENV_BACKEND: &str = "FACETQ_BACKEND";

/// Environment variable for the SQL dialect (`postgres` | `sqlite`)
pub const ENV_DIALECT: &str = "FACETQ_DIALECT";

/// Environment variable enabling every strict-mode check
pub const ENV_STRICT: &str = "FACETQ_STRICT";

// =============================================================================
// Environment Variables - Facets
// =============================================================================

/// Environment variable for the stats call concurrency limit
pub const ENV_FACETS_MAX_CONCURRENCY: &str = "FACETQ_FACETS_MAX_CONCURRENCY";

/// Environment variable for the per-call stats timeout in milliseconds
pub const ENV_FACETS_TIMEOUT_MS: &str = "FACETQ_FACETS_TIMEOUT_MS";

// =============================================================================
// Facet Defaults
// =============================================================================

/// Default maximum number of concurrent stats provider calls
pub const DEFAULT_FACETS_MAX_CONCURRENCY: usize = 8;

/// Default per-call stats timeout (5 seconds)
pub const DEFAULT_STATS_TIMEOUT_MS: u64 = 5_000;
