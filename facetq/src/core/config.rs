use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::facets::{FacetConfig, FailurePolicy};
use crate::filters::{Backend, Strictness};
use crate::sql::Dialect;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_FACETS_MAX_CONCURRENCY, DEFAULT_STATS_TIMEOUT_MS,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Relational output section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RelationalFileConfig {
    pub dialect: Option<Dialect>,
}

/// Strict-mode section; every flag defaults to off
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StrictFileConfig {
    pub reject_unknown_operators: Option<bool>,
    pub reject_uncoercible_values: Option<bool>,
    pub reject_malformed_keys: Option<bool>,
    pub restrict_to_descriptors: Option<bool>,
}

/// Facet engine section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FacetsFileConfig {
    pub max_concurrency: Option<usize>,
    pub stats_timeout_ms: Option<u64>,
    pub failure_policy: Option<FailurePolicy>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub backend: Option<Backend>,
    pub relational: Option<RelationalFileConfig>,
    pub strict: Option<StrictFileConfig>,
    pub facets: Option<FacetsFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if other.backend.is_some() {
            tracing::trace!(backend = ?other.backend, "Merging backend");
            self.backend = other.backend;
        }

        // Relational
        if let Some(relational) = other.relational {
            let current = self
                .relational
                .get_or_insert_with(RelationalFileConfig::default);
            if relational.dialect.is_some() {
                tracing::trace!(dialect = ?relational.dialect, "Merging relational.dialect");
                current.dialect = relational.dialect;
            }
        }

        // Strict
        if let Some(strict) = other.strict {
            let current = self.strict.get_or_insert_with(StrictFileConfig::default);
            if strict.reject_unknown_operators.is_some() {
                current.reject_unknown_operators = strict.reject_unknown_operators;
            }
            if strict.reject_uncoercible_values.is_some() {
                current.reject_uncoercible_values = strict.reject_uncoercible_values;
            }
            if strict.reject_malformed_keys.is_some() {
                current.reject_malformed_keys = strict.reject_malformed_keys;
            }
            if strict.restrict_to_descriptors.is_some() {
                current.restrict_to_descriptors = strict.restrict_to_descriptors;
            }
        }

        // Facets
        if let Some(facets) = other.facets {
            let current = self.facets.get_or_insert_with(FacetsFileConfig::default);
            if facets.max_concurrency.is_some() {
                tracing::trace!(
                    max_concurrency = ?facets.max_concurrency,
                    "Merging facets.max_concurrency"
                );
                current.max_concurrency = facets.max_concurrency;
            }
            if facets.stats_timeout_ms.is_some() {
                tracing::trace!(
                    stats_timeout_ms = ?facets.stats_timeout_ms,
                    "Merging facets.stats_timeout_ms"
                );
                current.stats_timeout_ms = facets.stats_timeout_ms;
            }
            if facets.failure_policy.is_some() {
                current.failure_policy = facets.failure_policy;
            }
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Resolved Config Structs
// =============================================================================

/// Everything that shapes compilation and facet computation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub backend: Backend,
    pub dialect: Dialect,
    pub strict: Strictness,
    pub facets: FacetConfig,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub filter: FilterConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.facetq/facetq.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.facetq/facetq.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Ok(Self::resolve(cli, file_config))
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_relational = file_config.relational.unwrap_or_default();
        let file_strict = file_config.strict.unwrap_or_default();
        let file_facets = file_config.facets.unwrap_or_default();

        let backend = cli.backend.or(file_config.backend).unwrap_or_default();
        let dialect = cli.dialect.or(file_relational.dialect).unwrap_or_default();

        // --strict turns on every check; otherwise each flag comes from the file
        let strict = if cli.strict {
            Strictness::strict()
        } else {
            Strictness {
                reject_unknown_operators: file_strict.reject_unknown_operators.unwrap_or(false),
                reject_uncoercible_values: file_strict.reject_uncoercible_values.unwrap_or(false),
                reject_malformed_keys: file_strict.reject_malformed_keys.unwrap_or(false),
                restrict_to_descriptors: file_strict.restrict_to_descriptors.unwrap_or(false),
            }
        };

        let facets = FacetConfig {
            max_concurrency: cli
                .facets_max_concurrency
                .or(file_facets.max_concurrency)
                .unwrap_or(DEFAULT_FACETS_MAX_CONCURRENCY),
            stats_timeout_ms: cli
                .facets_timeout_ms
                .or(file_facets.stats_timeout_ms)
                .unwrap_or(DEFAULT_STATS_TIMEOUT_MS),
            failure_policy: cli
                .facets_policy
                .or(file_facets.failure_policy)
                .unwrap_or_default(),
        };

        // debug: CLI/env flag takes precedence, then file config, default false
        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let filter = FilterConfig {
            backend,
            dialect,
            strict,
            facets,
        };
        tracing::debug!(
            backend = %filter.backend,
            dialect = %filter.dialect,
            strict = ?filter.strict,
            max_concurrency = filter.facets.max_concurrency,
            stats_timeout_ms = filter.facets.stats_timeout_ms,
            "Configuration resolved"
        );

        Self { filter, debug }
    }
}

/// Get the profile config path (~/.facetq/facetq.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_file_config_parse_full() {
        let config = parse(
            r#"{
                "backend": "relational",
                "relational": { "dialect": "sqlite" },
                "strict": { "reject_unknown_operators": true },
                "facets": {
                    "max_concurrency": 2,
                    "stats_timeout_ms": 750,
                    "failure_policy": "omit_unavailable"
                },
                "debug": true
            }"#,
        );

        assert_eq!(config.backend, Some(Backend::Relational));
        assert_eq!(config.relational.unwrap().dialect, Some(Dialect::Sqlite));
        assert_eq!(config.strict.unwrap().reject_unknown_operators, Some(true));
        let facets = config.facets.unwrap();
        assert_eq!(facets.max_concurrency, Some(2));
        assert_eq!(facets.stats_timeout_ms, Some(750));
        assert_eq!(facets.failure_policy, Some(FailurePolicy::OmitUnavailable));
        assert_eq!(config.debug, Some(true));
    }

    #[test]
    fn test_file_config_unknown_fields_captured() {
        let config = parse(r#"{ "backend": "mongodb", "bakend": "sql" }"#);
        assert_eq!(config.backend, Some(Backend::Mongodb));
        assert!(config.extra.get("bakend").is_some());
    }

    #[test]
    fn test_file_config_merge_precedence() {
        let mut base = parse(
            r#"{ "backend": "relational", "facets": { "max_concurrency": 4, "stats_timeout_ms": 100 } }"#,
        );
        base.merge(parse(r#"{ "facets": { "stats_timeout_ms": 900 } }"#));

        assert_eq!(base.backend, Some(Backend::Relational));
        let facets = base.facets.unwrap();
        assert_eq!(facets.max_concurrency, Some(4));
        assert_eq!(facets.stats_timeout_ms, Some(900));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default());
        assert_eq!(config.filter, FilterConfig::default());
        assert_eq!(config.filter.facets.max_concurrency, DEFAULT_FACETS_MAX_CONCURRENCY);
        assert_eq!(config.filter.facets.stats_timeout_ms, DEFAULT_STATS_TIMEOUT_MS);
        assert_eq!(config.filter.strict, Strictness::default());
        assert!(!config.debug);
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file = parse(
            r#"{ "backend": "relational", "relational": { "dialect": "sqlite" }, "facets": { "max_concurrency": 3 } }"#,
        );
        let cli = CliConfig {
            backend: Some(Backend::Mongodb),
            facets_max_concurrency: Some(16),
            strict: true,
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, file);
        assert_eq!(config.filter.backend, Backend::Mongodb);
        assert_eq!(config.filter.dialect, Dialect::Sqlite);
        assert_eq!(config.filter.facets.max_concurrency, 16);
        assert_eq!(config.filter.strict, Strictness::strict());
    }

    #[test]
    fn test_load_from_cli_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "backend": "relational", "strict": {{ "restrict_to_descriptors": true }} }}"#
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.filter.backend, Backend::Relational);
        assert!(config.filter.strict.restrict_to_descriptors);
        assert!(!config.filter.strict.reject_unknown_operators);
    }

    #[test]
    fn test_load_missing_cli_path() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/facetq.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
