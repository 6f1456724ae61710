//! Core application

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{DEBUG_LOG_FILTER, DEFAULT_LOG_FILTER, ENV_LOG};
use crate::facets::MemoryStatsProvider;
use crate::filters::{CompiledQuery, FieldDescriptors, FilterRequest};
use crate::service::FilterService;
use crate::utils::file::{read_input, read_json_input};

pub struct CoreApp {
    pub config: AppConfig,
    pub service: FilterService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.debug);

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;
        let app = Self::new(config);

        match command {
            Commands::Compile {
                request,
                descriptors,
            } => app.compile(&request, descriptors.as_deref()),
            Commands::Facets {
                descriptors, data, ..
            } => app.facets(&descriptors, &data).await,
        }
    }

    pub fn new(config: AppConfig) -> Self {
        let service = FilterService::new(config.filter.clone());
        Self { config, service }
    }

    /// Initialize the logging system
    ///
    /// FACETQ_LOG wins over RUST_LOG; `--debug` only changes the default.
    fn init_logging(debug: bool) {
        let default_filter = if debug {
            DEBUG_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        };

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| default_filter.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Compile a filter request file and print the query as JSON
    fn compile(self, request_path: &Path, descriptors_path: Option<&Path>) -> Result<()> {
        let raw = read_input(request_path)?;
        let request = FilterRequest::from_json_str(&raw)
            .with_context(|| format!("Invalid filter request: {}", request_path.display()))?;

        let service = match descriptors_path {
            Some(path) => self
                .service
                .with_descriptors(Arc::new(load_descriptors(path)?)),
            None => self.service,
        };

        let query = Self::build_query(&service, &request)?;
        let output = Self::render_query(&service, &query)?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn build_query(service: &FilterService, request: &FilterRequest) -> Result<CompiledQuery> {
        let query = service.build_query(request).map_err(|err| {
            if err.is_client_error() {
                anyhow::Error::new(err).context("Filter request rejected")
            } else {
                anyhow::Error::new(err).context("Filter compilation is misconfigured")
            }
        })?;
        tracing::debug!(
            backend = %query.backend(),
            strict = ?service.compiler().strictness(),
            empty = query.is_empty(),
            "Filter query ready"
        );
        Ok(query)
    }

    fn render_query(service: &FilterService, query: &CompiledQuery) -> Result<Value> {
        let output = match query {
            CompiledQuery::Mongo(mongo) => mongo.to_document(),
            CompiledQuery::Relational(clause) => serde_json::to_value(service.render_sql(clause))
                .context("Failed to serialize SQL output")?,
        };
        Ok(output)
    }

    /// Compute facets over a documents file and print the facet response
    async fn facets(self, descriptors_path: &Path, data_path: &Path) -> Result<()> {
        let descriptors = load_descriptors(descriptors_path)?;
        let documents: Vec<Value> = read_json_input(data_path)?;
        let provider = MemoryStatsProvider::new(documents);
        let facets = &self.service.config().facets;
        tracing::debug!(
            fields = descriptors.len(),
            documents = provider.len(),
            max_concurrency = facets.max_concurrency,
            timeout_ms = facets.stats_timeout_ms,
            "Computing facets"
        );

        // Ctrl+C cancels outstanding stats calls
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Received Ctrl+C, cancelling facet computation");
                trigger.cancel();
            }
        });

        let result = self
            .service
            .get_filters_with_cancel(&descriptors, &provider, cancel)
            .await;
        signal.abort();

        let response = result?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }
}

fn load_descriptors(path: &Path) -> Result<FieldDescriptors> {
    let raw: Value = read_json_input(path)?;
    FieldDescriptors::from_json(raw)
        .with_context(|| format!("Invalid field descriptors: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FilterConfig;
    use crate::filters::{Backend, FilterError, Strictness};
    use serde_json::json;
    use std::io::Write;

    fn app(backend: Backend) -> CoreApp {
        CoreApp::new(AppConfig {
            filter: FilterConfig {
                backend,
                ..Default::default()
            },
            debug: false,
        })
    }

    #[test]
    fn test_render_mongo_query() {
        let app = app(Backend::Mongodb);
        let request = FilterRequest::new().with("status", "ACTIVE");
        let query = app.service.build_query(&request).unwrap();

        assert_eq!(
            CoreApp::render_query(&app.service, &query).unwrap(),
            json!({"status": "ACTIVE"})
        );
    }

    #[test]
    fn test_render_relational_query() {
        let app = app(Backend::Relational);
        let request = FilterRequest::new().with("age__in", vec![30i64, 40]);
        let query = app.service.build_query(&request).unwrap();

        assert_eq!(
            CoreApp::render_query(&app.service, &query).unwrap(),
            json!({"sql": "\"age\" IN ($1, $2)", "params": [30, 40]})
        );
    }

    #[test]
    fn test_build_query_rejects_client_error() {
        let app = CoreApp::new(AppConfig {
            filter: FilterConfig {
                strict: Strictness::strict(),
                ..Default::default()
            },
            debug: false,
        });
        let request = FilterRequest::from_json_str(r#"{"price__between": [1, 2]}"#).unwrap();

        let err = CoreApp::build_query(&app.service, &request).unwrap_err();
        assert_eq!(err.to_string(), "Filter request rejected");
        assert!(err.downcast_ref::<FilterError>().unwrap().is_client_error());
    }

    #[test]
    fn test_load_descriptors_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "status", "operations": ["exact"], "enum": {{"ACTIVE": 1}}}}, {{"name": "title"}}]"#
        )
        .unwrap();

        let descriptors = load_descriptors(file.path()).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors.get("title").is_some());
    }

    #[test]
    fn test_load_descriptors_duplicate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "a"}}, {{"name": "a"}}]"#).unwrap();

        let err = load_descriptors(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid field descriptors"));
    }
}
