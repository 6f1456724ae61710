//! Filter service
//!
//! Bundles the resolved configuration with a shared registry, compiler and
//! facet engine so callers configure filtering once and reuse it per request.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::config::FilterConfig;
use crate::facets::{FacetEngine, FacetError, FacetResponse, FacetResult, StatsProvider};
use crate::filters::{
    Backend, CompiledQuery, CustomOperator, FieldDescriptors, FilterError, FilterRequest,
    OperatorRegistry, QueryCompiler, RelationalWhere, WhereClause,
};

#[derive(Debug, Clone)]
pub struct FilterService {
    config: FilterConfig,
    compiler: QueryCompiler,
    engine: FacetEngine,
}

impl FilterService {
    /// Service over the builtin operators
    pub fn new(config: FilterConfig) -> Self {
        Self::with_registry(config, Arc::new(OperatorRegistry::builtin()))
    }

    /// Service with caller operators merged over the builtins
    pub fn with_custom_operators<I, S>(config: FilterConfig, custom: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (S, CustomOperator)>,
        S: AsRef<str>,
    {
        let registry = OperatorRegistry::with_custom(custom)?;
        Ok(Self::with_registry(config, Arc::new(registry)))
    }

    pub fn with_registry(config: FilterConfig, registry: Arc<OperatorRegistry>) -> Self {
        let compiler = QueryCompiler::new(registry).with_strictness(config.strict);
        let engine = FacetEngine::new(&config.facets);
        tracing::debug!(
            backend = %config.backend,
            strict = ?config.strict,
            "Filter service initialized"
        );
        Self {
            config,
            compiler,
            engine,
        }
    }

    /// Descriptors used for compile-time authorisation when
    /// `restrict_to_descriptors` is on
    pub fn with_descriptors(mut self, descriptors: Arc<FieldDescriptors>) -> Self {
        self.compiler = self.compiler.with_descriptors(descriptors);
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Compile for the configured backend
    pub fn build_query(&self, request: &FilterRequest) -> Result<CompiledQuery, FilterError> {
        self.build_query_for(request, self.config.backend)
    }

    pub fn build_query_for(
        &self,
        request: &FilterRequest,
        backend: Backend,
    ) -> Result<CompiledQuery, FilterError> {
        self.compiler.compile(request, backend)
    }

    /// Render a relational query in the configured dialect
    pub fn render_sql(&self, clause: &RelationalWhere) -> WhereClause {
        clause.render(self.config.dialect.dialect())
    }

    pub async fn compute_facets(
        &self,
        descriptors: &FieldDescriptors,
        provider: &dyn StatsProvider,
    ) -> Result<FacetResult, FacetError> {
        self.engine.compute(descriptors, provider).await
    }

    /// Facet response (`filters`, `search`, `fields`) for UI clients
    pub async fn get_filters(
        &self,
        descriptors: &FieldDescriptors,
        provider: &dyn StatsProvider,
    ) -> Result<FacetResponse, FacetError> {
        let result = self.compute_facets(descriptors, provider).await?;
        Ok(result.to_response())
    }

    pub async fn get_filters_with_cancel(
        &self,
        descriptors: &FieldDescriptors,
        provider: &dyn StatsProvider,
        cancel: CancellationToken,
    ) -> Result<FacetResponse, FacetError> {
        let result = self
            .engine
            .compute_with_cancel(descriptors, provider, cancel)
            .await?;
        Ok(result.to_response())
    }
}
