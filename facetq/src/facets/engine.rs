//! Facet engine
//!
//! Builds the filterable surface of an entity from its descriptors: searchable
//! fields, enum options and range bounds. Range bounds come from the stats
//! provider, one call per range field, issued with bounded concurrency.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error::{FacetError, StatsError};
use super::stats::{RangeStats, StatsContext, StatsProvider};
use super::types::{EnumOption, FacetResult};
use crate::core::constants::{DEFAULT_FACETS_MAX_CONCURRENCY, DEFAULT_STATS_TIMEOUT_MS};
use crate::filters::{FieldDescriptor, FieldDescriptors, Operator};
use crate::utils::string::format_enum_label;

/// What to do when a range stats call fails or times out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole computation and cancel outstanding calls
    #[default]
    FailFast,
    /// Drop the field from `range_facets` and record it as unavailable
    OmitUnavailable,
}

/// Facet engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetConfig {
    pub max_concurrency: usize,
    pub stats_timeout_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_FACETS_MAX_CONCURRENCY,
            stats_timeout_ms: DEFAULT_STATS_TIMEOUT_MS,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Computes [`FacetResult`]s against a [`StatsProvider`]
#[derive(Debug, Clone)]
pub struct FacetEngine {
    max_concurrency: usize,
    stats_timeout: Duration,
    failure_policy: FailurePolicy,
}

impl Default for FacetEngine {
    fn default() -> Self {
        Self::new(&FacetConfig::default())
    }
}

impl FacetEngine {
    pub fn new(config: &FacetConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            stats_timeout: Duration::from_millis(config.stats_timeout_ms),
            failure_policy: config.failure_policy,
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Compute facets for `descriptors`
    pub async fn compute(
        &self,
        descriptors: &FieldDescriptors,
        provider: &dyn StatsProvider,
    ) -> Result<FacetResult, FacetError> {
        self.compute_with_cancel(descriptors, provider, CancellationToken::new())
            .await
    }

    /// Compute facets, aborting with [`FacetError::Cancelled`] once `cancel`
    /// fires. Cancellation fails regardless of the failure policy.
    pub async fn compute_with_cancel(
        &self,
        descriptors: &FieldDescriptors,
        provider: &dyn StatsProvider,
        cancel: CancellationToken,
    ) -> Result<FacetResult, FacetError> {
        let mut result = FacetResult::default();
        for descriptor in descriptors.iter() {
            describe_field(&mut result, descriptor);
        }

        let range_fields: Vec<&str> = descriptors
            .iter()
            .filter(|d| d.has_range())
            .map(|d| d.name.as_str())
            .collect();

        if range_fields.is_empty() {
            return Ok(result);
        }

        tracing::debug!(
            provider = provider.provider_name(),
            fields = range_fields.len(),
            max_concurrency = self.max_concurrency,
            "Fetching range stats"
        );

        // Child token: failing fast cancels our calls without touching the caller's token
        let calls = cancel.child_token();
        let mut ranges: HashMap<&str, RangeStats> = HashMap::new();
        let mut unavailable: HashMap<&str, String> = HashMap::new();

        let mut outcomes = futures::stream::iter(range_fields.iter().map(|&field| {
            let ctx = StatsContext::new(self.stats_timeout, calls.clone());
            async move {
                let outcome = self.fetch_range(field, provider, &ctx).await;
                (field, outcome)
            }
        }))
        .buffer_unordered(self.max_concurrency);

        while let Some((field, outcome)) = outcomes.next().await {
            match outcome {
                Ok(Some(range)) => {
                    ranges.insert(field, range);
                }
                Ok(None) => {
                    tracing::debug!(field, "No range data, omitting facet");
                }
                Err(FacetError::Cancelled) => {
                    calls.cancel();
                    return Err(FacetError::Cancelled);
                }
                Err(err) => match self.failure_policy {
                    FailurePolicy::FailFast => {
                        calls.cancel();
                        tracing::warn!(
                            field,
                            error = %err,
                            "Range stats failed, aborting facet computation"
                        );
                        return Err(err);
                    }
                    FailurePolicy::OmitUnavailable => {
                        tracing::warn!(
                            field,
                            error = %err,
                            "Range stats unavailable, omitting facet"
                        );
                        unavailable.insert(field, err.to_string());
                    }
                },
            }
        }

        for &field in &range_fields {
            if let Some(range) = ranges.remove(field) {
                result.range_facets.insert(field.to_string(), range);
            }
            if let Some(reason) = unavailable.remove(field) {
                result.unavailable.insert(field.to_string(), reason);
            }
        }

        Ok(result)
    }

    /// One provider call raced against the deadline and the cancel token
    async fn fetch_range(
        &self,
        field: &str,
        provider: &dyn StatsProvider,
        ctx: &StatsContext,
    ) -> Result<Option<RangeStats>, FacetError> {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(FacetError::Cancelled),
            outcome = tokio::time::timeout_at(ctx.deadline, provider.get_range(field, ctx)) => {
                match outcome {
                    Ok(Ok(range)) => Ok(range),
                    Ok(Err(StatsError::Cancelled)) => Err(FacetError::Cancelled),
                    Ok(Err(StatsError::DeadlineExceeded)) | Err(_) => Err(FacetError::timeout(
                        field,
                        self.stats_timeout.as_millis() as u64,
                    )),
                    Ok(Err(err)) => Err(FacetError::stats_unavailable(field, err)),
                }
            }
        }
    }
}

/// Synchronous part of a field's facets: operators, search and enum options
fn describe_field(result: &mut FacetResult, descriptor: &FieldDescriptor) {
    result
        .fields
        .insert(descriptor.name.clone(), descriptor.operations.clone());

    if descriptor.allows(&Operator::IContains) {
        result.searchable_fields.push(descriptor.name.clone());
    }

    if let Some(values) = &descriptor.enum_values {
        let options = values
            .iter()
            .map(|(key, value)| EnumOption {
                value: value.clone(),
                label: format_enum_label(key),
            })
            .collect();
        result.enum_facets.insert(descriptor.name.clone(), options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::MemoryStatsProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider with per-field delays and failures, tracking peak concurrency
    #[derive(Default)]
    struct ScriptedProvider {
        delays: HashMap<String, Duration>,
        failing: Vec<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn delay(mut self, field: &str, ms: u64) -> Self {
            self.delays.insert(field.to_string(), Duration::from_millis(ms));
            self
        }

        fn fail(mut self, field: &str) -> Self {
            self.failing.push(field.to_string());
            self
        }
    }

    #[async_trait]
    impl StatsProvider for ScriptedProvider {
        async fn get_range(
            &self,
            field: &str,
            _ctx: &StatsContext,
        ) -> Result<Option<RangeStats>, StatsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(field) {
                tokio::time::sleep(*delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.iter().any(|f| f == field) {
                return Err(StatsError::backend("connection reset"));
            }
            Ok(Some(RangeStats::new(0, field.len() as i64)))
        }
    }

    fn range_descriptors(names: &[&str]) -> FieldDescriptors {
        FieldDescriptors::new(names.iter().map(|name| {
            FieldDescriptor::new(*name).with_operations([Operator::Gte, Operator::Lte])
        }))
        .unwrap()
    }

    fn engine(max_concurrency: usize, timeout_ms: u64, policy: FailurePolicy) -> FacetEngine {
        FacetEngine::new(&FacetConfig {
            max_concurrency,
            stats_timeout_ms: timeout_ms,
            failure_policy: policy,
        })
    }

    #[tokio::test]
    async fn test_compute_full_result() {
        let descriptors = FieldDescriptors::new([
            FieldDescriptor::new("name"),
            FieldDescriptor::new("status")
                .with_operations([Operator::Exact, Operator::In])
                .with_enum([("ACTIVE", "active"), ("INACTIVE", "inactive")]),
            FieldDescriptor::new("price").with_operations([Operator::Gte, Operator::Lte]),
            FieldDescriptor::new("deletedAt").with_operations([Operator::Lte]),
        ])
        .unwrap();
        let provider = MemoryStatsProvider::new(vec![
            json!({"name": "a", "price": 10, "deletedAt": null}),
            json!({"name": "b", "price": 3}),
        ]);

        let result = FacetEngine::default()
            .compute(&descriptors, &provider)
            .await
            .unwrap();

        assert_eq!(result.searchable_fields, vec!["name"]);
        assert_eq!(
            result.enum_facets["status"],
            vec![
                EnumOption { value: json!("active"), label: "Active".into() },
                EnumOption { value: json!("inactive"), label: "Inactive".into() },
            ]
        );
        assert_eq!(result.range_facets["price"], RangeStats::new(3, 10));
        assert!(!result.range_facets.contains_key("deletedAt"));
        assert!(result.unavailable.is_empty());
        assert_eq!(result.fields.len(), 4);
        assert_eq!(result.fields["deletedAt"], vec![Operator::Lte]);
    }

    #[tokio::test]
    async fn test_no_range_fields_skip_provider() {
        let descriptors = FieldDescriptors::new([FieldDescriptor::new("name")]).unwrap();
        let provider = ScriptedProvider::default();

        let result = FacetEngine::default()
            .compute(&descriptors, &provider)
            .await
            .unwrap();

        assert!(result.range_facets.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_and_descriptor_order() {
        let names = ["a", "bb", "ccc", "dddd", "eeeee", "ffffff"];
        let provider = ScriptedProvider::default()
            .delay("a", 60)
            .delay("bb", 10)
            .delay("ccc", 30)
            .delay("dddd", 10)
            .delay("eeeee", 20)
            .delay("ffffff", 10);

        let result = engine(2, 5_000, FailurePolicy::FailFast)
            .compute(&range_descriptors(&names), &provider)
            .await
            .unwrap();

        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), names.len());
        let keys: Vec<&str> = result.range_facets.keys().map(String::as_str).collect();
        assert_eq!(keys, names);
    }

    #[tokio::test]
    async fn test_provider_error_fails_fast() {
        let provider = ScriptedProvider::default().fail("price");

        let err = engine(4, 5_000, FailurePolicy::FailFast)
            .compute(&range_descriptors(&["price", "qty"]), &provider)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FacetError::stats_unavailable("price", StatsError::backend("connection reset"))
        );
    }

    #[tokio::test]
    async fn test_provider_error_omitted() {
        let provider = ScriptedProvider::default().fail("price");

        let result = engine(4, 5_000, FailurePolicy::OmitUnavailable)
            .compute(&range_descriptors(&["price", "qty"]), &provider)
            .await
            .unwrap();

        assert!(!result.range_facets.contains_key("price"));
        assert!(result.range_facets.contains_key("qty"));
        assert!(result.unavailable["price"].contains("connection reset"));
    }

    #[tokio::test]
    async fn test_timeout_fails_fast() {
        let provider = ScriptedProvider::default().delay("slow", 10_000);

        let err = engine(4, 50, FailurePolicy::FailFast)
            .compute(&range_descriptors(&["slow", "fast"]), &provider)
            .await
            .unwrap_err();

        assert_eq!(err, FacetError::timeout("slow", 50));
    }

    #[tokio::test]
    async fn test_provider_deadline_reported_as_timeout() {
        let provider = MemoryStatsProvider::new(vec![json!({"price": 7})]);

        let err = engine(4, 0, FailurePolicy::FailFast)
            .compute(&range_descriptors(&["price"]), &provider)
            .await
            .unwrap_err();

        assert_eq!(err, FacetError::timeout("price", 0));
    }

    #[tokio::test]
    async fn test_timeout_omitted() {
        let provider = ScriptedProvider::default().delay("slow", 10_000);

        let result = engine(4, 50, FailurePolicy::OmitUnavailable)
            .compute(&range_descriptors(&["slow", "fast"]), &provider)
            .await
            .unwrap();

        assert_eq!(result.range_facets.keys().collect::<Vec<_>>(), vec!["fast"]);
        assert_eq!(
            result.unavailable["slow"],
            "Range stats for slow timed out after 50ms"
        );
    }

    #[tokio::test]
    async fn test_cancellation_always_fails() {
        let provider = ScriptedProvider::default().delay("price", 10_000);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = engine(4, 60_000, FailurePolicy::OmitUnavailable)
            .compute_with_cancel(&range_descriptors(&["price"]), &provider, cancel)
            .await
            .unwrap_err();

        assert_eq!(err, FacetError::Cancelled);
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        let engine = engine(0, 10, FailurePolicy::FailFast);
        assert_eq!(engine.max_concurrency, 1);
    }
}
