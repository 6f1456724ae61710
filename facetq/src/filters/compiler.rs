//! Query compiler
//!
//! Turns a [`FilterRequest`] into a backend-tagged [`CompiledQuery`] by
//! dispatching each entry to the registered builder. Compilation is pure and
//! synchronous; a compiler is `Send + Sync` and can be shared behind an `Arc`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::coerce::coerce_comparable;
use super::descriptor::FieldDescriptors;
use super::error::FilterError;
use super::mongo::{MongoQuery, to_bson_json};
use super::registry::OperatorRegistry;
use super::relational::{Condition, RelationalWhere, SqlValue};
use super::request::{FilterEntry, FilterKey, FilterRequest};
use super::types::{Backend, FilterValue, Operator};

/// Opt-in rejection of input the permissive mode silently drops.
///
/// All flags are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strictness {
    /// Operator suffix with no builder for the backend -> `UnknownOperator`
    pub reject_unknown_operators: bool,
    /// `gte`/`lte` value that is neither a date nor a number -> `ValueCoercion`
    pub reject_uncoercible_values: bool,
    /// Key with an empty field or invalid operator suffix -> `MalformedKey`
    pub reject_malformed_keys: bool,
    /// Field/operator pair not declared by the descriptors -> `Unauthorized`
    pub restrict_to_descriptors: bool,
}

impl Strictness {
    /// Every flag on
    pub fn strict() -> Self {
        Self {
            reject_unknown_operators: true,
            reject_uncoercible_values: true,
            reject_malformed_keys: true,
            restrict_to_descriptors: true,
        }
    }
}

/// Backend-tagged compiled query, consumed by the database client
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    Mongo(MongoQuery),
    Relational(RelationalWhere),
}

impl CompiledQuery {
    pub fn backend(&self) -> Backend {
        match self {
            CompiledQuery::Mongo(_) => Backend::Mongodb,
            CompiledQuery::Relational(_) => Backend::Relational,
        }
    }

    /// Identity query: matches every row or document
    pub fn is_empty(&self) -> bool {
        match self {
            CompiledQuery::Mongo(query) => query.is_empty(),
            CompiledQuery::Relational(clause) => clause.is_empty(),
        }
    }

    pub fn as_mongo(&self) -> Option<&MongoQuery> {
        match self {
            CompiledQuery::Mongo(query) => Some(query),
            CompiledQuery::Relational(_) => None,
        }
    }

    pub fn as_relational(&self) -> Option<&RelationalWhere> {
        match self {
            CompiledQuery::Relational(clause) => Some(clause),
            CompiledQuery::Mongo(_) => None,
        }
    }
}

/// Accumulates builder output for one backend
enum Sink {
    Mongo(MongoQuery),
    Relational(RelationalWhere),
}

impl Sink {
    fn new(backend: Backend) -> Self {
        match backend {
            Backend::Mongodb => Sink::Mongo(MongoQuery::default()),
            Backend::Relational => Sink::Relational(RelationalWhere::default()),
        }
    }

    fn finish(self) -> CompiledQuery {
        match self {
            Sink::Mongo(query) => CompiledQuery::Mongo(query),
            Sink::Relational(clause) => CompiledQuery::Relational(clause),
        }
    }
}

/// Compiles filter requests against an operator registry
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    registry: Arc<OperatorRegistry>,
    strictness: Strictness,
    descriptors: Option<Arc<FieldDescriptors>>,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(Arc::new(OperatorRegistry::builtin()))
    }
}

impl QueryCompiler {
    pub fn new(registry: Arc<OperatorRegistry>) -> Self {
        Self {
            registry,
            strictness: Strictness::default(),
            descriptors: None,
        }
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Descriptors consulted when `restrict_to_descriptors` is on
    pub fn with_descriptors(mut self, descriptors: Arc<FieldDescriptors>) -> Self {
        self.descriptors = Some(descriptors);
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Compile `request` for `backend`, walking entries in request order
    pub fn compile(
        &self,
        request: &FilterRequest,
        backend: Backend,
    ) -> Result<CompiledQuery, FilterError> {
        if !self.registry.supports(backend) {
            return Err(FilterError::unsupported_backend(backend));
        }

        let mut sink = Sink::new(backend);

        for entry in request.entries() {
            let Some(value) = &entry.value else {
                tracing::trace!(key = %entry.key, "Skipping null filter value");
                continue;
            };

            match &entry.parsed {
                FilterKey::Direct(field) => {
                    self.authorize(field, &Operator::Exact)?;
                    self.apply_direct(&mut sink, field, value);
                }
                FilterKey::Operator { field, operator } => {
                    self.authorize(field, operator)?;
                    self.apply_operator(&mut sink, entry, field, operator, value, backend)?;
                }
                FilterKey::Malformed => {
                    if self.strictness.reject_malformed_keys {
                        return Err(FilterError::MalformedKey(entry.key.clone()));
                    }
                    tracing::debug!(key = %entry.key, "Dropping malformed filter key");
                }
            }
        }

        let compiled = sink.finish();
        tracing::debug!(
            backend = %backend,
            entries = request.len(),
            empty = compiled.is_empty(),
            "Compiled filter request"
        );
        Ok(compiled)
    }

    fn authorize(&self, field: &str, operator: &Operator) -> Result<(), FilterError> {
        if !self.strictness.restrict_to_descriptors {
            return Ok(());
        }
        let allowed = self
            .descriptors
            .as_ref()
            .is_some_and(|d| d.allows(field, operator));
        if allowed {
            Ok(())
        } else {
            Err(FilterError::unauthorized(field, operator.as_str()))
        }
    }

    /// Separator-less key: top-level equality, bypassing the registry
    fn apply_direct(&self, sink: &mut Sink, field: &str, value: &FilterValue) {
        match sink {
            Sink::Mongo(query) => {
                query
                    .direct_equality
                    .insert(field.to_string(), to_bson_json(value));
            }
            Sink::Relational(clause) => {
                let condition = match value {
                    FilterValue::List(items) => Condition::In(
                        items
                            .iter()
                            .filter_map(SqlValue::from_filter_value)
                            .collect(),
                    ),
                    scalar => match SqlValue::from_filter_value(scalar) {
                        Some(v) => Condition::Eq(v),
                        None => return,
                    },
                };
                clause.insert(field, Operator::Exact, condition);
            }
        }
    }

    fn apply_operator(
        &self,
        sink: &mut Sink,
        entry: &FilterEntry,
        field: &str,
        operator: &Operator,
        value: &FilterValue,
        backend: Backend,
    ) -> Result<(), FilterError> {
        if !self.registry.contains(operator, backend) {
            if self.strictness.reject_unknown_operators {
                return Err(FilterError::unknown_operator(&entry.key, operator.as_str(), backend));
            }
            tracing::debug!(
                key = %entry.key,
                backend = %backend,
                "Dropping filter with unknown operator"
            );
            return Ok(());
        }

        if operator.is_range()
            && self.strictness.reject_uncoercible_values
            && coerce_comparable(value).is_none()
        {
            return Err(FilterError::value_coercion(
                field,
                operator.as_str(),
                describe_value(value),
            ));
        }

        let applied = match sink {
            Sink::Mongo(query) => {
                match self.registry.mongo_builder(operator).and_then(|build| build(field, value)) {
                    Some(fragment) => {
                        query.conjuncts.push(fragment);
                        true
                    }
                    None => false,
                }
            }
            Sink::Relational(clause) => {
                match self
                    .registry
                    .relational_builder(operator)
                    .and_then(|build| build(field, value))
                {
                    Some(condition) => {
                        clause.insert(field, operator.clone(), condition);
                        true
                    }
                    None => false,
                }
            }
        };

        if !applied {
            tracing::trace!(key = %entry.key, "Builder vetoed filter entry");
        }
        Ok(())
    }
}

fn describe_value(value: &FilterValue) -> String {
    match value.as_text() {
        Some(text) => text.into_owned(),
        None => value.to_json().to_string(),
    }
}
