//! Operator registry
//!
//! Maps each operator to at most one predicate builder per backend. Builders
//! are pure `(field, value) -> fragment` functions; returning `None` vetoes
//! the request entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::error::FilterError;
use super::mongo;
use super::relational::{self, Condition};
use super::types::{Backend, FilterValue, Operator};

/// Builder producing a MongoDB expression fragment
pub type MongoBuilder = Arc<dyn Fn(&str, &FilterValue) -> Option<Value> + Send + Sync>;

/// Builder producing a relational column condition
pub type RelationalBuilder = Arc<dyn Fn(&str, &FilterValue) -> Option<Condition> + Send + Sync>;

/// Caller-supplied operator, registered against one or both backends
#[derive(Clone, Default)]
pub struct CustomOperator {
    pub mongo: Option<MongoBuilder>,
    pub relational: Option<RelationalBuilder>,
}

impl CustomOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mongo<F>(mut self, builder: F) -> Self
    where
        F: Fn(&str, &FilterValue) -> Option<Value> + Send + Sync + 'static,
    {
        self.mongo = Some(Arc::new(builder));
        self
    }

    pub fn relational<F>(mut self, builder: F) -> Self
    where
        F: Fn(&str, &FilterValue) -> Option<Condition> + Send + Sync + 'static,
    {
        self.relational = Some(Arc::new(builder));
        self
    }
}

impl fmt::Debug for CustomOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOperator")
            .field("mongo", &self.mongo.is_some())
            .field("relational", &self.relational.is_some())
            .finish()
    }
}

/// Per-backend builder tables
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    mongo: HashMap<Operator, MongoBuilder>,
    relational: HashMap<Operator, RelationalBuilder>,
}

impl OperatorRegistry {
    /// Registry with no builders; compiling against it fails with
    /// `UnsupportedBackend`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the five builtin operators for both backends
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.insert_mongo(Operator::Exact, Arc::new(mongo::exact));
        registry.insert_mongo(Operator::IContains, Arc::new(mongo::icontains));
        registry.insert_mongo(Operator::Gte, Arc::new(mongo::gte));
        registry.insert_mongo(Operator::Lte, Arc::new(mongo::lte));
        registry.insert_mongo(Operator::In, Arc::new(mongo::in_list));

        registry.insert_relational(Operator::Exact, Arc::new(relational::exact));
        registry.insert_relational(Operator::IContains, Arc::new(relational::icontains));
        registry.insert_relational(Operator::Gte, Arc::new(relational::gte));
        registry.insert_relational(Operator::Lte, Arc::new(relational::lte));
        registry.insert_relational(Operator::In, Arc::new(relational::in_list));

        registry
    }

    /// Builtins with caller operators merged over them.
    ///
    /// A custom operator named like a builtin replaces the builtin only on the
    /// backends it supplies a builder for.
    pub fn with_custom<I, S>(custom: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (S, CustomOperator)>,
        S: AsRef<str>,
    {
        let mut registry = Self::builtin();
        for (name, operator) in custom {
            registry.register_custom(name.as_ref(), operator)?;
        }
        Ok(registry)
    }

    /// Install or override builders for both backends
    pub fn register<M, R>(
        &mut self,
        name: &str,
        mongo: M,
        relational: R,
    ) -> Result<Operator, FilterError>
    where
        M: Fn(&str, &FilterValue) -> Option<Value> + Send + Sync + 'static,
        R: Fn(&str, &FilterValue) -> Option<Condition> + Send + Sync + 'static,
    {
        self.register_custom(name, CustomOperator::new().mongo(mongo).relational(relational))
    }

    pub fn register_mongo<M>(&mut self, name: &str, mongo: M) -> Result<Operator, FilterError>
    where
        M: Fn(&str, &FilterValue) -> Option<Value> + Send + Sync + 'static,
    {
        self.register_custom(name, CustomOperator::new().mongo(mongo))
    }

    pub fn register_relational<R>(
        &mut self,
        name: &str,
        relational: R,
    ) -> Result<Operator, FilterError>
    where
        R: Fn(&str, &FilterValue) -> Option<Condition> + Send + Sync + 'static,
    {
        self.register_custom(name, CustomOperator::new().relational(relational))
    }

    /// Validate the name once and install whichever builders are present
    pub fn register_custom(
        &mut self,
        name: &str,
        custom: CustomOperator,
    ) -> Result<Operator, FilterError> {
        let operator = Operator::from_name(name)?;

        if let Some(builder) = custom.mongo {
            self.insert_mongo(operator.clone(), builder);
        }
        if let Some(builder) = custom.relational {
            self.insert_relational(operator.clone(), builder);
        }

        tracing::debug!(operator = %operator, "Registered filter operator");
        Ok(operator)
    }

    pub fn mongo_builder(&self, operator: &Operator) -> Option<&MongoBuilder> {
        self.mongo.get(operator)
    }

    pub fn relational_builder(&self, operator: &Operator) -> Option<&RelationalBuilder> {
        self.relational.get(operator)
    }

    /// Whether `operator` has a builder for `backend`
    pub fn contains(&self, operator: &Operator, backend: Backend) -> bool {
        match backend {
            Backend::Mongodb => self.mongo.contains_key(operator),
            Backend::Relational => self.relational.contains_key(operator),
        }
    }

    /// Whether any builder at all is registered for `backend`
    pub fn supports(&self, backend: Backend) -> bool {
        match backend {
            Backend::Mongodb => !self.mongo.is_empty(),
            Backend::Relational => !self.relational.is_empty(),
        }
    }

    /// Operators registered for `backend`, sorted
    pub fn operators(&self, backend: Backend) -> Vec<Operator> {
        let mut operators: Vec<Operator> = match backend {
            Backend::Mongodb => self.mongo.keys().cloned().collect(),
            Backend::Relational => self.relational.keys().cloned().collect(),
        };
        operators.sort();
        operators
    }

    fn insert_mongo(&mut self, operator: Operator, builder: MongoBuilder) {
        self.mongo.insert(operator, builder);
    }

    fn insert_relational(&mut self, operator: Operator, builder: RelationalBuilder) {
        self.relational.insert(operator, builder);
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("mongo", &self.operators(Backend::Mongodb))
            .field("relational", &self.operators(Backend::Relational))
            .finish()
    }
}
