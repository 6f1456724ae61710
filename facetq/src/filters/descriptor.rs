//! Field descriptors
//!
//! A descriptor declares which operators a field accepts and, optionally, the
//! enum values it can take. Descriptor sets drive facet computation and, when
//! enabled, compile-time authorisation.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;
use super::types::Operator;

fn default_operations() -> Vec<Operator> {
    vec![Operator::IContains]
}

/// Filterable field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Ordered, deduplicated when the descriptor set is built
    #[serde(default = "default_operations")]
    pub operations: Vec<Operator>,
    /// Symbolic key -> stored value, in declaration order
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<IndexMap<String, Value>>,
}

impl FieldDescriptor {
    /// Descriptor with the default operation list (`icontains`)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: default_operations(),
            enum_values: None,
        }
    }

    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Operator>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    pub fn with_enum<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.enum_values = Some(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn allows(&self, operator: &Operator) -> bool {
        self.operations.contains(operator)
    }

    /// Declares `gte` or `lte`, so the facet engine asks for min/max
    pub fn has_range(&self) -> bool {
        self.operations.iter().any(Operator::is_range)
    }
}

/// Validated descriptor list with unique names, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDescriptors {
    fields: IndexMap<String, FieldDescriptor>,
}

impl FieldDescriptors {
    pub fn new(
        descriptors: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, FilterError> {
        let mut fields = IndexMap::new();
        for mut descriptor in descriptors {
            if fields.contains_key(&descriptor.name) {
                return Err(FilterError::DuplicateField(descriptor.name));
            }
            let mut seen = HashSet::new();
            descriptor.operations.retain(|op| seen.insert(op.clone()));
            fields.insert(descriptor.name.clone(), descriptor);
        }
        Ok(Self { fields })
    }

    /// Parse a JSON array of descriptors
    pub fn from_json(value: Value) -> Result<Self, FilterError> {
        let descriptors: Vec<FieldDescriptor> = serde_json::from_value(value)
            .map_err(|e| FilterError::InvalidRequest(format!("invalid field descriptors: {}", e)))?;
        Self::new(descriptors)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Whether `field` is declared with `operator`
    pub fn allows(&self, field: &str, operator: &Operator) -> bool {
        self.get(field).is_some_and(|d| d.allows(operator))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
