//! Facet result types

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::stats::RangeStats;
use crate::filters::Operator;

/// Selectable enum option with its display label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumOption {
    pub value: Value,
    pub label: String,
}

/// Facet metadata for one entity, keyed and ordered by descriptor order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetResult {
    /// Fields accepting `icontains`
    pub searchable_fields: Vec<String>,
    pub enum_facets: IndexMap<String, Vec<EnumOption>>,
    /// Only fields with at least one non-null value
    pub range_facets: IndexMap<String, RangeStats>,
    /// Allowed operators per field
    pub fields: IndexMap<String, Vec<Operator>>,
    /// Range fields omitted because their stats could not be fetched
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub unavailable: IndexMap<String, String>,
}

/// Per-field UI filter block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<Vec<EnumOption>>,
    #[serde(flatten)]
    pub range: Option<RangeStats>,
}

/// Wire shape of a facet result: `{filters, search, fields}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetResponse {
    pub filters: IndexMap<String, FieldFilters>,
    pub search: Vec<String>,
    pub fields: IndexMap<String, Vec<Operator>>,
}

impl FacetResult {
    /// Reshape into the response served to UI clients.
    ///
    /// `filters` lists enum options under `exact` and range bounds as
    /// `min`/`max`, in descriptor order.
    pub fn to_response(&self) -> FacetResponse {
        let mut filters: IndexMap<String, FieldFilters> = IndexMap::new();

        for field in self.fields.keys() {
            let exact = self.enum_facets.get(field).cloned();
            let range = self.range_facets.get(field).cloned();
            if exact.is_some() || range.is_some() {
                filters.insert(field.clone(), FieldFilters { exact, range });
            }
        }

        FacetResponse {
            filters,
            search: self.searchable_fields.clone(),
            fields: self.fields.clone(),
        }
    }
}
