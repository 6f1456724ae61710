//! Filter query compilation
//!
//! Request keys have the form `field` or `field__operator`. Each operator has
//! one builder per backend in the [`OperatorRegistry`]; the [`QueryCompiler`]
//! walks the request and collects builder output into a [`CompiledQuery`].
//!
//! ```
//! use facetq::filters::{Backend, FilterRequest, QueryCompiler};
//!
//! let request = FilterRequest::new()
//!     .with("status", "ACTIVE")
//!     .with("price__lte", "49.99");
//! let query = QueryCompiler::default()
//!     .compile(&request, Backend::Mongodb)
//!     .unwrap();
//! assert!(!query.is_empty());
//! ```

mod coerce;
mod compiler;
mod descriptor;
mod error;
pub mod mongo;
mod registry;
pub mod relational;
mod request;
mod types;

pub use coerce::{
    Comparable, coerce_comparable, decimal_from_number, numeric_text, parse_date, parse_decimal,
};
pub use compiler::{CompiledQuery, QueryCompiler, Strictness};
pub use descriptor::{FieldDescriptor, FieldDescriptors};
pub use error::FilterError;
pub use mongo::MongoQuery;
pub use registry::{CustomOperator, MongoBuilder, OperatorRegistry, RelationalBuilder};
pub use relational::{Condition, RelationalWhere, SqlValue, WhereClause};
pub use request::{
    FilterEntry, FilterKey, FilterRequest, MAX_FILTER_ENTRIES, MAX_FILTER_JSON_SIZE,
};
pub use types::{
    Backend, FIELD_OPERATOR_SEPARATOR, FilterValue, Operator, OperatorName, format_timestamp,
};
