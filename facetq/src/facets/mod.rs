//! Facet computation
//!
//! Turns field descriptors into UI facet metadata. Range bounds are fetched
//! through a [`StatsProvider`]; the engine owns no database handle.

mod engine;
mod error;
mod memory;
mod stats;
mod types;

pub use engine::{FacetConfig, FacetEngine, FailurePolicy};
pub use error::{FacetError, StatsError};
pub use memory::MemoryStatsProvider;
pub use stats::{
    RangeStats, StatsContext, StatsProvider, mongo_range_pipeline, relational_range_sql,
};
pub use types::{EnumOption, FacetResponse, FacetResult, FieldFilters};
