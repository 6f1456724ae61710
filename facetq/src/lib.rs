pub mod app;
pub mod core;
pub mod facets;
pub mod filters;
pub mod service;
pub mod sql;
pub mod utils;

pub use facets::{FacetEngine, FacetResult, StatsProvider};
pub use filters::{Backend, CompiledQuery, FilterRequest, OperatorRegistry, QueryCompiler};
pub use service::FilterService;
