//! SQLite query engine for the media library.
//!
//! Turns the filter DSL from `marquee-core` into parameterized SQL:
//! criterion handlers append clauses to a [`ClauseSet`], nested filters
//! compose through and/or/not, hierarchy criteria expand ids against the
//! relation tables, and [`QueryExecutor`] runs the count and page
//! statements. Readers in [`filters`] hydrate the resulting ids.

pub mod clause;
pub mod config;
pub mod criterion;
pub mod error;
pub mod executor;
pub mod filters;
pub mod functions;
pub mod hierarchy;
pub mod queries;
pub mod query;
pub mod schema;
pub mod search;

pub use clause::{Clause, ClauseSet, Join, JoinKind, Joins};
pub use config::{HierarchyRelation, Identifiers, Junction, PlaceholderStyle, QueryConfig};
pub use criterion::{FilterContext, RelationTarget};
pub use error::QueryError;
pub use executor::{Cancellable, Executor, rebind};
pub use filters::{
    EntityFilter, build_filter, plan, query_galleries, query_groups, query_ids, query_images,
    query_performers, query_scenes, query_studios, query_tags,
};
pub use functions::{NATURAL_COLLATION, register_functions};
pub use hierarchy::{Closure, Direction, EdgeList, EdgeSource, HierarchyEdge, HierarchyResolver};
pub use queries::{
    find_galleries, find_groups, find_images, find_performers, find_scenes, find_studios,
    find_tags,
};
pub use query::{QueryExecutor, QueryPlan, QueryResult, SortOptions};
pub use schema::{SchemaError, open_database, open_memory};
