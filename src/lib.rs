//! # Lifeguard DAO
//!
//! Generic data-access helper for the `may` runtime: paging through entities with textual
//! or structured queries, automatic total counts, and declarative property filters.
//!
//! See [README on GitHub](https://github.com/microscaler/lifeguard) for the wider project.

pub mod config;
pub mod connection;
pub mod criteria;
pub mod dao;
pub mod entity;
pub mod executor;
pub mod filter;
pub mod metrics;
pub mod page;
pub mod query;
pub mod session;

pub use connection::{connect, ConnectionTarget};
pub use criteria::{
    AliasSet, Criteria, Criterion, DetachedCriteria, JoinKind, OrderEntry, OrderListAdapter,
    Projection, ResultTransformer,
};
pub use dao::{LifeDao, PropertyFilterCompiler};
pub use entity::{EntityMetadata, FromRow, LifeEntity, PropertyMeta};
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor};
pub use filter::{MatchType, MatchValue, PropertyFilter, PropertyType};
pub use page::PageRequest;
pub use query::TextQuery;
pub use session::{LifeSession, ListSession, PostgresSession};
