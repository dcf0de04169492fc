//! Structured queries.
//!
//! A [`DetachedCriteria`] is a composable, session-free description of a query over one
//! root entity: aliased joins, a predicate list, an optional projection, a result
//! transformer, an order list and a row window. Binding it to a session with
//! [`DetachedCriteria::executable`] yields a live [`Criteria`] that can be listed or
//! counted. Rendering to SQL lives in [`render`].

pub mod render;

use crate::entity::EntityMetadata;
use crate::executor::LifeError;
use crate::session::{LifeSession, ListSession};
use sea_query::Value;
use std::collections::HashSet;

/// A boolean condition on entity properties.
///
/// Property names are root properties (`name`) or alias-qualified paths (`profile.city`).
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Eq {
        property: String,
        value: Value,
        ignore_case: bool,
    },
    Ne { property: String, value: Value },
    /// Matches when the property contains `value` anywhere.
    Like {
        property: String,
        value: String,
        ignore_case: bool,
    },
    Le { property: String, value: Value },
    Lt { property: String, value: Value },
    Ge { property: String, value: Value },
    Gt { property: String, value: Value },
    IsNull { property: String },
    IsNotNull { property: String },
    In { property: String, values: Vec<Value> },
    /// Disjunction of the children.
    Or(Vec<Criterion>),
}

impl Criterion {
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Eq {
            property: property.into(),
            value: value.into(),
            ignore_case: false,
        }
    }

    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Ne {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn like(property: impl Into<String>, value: impl Into<String>) -> Self {
        Criterion::Like {
            property: property.into(),
            value: value.into(),
            ignore_case: false,
        }
    }

    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Le {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Lt {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Ge {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Gt {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Criterion::IsNull {
            property: property.into(),
        }
    }

    pub fn is_not_null(property: impl Into<String>) -> Self {
        Criterion::IsNotNull {
            property: property.into(),
        }
    }

    pub fn is_in(property: impl Into<String>, values: Vec<Value>) -> Self {
        Criterion::In {
            property: property.into(),
            values,
        }
    }

    pub fn or(children: Vec<Criterion>) -> Self {
        Criterion::Or(children)
    }

    /// Compare case-insensitively. Only equality and LIKE are affected.
    pub fn ignore_case(self) -> Self {
        match self {
            Criterion::Eq {
                property, value, ..
            } => Criterion::Eq {
                property,
                value,
                ignore_case: true,
            },
            Criterion::Like {
                property, value, ..
            } => Criterion::Like {
                property,
                value,
                ignore_case: true,
            },
            other => other,
        }
    }

    /// Every property path this condition reads, children included.
    pub fn properties(&self) -> Vec<&str> {
        match self {
            Criterion::Or(children) => children.iter().flat_map(|c| c.properties()).collect(),
            Criterion::Eq { property, .. }
            | Criterion::Ne { property, .. }
            | Criterion::Like { property, .. }
            | Criterion::Le { property, .. }
            | Criterion::Lt { property, .. }
            | Criterion::Ge { property, .. }
            | Criterion::Gt { property, .. }
            | Criterion::IsNull { property }
            | Criterion::IsNotNull { property }
            | Criterion::In { property, .. } => vec![property.as_str()],
        }
    }
}

/// What a query returns instead of root entities.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// A single row count.
    RowCount,
    Property(String),
    Properties(Vec<String>),
}

/// How result rows are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTransformer {
    /// Root entities, one per result row.
    RootEntity,
    /// Root entities without duplicates introduced by joins.
    DistinctRootEntity,
    /// Projected tuples.
    Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// A join declared on a criteria: association `path` reachable as `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub path: String,
    pub alias: String,
    pub join: JoinKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub property: String,
    pub ascending: bool,
}

impl OrderEntry {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }
}

/// Aliases already declared during one execution.
///
/// The filter compiler records every alias it creates here so the order-by handling of the
/// same execution does not declare it a second time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet(HashSet<String>);

impl AliasSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.0.contains(alias)
    }

    /// Returns `false` if the alias was already present.
    pub fn insert(&mut self, alias: impl Into<String>) -> bool {
        self.0.insert(alias.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Temporarily detaches and restores the order list of a query.
///
/// Counting must run without ordering (a count projection cannot reference sort columns)
/// and must leave the order list as it found it.
pub trait OrderListAdapter {
    fn detach_orders(&mut self) -> Result<Vec<OrderEntry>, LifeError>;
    fn restore_orders(&mut self, orders: Vec<OrderEntry>) -> Result<(), LifeError>;
}

/// A query description not bound to any session.
#[derive(Debug, Clone)]
pub struct DetachedCriteria {
    entity: &'static EntityMetadata,
    aliases: Vec<AliasEntry>,
    predicates: Vec<Criterion>,
    projection: Option<Projection>,
    result_transformer: Option<ResultTransformer>,
    orders: Vec<OrderEntry>,
    first_result: Option<u64>,
    max_results: Option<u64>,
}

impl DetachedCriteria {
    pub fn for_entity(entity: &'static EntityMetadata) -> Self {
        Self {
            entity,
            aliases: Vec::new(),
            predicates: Vec::new(),
            projection: None,
            result_transformer: Some(ResultTransformer::RootEntity),
            orders: Vec::new(),
            first_result: None,
            max_results: None,
        }
    }

    pub fn entity(&self) -> &'static EntityMetadata {
        self.entity
    }

    pub fn add(&mut self, criterion: Criterion) -> &mut Self {
        self.predicates.push(criterion);
        self
    }

    /// Join the association at `path` and make it addressable as `alias`.
    ///
    /// # Errors
    ///
    /// Returns `LifeError::QueryError` if `alias` is already declared on this criteria.
    pub fn create_alias(
        &mut self,
        path: impl Into<String>,
        alias: impl Into<String>,
        join: JoinKind,
    ) -> Result<&mut Self, LifeError> {
        let alias = alias.into();
        if self.has_alias(&alias) {
            return Err(LifeError::QueryError(format!(
                "duplicate alias: {alias} on {}",
                self.entity.name
            )));
        }
        self.aliases.push(AliasEntry {
            path: path.into(),
            alias,
            join,
        });
        Ok(self)
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a.alias == alias)
    }

    pub fn alias(&self, alias: &str) -> Option<&AliasEntry> {
        self.aliases.iter().find(|a| a.alias == alias)
    }

    pub fn aliases(&self) -> &[AliasEntry] {
        &self.aliases
    }

    pub fn predicates(&self) -> &[Criterion] {
        &self.predicates
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Set the projection; a projection switches the transformer to [`ResultTransformer::Projection`].
    pub fn set_projection(&mut self, projection: Option<Projection>) -> &mut Self {
        if projection.is_some() {
            self.result_transformer = Some(ResultTransformer::Projection);
        }
        self.projection = projection;
        self
    }

    pub fn result_transformer(&self) -> Option<ResultTransformer> {
        self.result_transformer
    }

    pub fn set_result_transformer(&mut self, transformer: Option<ResultTransformer>) -> &mut Self {
        self.result_transformer = transformer;
        self
    }

    pub fn orders(&self) -> &[OrderEntry] {
        &self.orders
    }

    pub fn add_order(&mut self, order: OrderEntry) -> &mut Self {
        self.orders.push(order);
        self
    }

    /// 0-based index of the first row to return.
    pub fn first_result(&self) -> Option<u64> {
        self.first_result
    }

    pub fn set_first_result(&mut self, first_result: u64) -> &mut Self {
        self.first_result = Some(first_result);
        self
    }

    pub fn max_results(&self) -> Option<u64> {
        self.max_results
    }

    pub fn set_max_results(&mut self, max_results: u64) -> &mut Self {
        self.max_results = Some(max_results);
        self
    }

    /// Bind to a live session.
    pub fn executable<S: ?Sized>(self, session: &S) -> Criteria<'_, S> {
        Criteria {
            session,
            spec: self,
        }
    }
}

impl OrderListAdapter for DetachedCriteria {
    fn detach_orders(&mut self) -> Result<Vec<OrderEntry>, LifeError> {
        Ok(std::mem::take(&mut self.orders))
    }

    fn restore_orders(&mut self, orders: Vec<OrderEntry>) -> Result<(), LifeError> {
        self.orders = orders;
        Ok(())
    }
}

/// A structured query bound to a session.
pub struct Criteria<'s, S: ?Sized> {
    session: &'s S,
    spec: DetachedCriteria,
}

impl<'s, S: ?Sized> Criteria<'s, S> {
    pub fn spec(&self) -> &DetachedCriteria {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut DetachedCriteria {
        &mut self.spec
    }

    pub fn into_detached(self) -> DetachedCriteria {
        self.spec
    }

    pub fn add(&mut self, criterion: Criterion) -> &mut Self {
        self.spec.add(criterion);
        self
    }

    /// See [`DetachedCriteria::create_alias`].
    pub fn create_alias(
        &mut self,
        path: impl Into<String>,
        alias: impl Into<String>,
        join: JoinKind,
    ) -> Result<&mut Self, LifeError> {
        self.spec.create_alias(path, alias, join)?;
        Ok(self)
    }

    pub fn add_order(&mut self, order: OrderEntry) -> &mut Self {
        self.spec.add_order(order);
        self
    }

    pub fn projection(&self) -> Option<Projection> {
        self.spec.projection().cloned()
    }

    pub fn set_projection(&mut self, projection: Option<Projection>) -> &mut Self {
        self.spec.set_projection(projection);
        self
    }

    pub fn result_transformer(&self) -> Option<ResultTransformer> {
        self.spec.result_transformer()
    }

    pub fn set_result_transformer(&mut self, transformer: Option<ResultTransformer>) -> &mut Self {
        self.spec.set_result_transformer(transformer);
        self
    }

    pub fn set_first_result(&mut self, first_result: u64) -> &mut Self {
        self.spec.set_first_result(first_result);
        self
    }

    pub fn set_max_results(&mut self, max_results: u64) -> &mut Self {
        self.spec.set_max_results(max_results);
        self
    }
}

impl<'s, S: LifeSession + ?Sized> Criteria<'s, S> {
    /// Execute a single-value query (typically a row-count projection).
    pub fn unique_i64(&self) -> Result<Option<i64>, LifeError> {
        self.session.scalar(&self.spec)
    }

    /// Execute and materialise every row.
    pub fn list<T>(&self) -> Result<Vec<T>, LifeError>
    where
        S: ListSession<T>,
    {
        self.session.list(&self.spec)
    }
}

impl<S: ?Sized> OrderListAdapter for Criteria<'_, S> {
    fn detach_orders(&mut self) -> Result<Vec<OrderEntry>, LifeError> {
        self.spec.detach_orders()
    }

    fn restore_orders(&mut self, orders: Vec<OrderEntry>) -> Result<(), LifeError> {
        self.spec.restore_orders(orders)
    }
}
