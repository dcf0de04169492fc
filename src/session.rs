//! Sessions: where structured and textual queries are executed.
//!
//! The DAO never touches the driver. It asks a session for rows ([`ListSession`]) or for a
//! single number ([`LifeSession`]). [`PostgresSession`] renders queries to PostgreSQL and
//! runs them through any [`LifeExecutor`]; tests substitute an in-memory session.

use crate::criteria::DetachedCriteria;
use crate::entity::FromRow;
use crate::executor::{LifeError, LifeExecutor};
use crate::query::{with_converted_params, TextQuery};
use may_postgres::Row;

/// Single-value query execution.
pub trait LifeSession {
    /// Execute a structured query expected to yield one numeric value.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if rendering or execution fails.
    fn scalar(&self, criteria: &DetachedCriteria) -> Result<Option<i64>, LifeError>;

    /// Execute a textual query expected to yield one numeric value.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if binding or execution fails.
    fn scalar_text(&self, query: &TextQuery) -> Result<Option<i64>, LifeError>;
}

/// Row-producing query execution for result type `T`.
pub trait ListSession<T>: LifeSession {
    /// # Errors
    ///
    /// Returns `LifeError` if rendering, execution or row materialisation fails.
    fn list(&self, criteria: &DetachedCriteria) -> Result<Vec<T>, LifeError>;

    /// # Errors
    ///
    /// Returns `LifeError` if binding, execution or row materialisation fails.
    fn list_text(&self, query: &TextQuery) -> Result<Vec<T>, LifeError>;
}

/// A session over a PostgreSQL executor.
pub struct PostgresSession<'e, E: LifeExecutor + ?Sized> {
    executor: &'e E,
}

impl<'e, E: LifeExecutor + ?Sized> PostgresSession<'e, E> {
    pub fn new(executor: &'e E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &'e E {
        self.executor
    }

    fn first_column(row: &Row) -> Result<Option<i64>, LifeError> {
        row.try_get::<usize, Option<i64>>(0)
            .map_err(|e| LifeError::ParseError(format!("Failed to read scalar: {}", e)))
    }
}

impl<E: LifeExecutor + ?Sized> LifeSession for PostgresSession<'_, E> {
    fn scalar(&self, criteria: &DetachedCriteria) -> Result<Option<i64>, LifeError> {
        let (sql, values) = criteria.to_sql()?;
        log::debug!("scalar {}: {sql}", criteria.entity().name);
        let row = with_converted_params(&values, |params| self.executor.query_one(&sql, params))?;
        Self::first_column(&row)
    }

    fn scalar_text(&self, query: &TextQuery) -> Result<Option<i64>, LifeError> {
        let (sql, values) = query.to_postgres()?;
        log::debug!("scalar: {sql}");
        let row = with_converted_params(&values, |params| self.executor.query_one(&sql, params))?;
        Self::first_column(&row)
    }
}

impl<T: FromRow, E: LifeExecutor + ?Sized> ListSession<T> for PostgresSession<'_, E> {
    fn list(&self, criteria: &DetachedCriteria) -> Result<Vec<T>, LifeError> {
        let (sql, values) = criteria.to_sql()?;
        log::debug!("list {}: {sql}", criteria.entity().name);
        let rows = with_converted_params(&values, |params| self.executor.query_all(&sql, params))?;
        materialise(&rows)
    }

    fn list_text(&self, query: &TextQuery) -> Result<Vec<T>, LifeError> {
        let (sql, values) = query.to_postgres()?;
        log::debug!("list: {sql}");
        let rows = with_converted_params(&values, |params| self.executor.query_all(&sql, params))?;
        materialise(&rows)
    }
}

fn materialise<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, LifeError> {
    rows.iter()
        .map(|row| {
            T::from_row(row).map_err(|e| LifeError::ParseError(format!("Failed to parse row: {}", e)))
        })
        .collect()
}
