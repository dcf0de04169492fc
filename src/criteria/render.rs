//! Rendering a [`DetachedCriteria`] to a PostgreSQL `SELECT`.
//!
//! Columns are always table-qualified: root properties by the root table name, aliased
//! properties by their alias. Every alias becomes
//! `JOIN target AS alias ON alias.target_column = owner.local_column`.

use super::{Criterion, DetachedCriteria, JoinKind, Projection, ResultTransformer};
use crate::entity::{EntityMetadata, PropertyKind, PropertyMeta};
use crate::executor::LifeError;
use sea_query::{
    Asterisk, Condition, Expr, ExprTrait, Func, Iden, JoinType, Order, PostgresQueryBuilder,
    SelectStatement, Values,
};

#[derive(Debug, Clone)]
struct Ident(String);

impl Iden for Ident {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// A property path resolved to its table qualifier and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPath {
    pub qualifier: String,
    pub column: String,
}

impl ColumnPath {
    fn expr(&self) -> Expr {
        Expr::col((Ident(self.qualifier.clone()), Ident(self.column.clone())))
    }
}

impl DetachedCriteria {
    /// Resolve `path` (`name`, `alias.name` or `component.name`) to a qualified column.
    ///
    /// # Errors
    ///
    /// Returns `LifeError::QueryError` when a segment names no property, or when an
    /// association is traversed without a declared alias.
    pub fn resolve_column(&self, path: &str) -> Result<ColumnPath, LifeError> {
        let root = self.entity();
        let Some((head, rest)) = path.split_once('.') else {
            let prop = lookup(root, path)?;
            return Ok(ColumnPath {
                qualifier: root.table.to_string(),
                column: prop.column.to_string(),
            });
        };

        if let Some(entry) = self.alias(head) {
            let target = self.alias_target(&entry.path)?;
            let prop = lookup(target, rest)?;
            return Ok(ColumnPath {
                qualifier: entry.alias.clone(),
                column: prop.column.to_string(),
            });
        }

        match lookup(root, head)?.kind {
            PropertyKind::Embedded { target } => {
                let prop = lookup(target, rest)?;
                Ok(ColumnPath {
                    qualifier: root.table.to_string(),
                    column: prop.column.to_string(),
                })
            }
            _ => Err(LifeError::QueryError(format!(
                "could not resolve property: {path} of: {} (no alias declared for {head})",
                root.name
            ))),
        }
    }

    /// The entity reached by the association at `path`, which is a root property or
    /// `alias.property` for chained joins.
    fn alias_target(&self, path: &str) -> Result<&'static EntityMetadata, LifeError> {
        let (owner, name) = match path.split_once('.') {
            Some((alias, name)) => {
                let entry = self.alias(alias).ok_or_else(|| {
                    LifeError::QueryError(format!("unknown alias {alias} in join path {path}"))
                })?;
                (self.alias_target(&entry.path)?, name)
            }
            None => (self.entity(), path),
        };
        match lookup(owner, name)?.kind {
            PropertyKind::Association { target, .. } => Ok(target),
            _ => Err(LifeError::QueryError(format!(
                "property {name} of {} is not an association",
                owner.name
            ))),
        }
    }

    /// Build the `SELECT` for this criteria.
    ///
    /// # Errors
    ///
    /// Returns `LifeError::QueryError` if a join path or property cannot be resolved.
    pub fn to_select_statement(&self) -> Result<SelectStatement, LifeError> {
        let root = self.entity();
        let mut stmt = SelectStatement::default();
        stmt.from(Ident(root.table.to_string()));

        match self.projection() {
            Some(Projection::RowCount) => {
                stmt.expr(Expr::cust("COUNT(*)"));
            }
            Some(Projection::Property(path)) => {
                stmt.expr(self.resolve_column(path)?.expr());
            }
            Some(Projection::Properties(paths)) => {
                for path in paths {
                    stmt.expr(self.resolve_column(path)?.expr());
                }
            }
            None => {
                if self.result_transformer() == Some(ResultTransformer::DistinctRootEntity) {
                    stmt.distinct();
                }
                stmt.column((Ident(root.table.to_string()), Asterisk));
            }
        }

        for entry in self.aliases() {
            let (owner_qualifier, name) = match entry.path.split_once('.') {
                Some((alias, name)) => (alias.to_string(), name),
                None => (root.table.to_string(), entry.path.as_str()),
            };
            let owner = match entry.path.split_once('.') {
                Some((alias, _)) => {
                    let parent = self.alias(alias).ok_or_else(|| {
                        LifeError::QueryError(format!(
                            "unknown alias {alias} in join path {}",
                            entry.path
                        ))
                    })?;
                    self.alias_target(&parent.path)?
                }
                None => root,
            };
            let PropertyKind::Association {
                target,
                local_column,
                target_column,
            } = lookup(owner, name)?.kind
            else {
                return Err(LifeError::QueryError(format!(
                    "property {name} of {} is not an association",
                    owner.name
                )));
            };
            let join = match entry.join {
                JoinKind::Inner => JoinType::InnerJoin,
                JoinKind::Left => JoinType::LeftJoin,
            };
            stmt.join_as(
                join,
                Ident(target.table.to_string()),
                Ident(entry.alias.clone()),
                Expr::col((Ident(entry.alias.clone()), Ident(target_column.to_string())))
                    .equals((Ident(owner_qualifier), Ident(local_column.to_string()))),
            );
        }

        for criterion in self.predicates() {
            stmt.cond_where(self.condition(criterion)?);
        }

        for order in self.orders() {
            let column = self.resolve_column(&order.property)?;
            let direction = if order.ascending { Order::Asc } else { Order::Desc };
            stmt.order_by((Ident(column.qualifier), Ident(column.column)), direction);
        }

        if let Some(limit) = self.max_results() {
            stmt.limit(limit);
        }
        if let Some(offset) = self.first_result() {
            stmt.offset(offset);
        }

        Ok(stmt)
    }

    /// Render to PostgreSQL text with `$n` placeholders and the bound values.
    pub fn to_sql(&self) -> Result<(String, Values), LifeError> {
        Ok(self.to_select_statement()?.build(PostgresQueryBuilder))
    }

    fn condition(&self, criterion: &Criterion) -> Result<Condition, LifeError> {
        let expr = match criterion {
            Criterion::Or(children) => {
                let mut any = Condition::any();
                for child in children {
                    any = any.add(self.condition(child)?);
                }
                return Ok(any);
            }
            Criterion::Eq {
                property,
                value,
                ignore_case,
            } => {
                let col = self.resolve_column(property)?.expr();
                match value {
                    sea_query::Value::String(Some(s)) if *ignore_case => {
                        Expr::from(Func::lower(col)).eq(s.to_lowercase())
                    }
                    _ => col.eq(value.clone()),
                }
            }
            Criterion::Ne { property, value } => {
                self.resolve_column(property)?.expr().ne(value.clone())
            }
            Criterion::Like {
                property,
                value,
                ignore_case,
            } => {
                let col = self.resolve_column(property)?.expr();
                if *ignore_case {
                    Expr::from(Func::lower(col)).like(format!("%{}%", value.to_lowercase()))
                } else {
                    col.like(format!("%{value}%"))
                }
            }
            Criterion::Le { property, value } => {
                self.resolve_column(property)?.expr().lte(value.clone())
            }
            Criterion::Lt { property, value } => {
                self.resolve_column(property)?.expr().lt(value.clone())
            }
            Criterion::Ge { property, value } => {
                self.resolve_column(property)?.expr().gte(value.clone())
            }
            Criterion::Gt { property, value } => {
                self.resolve_column(property)?.expr().gt(value.clone())
            }
            Criterion::IsNull { property } => self.resolve_column(property)?.expr().is_null(),
            Criterion::IsNotNull { property } => {
                self.resolve_column(property)?.expr().is_not_null()
            }
            Criterion::In { property, values } => self
                .resolve_column(property)?
                .expr()
                .is_in(values.iter().cloned()),
        };
        Ok(Condition::all().add(expr))
    }
}

fn lookup(entity: &'static EntityMetadata, name: &str) -> Result<&'static PropertyMeta, LifeError> {
    entity.property(name).ok_or_else(|| {
        LifeError::QueryError(format!("could not resolve property: {name} of: {}", entity.name))
    })
}
