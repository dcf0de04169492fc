//! Compiles [`PropertyFilter`]s into criteria.

use crate::criteria::{AliasSet, Criterion, DetachedCriteria, JoinKind};
use crate::entity::{accessor_name, EntityMetadata, PropertyKind};
use crate::executor::LifeError;
use crate::filter::{MatchType, MatchValue, PropertyFilter};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

/// Case-insensitivity per (entity, property path). Entity metadata is static, so an entry
/// never goes stale.
static IGNORE_CASE: Lazy<Mutex<HashMap<(usize, String), bool>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Turns property filters into predicates and detached criteria for one entity.
#[derive(Debug, Clone, Copy)]
pub struct PropertyFilterCompiler {
    entity: &'static EntityMetadata,
}

impl PropertyFilterCompiler {
    pub fn new(entity: &'static EntityMetadata) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &'static EntityMetadata {
        self.entity
    }

    /// One predicate per filter; multi-property filters become a disjunction.
    ///
    /// # Errors
    ///
    /// `Precondition` on an empty property name, `Reflection` when a path cannot be walked.
    pub fn build_predicates(&self, filters: &[PropertyFilter]) -> Result<Vec<Criterion>, LifeError> {
        filters.iter().map(|f| self.build_filter_criterion(f)).collect()
    }

    /// A detached criteria on the entity with every alias and predicate the filters need.
    ///
    /// Aliases created here are recorded in `aliases` so the caller's order-by handling
    /// does not declare them again. Paths through an embedded component (composite id
    /// included) join nothing: their columns live on the root table.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build_predicates`].
    pub fn build_detached(
        &self,
        filters: &[PropertyFilter],
        aliases: &mut AliasSet,
    ) -> Result<DetachedCriteria, LifeError> {
        let mut criteria = DetachedCriteria::for_entity(self.entity);
        for filter in filters {
            for property_name in filter.property_names() {
                self.materialise_alias(&mut criteria, property_name, aliases)?;
            }
            criteria.add(self.build_filter_criterion(filter)?);
        }
        Ok(criteria)
    }

    fn materialise_alias(
        &self,
        criteria: &mut DetachedCriteria,
        property_name: &str,
        aliases: &mut AliasSet,
    ) -> Result<(), LifeError> {
        let Some((alias, _)) = property_name.split_once('.') else {
            return Ok(());
        };
        let accessor = self.entity.accessor(&accessor_name(alias))?;
        if accessor.embedded_id || matches!(accessor.kind, PropertyKind::Embedded { .. }) {
            return Ok(());
        }
        if !aliases.contains(alias) {
            criteria.create_alias(alias, alias, JoinKind::Left)?;
            aliases.insert(alias);
        }
        Ok(())
    }

    fn build_filter_criterion(&self, filter: &PropertyFilter) -> Result<Criterion, LifeError> {
        if !filter.has_multi_properties() {
            return self.build_criterion(
                filter.property_name(),
                filter.match_value(),
                filter.match_type(),
            );
        }
        let children = filter
            .property_names()
            .iter()
            .map(|name| self.build_criterion(name, filter.match_value(), filter.match_type()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Criterion::or(children))
    }

    /// Build the predicate for one property.
    ///
    /// LIKE with a non-text value falls back to equality.
    ///
    /// # Errors
    ///
    /// `Precondition` if `property_name` is empty, `Reflection` if an EQ/LIKE path cannot
    /// be walked on the entity.
    pub fn build_criterion(
        &self,
        property_name: &str,
        value: &MatchValue,
        match_type: MatchType,
    ) -> Result<Criterion, LifeError> {
        if property_name.trim().is_empty() {
            return Err(LifeError::precondition("propertyName must not be empty"));
        }

        let criterion = match match_type {
            MatchType::Eq => self.equal(property_name, value)?,
            MatchType::Like => match value.as_text() {
                Some(text) => {
                    let like = Criterion::like(property_name, text);
                    if self.is_ignore_case(property_name)? {
                        like.ignore_case()
                    } else {
                        like
                    }
                }
                None => {
                    log::warn!(
                        "LIKE on {}.{property_name} needs a text value, got {}; comparing with EQ",
                        self.entity.name,
                        value.type_name()
                    );
                    self.equal(property_name, value)?
                }
            },
            MatchType::Ne => Criterion::ne(property_name, value.as_scalar()),
            MatchType::Le => Criterion::le(property_name, value.as_scalar()),
            MatchType::Lt => Criterion::lt(property_name, value.as_scalar()),
            MatchType::Ge => Criterion::ge(property_name, value.as_scalar()),
            MatchType::Gt => Criterion::gt(property_name, value.as_scalar()),
            MatchType::Isn => Criterion::is_null(property_name),
            MatchType::Nn => Criterion::is_not_null(property_name),
            MatchType::In => Criterion::is_in(property_name, value.as_list()),
        };
        Ok(criterion)
    }

    fn equal(&self, property_name: &str, value: &MatchValue) -> Result<Criterion, LifeError> {
        let eq = Criterion::eq(property_name, value.as_scalar());
        if self.is_ignore_case(property_name)? {
            Ok(eq.ignore_case())
        } else {
            Ok(eq)
        }
    }

    /// Whether the accessor at the end of `path` is marked for case-insensitive comparison.
    ///
    /// # Errors
    ///
    /// `Reflection` when a segment has no accessor or an intermediate segment is a scalar.
    pub fn is_ignore_case(&self, path: &str) -> Result<bool, LifeError> {
        let key = (std::ptr::from_ref(self.entity) as usize, path.to_string());
        if let Ok(cache) = IGNORE_CASE.lock() {
            if let Some(hit) = cache.get(&key) {
                return Ok(*hit);
            }
        }

        let resolved = self.walk_ignore_case(path)?;
        if let Ok(mut cache) = IGNORE_CASE.lock() {
            cache.insert(key, resolved);
        }
        Ok(resolved)
    }

    fn walk_ignore_case(&self, path: &str) -> Result<bool, LifeError> {
        let mut owner = self.entity;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let accessor = owner.accessor(&accessor_name(segment))?;
            if segments.peek().is_none() {
                return Ok(accessor.ignore_case);
            }
            owner = accessor.return_type().ok_or_else(|| {
                LifeError::Reflection(format!(
                    "{}() on {} returns a scalar; cannot resolve {path}",
                    accessor_name(segment),
                    owner.name
                ))
            })?;
        }
        Ok(false)
    }
}
