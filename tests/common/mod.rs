//! In-memory session over fixture users.
//!
//! Structured queries are validated by rendering them (so unresolvable paths fail exactly
//! as they would against PostgreSQL) and then evaluated against the fixtures. Every
//! executed statement is recorded.

#![allow(dead_code)]

use lifeguard_dao::criteria::{Criterion, DetachedCriteria, Projection};
use lifeguard_dao::entity::{EntityMetadata, LifeEntity, PropertyMeta};
use lifeguard_dao::query::TextQuery;
use lifeguard_dao::{LifeError, LifeSession, ListSession};
use sea_query::Value;
use std::cell::RefCell;
use std::cmp::Ordering;

pub static PROFILE: EntityMetadata = EntityMetadata::new(
    "Profile",
    "profiles",
    "id",
    &[PropertyMeta::basic("id", "id"), PropertyMeta::basic("city", "city")],
);

pub static USER: EntityMetadata = EntityMetadata::new(
    "User",
    "users",
    "id",
    &[
        PropertyMeta::basic("id", "id"),
        PropertyMeta::basic("name", "name").ignore_case(),
        PropertyMeta::basic("firstName", "first_name"),
        PropertyMeta::basic("lastName", "last_name"),
        PropertyMeta::basic("age", "age"),
        PropertyMeta::basic("role", "role").ignore_case(),
        PropertyMeta::basic("email", "email"),
        PropertyMeta::association("profile", &PROFILE, "profile_id", "id"),
    ],
);

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub role: String,
    pub email: Option<String>,
    pub city: Option<String>,
}

impl LifeEntity for User {
    fn metadata() -> &'static EntityMetadata {
        &USER
    }
}

impl User {
    pub fn new(id: i64, name: &str, age: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            first_name: name.to_string(),
            last_name: String::new(),
            age,
            role: "user".to_string(),
            email: None,
            city: None,
        }
    }

    pub fn last_name(mut self, last_name: &str) -> Self {
        self.last_name = last_name.to_string();
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    fn value(&self, path: &str) -> Value {
        match path {
            "id" => Value::BigInt(Some(self.id)),
            "name" => Value::String(Some(self.name.clone())),
            "firstName" => Value::String(Some(self.first_name.clone())),
            "lastName" => Value::String(Some(self.last_name.clone())),
            "age" => Value::Int(Some(self.age)),
            "role" => Value::String(Some(self.role.clone())),
            "email" => Value::String(self.email.clone()),
            "profile.city" => Value::String(self.city.clone()),
            "profile.id" => Value::BigInt(self.city.as_ref().map(|_| self.id)),
            _ => Value::String(None),
        }
    }
}

/// `count` users named `user00`, `user01`, ... aged 20 upwards.
pub fn numbered_users(count: usize) -> Vec<User> {
    (0..count)
        .map(|i| User::new(i as i64, &format!("user{i:02}"), 20 + i as i32))
        .collect()
}

/// What the session saw when a structured count ran.
#[derive(Debug, Clone, PartialEq)]
pub struct CountSnapshot {
    pub orders: usize,
    pub projection: Option<Projection>,
}

pub struct MemorySession {
    users: Vec<User>,
    pub statements: RefCell<Vec<String>>,
    pub counts: RefCell<Vec<CountSnapshot>>,
}

impl MemorySession {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            statements: RefCell::new(Vec::new()),
            counts: RefCell::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    fn matching(&self, criteria: &DetachedCriteria) -> Result<Vec<User>, LifeError> {
        let (sql, _) = criteria.to_sql()?;
        self.statements.borrow_mut().push(sql);

        let mut rows = Vec::new();
        for user in &self.users {
            if criteria.predicates().iter().all(|c| matches(user, c)) {
                rows.push(user.clone());
            }
        }
        Ok(rows)
    }
}

impl LifeSession for MemorySession {
    fn scalar(&self, criteria: &DetachedCriteria) -> Result<Option<i64>, LifeError> {
        self.counts.borrow_mut().push(CountSnapshot {
            orders: criteria.orders().len(),
            projection: criteria.projection().cloned(),
        });
        if criteria.projection() != Some(&Projection::RowCount) {
            return Err(LifeError::QueryError("scalar needs a row count".to_string()));
        }
        Ok(Some(self.matching(criteria)?.len() as i64))
    }

    fn scalar_text(&self, query: &TextQuery) -> Result<Option<i64>, LifeError> {
        self.statements.borrow_mut().push(query.sql().to_string());
        if query.sql().contains("missing_table") {
            return Err(LifeError::QueryError(
                "relation \"missing_table\" does not exist".to_string(),
            ));
        }
        Ok(Some(self.users.len() as i64))
    }
}

impl ListSession<User> for MemorySession {
    fn list(&self, criteria: &DetachedCriteria) -> Result<Vec<User>, LifeError> {
        let mut rows = self.matching(criteria)?;
        rows.sort_by(|a, b| {
            criteria
                .orders()
                .iter()
                .map(|o| {
                    let ord = compare(&a.value(&o.property), &b.value(&o.property))
                        .unwrap_or(Ordering::Equal);
                    if o.ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(window(rows, criteria.first_result(), criteria.max_results()))
    }

    fn list_text(&self, query: &TextQuery) -> Result<Vec<User>, LifeError> {
        let (sql, _) = query.to_postgres()?;
        self.statements.borrow_mut().push(sql);
        Ok(window(
            self.users.clone(),
            query.first_result(),
            query.max_results(),
        ))
    }
}

/// Text rows for non-entity paging.
impl ListSession<String> for MemorySession {
    fn list(&self, criteria: &DetachedCriteria) -> Result<Vec<String>, LifeError> {
        Ok(ListSession::<User>::list(self, criteria)?
            .into_iter()
            .map(|u| u.name)
            .collect())
    }

    fn list_text(&self, query: &TextQuery) -> Result<Vec<String>, LifeError> {
        Ok(ListSession::<User>::list_text(self, query)?
            .into_iter()
            .map(|u| u.name)
            .collect())
    }
}

fn window<X>(rows: Vec<X>, first: Option<u64>, max: Option<u64>) -> Vec<X> {
    let skip = first.unwrap_or(0) as usize;
    let take = max.map_or(usize::MAX, |m| m as usize);
    rows.into_iter().skip(skip).take(take).collect()
}

fn matches(user: &User, criterion: &Criterion) -> bool {
    match criterion {
        Criterion::Or(children) => children.iter().any(|c| matches(user, c)),
        Criterion::Eq {
            property,
            value,
            ignore_case,
        } => equals(&user.value(property), value, *ignore_case),
        Criterion::Ne { property, value } => !equals(&user.value(property), value, false),
        Criterion::Like {
            property,
            value,
            ignore_case,
        } => match user.value(property) {
            Value::String(Some(s)) if *ignore_case => {
                s.to_lowercase().contains(&value.to_lowercase())
            }
            Value::String(Some(s)) => s.contains(value.as_str()),
            _ => false,
        },
        Criterion::Le { property, value } => {
            matches!(compare(&user.value(property), value), Some(Ordering::Less | Ordering::Equal))
        }
        Criterion::Lt { property, value } => {
            compare(&user.value(property), value) == Some(Ordering::Less)
        }
        Criterion::Ge { property, value } => matches!(
            compare(&user.value(property), value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Criterion::Gt { property, value } => {
            compare(&user.value(property), value) == Some(Ordering::Greater)
        }
        Criterion::IsNull { property } => is_null(&user.value(property)),
        Criterion::IsNotNull { property } => !is_null(&user.value(property)),
        Criterion::In { property, values } => {
            let actual = user.value(property);
            values.iter().any(|v| equals(&actual, v, false))
        }
    }
}

fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::String(None) | Value::Int(None) | Value::BigInt(None) | Value::Bool(None)
    )
}

fn equals(actual: &Value, expected: &Value, ignore_case: bool) -> bool {
    match (actual, expected) {
        (Value::String(Some(a)), Value::String(Some(b))) if ignore_case => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => compare(actual, expected) == Some(Ordering::Equal),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(Some(a)), Value::String(Some(b))) => Some(a.cmp(b)),
        (Value::Bool(Some(a)), Value::Bool(Some(b))) => Some(a.cmp(b)),
        _ => Some(as_i64(a)?.cmp(&as_i64(b)?)),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(Some(i)) => Some(i64::from(*i)),
        Value::BigInt(Some(i)) => Some(*i),
        _ => None,
    }
}
