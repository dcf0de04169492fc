//! Textual queries with positional (`?`) or named (`:name`) parameters.

use crate::executor::LifeError;
use sea_query::{Value, Values};
use std::collections::HashMap;

/// Parameters of a [`TextQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    Positional(Vec<Value>),
    Named(HashMap<String, Value>),
}

/// A user-supplied query string plus its parameters and row window.
///
/// ```
/// use lifeguard_dao::query::TextQuery;
/// use sea_query::Value;
///
/// let mut q = TextQuery::positional("from users u where u.age > ?", vec![Value::from(20)]);
/// q.set_first_result(20).set_max_results(10);
/// let (sql, _) = q.to_postgres().unwrap();
/// assert_eq!(sql, "SELECT * from users u where u.age > $1 LIMIT 10 OFFSET 20");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    sql: String,
    params: QueryParams,
    first_result: Option<u64>,
    max_results: Option<u64>,
}

impl TextQuery {
    pub fn positional(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params: QueryParams::Positional(values),
            first_result: None,
            max_results: None,
        }
    }

    pub fn named(sql: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self {
            sql: sql.into(),
            params: QueryParams::Named(values),
            first_result: None,
            max_results: None,
        }
    }

    /// The same parameters against another query text (used for count queries).
    pub fn with_sql(&self, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: self.params.clone(),
            first_result: None,
            max_results: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
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

    /// Rewrite to PostgreSQL: placeholders become `$n`, a leading `from` gets `SELECT *`,
    /// and the window becomes `LIMIT`/`OFFSET`.
    ///
    /// # Errors
    ///
    /// Returns `LifeError::QueryError` when the query references a parameter that was not
    /// supplied.
    pub fn to_postgres(&self) -> Result<(String, Values), LifeError> {
        let (body, values) = bind_placeholders(&self.sql, &self.params)?;

        let mut sql = if body.trim_start().get(..4).is_some_and(|s| s.eq_ignore_ascii_case("from")) {
            format!("SELECT * {}", body.trim_start())
        } else {
            body
        };
        if let Some(limit) = self.max_results {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.first_result {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok((sql, Values(values)))
    }
}

fn bind_placeholders(sql: &str, params: &QueryParams) -> Result<(String, Vec<Value>), LifeError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut values = Vec::new();
    let mut quote: Option<char> = None;
    let mut positional = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            '?' => {
                let QueryParams::Positional(args) = params else {
                    return Err(LifeError::QueryError(format!(
                        "positional parameter in a query bound by name: {sql}"
                    )));
                };
                let value = args.get(positional).ok_or_else(|| {
                    LifeError::QueryError(format!(
                        "missing value for positional parameter {} in: {sql}",
                        positional + 1
                    ))
                })?;
                positional += 1;
                values.push(value.clone());
                out.push_str(&format!("${}", values.len()));
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let QueryParams::Named(args) = params else {
                    return Err(LifeError::QueryError(format!(
                        "named parameter :{name} in a query bound by position: {sql}"
                    )));
                };
                let value = args.get(&name).ok_or_else(|| {
                    LifeError::QueryError(format!("missing value for named parameter :{name}"))
                })?;
                values.push(value.clone());
                out.push_str(&format!("${}", values.len()));
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, values))
}

/// Derive a count query from a textual query.
///
/// Everything before the first `from` is dropped, everything from the first `order by` on
/// is dropped, and the rest is prefixed with `select count(o) ` (or
/// `select count(distinct o) ` when the query mentions `distinct`). Keyword matching is
/// case-sensitive; a query without `from` yields a bare `select count(o) from `.
///
/// ```
/// use lifeguard_dao::query::prepare_count_query;
///
/// assert_eq!(
///     prepare_count_query("from User u order by u.name"),
///     "select count(o) from User u "
/// );
/// ```
pub fn prepare_count_query(query: &str) -> String {
    let from_clause = match query.find("from") {
        Some(idx) => &query[idx..],
        None => "from ",
    };
    let from_clause = match from_clause.find("order by") {
        Some(idx) => &from_clause[..idx],
        None => from_clause,
    };
    if query.contains("distinct") {
        format!("select count(distinct o) {from_clause}")
    } else {
        format!("select count(o) {from_clause}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_synthesis_cases() {
        let cases = [
            (
                "from User u where u.age > 20",
                "select count(o) from User u where u.age > 20",
            ),
            ("from User u order by u.name", "select count(o) from User u "),
            (
                "select distinct u from User u join u.roles r",
                "select count(distinct o) from User u join u.roles r",
            ),
            (
                "from User u where u.name like ? order by u.id desc",
                "select count(o) from User u where u.name like ? ",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(prepare_count_query(input), expected, "input: {input}");
        }
    }

    #[test]
    fn test_count_synthesis_is_case_sensitive() {
        assert_eq!(
            prepare_count_query("SELECT * FROM users"),
            "select count(o) from "
        );
        assert_eq!(
            prepare_count_query("select distinct name FROM users"),
            "select count(distinct o) from "
        );
    }

    #[test]
    fn test_positional_binding() {
        let q = TextQuery::positional(
            "select * from users where name like ? and age >= ?",
            vec![Value::from("%al%"), Value::from(18)],
        );
        let (sql, values) = q.to_postgres().unwrap();
        assert_eq!(sql, "select * from users where name like $1 and age >= $2");
        assert_eq!(values.0.len(), 2);
    }

    #[test]
    fn test_named_binding_skips_literals_and_casts() {
        let mut args = HashMap::new();
        args.insert("city".to_string(), Value::from("Lyon"));
        let q = TextQuery::named(
            "from users u where u.city = :city and u.note <> ':city?' and u.id::text = :city",
            args,
        );
        let (sql, values) = q.to_postgres().unwrap();
        assert_eq!(
            sql,
            "SELECT * from users u where u.city = $1 and u.note <> ':city?' and u.id::text = $2"
        );
        assert_eq!(values.0, vec![Value::from("Lyon"), Value::from("Lyon")]);
    }

    #[test]
    fn test_missing_parameter_is_reported() {
        let q = TextQuery::positional("from users where id = ?", vec![]);
        let err = q.to_postgres().unwrap_err();
        assert!(err.to_string().contains("missing value for positional parameter 1"));

        let q = TextQuery::named("from users where id = :id", HashMap::new());
        assert!(q.to_postgres().is_err());
    }

    #[test]
    fn test_window_and_with_sql() {
        let mut q = TextQuery::positional("from users u", vec![Value::from(1)]);
        q.set_first_result(0).set_max_results(5);
        assert_eq!(q.to_postgres().unwrap().0, "SELECT * from users u LIMIT 5 OFFSET 0");

        let count = q.with_sql("select count(o) from users u");
        assert_eq!(count.first_result(), None);
        assert_eq!(count.params(), q.params());
    }
}
