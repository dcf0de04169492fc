//! Value conversion utilities for SeaQuery to may_postgres.
//!
//! Every SeaQuery `Value` is converted to an owned, typed parameter first; the closure then
//! receives borrowed `ToSql` references that stay valid for its whole scope. NULLs keep
//! their SQL type (`Option<String>` for a text NULL, `Option<i64>` for a bigint NULL) so the
//! server accepts them against typed columns.

use crate::executor::LifeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use may_postgres::types::ToSql;
use sea_query::{Value, Values};

type Param = Box<dyn ToSql + Sync>;

/// Convert SeaQuery values to may_postgres ToSql parameters and run `f` with them.
///
/// # Errors
///
/// Returns `LifeError::Other` if an unsupported value type is encountered, or an unsigned
/// value does not fit the signed column type.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, LifeError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, LifeError>,
{
    let owned = values
        .iter()
        .map(to_param)
        .collect::<Result<Vec<Param>, LifeError>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
    f(&params)
}

fn to_param(value: &Value) -> Result<Param, LifeError> {
    let param: Param = match value {
        Value::Bool(v) => Box::new(*v),
        Value::TinyInt(v) => Box::new(v.map(i32::from)),
        Value::SmallInt(v) => Box::new(v.map(i32::from)),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i32::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(v) => {
            let signed = v
                .map(|u| {
                    i64::try_from(u).map_err(|_| {
                        LifeError::Other(format!(
                            "BigUnsigned value {} exceeds i64::MAX ({}), cannot be safely cast to i64",
                            u,
                            i64::MAX
                        ))
                    })
                })
                .transpose()?;
            Box::new(signed)
        }
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::Char(v) => Box::new(v.map(|c| c.to_string())),
        Value::String(v) => Box::new(v.as_ref().map(|s| String::clone(s))),
        Value::Bytes(v) => Box::new(v.as_ref().map(|b| Vec::<u8>::clone(b))),
        Value::Json(v) => {
            let text = v
                .as_ref()
                .map(|j| {
                    serde_json::to_string(&**j)
                        .map_err(|e| LifeError::Other(format!("Failed to serialize JSON: {}", e)))
                })
                .transpose()?;
            Box::new(text)
        }
        Value::ChronoDate(v) => Box::new(v.as_ref().map(|d| NaiveDate::clone(d))),
        Value::ChronoTime(v) => Box::new(v.as_ref().map(|t| NaiveTime::clone(t))),
        Value::ChronoDateTime(v) => Box::new(v.as_ref().map(|t| NaiveDateTime::clone(t))),
        Value::ChronoDateTimeUtc(v) => Box::new(v.as_ref().map(|t| DateTime::<Utc>::clone(t))),
        Value::Uuid(v) => Box::new(v.as_ref().map(|u| uuid::Uuid::clone(u))),
        _ => {
            return Err(LifeError::Other(format!(
                "Unsupported value type in query: {:?}",
                value
            )));
        }
    };
    Ok(param)
}
