//! Declarative property filters.
//!
//! A [`PropertyFilter`] names one or more property paths, a [`MatchType`] and a value.
//! Several names are OR-ed together. Filters can be built directly or parsed from the
//! `<MatchType><PropertyType>_<name>[_OR_<name>...]` naming convention used by search
//! forms, e.g. `LIKES_name_OR_email` or `GEI_age`.

use crate::executor::LifeError;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::Value;
use std::fmt;
use std::str::FromStr;

const OR_SEPARATOR: &str = "_OR_";

static FILTER_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(EQ|NE|LIKE|LE|LT|GE|GT|ISN|NN|IN)([A-Z])_(.+)$").expect("valid filter name regex")
});

/// How a property is compared with the filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    Eq,
    Ne,
    /// Substring match anywhere in a text value.
    Like,
    Le,
    Lt,
    Ge,
    Gt,
    /// Is null; the value is ignored.
    Isn,
    /// Is not null; the value is ignored.
    Nn,
    /// Membership in the value list.
    In,
}

impl MatchType {
    pub fn code(&self) -> &'static str {
        match self {
            MatchType::Eq => "EQ",
            MatchType::Ne => "NE",
            MatchType::Like => "LIKE",
            MatchType::Le => "LE",
            MatchType::Lt => "LT",
            MatchType::Ge => "GE",
            MatchType::Gt => "GT",
            MatchType::Isn => "ISN",
            MatchType::Nn => "NN",
            MatchType::In => "IN",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for MatchType {
    type Err = LifeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "EQ" => MatchType::Eq,
            "NE" => MatchType::Ne,
            "LIKE" => MatchType::Like,
            "LE" => MatchType::Le,
            "LT" => MatchType::Lt,
            "GE" => MatchType::Ge,
            "GT" => MatchType::Gt,
            "ISN" => MatchType::Isn,
            "NN" => MatchType::Nn,
            "IN" => MatchType::In,
            other => {
                return Err(LifeError::precondition(format!(
                    "unknown match type code {other:?}"
                )))
            }
        })
    }
}

/// Type a raw filter value is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// `S`
    String,
    /// `I`
    Integer,
    /// `L`
    Long,
    /// `N`
    Double,
    /// `D`, `YYYY-MM-DD`
    Date,
    /// `B`
    Boolean,
}

impl PropertyType {
    pub fn from_code(code: char) -> Result<Self, LifeError> {
        Ok(match code {
            'S' => PropertyType::String,
            'I' => PropertyType::Integer,
            'L' => PropertyType::Long,
            'N' => PropertyType::Double,
            'D' => PropertyType::Date,
            'B' => PropertyType::Boolean,
            other => {
                return Err(LifeError::precondition(format!(
                    "unknown property type code {other:?}"
                )))
            }
        })
    }

    /// Convert one raw textual value.
    pub fn convert(&self, raw: &str) -> Result<Value, LifeError> {
        let raw = raw.trim();
        let invalid = |e: &dyn fmt::Display| {
            LifeError::ParseError(format!("cannot convert {raw:?} to {self:?}: {e}"))
        };
        Ok(match self {
            PropertyType::String => Value::from(raw.to_string()),
            PropertyType::Integer => Value::from(raw.parse::<i32>().map_err(|e| invalid(&e))?),
            PropertyType::Long => Value::from(raw.parse::<i64>().map_err(|e| invalid(&e))?),
            PropertyType::Double => Value::from(raw.parse::<f64>().map_err(|e| invalid(&e))?),
            PropertyType::Date => Value::from(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| invalid(&e))?,
            ),
            PropertyType::Boolean => Value::from(raw.parse::<bool>().map_err(|e| invalid(&e))?),
        })
    }
}

/// The value side of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    /// No value, as used by `ISN`/`NN`.
    None,
    Scalar(Value),
    /// Ordered values for `IN`.
    List(Vec<Value>),
}

impl MatchValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        MatchValue::Scalar(value.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        MatchValue::List(values.into_iter().map(Into::into).collect())
    }

    /// The value as an ordered sequence; a scalar becomes a one-element list.
    pub fn as_list(&self) -> Vec<Value> {
        match self {
            MatchValue::None => Vec::new(),
            MatchValue::Scalar(v) => vec![v.clone()],
            MatchValue::List(values) => values.clone(),
        }
    }

    /// The scalar value; lists yield their first element.
    pub fn as_scalar(&self) -> Value {
        match self {
            MatchValue::Scalar(v) => v.clone(),
            MatchValue::List(values) => values
                .first()
                .cloned()
                .unwrap_or(Value::String(None)),
            MatchValue::None => Value::String(None),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MatchValue::Scalar(Value::String(Some(s))) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Short name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            MatchValue::None => "none",
            MatchValue::List(_) => "list",
            MatchValue::Scalar(v) => match v {
                Value::Bool(_) => "bool",
                Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) => "integer",
                Value::BigInt(_) => "long",
                Value::TinyUnsigned(_)
                | Value::SmallUnsigned(_)
                | Value::Unsigned(_)
                | Value::BigUnsigned(_) => "unsigned",
                Value::Float(_) | Value::Double(_) => "double",
                Value::String(_) | Value::Char(_) => "string",
                _ => "other",
            },
        }
    }
}

impl From<Value> for MatchValue {
    fn from(value: Value) -> Self {
        MatchValue::Scalar(value)
    }
}

impl From<Vec<Value>> for MatchValue {
    fn from(values: Vec<Value>) -> Self {
        MatchValue::List(values)
    }
}

macro_rules! scalar_match_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for MatchValue {
                fn from(value: $ty) -> Self {
                    MatchValue::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_match_value!(bool, i32, i64, f64, &str, String, NaiveDate);

impl From<()> for MatchValue {
    fn from(_: ()) -> Self {
        MatchValue::None
    }
}

/// One predicate descriptor: property names, comparison and value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    property_names: Vec<String>,
    match_type: MatchType,
    match_value: MatchValue,
}

impl PropertyFilter {
    /// Filter on a single property path.
    pub fn new(
        property_name: impl Into<String>,
        match_type: MatchType,
        match_value: impl Into<MatchValue>,
    ) -> Self {
        Self {
            property_names: vec![property_name.into()],
            match_type,
            match_value: match_value.into(),
        }
    }

    /// Filter matching when any of `property_names` matches.
    pub fn any<I, S>(property_names: I, match_type: MatchType, match_value: impl Into<MatchValue>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            property_names: property_names.into_iter().map(Into::into).collect(),
            match_type,
            match_value: match_value.into(),
        }
    }

    /// Parse a filter name such as `LIKES_name_OR_email` with its raw value.
    ///
    /// `IN` filters split the value on commas.
    ///
    /// ```
    /// use lifeguard_dao::filter::{MatchType, PropertyFilter};
    ///
    /// let filter = PropertyFilter::parse("LIKES_firstName_OR_lastName", "smi").unwrap();
    /// assert_eq!(filter.match_type(), MatchType::Like);
    /// assert_eq!(filter.property_names(), ["firstName", "lastName"]);
    /// ```
    pub fn parse(filter_name: &str, value: &str) -> Result<Self, LifeError> {
        let caps = FILTER_NAME.captures(filter_name).ok_or_else(|| {
            LifeError::precondition(format!(
                "filter name {filter_name:?} does not follow <MatchType><PropertyType>_<name>"
            ))
        })?;

        let match_type = caps[1].parse::<MatchType>()?;
        let property_type = caps[2]
            .chars()
            .next()
            .ok_or_else(|| LifeError::precondition("missing property type code"))
            .and_then(PropertyType::from_code)?;

        let property_names: Vec<String> = caps[3]
            .split(OR_SEPARATOR)
            .map(str::to_string)
            .collect();
        if property_names.iter().any(|n| n.trim().is_empty()) {
            return Err(LifeError::precondition(format!(
                "filter name {filter_name:?} has an empty property name"
            )));
        }

        let match_value = match match_type {
            MatchType::Isn | MatchType::Nn => MatchValue::None,
            MatchType::In => MatchValue::List(
                value
                    .split(',')
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| property_type.convert(v))
                    .collect::<Result<_, _>>()?,
            ),
            _ => MatchValue::Scalar(property_type.convert(value)?),
        };

        Ok(Self {
            property_names,
            match_type,
            match_value,
        })
    }

    /// Collect filters from request parameters named `<prefix>_<filterName>`.
    ///
    /// Parameters with blank values are skipped, except for `ISN`/`NN` filters which take
    /// no value.
    pub fn from_params<'a, I>(params: I, prefix: &str) -> Result<Vec<Self>, LifeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let prefix = format!("{prefix}_");
        let mut filters = Vec::new();
        for (name, value) in params {
            let Some(filter_name) = name.strip_prefix(&prefix) else {
                continue;
            };
            let valueless = filter_name.starts_with("ISN") || filter_name.starts_with("NN");
            if value.trim().is_empty() && !valueless {
                continue;
            }
            filters.push(Self::parse(filter_name, value)?);
        }
        Ok(filters)
    }

    /// The first property name.
    pub fn property_name(&self) -> &str {
        self.property_names.first().map(String::as_str).unwrap_or("")
    }

    pub fn property_names(&self) -> &[String] {
        &self.property_names
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn match_value(&self) -> &MatchValue {
        &self.match_value
    }

    pub fn has_multi_properties(&self) -> bool {
        self.property_names.len() > 1
    }
}
