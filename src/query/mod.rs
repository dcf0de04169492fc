//! Textual queries.
//!
//! - **Text**: [`TextQuery`] with positional or named binding, and
//!   [`prepare_count_query`], the best-effort count synthesis used by auto-count
//! - **Value Conversion**: SeaQuery `Value` to `ToSql` parameter conversion

pub mod text;
pub mod value_conversion;

pub use text::{prepare_count_query, QueryParams, TextQuery};
pub use value_conversion::with_converted_params;
