//! Parameters shared by QUERY, EXECUTE and BATCH requests.
pub mod query_flags;
pub mod query_params;
pub mod query_values;

pub use crate::query::query_flags::QueryFlags;
pub use crate::query::query_params::QueryParams;
pub use crate::query::query_values::QueryValues;
