//! Pagination, sorting and filtering parameters for admin list endpoints.
//!
//! [`Parameters`] is extracted once per request from the query string and
//! compiled into a parametrized `WHERE` fragment by [`FilterContext`].

pub mod dialect;
pub mod extract;
pub mod filter;
pub mod keys;
pub mod models;
pub mod pagination;
pub mod query;
pub mod sort;

pub use dialect::Delimiter;
pub use extract::{extract, extract_from_url, try_extract_from_url};
pub use filter::{FilterContext, JoinResolver, ValueSanitizer, WhereClause};
pub use keys::Operator;
pub use models::{ControlParams, FilterFields, ParameterConfig, Parameters};
pub use query::QueryValues;
pub use sort::SortType;
