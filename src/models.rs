use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::keys::{
    self, IS_ALL, OPERATOR_SUFFIX, Operator, PRIMARY_KEY, RANGE_END_SUFFIX, RANGE_START_SUFFIX,
};
use crate::sort::SortType;

/// Filter fields in the order they appeared in the query string.
pub type FilterFields = IndexMap<String, String>;

/// Caller defaults applied while extracting [`Parameters`].
///
/// Deserializes from the host application's configuration; missing keys
/// take the defaults below.
///
/// ```toml
/// [list]
/// default_page_size = 25
/// primary_key = "uuid"
/// default_sort_type = "asc"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterConfig {
    /// Page size used when `__pageSize` is missing. Default `10`.
    pub default_page_size: u64,
    /// Sort field used when `__sort` is missing. Default `"id"`.
    pub primary_key: String,
    /// Sort direction used when `__sort_type` is missing. Default `desc`.
    pub default_sort_type: SortType,
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            primary_key: "id".to_string(),
            default_sort_type: SortType::Desc,
        }
    }
}

impl ParameterConfig {
    #[must_use]
    pub fn new(default_page_size: u64) -> Self {
        Self {
            default_page_size,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    #[must_use]
    pub fn with_default_sort_type(mut self, sort_type: SortType) -> Self {
        self.default_sort_type = sort_type;
        self
    }
}

/// Pagination, sorting and filter state of one list request.
///
/// Built once per request by [`extract`](crate::extract::extract). Every
/// field is owned, so cloning a descriptor never shares its filter map; the
/// mutators consume `self` and hand back the updated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameters {
    pub(crate) page: String,
    pub(crate) page_int: u64,
    pub(crate) page_size: String,
    pub(crate) page_size_int: u64,
    pub(crate) sort_field: String,
    pub(crate) sort_type: SortType,
    pub(crate) columns: Vec<String>,
    pub(crate) animation: bool,
    pub(crate) url_path: String,
    pub(crate) fields: FilterFields,
}

impl Parameters {
    /// Minimal descriptor used when a request URL is unusable: page `1`,
    /// page size `1`, no filters.
    #[must_use]
    pub fn baseline() -> Self {
        Self {
            page: "1".to_string(),
            page_int: 1,
            page_size: "1".to_string(),
            page_size_int: 1,
            sort_field: String::new(),
            sort_type: SortType::default(),
            columns: Vec::new(),
            animation: true,
            url_path: String::new(),
            fields: FilterFields::new(),
        }
    }

    /// Page number as sent by the client.
    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Page number as an integer, `0` when it did not parse.
    #[must_use]
    pub const fn page_int(&self) -> u64 {
        self.page_int
    }

    #[must_use]
    pub fn page_size(&self) -> &str {
        &self.page_size
    }

    #[must_use]
    pub const fn page_size_int(&self) -> u64 {
        self.page_size_int
    }

    #[must_use]
    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    #[must_use]
    pub const fn sort_type(&self) -> SortType {
        self.sort_type
    }

    /// Requested visible columns, empty when the client did not choose.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn animation(&self) -> bool {
        self.animation
    }

    #[must_use]
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// Raw filter fields, ready for [`FilterContext::compile`](crate::FilterContext::compile).
    #[must_use]
    pub const fn fields(&self) -> &FilterFields {
        &self.fields
    }

    #[must_use]
    pub fn field_value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Value of the range lower bound for `field`.
    #[must_use]
    pub fn filter_field_value_start(&self, field: &str) -> Option<&str> {
        self.field_value(&format!("{field}{RANGE_START_SUFFIX}"))
    }

    /// Value of the range upper bound for `field`.
    #[must_use]
    pub fn filter_field_value_end(&self, field: &str) -> Option<&str> {
        self.field_value(&format!("{field}{RANGE_END_SUFFIX}"))
    }

    /// Operator selected for `field`. Unset or empty selects
    /// [`Operator::Eq`]; an unrecognized token yields `None`.
    #[must_use]
    pub fn field_operator(&self, field: &str, index_suffix: &str) -> Option<Operator> {
        field_operator(&self.fields, field, index_suffix)
    }

    /// Set the current page, keeping both representations in step.
    #[must_use]
    pub fn set_page(mut self, page: impl Into<String>) -> Self {
        self.page = page.into();
        self.page_int = parse_int(&self.page);
        self
    }

    /// Attach a primary key selection, stored comma joined under `pk`.
    #[must_use]
    pub fn with_pk<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.fields.insert(PRIMARY_KEY.to_string(), joined);
        self
    }

    /// Primary keys attached with [`with_pk`](Self::with_pk).
    #[must_use]
    pub fn pk(&self) -> Vec<&str> {
        self.field_value(PRIMARY_KEY)
            .map(|ids| ids.split(',').collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn with_is_all(mut self, is_all: bool) -> Self {
        let flag = if is_all { keys::TRUE } else { keys::FALSE };
        self.fields.insert(IS_ALL.to_string(), flag.to_string());
        self
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.field_value(IS_ALL) == Some(keys::TRUE)
    }
}

pub(crate) fn field_operator(
    fields: &FilterFields,
    field: &str,
    index_suffix: &str,
) -> Option<Operator> {
    match fields.get(&format!("{field}{OPERATOR_SUFFIX}{index_suffix}")) {
        None => Some(Operator::Eq),
        Some(token) if token.is_empty() => Some(Operator::Eq),
        Some(token) => Operator::from_token(token),
    }
}

/// Integer form of a page number; anything unparseable is `0`.
pub(crate) fn parse_int(value: &str) -> u64 {
    value.parse().unwrap_or(0)
}

/// Control parameters understood by list endpoints.
///
/// Not used for extraction (filters are free-form keys); this exists so the
/// reserved names show up in generated `OpenAPI` documents.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ControlParams {
    /// Page number, 1-based.
    #[serde(rename = "__page")]
    #[param(example = "1")]
    pub page: Option<String>,
    /// Rows per page.
    #[serde(rename = "__pageSize")]
    #[param(example = "10")]
    pub page_size: Option<String>,
    /// Column to sort by.
    #[serde(rename = "__sort")]
    #[param(example = "id")]
    pub sort: Option<String>,
    /// Sort direction, `asc` or `desc`.
    #[serde(rename = "__sort_type")]
    #[param(example = "desc")]
    pub sort_type: Option<String>,
    /// Comma separated visible columns.
    #[serde(rename = "__columns")]
    #[param(example = "id,name")]
    pub columns: Option<String>,
    /// Disable page animation when `true`.
    #[serde(rename = "__go_admin_no_animation_")]
    #[param(example = "true")]
    pub no_animation: Option<String>,
}
