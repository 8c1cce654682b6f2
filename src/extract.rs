//! # Parameter extraction
//!
//! Turns the query string of a list request into [`Parameters`].
//!
//! ```rust,ignore
//! // GET /admin/info/users?__page=2&__sort=name&__sort_type=asc&name=al&name__goadmin_operator__=like
//! let params = extract_from_url(uri, &ParameterConfig::default(), true);
//! assert_eq!(params.page_int(), 2);
//! assert_eq!(params.field_value("name"), Some("al"));
//! ```
//!
//! Extraction never fails. Unparseable numbers become `0`, an unusable URL
//! yields [`Parameters::baseline`], and reserved control keys are kept out of
//! the filter fields.
//!
//! ## Axum
//!
//! `Parameters` is an axum extractor. Handlers pick up a [`ParameterConfig`]
//! from request extensions when one is installed:
//!
//! ```rust,ignore
//! async fn list_users(params: Parameters) -> impl IntoResponse { /* ... */ }
//!
//! let app = Router::new()
//!     .route("/users", get(list_users))
//!     .layer(Extension(ParameterConfig::new(25)));
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use url::Url;

use crate::keys::{
    self, COLUMNS, NO_ANIMATION, OPERATOR_SUFFIX, PAGE, PAGE_SIZE, SORT, SORT_TYPE, TRUE,
};
use crate::models::{FilterFields, ParameterConfig, Parameters, parse_int};
use crate::query::QueryValues;
use crate::sort::SortType;

/// Base for resolving path-only URLs such as `/admin/info/users?__page=2`.
const RELATIVE_BASE: &str = "http://localhost/";

/// Build the descriptor for one request.
#[must_use]
pub fn extract(path: &str, values: &QueryValues, config: &ParameterConfig) -> Parameters {
    let page = values.get_non_empty(PAGE).unwrap_or("1").to_string();
    let page_size = values
        .get_non_empty(PAGE_SIZE)
        .map_or_else(|| config.default_page_size.to_string(), str::to_string);
    let sort_field = values
        .get_non_empty(SORT)
        .unwrap_or(config.primary_key.as_str())
        .to_string();
    let sort_type = values
        .get_non_empty(SORT_TYPE)
        .map_or(config.default_sort_type, sort_type_override);
    let columns = values
        .get_non_empty(COLUMNS)
        .map(|columns| columns.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let animation = values.get(NO_ANIMATION) != Some(TRUE);

    Parameters {
        page_int: parse_int(&page),
        page,
        page_size_int: parse_int(&page_size),
        page_size,
        sort_field,
        sort_type,
        columns,
        animation,
        url_path: path.to_string(),
        fields: filter_fields(values),
    }
}

/// Invalid directions are normalized to `desc` rather than falling back to
/// the configured default.
fn sort_type_override(value: &str) -> SortType {
    SortType::parse(value).unwrap_or_else(|| {
        tracing::debug!(sort_type = %value, "Unrecognized sort direction, using desc");
        SortType::Desc
    })
}

fn filter_fields(values: &QueryValues) -> FilterFields {
    let mut fields = FilterFields::new();

    for (key, raw_values) in values.iter() {
        let Some(value) = raw_values.first().filter(|value| !value.is_empty()) else {
            continue;
        };
        if keys::is_reserved(key) {
            continue;
        }
        // An operator selector without a value for its field selects nothing.
        if key.contains(OPERATOR_SUFFIX)
            && values
                .get_non_empty(&key.replace(OPERATOR_SUFFIX, ""))
                .is_none()
        {
            tracing::trace!(key = %key, "Dropping operator selector without a value");
            continue;
        }
        fields.insert(key.to_string(), value.clone());
    }

    fields
}

/// Parse `url` (absolute or path-only) and extract its parameters.
///
/// # Errors
///
/// Returns the [`url::ParseError`] when `url` cannot be parsed.
pub fn try_extract_from_url(
    url: &str,
    config: &ParameterConfig,
) -> Result<Parameters, url::ParseError> {
    let url = parse_url(url)?;
    let values = url.query_pairs().collect::<QueryValues>();
    Ok(extract(url.path(), &values, config))
}

/// Extract parameters from a raw URL string.
///
/// Returns [`Parameters::baseline`] when `should_extract` is false or the URL
/// does not parse.
#[must_use]
pub fn extract_from_url(url: &str, config: &ParameterConfig, should_extract: bool) -> Parameters {
    if !should_extract {
        return Parameters::baseline();
    }
    try_extract_from_url(url, config).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "Unparseable list URL, using baseline parameters");
        Parameters::baseline()
    })
}

fn parse_url(raw: &str) -> Result<Url, url::ParseError> {
    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(RELATIVE_BASE)?;
            Url::options().base_url(Some(&base)).parse(raw)
        }
        parsed => parsed,
    }
}

impl<S> FromRequestParts<S> for Parameters
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let values = parts.uri.query().map(QueryValues::parse).unwrap_or_default();
        let params = match parts.extensions.get::<ParameterConfig>() {
            Some(config) => extract(parts.uri.path(), &values, config),
            None => extract(parts.uri.path(), &values, &ParameterConfig::default()),
        };
        Ok(params)
    }
}
