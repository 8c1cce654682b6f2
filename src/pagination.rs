//! Query strings for pagination links, plus offset/limit arithmetic.
//!
//! Links carry the sort, page size, visible columns and every filter field of
//! the current request so that moving between pages keeps the listing as the
//! user left it. Keys are emitted in sorted order, form-urlencoded.

use axum::http::header::{CONTENT_RANGE, HeaderMap};
use std::collections::BTreeMap;
use url::form_urlencoded;

use crate::keys::{COLUMNS, DETAIL_PK, EDIT_PK, PAGE, PAGE_SIZE, SORT, SORT_TYPE};
use crate::models::Parameters;

/// Link parameters keyed and ordered the way they are encoded.
pub type LinkParams = BTreeMap<String, String>;

impl Parameters {
    /// Everything a pagination link carries except the page itself.
    ///
    /// The edit and detail primary keys are left out; they address a single
    /// row and must not follow the user to another page.
    #[must_use]
    pub fn fixed_params(&self) -> LinkParams {
        let mut params = self.fields_for_link();
        params.insert(SORT.to_string(), self.sort_field.clone());
        params.insert(PAGE_SIZE.to_string(), self.page_size.clone());
        params.insert(SORT_TYPE.to_string(), self.sort_type.to_string());
        params
    }

    /// Fixed parameters and the current page, without the leading `?`.
    #[must_use]
    pub fn join(&self) -> String {
        self.encode_with_page(self.fixed_params(), &self.page)
    }

    /// Link to the current page.
    #[must_use]
    pub fn route_param_str(&self) -> String {
        format!("?{}", self.join())
    }

    /// Link to the current page that lets the target pick its own page size.
    #[must_use]
    pub fn route_param_str_without_page_size(&self) -> String {
        let mut params = self.fixed_params();
        params.remove(PAGE_SIZE);
        format!("?{}", self.encode_with_page(params, &self.page))
    }

    #[must_use]
    pub fn next_page_route_param_str(&self) -> String {
        let page = self.page_int.saturating_add(1).to_string();
        format!("?{}", self.encode_with_page(self.fixed_params(), &page))
    }

    /// Link to the previous page. Page `0` stays at `0`.
    #[must_use]
    pub fn last_page_route_param_str(&self) -> String {
        let page = self.page_int.saturating_sub(1).to_string();
        format!("?{}", self.encode_with_page(self.fixed_params(), &page))
    }

    /// Rows to skip for the current page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page_int
            .saturating_sub(1)
            .saturating_mul(self.page_size_int)
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.page_size_int
    }

    /// `Content-Range` header for the current page of `total_count` rows.
    #[must_use]
    pub fn content_range(&self, total_count: u64, resource_name: &str) -> HeaderMap {
        calculate_content_range(self.offset(), self.limit(), total_count, resource_name)
    }

    fn fields_for_link(&self) -> LinkParams {
        let mut params: LinkParams = self
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != EDIT_PK && key.as_str() != DETAIL_PK)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !self.columns.is_empty() {
            params.insert(COLUMNS.to_string(), self.columns.join(","));
        }
        params
    }

    fn encode_with_page(&self, mut params: LinkParams, page: &str) -> String {
        params.insert(PAGE.to_string(), page.to_string());
        encode(&params)
    }
}

/// Form-urlencode `params` in key order.
#[must_use]
pub fn encode(params: &LinkParams) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

/// Strip characters that cannot appear in a header value.
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Build a `Content-Range` header of the form `users 0-9/100`.
///
/// A page starting past the last row (including any page of an empty
/// result) is reported as `users */<total>`.
#[must_use]
pub fn calculate_content_range(
    offset: u64,
    limit: u64,
    total_count: u64,
    resource_name: &str,
) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    let range = if offset >= total_count || limit == 0 {
        format!("{safe_name} */{total_count}")
    } else {
        let last = offset
            .saturating_add(limit - 1)
            .min(total_count - 1);
        format!("{safe_name} {offset}-{last}/{total_count}")
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = range.parse() {
        headers.insert(CONTENT_RANGE, value);
    }
    headers
}
