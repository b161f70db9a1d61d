//! Translation of untyped list query parameters into store queries.
//!
//! [`filter`] builds the predicate, [`sort`] the ordering, [`page`] the
//! limit/offset window; [`sql`] renders all three for PostgreSQL.

pub mod filter;
pub mod page;
pub mod sort;
pub mod sql;

use std::collections::HashMap;

use crate::error::AppError;

use self::{
    filter::{FilterField, Predicate},
    page::{Page, PageLimits},
    sort::SortKey,
};

/// Everything a store needs to answer one list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub page: Page,
}

impl ListQuery {
    /// Fails before any store call if a filter, `sort`, `page` or `limit` is malformed.
    pub fn from_params(
        fields: &[FilterField],
        params: &HashMap<String, String>,
        limits: PageLimits,
    ) -> Result<Self, AppError> {
        Ok(Self {
            predicate: filter::build(fields, params)?,
            sort: sort::parse(params.get("sort").map(String::as_str))?,
            page: page::parse(
                params.get("page").map(String::as_str),
                params.get("limit").map(String::as_str),
                limits,
            )?,
        })
    }
}
