use crate::error::AppError;

pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Turns the 1-based `page` and `limit` parameters into limit/offset.
pub fn parse(
    page: Option<&str>,
    limit: Option<&str>,
    limits: PageLimits,
) -> Result<Page, AppError> {
    let page = positive("page", page)?.unwrap_or(1);
    let limit = positive("limit", limit)?.unwrap_or(limits.default_limit);
    if limit > limits.max_limit {
        return Err(AppError::InvalidPagination {
            param: "limit",
            reason: format!("must not exceed {}", limits.max_limit),
        });
    }
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::InvalidPagination {
            param: "page",
            reason: "out of range".into(),
        })?;
    Ok(Page { limit, offset })
}

fn positive(param: &'static str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(AppError::InvalidPagination {
            param,
            reason: format!("`{raw}` is not a positive integer"),
        }),
    }
}
