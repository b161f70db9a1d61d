use sqlx::{Postgres, QueryBuilder};

use super::{
    filter::{Condition, Predicate},
    page::Page,
    sort::Direction,
};

/// Appends ` WHERE ...` for a non-empty predicate. Values are always bound.
pub fn push_where(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    if predicate.is_empty() {
        return;
    }
    for (i, condition) in predicate.conditions().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::ILike { column, pattern } => {
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            Condition::AtOrAfter { column, at } => {
                qb.push(*column).push(" >= ").push_bind(*at);
            }
            Condition::AtOrBefore { column, at } => {
                qb.push(*column).push(" <= ").push_bind(*at);
            }
        }
    }
}

/// Appends ` ORDER BY ...`; `id` always breaks ties so pages never overlap.
pub fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, order: &[(&'static str, Direction)]) {
    qb.push(" ORDER BY ");
    if order.is_empty() {
        qb.push("created_at ASC, ");
    }
    for (column, direction) in order {
        qb.push(*column)
            .push(" ")
            .push(direction.as_sql())
            .push(", ");
    }
    qb.push("id ASC");
}

pub fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
}
