use std::collections::HashMap;

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

use crate::error::AppError;

/// How a recognized query parameter constrains its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Case-insensitive LIKE; the value is used as the pattern verbatim.
    Pattern,
    /// `column >= value`
    Since,
    /// `column <= value`
    Until,
}

/// Binds a query parameter name to a column of one resource.
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    pub const fn new(param: &'static str, column: &'static str, kind: FilterKind) -> Self {
        Self {
            param,
            column,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    ILike {
        column: &'static str,
        pattern: String,
    },
    AtOrAfter {
        column: &'static str,
        at: OffsetDateTime,
    },
    AtOrBefore {
        column: &'static str,
        at: OffsetDateTime,
    },
}

/// Conjunction of conditions. Empty matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Builds the predicate for `params`, in the order `fields` lists them.
///
/// Parameters missing from `params` or given an empty value add nothing;
/// parameters not listed in `fields` are ignored.
pub fn build(
    fields: &[FilterField],
    params: &HashMap<String, String>,
) -> Result<Predicate, AppError> {
    let mut predicate = Predicate::default();
    for field in fields {
        let Some(raw) = params.get(field.param).filter(|v| !v.is_empty()) else {
            continue;
        };
        let condition = match field.kind {
            FilterKind::Pattern => Condition::ILike {
                column: field.column,
                pattern: check_pattern(field.param, raw)?,
            },
            FilterKind::Since => Condition::AtOrAfter {
                column: field.column,
                at: parse_timestamp(field.param, raw)?,
            },
            FilterKind::Until => Condition::AtOrBefore {
                column: field.column,
                at: parse_timestamp(field.param, raw)?,
            },
        };
        predicate = predicate.and(condition);
    }
    Ok(predicate)
}

/// Postgres refuses a LIKE pattern whose last character is an unpaired `\\`.
fn check_pattern(param: &str, raw: &str) -> Result<String, AppError> {
    let trailing = raw.chars().rev().take_while(|c| *c == '\\').count();
    if trailing % 2 == 1 {
        return Err(AppError::invalid_filter(
            param,
            "pattern must not end with an escape character",
        ));
    }
    Ok(raw.to_string())
}

/// Accepts an RFC 3339 date-time or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(param: &str, raw: &str) -> Result<OffsetDateTime, AppError> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(at);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| AppError::invalid_filter(param, format!("`{raw}` is not an ISO-8601 date")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const FIELDS: &[FilterField] = &[
        FilterField::new("title", "title", FilterKind::Pattern),
        FilterField::new("createdAfter", "created_at", FilterKind::Since),
        FilterField::new("createdBefore", "created_at", FilterKind::Until),
        FilterField::new("updatedAfter", "updated_at", FilterKind::Since),
        FilterField::new("updatedBefore", "updated_at", FilterKind::Until),
    ];

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_params_matches_everything() {
        let predicate = build(FIELDS, &HashMap::new()).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn title_alone_adds_one_pattern() {
        let predicate = build(FIELDS, &params(&[("title", "foo")])).unwrap();
        assert_eq!(
            predicate.conditions(),
            &[Condition::ILike {
                column: "title",
                pattern: "foo".into()
            }]
        );
    }

    #[test]
    fn wildcards_pass_through_unescaped() {
        let predicate = build(FIELDS, &params(&[("title", "%50\\_%")])).unwrap();
        assert_eq!(
            predicate.conditions(),
            &[Condition::ILike {
                column: "title",
                pattern: "%50\\_%".into()
            }]
        );
    }

    #[test]
    fn dangling_escape_is_rejected() {
        let err = build(FIELDS, &params(&[("title", "foo\\")])).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidFilter { ref param, .. } if param == "title"
        ));

        let predicate = build(FIELDS, &params(&[("title", "foo\\\\")])).unwrap();
        assert_eq!(
            predicate.conditions(),
            &[Condition::ILike {
                column: "title",
                pattern: "foo\\\\".into()
            }]
        );
    }

    #[test]
    fn created_bounds_target_created_at() {
        let predicate = build(
            FIELDS,
            &params(&[
                ("createdAfter", "2024-01-01T00:00:00Z"),
                ("createdBefore", "2024-02-01"),
            ]),
        )
        .unwrap();
        assert_eq!(
            predicate.conditions(),
            &[
                Condition::AtOrAfter {
                    column: "created_at",
                    at: datetime!(2024-01-01 0:00 UTC)
                },
                Condition::AtOrBefore {
                    column: "created_at",
                    at: datetime!(2024-02-01 0:00 UTC)
                },
            ]
        );
    }

    #[test]
    fn before_means_earlier_and_after_means_later() {
        let predicate = build(
            FIELDS,
            &params(&[
                ("updatedBefore", "2024-03-01T12:00:00+02:00"),
                ("updatedAfter", "2024-01-01T00:00:00Z"),
            ]),
        )
        .unwrap();
        assert!(predicate.conditions().contains(&Condition::AtOrBefore {
            column: "updated_at",
            at: datetime!(2024-03-01 10:00 UTC)
        }));
        assert!(predicate.conditions().contains(&Condition::AtOrAfter {
            column: "updated_at",
            at: datetime!(2024-01-01 0:00 UTC)
        }));
    }

    #[test]
    fn empty_values_and_unknown_params_are_ignored() {
        let predicate = build(FIELDS, &params(&[("title", ""), ("colour", "red")])).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn bad_date_names_the_parameter() {
        let err = build(FIELDS, &params(&[("updatedAfter", "last tuesday")])).unwrap_err();
        match err {
            AppError::InvalidFilter { param, .. } => assert_eq!(param, "updatedAfter"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
