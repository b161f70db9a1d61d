use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Parses `field[:asc|desc],...`, first item being the primary key.
///
/// Field names are not checked here; see [`resolve`].
pub fn parse(raw: Option<&str>) -> Result<Vec<SortKey>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut keys = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (field, direction) = match item.split_once(':') {
            Some((field, dir)) => (field.trim(), parse_direction(dir.trim())?),
            None => (item, Direction::Asc),
        };
        if field.is_empty() {
            return Err(AppError::invalid_filter(
                "sort",
                format!("`{item}` has no field name"),
            ));
        }
        keys.push(SortKey::new(field, direction));
    }
    Ok(keys)
}

fn parse_direction(raw: &str) -> Result<Direction, AppError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("asc") {
        Ok(Direction::Asc)
    } else if raw.eq_ignore_ascii_case("desc") {
        Ok(Direction::Desc)
    } else {
        Err(AppError::invalid_filter(
            "sort",
            format!("unknown direction `{raw}`"),
        ))
    }
}

/// Maps sort fields onto columns using a store's `(field, column)` table.
pub fn resolve(
    keys: &[SortKey],
    columns: &[(&str, &'static str)],
) -> Result<Vec<(&'static str, Direction)>, AppError> {
    keys.iter()
        .map(|key| {
            columns
                .iter()
                .find(|(field, _)| *field == key.field)
                .map(|(_, column)| (*column, key.direction))
                .ok_or_else(|| {
                    AppError::invalid_filter("sort", format!("cannot sort by `{}`", key.field))
                })
        })
        .collect()
}
