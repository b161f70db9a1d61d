use crate::{error::AppError, validation::Violations};

use super::{
    dto::{CreateTodoRequest, UpdateTodoRequest},
    repo_types::{TodoChanges, TodoStatus},
};

/// A create payload that passed every check; the owner comes from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodoInput {
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
}

pub fn validate_create(req: CreateTodoRequest) -> Result<NewTodoInput, AppError> {
    let mut v = Violations::default();
    v.require("title", req.title.as_deref());
    let status = check_status(&mut v, req.status.as_deref());
    v.finish()?;

    let Some(title) = req.title else {
        return Err(AppError::Validation(Vec::new()));
    };
    Ok(NewTodoInput {
        title,
        description: req.description,
        status: status.unwrap_or_default(),
    })
}

pub fn validate_update(req: UpdateTodoRequest) -> Result<TodoChanges, AppError> {
    let mut v = Violations::default();
    if let Some(title) = req.title.as_deref() {
        v.non_blank("title", title);
    }
    let status = check_status(&mut v, req.status.as_deref());
    v.finish()?;

    Ok(TodoChanges {
        title: req.title,
        description: req.description,
        status,
    })
}

fn check_status(v: &mut Violations, raw: Option<&str>) -> Option<TodoStatus> {
    let raw = raw?;
    let status = TodoStatus::parse(raw);
    if status.is_none() {
        v.add("status", "must be ACTIVE or ARCHIVED");
    }
    status
}
