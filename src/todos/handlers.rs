use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

use super::{
    dto::{CreateTodoRequest, UpdateTodoRequest},
    repo_types::Todo,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/todos", post(create_todo).get(list_todos))
        .route(
            "/users/:user_id/todos/:todo_id",
            put(update_todo).delete(delete_todo),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let Json(payload) = payload?;
    let todo = state.todos.create(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// The path user is validated but does not narrow the list.
#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Todo>>, AppError> {
    Ok(Json(state.todos.list(&params).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    Path((user_id, todo_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<Todo>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(state.todos.update(user_id, todo_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    Path((user_id, todo_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.todos.delete(user_id, todo_id).await?;
    Ok(StatusCode::OK)
}
