use serde::Deserialize;

/// Request body for `POST /users/:user_id/todos`. A `user_id` in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Request body for `PUT /users/:user_id/todos/:todo_id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}
