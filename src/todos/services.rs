use std::{collections::HashMap, sync::Arc};

use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    query::{page::PageLimits, ListQuery},
};

use super::{
    dto::{CreateTodoRequest, UpdateTodoRequest},
    repo::{TodoStore, TODO_FILTERS},
    repo_types::{NewTodo, Todo},
    validation,
};

/// Todo lifecycle rules on top of a [`TodoStore`]. Writes are scoped to the owner.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    limits: PageLimits,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub async fn create(&self, owner: Uuid, req: CreateTodoRequest) -> Result<Todo, AppError> {
        let input = validation::validate_create(req)?;
        let todo = self
            .store
            .insert_todo(NewTodo {
                user_id: owner,
                title: input.title,
                description: input.description,
                status: input.status,
            })
            .await?;

        info!(todo_id = %todo.id, user_id = %owner, "todo created");
        Ok(todo)
    }

    /// Lists across all owners; only the query parameters narrow the result.
    pub async fn list(&self, params: &HashMap<String, String>) -> Result<Vec<Todo>, AppError> {
        let query = ListQuery::from_params(TODO_FILTERS, params, self.limits)?;
        self.store.list_todos(&query).await
    }

    pub async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        req: UpdateTodoRequest,
    ) -> Result<Todo, AppError> {
        let changes = validation::validate_update(req)?;
        let todo = self.store.update_owned_todo(owner, id, changes).await?;
        info!(todo_id = %id, user_id = %owner, "todo updated");
        Ok(todo)
    }

    pub async fn delete(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        self.store.delete_owned_todo(owner, id).await?;
        info!(todo_id = %id, user_id = %owner, "todo deleted");
        Ok(())
    }
}
