use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    query::{
        filter::{FilterField, FilterKind},
        sort, sql, ListQuery,
    },
};

use super::repo_types::{NewTodo, Todo, TodoChanges};

/// Query parameters `GET /users/:user_id/todos` understands.
pub const TODO_FILTERS: &[FilterField] = &[
    FilterField::new("title", "title", FilterKind::Pattern),
    FilterField::new("description", "description", FilterKind::Pattern),
    FilterField::new("createdAfter", "created_at", FilterKind::Since),
    FilterField::new("createdBefore", "created_at", FilterKind::Until),
    FilterField::new("updatedAfter", "updated_at", FilterKind::Since),
    FilterField::new("updatedBefore", "updated_at", FilterKind::Until),
];

pub const TODO_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("title", "title"),
    ("description", "description"),
    ("status", "status"),
    ("user_id", "user_id"),
    ("userId", "user_id"),
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
    ("updatedAt", "updated_at"),
    ("updated_at", "updated_at"),
];

const TODO_COLUMNS: &str = "id, title, description, status, user_id, created_at, updated_at";

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// `NotFound("user")` when the owner does not exist.
    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo, AppError>;

    async fn list_todos(&self, query: &ListQuery) -> Result<Vec<Todo>, AppError>;

    /// Touches the row only if both `owner` and `id` match; otherwise `NotFound("todo")`.
    async fn update_owned_todo(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> Result<Todo, AppError>;

    /// Same ownership rule as [`TodoStore::update_owned_todo`].
    async fn delete_owned_todo(&self, owner: Uuid, id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo, AppError> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            r#"
            INSERT INTO to_dos (title, description, status, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(todo.title)
        .bind(todo.description)
        .bind(todo.status)
        .bind(todo.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_todos(&self, query: &ListQuery) -> Result<Vec<Todo>, AppError> {
        let order = sort::resolve(&query.sort, TODO_SORT_COLUMNS)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TODO_COLUMNS} FROM to_dos"));
        sql::push_where(&mut qb, &query.predicate);
        sql::push_order_by(&mut qb, &order);
        sql::push_page(&mut qb, query.page);

        let rows = qb.build_query_as::<Todo>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn update_owned_todo(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> Result<Todo, AppError> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE to_dos
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                status = COALESCE($5, status),
                updated_at = now()
            WHERE user_id = $1 AND id = $2
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status)
        .fetch_optional(&self.db)
        .await?;
        row.ok_or(AppError::NotFound("todo"))
    }

    async fn delete_owned_todo(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM to_dos WHERE user_id = $1 AND id = $2")
            .bind(owner)
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("todo"));
        }
        Ok(())
    }
}
