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

use super::repo_types::{NewUser, User, UserChanges, UserListRow};

/// Query parameters `GET /users` understands.
pub const USER_FILTERS: &[FilterField] = &[
    FilterField::new("name", "name", FilterKind::Pattern),
    FilterField::new("email", "email", FilterKind::Pattern),
    FilterField::new("createdAfter", "created_at", FilterKind::Since),
    FilterField::new("createdBefore", "created_at", FilterKind::Until),
    FilterField::new("updatedAfter", "updated_at", FilterKind::Since),
    FilterField::new("updatedBefore", "updated_at", FilterKind::Until),
];

/// Fields a user list may be sorted by, and their columns.
pub const USER_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("email", "email"),
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
    ("updatedAt", "updated_at"),
    ("updated_at", "updated_at"),
];

/// Runs against the locked row inside the update; an error aborts it.
pub type UserGuard = Box<dyn FnOnce(&User) -> Result<(), AppError> + Send>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn list_users(&self, query: &ListQuery) -> Result<Vec<UserListRow>, AppError>;

    /// `NotFound` when absent; `guard` sees the current row before anything is written.
    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
        guard: UserGuard,
    ) -> Result<User, AppError>;

    /// Removes the user and, through the foreign key, its todos.
    async fn delete_user(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_users(&self, query: &ListQuery) -> Result<Vec<UserListRow>, AppError> {
        let order = sort::resolve(&query.sort, USER_SORT_COLUMNS)?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT id, name, email, created_at, updated_at,
                   ARRAY(SELECT t.id FROM to_dos t WHERE t.user_id = users.id
                         ORDER BY t.created_at, t.id) AS todo_ids
            FROM users"#,
        );
        sql::push_where(&mut qb, &query.predicate);
        sql::push_order_by(&mut qb, &order);
        sql::push_page(&mut qb, query.page);

        let rows = qb
            .build_query_as::<UserListRow>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
        guard: UserGuard,
    ) -> Result<User, AppError> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("user"))?;

        guard(&current)?;

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }
}
