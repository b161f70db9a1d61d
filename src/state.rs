use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    config::AppConfig,
    memory::MemoryStore,
    todos::{repo::PgTodoStore, services::TodoService},
    users::{repo::PgUserStore, services::UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub todos: TodoService,
}

impl AppState {
    pub async fn connect(config: &AppConfig, database_url: &str) -> anyhow::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await
            .context("connect to database")
    }

    pub fn postgres(db: PgPool, config: &AppConfig) -> Self {
        let limits = config.page_limits;
        Self {
            users: UserService::new(Arc::new(PgUserStore::new(db.clone())), limits),
            todos: TodoService::new(Arc::new(PgTodoStore::new(db)), limits),
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        let store = MemoryStore::new();
        let limits = config.page_limits;
        Self {
            users: UserService::new(Arc::new(store.clone()), limits),
            todos: TodoService::new(Arc::new(store), limits),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(&AppConfig::default())
    }
}
