//! In-process store used by tests and by the server when no `DATABASE_URL`
//! is configured. It enforces the same constraints as the SQL schema: unique
//! email, unique description, todo owner must exist, cascade on user delete.

use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, TODOS_DESCRIPTION_KEY, USERS_EMAIL_KEY},
    query::{
        filter::{Condition, Predicate},
        sort::{self, Direction},
        ListQuery,
    },
    todos::{
        repo::{TodoStore, TODO_SORT_COLUMNS},
        repo_types::{NewTodo, Todo, TodoChanges},
    },
    users::{
        repo::{UserGuard, UserStore, USER_SORT_COLUMNS},
        repo_types::{NewUser, User, UserChanges, UserListRow},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    todos: Vec<Todo>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Value<'a> {
    Id(Uuid),
    Text(Option<&'a str>),
    Time(OffsetDateTime),
}

/// Column access for evaluating predicates and orderings in memory.
trait Row {
    fn value(&self, column: &str) -> Option<Value<'_>>;
}

impl Row for User {
    fn value(&self, column: &str) -> Option<Value<'_>> {
        Some(match column {
            "id" => Value::Id(self.id),
            "name" => Value::Text(Some(&self.name)),
            "email" => Value::Text(Some(&self.email)),
            "created_at" => Value::Time(self.created_at),
            "updated_at" => Value::Time(self.updated_at),
            _ => return None,
        })
    }
}

impl Row for Todo {
    fn value(&self, column: &str) -> Option<Value<'_>> {
        Some(match column {
            "id" => Value::Id(self.id),
            "title" => Value::Text(Some(&self.title)),
            "description" => Value::Text(self.description.as_deref()),
            "status" => Value::Text(Some(self.status.as_str())),
            "user_id" => Value::Id(self.user_id),
            "created_at" => Value::Time(self.created_at),
            "updated_at" => Value::Time(self.updated_at),
            _ => return None,
        })
    }
}

fn satisfies(row: &impl Row, predicate: &Predicate) -> bool {
    predicate.conditions().iter().all(|c| match c {
        Condition::ILike { column, pattern } => match row.value(column) {
            Some(Value::Text(Some(text))) => ilike(text, pattern),
            _ => false,
        },
        Condition::AtOrAfter { column, at } => {
            matches!(row.value(column), Some(Value::Time(t)) if t >= *at)
        }
        Condition::AtOrBefore { column, at } => {
            matches!(row.value(column), Some(Value::Time(t)) if t <= *at)
        }
    })
}

/// Filters, orders and pages `rows`. Without sort keys the insertion order is kept.
fn select<'a, R: Row>(
    rows: &'a [R],
    query: &ListQuery,
    columns: &[(&str, &'static str)],
) -> Result<Vec<&'a R>, AppError> {
    let order = sort::resolve(&query.sort, columns)?;
    let mut hits: Vec<&R> = rows
        .iter()
        .filter(|r| satisfies(*r, &query.predicate))
        .collect();
    hits.sort_by(|a, b| compare(*a, *b, &order));

    let offset = usize::try_from(query.page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(query.page.limit).unwrap_or(usize::MAX);
    Ok(hits.into_iter().skip(offset).take(limit).collect())
}

fn compare(a: &impl Row, b: &impl Row, order: &[(&'static str, Direction)]) -> Ordering {
    for (column, direction) in order {
        let ord = a.value(column).cmp(&b.value(column));
        let ord = match direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// SQL `ILIKE`: `%` any run, `_` one character, `\` escapes the next one.
fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    match tokenize(&pattern.to_lowercase()) {
        Some(tokens) => like(&text, &tokens),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
}

/// `None` for a pattern ending in an unpaired escape. Runs of `%` collapse into one.
fn tokenize(pattern: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '%' if tokens.last() == Some(&Token::AnyRun) => continue,
            '%' => Token::AnyRun,
            '_' => Token::AnyOne,
            '\\' => Token::Literal(chars.next()?),
            c => Token::Literal(c),
        };
        tokens.push(token);
    }
    Some(tokens)
}

/// Greedy wildcard match that only ever backtracks to the last `%`, so it stays
/// O(text * pattern).
fn like(text: &[char], pattern: &[Token]) -> bool {
    let (mut t, mut p) = (0, 0);
    // pattern index after the last `%` and the text index it is currently resumed from
    let mut resume: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some(Token::AnyRun) => {
                p += 1;
                resume = Some((p, t));
            }
            Some(Token::AnyOne) => {
                p += 1;
                t += 1;
            }
            Some(Token::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((after_run, from)) => {
                    p = after_run;
                    t = from + 1;
                    resume = Some((after_run, t));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|token| *token == Token::AnyRun)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::conflict(Some(USERS_EMAIL_KEY)));
        }
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn list_users(&self, query: &ListQuery) -> Result<Vec<UserListRow>, AppError> {
        let tables = self.tables.lock().await;
        let users = select(&tables.users, query, USER_SORT_COLUMNS)?;
        Ok(users
            .into_iter()
            .map(|u| UserListRow {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                created_at: u.created_at,
                updated_at: u.updated_at,
                todo_ids: tables
                    .todos
                    .iter()
                    .filter(|t| t.user_id == u.id)
                    .map(|t| t.id)
                    .collect(),
            })
            .collect())
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
        guard: UserGuard,
    ) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        let idx = tables
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(AppError::NotFound("user"))?;

        guard(&tables.users[idx])?;

        if let Some(email) = &changes.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::conflict(Some(USERS_EMAIL_KEY)));
            }
        }

        let user = &mut tables.users[idx];
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(AppError::NotFound("user"));
        }
        tables.todos.retain(|t| t.user_id != id);
        Ok(())
    }
}

impl Tables {
    fn description_taken(&self, description: Option<&str>, except: Option<Uuid>) -> bool {
        let Some(description) = description else {
            return false;
        };
        self.todos
            .iter()
            .any(|t| Some(t.id) != except && t.description.as_deref() == Some(description))
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.iter().any(|u| u.id == todo.user_id) {
            return Err(AppError::NotFound("user"));
        }
        if tables.description_taken(todo.description.as_deref(), None) {
            return Err(AppError::conflict(Some(TODOS_DESCRIPTION_KEY)));
        }
        let now = OffsetDateTime::now_utc();
        let row = Todo {
            id: Uuid::new_v4(),
            title: todo.title,
            description: todo.description,
            status: todo.status,
            user_id: todo.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.todos.push(row.clone());
        Ok(row)
    }

    async fn list_todos(&self, query: &ListQuery) -> Result<Vec<Todo>, AppError> {
        let tables = self.tables.lock().await;
        let todos = select(&tables.todos, query, TODO_SORT_COLUMNS)?;
        Ok(todos.into_iter().cloned().collect())
    }

    async fn update_owned_todo(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> Result<Todo, AppError> {
        let mut tables = self.tables.lock().await;
        let idx = tables
            .todos
            .iter()
            .position(|t| t.user_id == owner && t.id == id)
            .ok_or(AppError::NotFound("todo"))?;

        if tables.description_taken(changes.description.as_deref(), Some(id)) {
            return Err(AppError::conflict(Some(TODOS_DESCRIPTION_KEY)));
        }

        let todo = &mut tables.todos[idx];
        if let Some(title) = changes.title {
            todo.title = title;
        }
        if let Some(description) = changes.description {
            todo.description = Some(description);
        }
        if let Some(status) = changes.status {
            todo.status = status;
        }
        todo.updated_at = OffsetDateTime::now_utc();
        Ok(todo.clone())
    }

    async fn delete_owned_todo(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.todos.len();
        tables.todos.retain(|t| !(t.user_id == owner && t.id == id));
        if tables.todos.len() == before {
            return Err(AppError::NotFound("todo"));
        }
        Ok(())
    }
}
