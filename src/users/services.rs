use std::{collections::HashMap, sync::Arc};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    query::{page::PageLimits, ListQuery},
};

use super::{
    dto::{CreateUserRequest, PublicUser, UpdateUserRequest, UserListItem},
    password::{hash_password, verify_password},
    repo::{UserGuard, UserStore, USER_FILTERS},
    repo_types::{NewUser, User, UserChanges},
    validation,
};

/// User lifecycle rules on top of a [`UserStore`]. Holds no per-request state.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    limits: PageLimits,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub async fn create(&self, req: CreateUserRequest) -> Result<PublicUser, AppError> {
        let input = validation::validate_create(req)?;
        let password_hash = hash_password(&input.password)?;

        let user = self
            .store
            .insert_user(NewUser {
                name: input.name,
                email: input.email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user created");
        Ok(user.into())
    }

    pub async fn list(&self, params: &HashMap<String, String>) -> Result<Vec<UserListItem>, AppError> {
        let query = ListQuery::from_params(USER_FILTERS, params, self.limits)?;
        let rows = self.store.list_users(&query).await?;
        Ok(rows.into_iter().map(UserListItem::from).collect())
    }

    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<PublicUser, AppError> {
        let input = validation::validate_update(req)?;
        let password_hash = input.password.as_deref().map(hash_password).transpose()?;

        let old_password = input.old_password;
        let guard: UserGuard = Box::new(move |current: &User| {
            if let Some(old) = old_password {
                if !verify_password(&old, &current.password_hash)? {
                    warn!(user_id = %current.id, "old password mismatch");
                    return Err(AppError::Authentication);
                }
            }
            Ok(())
        });

        let changes = UserChanges {
            name: input.name,
            email: input.email,
            password_hash,
        };
        let user = self.store.update_user(id, changes, guard).await?;

        info!(user_id = %user.id, "user updated");
        Ok(user.into())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete_user(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()), PageLimits::default())
    }

    fn signup(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some("abcdefgh".into()),
            password_confirmation: Some("abcdefgh".into()),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn created_user_round_trips_through_list() {
        let svc = service();
        let created = svc.create(signup("Ann", "ann@example.com")).await.unwrap();

        let listed = svc.list(&HashMap::new()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].name, "Ann");
        assert_eq!(listed[0].email, "ann@example.com");
        assert!(listed[0].todos.is_empty());
    }

    #[tokio::test]
    async fn responses_never_carry_credentials() {
        let svc = service();
        let created = svc.create(signup("Ann", "ann@example.com")).await.unwrap();
        let json = serde_json::to_value(&created).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        for key in ["id", "name", "email", "createdAt", "updatedAt"] {
            assert!(keys.contains(&key.to_string()), "missing {key}");
        }

        let listed = serde_json::to_string(&svc.list(&HashMap::new()).await.unwrap()).unwrap();
        assert!(!listed.contains("password"));
        assert!(!listed.contains("$argon2"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = service();
        svc.create(signup("Ann", "ann@example.com")).await.unwrap();
        let err = svc.create(signup("Other Ann", "ANN@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_filters_by_name_pattern() {
        let svc = service();
        svc.create(signup("Ann", "ann@example.com")).await.unwrap();
        svc.create(signup("Bob", "bob@example.com")).await.unwrap();

        let hits = svc.list(&params(&[("name", "a%")])).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Ann");

        let err = svc.list(&params(&[("createdAfter", "yesterday")])).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidFilter { .. }));
    }

    #[tokio::test]
    async fn update_changes_password_with_correct_old_one() {
        let svc = service();
        let user = svc.create(signup("Ann", "ann@example.com")).await.unwrap();

        let req = || UpdateUserRequest {
            old_password: Some("abcdefgh".into()),
            password: Some("ijklmnop".into()),
            password_confirmation: Some("ijklmnop".into()),
            ..Default::default()
        };
        svc.update(user.id, req()).await.unwrap();

        // the old password is no longer valid
        let err = svc.update(user.id, req()).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication));
    }

    #[tokio::test]
    async fn password_can_be_set_without_old_one() {
        let svc = service();
        let user = svc.create(signup("Ann", "ann@example.com")).await.unwrap();

        svc.update(
            user.id,
            UpdateUserRequest {
                password: Some("ijklmnop".into()),
                password_confirmation: Some("ijklmnop".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let with_new = |old: &str| UpdateUserRequest {
            name: Some("Ann B".into()),
            old_password: Some(old.into()),
            password: Some("qrstuvwx".into()),
            password_confirmation: Some("qrstuvwx".into()),
            ..Default::default()
        };
        let err = svc.update(user.id, with_new("abcdefgh")).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication));
        let updated = svc.update(user.id, with_new("ijklmnop")).await.unwrap();
        assert_eq!(updated.name, "Ann B");
    }

    #[tokio::test]
    async fn wrong_old_password_changes_nothing() {
        let svc = service();
        let user = svc.create(signup("Ann", "ann@example.com")).await.unwrap();

        let err = svc
            .update(
                user.id,
                UpdateUserRequest {
                    name: Some("Mallory".into()),
                    old_password: Some("zzzzzzzz".into()),
                    password: Some("ijklmnop".into()),
                    password_confirmation: Some("ijklmnop".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication));

        let listed = svc.list(&HashMap::new()).await.unwrap();
        assert_eq!(listed[0].name, "Ann");
    }

    #[tokio::test]
    async fn update_and_delete_unknown_user() {
        let svc = service();
        let err = svc
            .update(
                Uuid::new_v4(),
                UpdateUserRequest {
                    name: Some("x".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("user")));
        assert!(matches!(
            svc.delete(Uuid::new_v4()).await,
            Err(AppError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_before_lookup() {
        let svc = service();
        let err = svc
            .update(
                Uuid::new_v4(),
                UpdateUserRequest {
                    email: Some("nope".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
