use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, state::AppState, todos, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .merge(todos::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn signup(app: &Router, email: &str) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/users",
            Some(json!({
                "name": "Ann",
                "email": email,
                "password": "abcdefgh",
                "passwordConfirmation": "abcdefgh"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn user_lifecycle_over_http() {
        let app = build_app(AppState::fake());
        let id = signup(&app, "ann@example.com").await;

        let (status, users) = call(&app, "GET", "/users?sort=name:desc&page=1&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users[0]["id"], id.as_str());
        assert_eq!(users[0]["todos"], json!([]));
        assert!(users[0].get("password").is_none());
        assert!(users[0].get("password_hash").is_none());

        let (status, updated) = call(
            &app,
            "PUT",
            &format!("/users/{id}"),
            Some(json!({ "name": "Annie" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(updated["name"], "Annie");

        let (status, _) = call(
            &app,
            "PUT",
            &format!("/users/{id}"),
            Some(json!({
                "oldPassword": "zzzzzzzz",
                "password": "ijklmnop",
                "passwordConfirmation": "ijklmnop"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, "DELETE", &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);

        let (status, _) = call(&app, "DELETE", &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_payloads_and_queries_are_client_errors() {
        let app = build_app(AppState::fake());

        let (status, body) = call(
            &app,
            "POST",
            "/users",
            Some(json!({
                "name": "Ann",
                "email": "ann@example.com",
                "password": "abcdefgh",
                "passwordConfirmation": "abcdefgx"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "passwordConfirmation");

        let (status, _) = call(&app, "POST", "/users", Some(json!({ "name": 42 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/users?createdBefore=soon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("createdBefore"));

        let (status, _) = call(&app, "GET", "/users?limit=-3", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "GET", "/users?sort=password_hash", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/users?name=ann%5C", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let app = build_app(AppState::fake());
        signup(&app, "ann@example.com").await;
        let (status, body) = call(
            &app,
            "POST",
            "/users",
            Some(json!({
                "name": "Ann again",
                "email": "ann@example.com",
                "password": "abcdefgh",
                "passwordConfirmation": "abcdefgh"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "email already registered");
    }

    #[tokio::test]
    async fn todo_routes_enforce_ownership() {
        let app = build_app(AppState::fake());
        let ann = signup(&app, "ann@example.com").await;
        let bob = signup(&app, "bob@example.com").await;

        let (status, todo) = call(
            &app,
            "POST",
            &format!("/users/{ann}/todos"),
            Some(json!({ "title": "Buy milk", "status": "active", "user_id": bob })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(todo["user_id"], ann.as_str());
        assert_eq!(todo["status"], "ACTIVE");
        let todo_id = todo["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "PUT",
            &format!("/users/{bob}/todos/{todo_id}"),
            Some(json!({ "title": "mine now" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "DELETE", &format!("/users/{bob}/todos/{todo_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, updated) = call(
            &app,
            "PUT",
            &format!("/users/{ann}/todos/{todo_id}"),
            Some(json!({ "status": "archived" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "ARCHIVED");
        assert_eq!(updated["title"], "Buy milk");

        let (status, list) = call(&app, "GET", &format!("/users/{bob}/todos?title=buy%25"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, users) = call(&app, "GET", "/users?email=ann%40example.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users[0]["todos"], json!([{ "id": todo_id }]));

        let (status, _) = call(&app, "DELETE", &format!("/users/{ann}/todos/{todo_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn todo_for_unknown_user_is_not_found() {
        let app = build_app(AppState::fake());
        let (status, _) = call(
            &app,
            "POST",
            &format!("/users/{}/todos", uuid::Uuid::new_v4()),
            Some(json!({ "title": "orphan" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/users/not-a-uuid/todos", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
