use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use engine::{Engine, Role};
use migration::MigratorTrait;
use server::{AuthConfig, ServerState, issue_token, router};

struct TestApp {
    state: ServerState,
    db: DatabaseConnection,
}

struct TestUser {
    id: Uuid,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap();
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 60,
            refresh_token_ttl_days: 30,
        };
        Self {
            state: ServerState::new(engine, auth),
            db,
        }
    }

    async fn user(&self, email: &str) -> TestUser {
        let user = self
            .state
            .engine
            .register_user(email, "password123", None)
            .await
            .unwrap();
        TestUser {
            id: user.id,
            token: issue_token(user.id, &self.state.auth).unwrap(),
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_text(method, uri, token, body.map(|body| body.to_string()))
            .await
    }

    /// Like `send`, with the body passed through unparsed.
    async fn send_text(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Workspace owned by `owner`, returned as its id string.
    async fn workspace(&self, owner: &TestUser) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/workspaces",
                Some(&owner.token),
                Some(json!({ "name": "Household" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["workspace"]["id"].as_str().unwrap().to_string()
    }

    async fn category(&self, user: &TestUser, ws: &str, name: &str, kind: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                &format!("/workspaces/{ws}/categories"),
                Some(&user.token),
                Some(json!({ "name": name, "kind": kind })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn add_member(&self, owner: &TestUser, ws: &str, email: &str, role: &str) {
        let (status, _) = self
            .send(
                "POST",
                &format!("/workspaces/{ws}/members"),
                Some(&owner.token),
                Some(json!({ "email": email, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn health_and_ready_are_public() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send("GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "Alice@Example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "alice@example.com");

    let (status, _) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-one" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(body["refresh_token"].is_string());

    let (status, body) = app.send("GET", "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn missing_or_bad_token_is_401() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let ws = app.workspace(&alice).await;

    let (status, body) = app.send("GET", "/workspaces", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = app
        .send("GET", &format!("/workspaces/{ws}"), Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_workspace_id_is_400() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;

    let (status, body) = app
        .send("GET", "/workspaces/not-a-uuid/members", Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid workspace id");
    assert_eq!(body["details"]["id"], "not-a-uuid");
}

#[tokio::test]
async fn unknown_workspace_is_404_and_non_member_is_403() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let mallory = app.user("mallory@example.com").await;
    let ws = app.workspace(&alice).await;

    let (status, body) = app
        .send(
            "GET",
            &format!("/workspaces/{}", Uuid::new_v4()),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "workspace not found");

    let (status, body) = app
        .send("GET", &format!("/workspaces/{ws}"), Some(&mallory.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not a workspace member");
    assert_eq!(body["details"]["required"], "viewer");
}

#[tokio::test]
async fn gate_decisions_are_deterministic() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let bob = app.user("bob@example.com").await;
    let ws = app.workspace(&alice).await;
    app.add_member(&alice, &ws, "bob@example.com", "viewer").await;

    let uri = format!("/workspaces/{ws}/transactions");
    let body = json!({ "kind": "expense", "amount_minor": 100 });
    let first = app.send("POST", &uri, Some(&bob.token), Some(body.clone())).await;
    let second = app.send("POST", &uri, Some(&bob.token), Some(body)).await;
    assert_eq!(first, second);
    assert_eq!(first.0, StatusCode::FORBIDDEN);
    assert_eq!(first.1["details"]["required"], "member");
    assert_eq!(first.1["details"]["actual"], "viewer");
}

#[tokio::test]
async fn member_cannot_change_roles() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let bob = app.user("bob@example.com").await;
    let ws = app.workspace(&alice).await;
    app.add_member(&alice, &ws, "bob@example.com", "member").await;

    // Rejected by the gate before the role string is even parsed.
    for role in ["viewer", "admin"] {
        let (status, body) = app
            .send(
                "PATCH",
                &format!("/workspaces/{ws}/members/{}", alice.id),
                Some(&bob.token),
                Some(json!({ "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "insufficient role");
        assert_eq!(body["details"]["required"], "owner");
        assert_eq!(body["details"]["actual"], "member");
    }

    let ws_id = Uuid::parse_str(&ws).unwrap();
    assert_eq!(
        app.state.engine.user_role(ws_id, alice.id).await.unwrap(),
        Some(Role::Owner)
    );
}

#[tokio::test]
async fn owner_manages_members() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let bob = app.user("bob@example.com").await;
    let ws = app.workspace(&alice).await;
    let members_uri = format!("/workspaces/{ws}/members");

    let (status, body) = app
        .send(
            "POST",
            &members_uri,
            Some(&alice.token),
            Some(json!({ "email": " BOB@example.com ", "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], bob.id.to_string());

    let (status, body) = app
        .send(
            "POST",
            &members_uri,
            Some(&alice.token),
            Some(json!({ "email": "bob@example.com", "role": "viewer" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already a member");

    let (status, _) = app
        .send(
            "POST",
            &members_uri,
            Some(&alice.token),
            Some(json!({ "email": "nobody@example.com", "role": "viewer" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            "POST",
            &members_uri,
            Some(&alice.token),
            Some(json!({ "email": "nobody@example.com", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(
            "PATCH",
            &format!("{members_uri}/{}", bob.id),
            Some(&alice.token),
            Some(json!({ "role": "viewer" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send("GET", &members_uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["role"], "viewer");

    let (status, _) = app
        .send(
            "DELETE",
            &format!("{members_uri}/{}", bob.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(
            "DELETE",
            &format!("{members_uri}/not-a-uuid"),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_guards_surface_as_409() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let ws = app.workspace(&alice).await;
    let self_uri = format!("/workspaces/{ws}/members/{}", alice.id);

    let (status, body) = app.send("DELETE", &self_uri, Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "cannot remove last owner");

    let (status, body) = app
        .send(
            "PATCH",
            &self_uri,
            Some(&alice.token),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "owner cannot self demote");
}

#[tokio::test]
async fn transactions_and_summary_follow_roles() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let bob = app.user("bob@example.com").await;
    let carol = app.user("carol@example.com").await;
    let ws = app.workspace(&alice).await;
    app.add_member(&alice, &ws, "bob@example.com", "member").await;
    app.add_member(&alice, &ws, "carol@example.com", "viewer").await;
    let uri = format!("/workspaces/{ws}/transactions");
    let food = app.category(&bob, &ws, "Food", "expense").await;

    let (status, body) = app
        .send(
            "POST",
            &uri,
            Some(&bob.token),
            Some(json!({ "kind": "income", "amount_minor": 5000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&alice.token),
            Some(json!({ "kind": "expense", "amount_minor": 1200, "category_id": food })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&alice.token),
            Some(json!({ "kind": "refund", "amount_minor": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app.send("GET", &uri, Some(&carol.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send("GET", &format!("{uri}?kind=expense"), Some(&carol.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"][0]["currency"], "UAH");
    assert_eq!(body["transactions"][0]["category_id"], food);

    let (status, body) = app
        .send(
            "GET",
            &format!("/workspaces/{ws}/analytics/summary"),
            Some(&carol.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], "UAH");
    assert_eq!(body["income_minor"], 5000);
    assert_eq!(body["expense_minor"], 1200);
    assert_eq!(body["balance_minor"], 3800);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn workspaces_list_shows_caller_role() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let bob = app.user("bob@example.com").await;
    let ws = app.workspace(&alice).await;
    app.add_member(&alice, &ws, "bob@example.com", "viewer").await;

    let (status, body) = app.send("GET", "/workspaces", Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["workspaces"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], ws);
    assert_eq!(list[0]["role"], "viewer");

    let (status, body) = app
        .send("GET", &format!("/workspaces/{ws}"), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "viewer");
    assert_eq!(body["workspace"]["default_currency"], "UAH");
}

#[tokio::test]
async fn refresh_rotates_and_logout_revokes() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first = body["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": first })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["refresh_token"].as_str().unwrap().to_string();
    let token = body["token"].as_str().unwrap().to_string();
    let (status, body) = app.send("GET", "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": first })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid refresh token");

    let (status, _) = app
        .send(
            "POST",
            "/auth/logout",
            None,
            Some(json!({ "refresh_token": second })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": second })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn categories_and_budgets_follow_roles() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let carol = app.user("carol@example.com").await;
    let ws = app.workspace(&alice).await;
    app.add_member(&alice, &ws, "carol@example.com", "viewer").await;
    let categories = format!("/workspaces/{ws}/categories");
    let budgets = format!("/workspaces/{ws}/budgets");

    let (status, body) = app
        .send(
            "POST",
            &categories,
            Some(&carol.token),
            Some(json!({ "name": "Food", "kind": "expense" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["required"], "member");

    let food = app.category(&alice, &ws, "Food", "expense").await;
    let (status, _) = app
        .send(
            "POST",
            &categories,
            Some(&alice.token),
            Some(json!({ "name": "Food", "kind": "expense" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.send("GET", &categories, Some(&carol.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"][0]["id"], food);
    assert_eq!(body["categories"][0]["kind"], "expense");

    let upsert = json!({ "category_id": food, "year": 2026, "month": 3, "amount_minor": 10000 });
    let (status, _) = app
        .send("PUT", &budgets, Some(&carol.token), Some(upsert.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .send("PUT", &budgets, Some(&alice.token), Some(upsert))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount_minor"], 10000);

    let (status, _) = app
        .send(
            "POST",
            &format!("/workspaces/{ws}/transactions"),
            Some(&alice.token),
            Some(json!({
                "kind": "expense",
                "amount_minor": 2500,
                "category_id": food,
                "occurred_at": "2026-03-10T12:00:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            "GET",
            &format!("{budgets}?year=2026&month=3"),
            Some(&carol.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["budgets"][0]["spent_minor"], 2500);
    assert_eq!(body["budgets"][0]["remaining_minor"], 7500);
    assert_eq!(body["budgets"][0]["is_over"], false);

    let (status, body) = app
        .send("GET", &format!("{budgets}?year=2026"), Some(&carol.token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid query");
}

#[tokio::test]
async fn analytics_breakdown_and_timeseries() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let carol = app.user("carol@example.com").await;
    let ws = app.workspace(&alice).await;
    app.add_member(&alice, &ws, "carol@example.com", "viewer").await;
    let food = app.category(&alice, &ws, "Food", "expense").await;
    for (amount, category, at) in [
        (3000, Some(food.as_str()), "2026-03-02T08:00:00Z"),
        (1000, None, "2026-03-03T08:00:00Z"),
    ] {
        let (status, _) = app
            .send(
                "POST",
                &format!("/workspaces/{ws}/transactions"),
                Some(&alice.token),
                Some(json!({
                    "kind": "expense",
                    "amount_minor": amount,
                    "category_id": category,
                    "occurred_at": at
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .send(
            "GET",
            &format!("/workspaces/{ws}/analytics/by-category?top=5"),
            Some(&carol.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "expense");
    assert_eq!(body["total_minor"], 4000);
    assert_eq!(body["items"][0]["name"], "Food");
    assert_eq!(body["items"][1]["name"], "Uncategorized");

    let (status, _) = app
        .send(
            "GET",
            &format!("/workspaces/{ws}/analytics/by-category?top=0"),
            Some(&carol.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .send(
            "GET",
            &format!(
                "/workspaces/{ws}/analytics/timeseries?bucket=day&from=2026-03-02T00:00:00Z&to=2026-03-04T00:00:00Z"
            ),
            Some(&carol.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bucket"], "day");
    assert_eq!(body["points"][0]["period_start"], "2026-03-02");
    assert_eq!(body["points"][0]["total_minor"], 3000);
    assert_eq!(body["points"][1]["total_minor"], 1000);

    let (status, _) = app
        .send(
            "GET",
            &format!("/workspaces/{ws}/analytics/timeseries?bucket=year"),
            Some(&carol.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let outsider = app.user("mallory@example.com").await;
    let (status, _) = app
        .send(
            "GET",
            &format!("/workspaces/{ws}/analytics/by-category"),
            Some(&outsider.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn corrupted_membership_role_is_500_without_details() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let ws = app.workspace(&alice).await;

    app.db
        .execute(Statement::from_sql_and_values(
            app.db.get_database_backend(),
            "UPDATE workspace_members SET role = ? WHERE workspace_id = ?",
            vec!["superuser".into(), Uuid::parse_str(&ws).unwrap().into()],
        ))
        .await
        .unwrap();

    let (status, body) = app
        .send("GET", &format!("/workspaces/{ws}"), Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn malformed_json_gets_the_error_body() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;

    let (status, body) = app
        .send_text(
            "POST",
            "/workspaces",
            Some(&alice.token),
            Some("{\"name\": ".to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid json");
    assert!(body["details"]["reason"].is_string());

    let (status, body) = app
        .send_text(
            "POST",
            "/auth/login",
            None,
            Some("{\"email\": 42}".to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid json");
}
