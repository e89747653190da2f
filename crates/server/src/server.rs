use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};

use std::sync::Arc;

use crate::{
    AuthConfig, access, analytics, auth, budgets, categories, health, members, transactions, user,
    workspaces,
};
use engine::{Engine, WorkspaceService};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub workspaces: WorkspaceService,
    pub auth: AuthConfig,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(engine: Engine, auth: AuthConfig) -> Self {
        let engine = Arc::new(engine);
        Self {
            workspaces: WorkspaceService::new(engine.clone()),
            engine,
            auth,
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    let viewer = middleware::from_fn_with_state(state.clone(), access::require_viewer);
    let member = middleware::from_fn_with_state(state.clone(), access::require_member);
    let owner = middleware::from_fn_with_state(state.clone(), access::require_owner);

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
        .route("/auth/refresh", post(user::refresh))
        .route("/auth/logout", post(user::logout));

    let authenticated = Router::new()
        .route("/me", get(user::me))
        .route(
            "/workspaces",
            get(workspaces::list).post(workspaces::create),
        )
        .route(
            "/workspaces/{workspace_id}",
            get(workspaces::get).route_layer(viewer.clone()),
        )
        .route(
            "/workspaces/{workspace_id}/members",
            get(members::list)
                .route_layer(viewer.clone())
                .merge(post(members::add).route_layer(owner.clone())),
        )
        .route(
            "/workspaces/{workspace_id}/members/{user_id}",
            axum::routing::patch(members::update_role)
                .delete(members::remove)
                .route_layer(owner),
        )
        .route(
            "/workspaces/{workspace_id}/transactions",
            get(transactions::list)
                .route_layer(viewer.clone())
                .merge(post(transactions::create).route_layer(member.clone())),
        )
        .route(
            "/workspaces/{workspace_id}/categories",
            get(categories::list)
                .route_layer(viewer.clone())
                .merge(post(categories::create).route_layer(member.clone())),
        )
        .route(
            "/workspaces/{workspace_id}/budgets",
            get(budgets::list)
                .route_layer(viewer.clone())
                .merge(put(budgets::upsert).route_layer(member)),
        )
        .route(
            "/workspaces/{workspace_id}/analytics/summary",
            get(analytics::summary).route_layer(viewer.clone()),
        )
        .route(
            "/workspaces/{workspace_id}/analytics/by-category",
            get(analytics::by_category).route_layer(viewer.clone()),
        )
        .route(
            "/workspaces/{workspace_id}/analytics/timeseries",
            get(analytics::timeseries).route_layer(viewer),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    public.merge(authenticated).with_state(state)
}

pub async fn run(state: ServerState, addr: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_with_listener(state, listener).await
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}
