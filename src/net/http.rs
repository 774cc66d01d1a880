use axum::{
    Json, Router,
    extract::State,
    extract::ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{AdmissionError, AppResult, InfraError};
use crate::net::AppCtx;

/// Request header carrying the claimed username.
pub const USERNAME_HEADER: &str = "username";

pub fn router(ctx: AppCtx) -> Router {
    Router::new()
        .route("/user", get(get_user))
        .route("/ws", get(ws_upgrade))
        .with_state(ctx)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

/// Run the HTTP server with the identity and WebSocket endpoints until `shutdown` resolves.
pub async fn serve<F>(addr: &str, ctx: AppCtx, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(InfraError::from)?;
    let local = listener.local_addr().map_err(InfraError::from)?;
    tracing::info!(%local, "relay listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(InfraError::from)?;
    Ok(())
}

fn claimed_username(headers: &HeaderMap) -> &str {
    headers
        .get(USERNAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn get_user(State(ctx): State<AppCtx>, headers: HeaderMap) -> Response {
    let username = claimed_username(&headers);
    if username.is_empty() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match ctx.users.find(username).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => StatusCode::FORBIDDEN.into_response(),
        Err(e) => {
            tracing::error!(%username, error = %e, "user lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn ws_upgrade(
    State(ctx): State<AppCtx>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let claimed = claimed_username(&headers);
    let username = match ctx.gate.check(claimed) {
        Ok(username) => username,
        Err(e) => {
            tracing::warn!(username = %claimed, error = %e, "connection refused");
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            let e = AdmissionError::UpgradeFailed(rejection.body_text());
            tracing::warn!(%username, error = %e, "connection refused");
            return e.into_response();
        }
    };

    let gate = ctx.gate.clone();
    let failed = username.clone();
    ws.on_failed_upgrade(move |e| tracing::warn!(username = %failed, error = %e, "upgrade error"))
        .on_upgrade(move |socket| async move {
            if let Err(e) = gate.admit(username.clone(), socket).await {
                tracing::warn!(%username, error = %e, "connection refused after upgrade");
            }
        })
}
