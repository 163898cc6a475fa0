use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::server::session::run_session;
use crate::server::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/ws/detect", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness check.
pub async fn status() -> Json<Value> {
    Json(json!({ "status": "YOLO Inference Server is running" }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, peer, state))
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_payload() {
        let Json(body) = status().await;
        assert_eq!(body, json!({ "status": "YOLO Inference Server is running" }));
    }
}
