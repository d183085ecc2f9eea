use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use ybf_feed::TokenVerifier;

use crate::auth::AppState;

/// GET /realtime: live lists over WebSocket. Private tables are authorized
/// per subscription with a session token, not at upgrade time.
pub async fn realtime_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let db = state.db.clone();
    let dispatcher = state.dispatcher.clone();
    let verifier: Arc<dyn TokenVerifier> = state.sessions.clone();
    ws.on_upgrade(move |socket| ybf_feed::handle_connection(socket, db, dispatcher, verifier))
}
