use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::state::ServerState;
use crate::utils::{AppResponse, ok};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub ims_connection: String,
    pub pending_requests: usize,
    pub observers: usize,
}

/// Liveness plus a snapshot of the bridge.
pub async fn health(State(state): State<ServerState>) -> Json<AppResponse<HealthReport>> {
    ok(HealthReport {
        status: "ok",
        ims_connection: format!("{:?}", state.bridge.state()),
        pending_requests: state.bridge.pending_requests(),
        observers: state.bridge.observer_count(),
    })
}
