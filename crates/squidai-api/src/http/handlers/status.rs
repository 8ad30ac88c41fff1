//! Document-store status probe.
//!
//! GET /api/mongodb-status -- always HTTP 200; the body says whether the
//! store is reachable and, if not, how to fix it.

use axum::Json;
use axum::extract::State;

use squidai_infra::mongo::{StoreStatus, check_status};

use crate::state::AppState;

pub async fn mongodb_status(State(state): State<AppState>) -> Json<StoreStatus> {
    let status = check_status(
        state.secrets.mongodb_uri.as_ref(),
        &state.config.store.database_name,
    )
    .await;
    Json(status)
}
