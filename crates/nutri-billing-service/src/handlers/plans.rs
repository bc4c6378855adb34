//! Plan catalog handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use nutri_billing_core::Plan;

use crate::state::AppState;

/// Plan list response.
#[derive(Debug, Serialize)]
pub struct PlansResponse {
    /// Purchasable plans, ordered by id.
    pub plans: Vec<Plan>,
}

/// List the plan catalog.
pub async fn list_plans(State(state): State<Arc<AppState>>) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: state.catalog().plans().cloned().collect(),
    })
}
