use crate::models::TradesResponse;
use crate::state::AppState;
use axum::{extract::State, Json};

pub async fn list_trades(State(state): State<AppState>) -> Json<TradesResponse> {
    Json(TradesResponse {
        trades: state.engine.trades(),
    })
}
