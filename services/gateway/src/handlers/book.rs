use crate::models::OrderBookResponse;
use crate::state::AppState;
use axum::{extract::State, Json};

pub async fn get_order_book(State(state): State<AppState>) -> Json<OrderBookResponse> {
    Json(state.engine.book_snapshot().into())
}
