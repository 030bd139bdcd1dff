use crate::error::AppError;
use crate::models::{OrdersResponse, PlaceOrderRequest, PlaceOrderResponse};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use matching_engine::PlaceRequest;
use types::ids::OrderId;
use types::order::{Order, OrderKind, Side};

pub async fn place_order(
    State(state): State<AppState>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Json<PlaceOrderResponse>, AppError> {
    // An undecodable body is a validation failure like any other; the
    // default Json rejection would bypass the JSON error contract
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let req = PlaceRequest {
        symbol: payload
            .symbol
            .unwrap_or_else(|| state.default_symbol.clone()),
        kind: OrderKind::parse(&payload.kind)?,
        side: Side::parse(&payload.side)?,
        price: payload.price,
        quantity: payload.quantity,
    };

    // Placement blocks on the durable commit; keep it off the async runtime
    let engine = state.engine.clone();
    let placement = tokio::task::spawn_blocking(move || engine.place(req))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))??;

    Ok(Json(PlaceOrderResponse {
        order_id: placement.order_id,
        remaining_quantity: placement.remaining_quantity,
        status: placement.status,
        trades: placement.trades,
    }))
}

pub async fn list_orders(State(state): State<AppState>) -> Json<OrdersResponse> {
    Json(OrdersResponse {
        orders: state.engine.orders(),
    })
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    state
        .engine
        .order(OrderId::new(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    let engine = state.engine.clone();
    let canceled = tokio::task::spawn_blocking(move || engine.cancel(OrderId::new(id)))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))??;
    Ok(Json(canceled))
}
