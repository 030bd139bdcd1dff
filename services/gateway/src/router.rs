use crate::handlers::{book, health, order, trade};
use crate::state::AppState;
use axum::{
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/orders", get(order::list_orders).post(order::place_order))
        .route(
            "/orders/:id",
            get(order::get_order).delete(order::cancel_order),
        )
        .route("/orderbook", get(book::get_order_book))
        .route("/trades", get(trade::list_trades))
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
