use matching_engine::Engine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Applied when a placement omits the symbol
    pub default_symbol: String,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, default_symbol: String) -> Self {
        Self {
            engine,
            default_symbol,
        }
    }
}
