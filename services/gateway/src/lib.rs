//! HTTP adapter for the matching engine
//!
//! Thin axum layer over the engine handle: request DTOs, the route table,
//! the JSON error contract, and process configuration. The binary in
//! `main.rs` wires these together at startup.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
