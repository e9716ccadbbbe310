//! Voxgate HTTP API: router, handlers, and shared state.

pub mod api;
pub mod error;
pub mod state;
