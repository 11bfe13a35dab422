//! Axum-facing UI layer.

pub mod handler;
mod server;
mod signal;

pub use server::Server;
