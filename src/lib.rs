//! WebSocket chat room engine with nickname reservation and a math-quiz
//! scoring bot.
//!
//! Clients connect over WebSocket to a configured resource path and exchange
//! small JSON messages to claim a nickname, list peers, broadcast tells and
//! answer the recurring arithmetic questions posted by MathBot2000.

// layers
pub mod domain;
pub mod infrastructure;
pub mod room;
pub mod ui;

// plugin entry contract
pub mod config;
pub mod plugin;

// shared library
pub mod common;
