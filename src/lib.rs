#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # CodeDuel Server
//!
//! Real-time session server for head-to-head competitive coding: matchmaking by difficulty,
//! live code relay between opponents, judged submissions and first-to-solve arbitration.
//!
//! Everything lives in memory. Judge and question catalog are external collaborators.

/// Question catalog collaborator
pub mod catalog;

/// Wall-clock helpers for match timing
pub mod clock;

/// Server configuration and environment variables
pub mod config;

/// Connection registry and message delivery
pub mod coordination;

/// Judge collaborator
pub mod judge;

/// Structured logging configuration
pub mod logging;

/// Difficulty-aware matchmaking queue
pub mod matchmaking;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Main server orchestration
pub mod server;

/// Per-match session state and actors
pub mod session;

/// WebSocket connection handling and HTTP routes
pub mod websocket;
