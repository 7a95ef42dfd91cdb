//! Configuration module for the duel server.
//!
//! This module provides configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Session lifecycle and maintenance
//! - [`duel`]: Relay cadence, reaction timing, rating policy
//! - [`matchmaking`]: Queue sweep and difficulty tie-break
//! - [`judge`] / [`catalog`]: External collaborators
//! - [`protocol`]: Input limits
//! - [`security`], [`websocket`], [`logging`]
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod catalog;
pub mod defaults;
pub mod duel;
pub mod judge;
pub mod loader;
pub mod logging;
pub mod matchmaking;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use catalog::{CatalogConfig, QuestionConfig};

pub use duel::DuelConfig;

pub use judge::JudgeConfig;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use matchmaking::MatchmakingConfig;

pub use protocol::ProtocolConfig;

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use types::Config;

pub use validation::validate_config;

pub use websocket::WebSocketConfig;
