//! # pdaval-server
//!
//! Network front ends for the pdaval validators.
//!
//! This crate provides:
//! - TCP connection handling for the line-delimited JSON protocol
//! - An HTTP gateway for browser clients
//! - Session management
//! - Command handlers shared by both transports
//! - YAML configuration with environment overrides
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod metrics;
pub mod server;
pub mod session;

pub use config::{Config, ConfigError, DistrictsConfig, HttpConfig, MetricsConfig, NetworkConfig};
pub use error::ServerError;
pub use handler::{CommandHandler, ServerInfo};
pub use http::{route, run_gateway, serve_gateway, GatewayState};
pub use metrics::Metrics;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::{Session, SessionState};
