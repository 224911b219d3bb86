//! Error types shared across the gateway.
//!
//! - `config_error` - startup and configuration failures
//! - `relay_error` - failures inside a relay session and its transports
//! - `app_error` - HTTP-facing errors with status code mapping

pub mod app_error;
pub mod config_error;
pub mod relay_error;

pub use app_error::{AppError, AppResult};
pub use config_error::ConfigError;
pub use relay_error::{RelayError, RelayResult, TransportError};
