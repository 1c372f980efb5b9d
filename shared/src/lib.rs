//! Shared types for the dine platform
//!
//! Domain models, the unified error system and the real-time event
//! envelope used by the server and its clients.

pub mod error;
pub mod message;
pub mod money;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{RealtimeEvent, RealtimeMessage};
