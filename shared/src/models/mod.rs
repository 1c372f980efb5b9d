//! Data models
//!
//! Shared between dine-server and clients (via API).
//! Entity ids are snowflake `i64`; tables are keyed by their number and
//! dishes by the menu collaborator's string id.

pub mod dish;
pub mod guest;
pub mod order;
pub mod payment;
pub mod revenue;
pub mod table;

// Re-exports
pub use dish::*;
pub use guest::*;
pub use order::*;
pub use payment::*;
pub use revenue::*;
pub use table::*;
