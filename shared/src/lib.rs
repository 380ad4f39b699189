//! Shared types and logic for the Equipment Inventory Management platform
//!
//! This crate contains the domain models plus the pure reconciliation and
//! activity-history logic used by the backend and the WASM client.

pub mod activity;
pub mod error;
pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use activity::*;
pub use error::*;
pub use models::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
