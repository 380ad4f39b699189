//! HTTP handlers

pub mod auth;
pub mod demo;
pub mod health;
pub mod inventory;
pub mod order;
pub mod reconciliation;
pub mod reporting;
pub mod returns;
pub mod user;

pub use auth::*;
pub use demo::*;
pub use health::*;
pub use inventory::*;
pub use order::*;
pub use reconciliation::*;
pub use reporting::*;
pub use returns::*;
pub use user::*;
