//! Domain models for equipment inventory management

mod demo;
mod inventory;
mod order;
mod user;

pub use demo::*;
pub use inventory::*;
pub use order::*;
pub use user::*;
