//! Errors raised by pure domain logic

use thiserror::Error;

/// Domain rule violations shared by the backend and WASM clients
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid serial number '{serial}': {reason}")]
    InvalidSerial { serial: String, reason: &'static str },

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: &'static str, reason: &'static str },
}
