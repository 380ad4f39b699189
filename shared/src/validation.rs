//! Validation utilities for inventory records and document numbers

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::DomainError;
use crate::models::{normalize_serial, MAX_UNIT_PRICE};

// ============================================================================
// Inventory Validations
// ============================================================================

const SERIAL_SEPARATORS: [char; 4] = ['-', '/', '.', '_'];

/// Validate serial number format
pub fn validate_serial_number(serial: &str) -> Result<(), DomainError> {
    let serial = serial.trim();
    let invalid = |reason| DomainError::InvalidSerial {
        serial: serial.to_string(),
        reason,
    };

    if serial.len() < 3 {
        return Err(invalid("must be at least 3 characters"));
    }
    if serial.len() > 50 {
        return Err(invalid("must be at most 50 characters"));
    }
    if !serial
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || SERIAL_SEPARATORS.contains(&c))
    {
        return Err(invalid("only letters, digits and - / . _ are allowed"));
    }
    if serial.starts_with(SERIAL_SEPARATORS) {
        return Err(invalid("must start with a letter or digit"));
    }
    Ok(())
}

/// Validate a batch of serials: non-empty, each valid, no duplicates after normalization
pub fn validate_serial_batch(serials: &[String]) -> Result<Vec<String>, DomainError> {
    if serials.is_empty() {
        return Err(DomainError::InvalidSerial {
            serial: String::new(),
            reason: "at least one serial number is required",
        });
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(serials.len());
    for serial in serials {
        validate_serial_number(serial)?;
        let key = normalize_serial(serial);
        if !seen.insert(key.clone()) {
            return Err(DomainError::InvalidSerial {
                serial: serial.clone(),
                reason: "listed more than once",
            });
        }
        normalized.push(key);
    }
    Ok(normalized)
}

/// Validate a unit price against what an item or invoice line can store
pub fn validate_unit_price(price: Decimal) -> Result<(), DomainError> {
    let invalid = |reason| DomainError::InvalidAmount {
        field: "unit_price",
        reason,
    };

    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid("must not be negative"));
    }
    if price > MAX_UNIT_PRICE {
        return Err(invalid("exceeds the largest storable amount"));
    }
    Ok(())
}

// ============================================================================
// Document Numbers
// ============================================================================

/// Format a document number as `PREFIX-YYYY-NNNN`
pub fn format_document_number(prefix: &str, year: i32, sequence: i32) -> String {
    format!("{}-{}-{:04}", prefix, year, sequence)
}

/// Validate a `PREFIX-YYYY-NNNN` document number
pub fn validate_document_number(prefix: &str, number: &str) -> Result<(), &'static str> {
    let rest = number
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('-'))
        .ok_or("Document number has the wrong prefix")?;

    let (year, sequence) = rest
        .split_once('-')
        .ok_or("Document number must be PREFIX-YYYY-NNNN")?;

    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err("Document year must be 4 digits");
    }
    if sequence.len() < 4 || !sequence.chars().all(|c| c.is_ascii_digit()) {
        return Err("Document sequence must be at least 4 digits");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && email.len() >= 5 => {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}
