//! WebAssembly module for Equipment Inventory Management
//!
//! Provides client-side computation for:
//! - Serial number validation before submitting forms
//! - Invoice totals preview
//! - Reconciliation over exported transaction and item data
//! - Item activity timelines while offline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    build_item_activity, validate_serial_number, ActivitySources, Invoice, InvoiceLine,
    InventoryItem, ItemStatus, TransactionDiscrepancyAnalyzer, TransactionRecord,
};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&"Equipment inventory module loaded".into());
}

/// Error message for an invalid serial number, `None` when valid
#[wasm_bindgen]
pub fn validate_serial(serial: &str) -> Option<String> {
    validate_serial_number(serial).err().map(|e| e.to_string())
}

/// Canonical form used for lookups
#[wasm_bindgen]
pub fn normalize_serial(serial: &str) -> String {
    shared::normalize_serial(serial)
}

/// Whether an item may move between two stored statuses
#[wasm_bindgen]
pub fn item_status_can_transition(from: &str, to: &str) -> bool {
    match (ItemStatus::parse_label(from), ItemStatus::parse_label(to)) {
        (Ok(from), Ok(to)) => from.can_transition_to(to),
        _ => false,
    }
}

/// Invoice totals for JSON lines and a decimal tax rate such as "0.07"
#[wasm_bindgen]
pub fn invoice_totals(lines_json: &str, tax_rate: &str) -> Result<String, JsValue> {
    compute_invoice_totals(lines_json, tax_rate).map_err(|e| JsValue::from_str(&e))
}

/// Discrepancy report for JSON arrays of transactions and items
#[wasm_bindgen]
pub fn analyze_discrepancies(transactions_json: &str, items_json: &str) -> Result<String, JsValue> {
    run_analysis(transactions_json, items_json).map_err(|e| JsValue::from_str(&e))
}

/// Activity timeline for one serial; `as_of` is RFC 3339 and defaults to now
#[wasm_bindgen]
pub fn build_activity_timeline(
    serial: &str,
    sources_json: &str,
    as_of: Option<String>,
) -> Result<String, JsValue> {
    let as_of = match as_of {
        Some(value) => parse_timestamp(&value).map_err(|e| JsValue::from_str(&e))?,
        None => DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
            .ok_or_else(|| JsValue::from_str("Clock out of range"))?,
    };
    activity_timeline(serial, sources_json, as_of).map_err(|e| JsValue::from_str(&e))
}

fn compute_invoice_totals(lines_json: &str, tax_rate: &str) -> Result<String, String> {
    let lines: Vec<InvoiceLine> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid lines JSON: {}", e))?;
    let rate = Decimal::from_str(tax_rate.trim()).map_err(|e| format!("Invalid tax rate: {}", e))?;
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err("Tax rate must be a fraction between 0 and 1".to_string());
    }

    let totals = Invoice::compute_totals(&lines, rate).map_err(|e| e.to_string())?;
    serde_json::to_string(&totals).map_err(|e| e.to_string())
}

fn run_analysis(transactions_json: &str, items_json: &str) -> Result<String, String> {
    let transactions: Vec<TransactionRecord> = serde_json::from_str(transactions_json)
        .map_err(|e| format!("Invalid transactions JSON: {}", e))?;
    let items: Vec<InventoryItem> =
        serde_json::from_str(items_json).map_err(|e| format!("Invalid items JSON: {}", e))?;

    let report = TransactionDiscrepancyAnalyzer::analyze(&transactions, &items);
    serde_json::to_string(&report).map_err(|e| e.to_string())
}

fn activity_timeline(serial: &str, sources_json: &str, as_of: DateTime<Utc>) -> Result<String, String> {
    let sources: ActivitySources =
        serde_json::from_str(sources_json).map_err(|e| format!("Invalid sources JSON: {}", e))?;

    let history = build_item_activity(serial, &sources, as_of);
    serde_json::to_string(&history).map_err(|e| e.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", value, e))
}
