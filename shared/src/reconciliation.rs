//! Transaction discrepancy analysis
//!
//! Replays every stock transaction per serial number and compares the result
//! with the current inventory records. Detects:
//! - outbound transactions whose serial has no inventory record (orphans)
//! - a second delivery or demo while one is still open
//! - returns and cancellations with nothing to close
//! - stock-ins recorded while the item is out, or twice
//! - items whose status disagrees with their transaction history
//! - serial numbers held by more than one inventory record

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{normalize_serial, InventoryItem, ItemStatus, TransactionRecord, TransactionType};

/// State an item should be in according to its transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedState {
    InStock,
    Delivered,
    OnDemo,
}

impl ExpectedState {
    /// Whether a recorded item status satisfies this expectation
    pub fn accepts(&self, status: ItemStatus) -> bool {
        match self {
            ExpectedState::Delivered => status == ItemStatus::Delivered,
            ExpectedState::OnDemo => status == ItemStatus::Demo,
            ExpectedState::InStock => !matches!(status, ItemStatus::Delivered | ItemStatus::Demo),
        }
    }
}

/// Outbound transaction with no inventory record behind it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrphanedTransaction {
    pub serial_number: String,
    pub transaction_id: Uuid,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Second outbound of the same kind while the first is still open
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateOutbound {
    pub serial_number: String,
    pub transaction_type: TransactionType,
    pub open_transaction_id: Uuid,
    pub open_reference: Option<String>,
    pub duplicate_transaction_id: Uuid,
    pub duplicate_reference: Option<String>,
}

/// Return or cancellation that had nothing to close
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnmatchedClosure {
    pub serial_number: String,
    pub transaction_id: Uuid,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockInAnomalyKind {
    /// Recorded while a delivery or demo was open
    WhileOut,
    /// Serial was already stocked in and never left
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockInAnomaly {
    pub serial_number: String,
    pub transaction_id: Uuid,
    pub kind: StockInAnomalyKind,
}

/// Item status that contradicts the replayed transactions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMismatch {
    pub serial_number: String,
    pub item_id: Uuid,
    pub recorded_status: ItemStatus,
    pub expected: ExpectedState,
    pub last_open_transaction_id: Option<Uuid>,
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscrepancyReport {
    pub analyzed_transactions: usize,
    /// Transactions without a usable serial number
    pub skipped_transactions: usize,
    pub analyzed_serials: usize,
    pub inventory_items: usize,
    pub delivered_transaction_count: usize,
    pub delivered_item_count: usize,
    /// delivered_transaction_count - delivered_item_count
    pub delivery_discrepancy: i64,
    pub orphaned_transactions: Vec<OrphanedTransaction>,
    pub duplicate_deliveries: Vec<DuplicateOutbound>,
    pub duplicate_demos: Vec<DuplicateOutbound>,
    pub unmatched_closures: Vec<UnmatchedClosure>,
    pub stock_in_anomalies: Vec<StockInAnomaly>,
    pub status_mismatches: Vec<StatusMismatch>,
    pub duplicate_item_serials: Vec<String>,
}

impl DiscrepancyReport {
    pub fn findings_count(&self) -> usize {
        self.orphaned_transactions.len()
            + self.duplicate_deliveries.len()
            + self.duplicate_demos.len()
            + self.unmatched_closures.len()
            + self.stock_in_anomalies.len()
            + self.status_mismatches.len()
            + self.duplicate_item_serials.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.findings_count() == 0 && self.delivery_discrepancy == 0
    }
}

/// Per-serial replay state
#[derive(Default)]
struct SerialLedger<'a> {
    open: Vec<&'a TransactionRecord>,
    /// Stocked in since the serial last left
    stocked_in: bool,
}

impl<'a> SerialLedger<'a> {
    fn last_open(&self, kind: TransactionType) -> Option<usize> {
        self.open.iter().rposition(|t| t.transaction_type == kind)
    }

    fn expected_state(&self) -> ExpectedState {
        match self.open.last().map(|t| t.transaction_type) {
            Some(TransactionType::StockOut) => ExpectedState::Delivered,
            Some(TransactionType::Demo) => ExpectedState::OnDemo,
            _ => ExpectedState::InStock,
        }
    }
}

/// Reconciles stock transactions against inventory state
pub struct TransactionDiscrepancyAnalyzer;

impl TransactionDiscrepancyAnalyzer {
    pub fn analyze(transactions: &[TransactionRecord], items: &[InventoryItem]) -> DiscrepancyReport {
        let mut report = DiscrepancyReport {
            inventory_items: items.len(),
            ..Default::default()
        };

        // The store gives no ordering guarantee
        let mut ordered: Vec<&TransactionRecord> = Vec::with_capacity(transactions.len());
        for tx in transactions {
            if normalize_serial(&tx.serial_number).is_empty() {
                report.skipped_transactions += 1;
            } else {
                ordered.push(tx);
            }
        }
        ordered.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
        report.analyzed_transactions = ordered.len();

        let mut ledgers: BTreeMap<String, SerialLedger> = BTreeMap::new();
        for tx in ordered {
            let serial = normalize_serial(&tx.serial_number);
            let ledger = ledgers.entry(serial.clone()).or_default();
            Self::apply(&mut report, &serial, ledger, tx);
        }
        report.analyzed_serials = ledgers.len();

        let mut items_by_serial: BTreeMap<String, Vec<&InventoryItem>> = BTreeMap::new();
        for item in items {
            items_by_serial
                .entry(normalize_serial(&item.serial_number))
                .or_default()
                .push(item);
        }

        for (serial, ledger) in &ledgers {
            let Some(latest) = ledger.open.last() else {
                continue;
            };
            if !items_by_serial.contains_key(serial) {
                report.orphaned_transactions.push(OrphanedTransaction {
                    serial_number: serial.clone(),
                    transaction_id: latest.id,
                    transaction_type: latest.transaction_type,
                    reference: latest.reference.clone(),
                    occurred_at: latest.occurred_at,
                });
            } else if latest.transaction_type == TransactionType::StockOut {
                report.delivered_transaction_count += 1;
            }
        }

        let empty = SerialLedger::default();
        for (serial, records) in &items_by_serial {
            if records.len() > 1 {
                report.duplicate_item_serials.push(serial.clone());
            }
            let ledger = ledgers.get(serial).unwrap_or(&empty);
            let expected = ledger.expected_state();
            for item in records {
                if item.status == ItemStatus::Delivered {
                    report.delivered_item_count += 1;
                }
                if !expected.accepts(item.status) {
                    report.status_mismatches.push(StatusMismatch {
                        serial_number: serial.clone(),
                        item_id: item.id,
                        recorded_status: item.status,
                        expected,
                        last_open_transaction_id: ledger.open.last().map(|t| t.id),
                    });
                }
            }
        }

        report.delivery_discrepancy =
            report.delivered_transaction_count as i64 - report.delivered_item_count as i64;
        report
    }

    fn apply<'a>(
        report: &mut DiscrepancyReport,
        serial: &str,
        ledger: &mut SerialLedger<'a>,
        tx: &'a TransactionRecord,
    ) {
        match tx.transaction_type {
            TransactionType::StockIn => {
                let kind = if !ledger.open.is_empty() {
                    Some(StockInAnomalyKind::WhileOut)
                } else if ledger.stocked_in {
                    Some(StockInAnomalyKind::Duplicate)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    report.stock_in_anomalies.push(StockInAnomaly {
                        serial_number: serial.to_string(),
                        transaction_id: tx.id,
                        kind,
                    });
                }
                ledger.stocked_in = true;
            }
            TransactionType::StockOut | TransactionType::Demo => {
                if let Some(idx) = ledger.last_open(tx.transaction_type) {
                    let open = ledger.open[idx];
                    let duplicate = DuplicateOutbound {
                        serial_number: serial.to_string(),
                        transaction_type: tx.transaction_type,
                        open_transaction_id: open.id,
                        open_reference: open.reference.clone(),
                        duplicate_transaction_id: tx.id,
                        duplicate_reference: tx.reference.clone(),
                    };
                    if tx.transaction_type == TransactionType::StockOut {
                        report.duplicate_deliveries.push(duplicate);
                    } else {
                        report.duplicate_demos.push(duplicate);
                    }
                }
                ledger.open.push(tx);
                ledger.stocked_in = false;
            }
            TransactionType::Returned => {
                if ledger.open.pop().is_none() {
                    report.unmatched_closures.push(Self::unmatched(serial, tx));
                }
            }
            TransactionType::Cancellation => match ledger.last_open(TransactionType::StockOut) {
                Some(idx) => {
                    ledger.open.remove(idx);
                }
                None => report.unmatched_closures.push(Self::unmatched(serial, tx)),
            },
        }
    }

    fn unmatched(serial: &str, tx: &TransactionRecord) -> UnmatchedClosure {
        UnmatchedClosure {
            serial_number: serial.to_string(),
            transaction_id: tx.id,
            transaction_type: tx.transaction_type,
            reference: tx.reference.clone(),
        }
    }
}

/// Count transactions per type, keyed by wire label
pub fn count_by_type(transactions: &[TransactionRecord]) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for tx in transactions {
        *counts.entry(tx.transaction_type.as_str()).or_insert(0) += 1;
    }
    counts
}
