//! Per-serial activity history
//!
//! Builds one timeline for a serial number out of the inventory record, its
//! stock transactions and every order, invoice, demo and return document that
//! lists it. The same real-world event is usually recorded twice (a document
//! timestamp and a transaction), so events sharing kind and reference are
//! merged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    normalize_serial, Demo, InventoryItem, Invoice, ItemStatus, Order, ReturnRecord,
    TransactionRecord, TransactionType,
};

pub const DEMO_PREFIX: &str = "DEMO-";

/// Kind of timeline event, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Registered,
    StockedIn,
    OrderPlaced,
    Invoiced,
    Delivered,
    Cancelled,
    DemoOut,
    DemoReturned,
    Returned,
}

/// Collection an event was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Item,
    Transaction,
    Order,
    Invoice,
    Demo,
    Return,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub occurred_at: DateTime<Utc>,
    pub reference: Option<String>,
    pub customer: Option<String>,
    pub description: String,
    pub sources: Vec<ActivitySource>,
    /// Number of records merged into this event
    pub record_count: usize,
    pub transaction_id: Option<Uuid>,
}

/// Raw records to build a timeline from; may include other serials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySources {
    pub item: Option<InventoryItem>,
    pub transactions: Vec<TransactionRecord>,
    pub orders: Vec<Order>,
    pub invoices: Vec<Invoice>,
    pub demos: Vec<Demo>,
    pub returns: Vec<ReturnRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivitySummary {
    pub current_status: Option<ItemStatus>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub delivery_count: usize,
    pub demo_count: usize,
    pub return_count: usize,
    pub cancellation_count: usize,
    pub days_on_demo: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemActivityHistory {
    pub serial_number: String,
    pub events: Vec<ActivityEvent>,
    pub summary: ActivitySummary,
}

/// Accumulates events, merging those with the same kind and reference
struct Timeline {
    events: Vec<ActivityEvent>,
}

impl Timeline {
    fn push(
        &mut self,
        kind: ActivityKind,
        occurred_at: DateTime<Utc>,
        reference: Option<&str>,
        customer: Option<&str>,
        description: String,
        source: ActivitySource,
        transaction_id: Option<Uuid>,
    ) {
        let existing = reference.and_then(|r| {
            self.events
                .iter_mut()
                .find(|e| e.kind == kind && e.reference.as_deref() == Some(r))
        });

        match existing {
            Some(event) => {
                if occurred_at < event.occurred_at {
                    event.occurred_at = occurred_at;
                }
                if !event.sources.contains(&source) {
                    event.sources.push(source);
                }
                if event.customer.is_none() {
                    event.customer = customer.map(str::to_string);
                }
                if event.transaction_id.is_none() {
                    event.transaction_id = transaction_id;
                }
                event.record_count += 1;
            }
            None => self.events.push(ActivityEvent {
                kind,
                occurred_at,
                reference: reference.map(str::to_string),
                customer: customer.map(str::to_string),
                description,
                sources: vec![source],
                record_count: 1,
                transaction_id,
            }),
        }
    }
}

fn lists(serials: &[String], key: &str) -> bool {
    serials.iter().any(|s| normalize_serial(s) == key)
}

/// Reconstruct the timeline of one serial number as of `as_of`
pub fn build_item_activity(
    serial: &str,
    sources: &ActivitySources,
    as_of: DateTime<Utc>,
) -> ItemActivityHistory {
    let key = normalize_serial(serial);
    let mut timeline = Timeline { events: Vec::new() };

    for order in sources.orders.iter().filter(|o| lists(&o.serial_numbers, &key)) {
        let reference = Some(order.order_number.as_str());
        let customer = Some(order.customer_name.as_str());
        timeline.push(
            ActivityKind::OrderPlaced,
            order.created_at,
            reference,
            customer,
            format!("Order {} placed for {}", order.order_number, order.customer_name),
            ActivitySource::Order,
            None,
        );
        if let Some(at) = order.invoiced_at {
            timeline.push(
                ActivityKind::Invoiced,
                at,
                reference,
                customer,
                format!("Order {} invoiced", order.order_number),
                ActivitySource::Order,
                None,
            );
        }
        if let Some(at) = order.delivered_at {
            timeline.push(
                ActivityKind::Delivered,
                at,
                reference,
                customer,
                format!("Delivered to {} on order {}", order.customer_name, order.order_number),
                ActivitySource::Order,
                None,
            );
        }
        if let Some(at) = order.cancelled_at {
            let reason = order.cancellation_reason.as_deref().unwrap_or("no reason given");
            timeline.push(
                ActivityKind::Cancelled,
                at,
                reference,
                customer,
                format!("Order {} cancelled: {}", order.order_number, reason),
                ActivitySource::Order,
                None,
            );
        }
    }

    for invoice in &sources.invoices {
        if !invoice.lines.iter().any(|l| normalize_serial(&l.serial_number) == key) {
            continue;
        }
        timeline.push(
            ActivityKind::Invoiced,
            invoice.created_at,
            Some(invoice.order_number.as_str()),
            Some(invoice.customer_name.as_str()),
            format!("Invoice {} issued for order {}", invoice.invoice_number, invoice.order_number),
            ActivitySource::Invoice,
            None,
        );
    }

    for demo in sources.demos.iter().filter(|d| lists(&d.serial_numbers, &key)) {
        let reference = Some(demo.demo_number.as_str());
        let customer = Some(demo.customer_name.as_str());
        timeline.push(
            ActivityKind::DemoOut,
            demo.loaned_at,
            reference,
            customer,
            format!("Loaned to {} on demo {}", demo.customer_name, demo.demo_number),
            ActivitySource::Demo,
            None,
        );
        if let Some(at) = demo.returned_at {
            if lists(&demo.returned_serials, &key) {
                timeline.push(
                    ActivityKind::DemoReturned,
                    at,
                    reference,
                    customer,
                    format!("Returned from demo {}", demo.demo_number),
                    ActivitySource::Demo,
                    None,
                );
            }
        }
    }

    for ret in sources.returns.iter().filter(|r| lists(&r.serial_numbers, &key)) {
        timeline.push(
            ActivityKind::Returned,
            ret.returned_at,
            Some(ret.return_number.as_str()),
            None,
            format!("Returned on {} from order {}: {}", ret.return_number, ret.order_number, ret.reason),
            ActivitySource::Return,
            None,
        );
    }

    let mut transactions: Vec<&TransactionRecord> = sources
        .transactions
        .iter()
        .filter(|t| normalize_serial(&t.serial_number) == key)
        .collect();
    transactions.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));

    let mut open: Vec<TransactionType> = Vec::new();
    for tx in transactions {
        let reference = tx.reference.as_deref();
        let (kind, description) = match tx.transaction_type {
            TransactionType::StockIn => (ActivityKind::StockedIn, "Stocked in".to_string()),
            TransactionType::StockOut => {
                open.push(TransactionType::StockOut);
                (ActivityKind::Delivered, "Stock out recorded".to_string())
            }
            TransactionType::Demo => {
                open.push(TransactionType::Demo);
                (ActivityKind::DemoOut, "Demo loan recorded".to_string())
            }
            TransactionType::Cancellation => {
                if let Some(idx) = open.iter().rposition(|t| *t == TransactionType::StockOut) {
                    open.remove(idx);
                }
                (ActivityKind::Cancelled, "Cancellation recorded".to_string())
            }
            TransactionType::Returned => {
                let closed = open.pop();
                let from_demo = reference.is_some_and(|r| r.starts_with(DEMO_PREFIX))
                    || closed == Some(TransactionType::Demo);
                if from_demo {
                    (ActivityKind::DemoReturned, "Demo return recorded".to_string())
                } else {
                    (ActivityKind::Returned, "Customer return recorded".to_string())
                }
            }
        };
        timeline.push(
            kind,
            tx.occurred_at,
            reference,
            tx.customer.as_deref(),
            description,
            ActivitySource::Transaction,
            Some(tx.id),
        );
    }

    if let Some(item) = &sources.item {
        if !timeline.events.iter().any(|e| e.kind == ActivityKind::StockedIn) {
            timeline.push(
                ActivityKind::Registered,
                item.created_at,
                None,
                None,
                format!("{} {} registered", item.equipment_category, item.model),
                ActivitySource::Item,
                None,
            );
        }
    }

    let mut events = timeline.events;
    events.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.kind.cmp(&b.kind)));

    let summary = summarize(&events, sources.item.as_ref().map(|i| i.status), as_of);
    ItemActivityHistory {
        serial_number: key,
        events,
        summary,
    }
}

fn summarize(
    events: &[ActivityEvent],
    current_status: Option<ItemStatus>,
    as_of: DateTime<Utc>,
) -> ActivitySummary {
    let count = |kind: ActivityKind| events.iter().filter(|e| e.kind == kind).count();

    let mut on_demo = Duration::zero();
    let mut demo_started: Option<DateTime<Utc>> = None;
    for event in events {
        match event.kind {
            ActivityKind::DemoOut => {
                demo_started.get_or_insert(event.occurred_at);
            }
            ActivityKind::DemoReturned => {
                if let Some(start) = demo_started.take() {
                    on_demo = on_demo + (event.occurred_at - start);
                }
            }
            _ => {}
        }
    }
    if let Some(start) = demo_started {
        if as_of > start {
            on_demo = on_demo + (as_of - start);
        }
    }

    ActivitySummary {
        current_status,
        first_seen: events.first().map(|e| e.occurred_at),
        last_activity: events.last().map(|e| e.occurred_at),
        delivery_count: count(ActivityKind::Delivered),
        demo_count: count(ActivityKind::DemoOut),
        return_count: count(ActivityKind::Returned),
        cancellation_count: count(ActivityKind::Cancelled),
        days_on_demo: on_demo.num_days(),
    }
}
