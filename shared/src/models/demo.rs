//! Demo loan models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::normalize_serial;

/// Demo loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoStatus {
    Active,
    PartiallyReturned,
    Returned,
}

impl DemoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoStatus::Active => "active",
            DemoStatus::PartiallyReturned => "partially_returned",
            DemoStatus::Returned => "returned",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label {
            "active" => Some(DemoStatus::Active),
            "partially_returned" => Some(DemoStatus::PartiallyReturned),
            "returned" => Some(DemoStatus::Returned),
            _ => None,
        }
    }
}

/// Equipment loaned to a customer for evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demo {
    pub id: Uuid,
    pub demo_number: String,
    pub customer_name: String,
    pub contact: Option<String>,
    pub serial_numbers: Vec<String>,
    pub returned_serials: Vec<String>,
    pub loaned_at: DateTime<Utc>,
    pub expected_return_date: NaiveDate,
    /// Set when the last outstanding serial comes back
    pub returned_at: Option<DateTime<Utc>>,
    pub status: DemoStatus,
    pub created_by: Option<Uuid>,
}

impl Demo {
    /// Serials still with the customer
    pub fn outstanding_serials(&self) -> Vec<String> {
        let returned: Vec<String> = self.returned_serials.iter().map(|s| normalize_serial(s)).collect();
        self.serial_numbers
            .iter()
            .filter(|s| !returned.contains(&normalize_serial(s)))
            .cloned()
            .collect()
    }

    /// Status implied by a returned set
    pub fn status_after_return(&self, returned: &[String]) -> DemoStatus {
        let returned: Vec<String> = returned.iter().map(|s| normalize_serial(s)).collect();
        let back = self
            .serial_numbers
            .iter()
            .filter(|s| returned.contains(&normalize_serial(s)))
            .count();

        if back == 0 {
            DemoStatus::Active
        } else if back >= self.serial_numbers.len() {
            DemoStatus::Returned
        } else {
            DemoStatus::PartiallyReturned
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != DemoStatus::Returned && today > self.expected_return_date
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.expected_return_date).num_days()
        } else {
            0
        }
    }
}
