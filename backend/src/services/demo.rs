//! Demo loan service

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{normalize_serial, validate_serial_batch, PaginatedResponse, Pagination};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    convert_rows, Demo, DemoRow, DemoStatus, ItemStatus, TransactionType, DEMO_COLUMNS,
};
use crate::services::stock::{self, Movement};

/// Demo service
#[derive(Clone)]
pub struct DemoService {
    db: PgPool,
    default_days: i64,
}

/// Input for lending items on demo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDemoInput {
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(length(max = 255))]
    pub contact: Option<String>,
    pub serial_numbers: Vec<String>,
    pub expected_return_date: Option<NaiveDate>,
}

/// Input for returning demo items. All outstanding serials when omitted.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnDemoInput {
    pub serial_numbers: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Filter for listing demos
#[derive(Debug, Default, Deserialize)]
pub struct DemoFilter {
    pub status: Option<DemoStatus>,
    pub customer: Option<String>,
    pub serial_number: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A demo past its expected return date
#[derive(Debug, Clone, Serialize)]
pub struct OverdueDemo {
    #[serde(flatten)]
    pub demo: Demo,
    pub outstanding_serials: Vec<String>,
    pub days_overdue: i64,
}

/// Resolve which serials a return covers
pub fn serials_to_return(demo: &Demo, requested: Option<&[String]>) -> AppResult<Vec<String>> {
    let outstanding = demo.outstanding_serials();
    let Some(requested) = requested else {
        if outstanding.is_empty() {
            return Err(AppError::InvalidStateTransition(format!(
                "Demo {} has already been returned",
                demo.demo_number
            )));
        }
        return Ok(outstanding);
    };

    let requested = validate_serial_batch(requested)?;
    for serial in &requested {
        if !outstanding.iter().any(|s| normalize_serial(s) == *serial) {
            return Err(AppError::validation(
                "serial_numbers",
                format!("{} is not outstanding on demo {}", serial, demo.demo_number),
            ));
        }
    }
    Ok(requested)
}

impl DemoService {
    pub fn new(db: PgPool, default_days: i64) -> Self {
        Self { db, default_days }
    }

    /// Lend in-stock items to a customer
    pub async fn create_demo(&self, user_id: Uuid, input: CreateDemoInput) -> AppResult<Demo> {
        input.validate()?;
        let serials = validate_serial_batch(&input.serial_numbers)?;
        let today = Utc::now().date_naive();
        let expected_return_date = input
            .expected_return_date
            .unwrap_or(today + Duration::days(self.default_days));
        if expected_return_date < today {
            return Err(AppError::validation(
                "expected_return_date",
                "Expected return date cannot be in the past",
            ));
        }

        let mut tx = self.db.begin().await?;
        let items = stock::lock_items(&mut tx, &serials).await?;
        stock::require_status(&items, ItemStatus::Active)?;
        stock::move_items(&mut tx, &items, ItemStatus::Demo).await?;

        let demo_number = stock::next_document_number(&mut tx, "DEMO").await?;
        stock::record_movements(
            &mut tx,
            &serials,
            &Movement {
                transaction_type: TransactionType::Demo,
                reference: Some(&demo_number),
                customer: Some(input.customer_name.trim()),
                created_by: user_id,
                notes: None,
            },
        )
        .await?;

        let row = sqlx::query_as::<_, DemoRow>(&format!(
            r#"
            INSERT INTO demos (demo_number, customer_name, contact, serial_numbers, expected_return_date, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            DEMO_COLUMNS
        ))
        .bind(&demo_number)
        .bind(input.customer_name.trim())
        .bind(&input.contact)
        .bind(&serials)
        .bind(expected_return_date)
        .bind(DemoStatus::Active.as_str())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(demo_number = %demo_number, serials = serials.len(), "Created demo loan");
        row.try_into()
    }

    /// Bring demo items back into stock
    pub async fn return_demo(
        &self,
        user_id: Uuid,
        demo_id: Uuid,
        input: ReturnDemoInput,
    ) -> AppResult<Demo> {
        let mut tx = self.db.begin().await?;
        let demo: Demo = sqlx::query_as::<_, DemoRow>(&format!(
            "SELECT {} FROM demos WHERE id = $1 FOR UPDATE",
            DEMO_COLUMNS
        ))
        .bind(demo_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Demo".to_string()))?
        .try_into()?;

        let serials = serials_to_return(&demo, input.serial_numbers.as_deref())?;
        let items = stock::lock_items(&mut tx, &serials).await?;
        stock::require_status(&items, ItemStatus::Demo)?;
        stock::move_items(&mut tx, &items, ItemStatus::Active).await?;
        stock::record_movements(
            &mut tx,
            &serials,
            &Movement {
                transaction_type: TransactionType::Returned,
                reference: Some(&demo.demo_number),
                customer: Some(&demo.customer_name),
                created_by: user_id,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        let mut returned = demo.returned_serials.clone();
        returned.extend(serials.iter().cloned());
        let status = demo.status_after_return(&returned);

        let row = sqlx::query_as::<_, DemoRow>(&format!(
            r#"
            UPDATE demos SET
                returned_serials = $2,
                status = $3,
                returned_at = CASE WHEN $3 = 'returned' THEN NOW() ELSE returned_at END
            WHERE id = $1
            RETURNING {}
            "#,
            DEMO_COLUMNS
        ))
        .bind(demo.id)
        .bind(&returned)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            demo_number = %demo.demo_number,
            serials = serials.len(),
            status = status.as_str(),
            "Returned demo items"
        );
        row.try_into()
    }

    /// List demos, newest first
    pub async fn list_demos(&self, filter: &DemoFilter) -> AppResult<PaginatedResponse<Demo>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let status = filter.status.map(|s| s.as_str());
        let customer = filter
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("%{}%", c));
        let serial = filter.serial_number.as_deref().map(normalize_serial);

        let conditions = r#"
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR customer_name ILIKE $2)
              AND ($3::text IS NULL OR $3 = ANY(serial_numbers))
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM demos {}", conditions))
            .bind(status)
            .bind(&customer)
            .bind(&serial)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, DemoRow>(&format!(
            "SELECT {} FROM demos {} ORDER BY loaned_at DESC LIMIT $4 OFFSET $5",
            DEMO_COLUMNS, conditions
        ))
        .bind(status)
        .bind(&customer)
        .bind(&serial)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(convert_rows(rows)?, &pagination, total as u64))
    }

    pub async fn get_demo(&self, demo_id: Uuid) -> AppResult<Demo> {
        sqlx::query_as::<_, DemoRow>(&format!("SELECT {} FROM demos WHERE id = $1", DEMO_COLUMNS))
            .bind(demo_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Demo".to_string()))?
            .try_into()
    }

    /// Open demos whose expected return date is before `today`, most overdue first
    pub async fn overdue_demos(&self, today: NaiveDate) -> AppResult<Vec<OverdueDemo>> {
        let rows = sqlx::query_as::<_, DemoRow>(&format!(
            r#"
            SELECT {} FROM demos
            WHERE status <> 'returned' AND expected_return_date < $1
            ORDER BY expected_return_date, demo_number
            "#,
            DEMO_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        let demos: Vec<Demo> = convert_rows(rows)?;
        Ok(demos
            .into_iter()
            .filter(|d| d.is_overdue(today))
            .map(|demo| OverdueDemo {
                outstanding_serials: demo.outstanding_serials(),
                days_overdue: demo.days_overdue(today),
                demo,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(serials: &[&str], returned: &[&str]) -> Demo {
        Demo {
            id: Uuid::new_v4(),
            demo_number: "DEMO-2024-0003".to_string(),
            customer_name: "Rehab Clinic".to_string(),
            contact: None,
            serial_numbers: serials.iter().map(|s| s.to_string()).collect(),
            returned_serials: returned.iter().map(|s| s.to_string()).collect(),
            loaned_at: Utc::now(),
            expected_return_date: Utc::now().date_naive(),
            returned_at: None,
            status: DemoStatus::Active,
            created_by: None,
        }
    }

    #[test]
    fn test_return_all_outstanding_by_default() {
        let d = demo(&["SN-1", "SN-2", "SN-3"], &["SN-2"]);
        assert_eq!(serials_to_return(&d, None).unwrap(), vec!["SN-1", "SN-3"]);
    }

    #[test]
    fn test_return_specific_serials() {
        let d = demo(&["SN-1", "SN-2"], &[]);
        let requested = vec!["sn-2".to_string()];
        assert_eq!(serials_to_return(&d, Some(&requested)).unwrap(), vec!["SN-2"]);
    }

    #[test]
    fn test_return_rejects_non_outstanding() {
        let d = demo(&["SN-1", "SN-2"], &["SN-2"]);
        let requested = vec!["SN-2".to_string()];
        assert!(serials_to_return(&d, Some(&requested)).is_err());

        let done = demo(&["SN-1"], &["SN-1"]);
        assert!(matches!(
            serials_to_return(&done, None),
            Err(AppError::InvalidStateTransition(_))
        ));
    }
}
