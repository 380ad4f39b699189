//! Reporting service for dashboards, stock and movement reports and CSV export

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::DateRange;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{convert_rows, Demo, DemoRow, DEMO_COLUMNS};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_items: i64,
    pub active_items: i64,
    pub reserved_items: i64,
    pub invoiced_items: i64,
    pub delivered_items: i64,
    pub demo_items: i64,
    pub disposed_items: i64,
    pub open_orders: i64,
    pub deliveries_last_30_days: i64,
    pub active_demos: i64,
    pub overdue_demos: i64,
    pub invoiced_total_last_30_days: Decimal,
    pub low_stock_categories: i64,
}

/// Stock position per category and model
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockReportRow {
    pub equipment_category: String,
    pub model: String,
    pub active: i64,
    pub reserved: i64,
    pub invoiced: i64,
    pub delivered: i64,
    pub demo: i64,
    pub disposed: i64,
    pub total: i64,
    /// Sum of unit prices of in-stock items
    pub stock_value: Decimal,
}

/// Transaction count for one month and type
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MovementReportRow {
    pub period: String,
    pub transaction_type: String,
    pub transaction_count: i64,
}

/// One line of the demo report
#[derive(Debug, Serialize)]
pub struct DemoReportRow {
    pub demo_number: String,
    pub customer_name: String,
    pub status: String,
    pub loaned_at: DateTime<Utc>,
    pub expected_return_date: NaiveDate,
    pub serial_count: usize,
    pub outstanding_count: usize,
    pub days_overdue: i64,
}

/// Report filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
}

impl DemoReportRow {
    pub fn from_demo(demo: &Demo, today: NaiveDate) -> Self {
        Self {
            demo_number: demo.demo_number.clone(),
            customer_name: demo.customer_name.clone(),
            status: demo.status.as_str().to_string(),
            loaned_at: demo.loaned_at,
            expected_return_date: demo.expected_return_date,
            serial_count: demo.serial_numbers.len(),
            outstanding_count: demo.outstanding_serials().len(),
            days_overdue: demo.days_overdue(today),
        }
    }
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics
    pub async fn get_dashboard_metrics(&self, low_stock_threshold: i64) -> AppResult<DashboardMetrics> {
        let counts: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'active'),
                COUNT(*) FILTER (WHERE status = 'reserved'),
                COUNT(*) FILTER (WHERE status = 'invoiced'),
                COUNT(*) FILTER (WHERE status = 'delivered'),
                COUNT(*) FILTER (WHERE status = 'demo'),
                COUNT(*) FILTER (WHERE status = 'disposed')
            FROM inventory_items
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let open_orders: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE status IN ('pending', 'invoiced')",
        )
        .fetch_one(&self.db)
        .await?;

        let deliveries: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE delivered_at >= NOW() - INTERVAL '30 days'
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let demo_counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status <> 'returned'),
                COUNT(*) FILTER (WHERE status <> 'returned' AND expected_return_date < CURRENT_DATE)
            FROM demos
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let invoiced_total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(i.total), 0)
            FROM invoices i
            JOIN orders o ON o.id = i.order_id
            WHERE i.invoice_date >= CURRENT_DATE - INTERVAL '30 days'
              AND o.status <> 'cancelled'
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let low_stock: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT equipment_category
                FROM inventory_items
                WHERE status <> 'disposed'
                GROUP BY equipment_category
                HAVING COUNT(*) FILTER (WHERE status = 'active') <= $1
            ) low
            "#,
        )
        .bind(low_stock_threshold)
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            total_items: counts.0,
            active_items: counts.1,
            reserved_items: counts.2,
            invoiced_items: counts.3,
            delivered_items: counts.4,
            demo_items: counts.5,
            disposed_items: counts.6,
            open_orders,
            deliveries_last_30_days: deliveries,
            active_demos: demo_counts.0,
            overdue_demos: demo_counts.1,
            invoiced_total_last_30_days: invoiced_total,
            low_stock_categories: low_stock,
        })
    }

    /// Stock position grouped by category and model
    pub async fn get_stock_report(&self, filter: &ReportFilter) -> AppResult<Vec<StockReportRow>> {
        let rows = sqlx::query_as::<_, StockReportRow>(
            r#"
            SELECT
                equipment_category,
                model,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'reserved') AS reserved,
                COUNT(*) FILTER (WHERE status = 'invoiced') AS invoiced,
                COUNT(*) FILTER (WHERE status = 'delivered') AS delivered,
                COUNT(*) FILTER (WHERE status = 'demo') AS demo,
                COUNT(*) FILTER (WHERE status = 'disposed') AS disposed,
                COUNT(*) AS total,
                COALESCE(SUM(unit_price) FILTER (WHERE status = 'active'), 0) AS stock_value
            FROM inventory_items
            WHERE ($1::text IS NULL OR equipment_category = $1)
            GROUP BY equipment_category, model
            ORDER BY equipment_category, model
            "#,
        )
        .bind(&filter.category)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Transaction counts per month and type
    pub async fn get_movement_report(&self, filter: &ReportFilter) -> AppResult<Vec<MovementReportRow>> {
        let range = DateRange::from_bounds(filter.start_date, filter.end_date);

        let rows = sqlx::query_as::<_, MovementReportRow>(
            r#"
            SELECT
                TO_CHAR(DATE_TRUNC('month', occurred_at), 'YYYY-MM') AS period,
                transaction_type,
                COUNT(*) AS transaction_count
            FROM transactions
            WHERE occurred_at::date BETWEEN $1 AND $2
            GROUP BY period, transaction_type
            ORDER BY period, transaction_type
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Every demo loaned within the range, with overdue days as of `today`
    pub async fn get_demo_report(&self, filter: &ReportFilter, today: NaiveDate) -> AppResult<Vec<DemoReportRow>> {
        let range = DateRange::from_bounds(filter.start_date, filter.end_date);

        let rows = sqlx::query_as::<_, DemoRow>(&format!(
            r#"
            SELECT {} FROM demos
            WHERE loaned_at::date BETWEEN $1 AND $2
            ORDER BY loaned_at DESC
            "#,
            DEMO_COLUMNS
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let demos: Vec<Demo> = convert_rows(rows)?;
        Ok(demos.iter().map(|d| DemoReportRow::from_demo(d, today)).collect())
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_to_csv_writes_header_and_rows() {
        let rows = vec![
            MovementReportRow {
                period: "2024-05".to_string(),
                transaction_type: "Stock_In".to_string(),
                transaction_count: 12,
            },
            MovementReportRow {
                period: "2024-05".to_string(),
                transaction_type: "Stock_Out".to_string(),
                transaction_count: 4,
            },
        ];
        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "period,transaction_type,transaction_count");
        assert_eq!(lines[1], "2024-05,Stock_In,12");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_export_empty_is_empty() {
        let rows: Vec<MovementReportRow> = Vec::new();
        assert_eq!(ReportingService::export_to_csv(&rows).unwrap(), "");
    }
}
