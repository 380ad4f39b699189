//! Bulk stock-in from CSV files

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{normalize_serial, validate_serial_number, validate_unit_price};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{InventoryService, StockInInput};

/// Import service
#[derive(Clone)]
pub struct ImportService {
    db: PgPool,
}

/// One CSV record. Header names match the field names.
#[derive(Debug, Deserialize)]
struct ImportRow {
    serial_number: String,
    equipment_category: String,
    model: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    batch: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    remark: Option<String>,
    #[serde(default)]
    unit_price: Option<Decimal>,
}

/// A row that was not imported
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedRow {
    /// 1-based data row number (the header is row 0)
    pub row: usize,
    pub serial_number: Option<String>,
    pub reason: String,
}

/// Outcome of an import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub imported_serials: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

/// Rows ready to stock in plus those rejected while parsing
#[derive(Debug)]
pub struct ParsedImport {
    pub rows: Vec<(usize, StockInInput)>,
    pub skipped: Vec<SkippedRow>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse and validate CSV content without touching the database.
/// Serials repeated within the file keep their first occurrence.
pub fn parse_import(body: &[u8]) -> AppResult<ParsedImport> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body);

    let headers = reader
        .headers()
        .map_err(|e| AppError::validation("file", format!("Unreadable CSV header: {}", e)))?
        .clone();
    for required in ["serial_number", "equipment_category", "model"] {
        if !headers.iter().any(|h| h == required) {
            return Err(AppError::validation(
                "file",
                format!("CSV header is missing the {} column", required),
            ));
        }
    }

    let mut seen = HashSet::new();
    let mut parsed = ParsedImport {
        rows: Vec::new(),
        skipped: Vec::new(),
    };

    for (index, record) in reader.deserialize::<ImportRow>().enumerate() {
        let row_number = index + 1;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                parsed.skipped.push(SkippedRow {
                    row: row_number,
                    serial_number: None,
                    reason: format!("Malformed row: {}", e),
                });
                continue;
            }
        };

        let serial = normalize_serial(&row.serial_number);
        let skip = |reason: String| SkippedRow {
            row: row_number,
            serial_number: Some(serial.clone()),
            reason,
        };

        if let Err(e) = validate_serial_number(&serial) {
            parsed.skipped.push(skip(e.to_string()));
            continue;
        }
        if !seen.insert(serial.clone()) {
            parsed.skipped.push(skip("Duplicate serial number in file".to_string()));
            continue;
        }

        let input = StockInInput {
            serial_number: serial.clone(),
            equipment_category: row.equipment_category,
            model: row.model,
            size: non_empty(row.size),
            batch: non_empty(row.batch),
            location: non_empty(row.location),
            remark: non_empty(row.remark),
            unit_price: row.unit_price,
        };
        if let Err(errors) = input.validate() {
            let message = match AppError::from(errors) {
                AppError::Validation { message, .. } => message,
                other => other.to_string(),
            };
            parsed.skipped.push(skip(message));
            continue;
        }
        if let Some(Err(e)) = input.unit_price.map(validate_unit_price) {
            parsed.skipped.push(skip(e.to_string()));
            continue;
        }

        parsed.rows.push((row_number, input));
    }

    Ok(parsed)
}

impl ImportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stock in every valid row whose serial is not already registered
    pub async fn import_csv(&self, user_id: Uuid, body: &[u8]) -> AppResult<ImportReport> {
        let ParsedImport { rows, mut skipped } = parse_import(body)?;

        let serials: Vec<String> = rows.iter().map(|(_, input)| input.serial_number.clone()).collect();
        let existing: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT serial_number FROM inventory_items WHERE serial_number = ANY($1)",
        )
        .bind(&serials)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let mut tx = self.db.begin().await?;
        let mut imported_serials = Vec::new();
        for (row_number, input) in rows {
            if existing.contains(&input.serial_number) {
                skipped.push(SkippedRow {
                    row: row_number,
                    serial_number: Some(input.serial_number),
                    reason: "Serial number already exists".to_string(),
                });
                continue;
            }
            let item = InventoryService::stock_in_with(&mut tx, user_id, input).await?;
            imported_serials.push(item.serial_number);
        }
        tx.commit().await?;

        skipped.sort_by_key(|s| s.row);
        tracing::info!(
            imported = imported_serials.len(),
            skipped = skipped.len(),
            "CSV import finished"
        );

        Ok(ImportReport {
            imported: imported_serials.len(),
            imported_serials,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_rows() {
        let csv = "serial_number,equipment_category,model,size,batch,location,remark,unit_price\n\
                   wc-001,Wheelchair,Transit,18in,B1,Shelf A,,1500.00\n\
                   wc-002,Wheelchair,Transit,,,,,\n";
        let parsed = parse_import(csv.as_bytes()).unwrap();
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].1.serial_number, "WC-001");
        assert_eq!(parsed.rows[1].1.size, None);
        assert_eq!(parsed.rows[0].1.unit_price, Some(Decimal::new(150000, 2)));
    }

    #[test]
    fn test_parse_skips_duplicates_and_invalid_serials() {
        let csv = "serial_number,equipment_category,model\n\
                   WC-001,Wheelchair,Transit\n\
                   wc-001 ,Wheelchair,Transit\n\
                   x,Wheelchair,Transit\n\
                   WC-003,,Transit\n";
        let parsed = parse_import(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        let rows: Vec<usize> = parsed.skipped.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert_eq!(parsed.skipped[0].reason, "Duplicate serial number in file");
        assert_eq!(parsed.skipped[2].reason, "Equipment category is required");
    }

    #[test]
    fn test_parse_skips_unstorable_rows() {
        let long_batch = "B".repeat(51);
        let csv = format!(
            "serial_number,equipment_category,model,batch,unit_price\n\
             WC-001,Wheelchair,Transit,{},\n\
             WC-002,Wheelchair,Transit,B1,99999999999\n\
             WC-003,Wheelchair,Transit,{},10.00\n",
            long_batch,
            "B".repeat(50)
        );
        let parsed = parse_import(csv.as_bytes()).unwrap();
        let rows: Vec<usize> = parsed.skipped.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].1.serial_number, "WC-003");
    }

    #[test]
    fn test_parse_requires_header_columns() {
        let csv = "serial,category\nWC-001,Wheelchair\n";
        assert!(matches!(
            parse_import(csv.as_bytes()),
            Err(AppError::Validation { .. })
        ));
    }
}
