use crate::dataset::table::{ColumnData, Table};
use crate::error::{AppError, Result};
use crate::models::{DATE_COLUMNS, TARGET_COLUMN};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use tracing::debug;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a timestamp or date to its calendar date.
///
/// Offset-carrying timestamps (Jira's `2019-03-04T10:11:12.000+0000`, RFC 3339) keep
/// the date as written, not the UTC date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Proleptic Gregorian ordinal, 0001-01-01 being day 1
pub fn date_to_ordinal(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64
}

/// Replace every date column by day ordinals. Missing cells stay missing.
pub fn convert_datetimes_to_ordinals(mut table: Table) -> Result<Table> {
    let keys = table.keys()?;

    for column in DATE_COLUMNS {
        let values = match table.column(column).map(|c| &c.data) {
            Some(ColumnData::Text(values)) => values,
            Some(_) => {
                return Err(AppError::Processing(format!(
                    "date column {} is not text",
                    column
                )))
            }
            None => return Err(AppError::Processing(format!("missing column {}", column))),
        };

        let ordinals = values
            .iter()
            .zip(keys.iter())
            .map(|(value, key)| match value.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(raw) => parse_date(raw)
                    .map(|date| Some(date_to_ordinal(date) as f64))
                    .ok_or_else(|| {
                        AppError::Processing(format!(
                            "unparseable {} value {:?} for {}",
                            column, raw, key
                        ))
                    }),
            })
            .collect::<Result<Vec<_>>>()?;

        table.replace_column(column, ColumnData::Numeric(ordinals))?;
        debug!(column, "converted dates to ordinals");
    }

    Ok(table)
}

/// Rows that carry an actual time-spent value
pub fn create_training_subset(table: &Table) -> Result<Table> {
    let target = table.numeric(TARGET_COLUMN)?;
    Ok(table.filter_rows(|i| target[i].is_some()))
}
