//! Code for reading the price shape CSV files.
use super::input_err_msg;
use crate::market::Market;
use crate::price::shape::{ShapeRow, ShapeTable};
use crate::time::Resolution;
use anyhow::{Context, Result, bail, ensure};
use std::path::Path;

const DAY_AHEAD_SHAPES_FILE_NAME: &str = "day_ahead_shapes.csv";
const INTRADAY_SHAPES_FILE_NAME: &str = "intraday_shapes.csv";

/// Read the shape table for a market from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `market` - Either [`Market::DayAhead`] (hourly shapes) or [`Market::Intraday`] (15-minute
///   shapes)
pub fn read_shape_table(model_dir: &Path, market: Market) -> Result<ShapeTable> {
    let (file_name, resolution) = match market {
        Market::DayAhead => (DAY_AHEAD_SHAPES_FILE_NAME, Resolution::Hourly),
        Market::Intraday => (INTRADAY_SHAPES_FILE_NAME, Resolution::QuarterHourly),
        _ => bail!("The {market} market has no price shapes"),
    };

    let file_path = model_dir.join(file_name);
    read_shape_table_from_path(&file_path, resolution).with_context(|| input_err_msg(&file_path))
}

/// Read a shape table from a CSV file.
///
/// The file has a `month` column and a `day` column (e.g. "2-6" or "7"), followed by one column
/// per step of the day. The value column headers are not interpreted.
fn read_shape_table_from_path(file_path: &Path, resolution: Resolution) -> Result<ShapeTable> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader.headers()?.clone();
    ensure!(
        headers.get(0) == Some("month") && headers.get(1) == Some("day"),
        "The first two columns must be month and day"
    );

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = parse_shape_record(&record)
            .with_context(|| format!("Invalid price shape on data row {}", index + 1))?;
        rows.push(row);
    }
    ensure!(!rows.is_empty(), "Price shape file cannot be empty");

    ShapeTable::new(resolution, rows)
}

fn parse_shape_record(record: &csv::StringRecord) -> Result<ShapeRow> {
    let mut fields = record.iter();
    let (Some(month), Some(days)) = (fields.next(), fields.next()) else {
        bail!("Missing month or day column");
    };

    let month = month
        .trim()
        .parse()
        .with_context(|| format!("Invalid month: {month}"))?;
    let days = days.parse()?;
    let values = fields
        .map(|value| {
            value
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid price shape value: {value}"))
        })
        .collect::<Result<_>>()?;

    Ok(ShapeRow {
        month,
        days,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use std::fs;
    use tempfile::tempdir;

    fn shape_csv(rows: &[(&str, &str)], steps: usize) -> String {
        let header = (0..steps).map(|step| format!("v{step}")).join(",");
        let mut contents = format!("month,day,{header}\n");
        for (month, days) in rows {
            let values = (0..steps).map(|step| (100 + step).to_string()).join(",");
            contents.push_str(&format!("{month},{days},{values}\n"));
        }
        contents
    }

    #[test]
    fn test_read_shape_table() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(DAY_AHEAD_SHAPES_FILE_NAME),
            shape_csv(&[("1", "1-5"), ("1", "6-7")], 24),
        )
        .unwrap();

        let table = read_shape_table(dir.path(), Market::DayAhead).unwrap();
        assert_eq!(table.resolution(), Resolution::Hourly);
        assert_eq!(table.iter().count(), 2);
        let row = table.find(1, 6).unwrap();
        assert_eq!(row.values.len(), 24);
        assert_eq!(row.values[23], 123.0);
    }

    #[test]
    fn test_read_shape_table_wrong_resolution() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(INTRADAY_SHAPES_FILE_NAME),
            shape_csv(&[("1", "1-7")], 24),
        )
        .unwrap();

        assert!(read_shape_table(dir.path(), Market::Intraday).is_err());
    }

    #[test]
    fn test_read_shape_table_bad_day_range() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(DAY_AHEAD_SHAPES_FILE_NAME),
            shape_csv(&[("1", "5-1")], 24),
        )
        .unwrap();

        assert!(read_shape_table(dir.path(), Market::DayAhead).is_err());
    }

    #[test]
    fn test_read_shape_table_futures() {
        let dir = tempdir().unwrap();
        assert!(read_shape_table(dir.path(), Market::FutureBase).is_err());
    }
}
