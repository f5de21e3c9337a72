use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::models::PriceTable;

/// Statistics from loading a price file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadReport {
    pub rows_read: usize,
    pub leading_rows_dropped: usize,
    pub cells_filled: usize,
}

/// Load a wide CSV of closing prices
///
/// Expected layout: a `date` column (`YYYY-MM-DD`) followed by one column per
/// instrument. Blank or `NaN` cells are forward-filled from the previous row;
/// leading rows where some instrument has no value yet are dropped.
pub fn load_csv(path: &Path) -> Result<(PriceTable, LoadReport)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open price file {}", path.display()))?;
    read_prices(file).with_context(|| format!("Failed to load prices from {}", path.display()))
}

/// Parse a wide price CSV from any reader
pub fn read_prices<R: Read>(reader: R) -> Result<(PriceTable, LoadReport)> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv.headers().context("Failed to read CSV header")?.clone();
    let mut columns = headers.iter();
    match columns.next() {
        Some(first) if first.eq_ignore_ascii_case("date") => {}
        _ => anyhow::bail!("First CSV column must be 'date'"),
    }
    let instruments: Vec<String> = columns.map(str::to_string).collect();
    if instruments.is_empty() {
        anyhow::bail!("CSV has no instrument columns");
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = instruments.iter().find(|id| !seen.insert(id.as_str())) {
        anyhow::bail!("Instrument column '{}' appears more than once", duplicate);
    }

    let mut dates = Vec::new();
    let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::new(); instruments.len()];
    for (line, record) in csv.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        let date_field = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' on row {}", date_field, line + 2))?;
        dates.push(date);

        for (column, instrument) in instruments.iter().enumerate() {
            let value = parse_cell(record.get(column + 1).unwrap_or_default()).with_context(
                || format!("Invalid price for {} on {}", instrument, date),
            )?;
            cells[column].push(value);
        }
    }

    let mut report = LoadReport {
        rows_read: dates.len(),
        ..LoadReport::default()
    };
    report.cells_filled = forward_fill(&mut cells);

    let first_complete = (0..dates.len())
        .find(|&row| cells.iter().all(|column| column[row].is_some()))
        .unwrap_or(dates.len());
    report.leading_rows_dropped = first_complete;

    if report.cells_filled > 0 {
        tracing::warn!("Forward-filled {} missing price cells", report.cells_filled);
    }
    if first_complete > 0 {
        tracing::warn!(
            "Dropped {} leading rows before every instrument had a price",
            first_complete
        );
    }

    let series: HashMap<String, Vec<f64>> = instruments
        .into_iter()
        .zip(cells)
        .map(|(instrument, column)| {
            let prices = column[first_complete..].iter().flatten().copied().collect();
            (instrument, prices)
        })
        .collect();

    let table = PriceTable::new(dates[first_complete..].to_vec(), series)?;
    tracing::debug!(
        "Loaded {} rows x {} instruments",
        table.len(),
        table.instruments().len()
    );

    Ok((table, report))
}

fn parse_cell(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    Ok(Some(raw.parse::<f64>()?))
}

/// Carry the last known value into empty cells, returning how many were filled
///
/// Cells before a column's first value stay empty.
pub fn forward_fill(columns: &mut [Vec<Option<f64>>]) -> usize {
    let mut filled = 0;
    for column in columns.iter_mut() {
        let mut last = None;
        for cell in column.iter_mut() {
            if let Some(value) = *cell {
                last = Some(value);
            } else if last.is_some() {
                *cell = last;
                filled += 1;
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_forward_fill() {
        let mut columns = vec![
            vec![None, Some(1.0), None, None, Some(4.0)],
            vec![Some(2.0), None, Some(3.0), None, None],
        ];
        let filled = forward_fill(&mut columns);

        assert_eq!(filled, 5);
        assert_eq!(columns[0], vec![None, Some(1.0), Some(1.0), Some(1.0), Some(4.0)]);
        assert_eq!(columns[1], vec![Some(2.0), Some(2.0), Some(3.0), Some(3.0), Some(3.0)]);
    }

    #[test]
    fn test_read_prices_fills_and_trims() {
        let csv = "date,QQQ,TLT\n\
                   2024-01-01,,90.0\n\
                   2024-01-02,400.0,\n\
                   2024-01-03,,91.5\n\
                   2024-01-04,402.0,92.0\n";

        let (table, report) = read_prices(csv.as_bytes()).unwrap();

        assert_eq!(report.rows_read, 4);
        assert_eq!(report.leading_rows_dropped, 1);
        assert_eq!(report.cells_filled, 2);
        assert_eq!(table.len(), 3);
        assert_eq!(table.prices("QQQ").unwrap(), &[400.0, 400.0, 402.0]);
        assert_eq!(table.prices("TLT").unwrap(), &[90.0, 91.5, 92.0]);
        assert_eq!(
            table.dates()[0],
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_read_prices_requires_date_column() {
        let csv = "day,QQQ\n2024-01-01,1.0\n";
        assert!(read_prices(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_read_prices_rejects_duplicate_columns() {
        let csv = "date,QQQ,QQQ\n2024-01-01,1.0,2.0\n";
        let err = read_prices(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("'QQQ' appears more than once"));
    }

    #[test]
    fn test_read_prices_rejects_bad_number() {
        let csv = "date,QQQ\n2024-01-01,abc\n";
        let err = read_prices(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid price for QQQ"));
    }

    #[test]
    fn test_read_prices_rejects_unordered_dates() {
        let csv = "date,QQQ\n2024-01-02,1.0\n2024-01-01,1.0\n";
        assert!(read_prices(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "date,GLD\n2024-01-01,180.0\n2024-01-02,181.0\n").unwrap();

        let (table, report) = load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(report, LoadReport { rows_read: 2, ..LoadReport::default() });
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv(Path::new("/nonexistent/prices.csv"));
        assert!(result.is_err());
    }
}
