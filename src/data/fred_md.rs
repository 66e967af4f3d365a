//! Loader for FRED-MD style monthly CSV files
//!
//! Layout: a header row (`sasdate,<variables...>`), a `Transform:` row with
//! one t-code per variable, then one row per month dated `M/D/YYYY`.

use super::panel::MacroPanel;
use super::transform::{TransformCode, TransformTable};
use crate::error::{RegimeError, Result};
use chrono::NaiveDate;
use ndarray::Array2;
use std::io::Read;
use std::path::Path;

/// Read a FRED-MD file from disk
pub fn load_fred_md<P: AsRef<Path>>(path: P) -> Result<(MacroPanel, TransformTable)> {
    let file = std::fs::File::open(path)?;
    read_fred_md(file)
}

/// Read FRED-MD content from any reader
pub fn read_fred_md<R: Read>(reader: R) -> Result<(MacroPanel, TransformTable)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let names: Vec<String> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|s| s.to_string())
        .collect();
    if names.is_empty() {
        return Err(RegimeError::Parse("header has no variable columns".to_string()));
    }

    let mut records = reader.records();

    let transform_row = records
        .next()
        .ok_or_else(|| RegimeError::Parse("missing Transform: row".to_string()))??;
    if !transform_row
        .get(0)
        .map(|s| s.to_ascii_lowercase().starts_with("transform"))
        .unwrap_or(false)
    {
        return Err(RegimeError::Parse(format!(
            "expected Transform: row, found {:?}",
            transform_row.get(0)
        )));
    }

    let mut table = TransformTable::new();
    for (name, field) in names.iter().zip(transform_row.iter().skip(1)) {
        let code: f64 = field
            .parse()
            .map_err(|_| RegimeError::Parse(format!("bad t-code {:?} for {}", field, name)))?;
        if code.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&code) {
            return Err(RegimeError::Parse(format!(
                "t-code {:?} for {} is not a whole number in range",
                field, name
            )));
        }
        table.insert(name.clone(), TransformCode::from_code(code as u8)?);
    }

    let mut months = Vec::new();
    let mut flat = Vec::new();

    for (line, record) in records.enumerate() {
        let record = record?;
        let date_field = record.get(0).unwrap_or("");
        if date_field.is_empty() {
            continue;
        }
        let month = NaiveDate::parse_from_str(date_field, "%m/%d/%Y")
            .or_else(|_| NaiveDate::parse_from_str(date_field, "%Y-%m-%d"))
            .map_err(|_| RegimeError::Parse(format!("bad date {:?}", date_field)))?;

        for (name, field) in names.iter().zip(record.iter().skip(1)) {
            let value: f64 = field.parse().map_err(|_| {
                RegimeError::Parse(format!(
                    "bad value {:?} for {} on data row {}",
                    field,
                    name,
                    line + 1
                ))
            })?;
            flat.push(value);
        }
        months.push(month);
    }

    let values = Array2::from_shape_vec((months.len(), names.len()), flat)
        .map_err(|e| RegimeError::Parse(e.to_string()))?;

    tracing::info!(
        "Loaded FRED-MD panel: {} months x {} variables",
        months.len(),
        names.len()
    );

    Ok((MacroPanel::new(months, names, values)?, table))
}
