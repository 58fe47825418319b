//! Parameter-table loading and validation.
//!
//! This module turns a parameter file into a clean [`ParameterTable`] that
//! the estimator can rely on without re-validating.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** with line numbers in messages
//! - **Separation of concerns**: no fitting logic here
//!
//! Two formats are supported, chosen by file extension:
//! - CSV with header columns `ID, b0, b1, b2` (case-insensitive, extra
//!   columns ignored)
//! - JSON: an array of `{ "id", "b0", "b1", "b2" }` objects

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{GrowthParams, ParameterRecord, ParameterTable};
use crate::error::AppError;

/// Columns every parameter file must carry.
const REQUIRED_COLUMNS: [&str; 4] = ["id", "b0", "b1", "b2"];

/// Load a parameter table, dispatching on the file extension.
///
/// Anything that is not `.json` is treated as CSV, mirroring the reference
/// dashboard's "spreadsheet unless told otherwise" behavior.
pub fn load_parameter_table(path: &Path) -> Result<ParameterTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open parameter file '{}': {e}", path.display())))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        read_params_json(file)
    } else {
        read_params_csv(file)
    }
}

/// Parse a JSON parameter file.
pub fn read_params_json<R: Read>(reader: R) -> Result<ParameterTable, AppError> {
    let records: Vec<ParameterRecord> = serde_json::from_reader(reader)
        .map_err(|e| AppError::input(format!("Invalid parameter JSON: {e}")))?;
    finish_table(records)
}

/// Parse a CSV parameter file.
pub fn read_params_csv<R: Read>(reader: R) -> Result<ParameterTable, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::input(format!(
            "Parameter file must contain columns ID, b0, b1, b2 (missing: {}).",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        // Header is line 1, so data rows start at line 2.
        let line = i + 2;
        let row = row.map_err(|e| AppError::input(format!("Failed to read CSV row {line}: {e}")))?;

        let id = field(&row, &header_map, "id");
        if id.is_empty() {
            return Err(AppError::input(format!("Row {line}: empty ID.")));
        }

        let params = GrowthParams::new(
            parse_coeff(&row, &header_map, "b0", line)?,
            parse_coeff(&row, &header_map, "b1", line)?,
            parse_coeff(&row, &header_map, "b2", line)?,
        );

        records.push(ParameterRecord {
            id: id.to_string(),
            params,
        });
    }

    finish_table(records)
}

fn finish_table(records: Vec<ParameterRecord>) -> Result<ParameterTable, AppError> {
    if records.is_empty() {
        return Err(AppError::input("Parameter file contains no rows."));
    }
    ParameterTable::from_records(records)
        .map_err(|id| AppError::input(format!("Duplicate parameter ID '{id}'.")))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

fn field<'a>(row: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> &'a str {
    header_map
        .get(name)
        .and_then(|&i| row.get(i))
        .unwrap_or("")
}

fn parse_coeff(
    row: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<f64, AppError> {
    let raw = field(row, header_map, name);
    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::input(format!("Row {line}: invalid {name} '{raw}'.")))?;
    if !value.is_finite() {
        return Err(AppError::input(format!("Row {line}: {name} is not finite.")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trips_the_expected_schema() {
        let csv = "ID,b0,b1,b2\nRegionA,400,3,0.01\nRegionB,550.5,3.5,0.008\n";
        let table = read_params_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let a = table.get("RegionA").unwrap();
        assert_eq!(a.params, GrowthParams::new(400.0, 3.0, 0.01));
    }

    #[test]
    fn csv_headers_are_case_insensitive_and_reorderable() {
        let csv = "b2,B1,b0,Id,notes\n0.01,3,400,North,herd 12\n";
        let table = read_params_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            table.get("North").unwrap().params,
            GrowthParams::new(400.0, 3.0, 0.01)
        );
    }

    #[test]
    fn csv_missing_column_is_a_schema_error() {
        let csv = "ID,b0,b1\nRegionA,400,3\n";
        let err = read_params_csv(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("b2"));
    }

    #[test]
    fn csv_bad_number_reports_the_line() {
        let csv = "ID,b0,b1,b2\nRegionA,400,3,0.01\nRegionB,oops,3,0.01\n";
        let err = read_params_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Row 3"));
    }

    #[test]
    fn csv_duplicate_id_is_rejected() {
        let csv = "ID,b0,b1,b2\nA,400,3,0.01\nA,500,3,0.01\n";
        let err = read_params_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn json_array_of_records() {
        let json = r#"[
            {"id": "RegionA", "b0": 400.0, "b1": 3.0, "b2": 0.01},
            {"id": "RegionB", "b0": 550.0, "b1": 3.5, "b2": 0.008}
        ]"#;
        let table = read_params_json(json.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("RegionB").unwrap().params,
            GrowthParams::new(550.0, 3.5, 0.008)
        );
    }

    #[test]
    fn empty_file_is_an_error() {
        let err = read_params_csv("ID,b0,b1,b2\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }
}
