//! Tabular I/O for dictionaries, datasets and reports (CSV)
//!
//! Every table has a reader/writer-generic function and a path convenience
//! wrapper. Structural problems (missing headers or required columns) are
//! reported as `MalformedInput` before any row is processed.

use crate::error::{LoomError, Result, ResultExt};
use crate::model::{DictionaryTable, FieldSpec, SyntheticDataset, SyntheticRecord};
use crate::report::ValidationReport;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub const FIELD_NAME_COLUMN: &str = "field_name";
pub const DESCRIPTION_COLUMN: &str = "test_case_description";
pub const EXAMPLE_COLUMN: &str = "example_input";

pub const REPORT_COLUMNS: [&str; 6] = [
    "test_id",
    "test_value",
    "test_column",
    "description",
    "status",
    "reason",
];

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input)
}

fn open(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(LoomError::from)
        .with_context(|| format!("opening {}", path.display()))
}

fn create(path: &Path) -> Result<File> {
    File::create(path)
        .map_err(LoomError::from)
        .with_context(|| format!("creating {}", path.display()))
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Read a raw data dictionary with arbitrary columns
pub fn read_dictionary<R: Read>(input: R) -> Result<DictionaryTable> {
    let mut rdr = reader(input);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoomError::MalformedInput(
            "data dictionary has no header row".into(),
        ));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(DictionaryTable::new(headers, rows))
}

pub fn read_dictionary_path(path: &Path) -> Result<DictionaryTable> {
    read_dictionary(open(path)?).with_context(|| format!("reading dictionary {}", path.display()))
}

/// Read a formatted dictionary (`field_name`, `test_case_description`, optional `example_input`)
pub fn read_field_specs<R: Read>(input: R) -> Result<Vec<FieldSpec>> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();

    let missing: Vec<&str> = [FIELD_NAME_COLUMN, DESCRIPTION_COLUMN]
        .into_iter()
        .filter(|c| column_index(&headers, c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(LoomError::MalformedInput(format!(
            "formatted dictionary is missing columns: {}",
            missing.join(", ")
        )));
    }
    let name_idx = column_index(&headers, FIELD_NAME_COLUMN).unwrap_or_default();
    let desc_idx = column_index(&headers, DESCRIPTION_COLUMN).unwrap_or_default();
    let example_idx = column_index(&headers, EXAMPLE_COLUMN);

    let mut specs: Vec<FieldSpec> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let field_name = record.get(name_idx).unwrap_or_default().trim().to_string();
        if field_name.is_empty() {
            continue;
        }
        if specs.iter().any(|s| s.field_name == field_name) {
            return Err(LoomError::MalformedInput(format!(
                "duplicate field name '{}'",
                field_name
            )));
        }
        let example_input = example_idx
            .and_then(|i| record.get(i))
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        specs.push(FieldSpec {
            field_name,
            rule_description: record.get(desc_idx).unwrap_or_default().to_string(),
            example_input,
        });
    }
    Ok(specs)
}

pub fn read_field_specs_path(path: &Path) -> Result<Vec<FieldSpec>> {
    read_field_specs(open(path)?)
        .with_context(|| format!("reading formatted dictionary {}", path.display()))
}

pub fn write_field_specs<W: Write>(output: W, specs: &[FieldSpec]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(output);
    wtr.write_record([FIELD_NAME_COLUMN, DESCRIPTION_COLUMN, EXAMPLE_COLUMN])?;
    for spec in specs {
        wtr.write_record([
            spec.field_name.as_str(),
            spec.rule_description.as_str(),
            spec.example_input.as_deref().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_field_specs_path(path: &Path, specs: &[FieldSpec]) -> Result<()> {
    write_field_specs(create(path)?, specs)
}

/// Read a dataset whose header row holds the field names
pub fn read_dataset<R: Read>(input: R) -> Result<SyntheticDataset> {
    let mut rdr = reader(input);
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(LoomError::MalformedInput("dataset has no header row".into()));
    }

    let mut dataset = SyntheticDataset::new(columns.clone());
    for record in rdr.records() {
        let record = record?;
        let mut row = SyntheticRecord::new();
        for (i, column) in columns.iter().enumerate() {
            row.insert(column.clone(), record.get(i).unwrap_or_default());
        }
        dataset.push(row);
    }
    Ok(dataset)
}

pub fn read_dataset_path(path: &Path) -> Result<SyntheticDataset> {
    read_dataset(open(path)?).with_context(|| format!("reading dataset {}", path.display()))
}

pub fn write_dataset<W: Write>(output: W, dataset: &SyntheticDataset) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(output);
    wtr.write_record(&dataset.columns)?;
    for record in &dataset.records {
        let row: Vec<&str> = dataset
            .columns
            .iter()
            .map(|c| record.get(c).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_dataset_path(path: &Path, dataset: &SyntheticDataset) -> Result<()> {
    write_dataset(create(path)?, dataset)
}

pub fn write_report<W: Write>(output: W, report: &ValidationReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(output);
    wtr.write_record(REPORT_COLUMNS)?;
    for result in &report.results {
        let status = result.status.to_string();
        wtr.write_record([
            result.test_id.as_str(),
            result.test_value.as_str(),
            result.test_column.as_str(),
            result.description.as_str(),
            status.as_str(),
            result.reason.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report_path(path: &Path, report: &ValidationReport) -> Result<()> {
    write_report(create(path)?, report)
}
