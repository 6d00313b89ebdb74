//! Output formatting and persistence for derived tables.
//!
//! Every run overwrites its outputs: tables are written as CSV, the index
//! summary as pretty-printed JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::PipelineError;
use csv::WriterBuilder;
use std::fs::{self, File};
use std::path::Path;

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `records` to a CSV file at `path`, replacing any previous contents.
///
/// The header row comes from the record's field names, so an empty slice
/// produces an empty file.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    ensure_parent(path)?;
    debug!(path = %path.display(), rows = records.len(), "Writing CSV table");

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes a table whose columns are only known at run time.
pub fn write_table(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    ensure_parent(path)?;
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    writer.write_record(header)?;
    for row in rows {
        writer
            .write_record(row)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer.flush()?;

    Ok(())
}

/// Reads every row of the CSV file at `path` into `T`.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()).into());
    }
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.map_err(|e| PipelineError::MalformedInput {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        rows.push(record);
    }

    Ok(rows)
}

/// Writes `value` as pretty-printed JSON (with a trailing newline) to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::impute::ImputationSource;
    use crate::records::{CostRecord, ProjectRecord, ProjectStatus};
    use tempfile::TempDir;

    fn cost(region: &str) -> CostRecord {
        CostRecord {
            region: region.into(),
            sector: "All".into(),
            cost: 4.25,
            breakeven_price: None,
            imputation: ImputationSource::GroupMean,
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&cost("Spain")).unwrap();
    }

    #[test]
    fn test_write_records_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/costs.csv");

        write_records(&path, &[cost("Spain"), cost("France")]).unwrap();
        write_records(&path, &[cost("Italy")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "region,sector,cost,breakeven_price,imputation");
        assert_eq!(lines[1], "Italy,All,4.25,,group_mean");
    }

    #[test]
    fn test_write_table_with_dynamic_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.csv");
        let header = vec!["year".to_string(), "Ammonia".into(), "total".into()];
        let rows = vec![vec!["2023".to_string(), "1.5".into(), "1.5".into()]];

        write_table(&path, &header, &rows).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "year,Ammonia,total\n2023,1.5,1.5\n");
    }

    #[test]
    fn test_records_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.csv");
        let project = ProjectRecord {
            id: "7".into(),
            name: "Delta, phase 1".into(),
            country: "Chile".into(),
            region: "Chile".into(),
            technology: "ALK".into(),
            sector: None,
            announced_capacity: 3.5,
            capacity_imputation: ImputationSource::Observed,
            status: ProjectStatus::UnderConstruction,
            start_year: Some(2027),
        };

        write_records(&path, std::slice::from_ref(&project)).unwrap();
        let back: Vec<ProjectRecord> = read_records(&path).unwrap();
        assert_eq!(back, vec![project]);
    }

    #[test]
    fn test_read_records_missing_file_names_the_file() {
        let err = read_records::<CostRecord>(Path::new("/nowhere/costs_cleaned.csv")).unwrap_err();
        assert!(err.to_string().contains("costs_cleaned.csv"));
    }

    #[test]
    fn test_write_json_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &cost("Spain")).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
    }
}
