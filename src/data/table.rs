// ============================================================
// Layer 4 — Tabular Dataset (CSV)
// ============================================================
// Reads and writes the artwork metadata CSV, and prepares the
// rows for training:
//
//   read_table       → Vec<MetadataRecord>  (optionally first N rows)
//   drop_missing     → drop rows with a missing label
//   prepare_labels   → drop_missing, then keep only the highest
//                      tag of the label
//
// A value is "missing" when the cell is empty or holds the
// literal `?` placeholder the scraper writes for unknown fields.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::domain::artwork::{MetadataRecord, CSV_COLUMNS, LABEL_COLUMNS};
use crate::domain::label::collapse_label;

pub const MISSING_MARKER: &str = "?";

/// True for empty cells and the `?` placeholder.
pub fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == MISSING_MARKER
}

/// Write records with an explicit header row, in the given order.
pub fn write_records(path: &Path, records: &[MetadataRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Cannot create CSV '{}'", path.display()))?;

    // Header is written by hand so an empty dataset still has one
    writer.write_record(CSV_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} rows to '{}'", records.len(), path.display());
    Ok(())
}

/// Read the CSV, keeping at most `nrows` data rows.
/// Unknown columns are ignored; absent columns read as empty.
pub fn read_table(path: &Path, nrows: Option<usize>) -> Result<Vec<MetadataRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot open CSV '{}'", path.display()))?;

    let limit = nrows.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<MetadataRecord>().take(limit).enumerate() {
        let record = row.with_context(|| {
            format!("Malformed row {} in '{}'", line + 1, path.display())
        })?;
        records.push(record);
    }

    tracing::info!("Read {} rows from '{}'", records.len(), path.display());
    Ok(records)
}

/// Remove rows whose label `column` is empty or `?`.
/// Only the columns in [`LABEL_COLUMNS`] are accepted.
pub fn drop_missing(records: Vec<MetadataRecord>, column: &str) -> Result<Vec<MetadataRecord>> {
    if !LABEL_COLUMNS.contains(&column) {
        bail!("'{column}' cannot be used as a label, expected one of {LABEL_COLUMNS:?}");
    }

    let before = records.len();
    let kept: Vec<MetadataRecord> = records
        .into_iter()
        .filter(|r| r.column(column).is_some_and(|v| !is_missing(v)))
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        tracing::warn!("Dropping {dropped} rows with a missing '{column}' value");
    }
    Ok(kept)
}

/// Drop rows whose `column` is missing, then collapse the remaining
/// labels to their highest tag ("abstract, cubism" → "abstract").
pub fn prepare_labels(records: Vec<MetadataRecord>, column: &str) -> Result<Vec<MetadataRecord>> {
    let mut kept = drop_missing(records, column)?;

    for record in &mut kept {
        if let Some(value) = record.column_mut(column) {
            *value = collapse_label(value);
        }
    }
    // A label like ", cubism" collapses to nothing
    kept.retain(|r| r.column(column).is_some_and(|v| !v.is_empty()));
    tracing::warn!("Keeping only the highest level tags of '{column}'");

    Ok(kept)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, genre: &str) -> MetadataRecord {
        MetadataRecord {
            id: id.into(),
            genre: genre.into(),
            file_name: format!("{id}.jpg"),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_then_read_keeps_order_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("db.csv");
        let rows = vec![record("b", "portrait"), record("a", "landscape"), record("c", "?")];
        write_records(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "_id,title,artistname,image,year,style,genre,file_name"
        );
        assert_eq!(read_table(&path, None).unwrap(), rows);
        assert_eq!(read_table(&path, Some(2)).unwrap(), rows[..2].to_vec());
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.csv");
        write_records(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(read_table(&path, None).unwrap().is_empty());
    }

    #[test]
    fn test_read_tolerates_extra_and_absent_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.csv");
        std::fs::write(&path, "idx,_id,genre\n0,x,portrait\n").unwrap();
        let rows = read_table(&path, None).unwrap();
        assert_eq!(rows, vec![MetadataRecord { id: "x".into(), genre: "portrait".into(), ..Default::default() }]);
    }

    #[test]
    fn test_prepare_labels_drops_missing_and_collapses() {
        let rows = vec![
            record("1", "abstract, cubism"),
            record("2", "?"),
            record("3", ""),
            record("4", " portrait "),
            record("5", ", cubism"),
        ];
        let kept = prepare_labels(rows, "genre").unwrap();
        let genres: Vec<&str> = kept.iter().map(|r| r.genre.as_str()).collect();
        assert_eq!(genres, vec!["abstract", "portrait"]);
    }

    #[test]
    fn test_drop_missing_keeps_raw_labels() {
        let rows = vec![record("1", "abstract, cubism"), record("2", " ? "), record("3", "portrait")];
        let kept = drop_missing(rows, "genre").unwrap();
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(kept[0].genre, "abstract, cubism");
    }

    #[test]
    fn test_prepare_labels_rejects_unknown_column() {
        assert!(prepare_labels(vec![], "colour").is_err());
    }

    #[test]
    fn test_identifier_columns_are_not_labels() {
        for column in ["_id", "image", "file_name"] {
            let err = drop_missing(vec![record("1", "portrait")], column).unwrap_err();
            assert!(err.to_string().contains(column));
        }
        for column in LABEL_COLUMNS {
            assert!(drop_missing(vec![], column).is_ok());
        }
    }
}
