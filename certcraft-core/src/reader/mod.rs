//! Spreadsheet reader using calamine
//!
//! Training-completion exports are consumed positionally: the first row is a
//! header and is skipped, then column 0 holds the training date, column 1 the
//! recipient name, column 3 the score, column 7 the organizational identifier
//! and column 8 the recipient email.

use crate::error::FatalError;
use calamine::{Data, Reader, Sheets, open_workbook_auto};
use chrono::NaiveDate;
use std::path::Path;

pub const COL_DATE: usize = 0;
pub const COL_NAME: usize = 1;
pub const COL_SCORE: usize = 3;
pub const COL_ORG_ID: usize = 7;
pub const COL_EMAIL: usize = 8;

/// Raw cell value, before any row-level validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Boolean(bool),
}

impl Field {
    pub fn is_empty(&self) -> bool {
        matches!(self, Field::Empty)
    }

    fn from_cell(data: &Data) -> Field {
        match data {
            Data::Empty => Field::Empty,
            Data::Int(i) => Field::Number(*i as f64),
            Data::Float(f) => Field::Number(*f),
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Field::Empty
                } else {
                    Field::Text(trimmed.to_string())
                }
            }
            Data::Bool(b) => Field::Boolean(*b),
            Data::Error(e) => Field::Text(format!("{e:?}")),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(naive) => Field::Date(naive.date()),
                None => Field::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Field::Text(s.clone()),
        }
    }
}

/// One spreadsheet row, addressed by its 1-based spreadsheet row number
/// (header = row 1, first record = row 2).
#[derive(Debug, Clone)]
pub struct Record {
    pub row: usize,
    pub date: Field,
    pub name: Field,
    pub score: Field,
    pub org_id: Field,
    pub email: Field,
}

impl Record {
    fn from_cells(row: usize, cells: &[Data]) -> Record {
        let field = |col: usize| cells.get(col).map(Field::from_cell).unwrap_or(Field::Empty);
        Record {
            row,
            date: field(COL_DATE),
            name: field(COL_NAME),
            score: field(COL_SCORE),
            org_id: field(COL_ORG_ID),
            email: field(COL_EMAIL),
        }
    }

    fn is_blank(&self) -> bool {
        self.date.is_empty()
            && self.name.is_empty()
            && self.score.is_empty()
            && self.org_id.is_empty()
            && self.email.is_empty()
    }
}

/// Read all records from the first worksheet, skipping the header row.
/// Fully blank trailing rows are dropped.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>, FatalError> {
    let path = path.as_ref();
    let unreadable = |reason: String| FatalError::SpreadsheetUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| unreadable("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| unreadable(e.to_string()))?;

    let mut records = Vec::new();
    for (index, cells) in range.rows().enumerate().skip(1) {
        let record = Record::from_cells(index + 1, cells);
        if !record.is_blank() {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_from_cell_normalizes_blank_text() {
        assert_eq!(Field::from_cell(&Data::String("   ".into())), Field::Empty);
        assert_eq!(
            Field::from_cell(&Data::String("  Jane ".into())),
            Field::Text("Jane".into())
        );
    }

    #[test]
    fn record_maps_positional_columns() {
        let cells = vec![
            Data::String("2025-03-10".into()),
            Data::String("Jane Doe".into()),
            Data::Empty,
            Data::Float(91.0),
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Float(212345678.0),
            Data::String("jane@example.com".into()),
        ];
        let record = Record::from_cells(2, &cells);
        assert_eq!(record.row, 2);
        assert_eq!(record.date, Field::Text("2025-03-10".into()));
        assert_eq!(record.name, Field::Text("Jane Doe".into()));
        assert_eq!(record.score, Field::Number(91.0));
        assert_eq!(record.org_id, Field::Number(212345678.0));
        assert_eq!(record.email, Field::Text("jane@example.com".into()));
    }

    #[test]
    fn short_rows_pad_with_empty_fields() {
        let cells = vec![Data::String("2025-03-10".into()), Data::String("Jo".into())];
        let record = Record::from_cells(5, &cells);
        assert_eq!(record.score, Field::Empty);
        assert_eq!(record.email, Field::Empty);
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = read_records("no/such/file.xlsx").unwrap_err();
        assert!(matches!(err, FatalError::SpreadsheetUnreadable { .. }));
    }
}
