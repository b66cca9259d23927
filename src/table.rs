//! Typed tabular output.
//!
//! The extraction service returns loosely typed JSON records; this module
//! enforces the schema's column types: date fields are parsed with a set of
//! common formats, text and enum fields are coerced to strings (enum value
//! validation stays with consumers). A required field that is missing or
//! null fails the whole table; success always means fully populated rows.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extractor::{ExtractionSchema, FieldKind};
use crate::types::PipelineError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%Y%m%d"];

/// Values of one column, typed per the schema field it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Date(Vec<Option<NaiveDate>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Date(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    fn render(&self, row: usize) -> String {
        match self {
            ColumnData::Date(values) => values[row]
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            ColumnData::Text(values) => values[row].clone().unwrap_or_default(),
        }
    }
}

/// A named, typed column.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Columnar table with one typed column per schema field.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataTable {
    columns: Vec<Column>,
}

impl DataTable {
    /// Builds a table from extraction records, columns ordered as in the
    /// schema.
    pub fn from_records(
        schema: &ExtractionSchema,
        records: &[Map<String, Value>],
    ) -> Result<Self, PipelineError> {
        let mut columns = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let mut texts = Vec::with_capacity(records.len());
            for (row, record) in records.iter().enumerate() {
                let value = record.get(&field.name).filter(|v| !v.is_null());
                match value {
                    Some(value) => texts.push(Some(coerce_to_text(value))),
                    None if field.required => {
                        return Err(PipelineError::Extraction(format!(
                            "record {row} is missing required field '{}'",
                            field.name
                        )));
                    }
                    None => texts.push(None),
                }
            }

            let data = match field.kind {
                FieldKind::Date => {
                    let mut dates = Vec::with_capacity(texts.len());
                    for (row, text) in texts.iter().enumerate() {
                        match text {
                            Some(text) => dates.push(Some(parse_date(text).ok_or_else(|| {
                                PipelineError::Extraction(format!(
                                    "record {row} field '{}': unparsable date '{text}'",
                                    field.name
                                ))
                            })?)),
                            None => dates.push(None),
                        }
                    }
                    ColumnData::Date(dates)
                }
                FieldKind::Text | FieldKind::Enum => ColumnData::Text(texts),
            };

            columns.push(Column {
                name: field.name.clone(),
                data,
            });
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "(empty table)");
        }

        let rows = self.num_rows();
        let rendered: Vec<Vec<String>> = (0..rows)
            .map(|row| self.columns.iter().map(|c| c.data.render(row)).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                rendered
                    .iter()
                    .map(|r| r[i].len())
                    .chain([c.name.len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:<width$}", column.name, width = widths[i])?;
        }
        writeln!(f)?;
        for (i, &width) in widths.iter().enumerate() {
            if i > 0 {
                write!(f, "-+-")?;
            }
            write!(f, "{:-<width$}", "")?;
        }
        writeln!(f)?;
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{:<width$}", cell, width = widths[i])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn coerce_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text.trim(), format).ok())
}
