//! Line-delimited JSON reader.
//!
//! Each non-blank line of an input file is one JSON object. Records keep their
//! 1-based line number so field errors can point back at the source.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or interpreting an input file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON at {}:{line}: {source}", .path.display())]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line} of {} is not a JSON object", .path.display())]
    NotAnObject { path: PathBuf, line: usize },

    #[error("Missing field '{field}' on line {line}")]
    MissingField { field: &'static str, line: usize },

    #[error("Invalid field '{field}' on line {line}: expected {expected}")]
    InvalidField {
        field: &'static str,
        line: usize,
        expected: &'static str,
    },

    #[error("No records found")]
    EmptyFile,
}

/// One JSON object read from a line of an input file.
#[derive(Debug, Clone)]
pub struct Record {
    line: usize,
    fields: Map<String, Value>,
}

/// Reads every record of `path`, in file order. Blank lines are skipped.
pub fn read_records(path: &Path) -> Result<Vec<Record>, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(path, &text)
}

fn parse_records(path: &Path, text: &str) -> Result<Vec<Record>, ParseError> {
    let mut records = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        if raw_line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(raw_line).map_err(|source| ParseError::Json {
            path: path.to_path_buf(),
            line,
            source,
        })?;
        match value {
            Value::Object(fields) => records.push(Record { line, fields }),
            _ => {
                return Err(ParseError::NotAnObject {
                    path: path.to_path_buf(),
                    line,
                })
            }
        }
    }
    Ok(records)
}

impl Record {
    pub fn line(&self) -> usize {
        self.line
    }

    /// Absent fields and JSON `null` are treated the same.
    fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> ParseError {
        ParseError::InvalidField {
            field,
            line: self.line,
            expected,
        }
    }

    fn missing(&self, field: &'static str) -> ParseError {
        ParseError::MissingField {
            field,
            line: self.line,
        }
    }

    pub fn str(&self, field: &'static str) -> Result<&str, ParseError> {
        self.opt_str(field)?.ok_or_else(|| self.missing(field))
    }

    pub fn opt_str(&self, field: &'static str) -> Result<Option<&str>, ParseError> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(field, "a string")),
        }
    }

    /// Parses a string field through [`FromStr`](std::str::FromStr).
    pub fn parsed<T: std::str::FromStr>(
        &self,
        field: &'static str,
        expected: &'static str,
    ) -> Result<T, ParseError> {
        self.str(field)?
            .parse()
            .map_err(|_| self.invalid(field, expected))
    }

    /// Integers may be encoded as JSON integers, integral floats or numeric strings.
    pub fn i64(&self, field: &'static str) -> Result<i64, ParseError> {
        let value = self.value(field).ok_or_else(|| self.missing(field))?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(field, "an integer"))
    }

    pub fn f64(&self, field: &'static str) -> Result<f64, ParseError> {
        self.opt_f64(field)?.ok_or_else(|| self.missing(field))
    }

    /// Floats may be encoded as JSON numbers or numeric strings.
    pub fn opt_f64(&self, field: &'static str) -> Result<Option<f64>, ParseError> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "a number")),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.invalid(field, "a number")),
            Some(_) => Err(self.invalid(field, "a number")),
        }
    }
}
