use std::collections::HashMap;
use std::fmt;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// CellValue – a single cell read out of a column
// ---------------------------------------------------------------------------

/// A dynamically-typed view of one cell, used where rows are inspected
/// generically (hue factors, table preview, feature rows).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            // Shortest form that parses back to the same value.
            CellValue::Float(v) => write!(f, "{v:?}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column types and storage
// ---------------------------------------------------------------------------

/// Logical type of a column, fixed when the snapshot is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Float,
    Integer,
    String,
    Bool,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Integer)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Float => "float",
            ColumnType::Integer => "integer",
            ColumnType::String => "string",
            ColumnType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Typed, nullable cell storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Float(Vec<Option<f64>>),
    Integer(Vec<Option<i64>>),
    String(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
}

impl ColumnValues {
    /// Empty storage for the given type.
    pub fn empty(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Float => ColumnValues::Float(Vec::new()),
            ColumnType::Integer => ColumnValues::Integer(Vec::new()),
            ColumnType::String => ColumnValues::String(Vec::new()),
            ColumnType::Bool => ColumnValues::Bool(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnValues::Float(_) => ColumnType::Float,
            ColumnValues::Integer(_) => ColumnType::Integer,
            ColumnValues::String(_) => ColumnType::String,
            ColumnValues::Bool(_) => ColumnType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Integer(v) => v.len(),
            ColumnValues::String(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `row`, or `CellValue::Null` when absent or out of range.
    pub fn get(&self, row: usize) -> CellValue {
        match self {
            ColumnValues::Float(v) => v
                .get(row)
                .copied()
                .flatten()
                .map_or(CellValue::Null, CellValue::Float),
            ColumnValues::Integer(v) => v
                .get(row)
                .copied()
                .flatten()
                .map_or(CellValue::Null, CellValue::Integer),
            ColumnValues::String(v) => v
                .get(row)
                .and_then(|s| s.clone())
                .map_or(CellValue::Null, CellValue::String),
            ColumnValues::Bool(v) => v
                .get(row)
                .copied()
                .flatten()
                .map_or(CellValue::Null, CellValue::Bool),
        }
    }

    /// Numeric value at `row` (integers widened), `None` for nulls and
    /// non-numeric columns.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnValues::Float(v) => v.get(row).copied().flatten(),
            ColumnValues::Integer(v) => v.get(row).copied().flatten().map(|i| i as f64),
            _ => None,
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.values.column_type()
    }
}

// ---------------------------------------------------------------------------
// DatasetSnapshot – the complete loaded table
// ---------------------------------------------------------------------------

/// Immutable columnar view of the dataset file at one point in time.
///
/// There are no `&mut self` methods: a reload builds a fresh snapshot, so an
/// `Arc<DatasetSnapshot>` held across a reload keeps its original contents.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSnapshot {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    n_rows: usize,
}

impl DatasetSnapshot {
    /// Build a snapshot, checking that column names are unique and that
    /// every column has the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, ParseError> {
        let n_rows = columns.first().map_or(0, |c| c.values.len());
        let mut index = HashMap::with_capacity(columns.len());

        for (i, col) in columns.iter().enumerate() {
            if col.values.len() != n_rows {
                return Err(ParseError::Schema(format!(
                    "column {:?} has {} rows, expected {n_rows}",
                    col.name,
                    col.values.len()
                )));
            }
            if index.insert(col.name.clone(), i).is_some() {
                return Err(ParseError::Schema(format!(
                    "duplicate column name {:?}",
                    col.name
                )));
            }
        }

        Ok(Self {
            columns,
            index,
            n_rows,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Column names in file order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of float / integer columns, in file order.
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type().is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Names of string columns, in file order.
    pub fn string_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type() == ColumnType::String)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Single cell lookup; `Null` for unknown columns.
    pub fn value(&self, row: usize, column: &str) -> CellValue {
        self.column(column)
            .map_or(CellValue::Null, |c| c.values.get(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatasetSnapshot {
        DatasetSnapshot::from_columns(vec![
            Column::new("Time", ColumnValues::Integer(vec![Some(1), Some(2), None])),
            Column::new(
                "Hydrogen",
                ColumnValues::Float(vec![Some(0.5), None, Some(1.5)]),
            ),
            Column::new(
                "AgentType",
                ColumnValues::String(vec![Some("Air".into()), Some("Oxygen".into()), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let snap = sample();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.column_index("Hydrogen"), Some(1));
        assert!(!snap.has_column("Methane"));
        assert_eq!(snap.value(1, "AgentType"), CellValue::String("Oxygen".into()));
        assert_eq!(snap.value(2, "Time"), CellValue::Null);
        assert_eq!(snap.value(0, "Nope"), CellValue::Null);
    }

    #[test]
    fn test_numeric_and_string_columns() {
        let snap = sample();
        assert_eq!(snap.numeric_column_names(), vec!["Time", "Hydrogen"]);
        assert_eq!(snap.string_column_names(), vec!["AgentType"]);
        assert_eq!(snap.column("Time").unwrap().values.f64_at(1), Some(2.0));
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let err = DatasetSnapshot::from_columns(vec![
            Column::new("a", ColumnValues::Float(vec![Some(1.0)])),
            Column::new("b", ColumnValues::Float(vec![Some(1.0), Some(2.0)])),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("column \"b\""));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = DatasetSnapshot::from_columns(vec![
            Column::new("a", ColumnValues::Float(vec![])),
            Column::new("a", ColumnValues::Integer(vec![])),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_float_cells_display_without_rounding() {
        assert_eq!(CellValue::Float(1.00001).to_string(), "1.00001");
        assert_eq!(CellValue::Float(1.00002).to_string(), "1.00002");
        assert_eq!(CellValue::Float(2.0).to_string(), "2.0");
        assert_eq!(CellValue::Integer(3).to_string(), "3");
        assert_eq!(CellValue::Null.to_string(), "<null>");
    }
}
