use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Column, ColumnType, ColumnValues, DatasetSnapshot};
use crate::error::{ConfigError, DatasetError, ParseError};

/// Measurement columns that schema inference tends to mistype.
pub const MEASUREMENT_COLUMNS: [&str; 6] = [
    "CarbonMonoxide",
    "CarbonDioxide",
    "Methane",
    "Oxygen",
    "Hydrogen",
    "CalorificValue",
];

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_INFER_ROWS: usize = 10_000;

// ---------------------------------------------------------------------------
// Engine selection and parse options
// ---------------------------------------------------------------------------

/// Which reader implementation parses delimited text.
///
/// Both engines read parquet through the arrow reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Arrow CSV reader with sampled schema inference and an override retry.
    #[default]
    Arrow,
    /// `csv` crate reader that scans every row to decide column types.
    Simple,
}

impl FromStr for Engine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrow" | "polars" => Ok(Engine::Arrow),
            "simple" | "pandas" => Ok(Engine::Simple),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Arrow => f.write_str("arrow"),
            Engine::Simple => f.write_str("simple"),
        }
    }
}

/// Explicit column → type overrides applied to delimited text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaOverrides(Vec<(String, ColumnType)>);

impl SchemaOverrides {
    /// Every listed column forced to `Float`.
    pub fn floats<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            columns
                .into_iter()
                .map(|c| (c.into(), ColumnType::Float))
                .collect(),
        )
    }

    /// The six gasification measurement columns as `Float`.
    pub fn measurements() -> Self {
        Self::floats(MEASUREMENT_COLUMNS)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<ColumnType> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }

    /// Rewrite matching fields of an inferred arrow schema.
    fn apply(&self, schema: &Schema) -> Schema {
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|f| match self.get(f.name()) {
                Some(ty) => Field::new(f.name(), arrow_type(ty), true),
                None => f.as_ref().clone(),
            })
            .collect();
        Schema::new(fields)
    }
}

fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Float => DataType::Float64,
        ColumnType::Integer => DataType::Int64,
        ColumnType::String => DataType::Utf8,
        ColumnType::Bool => DataType::Boolean,
    }
}

/// How delimited text is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub delimiter: u8,
    /// Rows sampled for schema inference (arrow engine).
    pub infer_rows: usize,
    pub overrides: SchemaOverrides,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            infer_rows: DEFAULT_INFER_ROWS,
            overrides: SchemaOverrides::measurements(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset snapshot from a file.  Dispatch by extension.
///
/// * `.parquet` / `.pq` – columnar binary, read as-is
/// * anything else      – delimited text, parsed by the selected engine
pub fn load_file(
    path: &Path,
    engine: Engine,
    options: &ParseOptions,
) -> Result<DatasetSnapshot, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let result = if is_parquet(path) {
        load_parquet(file)
    } else {
        match engine {
            Engine::Arrow => load_delimited_arrow(file, options),
            Engine::Simple => load_delimited_simple(file, options),
        }
    };

    result.map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn is_parquet(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(ext.as_str(), "parquet" | "pq")
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by Pandas, Polars or the arrow writer used by
/// `generate_sample`.
fn load_parquet(file: File) -> Result<DatasetSnapshot, ParseError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    snapshot_from_batches(&schema, &batches)
}

// ---------------------------------------------------------------------------
// Delimited text – arrow engine
// ---------------------------------------------------------------------------

/// Infer the schema from the first `infer_rows` rows, then decode.  Values
/// past the sample can contradict the inferred type (an integer column that
/// later holds `3.5`); in that case decode once more with the overrides.
fn load_delimited_arrow(
    mut file: File,
    options: &ParseOptions,
) -> Result<DatasetSnapshot, ParseError> {
    let format = Format::default()
        .with_header(true)
        .with_delimiter(options.delimiter);
    let (inferred, _) = format.infer_schema(&mut file, Some(options.infer_rows))?;
    let inferred = Arc::new(inferred);

    file.rewind()?;
    let first = decode_delimited(&mut file, inferred.clone(), options.delimiter);
    let err = match first {
        Ok(snapshot) => return Ok(snapshot),
        Err(err) if options.overrides.is_empty() => return Err(err),
        Err(err) => err,
    };

    log::warn!("Inferred schema rejected ({err}); retrying with column type overrides");
    file.rewind()?;
    let overridden = Arc::new(options.overrides.apply(&inferred));
    decode_delimited(&mut file, overridden, options.delimiter)
}

fn decode_delimited<R: Read>(
    reader: R,
    schema: SchemaRef,
    delimiter: u8,
) -> Result<DatasetSnapshot, ParseError> {
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_delimiter(delimiter)
        .build(reader)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    snapshot_from_batches(&schema, &batches)
}

// -- Arrow → snapshot helpers --

fn snapshot_from_batches(
    schema: &SchemaRef,
    batches: &[RecordBatch],
) -> Result<DatasetSnapshot, ParseError> {
    let mut columns = Vec::with_capacity(schema.fields().len());

    for (idx, field) in schema.fields().iter().enumerate() {
        let column_type = column_type_of(field.data_type()).ok_or_else(|| {
            ParseError::Schema(format!(
                "column {:?} has unsupported type {:?}",
                field.name(),
                field.data_type()
            ))
        })?;
        let mut values = ColumnValues::empty(column_type);
        for batch in batches {
            append_array(&mut values, batch.column(idx))?;
        }
        columns.push(Column::new(field.name().clone(), values));
    }

    DatasetSnapshot::from_columns(columns)
}

fn column_type_of(data_type: &DataType) -> Option<ColumnType> {
    match data_type {
        DataType::Dictionary(_, value) => column_type_of(value),
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => Some(ColumnType::Float),
        t if t.is_floating() => Some(ColumnType::Float),
        t if t.is_integer() => Some(ColumnType::Integer),
        DataType::Boolean => Some(ColumnType::Bool),
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Utf8View
        | DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(_, _)
        | DataType::Null => Some(ColumnType::String),
        _ => None,
    }
}

/// Append one arrow array to typed storage, casting within the type family.
/// Dictionary-encoded arrays are unpacked by the cast.
fn append_array(values: &mut ColumnValues, array: &ArrayRef) -> Result<(), ParseError> {
    match values {
        ColumnValues::Float(out) => {
            let arr = cast(array, &DataType::Float64)?;
            out.extend(arr.as_primitive::<Float64Type>().iter());
        }
        ColumnValues::Integer(out) => {
            let arr = cast(array, &DataType::Int64)?;
            out.extend(arr.as_primitive::<Int64Type>().iter());
        }
        ColumnValues::Bool(out) => {
            let arr = cast(array, &DataType::Boolean)?;
            out.extend(arr.as_boolean().iter());
        }
        ColumnValues::String(out) => {
            let arr = cast(array, &DataType::Utf8)?;
            out.extend(arr.as_string::<i32>().iter().map(|v| v.map(str::to_string)));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Delimited text – simple engine
// ---------------------------------------------------------------------------

/// Read every record with the `csv` crate, then settle each column's type
/// from all of its cells.  An override replaces the inferred type only when
/// every cell parses under it.
fn load_delimited_simple(
    file: File,
    options: &ParseOptions,
) -> Result<DatasetSnapshot, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != headers.len() {
            return Err(ParseError::Schema(format!(
                "row {row_no} has {} fields, expected {}",
                record.len(),
                headers.len()
            )));
        }
        for (col, value) in record.iter().enumerate() {
            cells[col].push(value.trim().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let inferred = guess_column_type(&raw);
            if let Some(ty) = options.overrides.get(&name).filter(|ty| *ty != inferred) {
                match parse_cells(&name, &raw, ty) {
                    Ok(values) => return Ok(Column::new(name, values)),
                    Err(err) => log::warn!("Override ignored ({err}); keeping inferred {inferred}"),
                }
            }
            let values = parse_cells(&name, &raw, inferred)?;
            Ok(Column::new(name, values))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    DatasetSnapshot::from_columns(columns)
}

/// Narrowest type that fits every non-empty cell.
fn guess_column_type(raw: &[String]) -> ColumnType {
    let present = || raw.iter().filter(|s| !s.is_empty());
    if present().all(|s| s.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if present().all(|s| s.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if present().all(|s| s == "true" || s == "false") {
        ColumnType::Bool
    } else {
        ColumnType::String
    }
}

fn parse_cells(name: &str, raw: &[String], ty: ColumnType) -> Result<ColumnValues, ParseError> {
    fn each<T>(
        name: &str,
        raw: &[String],
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<Option<T>>, ParseError> {
        raw.iter()
            .enumerate()
            .map(|(row, s)| {
                if s.is_empty() {
                    return Ok(None);
                }
                parse(s).map(Some).ok_or_else(|| {
                    ParseError::Schema(format!("row {row}, column {name:?}: cannot parse {s:?}"))
                })
            })
            .collect()
    }

    Ok(match ty {
        ColumnType::Integer => ColumnValues::Integer(each(name, raw, |s| s.parse().ok())?),
        ColumnType::Float => ColumnValues::Float(each(name, raw, |s| s.parse().ok())?),
        ColumnType::Bool => ColumnValues::Bool(each(name, raw, |s| match s {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })?),
        ColumnType::String => ColumnValues::String(each(name, raw, |s| Some(s.to_string()))?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "Time;AgentType;CarbonMonoxide;Hydrogen";

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_engine_names() {
        assert_eq!("polars".parse::<Engine>().unwrap(), Engine::Arrow);
        assert_eq!("Simple".parse::<Engine>().unwrap(), Engine::Simple);
        assert!("duckdb".parse::<Engine>().is_err());
    }

    #[test]
    fn test_arrow_engine_reads_semicolon_csv() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "data.csv",
            &format!("{HEADER}\n1;Air;10.5;3.25\n2;Oxygen;11.0;\n"),
        );

        let snap = load_file(&path, Engine::Arrow, &ParseOptions::default()).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.column("Time").unwrap().column_type(), ColumnType::Integer);
        assert_eq!(snap.column("AgentType").unwrap().column_type(), ColumnType::String);
        assert_eq!(snap.column("Hydrogen").unwrap().values.f64_at(1), None);
    }

    #[test]
    fn test_arrow_engine_falls_back_to_overrides() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "data.csv",
            &format!("{HEADER}\n1;Air;10;3\n2;Air;11;4\n3;Oxygen;12.75;4.5\n"),
        );
        let options = ParseOptions {
            infer_rows: 2,
            ..ParseOptions::default()
        };

        let snap = load_file(&path, Engine::Arrow, &options).unwrap();
        let co = snap.column("CarbonMonoxide").unwrap();
        assert_eq!(co.column_type(), ColumnType::Float);
        assert_eq!(co.values.f64_at(2), Some(12.75));
    }

    #[test]
    fn test_arrow_engine_without_overrides_reports_parse_error() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "data.csv",
            &format!("{HEADER}\n1;Air;10;3\n2;Air;11;4\n3;Oxygen;12.75;4.5\n"),
        );
        let options = ParseOptions {
            infer_rows: 2,
            overrides: SchemaOverrides::default(),
            ..ParseOptions::default()
        };

        let err = load_file(&path, Engine::Arrow, &options).unwrap_err();
        assert!(matches!(err, DatasetError::Parse { .. }));
    }

    #[test]
    fn test_simple_engine_scans_whole_column() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "data.txt",
            &format!("{HEADER}\n1;Air;10;3\n2;Air;11;true\n"),
        );
        let options = ParseOptions {
            overrides: SchemaOverrides::default(),
            ..ParseOptions::default()
        };

        let snap = load_file(&path, Engine::Simple, &options).unwrap();
        assert_eq!(snap.column("CarbonMonoxide").unwrap().column_type(), ColumnType::Integer);
        assert_eq!(snap.column("Hydrogen").unwrap().column_type(), ColumnType::String);
    }

    #[test]
    fn test_simple_engine_applies_overrides() {
        let temp = tempdir().unwrap();
        let path = write(
            temp.path(),
            "data.csv",
            &format!("{HEADER}\n1;Air;10;3\n"),
        );

        let snap = load_file(&path, Engine::Simple, &ParseOptions::default()).unwrap();
        assert_eq!(snap.column("CarbonMonoxide").unwrap().column_type(), ColumnType::Float);
        assert_eq!(snap.column("Time").unwrap().column_type(), ColumnType::Integer);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let temp = tempdir().unwrap();
        let err = load_file(
            &temp.path().join("absent.csv"),
            Engine::Arrow,
            &ParseOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::Unavailable { .. }));
    }

    #[test]
    fn test_parquet_round_trip_types() {
        use arrow::array::{Float64Array, Int64Array, StringArray};
        use parquet::arrow::ArrowWriter;

        let temp = tempdir().unwrap();
        let path = temp.path().join("data.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("Time", DataType::Int64, false),
            Field::new("SampleType", DataType::Utf8, true),
            Field::new("Methane", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![5, 10])),
                Arc::new(StringArray::from(vec![Some("TWTS"), None])),
                Arc::new(Float64Array::from(vec![Some(1.5), Some(2.5)])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let snap = load_file(&path, Engine::Simple, &ParseOptions::default()).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(snap.column("SampleType").unwrap().values.get(1).is_null());
        assert_eq!(snap.column("Methane").unwrap().values.f64_at(0), Some(1.5));
    }

    #[test]
    fn test_parquet_categorical_and_decimal_columns() {
        use arrow::array::{Array, Decimal128Array, DictionaryArray};
        use arrow::datatypes::Int32Type;
        use parquet::arrow::ArrowWriter;

        let temp = tempdir().unwrap();
        let path = temp.path().join("categorical.parquet");
        let agents: DictionaryArray<Int32Type> =
            vec![Some("Air"), Some("Oxygen"), None, Some("Air")].into_iter().collect();
        let ratio = Decimal128Array::from(vec![Some(1050), Some(0), Some(250), None])
            .with_precision_and_scale(10, 2)
            .unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("AgentType", agents.data_type().clone(), true),
            Field::new("CatalystRatio", ratio.data_type().clone(), true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(agents) as ArrayRef, Arc::new(ratio) as ArrayRef],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let snap = load_file(&path, Engine::Arrow, &ParseOptions::default()).unwrap();
        let agent = snap.column("AgentType").unwrap();
        assert_eq!(agent.column_type(), ColumnType::String);
        assert_eq!(agent.values.get(1), CellValue::String("Oxygen".into()));
        assert!(agent.values.get(2).is_null());

        let ratio = snap.column("CatalystRatio").unwrap();
        assert_eq!(ratio.column_type(), ColumnType::Float);
        assert_eq!(ratio.values.f64_at(0), Some(10.5));
        assert_eq!(ratio.values.f64_at(3), None);
    }

    #[test]
    fn test_simple_engine_keeps_text_in_measurement_column() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "data.csv", "Time;CarbonMonoxide\n1;10.5\n2;n/a\n");

        let snap = load_file(&path, Engine::Simple, &ParseOptions::default()).unwrap();
        let co = snap.column("CarbonMonoxide").unwrap();
        assert_eq!(co.column_type(), ColumnType::String);
        assert_eq!(co.values.get(1), CellValue::String("n/a".into()));

        let arrow = load_file(&path, Engine::Arrow, &ParseOptions::default()).unwrap();
        assert_eq!(
            arrow.column("CarbonMonoxide").unwrap().column_type(),
            ColumnType::String
        );
    }
}
