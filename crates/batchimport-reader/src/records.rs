//! # Record Streaming
//!
//! Iterates the records of a source one at a time, so that arbitrarily
//! large files can be validated in constant memory.
//!
//! CSV cells are text. Each cell is converted to the JSON value the
//! column's trait declares when the text parses as that type; otherwise
//! the cell stays a string and value validation reports the mismatch.
//! Empty cells are left out of the record. JSON records are used as-is.

use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use batchimport_schema::{Schema, TraitField, TraitType};
use serde_json::{Map, Number, Value};

use crate::error::ReaderError;
use crate::format::InputFormat;
use crate::headers::{describe_token, describe_value, next_value, peek_token};

/// One input record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based position among the source's records (the CSV header row is
    /// not counted).
    pub position: usize,
    /// Field names declared by the CSV header row or the first JSON object.
    pub field_names: Arc<[String]>,
    /// Field values keyed by field name.
    pub fields: Map<String, Value>,
}

/// Iterator over the records of a source.
pub struct Records<R: Read> {
    inner: Inner<R>,
}

enum Inner<R: Read> {
    Csv(CsvRecords<R>),
    Json(JsonRecords<R>),
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Record, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Csv(records) => records.next(),
            Inner::Json(records) => records.next(),
        }
    }
}

/// Stream the records of a source.
///
/// `schema` guides CSV cell conversion; it is not used to validate.
///
/// # Errors
///
/// [`ReaderError::EmptyInput`] if a CSV source has no header row. JSON
/// sources report structural problems through the iterator.
pub fn read_records<R: Read>(
    reader: R,
    format: InputFormat,
    schema: Arc<Schema>,
) -> Result<Records<R>, ReaderError> {
    let inner = match format {
        InputFormat::Csv => Inner::Csv(CsvRecords::new(reader, schema)?),
        InputFormat::Json => Inner::Json(JsonRecords::new(reader)),
    };
    Ok(Records { inner })
}

// ─── CSV ────────────────────────────────────────────────────────────────

struct CsvRecords<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    field_names: Arc<[String]>,
    schema: Arc<Schema>,
    position: usize,
}

impl<R: Read> CsvRecords<R> {
    fn new(reader: R, schema: Arc<Schema>) -> Result<Self, ReaderError> {
        let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let field_names: Arc<[String]> = csv.headers()?.iter().map(str::to_string).collect();
        if field_names.is_empty() {
            return Err(ReaderError::EmptyInput);
        }
        Ok(Self {
            rows: csv.into_records(),
            field_names,
            schema,
            position: 0,
        })
    }

    fn next(&mut self) -> Option<Result<Record, ReaderError>> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e.into())),
        };
        self.position += 1;

        let fields = self
            .field_names
            .iter()
            .zip(row.iter())
            .filter_map(|(name, cell)| {
                cell_value(cell, self.schema.trait_field(name)).map(|value| (name.clone(), value))
            })
            .collect();

        Some(Ok(Record {
            position: self.position,
            field_names: Arc::clone(&self.field_names),
            fields,
        }))
    }
}

/// Convert a CSV cell to the JSON value its trait declares.
///
/// Returns `None` for an empty cell.
pub fn cell_value(cell: &str, field: Option<&TraitField>) -> Option<Value> {
    if cell.is_empty() {
        return None;
    }

    let text = || Value::String(cell.to_string());
    let value = match field.and_then(|f| f.field_type) {
        Some(TraitType::Integer) => integer_value(cell).unwrap_or_else(text),
        Some(TraitType::Number) => cell
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(text),
        Some(TraitType::Boolean) => match cell {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => text(),
        },
        Some(TraitType::Object) => match serde_json::from_str::<Value>(cell) {
            Ok(value @ Value::Object(_)) => value,
            _ => text(),
        },
        Some(TraitType::Array) => match serde_json::from_str::<Value>(cell) {
            Ok(value @ Value::Array(_)) => value,
            _ => text(),
        },
        Some(TraitType::String) | Some(TraitType::Null) | None => text(),
    };
    Some(value)
}

/// Integer cells: `i64`, then `u64`, then a float with no fractional part
/// (`42.0`), which JSON Schema also counts as an integer.
fn integer_value(cell: &str) -> Option<Value> {
    if let Ok(n) = cell.parse::<i64>() {
        return Some(Value::from(n));
    }
    if let Ok(n) = cell.parse::<u64>() {
        return Some(Value::from(n));
    }
    cell.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .and_then(Number::from_f64)
        .map(Value::Number)
}

// ─── JSON ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum JsonState {
    Start,
    ArrayFirst,
    ArrayRest,
    Done,
}

struct JsonRecords<R: Read> {
    reader: BufReader<R>,
    state: JsonState,
    field_names: Option<Arc<[String]>>,
    position: usize,
}

impl<R: Read> JsonRecords<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            state: JsonState::Start,
            field_names: None,
            position: 0,
        }
    }

    fn next(&mut self) -> Option<Result<Record, ReaderError>> {
        let token = match self.state {
            JsonState::Done => return None,
            _ => match peek_token(&mut self.reader) {
                Ok(token) => token,
                Err(e) => return self.fail(e.into()),
            },
        };

        match (self.state, token) {
            (JsonState::Start, None) => self.fail(ReaderError::EmptyInput),
            (JsonState::Start, Some(b'[')) => {
                self.reader.consume(1);
                self.state = JsonState::ArrayFirst;
                self.next()
            }
            (JsonState::Start, Some(b'{')) => {
                self.state = JsonState::Done;
                self.read_object()
            }
            (JsonState::Start, Some(other)) => self.fail(ReaderError::invalid(format!(
                "expected array or object, found {}",
                describe_token(other)
            ))),
            (JsonState::ArrayFirst | JsonState::ArrayRest, Some(b']')) => {
                self.reader.consume(1);
                self.state = JsonState::Done;
                None
            }
            (JsonState::ArrayFirst | JsonState::ArrayRest, None) => {
                self.fail(ReaderError::invalid("unterminated array"))
            }
            (JsonState::ArrayFirst, Some(_)) => {
                self.state = JsonState::ArrayRest;
                self.read_object()
            }
            (JsonState::ArrayRest, Some(b',')) => {
                self.reader.consume(1);
                self.read_object()
            }
            (JsonState::ArrayRest, Some(other)) => self.fail(ReaderError::invalid(format!(
                "expected ',' or ']' after record {}, found {}",
                self.position,
                describe_token(other)
            ))),
            (JsonState::Done, _) => None,
        }
    }

    fn read_object(&mut self) -> Option<Result<Record, ReaderError>> {
        let value = match next_value(&mut self.reader) {
            Ok(value) => value,
            Err(e) => return self.fail(e),
        };
        self.position += 1;

        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                let detail = format!(
                    "record {} is {}, expected an object",
                    self.position,
                    describe_value(&other)
                );
                return self.fail(ReaderError::invalid(detail));
            }
        };

        let field_names = Arc::clone(
            self.field_names
                .get_or_insert_with(|| fields.keys().cloned().collect()),
        );

        Some(Ok(Record {
            position: self.position,
            field_names,
            fields,
        }))
    }

    /// Report an error and stop iterating.
    fn fail(&mut self, err: ReaderError) -> Option<Result<Record, ReaderError>> {
        self.state = JsonState::Done;
        Some(Err(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchimport_schema::ErrorKind;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::from_value(json!({
                "properties": {
                    "traits": {
                        "properties": {
                            "email": { "type": "string" },
                            "age": { "type": "integer" },
                            "score": { "type": "number" },
                            "active": { "type": "boolean" },
                            "name": { "type": "object" },
                            "tags": { "type": "array" }
                        }
                    }
                }
            }))
            .unwrap(),
        )
    }

    fn collect(input: &str, format: InputFormat) -> Vec<Result<Record, ReaderError>> {
        read_records(input.as_bytes(), format, schema()).unwrap().collect()
    }

    #[test]
    fn csv_rows_become_typed_records() {
        let input = "email,age,score,active,name,tags\n\
                     a@b.com,42,1.5,true,\"{\"\"first\"\":\"\"A\"\"}\",\"[1,2]\"\n";
        let records = collect(input, InputFormat::Csv);
        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.position, 1);
        assert_eq!(record.field_names.len(), 6);
        assert_eq!(
            Value::Object(record.fields.clone()),
            json!({
                "email": "a@b.com",
                "age": 42,
                "score": 1.5,
                "active": true,
                "name": { "first": "A" },
                "tags": [1, 2]
            })
        );
    }

    #[test]
    fn csv_unparseable_cells_stay_strings() {
        let records = collect("age,active\nforty,yes\n", InputFormat::Csv);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.fields["age"], json!("forty"));
        assert_eq!(record.fields["active"], json!("yes"));
    }

    #[test]
    fn csv_empty_cells_are_omitted() {
        let records = collect("email,age\na@b.com,\n,7\n", InputFormat::Csv);
        assert_eq!(records.len(), 2);
        let first = records[0].as_ref().unwrap();
        assert!(!first.fields.contains_key("age"));
        let second = records[1].as_ref().unwrap();
        assert_eq!(second.position, 2);
        assert_eq!(Value::Object(second.fields.clone()), json!({ "age": 7 }));
    }

    #[test]
    fn csv_unknown_columns_are_text() {
        let records = collect("nickname\n12\n", InputFormat::Csv);
        assert_eq!(records[0].as_ref().unwrap().fields["nickname"], json!("12"));
    }

    #[test]
    fn csv_ragged_row_is_an_error() {
        let records = collect("email,age\na@b.com,1,extra\n", InputFormat::Csv);
        assert!(records[0].is_err());
    }

    #[test]
    fn csv_without_header_is_empty_input() {
        let err = read_records("".as_bytes(), InputFormat::Csv, schema())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
    }

    #[test]
    fn json_array_streams_objects() {
        let input = r#"[ {"email": "a@b.com", "age": 1},
                         {"email": "c@d.com"} ]"#;
        let records: Vec<Record> = collect(input, InputFormat::Json)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["age"], json!(1));
        assert_eq!(records[1].position, 2);
        assert_eq!(&*records[1].field_names, ["age".to_string(), "email".to_string()]);
    }

    #[test]
    fn json_values_are_not_converted() {
        let records = collect(r#"[{"age": "42"}]"#, InputFormat::Json);
        assert_eq!(records[0].as_ref().unwrap().fields["age"], json!("42"));
    }

    #[test]
    fn json_single_object_is_one_record() {
        let records = collect(r#"{"email": "a@b.com"}"#, InputFormat::Json);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().position, 1);
    }

    #[test]
    fn json_empty_array_has_no_records() {
        assert!(collect("[]", InputFormat::Json).is_empty());
    }

    #[test]
    fn json_non_object_element_stops_iteration() {
        let records = collect(r#"[{"email": "a@b.com"}, 5, {"email": "c@d.com"}]"#, InputFormat::Json);
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        let err = records[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStructure);
        assert!(err.to_string().contains("record 2"), "got: {err}");
    }

    #[test]
    fn json_unterminated_array_is_reported() {
        let records = collect(r#"[{"email": "a@b.com"}"#, InputFormat::Json);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].as_ref().unwrap_err().kind(), ErrorKind::InvalidStructure);
    }

    #[test]
    fn json_scalar_document_is_invalid_structure() {
        let records = collect("\"users\"", InputFormat::Json);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap_err().kind(), ErrorKind::InvalidStructure);
    }

    #[test]
    fn integer_cells_accept_wide_and_integral_values() {
        let field: TraitField = serde_json::from_value(json!({ "type": "integer" })).unwrap();
        assert_eq!(cell_value("-7", Some(&field)), Some(json!(-7)));
        assert_eq!(cell_value("18446744073709551615", Some(&field)), Some(json!(u64::MAX)));
        assert_eq!(cell_value("42.0", Some(&field)), Some(json!(42.0)));
        assert_eq!(cell_value("42.5", Some(&field)), Some(json!("42.5")));
        assert_eq!(cell_value("NaN", Some(&field)), Some(json!("NaN")));
        assert_eq!(cell_value("old", Some(&field)), Some(json!("old")));
    }

    #[test]
    fn cell_value_without_trait_is_text() {
        assert_eq!(cell_value("1", None), Some(json!("1")));
        assert_eq!(cell_value("", None), None);
    }
}
