//! # Header Extraction
//!
//! Produces the field names a record source declares, without reading the
//! whole source.
//!
//! - **CSV**: the first row, verbatim. No trimming, no case folding.
//! - **JSON**: the keys of the first object. For a top-level array that is
//!   its first element; for a top-level object, the object itself. Only the
//!   first value is decoded.
//!
//! JSON object keys carry no order, so the names are returned sorted.
//! Consumers must only rely on set membership.

use std::io::{BufRead, BufReader, Read};

use serde_json::Value;

use crate::error::ReaderError;
use crate::format::InputFormat;

/// Extract the declared field names from a record source.
///
/// # Errors
///
/// [`ReaderError::EmptyInput`] when the source has no header row (CSV) or
/// no first object (JSON), [`ReaderError::InvalidStructure`] when a JSON
/// source does not start with an array or object, and the wrapped decoder
/// error when reading fails.
pub fn extract_headers<R: Read>(reader: R, format: InputFormat) -> Result<Vec<String>, ReaderError> {
    match format {
        InputFormat::Csv => csv_headers(reader),
        InputFormat::Json => json_headers(reader),
    }
}

/// The first row of a CSV source.
pub fn csv_headers<R: Read>(reader: R) -> Result<Vec<String>, ReaderError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    match csv.records().next() {
        Some(row) => Ok(row?.iter().map(str::to_string).collect()),
        None => Err(ReaderError::EmptyInput),
    }
}

/// The keys of the first object of a JSON source.
pub fn json_headers<R: Read>(reader: R) -> Result<Vec<String>, ReaderError> {
    let mut reader = BufReader::new(reader);

    let first = match peek_token(&mut reader)? {
        None => return Err(ReaderError::EmptyInput),
        Some(b'[') => {
            reader.consume(1);
            match peek_token(&mut reader)? {
                Some(b']') => return Err(ReaderError::EmptyInput),
                None => return Err(ReaderError::invalid("unterminated array")),
                Some(_) => match next_value(&mut reader)? {
                    Value::Object(object) => object,
                    other => {
                        return Err(ReaderError::invalid(format!(
                            "expected first array element to be an object, found {}",
                            describe_value(&other)
                        )))
                    }
                },
            }
        }
        Some(b'{') => match next_value(&mut reader)? {
            Value::Object(object) => object,
            other => {
                return Err(ReaderError::invalid(format!(
                    "expected an object, found {}",
                    describe_value(&other)
                )))
            }
        },
        Some(other) => {
            return Err(ReaderError::invalid(format!(
                "expected array or object, found {}",
                describe_token(other)
            )))
        }
    };

    let mut names: Vec<String> = first.into_iter().map(|(key, _)| key).collect();
    names.sort_unstable();
    Ok(names)
}

/// Peek the next non-whitespace byte without consuming it.
pub(crate) fn peek_token<R: BufRead>(reader: &mut R) -> std::io::Result<Option<u8>> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                let token = buf[i];
                reader.consume(i);
                return Ok(Some(token));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Decode exactly one JSON value, leaving the rest of the input unread.
pub(crate) fn next_value<R: Read>(reader: R) -> Result<Value, ReaderError> {
    match serde_json::Deserializer::from_reader(reader)
        .into_iter::<Value>()
        .next()
    {
        Some(value) => Ok(value?),
        None => Err(ReaderError::invalid("unexpected end of input")),
    }
}

pub(crate) fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn describe_token(token: u8) -> String {
    match token {
        b'"' => "a string".to_string(),
        b'-' | b'0'..=b'9' => "a number".to_string(),
        b't' | b'f' => "a boolean".to_string(),
        b'n' => "null".to_string(),
        other => format!("unexpected character '{}'", other as char),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchimport_schema::ErrorKind;

    #[test]
    fn csv_first_row_is_verbatim() {
        let input = "email, Name ,phone\na@b.com,A,123\n";
        let headers = extract_headers(input.as_bytes(), InputFormat::Csv).unwrap();
        assert_eq!(headers, ["email", " Name ", "phone"]);
    }

    #[test]
    fn csv_quoted_headers() {
        let input = "\"email\",\"first,last\"\n";
        let headers = csv_headers(input.as_bytes()).unwrap();
        assert_eq!(headers, ["email", "first,last"]);
    }

    #[test]
    fn csv_header_only_file() {
        let headers = csv_headers("email\n".as_bytes()).unwrap();
        assert_eq!(headers, ["email"]);
    }

    #[test]
    fn csv_empty_input() {
        let err = csv_headers("".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
    }

    #[test]
    fn json_array_uses_first_object() {
        let input = r#"[{"email":"a@b.com","name":"A"},{"email":"c@d.com","phone":"1"}]"#;
        let headers = extract_headers(input.as_bytes(), InputFormat::Json).unwrap();
        assert_eq!(headers, ["email", "name"]);
    }

    #[test]
    fn json_single_object() {
        let headers = json_headers(r#"  {"email":"a@b.com"}"#.as_bytes()).unwrap();
        assert_eq!(headers, ["email"]);
    }

    #[test]
    fn json_only_first_element_is_decoded() {
        let input = "[\n  {\"email\": \"a@b.com\"},\n  {broken";
        let headers = json_headers(input.as_bytes()).unwrap();
        assert_eq!(headers, ["email"]);
    }

    #[test]
    fn json_scalar_is_invalid_structure() {
        for input in ["42", "\"email\"", "true", "null"] {
            let err = json_headers(input.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidStructure, "input: {input}");
        }
    }

    #[test]
    fn json_array_of_scalars_is_invalid_structure() {
        let err = json_headers("[1, 2]".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStructure);
        assert!(err.to_string().contains("a number"), "got: {err}");
    }

    #[test]
    fn json_empty_inputs() {
        assert_eq!(json_headers("".as_bytes()).unwrap_err().kind(), ErrorKind::EmptyInput);
        assert_eq!(json_headers("  \n".as_bytes()).unwrap_err().kind(), ErrorKind::EmptyInput);
        assert_eq!(json_headers("[ ]".as_bytes()).unwrap_err().kind(), ErrorKind::EmptyInput);
    }

    #[test]
    fn json_truncated_object_is_a_decode_error() {
        let err = json_headers(r#"{"email": "#.as_bytes()).unwrap_err();
        assert!(matches!(err, ReaderError::Json(_)), "got: {err:?}");
    }
}
