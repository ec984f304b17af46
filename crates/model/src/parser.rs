//! Tabular (CSV) device model parsing.
//!
//! The tabular format is header-driven: the first row names the columns and
//! every data row is interpreted through that mapping, so column order in the
//! source carries no meaning. Recognized columns are `Parameter`, `Object`,
//! `Writable`, `Value` and `Value type`; for the boolean columns the string
//! `"true"` is the only truthy token.

use crate::ModelError;

/// One data row of the tabular device model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    /// Hierarchical parameter path (`.`-separated). Never empty.
    pub path: String,

    /// Whether this row declares an object (internal) node.
    pub is_object: bool,

    /// Whether the parameter is writable.
    pub writable: bool,

    /// Leaf value, if the source provided one.
    pub value: Option<String>,

    /// Leaf value type, if the source provided one.
    pub value_type: Option<String>,
}

/// Parse tabular text into an ordered sequence of rows.
///
/// Blank lines are skipped. A data row whose `Parameter` cell is missing or
/// empty fails the whole parse; the error carries the row's 1-based position
/// among the data rows so the offending line can be found.
pub fn parse_rows(input: &str) -> Result<Vec<ParameterRow>, ModelError> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());

    let header = match lines.next() {
        Some(line) => split_fields(line),
        None => return Err(ModelError::MissingParameterColumn),
    };

    let path_col = column(&header, "Parameter").ok_or(ModelError::MissingParameterColumn)?;
    let object_col = column(&header, "Object");
    let writable_col = column(&header, "Writable");
    let value_col = column(&header, "Value");
    let type_col = column(&header, "Value type");

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let fields = split_fields(line);
        let row = idx + 1;

        let path = cell(&fields, Some(path_col)).ok_or(ModelError::MissingPath { row })?;

        let is_object = is_true(&fields, object_col);
        rows.push(ParameterRow {
            path,
            is_object,
            writable: is_true(&fields, writable_col),
            // Value columns carry no meaning for object rows.
            value: if is_object { None } else { cell(&fields, value_col) },
            value_type: if is_object { None } else { cell(&fields, type_col) },
        });
    }

    Ok(rows)
}

/// Find a column index by header name.
fn column(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}

/// Fetch a cell, treating an absent or empty cell as `None`.
fn cell(fields: &[String], col: Option<usize>) -> Option<String> {
    let text = fields.get(col?)?;
    if text.is_empty() {
        None
    } else {
        Some(text.clone())
    }
}

/// Boolean cell: `"true"` is the only truthy token.
fn is_true(fields: &[String], col: Option<usize>) -> bool {
    cell(fields, col).as_deref() == Some("true")
}

/// Split one CSV line into fields, honoring double-quoted cells.
///
/// Quoted cells may contain commas; a doubled quote inside a quoted cell is
/// an escaped quote. Surrounding whitespace on unquoted cells is trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current).trim().to_string());
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Parameter,Object,Writable,Value,Value type
Device.,true,false,,
Device.DeviceInfo.Manufacturer,false,false,fleetsim,xsd:string
";

    #[test]
    fn test_parse_basic_rows() {
        let rows = parse_rows(SAMPLE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            ParameterRow {
                path: "Device.".into(),
                is_object: true,
                writable: false,
                value: None,
                value_type: None,
            }
        );
        assert_eq!(rows[1].path, "Device.DeviceInfo.Manufacturer");
        assert_eq!(rows[1].value.as_deref(), Some("fleetsim"));
        assert_eq!(rows[1].value_type.as_deref(), Some("xsd:string"));
    }

    #[test]
    fn test_column_order_is_not_significant() {
        let shuffled = "\
Value,Writable,Parameter,Value type,Object
42,true,Device.X,xsd:int,false
";
        let rows = parse_rows(shuffled).unwrap();
        assert_eq!(rows[0].path, "Device.X");
        assert!(rows[0].writable);
        assert_eq!(rows[0].value.as_deref(), Some("42"));
        assert_eq!(rows[0].value_type.as_deref(), Some("xsd:int"));
    }

    #[test]
    fn test_true_is_the_only_truthy_token() {
        let input = "\
Parameter,Object,Writable
A,TRUE,1
B,true,true
";
        let rows = parse_rows(input).unwrap();
        assert!(!rows[0].is_object);
        assert!(!rows[0].writable);
        assert!(rows[1].is_object);
        assert!(rows[1].writable);
    }

    #[test]
    fn test_object_row_ignores_value_columns() {
        let input = "\
Parameter,Object,Writable,Value,Value type
Device.IP.,true,false,stale,xsd:string
";
        let rows = parse_rows(input).unwrap();
        assert!(rows[0].is_object);
        assert_eq!(rows[0].value, None);
        assert_eq!(rows[0].value_type, None);
    }

    #[test]
    fn test_missing_path_reports_row_position() {
        let input = "\
Parameter,Object,Writable
Device.A,false,true
,false,true
";
        let err = parse_rows(input).unwrap_err();
        match err {
            ModelError::MissingPath { row } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_parameter_column() {
        let input = "Path,Writable\nDevice.A,true\n";
        assert!(matches!(
            parse_rows(input),
            Err(ModelError::MissingParameterColumn)
        ));
    }

    #[test]
    fn test_quoted_cell_with_comma() {
        let input = "\
Parameter,Object,Writable,Value,Value type
Device.Desc,false,false,\"a, b\",xsd:string
";
        let rows = parse_rows(input).unwrap();
        assert_eq!(rows[0].value.as_deref(), Some("a, b"));
    }
}
