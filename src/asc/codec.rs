// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

use super::error::AscError;
use super::schema::{Field, FieldType};
use std::fmt;
use std::iter::FromIterator;

/// A decoded column.
///
/// An optional numeric column left empty decodes as `Text("")`, not as a
/// number: callers reading numbers must expect this sentinel (see
/// [`Fields::integer`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text column, or the empty sentinel of an optional numeric column
    Text(String),
    /// Integer column
    Integer(i64),
    /// Real column
    Real(f64),
    /// Boolean column
    Boolean(bool),
}

impl Value {
    /// True for the empty text (including the empty numeric sentinel).
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }

    /// The text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Boolean(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Named values kept in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(Vec<(&'static str, Value)>);

impl Fields {
    /// Value of a column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Sets a column, replacing its value in place if already present.
    pub fn insert<V: Into<Value>>(&mut self, name: &'static str, value: V) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name, value)),
        }
    }

    /// Columns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.0.iter().map(|(n, v)| (*n, v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there is no column.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rendering of a column as text, empty if absent.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(Value::to_string).unwrap_or_default()
    }

    /// Integer value of a column, `None` for the empty sentinel.
    pub fn integer(&self, name: &str) -> Result<Option<i64>, AscError> {
        match self.get(name) {
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(v) if v.is_empty() => Ok(None),
            Some(v) => Err(AscError::TypeCoercionFailure {
                field: name.to_string(),
                value: v.to_string(),
                expected: "integer",
            }),
            None => Err(AscError::MissingRequiredValue {
                field: name.to_string(),
            }),
        }
    }

    /// Integer value of a column which must not be empty.
    pub fn required_integer(&self, name: &str) -> Result<i64, AscError> {
        self.integer(name)?
            .ok_or_else(|| AscError::MissingRequiredValue {
                field: name.to_string(),
            })
    }

    /// Real value of a column, `None` for the empty sentinel.
    pub fn real(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Real(r)) => Some(*r),
            Some(Value::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean value of a column, false if absent.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Boolean(true)))
    }
}

impl<V: Into<Value>> FromIterator<(&'static str, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (&'static str, V)>>(iter: I) -> Self {
        let mut fields = Fields::default();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

/// One decoded row.
///
/// Scalar columns are always present; rows of a layout with dimensions also
/// carry one block of repeated columns per variant announced by their
/// header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Scalar columns
    pub fields: Fields,
    /// Repeated blocks, in column order
    pub blocks: Option<Vec<Fields>>,
}

impl Record {
    /// Builds a record without repeated blocks, mostly used as a lookup
    /// probe.
    pub fn from_fields<V, I>(fields: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = (&'static str, V)>,
    {
        Record {
            fields: fields.into_iter().collect(),
            blocks: None,
        }
    }

    /// Value of a scalar column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Repeated blocks, empty for a record without dimensions.
    pub fn blocks(&self) -> &[Fields] {
        self.blocks.as_deref().unwrap_or(&[])
    }
}

impl std::ops::Deref for Record {
    type Target = Fields;
    fn deref(&self) -> &Fields {
        &self.fields
    }
}

/// How many blocks repeat and from which field, as announced by the header
/// owning the rows being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionContext {
    /// Number of repeated blocks
    pub num_dimensions: usize,
    /// First field of the repeated block
    pub repeat_from: &'static str,
}

/// Decodes one column according to its declaration.
pub fn decode_value(raw: &str, field: &Field) -> Result<Value, AscError> {
    let raw = raw.trim();
    let missing = || AscError::MissingRequiredValue {
        field: field.name.to_string(),
    };
    let invalid = |expected| AscError::TypeCoercionFailure {
        field: field.name.to_string(),
        value: raw.to_string(),
        expected,
    };
    if raw.is_empty() {
        return match field.field_type {
            FieldType::Boolean if field.optional => Ok(Value::Boolean(false)),
            _ if field.optional => Ok(Value::Text(String::new())),
            _ => Err(missing()),
        };
    }
    match field.field_type {
        FieldType::Text => Ok(Value::Text(raw.to_string())),
        FieldType::Integer => raw
            .parse()
            .map(Value::Integer)
            .map_err(|_| invalid("integer")),
        FieldType::Real => raw.parse().map(Value::Real).map_err(|_| invalid("real")),
        FieldType::Boolean => Ok(Value::Boolean(raw == "1")),
    }
}

/// Decodes a row against a list of fields.
///
/// Columns missing at the end of the row decode as empty. With a
/// `dimensions` context, the fields from `repeat_from` onward are read
/// `num_dimensions` times, block `n` starting `n` block widths after the
/// first one.
pub fn decode<S: AsRef<str>>(
    row: &[S],
    fields: &'static [Field],
    dimensions: Option<&DimensionContext>,
) -> Result<Record, AscError> {
    let column = |index: usize| row.get(index).map(AsRef::as_ref).unwrap_or("");
    let repeat_index = dimensions
        .and_then(|d| fields.iter().position(|f| f.name == d.repeat_from))
        .unwrap_or(fields.len());

    let mut record = Record::default();
    for (index, field) in fields[..repeat_index].iter().enumerate() {
        record
            .fields
            .insert(field.name, decode_value(column(index), field)?);
    }
    if let Some(dimensions) = dimensions {
        let block_width = fields.len() - repeat_index;
        let blocks = (0..dimensions.num_dimensions)
            .map(|block_number| {
                let mut block = Fields::default();
                for (index, field) in fields.iter().enumerate().skip(repeat_index) {
                    let raw = column(index + block_width * block_number);
                    block.insert(field.name, decode_value(raw, field)?);
                }
                Ok(block)
            })
            .collect::<Result<Vec<_>, AscError>>()?;
        record.blocks = Some(blocks);
    }
    Ok(record)
}

/// Renders one value with the padding of its declared field.
///
/// Numbers are right aligned, everything else left aligned; an over-long
/// value is kept whole, an empty value stays empty.
pub fn encode_value(value: &Value, field: &Field) -> String {
    let value = match (field.field_type, value) {
        (FieldType::Boolean, Value::Boolean(b)) => return (if *b { "1" } else { "0" }).to_string(),
        (_, v) => v.to_string(),
    };
    let width = field.width;
    match field.field_type {
        _ if value.is_empty() => value,
        FieldType::Integer | FieldType::Real => format!("{value:>width$}"),
        FieldType::Text | FieldType::Boolean => format!("{value:<width$}"),
    }
}

/// Encodes a record into its columns, in the order of `fields`.
///
/// Repeated blocks are flattened after the scalar columns, block after
/// block.
pub fn encode(record: &Record, fields: &[Field]) -> Vec<String> {
    let encode_fields = |values: &Fields| -> Vec<String> {
        fields
            .iter()
            .filter_map(|field| values.get(field.name).map(|v| encode_value(v, field)))
            .collect()
    };
    let mut columns = encode_fields(&record.fields);
    for block in record.blocks() {
        columns.extend(encode_fields(block));
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asc::schema::{STATIONS, STOP_SEQUENCES};
    use pretty_assertions::assert_eq;

    fn station_row() -> Vec<&'static str> {
        vec![
            "  4711", "VPE", "", "", "", "HBF", " 8.4037", "49.0094", "", "", "Hauptbahnhof",
            "", "", "", "", "", "", "", "", "de:08212:90",
        ]
    }

    #[test]
    fn decode_trims_and_types_columns() {
        let record = decode(&station_row(), STATIONS.data, None).unwrap();
        assert_eq!(Some(&Value::Integer(4711)), record.get("ID"));
        assert_eq!(Some(&Value::Real(8.4037)), record.get("Longitude"));
        assert_eq!("Hauptbahnhof", record.text("LongName"));
        assert_eq!(None, record.blocks);
    }

    #[test]
    fn optional_empty_number_is_empty_text() {
        let record = decode(&station_row(), STATIONS.data, None).unwrap();
        assert_eq!(Some(&Value::Text(String::new())), record.get("ParentID"));
        assert_eq!(Ok(None), record.integer("ParentID"));
    }

    #[test]
    fn missing_trailing_columns_are_empty() {
        let record = decode(&station_row()[..2], STATIONS.data, None).unwrap();
        assert!(record.get("InternationalStationID").unwrap().is_empty());
    }

    #[test]
    fn required_empty_column_fails() {
        let mut row = station_row();
        row[1] = "  ";
        assert_eq!(
            Err(AscError::MissingRequiredValue {
                field: "DelivererID".to_string()
            }),
            decode(&row, STATIONS.data, None)
        );
    }

    #[test]
    fn malformed_number_fails() {
        let mut row = station_row();
        row[0] = "12a";
        assert_eq!(
            Err(AscError::TypeCoercionFailure {
                field: "ID".to_string(),
                value: "12a".to_string(),
                expected: "integer",
            }),
            decode(&row, STATIONS.data, None)
        );
    }

    #[test]
    fn boolean_columns() {
        let field = Field {
            name: "Flag",
            field_type: FieldType::Boolean,
            width: 1,
            optional: true,
        };
        assert_eq!(Ok(Value::Boolean(true)), decode_value("1", &field));
        assert_eq!(Ok(Value::Boolean(false)), decode_value("0", &field));
        assert_eq!(Ok(Value::Boolean(false)), decode_value("x", &field));
        assert_eq!(Ok(Value::Boolean(false)), decode_value("", &field));
        let field = Field {
            optional: false,
            ..field
        };
        assert!(decode_value("", &field).is_err());
    }

    #[test]
    fn decode_dimension_blocks() {
        let row = vec![
            "1", "", "4711", "", "", "", "00:00", "00:30", "0", "0", "0", "00:00", "01:00",
            "1", "0", "1",
        ];
        let dimensions = DimensionContext {
            num_dimensions: 2,
            repeat_from: "TravelTime",
        };
        let record = decode(&row, STOP_SEQUENCES.data, Some(&dimensions)).unwrap();
        assert_eq!(6, record.fields.len());
        assert_eq!(None, record.get("TravelTime"));
        let blocks = record.blocks();
        assert_eq!(2, blocks.len());
        for block in blocks {
            assert_eq!(5, block.len());
        }
        assert_eq!("00:30", blocks[0].text("WaitingTime"));
        assert_eq!("01:00", blocks[1].text("WaitingTime"));
        assert!(!blocks[0].flag("NoEntry"));
        assert!(blocks[1].flag("NoEntry"));
        assert!(blocks[1].flag("DemandStop"));
    }

    #[test]
    fn zero_dimensions_yields_no_block() {
        let row = vec!["1", "", "4711", "", "", "", "00:00", "00:30"];
        let dimensions = DimensionContext {
            num_dimensions: 0,
            repeat_from: "TravelTime",
        };
        let record = decode(&row, STOP_SEQUENCES.data, Some(&dimensions)).unwrap();
        assert_eq!(Some(vec![]), record.blocks);
    }

    #[test]
    fn encode_pads_to_declared_width() {
        let record = decode(&station_row(), STATIONS.data, None).unwrap();
        let columns = encode(&record, STATIONS.data);
        assert_eq!(STATIONS.data.len(), columns.len());
        assert_eq!(format!("{:>10}", 4711), columns[0]);
        assert_eq!(format!("{:<10}", "VPE"), columns[1]);
        assert_eq!("", columns[2]);
        assert_eq!(format!("{:<60}", "Hauptbahnhof"), columns[10]);
    }

    #[test]
    fn encode_keeps_over_long_values() {
        let field = Field {
            name: "Code",
            field_type: FieldType::Text,
            width: 3,
            optional: true,
        };
        assert_eq!("ABCDE", encode_value(&Value::from("ABCDE"), &field));
    }

    #[test]
    fn decode_encoded_record() {
        let record = decode(&station_row(), STATIONS.data, None).unwrap();
        let columns = encode(&record, STATIONS.data);
        assert_eq!(record, decode(&columns, STATIONS.data, None).unwrap());
    }

    #[test]
    fn encode_flattens_blocks() {
        let row = vec![
            "1", "", "4711", "", "", "", "00:00", "00:30", "0", "0", "0", "00:00", "01:00",
            "1", "0", "1",
        ];
        let dimensions = DimensionContext {
            num_dimensions: 2,
            repeat_from: "TravelTime",
        };
        let record = decode(&row, STOP_SEQUENCES.data, Some(&dimensions)).unwrap();
        let columns = encode(&record, STOP_SEQUENCES.data);
        assert_eq!(row.len(), columns.len());
        assert_eq!("00:00 ", columns[11]);
        assert_eq!("1", columns[13]);
        assert_eq!(
            record,
            decode(&columns, STOP_SEQUENCES.data, Some(&dimensions)).unwrap()
        );
    }
}
