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

use super::codec::{decode, encode, DimensionContext, Record, Value};
use super::error::AscError;
use super::schema::{self, Schema};
use crate::file_handler::FileHandler;
use crate::Result;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::convert::TryFrom;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Character encoding of the exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Encoding {
    /// UTF-8
    #[serde(rename = "utf-8", alias = "UTF-8")]
    Utf8,
    /// ISO-8859-1, common for exports of older systems
    #[serde(rename = "latin-1", alias = "iso-8859-1", alias = "ISO-8859-1")]
    Latin1,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8
    }
}

impl Encoding {
    fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => Ok(std::str::from_utf8(bytes)
                .context("invalid UTF-8, the export may be latin-1 encoded")?
                .to_string()),
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

/// Returns the first candidate whose values on `candidate_keys` are the
/// values of `probe` on `probe_keys`.
///
/// Both sides are compared as sets of values, so the key names may differ
/// between the two layouts (foreign key joins) but their order does not
/// matter. Candidates are scanned in file order and the first match wins,
/// later matches are never reported.
pub fn find_first_matching<'a, I>(
    candidates: I,
    probe: &Record,
    probe_keys: &[&str],
    candidate_keys: &[&str],
) -> Option<(usize, &'a Record)>
where
    I: IntoIterator<Item = &'a Record>,
{
    let probe_values = project(probe, probe_keys);
    candidates
        .into_iter()
        .enumerate()
        .find(|(_, candidate)| same_values(&probe_values, &project(candidate, candidate_keys)))
}

fn project<'r>(record: &'r Record, keys: &[&str]) -> Vec<&'r Value> {
    record
        .fields
        .iter()
        .filter(|(name, _)| keys.contains(name))
        .map(|(_, value)| value)
        .collect()
}

fn same_values(left: &[&Value], right: &[&Value]) -> bool {
    left.iter().all(|v| right.contains(v)) && right.iter().all(|v| left.contains(v))
}

/// The decoded content of one ASC file.
///
/// Files whose layout has a header section are stored as `headers`, each
/// owning the detail rows following it in `groups` (same index). Other
/// files are a flat list of `records`.
#[derive(Debug, Clone, PartialEq)]
pub struct AscTable {
    schema: &'static Schema,
    headers: Vec<Record>,
    groups: Vec<Vec<Record>>,
    records: Vec<Record>,
}

impl AscTable {
    /// Creates an empty table for a layout.
    pub fn new(schema: &'static Schema) -> Self {
        AscTable {
            schema,
            headers: Vec::new(),
            groups: Vec::new(),
            records: Vec::new(),
        }
    }

    /// The layout of this table.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Header rows, empty for a headerless layout.
    pub fn headers(&self) -> &[Record] {
        &self.headers
    }

    /// Detail rows, grouped by header.
    pub fn groups(&self) -> &[Vec<Record>] {
        &self.groups
    }

    /// Rows of a headerless layout.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Appends a header and its detail rows.
    pub fn push_group(&mut self, header: Record, group: Vec<Record>) {
        self.headers.push(header);
        self.groups.push(group);
    }

    /// Appends a row to a headerless table.
    pub fn push_record(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Decodes the rows of `reader` with the layout `schema`.
    ///
    /// Each header announces, in its incrementor field, how many detail
    /// rows follow it before the next header. With dimensions, the header
    /// also announces how many blocks repeat in these detail rows.
    pub fn read<R: Read>(reader: R, schema: &'static Schema, encoding: Encoding) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'#')
            .quote(b'"')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut table = AscTable::new(schema);
        let mut next_header_row = 0;
        let mut pending_group: Option<Vec<Record>> = None;
        let mut dimensions: Option<DimensionContext> = None;

        for (index, row) in rdr.byte_records().enumerate() {
            let row = row?;
            let columns = row
                .iter()
                .map(|column| encoding.decode(column))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Error reading row {} of {}", index + 1, schema.name))?;
            let mut decode_row = || -> Result<()> {
                let header_fields = match schema.header {
                    Some(header_fields) => header_fields,
                    None => {
                        table.records.push(decode(&columns, schema.data, None)?);
                        return Ok(());
                    }
                };
                if index == next_header_row {
                    if let Some(group) = pending_group.replace(Vec::new()) {
                        table.groups.push(group);
                    }
                    let header = decode(&columns, header_fields, None)?;
                    if let Some(schema_dimensions) = schema.dimensions {
                        dimensions = Some(DimensionContext {
                            num_dimensions: count(&header, schema_dimensions.indicator)?,
                            repeat_from: schema_dimensions.repeat_from,
                        });
                    }
                    let following_rows = match schema.incrementor {
                        Some(incrementor) => count(&header, incrementor)?,
                        None => 0,
                    };
                    next_header_row = index + 1 + following_rows;
                    table.headers.push(header);
                } else {
                    let record = decode(&columns, schema.data, dimensions.as_ref())?;
                    pending_group.get_or_insert_with(Vec::new).push(record);
                }
                Ok(())
            };
            decode_row()
                .with_context(|| format!("Error reading row {} of {}", index + 1, schema.name))?;
        }
        if let Some(group) = pending_group {
            table.groups.push(group);
        }
        debug!(
            layout = schema.name,
            headers = table.headers.len(),
            records = table.records.len(),
            "ASC table decoded"
        );
        Ok(table)
    }

    /// Reads the file `file_name`, whose layout is found with
    /// [`schema::lookup`].
    pub fn read_file<H>(file_handler: &mut H, file_name: &str, encoding: Encoding) -> Result<Self>
    where
        for<'a> &'a mut H: FileHandler,
    {
        match AscTable::read_file_if_exists(file_handler, file_name, encoding)? {
            Some(table) => Ok(table),
            None => bail!("file {:?} not found", file_name),
        }
    }

    /// Same as [`AscTable::read_file`], returning `None` when the file is
    /// absent.
    pub fn read_file_if_exists<H>(
        file_handler: &mut H,
        file_name: &str,
        encoding: Encoding,
    ) -> Result<Option<Self>>
    where
        for<'a> &'a mut H: FileHandler,
    {
        let schema = schema::lookup(file_name)
            .ok_or_else(|| AscError::SchemaNotFound(file_name.to_string()))?;
        let (reader, path) = file_handler.get_file_if_exists(file_name)?;
        match reader {
            None => Ok(None),
            Some(reader) => {
                info!(file_name = %file_name, "Reading");
                let table = AscTable::read(reader, schema, encoding)
                    .with_context(|| format!("Error reading {path:?}"))?;
                Ok(Some(table))
            }
        }
    }

    /// First header matching `probe`, see [`find_first_matching`].
    pub fn find_header(
        &self,
        probe: &Record,
        probe_keys: &[&str],
        header_keys: &[&str],
    ) -> Option<(usize, &Record)> {
        find_first_matching(&self.headers, probe, probe_keys, header_keys)
    }

    /// First record of a headerless table matching `probe`, see
    /// [`find_first_matching`].
    pub fn find_record(
        &self,
        probe: &Record,
        probe_keys: &[&str],
        record_keys: &[&str],
    ) -> Option<&Record> {
        find_first_matching(&self.records, probe, probe_keys, record_keys).map(|(_, r)| r)
    }

    /// Writes the table back in the ASC format, each row padded to the
    /// declared widths and terminated by `#`.
    pub fn write<W: Write>(&self, writer: W, encoding: Encoding) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'#')
            .quote(b'"')
            .has_headers(false)
            .flexible(true)
            .from_writer(writer);
        match self.schema.header {
            Some(header_fields) => {
                for (header, group) in self.headers.iter().zip(&self.groups) {
                    write_row(&mut wtr, encode(header, header_fields), encoding)?;
                    for record in group {
                        write_row(&mut wtr, encode(record, self.schema.data), encoding)?;
                    }
                }
            }
            None => {
                for record in &self.records {
                    write_row(&mut wtr, encode(record, self.schema.data), encoding)?;
                }
            }
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the table into the file at `path`.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P, encoding: Encoding) -> Result<()> {
        let path = path.as_ref();
        info!("Writing {:?}", path);
        let file = std::fs::File::create(path).with_context(|| format!("Error writing {path:?}"))?;
        self.write(file, encoding)
            .with_context(|| format!("Error writing {path:?}"))
    }
}

fn count(header: &Record, field: &str) -> Result<usize, AscError> {
    let value = header.required_integer(field)?;
    usize::try_from(value).map_err(|_| AscError::TypeCoercionFailure {
        field: field.to_string(),
        value: value.to_string(),
        expected: "count",
    })
}

fn write_row<W: Write>(
    wtr: &mut csv::Writer<W>,
    columns: Vec<String>,
    encoding: Encoding,
) -> Result<()> {
    let mut row: Vec<Vec<u8>> = columns.iter().map(|c| encoding.encode(c)).collect();
    // empty last column, so that rows end with the delimiter
    row.push(Vec::new());
    wtr.write_record(&row)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asc::schema::{STATIONS, STOP_SEQUENCES, TRIPS};
    use pretty_assertions::assert_eq;

    const STOP_SEQUENCES_ASC: &str = "\
42#1#1#VPE#1#1#3#2#BUS##
1##100####00:00#00:00#0#0#0#00:00#00:00#0#0#0#
2##101####02:00#00:30#0#0#0#03:00#00:30#0#0#1#
3##102####01:00#00:00#0#0#0#01:30#00:00#1#0#0#
42#1#1#VPE#2#2#2#1#BUS##
1##102####00:00#00:00#0#0#0#
2##100####04:00#00:00#0#0#0#
";

    const STATIONS_ASC: &str = "\
100#VPE#########Marktplatz#########de:1#
101#VPE#100#VPE#######Marktplatz Steig 1#########de:1:1#
102#VPE#100#VPE#######Marktplatz Steig 2#########de:1:2#
103#KVV#########Marktplatz#########de:2#
";

    fn stop_sequences() -> AscTable {
        AscTable::read(STOP_SEQUENCES_ASC.as_bytes(), &STOP_SEQUENCES, Encoding::Utf8).unwrap()
    }

    fn stations() -> AscTable {
        AscTable::read(STATIONS_ASC.as_bytes(), &STATIONS, Encoding::Utf8).unwrap()
    }

    #[test]
    fn read_flat_table() {
        let table = stations();
        assert_eq!(4, table.records().len());
        assert!(table.headers().is_empty());
        assert_eq!("Marktplatz Steig 2", table.records()[2].text("LongName"));
    }

    #[test]
    fn groups_follow_incrementor() {
        let table = stop_sequences();
        assert_eq!(2, table.headers().len());
        assert_eq!(table.headers().len(), table.groups().len());
        for (header, group) in table.headers().iter().zip(table.groups()) {
            assert_eq!(
                header.required_integer("NumStops").unwrap() as usize,
                group.len()
            );
        }
    }

    #[test]
    fn detail_rows_carry_header_dimensions() {
        let table = stop_sequences();
        for (header, group) in table.headers().iter().zip(table.groups()) {
            let expected = header.required_integer("NumTimeDemandTypes").unwrap() as usize;
            for record in group {
                assert_eq!(expected, record.blocks().len());
            }
        }
        let second = &table.groups()[0][1];
        assert_eq!("03:00", second.blocks()[1].text("TravelTime"));
        assert!(second.blocks()[1].flag("DemandStop"));
    }

    #[test]
    fn header_without_detail_rows() {
        let asc = "42#1#VPE#1#1#0#\n42#1#VPE#2#1#1#\n1#100#06:00:00#2#101##BUS#1##12345#0#00:00##4711##de:trip##\n";
        let table = AscTable::read(asc.as_bytes(), &TRIPS, Encoding::Utf8).unwrap();
        assert_eq!(2, table.headers().len());
        assert_eq!(0, table.groups()[0].len());
        assert_eq!(1, table.groups()[1].len());
        assert_eq!("de:trip", table.groups()[1][0].text("InternationalTripID"));
    }

    #[test]
    fn decode_error_aborts_read() {
        let asc = "abc#VPE#\n";
        assert!(AscTable::read(asc.as_bytes(), &STATIONS, Encoding::Utf8).is_err());
    }

    #[test]
    fn latin1_encoding() {
        let asc = b"100#VPE#########Stra\xdfe#########de:1#\n";
        let table = AscTable::read(&asc[..], &STATIONS, Encoding::Latin1).unwrap();
        assert_eq!("Straße", table.records()[0].text("LongName"));
        assert!(AscTable::read(&asc[..], &STATIONS, Encoding::Utf8).is_err());
    }

    #[test]
    fn find_record_across_key_names() {
        let table = stations();
        let child = &table.records()[1];
        let parent = table
            .find_record(child, &["ParentID", "ParentDelivererID"], &["ID", "DelivererID"])
            .unwrap();
        assert_eq!("de:1", parent.text("InternationalStationID"));
    }

    #[test]
    fn find_record_first_match_wins() {
        let table = stations();
        let probe = Record::from_fields(vec![("LongName", "Marktplatz")]);
        let found = table.find_record(&probe, &["LongName"], &["LongName"]).unwrap();
        assert_eq!("de:1", found.text("InternationalStationID"));
    }

    #[test]
    fn find_record_not_found() {
        let table = stations();
        let probe = Record::from_fields(vec![("ID", 999_i64)]);
        assert_eq!(None, table.find_record(&probe, &["ID"], &["ID"]));
    }

    #[test]
    fn find_header_by_composite_key() {
        let table = stop_sequences();
        let probe = Record::from_fields(vec![
            ("LineNumber", Value::from("42")),
            ("LineVersionNumber", Value::from(1_i64)),
            ("OperatorOrganisationID", Value::from("VPE")),
            ("DirectionID", Value::from("2")),
            ("SubLineNumber", Value::from(2_i64)),
            ("NumTrips", Value::from(12_i64)),
        ]);
        let keys = STOP_SEQUENCES.primary.header;
        let (index, header) = table.find_header(&probe, keys, keys).unwrap();
        assert_eq!(1, index);
        assert_eq!(Some(2), header.integer("NumStops").unwrap());
    }

    #[test]
    fn write_pads_and_terminates_rows() {
        let table = stations();
        let mut output = Vec::new();
        table.write(&mut output, Encoding::Utf8).unwrap();
        let output = String::from_utf8(output).unwrap();
        let first_line = output.lines().next().unwrap();
        assert!(first_line.starts_with("       100#VPE       #"));
        assert!(first_line.ends_with("#"));
        assert_eq!(4, output.lines().count());
    }

    #[test]
    fn written_table_reads_back() {
        let table = stop_sequences();
        let mut output = Vec::new();
        table.write(&mut output, Encoding::Utf8).unwrap();
        let read_back = AscTable::read(&output[..], &STOP_SEQUENCES, Encoding::Utf8).unwrap();
        assert_eq!(table, read_back);
    }
}
