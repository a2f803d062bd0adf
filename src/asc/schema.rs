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

//! Column layouts of the files of an INIT 5.1 ASC export.
//!
//! The tables below are pure data: the order of the fields is the order of
//! the columns, both for reading and writing. [`lookup`] maps a file name
//! onto its layout.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::Path;

/// Scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text
    Text,
    /// Signed integer
    Integer,
    /// Floating point number
    Real,
    /// `1` for true, anything else for false
    Boolean,
}

/// Description of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Name of the column, used as key in decoded records
    pub name: &'static str,
    /// Type the column is decoded into
    pub field_type: FieldType,
    /// Declared width, used for padding on write
    pub width: usize,
    /// Whether the column may be empty
    pub optional: bool,
}

const fn text(name: &'static str, width: usize, optional: bool) -> Field {
    Field {
        name,
        field_type: FieldType::Text,
        width,
        optional,
    }
}

const fn integer(name: &'static str, width: usize, optional: bool) -> Field {
    Field {
        name,
        field_type: FieldType::Integer,
        width,
        optional,
    }
}

const fn real(name: &'static str, width: usize, optional: bool) -> Field {
    Field {
        name,
        field_type: FieldType::Real,
        width,
        optional,
    }
}

const fn boolean(name: &'static str, width: usize, optional: bool) -> Field {
    Field {
        name,
        field_type: FieldType::Boolean,
        width,
        optional,
    }
}

/// Block of columns repeated once per variant within a detail row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Header field giving the number of repetitions
    pub indicator: &'static str,
    /// First data field of the repeated block
    pub repeat_from: &'static str,
}

/// Named key subsets, usable as comparison keys in lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryKeys {
    /// Key of header rows
    pub header: &'static [&'static str],
    /// Key of data rows
    pub data: &'static [&'static str],
}

/// Layout of one ASC file.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    /// Stem of the file (or of the family of files) using this layout
    pub name: &'static str,
    /// Fields of header rows, if the file is made of header/detail groups
    pub header: Option<&'static [Field]>,
    /// Fields of data rows
    pub data: &'static [Field],
    /// Comparison keys
    pub primary: PrimaryKeys,
    /// Header field counting the detail rows following each header
    pub incrementor: Option<&'static str>,
    /// Repeated block within detail rows
    pub dimensions: Option<Dimensions>,
}

impl Schema {
    /// Position of a data field, if the layout declares it.
    pub fn data_index(&self, name: &str) -> Option<usize> {
        self.data.iter().position(|f| f.name == name)
    }

    /// Declaration of a data field.
    pub fn data_field(&self, name: &str) -> Option<&'static Field> {
        self.data.iter().find(|f| f.name == name)
    }
}

/// `VERSIONE`: validity periods of the export.
pub static VERSIONS: Schema = Schema {
    name: "VERSIONE",
    header: None,
    data: &[
        integer("ID", 10, false),
        text("Name", 60, false),
        text("StartDate", 10, false),
        text("EndDate", 10, false),
        integer("BitfieldID", 10, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID"],
    },
    incrementor: None,
    dimensions: None,
};

/// `BITFELD`: hex encoded day patterns.
pub static BITFIELDS: Schema = Schema {
    name: "BITFELD",
    header: None,
    data: &[integer("ID", 10, false), text("Bitfield", 255, false)],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID"],
    },
    incrementor: None,
    dimensions: None,
};

/// `HALTESTE`: stations and their stop points.
pub static STATIONS: Schema = Schema {
    name: "HALTESTE",
    header: None,
    data: &[
        integer("ID", 10, false),
        text("DelivererID", 10, false),
        integer("ParentID", 10, true),
        text("ParentDelivererID", 10, true),
        text("StationType", 2, true),
        text("Code", 8, true),
        real("Longitude", 10, true),
        real("Latitude", 10, true),
        text("MunicipalCode", 11, true),
        text("WheelchairAccessible", 1, true),
        text("LongName", 60, true),
        text("HeadsignText", 60, true),
        text("TimetableInformationName", 60, true),
        text("PrintingName", 60, true),
        integer("KilometerInfo", 6, true),
        integer("InterchangePriority", 2, true),
        text("ExportFlag", 2, true),
        integer("ItcsNumber", 10, true),
        text("LocationType", 1, true),
        text("InternationalStationID", 60, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID", "DelivererID"],
    },
    incrementor: None,
    dimensions: None,
};

/// `TARIF`: fare zone of each station.
pub static FARES: Schema = Schema {
    name: "TARIF",
    header: None,
    data: &[
        integer("StationID", 10, false),
        text("DelivererID", 10, false),
        text("Area", 10, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["StationID", "DelivererID", "Area"],
    },
    incrementor: None,
    dimensions: None,
};

/// `BETRIEBE`: operators.
pub static OPERATORS: Schema = Schema {
    name: "BETRIEBE",
    header: None,
    data: &[
        integer("ID", 10, false),
        integer("OperatorNumber", 10, true),
        text("Code", 8, false),
        text("Name", 60, false),
        text("AdditionalName", 255, true),
        integer("AddressID", 10, true),
        text("ShortName", 3, true),
        text("Logo", 255, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID"],
    },
    incrementor: None,
    dimensions: None,
};

/// `BETRIEBSTEILE`: operator organisations, the owners of lines.
pub static OPERATOR_ORGANISATIONS: Schema = Schema {
    name: "BETRIEBSTEILE",
    header: None,
    data: &[
        text("Code", 8, false),
        text("Name", 60, false),
        text("ID", 6, false),
        text("VehicleTypeGroup", 32, false),
        text("DelivererID", 10, false),
        integer("OperatorID", 10, true),
        integer("AddressID", 10, true),
        integer("OrganisationNumber", 8, false),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID"],
    },
    incrementor: None,
    dimensions: None,
};

/// `LINIEN`: lines, one row per line version.
pub static LINES: Schema = Schema {
    name: "LINIEN",
    header: None,
    data: &[
        text("OperatorOrganisationID", 6, false),
        text("LineNumber", 32, false),
        text("Name", 32, true),
        text("Type", 3, true),
        text("VehicleTypeGroup", 32, true),
        text("InternationalLineID", 50, true),
        boolean("PseudoFlag", 1, true),
        boolean("ExportNameFlag", 1, true),
        text("TextColor", 6, true),
        text("BackgroundColor", 6, true),
        text("HafasLogo", 255, true),
        text("Comment", 255, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["OperatorOrganisationID", "LineNumber"],
    },
    incrementor: None,
    dimensions: None,
};

/// `LVATTRIB`: attributes of line versions.
pub static LINE_VERSION_ATTRIBUTES: Schema = Schema {
    name: "LVATTRIB",
    header: None,
    data: &[
        text("OperatorOrganisationID", 6, false),
        text("LineNumber", 8, false),
        integer("LineVersionNumber", 10, false),
        text("AttributeID", 10, false),
        text("Value", 511, true),
        integer("BitfieldID", 10, true),
        text("CalendarID", 4, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &[],
    },
    incrementor: None,
    dimensions: None,
};

/// `LDxxxxxx`: stop sequences of one line, one block of running and
/// waiting times per time demand type.
pub static STOP_SEQUENCES: Schema = Schema {
    name: "LD",
    header: Some(&[
        text("LineNumber", 32, false),
        integer("LineVersionNumber", 10, false),
        integer("LineVersionPriority", 3, false),
        text("OperatorOrganisationID", 6, false),
        integer("SubLineNumber", 8, false),
        text("DirectionID", 2, false),
        integer("NumStops", 3, false),
        integer("NumTimeDemandTypes", 3, false),
        text("VehicleTypeID", 10, false),
        integer("BitfieldID", 10, true),
    ]),
    data: &[
        integer("ConsecutiveNumber", 4, false),
        text("StopCode", 8, true),
        integer("StopID", 10, false),
        integer("Kilometers", 7, true),
        integer("PositionSequenceArrivalTime", 4, true),
        integer("PositionSequenceDepartureTime", 4, true),
        text("TravelTime", 6, false),
        text("WaitingTime", 6, false),
        boolean("NoEntry", 1, true),
        boolean("NoExit", 1, true),
        boolean("DemandStop", 1, true),
    ],
    primary: PrimaryKeys {
        header: &[
            "LineNumber",
            "LineVersionNumber",
            "OperatorOrganisationID",
            "SubLineNumber",
            "DirectionID",
        ],
        data: &["ConsecutiveNumber"],
    },
    incrementor: Some("NumStops"),
    dimensions: Some(Dimensions {
        indicator: "NumTimeDemandTypes",
        repeat_from: "TravelTime",
    }),
};

/// `LFxxxxxx`: display settings of the line course.
pub static LINE_COURSES: Schema = Schema {
    name: "LF",
    header: Some(&[
        text("OperatorOrganisationID", 6, false),
        text("LineNumber", 32, false),
        text("DirectionID", 2, false),
        integer("LineVersionNumber", 10, false),
        integer("NumStops", 3, false),
    ]),
    data: &[
        integer("StopID", 10, false),
        integer("ConsecutiveNumber", 4, false),
        boolean("DisplayBoldFlag", 1, true),
        boolean("DisplayCursiveFlag", 1, true),
        boolean("DisplayPostedTimetableFlag", 1, true),
        boolean("DisplayGuidlineFlag", 1, true),
        boolean("DisplayTimetableFlag", 1, true),
        boolean("DisplayArrivalFlag", 1, true),
        boolean("DisplayDepartureFlag", 1, true),
        text("DisplayStopName", 60, true),
    ],
    primary: PrimaryKeys {
        header: &[
            "OperatorOrganisationID",
            "LineNumber",
            "DirectionID",
            "LineVersionNumber",
        ],
        data: &["ConsecutiveNumber"],
    },
    incrementor: Some("NumStops"),
    dimensions: None,
};

/// `FAHRTATT`: attributes of trips.
pub static TRIP_ATTRIBUTES: Schema = Schema {
    name: "FAHRTATT",
    header: None,
    data: &[
        text("OperatorOrganisationID", 6, false),
        text("LineNumber", 8, false),
        text("DirectionID", 2, false),
        integer("VersionNumber", 10, false),
        text("InternalTripNumber", 10, true),
        integer("PositionSequenceFrom", 4, true),
        integer("PositionSequenceTo", 4, true),
        text("AttributeID", 10, false),
        text("Value", 511, true),
        integer("BitfieldID", 10, true),
        text("CalendarCode", 4, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &[],
    },
    incrementor: None,
    dimensions: None,
};

/// `FDxxxxxx`: trips of one line, grouped by sub-line.
pub static TRIPS: Schema = Schema {
    name: "FD",
    header: Some(&[
        text("LineNumber", 8, false),
        integer("LineVersionNumber", 10, false),
        text("OperatorOrganisationID", 6, false),
        text("DirectionID", 2, false),
        integer("SubLineNumber", 8, false),
        integer("NumTrips", 10, false),
    ]),
    data: &[
        integer("PositionSequenceStartStop", 4, false),
        integer("StartStopID", 10, false),
        text("StartTime", 8, false),
        integer("PositionSequenceDestinationStop", 4, false),
        integer("DestinationStopID", 10, false),
        text("ArrivalTime", 6, true),
        text("VehicleTypeID", 10, true),
        integer("TimeDemandType", 3, false),
        text("ExternalTripNumber", 10, true),
        text("CalendarDayTypesTimetable", 7, true),
        integer("NumFollowingTrips", 5, false),
        text("TimeSpanFollowingTrips", 7, false),
        integer("BitfieldID", 10, true),
        text("ID", 10, true),
        text("Type", 3, true),
        text("InternationalTripID", 255, true),
        text("CalendarCode", 4, true),
    ],
    primary: PrimaryKeys {
        header: &[
            "LineNumber",
            "LineVersionNumber",
            "OperatorOrganisationID",
            "DirectionID",
            "SubLineNumber",
        ],
        data: &[],
    },
    incrementor: Some("NumTrips"),
    dimensions: None,
};

/// `FPLTAB`: timetable book entries.
pub static TIMETABLE: Schema = Schema {
    name: "FPLTAB",
    header: None,
    data: &[
        integer("ID", 10, false),
        text("DelivererID", 10, false),
        integer("VersionNumber", 10, false),
        text("LineNumberText", 32, false),
        text("LineCourseText", 1000, false),
        text("LineDirectionCode", 1, false),
        text("OperatorOrganisationID", 6, false),
        text("LineNumber", 10, false),
        text("DirectionID", 2, false),
        integer("LineVersionNumber", 10, false),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID", "LineDirectionCode"],
    },
    incrementor: None,
    dimensions: None,
};

/// `VERKEHRM`: vehicle types.
pub static VEHICLE_TYPES: Schema = Schema {
    name: "VERKEHRM",
    header: None,
    data: &[
        text("ID", 10, false),
        text("VehicleTypeGroup", 32, true),
        text("VehicleTypeName", 50, true),
    ],
    primary: PrimaryKeys {
        header: &[],
        data: &["ID"],
    },
    incrementor: None,
    dimensions: None,
};

lazy_static! {
    static ref SCHEMAS_BY_STEM: HashMap<&'static str, &'static Schema> = [
        &VERSIONS,
        &BITFIELDS,
        &STATIONS,
        &FARES,
        &OPERATORS,
        &OPERATOR_ORGANISATIONS,
        &LINES,
        &LINE_VERSION_ATTRIBUTES,
        &TRIP_ATTRIBUTES,
        &TIMETABLE,
        &VEHICLE_TYPES,
    ]
    .iter()
    .map(|schema| (schema.name, *schema))
    .collect();
}

// Families of per-line files, the stem being followed by the line number.
static PREFIXED_SCHEMAS: [&Schema; 3] = [&STOP_SEQUENCES, &LINE_COURSES, &TRIPS];

/// Finds the layout of a file from its name.
///
/// The directory and the extension are ignored, the comparison is not case
/// sensitive. `LDxxxxxx`, `LFxxxxxx` and `FDxxxxxx` files share one layout
/// per family whatever the line number. Returns `None` for unknown files,
/// letting the caller decide whether this is fatal.
pub fn lookup(file_name: &str) -> Option<&'static Schema> {
    let base_name = Path::new(file_name).file_name()?.to_str()?;
    let stem = base_name
        .split('.')
        .next()
        .unwrap_or(base_name)
        .to_ascii_uppercase();
    SCHEMAS_BY_STEM.get(stem.as_str()).copied().or_else(|| {
        PREFIXED_SCHEMAS
            .iter()
            .find(|schema| stem.starts_with(schema.name))
            .copied()
    })
}
