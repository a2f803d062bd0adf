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

use thiserror::Error;

/// Typed failures raised while decoding ASC files and assembling a
/// timetable from them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AscError {
    /// No layout is known for this file name
    #[error("no ASC layout known for file '{0}'")]
    SchemaNotFound(String),
    /// A mandatory column was empty
    #[error("column '{field}' must not be empty")]
    MissingRequiredValue {
        /// Name of the column
        field: String,
    },
    /// A column could not be read as the declared type
    #[error("column '{field}' has value '{value}' which is not a valid {expected}")]
    TypeCoercionFailure {
        /// Name of the column
        field: String,
        /// Raw (trimmed) text of the column
        value: String,
        /// Human readable name of the expected type
        expected: &'static str,
    },
    /// A join between two tables found no counterpart
    #[error("no {target} found for {probe}")]
    LookupNotFound {
        /// What was looked for
        target: String,
        /// Description of the searched key
        probe: String,
    },
    /// Two day vectors of different lengths were combined
    #[error("cannot combine day vectors of length {left} and {right}")]
    LengthMismatch {
        /// Length of the left operand
        left: usize,
        /// Length of the right operand
        right: usize,
    },
    /// A source value has no GTFS counterpart
    #[error("{kind} '{value}' has no GTFS equivalent")]
    UnmappedEnumValue {
        /// The kind of enumeration
        kind: &'static str,
        /// The source value
        value: String,
    },
    /// A detail row has fewer repeated blocks than requested
    #[error("time demand type {requested} requested but only {available} available")]
    MissingDimension {
        /// The 1-based block number that was requested
        requested: i64,
        /// How many blocks the row carries
        available: usize,
    },
    /// A clock time or a duration could not be parsed or computed
    #[error("'{0}' is not a valid time")]
    InvalidTime(String),
}
