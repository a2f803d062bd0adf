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
//! Scalar types shared by the ASC and GTFS sides.

use crate::asc::AscError;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar date.
pub type Date = NaiveDate;

/// Parses an ASC date (`DD.MM.YYYY`).
pub fn parse_date(s: &str) -> Result<Date, AscError> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").map_err(|_| AscError::TypeCoercionFailure {
        field: "date".to_string(),
        value: s.to_string(),
        expected: "date (DD.MM.YYYY)",
    })
}

/// A time of day, as a number of seconds since midnight of the service
/// day.
///
/// Trips running after midnight keep counting: the hours are not wrapped,
/// `24:10:00` being ten minutes past midnight of the next day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Time(u32);

impl Time {
    /// Builds a time from its components.
    pub fn new(h: u32, m: u32, s: u32) -> Time {
        Time(h * 60 * 60 + m * 60 + s)
    }
    /// Total number of seconds.
    pub fn total_seconds(self) -> u32 {
        self.0
    }
    /// Hours, possibly 24 or more.
    pub fn hours(self) -> u32 {
        self.0 / 60 / 60
    }
    /// Minutes within the hour.
    pub fn minutes(self) -> u32 {
        self.0 / 60 % 60
    }
    /// Seconds within the minute.
    pub fn seconds(self) -> u32 {
        self.0 % 60
    }

    /// Parses a duration given as `MM:SS` (minutes are not bounded) or
    /// `HH:MM:SS`.
    pub fn from_duration(s: &str) -> Result<Time, AscError> {
        let invalid = || AscError::InvalidTime(s.to_string());
        let parts = split_components(s).ok_or_else(invalid)?;
        match parts.as_slice() {
            [m, s] if *s < 60 => from_components(0, *m, *s),
            [h, m, s] if *m < 60 && *s < 60 => from_components(*h, *m, *s),
            _ => None,
        }
        .ok_or_else(invalid)
    }

    /// Sum of two times, `None` on overflow.
    pub fn checked_add(self, other: Time) -> Option<Time> {
        self.0.checked_add(other.0).map(Time)
    }

    /// The time multiplied by `factor`, `None` on overflow.
    pub fn checked_mul(self, factor: u32) -> Option<Time> {
        self.0.checked_mul(factor).map(Time)
    }
}

fn from_components(h: u32, m: u32, s: u32) -> Option<Time> {
    h.checked_mul(60 * 60)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)
        .map(Time)
}

fn split_components(s: &str) -> Option<Vec<u32>> {
    s.trim()
        .split(|c| c == ':' || c == '.')
        .map(|part| part.trim().parse().ok())
        .collect()
}

impl FromStr for Time {
    type Err = AscError;
    /// Parses `HH:MM:SS` or `HH:MM`, `.` being accepted as separator.
    fn from_str(time: &str) -> Result<Self, Self::Err> {
        let invalid = || AscError::InvalidTime(time.to_string());
        let parts = split_components(time).ok_or_else(invalid)?;
        match parts.as_slice() {
            [h, m] if *m < 60 => from_components(*h, *m, 0),
            [h, m, s] if *m < 60 && *s < 60 => from_components(*h, *m, *s),
            _ => None,
        }
        .ok_or_else(invalid)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
