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
//! Day based service calendars.
//!
//! Bitfields are hex strings where each bit is one day of the validity
//! period of the export, the most significant bit of the first byte being
//! its first day.

use crate::asc::AscError;
use crate::objects::Date;
use std::collections::HashMap;
use std::convert::TryFrom;
use tracing::debug;

/// Days of service, one entry per day of the validity period.
pub type DayVector = Vec<bool>;

/// Decodes a hex bitfield, most significant bit first, byte by byte.
pub fn hex_to_day_vector(hex: &str) -> Result<DayVector, AscError> {
    let hex = hex.trim();
    let invalid = || AscError::TypeCoercionFailure {
        field: "Bitfield".to_string(),
        value: hex.to_string(),
        expected: "hexadecimal bytes",
    };
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(invalid());
    }
    let mut days = Vec::with_capacity(hex.len() * 4);
    for index in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[index..index + 2], 16).map_err(|_| invalid())?;
        days.extend((0..8).rev().map(|bit| byte & (1 << bit) != 0));
    }
    Ok(days)
}

/// Days active in both vectors.
pub fn intersect(a: &[bool], b: &[bool]) -> Result<DayVector, AscError> {
    if a.len() != b.len() {
        return Err(AscError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(a, b)| *a && *b).collect())
}

/// The validity period of the export, end date excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityPeriod {
    /// First day
    pub start_date: Date,
    /// Day following the last one
    pub end_date: Date,
}

impl ValidityPeriod {
    /// Number of days of the period.
    pub fn num_days(&self) -> usize {
        let days = (self.end_date - self.start_date).num_days();
        if days > 0 {
            days as usize
        } else {
            0
        }
    }

    /// Date of a day offset.
    pub fn date(&self, offset: usize) -> Option<Date> {
        let offset = u64::try_from(offset).ok()?;
        self.start_date
            .checked_add_days(chrono::Days::new(offset))
    }

    /// A vector with every day of the period active.
    pub fn all_days(&self) -> DayVector {
        vec![true; self.num_days()]
    }

    /// Aligns a decoded bitfield on the period.
    ///
    /// Bitfields are padded to whole bytes, the bits past the period are
    /// dropped, missing days are inactive.
    pub fn fit(&self, mut days: DayVector) -> DayVector {
        days.resize(self.num_days(), false);
        days
    }

    /// Decodes a bitfield and aligns it on the period.
    pub fn decode_bitfield(&self, hex: &str) -> Result<DayVector, AscError> {
        hex_to_day_vector(hex).map(|days| self.fit(days))
    }
}

/// Distinct day patterns, the position of a pattern being its service
/// index.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<DayVector>,
    index: HashMap<DayVector, usize>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ServiceRegistry::default()
    }

    /// Index of the pattern, registering it if never seen.
    ///
    /// Returns `None` for a pattern without any active day, which must
    /// never become a service.
    pub fn register(&mut self, days: DayVector) -> Option<usize> {
        if !days.iter().any(|active| *active) {
            return None;
        }
        if let Some(index) = self.index.get(&days) {
            return Some(*index);
        }
        let index = self.services.len();
        debug!(service_index = index, "New service");
        self.index.insert(days.clone(), index);
        self.services.push(days);
        Some(index)
    }

    /// Number of distinct services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True if no service has been registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Registered patterns with their index, in registration order.
    pub fn services(&self) -> impl Iterator<Item = (usize, &DayVector)> {
        self.services.iter().enumerate()
    }
}

/// Active days of a pattern as dates of the period.
pub fn active_dates<'a>(
    period: &'a ValidityPeriod,
    days: &'a [bool],
) -> impl Iterator<Item = Date> + 'a {
    days.iter()
        .enumerate()
        .filter(|(_, active)| **active)
        .filter_map(move |(offset, _)| period.date(offset))
}
