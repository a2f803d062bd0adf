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

use super::TimetableAssembler;
use crate::asc::AscTable;
use crate::calendars::{active_dates, DayVector, ValidityPeriod};
use crate::gtfs::{CalendarDate, ExceptionType};
use crate::objects::parse_date;
use crate::Result;
use anyhow::{bail, Context};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{info, warn};

/// Validity period of the base version, the one without bitfield.
pub(super) fn validity_period(versions: &AscTable) -> Result<ValidityPeriod> {
    let mut base_versions = versions
        .records()
        .iter()
        .filter(|version| version.get("BitfieldID").map_or(true, |id| id.is_empty()));
    let base_version = match base_versions.next() {
        Some(version) => version,
        None => bail!("no base version (without bitfield) found in VERSIONE.ASC"),
    };
    if base_versions.next().is_some() {
        warn!(
            "several base versions found in VERSIONE.ASC, using version {}",
            base_version.text("ID")
        );
    }
    let period = ValidityPeriod {
        start_date: parse_date(&base_version.text("StartDate"))?,
        end_date: parse_date(&base_version.text("EndDate"))?,
    };
    info!(
        "version {} starts at {} and ends at {}",
        base_version.text("ID"),
        period.start_date,
        period.end_date
    );
    Ok(period)
}

/// Day vectors of the bitfields by `ID`, aligned on the validity period.
pub(super) fn decode_bitfields(
    bitfields: &AscTable,
    period: &ValidityPeriod,
) -> Result<HashMap<i64, DayVector>> {
    info!("Decoding {} bitfields", bitfields.records().len());
    let mut days_by_id = HashMap::new();
    for bitfield in bitfields.records() {
        let id = bitfield.required_integer("ID")?;
        let days = period
            .decode_bitfield(&bitfield.text("Bitfield"))
            .with_context(|| format!("bitfield {id}"))?;
        match days_by_id.entry(id) {
            Entry::Occupied(_) => warn!("bitfield {id} defined several times, first one kept"),
            Entry::Vacant(entry) => {
                entry.insert(days);
            }
        }
    }
    Ok(days_by_id)
}

impl<'c> TimetableAssembler<'c> {
    /// GTFS `service_id` of a day pattern, `None` if no day is active.
    pub(super) fn register_service(&mut self, days: DayVector) -> Result<Option<String>> {
        let index = match self.services.register(days) {
            Some(index) => index,
            None => return Ok(None),
        };
        if index == self.service_ids.len() {
            let service_index = index.to_string();
            let service_id = self
                .config
                .service_id_template
                .render(|name| (name == "service_index").then(|| service_index.clone()))?;
            self.service_ids.push(service_id);
        }
        Ok(self.service_ids.get(index).cloned())
    }

    /// One calendar date for each active day of each service.
    pub(super) fn build_calendar_dates(&mut self, period: &ValidityPeriod) {
        info!("Expanding {} services", self.services.len());
        for (index, days) in self.services.services() {
            let service_id = &self.service_ids[index];
            self.feed
                .calendar_dates
                .extend(active_dates(period, days).map(|date| CalendarDate {
                    service_id: service_id.clone(),
                    date,
                    exception_type: ExceptionType::Add,
                }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::table;
    use super::*;
    use crate::asc::schema;
    use crate::configuration::Configuration;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn period() -> ValidityPeriod {
        ValidityPeriod {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
        }
    }

    #[test]
    fn base_version_defines_the_period() {
        let versions = table(
            &schema::VERSIONS,
            "2#Sommer#01.06.2025#01.09.2025#7#\n1#Jahresfahrplan#06.01.2025#13.01.2025##\n",
        );
        assert_eq!(period(), validity_period(&versions).unwrap());
        let versions = table(&schema::VERSIONS, "2#Sommer#01.06.2025#01.09.2025#7#\n");
        assert!(validity_period(&versions).is_err());
    }

    #[test]
    fn bitfields_by_id() {
        let bitfields = table(&schema::BITFIELDS, "1#FE#\n2#0A00#\n1#00#\n");
        let days = decode_bitfields(&bitfields, &period()).unwrap();
        assert_eq!(2, days.len());
        assert_eq!(
            &vec![true, true, true, true, true, true, true],
            days.get(&1).unwrap()
        );
        assert_eq!(
            &vec![false, false, false, false, true, false, true],
            days.get(&2).unwrap()
        );
        let bitfields = table(&schema::BITFIELDS, "3#XY#\n");
        assert!(decode_bitfields(&bitfields, &period()).is_err());
    }

    #[test]
    fn services_and_calendar_dates() {
        let config: Configuration =
            serde_json::from_str(r#"{"service_id_template": "service-{service_index}"}"#).unwrap();
        let mut assembler = TimetableAssembler::new(&config);
        let weekend = vec![false, false, false, false, false, true, true];
        let monday = vec![true, false, false, false, false, false, false];
        assert_eq!(
            Some("service-0".to_string()),
            assembler.register_service(weekend.clone()).unwrap()
        );
        assert_eq!(
            Some("service-1".to_string()),
            assembler.register_service(monday).unwrap()
        );
        assert_eq!(
            Some("service-0".to_string()),
            assembler.register_service(weekend).unwrap()
        );
        assert_eq!(None, assembler.register_service(vec![false; 7]).unwrap());

        assembler.build_calendar_dates(&period());
        let dates: Vec<_> = assembler
            .feed
            .calendar_dates
            .iter()
            .map(|calendar_date| (calendar_date.service_id.as_str(), calendar_date.date.to_string()))
            .collect();
        assert_eq!(
            vec![
                ("service-0", "2025-01-11".to_string()),
                ("service-0", "2025-01-12".to_string()),
                ("service-1", "2025-01-06".to_string()),
            ],
            dates
        );
    }
}
