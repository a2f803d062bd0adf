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

use super::{is_skippable, non_empty, TimetableAssembler};
use crate::asc::{schema, AscError, AscTable, Fields, Record};
use crate::calendars::{intersect, DayVector, ValidityPeriod};
use crate::file_handler::FileHandler;
use crate::gtfs::{DirectionType, PickupDropOffType, StopTime, Trip};
use crate::objects::Time;
use crate::Result;
use anyhow::{anyhow, Context};
use skip_error::skip_error_and_warn;
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use tracing::{debug, info, warn};

/// Everything the trips of one sub-line share.
struct SubLine<'a> {
    header: &'a Record,
    route_id: &'a str,
    stop_sequence: &'a [Record],
    line_version_days: &'a [bool],
    direction: Option<DirectionType>,
    headsign: String,
}

/// A stop time relative to the start of its trip.
struct StopTimeOffset {
    arrival: Time,
    departure: Time,
    stop_id: String,
    stop_sequence: u32,
    pickup_type: PickupDropOffType,
    drop_off_type: PickupDropOffType,
}

fn pickup_drop_off(forbidden: bool, on_demand: bool) -> PickupDropOffType {
    if forbidden {
        PickupDropOffType::NotAvailable
    } else if on_demand {
        PickupDropOffType::CoordinateWithDriver
    } else {
        PickupDropOffType::Regular
    }
}

/// Display name of the station owning the stop point `stop_id`.
fn station_name(stations: &AscTable, stop_id: i64) -> Option<String> {
    let stop_point = stations.find_record(&Record::from_fields(vec![("ID", stop_id)]), &["ID"], &["ID"])?;
    stations
        .find_record(stop_point, &["ParentID", "ParentDelivererID"], &["ID", "DelivererID"])
        .map(|station| station.text("LongName"))
}

fn add_time(time: Time, duration: Time) -> Result<Time, AscError> {
    time.checked_add(duration)
        .ok_or_else(|| AscError::InvalidTime(format!("{time} + {duration}")))
}

/// The block of running and waiting times of a time demand type (1-based).
fn time_demand_block(row: &Record, time_demand_type: i64) -> Result<&Fields, AscError> {
    let missing = || AscError::MissingDimension {
        requested: time_demand_type,
        available: row.blocks().len(),
    };
    let index = usize::try_from(time_demand_type - 1).map_err(|_| missing())?;
    row.blocks().get(index).ok_or_else(missing)
}

impl<'c> TimetableAssembler<'c> {
    /// Walks the stop sequence with the running and waiting times of the
    /// trip's time demand type, starting the clock at 0.
    fn stop_time_offsets(
        &self,
        sub_line: &SubLine<'_>,
        time_demand_type: i64,
    ) -> Result<Vec<StopTimeOffset>> {
        let mut clock = Time::default();
        let mut offsets = Vec::with_capacity(sub_line.stop_sequence.len());
        for row in sub_line.stop_sequence {
            let block = time_demand_block(row, time_demand_type)?;
            let travel_time = Time::from_duration(&block.text("TravelTime"))?;
            let waiting_time = Time::from_duration(&block.text("WaitingTime"))?;
            let station_id = row.required_integer("StopID")?;
            let stop_id = self
                .stop_ids
                .get(&station_id)
                .cloned()
                .ok_or_else(|| AscError::LookupNotFound {
                    target: "stop".to_string(),
                    probe: format!("station {station_id}"),
                })?;
            let consecutive_number = row.required_integer("ConsecutiveNumber")?;
            let stop_sequence =
                u32::try_from(consecutive_number).map_err(|_| AscError::TypeCoercionFailure {
                    field: "ConsecutiveNumber".to_string(),
                    value: consecutive_number.to_string(),
                    expected: "stop sequence",
                })?;
            let arrival = clock;
            let departure = add_time(arrival, waiting_time)?;
            clock = add_time(departure, travel_time)?;
            let on_demand = block.flag("DemandStop");
            offsets.push(StopTimeOffset {
                arrival,
                departure,
                stop_id,
                stop_sequence,
                pickup_type: pickup_drop_off(block.flag("NoEntry"), on_demand),
                drop_off_type: pickup_drop_off(block.flag("NoExit"), on_demand),
            });
        }
        Ok(offsets)
    }

    fn trip_id(&self, sub_line: &SubLine<'_>, trip: &Record) -> Result<String> {
        if let Some(international_id) = non_empty(trip.text("InternationalTripID")) {
            return Ok(international_id);
        }
        let trip_id = self.config.trip_id_template.render(|name| {
            if name == "route_id" {
                Some(sub_line.route_id.to_string())
            } else {
                trip.get(name)
                    .or_else(|| sub_line.header.get(name))
                    .map(ToString::to_string)
            }
        })?;
        Ok(trip_id)
    }

    /// Converts one trip, and the trips following it at a fixed interval.
    ///
    /// A trip running on no day of its line version is ignored, as is a trip
    /// one of whose identifiers is already taken. Nothing is registered
    /// before every stop time is computed.
    fn convert_trip(
        &mut self,
        sub_line: &SubLine<'_>,
        trip: &Record,
        bitfields: &HashMap<i64, DayVector>,
    ) -> Result<()> {
        let days = match trip.integer("BitfieldID")? {
            Some(bitfield_id) => {
                let trip_days = bitfields.get(&bitfield_id).ok_or_else(|| {
                    AscError::LookupNotFound {
                        target: "bitfield".to_string(),
                        probe: bitfield_id.to_string(),
                    }
                })?;
                intersect(sub_line.line_version_days, trip_days)?
            }
            None => sub_line.line_version_days.to_vec(),
        };
        if !days.iter().any(|active| *active) {
            debug!(
                "trip {} does not run on any day of its line version",
                trip.text("ID")
            );
            return Ok(());
        }
        let trip_id = self.trip_id(sub_line, trip)?;
        let offsets = self.stop_time_offsets(sub_line, trip.required_integer("TimeDemandType")?)?;
        let start: Time = trip.text("StartTime").parse()?;
        let following_trips = if self.config.expand_following_trips {
            u32::try_from(trip.integer("NumFollowingTrips")?.unwrap_or(0)).unwrap_or(0)
        } else {
            0
        };
        let interval = if following_trips > 0 {
            Time::from_duration(&trip.text("TimeSpanFollowingTrips"))?
        } else {
            Time::default()
        };
        let mut departures = Vec::new();
        for k in 0..=following_trips {
            let id = if k == 0 {
                trip_id.clone()
            } else {
                format!("{trip_id}-{k}")
            };
            if self.feed.trips.contains_id(&id) {
                warn!("trip {id} already exists, trip {} ignored", trip.text("ID"));
                return Ok(());
            }
            let shift = interval
                .checked_mul(k)
                .ok_or_else(|| AscError::InvalidTime(format!("{interval} * {k}")))?;
            departures.push((id, add_time(start, shift)?));
        }
        let mut stop_times = Vec::with_capacity(departures.len() * offsets.len());
        for (id, departure) in &departures {
            for offset in &offsets {
                stop_times.push(StopTime {
                    trip_id: id.clone(),
                    arrival_time: add_time(*departure, offset.arrival)?,
                    departure_time: add_time(*departure, offset.departure)?,
                    stop_id: offset.stop_id.clone(),
                    stop_sequence: offset.stop_sequence,
                    pickup_type: offset.pickup_type,
                    drop_off_type: offset.drop_off_type,
                });
            }
        }

        let service_id = match self.register_service(days)? {
            Some(service_id) => service_id,
            None => return Ok(()),
        };
        for (id, _) in departures {
            self.feed.trips.push(Trip {
                route_id: sub_line.route_id.to_string(),
                service_id: service_id.clone(),
                id,
                headsign: sub_line.headsign.clone(),
                short_name: non_empty(trip.text("ExternalTripNumber")),
                direction: sub_line.direction,
            })?;
        }
        self.feed.stop_times.extend(stop_times);
        Ok(())
    }

    /// Converts the trips of every line, reading the `FD` and `LD` files of
    /// each line number once.
    pub(super) fn build_trips<H>(
        &mut self,
        file_handler: &mut H,
        lines: &AscTable,
        stations: &AscTable,
        period: &ValidityPeriod,
        bitfields: &HashMap<i64, DayVector>,
    ) -> Result<()>
    where
        for<'a> &'a mut H: FileHandler,
    {
        let encoding = self.config.input_encoding;
        let all_days = period.all_days();
        let mut line_numbers = HashSet::new();
        for line in lines.records() {
            let line_number = line.text("LineNumber");
            if !line_numbers.insert(line_number.clone()) {
                continue;
            }
            let trips_file = format!("FD{line_number}.ASC");
            let stop_sequences_file = format!("LD{line_number}.ASC");
            let trips = AscTable::read_file_if_exists(file_handler, &trips_file, encoding)?;
            let stop_sequences =
                AscTable::read_file_if_exists(file_handler, &stop_sequences_file, encoding)?;
            let (trips, stop_sequences) = match (trips, stop_sequences) {
                (Some(trips), Some(stop_sequences)) => (trips, stop_sequences),
                _ => {
                    warn!(
                        "{} or {} not found, trips of line {} ignored",
                        trips_file, stop_sequences_file, line_number
                    );
                    continue;
                }
            };
            self.convert_line(&trips, &stop_sequences, stations, &all_days, bitfields)
                .with_context(|| format!("Error converting trips of line {line_number}"))?;
        }
        Ok(())
    }

    fn convert_line(
        &mut self,
        trip_table: &AscTable,
        stop_sequences: &AscTable,
        stations: &AscTable,
        all_days: &[bool],
        bitfields: &HashMap<i64, DayVector>,
    ) -> Result<()> {
        for (header, trips) in trip_table.headers().iter().zip(trip_table.groups()) {
            let label = format!(
                "{}-{}-{}-{}",
                header.text("LineNumber"),
                header.text("LineVersionNumber"),
                header.text("SubLineNumber"),
                header.text("DirectionID")
            );
            info!("Converting {} trips of sub-line {}", trips.len(), label);
            let route_key = (
                header.text("OperatorOrganisationID"),
                header.text("LineNumber"),
            );
            let route_id = match self.route_ids.get(&route_key) {
                Some(route_id) => route_id.clone(),
                None => {
                    warn!("no route for sub-line {label}, its trips are ignored");
                    continue;
                }
            };
            let (index, stop_sequence_header) = match stop_sequences.find_header(
                header,
                schema::TRIPS.primary.header,
                schema::STOP_SEQUENCES.primary.header,
            ) {
                Some(found) => found,
                None => {
                    warn!("no stop sequence for sub-line {label}, its trips are ignored");
                    continue;
                }
            };
            let stop_sequence = &stop_sequences.groups()[index];
            let line_version_days = match stop_sequence_header.integer("BitfieldID")? {
                Some(bitfield_id) => match bitfields.get(&bitfield_id) {
                    Some(days) => days.as_slice(),
                    None => {
                        warn!("bitfield {bitfield_id} of sub-line {label} not found, its trips are ignored");
                        continue;
                    }
                },
                None => all_days,
            };
            let direction = match DirectionType::from_asc_direction(&header.text("DirectionID")) {
                Ok(direction) => Some(direction),
                Err(e) => {
                    warn!("{e} for sub-line {label}");
                    None
                }
            };
            let headsign = match stop_sequence.last() {
                Some(last_stop) => station_name(stations, last_stop.required_integer("StopID")?),
                None => None,
            };
            let sub_line = SubLine {
                header,
                route_id: &route_id,
                stop_sequence,
                line_version_days,
                direction,
                headsign: headsign.unwrap_or_default(),
            };
            for trip in trips {
                let trip_label = trip.text("ID");
                match self.convert_trip(&sub_line, trip, bitfields) {
                    Err(e) if !is_skippable(&e) => {
                        return Err(e).with_context(|| {
                            format!("Error converting trip {trip_label} of sub-line {label}")
                        });
                    }
                    converted => skip_error_and_warn!(converted.map_err(|e| anyhow!(
                        "trip {trip_label} of sub-line {label} ignored: {e:#}"
                    ))),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{table, STATIONS};
    use super::*;
    use crate::configuration::{Configuration, TemplateError};
    use pretty_assertions::assert_eq;

    const STOP_SEQUENCES: &str = "\
42#1#1#SSBB#1#1#3#2#BUS#3#
1##2####05:00#00:00##1##06:00#00:00##1##
2##3####10:00#01:00###1#12:00#00:30####
3##11####00:00#00:00#1###00:00#00:00#1###
";
    const TRIPS: &str = "\
42#1#SSBB#1#1#4#
1#2#23:50:00#3#11###1#4201##0#00:00#1#100####
1#2#08:00:00#3#11###2###2#30:00#1#101####
1#2#09:00:00#3#11###1###0#00:00#2#102####
1#2#10:00:00#3#11###3###0#00:00##103####
";

    fn bitfields() -> HashMap<i64, DayVector> {
        let mut bitfields = HashMap::new();
        bitfields.insert(1, vec![true, true, false, false, false, false, false]);
        bitfields.insert(2, vec![false, false, false, true, true, false, false]);
        bitfields.insert(3, vec![true, true, true, false, false, false, false]);
        bitfields.insert(4, vec![true, false, true, false, false, false, false]);
        bitfields
    }

    fn convert_trips(assembler: &mut TimetableAssembler<'_>, trips: &str) -> Result<()> {
        let stations = table(&schema::STATIONS, STATIONS);
        assembler.build_stops(&stations, None).unwrap();
        assembler.route_ids.insert(
            ("SSBB".to_string(), "42".to_string()),
            "de:vpe:42".to_string(),
        );
        assembler.convert_line(
            &table(&schema::TRIPS, trips),
            &table(&schema::STOP_SEQUENCES, STOP_SEQUENCES),
            &stations,
            &[true; 7],
            &bitfields(),
        )
    }

    fn convert(config: &Configuration) -> TimetableAssembler<'_> {
        let mut assembler = TimetableAssembler::new(config);
        convert_trips(&mut assembler, TRIPS).unwrap();
        assembler
    }

    fn stop_times_of(assembler: &TimetableAssembler<'_>, trip_id: &str) -> Vec<(String, String)> {
        assembler
            .feed
            .stop_times
            .iter()
            .filter(|stop_time| stop_time.trip_id == trip_id)
            .map(|stop_time| {
                (
                    stop_time.arrival_time.to_string(),
                    stop_time.departure_time.to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn trips_of_a_sub_line() {
        let config = Configuration::default();
        let assembler = convert(&config);
        let trip_ids: Vec<_> = assembler.feed.trips.values().map(|trip| trip.id.as_str()).collect();
        assert_eq!(
            vec![
                "de:vpe:42:100",
                "de:vpe:42:101",
                "de:vpe:42:101-1",
                "de:vpe:42:101-2",
            ],
            trip_ids
        );
        let trip = assembler.feed.trips.get("de:vpe:42:100").unwrap();
        assert_eq!("de:vpe:42", trip.route_id);
        assert_eq!("0", trip.service_id);
        assert_eq!("Nordbahnhof", trip.headsign);
        assert_eq!(Some("4201".to_string()), trip.short_name);
        assert_eq!(Some(DirectionType::Forward), trip.direction);
        assert_eq!(None, assembler.feed.trips.get("de:vpe:42:101").unwrap().short_name);
        assert!(assembler
            .feed
            .trips
            .values()
            .all(|trip| trip.service_id == "0"));
        assert_eq!(1, assembler.services.len());
    }

    #[test]
    fn stop_times_cross_midnight() {
        let config = Configuration::default();
        let assembler = convert(&config);
        let stop_times: Vec<_> = assembler
            .feed
            .stop_times
            .iter()
            .filter(|stop_time| stop_time.trip_id == "de:vpe:42:100")
            .collect();
        assert_eq!(3, stop_times.len());
        assert_eq!(
            vec!["de:1:1", "de:1:2", "de:10:1"],
            stop_times.iter().map(|st| st.stop_id.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![1, 2, 3],
            stop_times.iter().map(|st| st.stop_sequence).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![
                ("23:50:00".to_string(), "23:50:00".to_string()),
                ("23:55:00".to_string(), "23:56:00".to_string()),
                ("24:06:00".to_string(), "24:06:00".to_string()),
            ],
            stop_times_of(&assembler, "de:vpe:42:100")
        );
        assert_eq!(
            vec![
                PickupDropOffType::Regular,
                PickupDropOffType::CoordinateWithDriver,
                PickupDropOffType::NotAvailable,
            ],
            stop_times.iter().map(|st| st.pickup_type).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![
                PickupDropOffType::NotAvailable,
                PickupDropOffType::CoordinateWithDriver,
                PickupDropOffType::Regular,
            ],
            stop_times.iter().map(|st| st.drop_off_type).collect::<Vec<_>>()
        );
    }

    #[test]
    fn following_trips_use_their_time_demand_type() {
        let config = Configuration::default();
        let assembler = convert(&config);
        assert_eq!(
            vec![
                ("08:30:00".to_string(), "08:30:00".to_string()),
                ("08:36:00".to_string(), "08:36:30".to_string()),
                ("08:48:30".to_string(), "08:48:30".to_string()),
            ],
            stop_times_of(&assembler, "de:vpe:42:101-1")
        );
        assert_eq!(
            "09:00:00",
            stop_times_of(&assembler, "de:vpe:42:101-2")[0].0
        );
    }

    #[test]
    fn following_trips_not_expanded() {
        let config = Configuration {
            expand_following_trips: false,
            ..Default::default()
        };
        let assembler = convert(&config);
        assert_eq!(2, assembler.feed.trips.len());
        assert_eq!(6, assembler.feed.stop_times.len());
    }

    #[test]
    fn trips_without_common_day_or_unknown_time_demand_type_are_dropped() {
        let config = Configuration::default();
        let assembler = convert(&config);
        assert_eq!(None, assembler.feed.trips.get("de:vpe:42:102"));
        assert_eq!(None, assembler.feed.trips.get("de:vpe:42:103"));
        assert!(stop_times_of(&assembler, "de:vpe:42:102").is_empty());
        assert!(stop_times_of(&assembler, "de:vpe:42:103").is_empty());
    }

    #[test]
    fn trips_with_a_taken_id_are_dropped_with_their_service() {
        let trips = "\
42#1#SSBB#1#1#3#
1#2#08:00:00#3#11###1###0#00:00#1#200##dup-1##
1#2#09:00:00#3#11###1###1#30:00#4#201##dup##
1#2#10:00:00#3#11###1###0#00:00#4#202##dup-1##
";
        let config = Configuration::default();
        let mut assembler = TimetableAssembler::new(&config);
        convert_trips(&mut assembler, trips).unwrap();
        assert_eq!(
            vec!["dup-1"],
            assembler.feed.trips.values().map(|trip| trip.id.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(1, assembler.services.len());
        assert_eq!(vec!["0"], assembler.service_ids);
        assert_eq!(3, assembler.feed.stop_times.len());
        assert!(stop_times_of(&assembler, "dup").is_empty());
    }

    #[test]
    fn malformed_start_time_aborts() {
        let trips = "\
42#1#SSBB#1#1#1#
1#2#2X:50:00#3#11###1#4201##0#00:00#1#100####
";
        let config = Configuration::default();
        let mut assembler = TimetableAssembler::new(&config);
        let error = convert_trips(&mut assembler, trips).unwrap_err();
        assert_eq!(
            Some(&AscError::InvalidTime("2X:50:00".to_string())),
            error.downcast_ref::<AscError>()
        );
        assert_eq!(0, assembler.services.len());
    }

    #[test]
    fn unknown_placeholder_in_trip_id_aborts() {
        let config = Configuration {
            trip_id_template: "{Unknown}".parse().unwrap(),
            ..Default::default()
        };
        let mut assembler = TimetableAssembler::new(&config);
        let error = convert_trips(&mut assembler, TRIPS).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TemplateError>(),
            Some(TemplateError::UnknownPlaceholder { .. })
        ));
        assert_eq!(0, assembler.feed.trips.len());
    }

    #[test]
    fn overflowing_following_trips_abort() {
        let trips = "\
42#1#SSBB#1#1#1#
1#2#08:00:00#3#11###1###99999#999:00#1#100####
";
        let config = Configuration::default();
        let mut assembler = TimetableAssembler::new(&config);
        assert!(convert_trips(&mut assembler, trips).is_err());
        assert_eq!(0, assembler.services.len());
        assert_eq!(0, assembler.feed.trips.len());
    }

    #[test]
    fn time_demand_blocks() {
        let stop_sequences = table(&schema::STOP_SEQUENCES, STOP_SEQUENCES);
        let row = &stop_sequences.groups()[0][1];
        assert_eq!("12:00", time_demand_block(row, 2).unwrap().text("TravelTime"));
        assert_eq!(
            Err(AscError::MissingDimension {
                requested: 0,
                available: 2
            }),
            time_demand_block(row, 0).map(|_| ())
        );
        assert_eq!(
            Err(AscError::MissingDimension {
                requested: 3,
                available: 2
            }),
            time_demand_block(row, 3).map(|_| ())
        );
    }
}
