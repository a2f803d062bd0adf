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

use super::{non_empty, TimetableAssembler};
use crate::asc::{AscError, AscTable, Record};
use crate::gtfs::{Stop, StopLocationType};
use crate::Result;
use anyhow::Context;
use skip_error::skip_error_and_warn;
use tracing::{error, info};

const PARENT_KEYS: &[&str] = &["ParentID", "ParentDelivererID"];
const STATION_KEYS: &[&str] = &["ID", "DelivererID"];
const FARE_KEYS: &[&str] = &["StationID", "DelivererID"];

fn station_label(station: &Record) -> String {
    format!("{}-{}", station.text("DelivererID"), station.text("ID"))
}

impl<'c> TimetableAssembler<'c> {
    /// Stations without parent become GTFS stations, the others their stop
    /// points, named after their parent.
    pub(super) fn build_stops(&mut self, stations: &AscTable, fares: Option<&AscTable>) -> Result<()> {
        info!("Converting {} stations", stations.records().len());
        for station in stations.records() {
            if station.text("InternationalStationID").is_empty() {
                error!(
                    "station {} has no international id",
                    station_label(station)
                );
                return Err(AscError::MissingRequiredValue {
                    field: "InternationalStationID".to_string(),
                })
                .with_context(|| format!("station {}", station_label(station)));
            }
            let stop = if station.get("ParentID").map_or(true, |p| p.is_empty()) {
                Stop {
                    id: self.config.parent_station_id_template.render_fields(station)?,
                    name: station.text("LongName"),
                    lat: station.real("Latitude"),
                    lon: station.real("Longitude"),
                    fare_zone_id: fares.and_then(|fares| fare_zone(fares, station)),
                    location_type: Some(StopLocationType::StopArea),
                    parent_station: None,
                    platform_code: None,
                }
            } else {
                let parent = match stations.find_record(station, PARENT_KEYS, STATION_KEYS) {
                    Some(parent) => parent,
                    None => {
                        error!(
                            "could not find the parent station of station {}",
                            station_label(station)
                        );
                        return Err(AscError::LookupNotFound {
                            target: "HALTESTE".to_string(),
                            probe: format!(
                                "{}-{}",
                                station.text("ParentDelivererID"),
                                station.text("ParentID")
                            ),
                        })
                        .with_context(|| format!("station {}", station_label(station)));
                    }
                };
                Stop {
                    id: self.config.stop_id_template.render_fields(station)?,
                    name: parent.text("LongName"),
                    lat: station.real("Latitude"),
                    lon: station.real("Longitude"),
                    fare_zone_id: fares.and_then(|fares| fare_zone(fares, station)),
                    location_type: None,
                    parent_station: Some(
                        self.config
                            .parent_station_id_template
                            .render_fields(parent)?,
                    ),
                    platform_code: if self.config.export_platform_codes {
                        non_empty(station.text("Code"))
                    } else {
                        None
                    },
                }
            };
            self.stop_ids
                .insert(station.required_integer("ID")?, stop.id.clone());
            skip_error_and_warn!(self.feed.stops.push(stop));
        }
        Ok(())
    }
}

fn fare_zone(fares: &AscTable, station: &Record) -> Option<String> {
    fares
        .find_record(station, STATION_KEYS, FARE_KEYS)
        .and_then(|fare| non_empty(fare.text("Area")))
}
