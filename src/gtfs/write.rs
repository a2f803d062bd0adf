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

use super::{Agency, CalendarDate, Route, Stop, StopTime, Trip};
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::path;
use tracing::info;
use typed_index_collection::CollectionWithId;

const STOPS_HEADER: &[&str] = &[
    "stop_id",
    "stop_name",
    "stop_lat",
    "stop_lon",
    "zone_id",
    "location_type",
    "parent_station",
    "platform_code",
];
const AGENCY_HEADER: &[&str] = &[
    "agency_id",
    "agency_name",
    "agency_url",
    "agency_timezone",
    "agency_lang",
];
const ROUTES_HEADER: &[&str] = &[
    "route_id",
    "agency_id",
    "route_short_name",
    "route_long_name",
    "route_type",
    "route_color",
    "route_text_color",
];
const TRIPS_HEADER: &[&str] = &[
    "route_id",
    "service_id",
    "trip_id",
    "trip_headsign",
    "trip_short_name",
    "direction_id",
];
const STOP_TIMES_HEADER: &[&str] = &[
    "trip_id",
    "arrival_time",
    "departure_time",
    "stop_id",
    "stop_sequence",
    "pickup_type",
    "drop_off_type",
];
const CALENDAR_DATES_HEADER: &[&str] = &["service_id", "date", "exception_type"];

// The header is written explicitly so that a table without rows is still a
// valid GTFS file.
fn write_rows<'a, T, I>(path: &path::Path, file: &str, header: &[&str], rows: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    info!(file_name = %file, "Writing");
    let path = path.join(file);
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .with_context(|| format!("Error writing {path:?}"))?;
    wtr.write_record(header)
        .with_context(|| format!("Error writing {path:?}"))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Error serializing {path:?}"))?;
    }
    wtr.flush()
        .with_context(|| format!("Error writing {path:?}"))?;
    Ok(())
}

pub fn write_stops(path: &path::Path, stops: &CollectionWithId<Stop>) -> Result<()> {
    write_rows(path, "stops.txt", STOPS_HEADER, stops.values())
}

pub fn write_agencies(path: &path::Path, agencies: &CollectionWithId<Agency>) -> Result<()> {
    write_rows(path, "agency.txt", AGENCY_HEADER, agencies.values())
}

pub fn write_routes(path: &path::Path, routes: &CollectionWithId<Route>) -> Result<()> {
    write_rows(path, "routes.txt", ROUTES_HEADER, routes.values())
}

pub fn write_trips(path: &path::Path, trips: &CollectionWithId<Trip>) -> Result<()> {
    write_rows(path, "trips.txt", TRIPS_HEADER, trips.values())
}

pub fn write_stop_times(path: &path::Path, stop_times: &[StopTime]) -> Result<()> {
    write_rows(path, "stop_times.txt", STOP_TIMES_HEADER, stop_times)
}

pub fn write_calendar_dates(path: &path::Path, calendar_dates: &[CalendarDate]) -> Result<()> {
    write_rows(
        path,
        "calendar_dates.txt",
        CALENDAR_DATES_HEADER,
        calendar_dates,
    )
}
