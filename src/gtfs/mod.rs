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
//! The GTFS feed produced by a conversion, and its writer.

#![allow(missing_docs)]

mod write;

use crate::asc::AscError;
use crate::objects::{Date, Time};
use crate::{utils, Result};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path;
use tracing::info;
use typed_index_collection::{CollectionWithId, Id};

macro_rules! impl_id {
    ($ty:ty) => {
        impl Id<$ty> for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

/// `location_type` of a stop.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopLocationType {
    /// A station grouping stop points
    #[serde(rename = "1")]
    StopArea,
}

/// `route_type` of a route.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteType {
    /// Tram, streetcar, light rail
    #[serde(rename = "0")]
    Tramway,
    /// Subway, metro
    #[serde(rename = "1")]
    Metro,
    /// Intercity or long-distance travel
    #[serde(rename = "2")]
    Rail,
    /// Bus
    #[serde(rename = "3")]
    Bus,
    /// Ferry
    #[serde(rename = "4")]
    Ferry,
    /// Aerial lift, suspended cable car
    #[serde(rename = "6")]
    Gondola,
}

impl RouteType {
    /// GTFS route type of an ASC vehicle type group.
    pub fn from_vehicle_type_group(group: &str) -> std::result::Result<RouteType, AscError> {
        match group {
            "Bus" => Ok(RouteType::Bus),
            "U-Bahn" => Ok(RouteType::Metro),
            "S-Bahn" | "R-Bahn" | "Zug" => Ok(RouteType::Rail),
            "Tram" => Ok(RouteType::Tramway),
            "Fähre" => Ok(RouteType::Ferry),
            "Seilbahn" => Ok(RouteType::Gondola),
            _ => Err(AscError::UnmappedEnumValue {
                kind: "vehicle type group",
                value: group.to_string(),
            }),
        }
    }
}

/// `direction_id` of a trip.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DirectionType {
    /// Outbound travel
    #[serde(rename = "0")]
    Forward,
    /// Inbound travel
    #[serde(rename = "1")]
    Backward,
}

impl DirectionType {
    /// GTFS direction of an ASC direction (`1` or `2`).
    pub fn from_asc_direction(direction: &str) -> std::result::Result<DirectionType, AscError> {
        match direction.trim() {
            "1" => Ok(DirectionType::Forward),
            "2" => Ok(DirectionType::Backward),
            _ => Err(AscError::UnmappedEnumValue {
                kind: "direction",
                value: direction.to_string(),
            }),
        }
    }
}

/// `pickup_type` and `drop_off_type` of a stop time.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PickupDropOffType {
    /// Regularly scheduled
    #[serde(rename = "0")]
    Regular,
    /// Not available
    #[serde(rename = "1")]
    NotAvailable,
    /// Must coordinate with the driver
    #[serde(rename = "3")]
    CoordinateWithDriver,
}

/// `exception_type` of a calendar date.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExceptionType {
    /// Service added on the date
    #[serde(rename = "1")]
    Add,
}

/// A row of `stops.txt`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Stop {
    #[serde(rename = "stop_id")]
    pub id: String,
    #[serde(rename = "stop_name")]
    pub name: String,
    #[serde(rename = "stop_lat")]
    pub lat: Option<f64>,
    #[serde(rename = "stop_lon")]
    pub lon: Option<f64>,
    #[serde(rename = "zone_id")]
    pub fare_zone_id: Option<String>,
    pub location_type: Option<StopLocationType>,
    pub parent_station: Option<String>,
    pub platform_code: Option<String>,
}
impl_id!(Stop);

/// A row of `agency.txt`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Agency {
    #[serde(rename = "agency_id")]
    pub id: String,
    #[serde(rename = "agency_name")]
    pub name: String,
    #[serde(rename = "agency_url")]
    pub url: String,
    #[serde(rename = "agency_timezone")]
    pub timezone: String,
    #[serde(rename = "agency_lang")]
    pub lang: Option<String>,
}
impl_id!(Agency);

/// A row of `routes.txt`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Route {
    #[serde(rename = "route_id")]
    pub id: String,
    pub agency_id: String,
    #[serde(rename = "route_short_name")]
    pub short_name: String,
    #[serde(rename = "route_long_name")]
    pub long_name: String,
    pub route_type: RouteType,
    #[serde(rename = "route_color")]
    pub color: Option<String>,
    #[serde(rename = "route_text_color")]
    pub text_color: Option<String>,
}
impl_id!(Route);

/// A row of `trips.txt`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Trip {
    pub route_id: String,
    pub service_id: String,
    #[serde(rename = "trip_id")]
    pub id: String,
    #[serde(rename = "trip_headsign")]
    pub headsign: String,
    #[serde(rename = "trip_short_name")]
    pub short_name: Option<String>,
    #[serde(rename = "direction_id")]
    pub direction: Option<DirectionType>,
}
impl_id!(Trip);

/// A row of `stop_times.txt`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StopTime {
    pub trip_id: String,
    pub arrival_time: Time,
    pub departure_time: Time,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub pickup_type: PickupDropOffType,
    pub drop_off_type: PickupDropOffType,
}

/// A row of `calendar_dates.txt`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CalendarDate {
    pub service_id: String,
    #[serde(serialize_with = "utils::ser_from_naive_date")]
    pub date: Date,
    pub exception_type: ExceptionType,
}

/// A complete GTFS feed.
#[derive(Debug, Default)]
pub struct Feed {
    /// Stations and their stop points
    pub stops: CollectionWithId<Stop>,
    /// Agencies
    pub agencies: CollectionWithId<Agency>,
    /// Routes
    pub routes: CollectionWithId<Route>,
    /// Trips
    pub trips: CollectionWithId<Trip>,
    /// Stop times, grouped by trip in stop sequence order
    pub stop_times: Vec<StopTime>,
    /// Active dates of each service
    pub calendar_dates: Vec<CalendarDate>,
}

/// Exports a feed to the GTFS files in the `path` directory, created if
/// missing.
pub fn write<P: AsRef<path::Path>>(feed: &Feed, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Writing GTFS to {:?}", path);
    fs::create_dir_all(path).with_context(|| format!("Error creating {path:?}"))?;
    write::write_stops(path, &feed.stops)?;
    write::write_agencies(path, &feed.agencies)?;
    write::write_routes(path, &feed.routes)?;
    write::write_trips(path, &feed.trips)?;
    write::write_stop_times(path, &feed.stop_times)?;
    write::write_calendar_dates(path, &feed.calendar_dates)?;
    Ok(())
}

/// Exports a feed to a GTFS zip archive at `path`.
pub fn write_to_zip<P: AsRef<path::Path>>(feed: &Feed, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Writing GTFS to ZIP File {:?}", path);
    let input_tmp_dir = tempfile::tempdir()?;
    write(feed, input_tmp_dir.path())?;
    utils::zip_to(input_tmp_dir.path(), path)?;
    input_tmp_dir.close()?;
    Ok(())
}
