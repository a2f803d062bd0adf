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
//! Conversion of an INIT 5.1 ASC export into a GTFS [`Feed`].
//!
//! Tables are assembled in dependency order: stops, agencies, routes, then
//! trips with their stop times, the services being collected on the way and
//! expanded into calendar dates at the end.

mod agencies;
mod routes;
mod services;
mod stops;
mod trips;

use crate::asc::{AscError, AscTable};
use crate::calendars::ServiceRegistry;
use crate::configuration::Configuration;
use crate::file_handler::{FileHandler, PathFileHandler, ZipHandler};
use crate::gtfs::Feed;
use crate::Result;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// State of one conversion: the identifiers generated so far, the distinct
/// services and the feed being built.
struct TimetableAssembler<'c> {
    config: &'c Configuration,
    /// Station `ID` to GTFS `stop_id`
    stop_ids: HashMap<i64, String>,
    /// Operator organisation `ID` to GTFS `agency_id`
    agency_ids: HashMap<String, String>,
    /// (`OperatorOrganisationID`, `LineNumber`) to GTFS `route_id`
    route_ids: HashMap<(String, String), String>,
    services: ServiceRegistry,
    /// GTFS `service_id` of each registered service, by index
    service_ids: Vec<String>,
    feed: Feed,
}

impl<'c> TimetableAssembler<'c> {
    fn new(config: &'c Configuration) -> Self {
        TimetableAssembler {
            config,
            stop_ids: HashMap::new(),
            agency_ids: HashMap::new(),
            route_ids: HashMap::new(),
            services: ServiceRegistry::new(),
            service_ids: Vec::new(),
            feed: Feed::default(),
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    Some(text).filter(|text| !text.is_empty())
}

/// Failed joins only concern the line, trip or operator being converted,
/// which is skipped. Any other error aborts the conversion.
fn is_skippable(error: &crate::Error) -> bool {
    matches!(
        error.downcast_ref::<AscError>(),
        Some(AscError::LookupNotFound { .. }) | Some(AscError::MissingDimension { .. })
    )
}

fn read<H>(file_handler: &mut H, config: &Configuration) -> Result<Feed>
where
    for<'a> &'a mut H: FileHandler,
{
    let encoding = config.input_encoding;
    let mut assembler = TimetableAssembler::new(config);

    let stations = AscTable::read_file(file_handler, "HALTESTE.ASC", encoding)?;
    let fares = if config.export_fare_zones {
        let fares = AscTable::read_file_if_exists(file_handler, "TARIF.ASC", encoding)?;
        if fares.is_none() {
            warn!("TARIF.ASC not found, stops are exported without fare zone");
        }
        fares
    } else {
        None
    };
    assembler.build_stops(&stations, fares.as_ref())?;

    let operators = AscTable::read_file(file_handler, "BETRIEBE.ASC", encoding)?;
    let operator_organisations = AscTable::read_file(file_handler, "BETRIEBSTEILE.ASC", encoding)?;
    assembler.build_agencies(&operator_organisations, &operators)?;

    let lines = AscTable::read_file(file_handler, "LINIEN.ASC", encoding)?;
    assembler.build_routes(&lines, &operator_organisations)?;

    let versions = AscTable::read_file(file_handler, "VERSIONE.ASC", encoding)?;
    let period = services::validity_period(&versions)?;
    let bitfields = AscTable::read_file(file_handler, "BITFELD.ASC", encoding)?;
    let bitfields = services::decode_bitfields(&bitfields, &period)?;

    assembler.build_trips(file_handler, &lines, &stations, &period, &bitfields)?;
    assembler.build_calendar_dates(&period);

    let feed = assembler.feed;
    info!(
        stops = feed.stops.len(),
        agencies = feed.agencies.len(),
        routes = feed.routes.len(),
        trips = feed.trips.len(),
        services = assembler.service_ids.len(),
        "Conversion done"
    );
    Ok(feed)
}

/// Converts the ASC files of the directory `p`.
///
/// File names are matched regardless of their case.
pub fn read_from_path<P: AsRef<Path>>(p: P, config: &Configuration) -> Result<Feed> {
    let mut file_handler = PathFileHandler::new(p.as_ref().to_path_buf());
    read(&mut file_handler, config)
}

/// Converts the ASC files of the zip archive `p`.
///
/// Files are looked up by name wherever they are in the archive.
pub fn read_from_zip<P: AsRef<Path>>(p: P, config: &Configuration) -> Result<Feed> {
    let reader = File::open(p.as_ref())?;
    let mut file_handler = ZipHandler::new(reader, p)?;
    read(&mut file_handler, config)
}
