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
use crate::asc::{AscError, AscTable, Record};
use crate::gtfs::{Route, RouteType};
use crate::Result;
use anyhow::{anyhow, Context};
use skip_error::skip_error_and_warn;
use tracing::{debug, info, warn};

impl<'c> TimetableAssembler<'c> {
    /// The route of a line, `None` when its identifier renders empty.
    fn make_route(
        &self,
        line: &Record,
        operator_organisations: &AscTable,
    ) -> Result<Option<Route>> {
        let id = self.config.route_id_template.render_fields(line)?;
        if id.is_empty() {
            return Ok(None);
        }
        let operator_organisation_id = line.text("OperatorOrganisationID");
        let agency_id = self
            .agency_ids
            .get(&operator_organisation_id)
            .cloned()
            .ok_or_else(|| AscError::LookupNotFound {
                target: "agency".to_string(),
                probe: operator_organisation_id.clone(),
            })?;
        let vehicle_type_group = match line.text("VehicleTypeGroup") {
            group if group.is_empty() => operator_organisations
                .find_record(line, &["OperatorOrganisationID"], &["ID"])
                .map(|operator_organisation| operator_organisation.text("VehicleTypeGroup"))
                .unwrap_or_default(),
            group => group,
        };
        let route_type = RouteType::from_vehicle_type_group(&vehicle_type_group).unwrap_or_else(|e| {
            warn!("{e}, route type set to 0 (tram) for {id}");
            RouteType::Tramway
        });
        let line_number = line.text("LineNumber");
        Ok(Some(Route {
            id,
            agency_id,
            short_name: non_empty(line.text("Name")).unwrap_or(line_number),
            long_name: String::new(),
            route_type,
            color: non_empty(line.text("BackgroundColor")),
            text_color: non_empty(line.text("TextColor")),
        }))
    }

    /// One route per line, further versions of a line being ignored.
    pub(super) fn build_routes(
        &mut self,
        lines: &AscTable,
        operator_organisations: &AscTable,
    ) -> Result<()> {
        info!("Converting {} line versions", lines.records().len());
        for line in lines.records() {
            let key = (line.text("OperatorOrganisationID"), line.text("LineNumber"));
            if self.route_ids.contains_key(&key) {
                debug!("line {}-{} already converted", key.0, key.1);
                continue;
            }
            let route = match self.make_route(line, operator_organisations) {
                Err(e) if !is_skippable(&e) => {
                    return Err(e)
                        .with_context(|| format!("Error converting line {}-{}", key.0, key.1));
                }
                route => skip_error_and_warn!(
                    route.map_err(|e| anyhow!("line {}-{} ignored: {e:#}", key.0, key.1))
                ),
            };
            let route = match route {
                Some(route) => route,
                None => {
                    warn!("line {}-{} has no route id, ignored", key.0, key.1);
                    continue;
                }
            };
            self.route_ids.insert(key, route.id.clone());
            skip_error_and_warn!(self.feed.routes.push(route));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{table, OPERATORS, OPERATOR_ORGANISATIONS};
    use super::*;
    use crate::asc::schema;
    use crate::configuration::{Configuration, TemplateError};
    use pretty_assertions::assert_eq;

    const LINES: &str = "\
SSBB#42#42#B##de:vpe:42###FFFFFF#E2001A###
SSBU#1#U1##U-Bahn#de:vpe:U1#######
SSBU#1#U1##U-Bahn#de:vpe:U1######second version#
DBR#1###Hovercraft#de:vpe:R1#######
ORPH#99####de:vpe:99#######
";

    fn assembler_with_routes(config: &Configuration) -> TimetableAssembler<'_> {
        let operator_organisations =
            table(&schema::OPERATOR_ORGANISATIONS, OPERATOR_ORGANISATIONS);
        let mut assembler = TimetableAssembler::new(config);
        assembler
            .build_agencies(&operator_organisations, &table(&schema::OPERATORS, OPERATORS))
            .unwrap();
        assembler
            .build_routes(&table(&schema::LINES, LINES), &operator_organisations)
            .unwrap();
        assembler
    }

    #[test]
    fn one_route_per_line() {
        let config = Configuration::default();
        let assembler = assembler_with_routes(&config);
        let routes = &assembler.feed.routes;
        assert_eq!(3, routes.len());

        let bus = routes.get("de:vpe:42").unwrap();
        assert_eq!("1", bus.agency_id);
        assert_eq!("42", bus.short_name);
        assert_eq!(RouteType::Bus, bus.route_type);
        assert_eq!(Some("E2001A".to_string()), bus.color);
        assert_eq!(Some("FFFFFF".to_string()), bus.text_color);

        let metro = routes.get("de:vpe:U1").unwrap();
        assert_eq!(RouteType::Metro, metro.route_type);
        assert_eq!(None, metro.color);

        let rail = routes.get("de:vpe:R1").unwrap();
        assert_eq!("2", rail.agency_id);
        assert_eq!("1", rail.short_name);
        assert_eq!(RouteType::Tramway, rail.route_type);
    }

    #[test]
    fn routes_by_operator_organisation_and_line_number() {
        let config = Configuration::default();
        let assembler = assembler_with_routes(&config);
        let route_id = |oo: &str, line: &str| {
            assembler
                .route_ids
                .get(&(oo.to_string(), line.to_string()))
                .cloned()
        };
        assert_eq!(Some("de:vpe:U1".to_string()), route_id("SSBU", "1"));
        assert_eq!(Some("de:vpe:R1".to_string()), route_id("DBR", "1"));
        assert_eq!(None, route_id("ORPH", "99"));
    }

    #[test]
    fn lines_without_route_id_are_ignored() {
        let config = Configuration {
            route_id_template: "{Comment}".parse().unwrap(),
            ..Default::default()
        };
        let assembler = assembler_with_routes(&config);
        assert_eq!(
            vec!["second version"],
            assembler
                .feed
                .routes
                .values()
                .map(|route| route.id.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_placeholder_in_route_id_aborts() {
        let config = Configuration {
            route_id_template: "{Unknown}".parse().unwrap(),
            ..Default::default()
        };
        let operator_organisations =
            table(&schema::OPERATOR_ORGANISATIONS, OPERATOR_ORGANISATIONS);
        let mut assembler = TimetableAssembler::new(&config);
        assembler
            .build_agencies(&operator_organisations, &table(&schema::OPERATORS, OPERATORS))
            .unwrap();
        let error = assembler
            .build_routes(&table(&schema::LINES, LINES), &operator_organisations)
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TemplateError>(),
            Some(TemplateError::UnknownPlaceholder { .. })
        ));
        assert_eq!(0, assembler.feed.routes.len());
    }
}
