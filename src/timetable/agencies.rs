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
use crate::asc::{AscError, AscTable, Record};
use crate::gtfs::Agency;
use crate::Result;
use skip_error::skip_error_and_warn;
use tracing::info;

impl<'c> TimetableAssembler<'c> {
    fn make_agency(&self, operator: &Record) -> Result<Agency> {
        let url = if self.config.agency_url_template.is_empty() {
            self.config.default_agency_url.clone()
        } else {
            self.config.agency_url_template.render_fields(operator)?
        };
        Ok(Agency {
            id: self.config.agency_id_template.render_fields(operator)?,
            name: operator.text("Name"),
            url,
            timezone: self.config.default_agency_timezone.name().to_string(),
            lang: self.config.default_agency_lang.clone(),
        })
    }

    /// One agency per operator, shared by its operator organisations.
    pub(super) fn build_agencies(
        &mut self,
        operator_organisations: &AscTable,
        operators: &AscTable,
    ) -> Result<()> {
        info!(
            "Converting {} operator organisations of {} operators",
            operator_organisations.records().len(),
            operators.records().len()
        );
        for operator_organisation in operator_organisations.records() {
            let operator = skip_error_and_warn!(operators
                .find_record(operator_organisation, &["OperatorID"], &["ID"])
                .ok_or_else(|| AscError::LookupNotFound {
                    target: "BETRIEBE".to_string(),
                    probe: format!(
                        "operator {:?} of operator organisation {:?}",
                        operator_organisation.text("OperatorID"),
                        operator_organisation.text("ID")
                    ),
                }));
            let agency = self.make_agency(operator)?;
            self.agency_ids
                .insert(operator_organisation.text("ID"), agency.id.clone());
            if !self.feed.agencies.contains_id(&agency.id) {
                self.feed.agencies.push(agency)?;
            }
        }
        Ok(())
    }
}
