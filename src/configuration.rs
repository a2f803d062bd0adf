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
//! Conversion settings, read from a JSON file.

use crate::asc::{Encoding, Fields};
use crate::Result;
use anyhow::Context;
use chrono_tz::Tz;
use serde::Deserialize;
use std::convert::TryFrom;
use std::fmt;
use std::fs::File;
use std::path;
use thiserror::Error;
use tracing::info;

/// Failure to render a [`Template`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `{` without the matching `}`
    #[error("unclosed placeholder in template {0:?}")]
    UnclosedPlaceholder(String),
    /// Placeholder naming no known value
    #[error("unknown placeholder {{{placeholder}}} in template {template:?}")]
    UnknownPlaceholder {
        /// The template
        template: String,
        /// The name between braces
        placeholder: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// An identifier pattern such as `"{InternationalStationID}_Parent"`.
///
/// Each `{name}` is replaced by the value called `name`, the rest is
/// copied as is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl TryFrom<String> for Template {
    type Error = TemplateError;
    fn try_from(source: String) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source.as_str();
        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let end = rest[start..]
                .find('}')
                .ok_or_else(|| TemplateError::UnclosedPlaceholder(source.clone()))?;
            segments.push(Segment::Placeholder(
                rest[start + 1..start + end].to_string(),
            ));
            rest = &rest[start + end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Template { source, segments })
    }
}

impl std::str::FromStr for Template {
    type Err = TemplateError;
    fn from_str(source: &str) -> Result<Self, TemplateError> {
        Template::try_from(source.to_string())
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Template {
    /// True for a template producing the empty string.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Renders the template, `value` giving the text of each placeholder.
    pub fn render<F>(&self, mut value: F) -> Result<String, TemplateError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => rendered.push_str(literal),
                Segment::Placeholder(name) => {
                    let text = value(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                        template: self.source.clone(),
                        placeholder: name.clone(),
                    })?;
                    rendered.push_str(&text);
                }
            }
        }
        Ok(rendered)
    }

    /// Renders the template with the columns of a decoded row.
    pub fn render_fields(&self, fields: &Fields) -> Result<String, TemplateError> {
        self.render(|name| fields.get(name).map(ToString::to_string))
    }
}

fn template(source: &str) -> Template {
    Template::try_from(source.to_string()).unwrap_or_else(|_| Template {
        source: source.to_string(),
        segments: vec![Segment::Literal(source.to_string())],
    })
}

/// Settings of a conversion.
///
/// Every key is optional in the JSON file. Below is an example with the
/// default values.
/// ```text
/// {
///     "input_encoding": "utf-8",
///     "stop_id_template": "{InternationalStationID}",
///     "parent_station_id_template": "{InternationalStationID}_Parent",
///     "agency_id_template": "{ID}",
///     "agency_url_template": "",
///     "default_agency_url": "",
///     "default_agency_timezone": "Europe/Berlin",
///     "default_agency_lang": null,
///     "route_id_template": "{InternationalLineID}",
///     "trip_id_template": "{route_id}:{ID}",
///     "service_id_template": "{service_index}",
///     "export_platform_codes": false,
///     "export_fare_zones": false,
///     "expand_following_trips": true
/// }
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configuration {
    /// Character encoding of the ASC files
    pub input_encoding: Encoding,
    /// Identifier of stop points, with station columns
    pub stop_id_template: Template,
    /// Identifier of stations, with station columns
    pub parent_station_id_template: Template,
    /// Identifier of agencies, with operator columns
    pub agency_id_template: Template,
    /// Url of agencies, with operator columns
    pub agency_url_template: Template,
    /// Url of agencies when no template is given
    pub default_agency_url: String,
    /// Timezone of all agencies
    pub default_agency_timezone: Tz,
    /// Language of all agencies
    pub default_agency_lang: Option<String>,
    /// Identifier of routes, with line columns
    pub route_id_template: Template,
    /// Identifier of trips, with trip and sub-line columns plus `route_id`
    pub trip_id_template: Template,
    /// Identifier of services, with `service_index`
    pub service_id_template: Template,
    /// Fill `platform_code` of stop points with the station code
    pub export_platform_codes: bool,
    /// Fill `zone_id` of stops from `TARIF.ASC`
    pub export_fare_zones: bool,
    /// Create the trips following a trip at a fixed interval
    pub expand_following_trips: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            input_encoding: Encoding::default(),
            stop_id_template: template("{InternationalStationID}"),
            parent_station_id_template: template("{InternationalStationID}_Parent"),
            agency_id_template: template("{ID}"),
            agency_url_template: template(""),
            default_agency_url: String::new(),
            default_agency_timezone: chrono_tz::Europe::Berlin,
            default_agency_lang: None,
            route_id_template: template("{InternationalLineID}"),
            trip_id_template: template("{route_id}:{ID}"),
            service_id_template: template("{service_index}"),
            export_platform_codes: false,
            export_fare_zones: false,
            expand_following_trips: true,
        }
    }
}

/// Reads the configuration file, defaults apply without file.
pub fn read_config<P: AsRef<path::Path>>(config_path: Option<P>) -> Result<Configuration> {
    match config_path {
        Some(config_path) => {
            let config_path = config_path.as_ref();
            info!("Reading configuration from {:?}", config_path);
            let json_config_file = File::open(config_path)
                .with_context(|| format!("Error reading {config_path:?}"))?;
            let config = serde_json::from_reader(json_config_file)
                .with_context(|| format!("Error reading {config_path:?}"))?;
            Ok(config)
        }
        None => Ok(Configuration::default()),
    }
}
