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

//! The `asc_model` crate converts transit exports in the ASC format
//! (the `#`-delimited INIT/VDV dialect) into [GTFS](http://gtfs.org/).
//!
//! Reading is driven by the static layouts of [`asc::schema`]: every file
//! is decoded generically into [`asc::AscTable`]s, which [`timetable`]
//! joins into a [`gtfs::Feed`].

#![deny(missing_docs)]

pub mod asc;
pub mod calendars;
pub mod configuration;
pub mod file_handler;
pub mod gtfs;
pub mod objects;
#[doc(hidden)]
pub mod test_utils;
pub mod timetable;
mod utils;
mod version_utils;

pub use version_utils::{binary_full_version, GIT_VERSION};

/// The error type used by the crate.
pub type Error = anyhow::Error;

/// The corresponding result type used by the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub use crate::configuration::{read_config, Configuration};
pub use crate::gtfs::Feed;
pub use crate::timetable::{read_from_path, read_from_zip};
