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

//! ASC format management.
//!
//! An ASC export is a set of `#`-delimited text files whose column layout
//! is not self-described: it is looked up in [`schema`] from the file name,
//! then every row is decoded into a [`Record`] and the rows are grouped into
//! an [`AscTable`].

mod codec;
mod error;
pub mod schema;
mod table;

pub use codec::{decode, decode_value, encode, encode_value, DimensionContext, Fields, Record, Value};
pub use error::AscError;
pub use schema::{Field, FieldType, Schema};
pub use table::{find_first_matching, AscTable, Encoding};
