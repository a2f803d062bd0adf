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
//! Access to the files of an export, stored in a directory or in a flat
//! zip archive.
//!
//! Exports are produced by various tools which do not agree on the case of
//! file names (`HALTESTE.ASC`, `halteste.asc`...): files are looked up by
//! their exact name first, then ignoring case.

use crate::Result;
use anyhow::{anyhow, Context};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{Read, Seek},
    path::{Path, PathBuf},
};

/// Allows files in a directory or ZipArchive to be read either
pub trait FileHandler
where
    Self: std::marker::Sized,
{
    /// Reader
    type Reader: Read;

    /// Return a file if exist
    fn get_file_if_exists(self, name: &str) -> Result<(Option<Self::Reader>, PathBuf)>;

    /// Return a file or an error if not exist
    fn get_file(self, name: &str) -> Result<(Self::Reader, PathBuf)> {
        let (reader, path) = self.get_file_if_exists(name)?;
        Ok((
            reader.ok_or_else(|| anyhow!("file {:?} not found", path))?,
            path,
        ))
    }

    /// Allows to have nicer error messages
    fn source_name(&self) -> &str;
}

/// PathFileHandler is used to read files for a directory
pub struct PathFileHandler<P: AsRef<Path>> {
    base_path: P,
}

impl<P: AsRef<Path>> PathFileHandler<P> {
    /// Constructs a new PathFileHandler
    pub fn new(path: P) -> Self {
        PathFileHandler { base_path: path }
    }

    fn resolve(&self, name: &str) -> Result<Option<PathBuf>> {
        let exact = self.base_path.as_ref().join(name);
        if exact.is_file() {
            return Ok(Some(exact));
        }
        let parent = match exact.parent() {
            Some(parent) if parent.is_dir() => parent,
            _ => return Ok(None),
        };
        let base_name = match exact.file_name().and_then(|n| n.to_str()) {
            Some(base_name) => base_name.to_string(),
            None => return Ok(None),
        };
        for entry in
            std::fs::read_dir(parent).with_context(|| format!("Error reading {parent:?}"))?
        {
            let path = entry?.path();
            let same_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.eq_ignore_ascii_case(&base_name));
            if same_name && path.is_file() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

impl<'a, P: AsRef<Path>> FileHandler for &'a mut PathFileHandler<P> {
    type Reader = File;
    fn get_file_if_exists(self, name: &str) -> Result<(Option<Self::Reader>, PathBuf)> {
        match self.resolve(name)? {
            Some(f) => Ok((
                Some(File::open(&f).with_context(|| format!("Error reading {:?}", &f))?),
                f,
            )),
            None => Ok((None, self.base_path.as_ref().join(name))),
        }
    }
    fn source_name(&self) -> &str {
        self.base_path.as_ref().to_str().unwrap_or_else(|| {
            panic!(
                "the path '{:?}' should be valid UTF-8",
                self.base_path.as_ref()
            )
        })
    }
}

/// ZipHandler is a wrapper around a ZipArchive
/// It provides a way to access the archive's file by their names
///
/// Files are indexed by their base name, regardless of their directory in
/// the archive, and case insensitively. Two files with the same name in
/// different directories cannot be told apart, the first one wins.
pub struct ZipHandler<R: Seek + Read> {
    archive: zip::ZipArchive<R>,
    archive_path: PathBuf,
    index_by_name: BTreeMap<String, usize>,
}

impl<R> ZipHandler<R>
where
    R: Seek + Read,
{
    /// Opens the archive read by `r`, `path` being only used in messages
    pub fn new<P: AsRef<Path>>(r: R, path: P) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(r)?;
        Ok(ZipHandler {
            index_by_name: Self::files_by_name(&mut archive),
            archive,
            archive_path: path.as_ref().to_path_buf(),
        })
    }

    fn files_by_name(archive: &mut zip::ZipArchive<R>) -> BTreeMap<String, usize> {
        let mut index_by_name = BTreeMap::new();
        for i in 0..archive.len() {
            let real_name = archive.by_index(i).ok().and_then(|file| {
                let real_name = Path::new(file.name()).file_name()?;
                Some(real_name.to_str()?.to_ascii_uppercase())
            });
            if let Some(real_name) = real_name {
                index_by_name.entry(real_name).or_insert(i);
            }
        }
        index_by_name
    }
}

impl<'a, R> FileHandler for &'a mut ZipHandler<R>
where
    R: Seek + Read,
{
    type Reader = zip::read::ZipFile<'a, R>;
    fn get_file_if_exists(self, name: &str) -> Result<(Option<Self::Reader>, PathBuf)> {
        let p = self.archive_path.join(name);
        match self.index_by_name.get(&name.to_ascii_uppercase()) {
            None => Ok((None, p)),
            Some(i) => Ok((Some(self.archive.by_index(*i)?), p)),
        }
    }
    fn source_name(&self) -> &str {
        self.archive_path
            .to_str()
            .unwrap_or_else(|| panic!("the path '{:?}' should be valid UTF-8", self.archive_path))
    }
}
