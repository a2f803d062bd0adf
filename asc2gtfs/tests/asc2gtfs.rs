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

use asc_model::test_utils::*;
use assert_cmd::prelude::*;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_asc2gtfs() {
    let output_dir = TempDir::new().expect("create temp dir failed");
    Command::cargo_bin("asc2gtfs")
        .expect("Failed to find binary 'asc2gtfs'")
        .arg("--input")
        .arg("../tests/fixtures/asc2gtfs/input")
        .arg("--config")
        .arg("../tests/fixtures/asc2gtfs/config.json")
        .arg("--output")
        .arg(output_dir.path().to_str().unwrap())
        .assert()
        .success();
    compare_output_dir_with_expected(&output_dir, None, "../tests/fixtures/asc2gtfs/output");
}

#[test]
fn test_asc2gtfs_creates_output_directory() {
    let tmp_dir = TempDir::new().expect("create temp dir failed");
    let output_dir = tmp_dir.path().join("gtfs");
    Command::cargo_bin("asc2gtfs")
        .expect("Failed to find binary 'asc2gtfs'")
        .arg("-i")
        .arg("../tests/fixtures/asc2gtfs/input")
        .arg("-c")
        .arg("../tests/fixtures/asc2gtfs/config.json")
        .arg("-o")
        .arg(output_dir.to_str().unwrap())
        .assert()
        .success();
    compare_output_dir_with_expected(
        &output_dir,
        Some(vec!["agency.txt", "routes.txt", "calendar_dates.txt"]),
        "../tests/fixtures/asc2gtfs/output",
    );
}

#[test]
fn test_asc2gtfs_zip_output() {
    let tmp_dir = TempDir::new().expect("create temp dir failed");
    let output_file = tmp_dir.path().join("gtfs.zip");
    Command::cargo_bin("asc2gtfs")
        .expect("Failed to find binary 'asc2gtfs'")
        .arg("--input")
        .arg("../tests/fixtures/asc2gtfs/input")
        .arg("--output")
        .arg(output_file.to_str().unwrap())
        .assert()
        .success();
    let file = std::fs::File::open(&output_file).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<_> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        vec![
            "agency.txt",
            "calendar_dates.txt",
            "routes.txt",
            "stop_times.txt",
            "stops.txt",
            "trips.txt",
        ],
        names
    );
}

#[test]
fn test_asc2gtfs_missing_input() {
    let output_dir = TempDir::new().expect("create temp dir failed");
    let output = Command::cargo_bin("asc2gtfs")
        .expect("Failed to find binary 'asc2gtfs'")
        .arg("--input")
        .arg("../tests/fixtures/asc2gtfs/output")
        .arg("--output")
        .arg(output_dir.path().to_str().unwrap())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("file \"HALTESTE.ASC\" not found"));
}
