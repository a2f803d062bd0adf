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
//! Version reporting shared by the binaries.

/// Git description of the `asc_model` sources the binary was built from,
/// `v{tag}-{commits since tag}-g{hash}` with a `-modified` suffix for a
/// dirty tree.
pub const GIT_VERSION: &str =
    git_version::git_version!(args = ["--tags", "--dirty=-modified"], fallback = "unknown");

/// Combines a binary's own version with the library's git version, as
/// printed by `--version`.
pub fn binary_full_version(binary_version: &str) -> String {
    format!("{binary_version} (asc_model = {GIT_VERSION})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_version_mentions_library() {
        let version = binary_full_version("1.2.3");
        assert!(version.starts_with("1.2.3 (asc_model = "));
        assert!(version.ends_with(')'));
    }
}
