// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logical file-system paths
//!
//! A [`Path`] is an immutable sequence of non-empty components; the root is
//! the empty sequence. Paths are the key for tree nodes, lock slots and
//! storage-node files alike, so equality and hashing are structural.

use crate::error::ApiContractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '/';

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    components: Vec<String>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an absolute path string.
    ///
    /// Repeated and trailing separators collapse (`//a/b/` is `/a/b`).
    /// Rejected: the empty string, relative paths, `:` anywhere, NUL bytes,
    /// and `.`/`..` components.
    pub fn parse(s: &str) -> Result<Self, ApiContractError> {
        if s.is_empty() {
            return Err(ApiContractError::InvalidPath("path must not be empty".into()));
        }
        if !s.starts_with(SEPARATOR) {
            return Err(ApiContractError::InvalidPath(format!(
                "path must be absolute: {s}"
            )));
        }
        if s.contains(':') || s.contains('\0') {
            return Err(ApiContractError::InvalidPath(format!(
                "path contains a forbidden character: {s}"
            )));
        }

        let mut components = Vec::new();
        for component in s.split(SEPARATOR).filter(|c| !c.is_empty()) {
            if component == "." || component == ".." {
                return Err(ApiContractError::InvalidPath(format!(
                    "relative component '{component}' in {s}"
                )));
            }
            components.push(component.to_string());
        }
        Ok(Self { components })
    }

    /// Whether `s` would parse
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn parent(&self) -> Result<Path, ApiContractError> {
        match self.components.split_last() {
            Some((_, rest)) => Ok(Path {
                components: rest.to_vec(),
            }),
            None => Err(ApiContractError::InvalidPath(
                "the root directory has no parent".into(),
            )),
        }
    }

    /// Child of this path with one more component
    pub fn join(&self, name: &str) -> Result<Path, ApiContractError> {
        if name.is_empty() || name.contains(SEPARATOR) || name == "." || name == ".." {
            return Err(ApiContractError::InvalidPath(format!(
                "invalid component name: {name:?}"
            )));
        }
        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Path { components })
    }

    /// Every prefix of this path from the root down to (and including) itself
    pub fn ancestors_inclusive(&self) -> Vec<Path> {
        (0..=self.components.len())
            .map(|depth| Path {
                components: self.components[..depth].to_vec(),
            })
            .collect()
    }

    /// Whether `self` lies at or below `other`
    pub fn is_subpath_of(&self, other: &Path) -> bool {
        self.components.starts_with(&other.components)
    }

    /// Location of this path under a local directory
    pub fn to_local(&self, root: &std::path::Path) -> std::path::PathBuf {
        let mut local = root.to_path_buf();
        local.extend(self.components.iter());
        local
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = ApiContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Path::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}
