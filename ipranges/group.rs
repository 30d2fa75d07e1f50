//! Named groups of regions, each owning a set of address ranges

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{IpRange, IpRangeDict};
use std::fmt::Display;

/// A region and the address ranges registered to it
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    /// Stable identifier, such as `AWS_EU_Ireland`; empty if unmapped
    pub id: String,
    /// Provider-specific name, such as `eu-west-1`
    pub name: Option<String>,
    /// Human-readable description
    pub description: Option<String>,
    pub ranges: Vec<IpRange>,
}

impl Region {
    /// Create a region without any ranges
    pub fn new(id: impl Into<String>, description: Option<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            description,
            ranges: Vec::new(),
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A named collection of regions, usually one per provider
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub name: String,
    pub regions: Vec<Region>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regions: Vec::new(),
        }
    }

    /// Find a region by its identifier
    #[must_use]
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }

    /// Build a lookup dictionary from every range to its region
    #[must_use]
    pub fn index(&self) -> IpRangeDict<&Region> {
        self.regions
            .iter()
            .flat_map(|region| region.ranges.iter().map(move |range| (*range, region)))
            .collect()
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
