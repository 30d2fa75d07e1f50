//! Mapping of Amazon region names to stable region identifiers

// SPDX-License-Identifier: AGPL-3.0-or-later

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Identifier and description of a known region
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegionInfo {
    pub id: &'static str,
    pub description: &'static str,
}

lazy_static! {
    static ref REGIONS: HashMap<&'static str, RegionInfo> = [
        ("ap-northeast-1", "AWS_AsiaPacific_Tokyo", "Asia Pacific (Tokyo)"),
        ("ap-southeast-1", "AWS_AsiaPacific_Singapore", "Asia Pacific (Singapore)"),
        ("ap-southeast-2", "AWS_AsiaPacific_Sydney", "Asia Pacific (Sydney)"),
        ("cn-north-1", "AWS_China_Beijing", "China (Beijing)"),
        ("eu-central-1", "AWS_EU_Frankfurt", "EU (Frankfurt)"),
        ("eu-west-1", "AWS_EU_Ireland", "EU (Ireland)"),
        ("global", "Global", "Global"),
        ("sa-east-1", "AWS_SouthAmerica_SaoPaulo", "South America (Sao Paulo)"),
        ("us-east-1", "AWS_US_Virginia", "US East (Northern Virginia)"),
        ("us-gov-west-1", "AWS_GovCloud", "GovCloud"),
        ("us-west-1", "AWS_US_NorthernCalifornia", "US West (Northern California)"),
        ("us-west-2", "AWS_US_Oregon", "US West (Oregon)"),
    ]
    .iter()
    .map(|&(name, id, description)| (name, RegionInfo { id, description }))
    .collect();
}

/// Look up a region by the name Amazon gives it
///
/// Names are matched case-insensitively, ignoring surrounding whitespace.
pub fn lookup(name: &str) -> Option<RegionInfo> {
    REGIONS.get(name.trim().to_ascii_lowercase().as_str()).copied()
}
