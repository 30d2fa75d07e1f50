//! Fetch and parse the Amazon Web Services IP address ranges feed

// SPDX-License-Identifier: AGPL-3.0-or-later
// https://docs.aws.amazon.com/vpc/latest/userguide/aws-ip-ranges.html

pub mod region;

use ipranges::{Cidr, Group, IpRange, Region};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const AMAZON_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";
pub const GROUP_NAME: &str = "AmazonAWS";

/// Error type for fetching the Amazon feed
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request returned status {0}")]
    HttpStatus(u16),
    #[error(transparent)]
    Ureq(#[from] Box<ureq::Error>),
    #[error("Invalid feed: {0}")]
    Json(#[from] serde_json::Error),
}

/// The published feed document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feed {
    #[serde(rename = "syncToken")]
    pub sync_token: String,
    #[serde(rename = "createDate")]
    pub create_date: String,
    pub prefixes: Vec<Ipv4Prefix>,
    #[serde(default)]
    pub ipv6_prefixes: Vec<Ipv6Prefix>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ipv4Prefix {
    pub ip_prefix: Cidr,
    pub region: String,
    pub service: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ipv6Prefix {
    pub ipv6_prefix: Cidr,
    pub region: String,
    pub service: String,
}

impl Feed {
    /// Every prefix with the name of its region, IPv4 first
    pub fn entries(&self) -> impl Iterator<Item = (&str, Cidr)> {
        let v4 = self.prefixes.iter().map(|p| (p.region.as_str(), p.ip_prefix));
        let v6 = self
            .ipv6_prefixes
            .iter()
            .map(|p| (p.region.as_str(), p.ipv6_prefix));
        v4.chain(v6)
    }

    /// Collect the prefixes into a group with one region per identifier
    ///
    /// Regions are ordered by identifier and each keeps its distinct ranges
    /// in feed order. Regions missing from the mapping table are left out.
    pub fn to_group(&self) -> Group {
        let mut regions: BTreeMap<&str, Region> = BTreeMap::new();
        let mut unmapped = BTreeSet::new();
        for (name, cidr) in self.entries() {
            let Some(info) = region::lookup(name) else {
                if unmapped.insert(name) {
                    log::warn!("No mapping for region {name}, skipping its prefixes");
                }
                continue;
            };
            let region = regions.entry(info.id).or_insert_with(|| {
                Region::new(
                    info.id,
                    Some(info.description.to_string()),
                    Some(name.to_string()),
                )
            });
            let range = IpRange::from(cidr);
            if !region.ranges.contains(&range) {
                region.ranges.push(range);
            }
        }
        let mut group = Group::new(GROUP_NAME);
        group.regions = regions.into_values().collect();
        log::debug!(
            "Built {} regions, {} unmapped",
            group.regions.len(),
            unmapped.len()
        );
        group
    }
}

/// Download and decode the feed at `url`
pub fn fetch(url: &str) -> Result<Feed, Error> {
    log::info!("Fetching {url}");
    let response = ureq::get(url).call().map_err(Box::new)?;
    match response.status() {
        200 => {
            let reader = std::io::BufReader::new(response.into_reader());
            let feed: Feed = serde_json::from_reader(reader)?;
            log::info!(
                "Fetched {} IPv4 and {} IPv6 prefixes created {}",
                feed.prefixes.len(),
                feed.ipv6_prefixes.len(),
                feed.create_date
            );
            Ok(feed)
        }
        status => Err(Error::HttpStatus(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "syncToken": "1700000000",
  "createDate": "2023-11-14-22-13-20",
  "prefixes": [
    {"ip_prefix": "3.5.140.0/22", "region": "ap-northeast-2", "service": "AMAZON", "network_border_group": "ap-northeast-2"},
    {"ip_prefix": "46.51.128.0/18", "region": "eu-west-1", "service": "AMAZON", "network_border_group": "eu-west-1"},
    {"ip_prefix": "46.51.128.0/18", "region": "eu-west-1", "service": "EC2", "network_border_group": "eu-west-1"},
    {"ip_prefix": "23.20.0.0/14", "region": "us-east-1", "service": "EC2", "network_border_group": "us-east-1"},
    {"ip_prefix": "176.34.128.0/17", "region": "eu-west-1", "service": "EC2", "network_border_group": "eu-west-1"},
    {"ip_prefix": "52.94.76.0/22", "region": "GLOBAL", "service": "AMAZON", "network_border_group": "GLOBAL"}
  ],
  "ipv6_prefixes": [
    {"ipv6_prefix": "2a05:d018::/36", "region": "eu-west-1", "service": "AMAZON", "network_border_group": "eu-west-1"},
    {"ipv6_prefix": "2600:1f18::/33", "region": "us-east-1", "service": "EC2", "network_border_group": "us-east-1"}
  ]
}"#;

    fn sample() -> Feed {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_feed() {
        let feed = sample();
        assert_eq!(feed.sync_token, "1700000000");
        assert_eq!(feed.prefixes.len(), 6);
        assert_eq!(feed.ipv6_prefixes.len(), 2);
        assert_eq!(feed.entries().count(), 8);
        assert_eq!(feed.prefixes[1].ip_prefix.to_string(), "46.51.128.0/18");
    }

    #[test]
    fn test_parse_feed_rejects_bad_prefix() {
        let bad = SAMPLE.replace("23.20.0.0/14", "23.20.0.0/40");
        assert!(serde_json::from_str::<Feed>(&bad).is_err());
    }

    #[test]
    fn test_to_group() {
        let group = sample().to_group();
        assert_eq!(group.name, GROUP_NAME);
        let ids: Vec<_> = group.regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["AWS_EU_Ireland", "AWS_US_Virginia", "Global"]);

        let ireland = group.region("AWS_EU_Ireland").unwrap();
        assert_eq!(ireland.name.as_deref(), Some("eu-west-1"));
        assert_eq!(ireland.description.as_deref(), Some("EU (Ireland)"));
        // Duplicate prefix listed under two services is kept once
        let ranges: Vec<_> = ireland.ranges.iter().map(ToString::to_string).collect();
        assert_eq!(
            ranges,
            [
                "46.51.128.0 - 46.51.191.255",
                "176.34.128.0 - 176.34.255.255",
                "2a05:d018:: - 2a05:d018:fff:ffff:ffff:ffff:ffff:ffff",
            ]
        );
        assert_eq!(group.region("Global").unwrap().name.as_deref(), Some("GLOBAL"));
    }

    #[test]
    fn test_group_lookup() {
        let group = sample().to_group();
        let index = group.index();
        assert_eq!(index["23.21.1.1".parse().unwrap()].id, "AWS_US_Virginia");
        assert_eq!(index["2600:1f18::1".parse().unwrap()].id, "AWS_US_Virginia");
        assert_eq!(index["46.51.190.7".parse().unwrap()].id, "AWS_EU_Ireland");
        // Unmapped region
        assert!(!index.contains("3.5.140.1".parse().unwrap()));
    }

    #[test]
    fn test_group_writes_as_xml() {
        let group = sample().to_group();
        let xml = ipranges::xml::to_string(&group).unwrap();
        assert!(xml.contains(r#"<group name="AmazonAWS">"#));
        assert!(xml.contains(
            r#"<range network="23.20.0.0/14" from="23.20.0.0" to="23.23.255.255"/>"#
        ));
        assert_eq!(ipranges::xml::from_str(&xml).unwrap(), group);
    }

    #[test]
    #[cfg(feature = "test-real-internet")]
    fn test_fetch() {
        let feed = fetch(AMAZON_URL).unwrap();
        assert!(!feed.prefixes.is_empty());
        assert!(!feed.ipv6_prefixes.is_empty());
        let group = feed.to_group();
        assert!(group.region("AWS_US_Virginia").is_some());
    }
}
