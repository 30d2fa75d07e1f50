//! XML exchange format for region groups
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <group name="AmazonAWS">
//!   <region id="AWS_EU_Ireland" name="eu-west-1" description="EU (Ireland)">
//!     <range network="46.51.128.0/18" from="46.51.128.0" to="46.51.191.255"/>
//!   </region>
//! </group>
//! ```
//!
//! A range is given by `network` (alias `subnet`), by `from` and `to`, or by
//! all three, in which case they must agree. Element and attribute names are
//! case-insensitive.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{Group, IpRange, Region};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::net::IpAddr;
use std::path::Path;

/// Error type for reading and writing region groups
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Attr(#[from] AttrError),
    #[error("invalid root element {0:?}, expecting \"group\"")]
    InvalidRoot(String),
    #[error("missing \"group\" element")]
    MissingGroup,
    #[error("missing \"region\" element")]
    MissingRegion,
    #[error("missing {0:?} or \"network\" attribute for range")]
    MissingAttribute(&'static str),
    #[error("invalid {0} address {1:?}")]
    InvalidAddress(&'static str, String),
    #[error("{attr} address in range does not match calculated value, data seems to be inconsistent ({given} != {computed})")]
    Inconsistent {
        attr: &'static str,
        given: IpAddr,
        computed: IpAddr,
    },
    #[error(transparent)]
    Range(#[from] crate::Error),
    #[error("no id for region {0:?}")]
    MissingRegionId(String),
}

/// Lower-cased attribute names and unescaped values of an element
fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>, Error> {
    e.attributes()
        .map(|attr| {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = attr.unescape_value()?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn read_group_element(e: &BytesStart) -> Result<Group, Error> {
    let mut group = Group::default();
    for (key, value) in attributes(e)? {
        if key == "name" {
            group.name = value;
        }
    }
    Ok(group)
}

fn read_region_element(e: &BytesStart) -> Result<Region, Error> {
    let mut region = Region::default();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "id" => region.id = value.trim().to_string(),
            "name" => region.name = Some(value.trim().to_string()),
            "description" => region.description = Some(value),
            _ => {}
        }
    }
    Ok(region)
}

fn parse_addr(attr: &'static str, value: &str) -> Result<IpAddr, Error> {
    value
        .parse()
        .map_err(|_| Error::InvalidAddress(attr, value.to_string()))
}

fn check_consistent(attr: &'static str, given: Option<IpAddr>, computed: IpAddr) -> Result<(), Error> {
    match given {
        Some(given) if given != computed => Err(Error::Inconsistent {
            attr,
            given,
            computed,
        }),
        _ => Ok(()),
    }
}

fn read_range_element(e: &BytesStart) -> Result<IpRange, Error> {
    let mut network = None;
    let mut from = None;
    let mut to = None;
    for (key, value) in attributes(e)? {
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "network" | "subnet" => network = Some(value),
            "from" => from = Some(value),
            "to" => to = Some(value),
            _ => {}
        }
    }
    let computed = network.as_deref().map(str::parse::<IpRange>).transpose()?;
    let from = from.map(|s| parse_addr("from", &s)).transpose()?;
    let to = to.map(|s| parse_addr("to", &s)).transpose()?;
    match (computed, from, to) {
        (Some(range), from, to) => {
            check_consistent("from", from, range.start())?;
            check_consistent("to", to, range.end())?;
            Ok(range)
        }
        (None, Some(from), Some(to)) => Ok(IpRange::new(from, to)?),
        (None, None, _) => Err(Error::MissingAttribute("from")),
        (None, Some(_), None) => Err(Error::MissingAttribute("to")),
    }
}

/// Reading state while walking the element tree
#[derive(Default)]
struct GroupReader {
    group: Option<Group>,
    /// Whether the innermost depth-2 element is a region
    in_region: bool,
    level: usize,
    skip_foreign_root: bool,
}

impl GroupReader {
    /// Handle an opening tag
    ///
    /// Returns `Ok(false)` if the document should be skipped.
    fn open(&mut self, e: &BytesStart) -> Result<bool, Error> {
        self.level += 1;
        let name = element_name(e);
        match (self.level, name.to_ascii_lowercase().as_str()) {
            (1, "group") => self.group = Some(read_group_element(e)?),
            (1, _) if self.skip_foreign_root => {
                log::debug!("skipping document with root element {name:?}");
                return Ok(false);
            }
            (1, _) => return Err(Error::InvalidRoot(name)),
            (2, "region") => {
                let group = self.group.as_mut().ok_or(Error::MissingGroup)?;
                let region = read_region_element(e)?;
                log::debug!("found region {:?} in group {:?}", region.id, group.name);
                group.regions.push(region);
                self.in_region = true;
            }
            (2, _) => self.in_region = false,
            (3, "range" | "iprange") => {
                let group = self.group.as_mut().ok_or(Error::MissingGroup)?;
                let region = group
                    .regions
                    .last_mut()
                    .filter(|_| self.in_region)
                    .ok_or(Error::MissingRegion)?;
                region.ranges.push(read_range_element(e)?);
            }
            _ => {}
        }
        Ok(true)
    }

    /// Handle a closing tag
    ///
    /// Returns `true` once the root element is closed.
    fn close(&mut self) -> bool {
        self.level = self.level.saturating_sub(1);
        self.level == 0
    }
}

fn read_group<R: BufRead>(reader: R, skip_foreign_root: bool) -> Result<Option<Group>, Error> {
    let mut reader = Reader::from_reader(reader);
    let mut state = GroupReader {
        skip_foreign_root,
        ..GroupReader::default()
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if !state.open(&e)? {
                    return Ok(None);
                }
            }
            Event::Empty(e) => {
                if !state.open(&e)? {
                    return Ok(None);
                }
                if state.close() {
                    break;
                }
            }
            Event::End(_) => {
                if state.close() {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    state.group.map(Some).ok_or(Error::MissingGroup)
}

/// Read a group document
pub fn from_reader<R: BufRead>(reader: R) -> Result<Group, Error> {
    read_group(reader, false)?.ok_or(Error::MissingGroup)
}

/// Read a group document from a string
pub fn from_str(s: &str) -> Result<Group, Error> {
    from_reader(s.as_bytes())
}

/// Read every `*.xml` group document in a directory
///
/// Documents whose root is not a `group` element, and groups without any
/// regions, are skipped.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Group>, Error> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|path| path.extension().is_some_and(|ext| ext == "xml"));
    paths.sort();
    let mut groups = Vec::new();
    for path in paths {
        log::debug!("reading {}", path.display());
        let file = BufReader::new(File::open(&path)?);
        match read_group(file, true)? {
            Some(group) if !group.regions.is_empty() => groups.push(group),
            _ => log::debug!("no regions in {}", path.display()),
        }
    }
    Ok(groups)
}

/// Write a group document
///
/// Ranges are written in ascending order, with a `network` attribute when
/// they form a single CIDR block. Every region must have an id.
pub fn to_writer<W: Write>(writer: W, group: &Group) -> Result<(), Error> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    let mut root = BytesStart::new("group");
    root.push_attribute(("name", group.name.as_str()));
    writer.write_event(Event::Start(root))?;
    for region in &group.regions {
        if region.id.is_empty() {
            return Err(Error::MissingRegionId(
                region.name.clone().unwrap_or_default(),
            ));
        }
        let mut elem = BytesStart::new("region");
        elem.push_attribute(("id", region.id.as_str()));
        if let Some(name) = &region.name {
            elem.push_attribute(("name", name.as_str()));
        }
        if let Some(description) = &region.description {
            elem.push_attribute(("description", description.as_str()));
        }
        writer.write_event(Event::Start(elem))?;
        let mut ranges = region.ranges.clone();
        ranges.sort();
        for range in ranges {
            let mut elem = BytesStart::new("range");
            if let Ok(network) = range.network() {
                elem.push_attribute(("network", network.to_string().as_str()));
            }
            elem.push_attribute(("from", range.start().to_string().as_str()));
            elem.push_attribute(("to", range.end().to_string().as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new("region")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("group")))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

/// Write a group document into a string
pub fn to_string(group: &Group) -> Result<String, Error> {
    let mut buf = Vec::new();
    to_writer(&mut buf, group)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_incorrect_root_element() {
        let err = from_str("<root></root>").unwrap_err();
        assert!(matches!(err, Error::InvalidRoot(name) if name == "root"));
    }

    #[test]
    fn test_foreign_root_is_skipped_when_lenient() {
        assert!(read_group("<root><region/></root>".as_bytes(), true)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(from_str(""), Err(Error::MissingGroup)));
    }

    #[test]
    fn test_root_element_with_name() {
        let group = from_str("<group name='test'></group>").unwrap();
        assert_eq!(group.name, "test");
        assert!(group.regions.is_empty());

        let group = from_str("<GROUP Name='test'/>").unwrap();
        assert_eq!(group.name, "test");
    }

    #[test]
    fn test_region_element() {
        let group = from_str(
            "<group><region id='testid' name=' testname ' description='the &amp; description' /></group>",
        )
        .unwrap();
        assert_eq!(group.regions.len(), 1);
        let region = &group.regions[0];
        assert_eq!(region.id, "testid");
        assert_eq!(region.name.as_deref(), Some("testname"));
        assert_eq!(region.description.as_deref(), Some("the & description"));
    }

    #[test]
    fn test_multiple_region_elements() {
        let group = from_str("<group><region id='test1' /><region id='test2'></region></group>").unwrap();
        let ids: Vec<_> = group.regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["test1", "test2"]);
    }

    #[test]
    fn test_range_with_network_only() {
        let group = from_str("<group><region><range network='192.168.1.1/16' /></region></group>").unwrap();
        assert_eq!(group.regions[0].ranges.len(), 1);
        let range = group.regions[0].ranges[0];
        assert_eq!(range.start(), ip("192.168.0.0"));
        assert_eq!(range.end(), ip("192.168.255.255"));
    }

    #[test]
    fn test_range_with_subnet_alias() {
        let group = from_str("<group><region><iprange subnet='2001:db8::/32' /></region></group>").unwrap();
        assert_eq!(group.regions[0].ranges[0], "2001:db8::/32".parse().unwrap());
    }

    #[test]
    fn test_range_inconsistent_from() {
        let err = from_str(
            "<group><region><range network='192.168.1.1/16' from='192.168.123.123' /></region></group>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Inconsistent { attr: "from", .. }));
    }

    #[test]
    fn test_range_inconsistent_to() {
        let err = from_str(
            "<group><region><range network='192.168.1.1/16' to='192.168.123.123' /></region></group>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Inconsistent { attr: "to", .. }));
    }

    #[test]
    fn test_range_consistent_endpoints() {
        let group = from_str(
            "<group><region><range network='10.0.0.0/8' from='10.0.0.0' to='10.255.255.255' /></region></group>",
        )
        .unwrap();
        assert_eq!(group.regions[0].ranges[0], "10.0.0.0/8".parse().unwrap());
    }

    #[test]
    fn test_range_missing_to() {
        let err = from_str("<group><region><range from='192.168.0.0' /></region></group>").unwrap_err();
        assert!(matches!(err, Error::MissingAttribute("to")));
    }

    #[test]
    fn test_range_missing_from() {
        let err = from_str("<group><region><range to='192.168.0.0' /></region></group>").unwrap_err();
        assert!(matches!(err, Error::MissingAttribute("from")));
    }

    #[test]
    fn test_range_invalid_values() {
        let err = from_str("<group><region><range from='1.2.3' to='1.2.3.4' /></region></group>").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress("from", _)));
        let err = from_str("<group><region><range network='1.2.3.4/40' /></region></group>").unwrap_err();
        assert!(matches!(err, Error::Range(e) if e.is_format()));
        let err = from_str("<group><region><range from='1.2.3.4' to='::1' /></region></group>").unwrap_err();
        assert!(matches!(err, Error::Range(crate::Error::FamilyMismatch(..))));
    }

    #[test]
    fn test_range_with_from_and_to() {
        let group = from_str("<group><region><range from='192.168.0.1' to='192.168.0.2' /></region></group>").unwrap();
        let range = group.regions[0].ranges[0];
        assert_eq!(range.start(), ip("192.168.0.1"));
        assert_eq!(range.end(), ip("192.168.0.2"));
    }

    #[test]
    fn test_multiple_range_elements() {
        let group = from_str(
            "<group><region><range network='192.1.1.1/16' /><range network='192.2.1.1/16' /></region></group>",
        )
        .unwrap();
        let ranges = &group.regions[0].ranges;
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start(), ip("192.1.0.0"));
        assert_eq!(ranges[0].end(), ip("192.1.255.255"));
        assert_eq!(ranges[1].start(), ip("192.2.0.0"));
        assert_eq!(ranges[1].end(), ip("192.2.255.255"));
    }

    #[test]
    fn test_range_outside_region() {
        let err = from_str("<group><other><range network='10.0.0.0/8' /></other></group>").unwrap_err();
        assert!(matches!(err, Error::MissingRegion));
    }

    fn sample_group() -> Group {
        let mut region = Region::new(
            "AWS_EU_Ireland",
            Some("EU (Ireland)".to_string()),
            Some("eu-west-1".to_string()),
        );
        region.ranges = vec![
            "176.34.128.0/17".parse().unwrap(),
            "46.51.128.0/18".parse().unwrap(),
            IpRange::new(ip("10.0.0.1"), ip("10.0.0.2")).unwrap(),
            "2a05:d018::/36".parse().unwrap(),
        ];
        let mut group = Group::new("AmazonAWS");
        group.regions.push(region);
        group
    }

    #[test]
    fn test_write_group() {
        let xml = to_string(&sample_group()).unwrap();
        let expected = r#"<?xml version="1.0" encoding="utf-8"?>
<group name="AmazonAWS">
  <region id="AWS_EU_Ireland" name="eu-west-1" description="EU (Ireland)">
    <range from="10.0.0.1" to="10.0.0.2"/>
    <range network="46.51.128.0/18" from="46.51.128.0" to="46.51.191.255"/>
    <range network="176.34.128.0/17" from="176.34.128.0" to="176.34.255.255"/>
    <range network="2a05:d018::/36" from="2a05:d018::" to="2a05:d018:fff:ffff:ffff:ffff:ffff:ffff"/>
  </region>
</group>
"#;
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_written_group_reads_back() {
        let group = sample_group();
        let read = from_str(&to_string(&group).unwrap()).unwrap();
        assert_eq!(read.name, group.name);
        let mut expected = group.regions[0].ranges.clone();
        expected.sort();
        assert_eq!(read.regions[0].ranges, expected);
        assert_eq!(read.regions[0].description, group.regions[0].description);
    }

    #[test]
    fn test_write_requires_region_id() {
        let mut group = Group::new("test");
        group
            .regions
            .push(Region::new("", None, Some("mars-north-1".to_string())));
        let err = to_string(&group).unwrap_err();
        assert!(matches!(err, Error::MissingRegionId(name) if name == "mars-north-1"));
    }

    #[test]
    fn test_load_dir() {
        let dir = std::env::temp_dir().join(format!("ipranges-load-dir-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.xml"), to_string(&sample_group()).unwrap()).unwrap();
        std::fs::write(dir.join("a.xml"), "<group name='empty'></group>").unwrap();
        std::fs::write(dir.join("c.xml"), "<config><region/></config>").unwrap();
        std::fs::write(dir.join("notes.txt"), "<group/>").unwrap();
        let groups = load_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "AmazonAWS");
    }
}
