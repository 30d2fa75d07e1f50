//! Closed address ranges

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::address::{to_biguint, Family};
use crate::{Cidr, Error, FormatError};
use num_bigint::BigUint;
use num_traits::One;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A closed range `[start, end]` of addresses of one family
///
/// Endpoints are always ordered: building a range from reversed endpoints
/// swaps them. Ranges order by start address, then end address.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(
    feature = "impl-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "(IpAddr, IpAddr)", into = "(IpAddr, IpAddr)")
)]
pub struct IpRange {
    start: IpAddr,
    end: IpAddr,
}

impl IpRange {
    /// Create a range from two endpoints in either order
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self, Error> {
        if Family::of(start) != Family::of(end) {
            return Err(Error::FamilyMismatch(start, end));
        }
        // `IpAddr` orders numerically within a family
        if start <= end {
            Ok(Self { start, end })
        } else {
            Ok(Self {
                start: end,
                end: start,
            })
        }
    }

    #[must_use]
    pub const fn start(&self) -> IpAddr {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> IpAddr {
        self.end
    }

    #[must_use]
    pub const fn family(&self) -> Family {
        Family::of(self.start)
    }

    /// Number of addresses in an IPv4 range
    ///
    /// `None` for IPv6 ranges, use [`Self::big_count`] instead.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        match (self.start, self.end) {
            (IpAddr::V4(start), IpAddr::V4(end)) => {
                Some(u64::from(u32::from(end)) - u64::from(u32::from(start)) + 1)
            }
            _ => None,
        }
    }

    /// Number of addresses in the range, for either family
    #[must_use]
    pub fn big_count(&self) -> BigUint {
        to_biguint(self.end) - to_biguint(self.start) + BigUint::one()
    }

    /// Whether `addr` lies within this range
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        Family::of(addr) == self.family() && self.start <= addr && addr <= self.end
    }

    /// Whether the two ranges share at least one address
    ///
    /// Ranges of different families never overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.family() == other.family() && self.start <= other.end && other.start <= self.end
    }

    /// The CIDR block covering exactly this range
    ///
    /// Fails with [`Error::UnrepresentableNetwork`] if the range is not
    /// aligned to a single block.
    pub fn network(&self) -> Result<Cidr, Error> {
        let host_bits = match (self.start, self.end) {
            (IpAddr::V4(start), IpAddr::V4(end)) => u32::from(start)
                .trailing_zeros()
                .min(u32::from(end).trailing_ones()),
            (IpAddr::V6(start), IpAddr::V6(end)) => u128::from(start)
                .trailing_zeros()
                .min(u128::from(end).trailing_ones()),
            _ => return Err(Error::FamilyMismatch(self.start, self.end)),
        };
        let prefix_len = u8::try_from(self.family().bits() - host_bits)
            .map_err(|_| Error::UnrepresentableNetwork(self.start, self.end))?;
        let cidr = Cidr::new(self.start, prefix_len)?;
        if cidr.range() == *self {
            Ok(cidr)
        } else {
            Err(Error::UnrepresentableNetwork(self.start, self.end))
        }
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Parse a single address or a CIDR block
///
/// Host bits of a CIDR block are discarded, so `192.168.1.77/24` and
/// `192.168.1.0/24` give the same range.
impl FromStr for IpRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Format(String::new(), FormatError::Empty));
        }
        if let Ok(addr) = s.parse::<IpAddr>() {
            return Ok(Self::from(addr));
        }
        Cidr::parse_parts(s)
            .map(Self::from)
            .map_err(|e| Error::Format(s.to_string(), e))
    }
}

impl From<IpAddr> for IpRange {
    fn from(addr: IpAddr) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }
}

impl From<Cidr> for IpRange {
    fn from(cidr: Cidr) -> Self {
        Self {
            start: cidr.network(),
            end: cidr.broadcast(),
        }
    }
}

impl TryFrom<(IpAddr, IpAddr)> for IpRange {
    type Error = Error;

    fn try_from((start, end): (IpAddr, IpAddr)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<IpRange> for (IpAddr, IpAddr) {
    fn from(range: IpRange) -> Self {
        (range.start, range.end)
    }
}
