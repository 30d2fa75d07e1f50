//! CIDR block representation

// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::module_name_repetitions)]

use crate::address::{mask_v4, mask_v6};
use crate::{Error, FormatError, IpRange};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// A IPv4 CIDR block
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct Cidr4 {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl fmt::Display for Cidr4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl Cidr4 {
    /// Create a new CIDR block
    ///
    /// Host bits in `addr` are kept as given; [`Self::network`] masks them.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, Error> {
        if prefix_len > 32 {
            return Err(Error::Format(
                format!("{addr}/{prefix_len}"),
                FormatError::PrefixTooLong(u32::from(prefix_len), 32),
            ));
        }
        Ok(Self { addr, prefix_len })
    }

    #[must_use]
    pub const fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// First address of the block
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & mask_v4(u32::from(self.prefix_len)))
    }

    /// Last address of the block
    #[must_use]
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) | !mask_v4(u32::from(self.prefix_len)))
    }
}

/// A IPv6 CIDR block
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct Cidr6 {
    addr: Ipv6Addr,
    prefix_len: u8,
}

impl fmt::Display for Cidr6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl Cidr6 {
    /// Create a new CIDR block
    pub fn new(addr: Ipv6Addr, prefix_len: u8) -> Result<Self, Error> {
        if prefix_len > 128 {
            return Err(Error::Format(
                format!("{addr}/{prefix_len}"),
                FormatError::PrefixTooLong(u32::from(prefix_len), 128),
            ));
        }
        Ok(Self { addr, prefix_len })
    }

    #[must_use]
    pub const fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    #[must_use]
    pub fn network(&self) -> Ipv6Addr {
        Ipv6Addr::from(u128::from(self.addr) & mask_v6(u32::from(self.prefix_len)))
    }

    #[must_use]
    pub fn broadcast(&self) -> Ipv6Addr {
        Ipv6Addr::from(u128::from(self.addr) | !mask_v6(u32::from(self.prefix_len)))
    }
}

/// A CIDR block
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(
    feature = "impl-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum Cidr {
    V4(Cidr4),
    V6(Cidr6),
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(cidr) => write!(f, "{cidr}"),
            Self::V6(cidr) => write!(f, "{cidr}"),
        }
    }
}

impl Cidr {
    /// Create a new CIDR block of either family
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, Error> {
        match addr {
            IpAddr::V4(addr) => Cidr4::new(addr, prefix_len).map(Self::V4),
            IpAddr::V6(addr) => Cidr6::new(addr, prefix_len).map(Self::V6),
        }
    }

    #[must_use]
    pub const fn into_parts(self) -> (IpAddr, u8) {
        match self {
            Self::V4(cidr) => (IpAddr::V4(cidr.addr), cidr.prefix_len),
            Self::V6(cidr) => (IpAddr::V6(cidr.addr), cidr.prefix_len),
        }
    }

    #[must_use]
    pub fn network(&self) -> IpAddr {
        match self {
            Self::V4(cidr) => IpAddr::V4(cidr.network()),
            Self::V6(cidr) => IpAddr::V6(cidr.network()),
        }
    }

    #[must_use]
    pub fn broadcast(&self) -> IpAddr {
        match self {
            Self::V4(cidr) => IpAddr::V4(cidr.broadcast()),
            Self::V6(cidr) => IpAddr::V6(cidr.broadcast()),
        }
    }

    /// All addresses covered by this block
    #[must_use]
    pub fn range(&self) -> IpRange {
        IpRange::from(*self)
    }

    /// Split `address/prefix` text, reporting only the failure reason
    pub(crate) fn parse_parts(s: &str) -> Result<Self, FormatError> {
        let (addr, prefix_len) = s.split_once('/').ok_or(FormatError::NotCidr)?;
        let addr: IpAddr = addr.trim().parse().map_err(|_| FormatError::Address)?;
        let prefix_len: u32 = prefix_len
            .trim()
            .parse()
            .map_err(|_| FormatError::PrefixLength)?;
        let bits = crate::Family::of(addr).bits();
        if prefix_len > bits {
            return Err(FormatError::PrefixTooLong(prefix_len, bits));
        }
        // Bounded by 128 above
        let prefix_len = u8::try_from(prefix_len).map_err(|_| FormatError::PrefixLength)?;
        Ok(match addr {
            IpAddr::V4(addr) => Self::V4(Cidr4 { addr, prefix_len }),
            IpAddr::V6(addr) => Self::V6(Cidr6 { addr, prefix_len }),
        })
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Format(String::new(), FormatError::Empty));
        }
        Self::parse_parts(s).map_err(|e| Error::Format(s.to_string(), e))
    }
}

impl TryFrom<String> for Cidr {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}
