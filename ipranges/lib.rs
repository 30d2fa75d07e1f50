//! IP address ranges and a range-keyed lookup dictionary
//!
//! [`IpRange`] is a closed interval of addresses of one family. [`IpRangeDict`]
//! maps many such ranges to values and answers "which range contains this
//! address" for IPv4 and IPv6 independently.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod address;
pub mod cidr;
mod dict;
pub mod group;
pub mod range;
#[cfg(feature = "xml")]
pub mod xml;

pub use address::Family;
pub use cidr::{Cidr, Cidr4, Cidr6};
pub use dict::IpRangeDict;
pub use group::{Group, Region};
pub use range::IpRange;

use std::net::IpAddr;

/// Reasons an address or CIDR text failed to parse
#[derive(Copy, Clone, Debug, thiserror::Error, Eq, PartialEq)]
pub enum FormatError {
    #[error("empty input")]
    Empty,
    #[error("expected an address or CIDR notation (such as \"192.168.1.0/24\")")]
    NotCidr,
    #[error("cannot parse network part")]
    Address,
    #[error("cannot parse prefix length")]
    PrefixLength,
    #[error("prefix length {0} is larger than {1}")]
    PrefixTooLong(u32, u32),
}

/// Address range errors
#[derive(Clone, Debug, thiserror::Error, Eq, PartialEq)]
pub enum Error {
    #[error("invalid address range {0:?}: {1}")]
    Format(String, FormatError),
    #[error("cannot mix IPv4 and IPv6 addresses ({0} and {1})")]
    FamilyMismatch(IpAddr, IpAddr),
    #[error("{0} - {1} is not a single CIDR block")]
    UnrepresentableNetwork(IpAddr, IpAddr),
    #[error("no range contains {0}")]
    NotFound(IpAddr),
}

impl Error {
    /// Whether this error comes from malformed text
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(self, Self::Format(..))
    }
}
