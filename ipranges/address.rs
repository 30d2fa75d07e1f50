//! Address family and subnet helpers

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{Error, FormatError};
use num_bigint::BigUint;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP address family
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Family of an address
    #[must_use]
    pub const fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Number of bits in an address of this family
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Top `prefix_len` bits of an IPv4 address set, saturating at 32
pub(crate) const fn mask_v4(prefix_len: u32) -> u32 {
    match u32::MAX.checked_shl(32u32.saturating_sub(prefix_len)) {
        Some(mask) => mask,
        None => 0,
    }
}

/// Top `prefix_len` bits of an IPv6 address set, saturating at 128
pub(crate) const fn mask_v6(prefix_len: u32) -> u128 {
    match u128::MAX.checked_shl(128u32.saturating_sub(prefix_len)) {
        Some(mask) => mask,
        None => 0,
    }
}

/// Build a subnet mask with the top `prefix_len` bits set
pub fn subnet_mask(family: Family, prefix_len: u32) -> Result<IpAddr, Error> {
    if prefix_len > family.bits() {
        return Err(Error::Format(
            format!("/{prefix_len}"),
            FormatError::PrefixTooLong(prefix_len, family.bits()),
        ));
    }
    Ok(match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::from(mask_v4(prefix_len))),
        Family::V6 => IpAddr::V6(Ipv6Addr::from(mask_v6(prefix_len))),
    })
}

/// First address of the subnet (`addr & mask`)
pub fn network_address(addr: IpAddr, mask: IpAddr) -> Result<IpAddr, Error> {
    match (addr, mask) {
        (IpAddr::V4(a), IpAddr::V4(m)) => {
            Ok(IpAddr::V4(Ipv4Addr::from(u32::from(a) & u32::from(m))))
        }
        (IpAddr::V6(a), IpAddr::V6(m)) => {
            Ok(IpAddr::V6(Ipv6Addr::from(u128::from(a) & u128::from(m))))
        }
        _ => Err(Error::FamilyMismatch(addr, mask)),
    }
}

/// Last address of the subnet (`addr | !mask`)
pub fn broadcast_address(addr: IpAddr, mask: IpAddr) -> Result<IpAddr, Error> {
    match (addr, mask) {
        (IpAddr::V4(a), IpAddr::V4(m)) => {
            Ok(IpAddr::V4(Ipv4Addr::from(u32::from(a) | !u32::from(m))))
        }
        (IpAddr::V6(a), IpAddr::V6(m)) => {
            Ok(IpAddr::V6(Ipv6Addr::from(u128::from(a) | !u128::from(m))))
        }
        _ => Err(Error::FamilyMismatch(addr, mask)),
    }
}

/// Whether two addresses share the same network under `mask`
pub fn in_same_subnet(first: IpAddr, second: IpAddr, mask: IpAddr) -> Result<bool, Error> {
    Ok(network_address(first, mask)? == network_address(second, mask)?)
}

/// Unsigned integer value of an address
#[must_use]
pub fn to_biguint(addr: IpAddr) -> BigUint {
    match addr {
        IpAddr::V4(a) => BigUint::from(u32::from(a)),
        IpAddr::V6(a) => BigUint::from(u128::from(a)),
    }
}
