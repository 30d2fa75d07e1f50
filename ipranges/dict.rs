//! Range-keyed lookup dictionary

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{Error, IpRange};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::ops::Index;
use std::sync::OnceLock;

/// Ranges of one address family, bucketed by start address
///
/// Each bucket maps end addresses to values, so ranges sharing a start
/// address are kept in ascending order of their end. Callers pass
/// `start <= end`.
#[derive(Clone, Debug)]
struct FamilyMap<K, T> {
    buckets: BTreeMap<K, BTreeMap<K, T>>,
    /// Sorted start keys, emptied on every insertion
    keys: OnceLock<Vec<K>>,
}

impl<K, T> Default for FamilyMap<K, T> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
            keys: OnceLock::new(),
        }
    }
}

impl<K: Copy + Ord, T> FamilyMap<K, T> {
    fn insert(&mut self, start: K, end: K, value: T) {
        self.buckets.entry(start).or_default().insert(end, value);
        self.keys.take();
    }

    fn keys(&self) -> &[K] {
        self.keys
            .get_or_init(|| self.buckets.keys().copied().collect())
    }

    fn get(&self, point: K) -> Option<&T> {
        let keys = self.keys();
        let index = match keys.binary_search(&point) {
            Ok(index) => index,
            // Smaller than every start address
            Err(0) => return None,
            Err(insert_at) => insert_at - 1,
        };
        self.buckets
            .get(&keys[index])?
            .range(point..)
            .next()
            .map(|(_, value)| value)
    }

    fn len(&self) -> usize {
        self.buckets.values().map(BTreeMap::len).sum()
    }
}

/// A dictionary from address ranges to values
///
/// Lookups binary-search the greatest start address not above the queried
/// address, then pick the first range in that bucket whose end is not below
/// it. This takes `O(log n + k)` time for `k` ranges sharing a start address.
///
/// # Overlapping ranges
///
/// Only the nearest bucket is searched. With disjoint ranges (such as the
/// address blocks a provider publishes) every lookup is exact, but an address
/// covered by a range that starts before the nearest preceding start address
/// is not found:
///
/// ```
/// # use ipranges::{IpRange, IpRangeDict};
/// let mut dict = IpRangeDict::new();
/// dict.insert_range(&"10.0.0.0/8".parse().unwrap(), "outer");
/// dict.insert_range(&"10.1.0.0/16".parse().unwrap(), "inner");
/// assert_eq!(dict.get("10.1.2.3".parse().unwrap()), Some(&"inner"));
/// assert_eq!(dict.get("10.2.0.0".parse().unwrap()), None);
/// ```
///
/// Cached state is rebuilt lazily after insertions. Mutation needs `&mut self`;
/// wrap the dictionary in a lock or share it immutably for concurrent use.
#[derive(Clone, Debug)]
pub struct IpRangeDict<T> {
    v4: FamilyMap<u32, T>,
    v6: FamilyMap<u128, T>,
    len: OnceLock<usize>,
}

impl<T> IpRangeDict<T> {
    /// Create an empty dictionary
    #[must_use]
    pub fn new() -> Self {
        Self {
            v4: FamilyMap::default(),
            v6: FamilyMap::default(),
            len: OnceLock::new(),
        }
    }

    /// Associate `value` with the range between two endpoints
    ///
    /// Endpoints may be given in either order. Inserting a range that is
    /// already present replaces its value.
    pub fn insert(&mut self, start: IpAddr, end: IpAddr, value: T) -> Result<(), Error> {
        let range = IpRange::new(start, end)?;
        self.insert_range(&range, value);
        Ok(())
    }

    /// Associate `value` with `range`
    pub fn insert_range(&mut self, range: &IpRange, value: T) {
        match (range.start(), range.end()) {
            (IpAddr::V4(start), IpAddr::V4(end)) => {
                self.v4.insert(u32::from(start), u32::from(end), value);
            }
            (IpAddr::V6(start), IpAddr::V6(end)) => {
                self.v6.insert(u128::from(start), u128::from(end), value);
            }
            // `IpRange::new` rejects mixed families
            _ => unreachable!("{range} mixes address families"),
        }
        self.len.take();
    }

    /// Find the value of the range containing `addr`
    #[must_use]
    pub fn get(&self, addr: IpAddr) -> Option<&T> {
        match addr {
            IpAddr::V4(addr) => self.v4.get(u32::from(addr)),
            IpAddr::V6(addr) => self.v6.get(u128::from(addr)),
        }
    }

    /// Like [`Self::get`], but a miss is reported as [`Error::NotFound`]
    pub fn lookup(&self, addr: IpAddr) -> Result<&T, Error> {
        self.get(addr).ok_or(Error::NotFound(addr))
    }

    /// Whether any range contains `addr`
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.get(addr).is_some()
    }

    /// Number of distinct ranges across both families
    #[must_use]
    pub fn len(&self) -> usize {
        *self.len.get_or_init(|| self.v4.len() + self.v6.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for IpRangeDict<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<IpAddr> for IpRangeDict<T> {
    type Output = T;

    /// # Panics
    /// Panics if no range contains `addr`.
    fn index(&self, addr: IpAddr) -> &Self::Output {
        match self.get(addr) {
            Some(value) => value,
            None => panic!("no range contains {addr}"),
        }
    }
}

impl<T> Extend<(IpRange, T)> for IpRangeDict<T> {
    fn extend<I: IntoIterator<Item = (IpRange, T)>>(&mut self, iter: I) {
        for (range, value) in iter {
            self.insert_range(&range, value);
        }
    }
}

impl<T> FromIterator<(IpRange, T)> for IpRangeDict<T> {
    fn from_iter<I: IntoIterator<Item = (IpRange, T)>>(iter: I) -> Self {
        let mut dict = Self::new();
        dict.extend(iter);
        dict
    }
}
