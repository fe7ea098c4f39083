// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Allocation of translated ports and ICMP identifiers.
//!
//! An [`IdSpace`] tracks the values in use on one uplink. Callers keep one cursor per protocol:
//! a search starts at the cursor and walks the configured range upwards, wrapping around at most
//! once, and the cursor then moves past the value handed out.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Reference-counted set of assigned values within a range
#[derive(Debug, Clone)]
pub(crate) struct IdSpace {
    range: RangeInclusive<u16>,
    assigned: BTreeMap<u16, u32>,
}

impl IdSpace {
    pub(crate) fn new(range: RangeInclusive<u16>) -> Self {
        Self {
            range,
            assigned: BTreeMap::new(),
        }
    }

    pub(crate) fn first(&self) -> u16 {
        *self.range.start()
    }

    // Iterate over the whole range once, starting from a given value (and looping at the end).
    //
    // Example: range 1..=4 with start 3 yields [3, 4, 1, 2]
    fn cycle_from(&self, start: u16) -> impl Iterator<Item = u16> + use<> {
        let (lo, hi) = (*self.range.start(), *self.range.end());
        if lo > hi {
            return (lo..=hi).chain(lo..lo);
        }
        let start = start.clamp(lo, hi);
        (start..=hi).chain(lo..start)
    }

    /// Assign the first free value at or after `cursor`, and move the cursor past it.
    ///
    /// Returns `None` when every value of the range is assigned.
    pub(crate) fn allocate(&mut self, cursor: &mut u16) -> Option<u16> {
        let value = self
            .cycle_from(*cursor)
            .find(|v| !self.assigned.contains_key(v))?;
        self.assigned.insert(value, 1);
        *cursor = if value >= *self.range.end() {
            self.first()
        } else {
            value + 1
        };
        Some(value)
    }

    /// Take one more reference on a value, assigned or not.
    pub(crate) fn reserve(&mut self, value: u16) {
        *self.assigned.entry(value).or_default() += 1;
    }

    /// Drop one reference on a value. Returns true if the value is now free.
    pub(crate) fn release(&mut self, value: u16) -> bool {
        let Some(count) = self.assigned.get_mut(&value) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.assigned.remove(&value);
            return true;
        }
        false
    }

    pub(crate) fn is_assigned(&self, value: u16) -> bool {
        self.assigned.contains_key(&value)
    }

    pub(crate) fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::IdSpace;

    #[test]
    fn probes_upward_and_skips_assigned() {
        let mut space = IdSpace::new(1..=10);
        let mut cursor = space.first();
        space.reserve(2);
        assert_eq!(space.allocate(&mut cursor), Some(1));
        assert_eq!(space.allocate(&mut cursor), Some(3));
        assert_eq!(cursor, 4);
    }

    #[test]
    fn wraps_once_then_exhausts() {
        let mut space = IdSpace::new(1..=3);
        let mut cursor = 3;
        assert_eq!(space.allocate(&mut cursor), Some(3));
        assert_eq!(cursor, 1);
        assert_eq!(space.allocate(&mut cursor), Some(1));
        assert_eq!(space.allocate(&mut cursor), Some(2));
        assert_eq!(space.allocate(&mut cursor), None);

        assert!(space.release(1));
        assert_eq!(space.allocate(&mut cursor), Some(1));
        assert_eq!(space.assigned_count(), 3);
    }

    #[test]
    fn reference_counted_release() {
        let mut space = IdSpace::new(1..=3);
        let mut cursor = 1;
        let port = space.allocate(&mut cursor).unwrap();
        space.reserve(port);
        assert!(!space.release(port));
        assert!(space.is_assigned(port));
        assert!(space.release(port));
        assert!(!space.is_assigned(port));
        assert!(!space.release(port));
    }

    #[test]
    fn full_u16_range_wraps_at_max() {
        let mut space = IdSpace::new(1..=u16::MAX);
        let mut cursor = u16::MAX;
        assert_eq!(space.allocate(&mut cursor), Some(u16::MAX));
        assert_eq!(cursor, 1);
    }
}
