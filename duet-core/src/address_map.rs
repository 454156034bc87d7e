use crate::AddressRange;
use std::cmp::Ordering;
use thiserror::Error;

/// Ordered map of non-overlapping 32-bit address ranges to values of type `T`.
///
/// Addresses not covered by any range are *vacant*.
#[derive(Debug, Clone)]
pub struct AddressMap<T> {
    ordered_ranges: Vec<(AddressRange, T)>,
}

impl<T> AddressMap<T> {
    /// Returns the range containing `address` together with its value, or `None` if `address` is
    /// vacant.
    pub fn lookup(&self, address: u32) -> Option<(AddressRange, &T)> {
        self.ordered_ranges
            .binary_search_by(|(range, _)| {
                if address < range.start() {
                    Ordering::Greater
                } else if address <= range.end() {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            })
            .ok()
            .map(|index| {
                let (range, value) = &self.ordered_ranges[index];
                (*range, value)
            })
    }

    /// Returns the value mapped at `address`, if any.
    pub fn value(&self, address: u32) -> Option<&T> {
        self.lookup(address).map(|(_, value)| value)
    }
}

impl<T> TryFrom<Vec<(AddressRange, T)>> for AddressMap<T> {
    type Error = AddressMapError;

    fn try_from(mut value: Vec<(AddressRange, T)>) -> Result<Self, Self::Error> {
        value.sort_by_key(|(range, _)| range.start());

        for pair in value.windows(2) {
            let (previous, _) = &pair[0];
            let (next, _) = &pair[1];
            if next.start() <= previous.end() {
                return Err(AddressMapError::OverlappingAddressRanges {
                    first: *previous,
                    second: *next,
                });
            }
        }

        Ok(Self {
            ordered_ranges: value,
        })
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AddressMapError {
    #[error("address range {second} overlaps with {first}")]
    OverlappingAddressRanges {
        first: AddressRange,
        second: AddressRange,
    },
}

/// Builds an [`AddressMap`] from `base, size => value` entries.
///
/// Panics if a range is empty, wraps around, or overlaps another one.
#[macro_export]
macro_rules! addr_map {
    ($($base:expr, $size:expr => $value:expr,)*) => {
        $crate::address_map::AddressMap::try_from(vec![
            $(($crate::address_range::AddressRange::with_size($base, $size).unwrap(), $value)),*
        ]).unwrap()
    };
}
