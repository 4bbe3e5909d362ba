//! Ordered range maps from addresses to method roles.

use core::fmt;

use alloc::vec::Vec;

use crate::{error::ConfigError, system::SysMethod};

/// A range of a [`Map`], covering `endoff + 1` addresses from the end of the previous range.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Range {
    /// The offset of the last address of the range from its first address.
    pub endoff: u64,
    /// The bound method role, or [`None`] for a hole.
    pub meth: Option<SysMethod>,
}

/// A range with absolute boundaries.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct MapEntry {
    /// The first address of the range.
    pub start: u64,
    /// The last address of the range.
    pub end: u64,
    /// The bound method role, or [`None`] for a hole.
    pub meth: Option<SysMethod>,
}

impl MapEntry {
    /// Constructs a new [`MapEntry`] covering `[start, end]`.
    pub const fn new(start: u64, end: u64, meth: Option<SysMethod>) -> Self {
        Self { start, end, meth }
    }
}

/// An ordered set of contiguous, non-overlapping ranges laid end to end from address 0.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Map {
    /// The ranges, in address order.
    ranges: Vec<Range>,
}

impl Map {
    /// Constructs an empty [`Map`].
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Constructs a [`Map`] from ranges with absolute boundaries.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Inverted`]: Returned if a range ends before it starts.
    /// - [`ConfigError::Overlap`]: Returned if a range starts before the previous one ends.
    /// - [`ConfigError::Gap`]: Returned if a range does not start right after the previous one,
    ///   or the first range does not start at 0.
    /// - [`ConfigError::Overflow`]: Returned if a range follows one ending at `u64::MAX`.
    pub fn from_entries(entries: &[MapEntry]) -> Result<Self, ConfigError> {
        let mut ranges = Vec::with_capacity(entries.len());
        let mut expected = Some(0u64);

        for entry in entries {
            if entry.end < entry.start {
                return Err(ConfigError::Inverted {
                    start: entry.start,
                    end: entry.end,
                });
            }

            let Some(next) = expected else {
                return Err(ConfigError::Overflow { start: entry.start });
            };
            if entry.start < next {
                return Err(ConfigError::Overlap {
                    start: entry.start,
                    end: entry.end,
                });
            } else if entry.start > next {
                return Err(ConfigError::Gap { start: entry.start });
            }

            ranges.push(Range {
                endoff: entry.end - entry.start,
                meth: entry.meth,
            });
            expected = entry.end.checked_add(1);
        }

        Ok(Self { ranges })
    }

    /// Returns the number of ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns `true` if the map has no ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the ranges, in address order.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Returns the method role bound to `addr`, or [`None`] if `addr` lies in a hole or past the
    /// last range.
    pub fn lookup(&self, addr: u64) -> Option<SysMethod> {
        self.iter()
            .find(|entry| addr <= entry.end)
            .and_then(|entry| (addr >= entry.start).then_some(entry.meth).flatten())
    }

    /// Returns an iterator over the ranges with absolute boundaries.
    pub fn iter(&self) -> MapIter<'_> {
        MapIter {
            ranges: self.ranges.iter(),
            next_start: Some(0),
        }
    }

    /// Binds `[entry.start, entry.end]` to `entry.meth`, overriding whatever was bound there.
    ///
    /// Existing ranges are split as needed and neighbours bound to the same role are merged. An
    /// empty map is first covered by a single hole spanning the whole address space.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Inverted`] if the range ends before it starts.
    pub fn set(&mut self, entry: MapEntry) -> Result<(), ConfigError> {
        if entry.end < entry.start {
            return Err(ConfigError::Inverted {
                start: entry.start,
                end: entry.end,
            });
        }

        let mut current = self.iter().collect::<Vec<_>>();
        if current.is_empty() {
            current.push(MapEntry::new(0, u64::MAX, None));
        }

        let mut result = Vec::with_capacity(current.len() + 2);
        let mut inserted = false;
        for existing in current {
            if existing.end < entry.start {
                result.push(existing);
                continue;
            }

            if existing.start < entry.start {
                result.push(MapEntry::new(existing.start, entry.start - 1, existing.meth));
            }
            if !inserted {
                push_after_gap(&mut result, entry);
                inserted = true;
            }
            if existing.end > entry.end {
                let start = existing.start.max(entry.end + 1);
                result.push(MapEntry::new(start, existing.end, existing.meth));
            }
        }
        if !inserted {
            push_after_gap(&mut result, entry);
        }

        let mut merged: Vec<MapEntry> = Vec::with_capacity(result.len());
        for next in result {
            match merged.last_mut() {
                Some(last) if last.meth == next.meth => last.end = next.end,
                _ => merged.push(next),
            }
        }

        self.ranges = merged
            .into_iter()
            .map(|entry| Range {
                endoff: entry.end - entry.start,
                meth: entry.meth,
            })
            .collect();
        Ok(())
    }
}

/// Pushes `entry` onto `entries`, first filling any space after the last entry with a hole.
fn push_after_gap(entries: &mut Vec<MapEntry>, entry: MapEntry) {
    let next_start = match entries.last() {
        Some(last) => last.end + 1,
        None => 0,
    };
    if next_start < entry.start {
        entries.push(MapEntry::new(next_start, entry.start - 1, None));
    }
    entries.push(entry);
}

impl<'a> IntoIterator for &'a Map {
    type Item = MapEntry;
    type IntoIter = MapIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the ranges of a [`Map`] with absolute boundaries.
#[derive(Clone, Debug)]
pub struct MapIter<'a> {
    /// The remaining ranges.
    ranges: core::slice::Iter<'a, Range>,
    /// The start of the next range, or [`None`] once the address space is exhausted.
    next_start: Option<u64>,
}

impl Iterator for MapIter<'_> {
    type Item = MapEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let range = self.ranges.next()?;
        let end = start.checked_add(range.endoff)?;

        self.next_start = end.checked_add(1);
        Some(MapEntry::new(start, end, range.meth))
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self {
            let name = entry.meth.map_or("NONE", SysMethod::name);
            writeln!(f, "{:x}-{:x}: {name}", entry.start, entry.end)?;
        }
        Ok(())
    }
}
