//! A small most-recently-used cache of whole pages fetched from a [`MemoryRead`].

use alloc::{vec, vec::Vec};
use core::cell::RefCell;

use memory::{access::MemoryRead, address::FullAddress};

/// The number of pages a [`ReadCache`] holds.
pub const READ_CACHE_SLOTS: usize = 4;

/// The size of a cached page, in bytes.
pub const CACHE_PAGE_SIZE: u64 = 0x1000;

/// [`CACHE_PAGE_SIZE`] as a buffer length.
const CACHE_PAGE_LEN: usize = 0x1000;

/// A page held by a [`ReadCache`].
struct CachedPage {
    /// The start of the page.
    addr: FullAddress,
    /// The page content.
    data: Vec<u8>,
}

impl CachedPage {
    /// Returns `true` if `addr` lies inside this page.
    fn covers(&self, addr: FullAddress) -> bool {
        self.addr.space() == addr.space()
            && addr.value().wrapping_sub(self.addr.value()) < CACHE_PAGE_SIZE
    }
}

/// Pages recently read by translations, reused across page-table levels and walks.
///
/// Attach it to a [`Context`][crate::Context] with
/// [`Context::with_cache`][crate::Context::with_cache]. Slots are kept most recently used first;
/// a miss evicts the last one.
#[derive(Default)]
pub struct ReadCache {
    /// The cached pages, most recently used first.
    slots: RefCell<Vec<CachedPage>>,
}

impl ReadCache {
    /// Constructs an empty [`ReadCache`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the bytes at `addr` into `buffer` from a cached page, fetching the page on a miss.
    ///
    /// Returns `false` if the read crosses a page boundary or the page cannot be fetched whole;
    /// the caller then reads `memory` directly.
    pub(crate) fn read(
        &self,
        memory: &dyn MemoryRead,
        addr: FullAddress,
        buffer: &mut [u8],
    ) -> bool {
        let Ok(mut slots) = self.slots.try_borrow_mut() else {
            return false;
        };
        let Ok(offset) = usize::try_from(addr.value() % CACHE_PAGE_SIZE) else {
            return false;
        };
        let Some(end) = offset
            .checked_add(buffer.len())
            .filter(|&end| end <= CACHE_PAGE_LEN)
        else {
            return false;
        };

        let page = match slots.iter().position(|page| page.covers(addr)) {
            Some(index) => slots.remove(index),
            None => {
                let start = addr.with_value(addr.value() & !(CACHE_PAGE_SIZE - 1));
                let mut data = vec![0; CACHE_PAGE_LEN];
                if memory.read(start, &mut data).is_err() {
                    return false;
                }
                log::trace!("cached page {start}");

                if slots.len() >= READ_CACHE_SLOTS {
                    if let Some(evicted) = slots.pop() {
                        memory.release(evicted.addr);
                    }
                }
                CachedPage { addr: start, data }
            }
        };

        buffer.copy_from_slice(&page.data[offset..end]);
        slots.insert(0, page);
        true
    }

    /// Marks the page holding `addr` as no longer needed.
    ///
    /// The page stays cached but is the first to be evicted.
    pub fn bury(&self, addr: FullAddress) {
        let Ok(mut slots) = self.slots.try_borrow_mut() else {
            return;
        };
        if let Some(index) = slots.iter().position(|page| page.covers(addr)) {
            let page = slots.remove(index);
            slots.push(page);
        }
    }

    /// Returns `true` if the page holding `addr` is cached.
    pub fn contains(&self, addr: FullAddress) -> bool {
        self.slots
            .try_borrow()
            .is_ok_and(|slots| slots.iter().any(|page| page.covers(addr)))
    }

    /// Drops every cached page, releasing each to `memory`.
    pub fn flush(&self, memory: &dyn MemoryRead) {
        let Ok(mut slots) = self.slots.try_borrow_mut() else {
            return;
        };
        for page in slots.drain(..) {
            memory.release(page.addr);
        }
    }
}

impl core::fmt::Debug for ReadCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_list();
        if let Ok(slots) = self.slots.try_borrow() {
            list.entries(slots.iter().map(|page| page.addr));
        }
        list.finish()
    }
}
