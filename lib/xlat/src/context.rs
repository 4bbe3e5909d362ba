//! Access to the caller-supplied snapshot callbacks.

use alloc::string::ToString;
use memory::{
    access::{MemoryRead, ReadError, RegisterRead},
    address::{AddressSpace, FullAddress},
};

use crate::{
    cache::ReadCache,
    error::{Error, Slot},
    system::System,
    walk,
};

/// The maximum nesting depth of reads that must first be translated to a readable space.
pub const MAX_READ_NESTING: usize = 4;

/// The address spaces tried, in order, when a read must first be translated.
const INDIRECT_READ_ORDER: [AddressSpace; 3] = [
    AddressSpace::MachPhysAddr,
    AddressSpace::KPhysAddr,
    AddressSpace::KVAddr,
];

/// The callbacks a translation may use to access the snapshot.
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    /// The memory read callback.
    memory: Option<&'a dyn MemoryRead>,
    /// The register read callback.
    registers: Option<&'a dyn RegisterRead>,
    /// Pages recently read through `memory`.
    cache: Option<&'a ReadCache>,
}

impl<'a> Context<'a> {
    /// Constructs a [`Context`] without any callbacks.
    pub const fn new() -> Self {
        Self {
            memory: None,
            registers: None,
            cache: None,
        }
    }

    /// Returns this [`Context`] with `memory` as its memory read callback.
    #[must_use]
    pub const fn with_memory(mut self, memory: &'a dyn MemoryRead) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Returns this [`Context`] with `registers` as its register read callback.
    #[must_use]
    pub const fn with_registers(mut self, registers: &'a dyn RegisterRead) -> Self {
        self.registers = Some(registers);
        self
    }

    /// Returns this [`Context`] with reads of page-sized chunks served through `cache`.
    #[must_use]
    pub const fn with_cache(mut self, cache: &'a ReadCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the memory read callback, if any.
    pub fn memory(&self) -> Option<&'a dyn MemoryRead> {
        self.memory
    }

    /// Reads the register called `name`.
    ///
    /// # Errors
    ///
    /// - [`Error::Unconfigured`]: Returned if there is no register callback.
    /// - [`Error::Register`]: Returned if the callback fails.
    pub fn read_register(&self, name: &str) -> Result<u64, Error> {
        let registers = self.registers.ok_or(Error::Unconfigured {
            slot: Slot::Registers,
        })?;

        registers
            .read_register(name)
            .map_err(|source| Error::Register {
                name: name.to_string(),
                source,
            })
    }

    /// Reads an unsigned value of `size` bytes (at most 8) at `addr`, zero-extended.
    ///
    /// Addresses in spaces the callback cannot read directly are translated through `sys` first.
    /// `nest` is the nesting depth of the read in progress.
    pub(crate) fn read_uint(
        &self,
        sys: Option<&System>,
        addr: FullAddress,
        size: u8,
        what: &'static str,
        nest: usize,
    ) -> Result<u64, Error> {
        let memory = self.memory.ok_or(Error::Unconfigured { slot: Slot::Memory })?;
        let mut buffer = [0u8; 8];
        let buffer = &mut buffer[..usize::from(size.min(8))];

        let caps = memory.capabilities();
        let readable = if caps.can_read(addr.space()) {
            addr
        } else {
            self.make_readable(sys, addr, size, what, nest)?
        };

        if let Some(cache) = self.cache {
            if cache.read(memory, readable, buffer) {
                return Ok(memory.byte_order().decode(buffer));
            }
        }

        memory
            .read(readable, buffer)
            .map_err(|source| Error::Read {
                addr,
                width: size.saturating_mul(8),
                what,
                source,
            })?;

        Ok(memory.byte_order().decode(buffer))
    }

    /// Hints that the cached page holding `addr` will not be needed again soon.
    ///
    /// Only addresses the memory callback reads directly are considered.
    pub(crate) fn bury(&self, addr: FullAddress) {
        if let (Some(cache), Some(memory)) = (self.cache, self.memory) {
            if memory.capabilities().can_read(addr.space()) {
                cache.bury(addr);
            }
        }
    }

    /// Translates `addr` into an address space the memory callback can read.
    fn make_readable(
        &self,
        sys: Option<&System>,
        addr: FullAddress,
        size: u8,
        what: &'static str,
        nest: usize,
    ) -> Result<FullAddress, Error> {
        let unsupported = |addr: FullAddress| Error::Read {
            addr,
            width: size.saturating_mul(8),
            what,
            source: ReadError::Unsupported(addr.space()),
        };

        let Some(sys) = sys else {
            return Err(unsupported(addr));
        };
        if nest >= MAX_READ_NESTING {
            return Err(Error::CycleDetected {
                start: addr,
                limit: MAX_READ_NESTING,
            });
        }

        let caps = self
            .memory
            .map(|memory| memory.capabilities())
            .unwrap_or_default();
        let mut last_error = None;
        for goal in INDIRECT_READ_ORDER
            .into_iter()
            .filter(|&space| caps.can_read(space))
        {
            match walk::translate(sys, self, addr, goal, nest + 1) {
                Ok(readable) if caps.can_read(readable.space()) => {
                    log::trace!("read {addr} through {readable}");
                    return Ok(readable);
                }
                Ok(_) => {}
                Err(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or_else(|| unsupported(addr)))
    }
}

impl core::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("memory", &self.memory.is_some())
            .field("registers", &self.registers.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}
