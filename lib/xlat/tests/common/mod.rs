//! A sparse in-memory snapshot shared by the integration tests.
#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::collections::BTreeMap;

use xlat::{AddressSpace, ByteOrder, Capabilities, FullAddress, MemoryRead, ReadError};

/// Bytes of a snapshot, keyed by full address. Missing bytes read as [`ReadError::NoData`].
#[derive(Clone, Debug, Default)]
pub struct SparseMemory {
    bytes: BTreeMap<(AddressSpace, u64), u8>,
    order: ByteOrder,
    caps: Capabilities,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn big_endian(mut self) -> Self {
        self.order = ByteOrder::Big;
        self
    }

    pub fn readable(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn put(&mut self, addr: FullAddress, value: u64) {
        let bytes = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };

        for (offset, byte) in (0..).zip(bytes) {
            let at = addr.wrapping_add(offset);
            self.bytes.insert((at.space(), at.value()), byte);
        }
    }
}

impl MemoryRead for SparseMemory {
    fn read(&self, address: FullAddress, buffer: &mut [u8]) -> Result<(), ReadError> {
        if !self.caps.can_read(address.space()) {
            return Err(ReadError::Unsupported(address.space()));
        }

        for (offset, byte) in (0..).zip(buffer.iter_mut()) {
            let at = address.wrapping_add(offset);
            *byte = *self
                .bytes
                .get(&(at.space(), at.value()))
                .ok_or(ReadError::NoData(at))?;
        }

        Ok(())
    }

    fn byte_order(&self) -> ByteOrder {
        self.order
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }
}
