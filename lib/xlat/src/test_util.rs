//! In-memory snapshot callbacks used by the unit tests.

use alloc::{collections::BTreeMap, string::ToString};

use memory::{
    access::{ByteOrder, Capabilities, MemoryRead, ReadError, RegisterRead},
    address::{AddressSpace, FullAddress},
};

/// A sparse byte store keyed by full address.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    /// The stored bytes.
    bytes: BTreeMap<(AddressSpace, u64), u8>,
    /// The byte order of stored values.
    order: ByteOrder,
    /// The address spaces that can be read directly.
    caps: Capabilities,
}

impl Snapshot {
    /// Constructs an empty little-endian [`Snapshot`] readable in every address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts direct reads to `caps`.
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Sets the byte order of stored values.
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Stores `bytes` starting at `addr`.
    pub fn write_bytes(&mut self, addr: FullAddress, bytes: &[u8]) {
        let mut current = addr;
        for &byte in bytes {
            self.bytes.insert((current.space(), current.value()), byte);
            current = current.wrapping_add(1);
        }
    }

    /// Stores `value` as 8 bytes in the snapshot byte order.
    pub fn write_u64(&mut self, addr: FullAddress, value: u64) {
        let bytes = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.write_bytes(addr, &bytes);
    }

    /// Stores `value` as 4 bytes in the snapshot byte order.
    pub fn write_u32(&mut self, addr: FullAddress, value: u32) {
        let bytes = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.write_bytes(addr, &bytes);
    }
}

impl MemoryRead for Snapshot {
    fn read(&self, address: FullAddress, buffer: &mut [u8]) -> Result<(), ReadError> {
        if !self.caps.can_read(address.space()) {
            return Err(ReadError::Unsupported(address.space()));
        }

        let mut current = address;
        for byte in buffer.iter_mut() {
            *byte = *self
                .bytes
                .get(&(current.space(), current.value()))
                .ok_or(ReadError::NoData(address))?;
            current = current.wrapping_add(1);
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

/// A fixed set of register values.
#[derive(Clone, Copy, Debug)]
pub struct Registers(pub &'static [(&'static str, u64)]);

impl RegisterRead for Registers {
    fn read_register(&self, name: &str) -> Result<u64, ReadError> {
        self.0
            .iter()
            .find(|(register, _)| *register == name)
            .map(|&(_, value)| value)
            .ok_or_else(|| ReadError::Other(name.to_string()))
    }
}
