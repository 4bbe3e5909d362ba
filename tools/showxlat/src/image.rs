//! A raw physical memory image read into memory.

use std::path::Path;

use anyhow::{Context, Result};
use memory::{
    access::{ByteOrder, Capabilities, MemoryRead, ReadError},
    address::{AddressSpace, FullAddress},
};

/// A flat physical memory image, where the file offset of a byte is its physical address.
///
/// Kernel physical and machine physical addresses are treated as identical.
#[derive(Clone, Debug)]
pub struct RawImage {
    /// The contents of the image.
    data: Vec<u8>,
    /// The byte order of values in the image.
    order: ByteOrder,
}

impl RawImage {
    /// Constructs a new [`RawImage`] from its contents.
    pub fn from_bytes(data: Vec<u8>, order: ByteOrder) -> Self {
        Self { data, order }
    }

    /// Reads the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn open(path: &Path, order: ByteOrder) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("error reading image \"{}\"", path.display()))?;
        log::debug!("loaded {} bytes from \"{}\"", data.len(), path.display());

        Ok(Self::from_bytes(data, order))
    }
}

impl MemoryRead for RawImage {
    fn read(&self, address: FullAddress, buffer: &mut [u8]) -> Result<(), ReadError> {
        match address.space() {
            AddressSpace::KPhysAddr | AddressSpace::MachPhysAddr => {}
            space => return Err(ReadError::Unsupported(space)),
        }

        let bytes = usize::try_from(address.value())
            .ok()
            .and_then(|start| Some(start..start.checked_add(buffer.len())?))
            .and_then(|range| self.data.get(range))
            .ok_or(ReadError::NoData(address))?;
        buffer.copy_from_slice(bytes);

        Ok(())
    }

    fn byte_order(&self) -> ByteOrder {
        self.order
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::KPHYS | Capabilities::MACHPHYS
    }
}

#[cfg(test)]
mod test {
    use memory::{
        access::{ByteOrder, MemoryRead, ReadError},
        address::{AddressSpace, FullAddress},
    };

    use super::RawImage;

    #[test]
    fn physical_reads() {
        let image = RawImage::from_bytes((0..16).collect(), ByteOrder::Little);
        let mut buffer = [0; 4];

        image.read(FullAddress::kphys(4), &mut buffer).unwrap();
        assert_eq!(buffer, [4, 5, 6, 7]);
        image.read(FullAddress::machphys(12), &mut buffer).unwrap();
        assert_eq!(buffer, [12, 13, 14, 15]);
    }

    #[test]
    fn out_of_range_and_virtual_reads() {
        let image = RawImage::from_bytes(vec![0; 16], ByteOrder::Big);
        let mut buffer = [0; 4];

        assert_eq!(
            image.read(FullAddress::kphys(13), &mut buffer),
            Err(ReadError::NoData(FullAddress::kphys(13)))
        );
        assert_eq!(
            image.read(FullAddress::kphys(u64::MAX), &mut buffer),
            Err(ReadError::NoData(FullAddress::kphys(u64::MAX)))
        );
        assert_eq!(
            image.read(FullAddress::kv(0), &mut buffer),
            Err(ReadError::Unsupported(AddressSpace::KVAddr))
        );
    }
}
