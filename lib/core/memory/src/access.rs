//! Caller-supplied access to snapshot memory and registers.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

use alloc::string::String;

use crate::address::{AddressSpace, FullAddress};

/// A source of raw memory content, such as a kernel dump file.
///
/// Implementations are synchronous and may fail; a failure aborts whichever operation issued the
/// read.
pub trait MemoryRead {
    /// Fills `buffer` with the bytes stored at `address`.
    ///
    /// # Errors
    ///
    /// - [`ReadError::NoData`]: Returned if the snapshot holds no content at `address`.
    /// - [`ReadError::Unsupported`]: Returned if the address space of `address` cannot be read.
    /// - [`ReadError::Other`]: Returned for any other failure of the underlying source.
    fn read(&self, address: FullAddress, buffer: &mut [u8]) -> Result<(), ReadError>;

    /// Returns the byte order of multi-byte values stored in memory.
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::Little
    }

    /// Returns the set of address spaces that [`MemoryRead::read`] accepts directly.
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Called when a page previously fetched through [`MemoryRead::read`] is dropped from a
    /// read cache.
    ///
    /// `address` is the start of the page.
    fn release(&self, address: FullAddress) {
        let _ = address;
    }
}

/// A source of CPU register values captured in a snapshot.
pub trait RegisterRead {
    /// Returns the value of the register called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Other`] if the register is unknown or was not captured.
    fn read_register(&self, name: &str) -> Result<u64, ReadError>;
}

/// The byte order of values stored in memory.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// Decodes up to 8 bytes as an unsigned integer, zero-extended to 64 bits.
    ///
    /// Bytes beyond the eighth are ignored.
    pub fn decode(self, bytes: &[u8]) -> u64 {
        let bytes = &bytes[..bytes.len().min(8)];
        match self {
            Self::Little => bytes
                .iter()
                .rev()
                .fold(0, |acc, &byte| (acc << 8) | u64::from(byte)),
            Self::Big => bytes
                .iter()
                .fold(0, |acc, &byte| (acc << 8) | u64::from(byte)),
        }
    }
}

/// The set of [`AddressSpace`]s a [`MemoryRead`] implementation reads natively.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Capabilities(pub u32);

impl Capabilities {
    /// No address space can be read.
    pub const NONE: Self = Self(0);
    /// Kernel physical addresses can be read.
    pub const KPHYS: Self = Self(1 << 0);
    /// Machine physical addresses can be read.
    pub const MACHPHYS: Self = Self(1 << 1);
    /// Kernel virtual addresses can be read.
    pub const KV: Self = Self(1 << 2);

    /// Every address space can be read.
    pub const ALL: Self = Self(Self::KPHYS.0 | Self::MACHPHYS.0 | Self::KV.0);

    /// Returns the capability needed to read `space`.
    pub const fn for_space(space: AddressSpace) -> Self {
        match space {
            AddressSpace::KPhysAddr => Self::KPHYS,
            AddressSpace::MachPhysAddr => Self::MACHPHYS,
            AddressSpace::KVAddr => Self::KV,
            AddressSpace::NoAddr => Self::NONE,
        }
    }

    /// Returns `true` if the flags in `other` are set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `space` can be read directly.
    pub const fn can_read(&self, space: AddressSpace) -> bool {
        !matches!(space, AddressSpace::NoAddr) && self.contains(Self::for_space(space))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl BitAnd for Capabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Capabilities {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

/// Various errors reported by [`MemoryRead`] and [`RegisterRead`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The snapshot holds no content at the requested address.
    #[error("no data at {0}")]
    NoData(FullAddress),
    /// The address space cannot be read by this source.
    #[error("cannot read {0} addresses")]
    Unsupported(AddressSpace),
    /// Any other failure of the underlying source.
    #[error("{0}")]
    Other(String),
}
